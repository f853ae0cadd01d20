use super::*;

fn participant(id: &str, votes: u64) -> Participant {
    Participant {
        id: id.into(),
        name: format!("participant {id}"),
        votes,
        picture: "https://example.com/p.png".to_string(),
    }
}

#[test]
fn roster_is_the_full_collection_when_selection_is_unset() {
    let all = vec![participant("a", 1), participant("b", 2)];
    let roster = voting_roster(&all, &RevoteSelection::Unset);
    assert_eq!(roster, all);
}

#[test]
fn roster_keeps_only_selected_ids() {
    let all = vec![participant("a", 1), participant("b", 2), participant("c", 3)];
    let selection = RevoteSelection::Only(vec!["c".into(), "a".into()]);
    let roster = voting_roster(&all, &selection);
    let ids: Vec<&str> = roster.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "c"]);
}

#[test]
fn scoreboard_sorts_descending_and_keeps_tie_order() {
    let all = vec![
        participant("low", 1),
        participant("tied-first", 4),
        participant("tied-second", 4),
        participant("high", 9),
    ];
    let board = scoreboard(&all);
    let ids: Vec<&str> = board.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["high", "tied-first", "tied-second", "low"]);
}

#[test]
fn mobile_display_drops_dangling_ids_and_reorders_by_votes() {
    let all = vec![participant("a", 2), participant("b", 7)];
    let selection = vec!["a".into(), "deleted".into(), "b".into()];
    let rows = mobile_display(&all, &selection);
    let ids: Vec<&str> = rows.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["b", "a"]);
}

#[test]
fn empty_inputs_yield_empty_views() {
    assert!(voting_roster(&[], &RevoteSelection::Unset).is_empty());
    assert!(scoreboard(&[]).is_empty());
    assert!(mobile_display(&[], &["a".into()]).is_empty());
}
