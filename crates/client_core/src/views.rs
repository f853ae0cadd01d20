//! Pure read-models consumed by the presentation layer. Each view takes
//! the last known participant collection plus the selection relevant to
//! it; nothing here touches the store.

use shared::domain::{Participant, ParticipantId, RevoteSelection};

/// The voting view's roster. Degrades to the full collection when the
/// selection is unset.
pub fn voting_roster(
    participants: &[Participant],
    selection: &RevoteSelection,
) -> Vec<Participant> {
    participants
        .iter()
        .filter(|p| selection.permits(&p.id))
        .cloned()
        .collect()
}

/// Dashboard ordering: votes descending, stable for ties.
pub fn scoreboard(participants: &[Participant]) -> Vec<Participant> {
    let mut ordered = participants.to_vec();
    ordered.sort_by(|a, b| b.votes.cmp(&a.votes));
    ordered
}

/// The mobile display rows: selection ids resolved against the known
/// collection. Dangling ids are silently omitted (inner join); the result
/// is re-sorted by votes regardless of admin selection order.
pub fn mobile_display(
    participants: &[Participant],
    selection: &[ParticipantId],
) -> Vec<Participant> {
    let resolved: Vec<Participant> = selection
        .iter()
        .filter_map(|id| participants.iter().find(|p| &p.id == id).cloned())
        .collect();
    scoreboard(&resolved)
}

#[cfg(test)]
#[path = "tests/views_tests.rs"]
mod tests;
