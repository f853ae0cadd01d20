//! The data-model/sync layer: reshapes raw store snapshots into typed
//! records and turns admin actions into well-formed store writes.
//!
//! Each subscribed path is owned by a feed: a small service holding the
//! last known typed state, advanced only when the owning event loop drains
//! it. That makes "last known snapshot" well defined for the vote path,
//! which deliberately computes its increment from the subscription state
//! rather than a fresh read.

use std::{collections::BTreeMap, sync::Arc};

use serde_json::{json, Value};
use shared::{
    domain::{Participant, ParticipantId, RevoteSelection, PLACEHOLDER_PICTURE_URL},
    error::{StoreError, VoteError},
};
use store::{paths, RealtimeStore, Snapshot};
use tokio::sync::watch;
use tracing::info;

pub mod views;

fn reshape_participant(record: &Value) -> Option<Participant> {
    // Children without an id are not valid participant records.
    let id = record.get("id")?.as_str()?;
    Some(Participant {
        id: ParticipantId::new(id),
        name: record
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        votes: record.get("votes").and_then(Value::as_u64).unwrap_or(0),
        picture: record
            .get("picture")
            .and_then(Value::as_str)
            .unwrap_or(PLACEHOLDER_PICTURE_URL)
            .to_string(),
    })
}

fn reshape_participants(value: &Value) -> Vec<Participant> {
    let Some(children) = value.as_object() else {
        return Vec::new();
    };
    children.values().filter_map(reshape_participant).collect()
}

fn reshape_ids(value: &Value) -> Vec<ParticipantId> {
    let Some(entries) = value.as_array() else {
        return Vec::new();
    };
    entries
        .iter()
        .filter_map(Value::as_str)
        .map(ParticipantId::new)
        .collect()
}

/// Last known participant collection. `None` until the first snapshot:
/// "no snapshot yet" and "empty collection" are distinct states.
pub struct ParticipantsFeed {
    rx: watch::Receiver<Snapshot>,
    state: Option<Vec<Participant>>,
}

impl ParticipantsFeed {
    async fn subscribe(store: &dyn RealtimeStore) -> Result<Self, StoreError> {
        Ok(Self {
            rx: store.subscribe(paths::PARTICIPANTS).await?,
            state: None,
        })
    }

    pub fn current(&self) -> Option<&[Participant]> {
        self.state.as_deref()
    }

    fn sync(&mut self) {
        // An absent path keeps the last known state; the node never having
        // been created is indistinguishable from "still loading".
        if let Some(value) = self.rx.borrow_and_update().clone() {
            self.state = Some(reshape_participants(&value));
        }
    }
}

/// Last known revote selection. An absent/null node means "unset": no
/// restriction on the voting view.
pub struct RevoteFeed {
    rx: watch::Receiver<Snapshot>,
    state: RevoteSelection,
}

impl RevoteFeed {
    async fn subscribe(store: &dyn RealtimeStore) -> Result<Self, StoreError> {
        Ok(Self {
            rx: store.subscribe(paths::REVOTE_PARTICIPANTS).await?,
            state: RevoteSelection::default(),
        })
    }

    pub fn current(&self) -> &RevoteSelection {
        &self.state
    }

    fn sync(&mut self) {
        self.state = match &*self.rx.borrow_and_update() {
            None => RevoteSelection::Unset,
            Some(value) => RevoteSelection::Only(reshape_ids(value)),
        };
    }
}

/// Last known mobile display selection, in admin order. A null snapshot
/// holds the previous selection; there is no clear operation for it.
pub struct MobileDisplayFeed {
    rx: watch::Receiver<Snapshot>,
    state: Vec<ParticipantId>,
}

impl MobileDisplayFeed {
    async fn subscribe(store: &dyn RealtimeStore) -> Result<Self, StoreError> {
        Ok(Self {
            rx: store.subscribe(paths::MOBILE_DISPLAY).await?,
            state: Vec::new(),
        })
    }

    pub fn current(&self) -> &[ParticipantId] {
        &self.state
    }

    fn sync(&mut self) {
        if let Some(value) = self.rx.borrow_and_update().clone() {
            self.state = reshape_ids(&value);
        }
    }
}

/// Dashboard affordance flag. Read-only here: the vote write path does not
/// consult it.
pub struct VotingAllowedFeed {
    rx: watch::Receiver<Snapshot>,
    state: bool,
}

impl VotingAllowedFeed {
    async fn subscribe(store: &dyn RealtimeStore) -> Result<Self, StoreError> {
        Ok(Self {
            rx: store.subscribe(paths::VOTING_ALLOWED).await?,
            state: true,
        })
    }

    pub fn current(&self) -> bool {
        self.state
    }

    fn sync(&mut self) {
        if let Some(allowed) = self.rx.borrow_and_update().as_ref().and_then(Value::as_bool) {
            self.state = allowed;
        }
    }
}

/// One client of the voting system: four path subscriptions plus the write
/// operations. Drive it single-threaded: await `changed`, then read the
/// accessors and render.
pub struct VoteClient {
    store: Arc<dyn RealtimeStore>,
    participants: ParticipantsFeed,
    revote: RevoteFeed,
    mobile: MobileDisplayFeed,
    voting_allowed: VotingAllowedFeed,
}

impl VoteClient {
    pub async fn connect(store: Arc<dyn RealtimeStore>) -> Result<Self, StoreError> {
        let participants = ParticipantsFeed::subscribe(store.as_ref()).await?;
        let revote = RevoteFeed::subscribe(store.as_ref()).await?;
        let mobile = MobileDisplayFeed::subscribe(store.as_ref()).await?;
        let voting_allowed = VotingAllowedFeed::subscribe(store.as_ref()).await?;
        let mut client = Self {
            store,
            participants,
            revote,
            mobile,
            voting_allowed,
        };
        client.refresh();
        Ok(client)
    }

    /// Drain whatever snapshots the subscriptions currently hold.
    pub fn refresh(&mut self) {
        self.participants.sync();
        self.revote.sync();
        self.mobile.sync();
        self.voting_allowed.sync();
    }

    /// Wait for any subscribed path to change, then refresh all feeds.
    pub async fn changed(&mut self) -> Result<(), StoreError> {
        tokio::select! {
            changed = self.participants.rx.changed() => changed,
            changed = self.revote.rx.changed() => changed,
            changed = self.mobile.rx.changed() => changed,
            changed = self.voting_allowed.rx.changed() => changed,
        }
        .map_err(|_| StoreError::Transport("store subscription closed".into()))?;
        self.refresh();
        Ok(())
    }

    pub fn participants(&self) -> Option<&[Participant]> {
        self.participants.current()
    }

    pub fn revote_selection(&self) -> &RevoteSelection {
        self.revote.current()
    }

    pub fn mobile_selection(&self) -> &[ParticipantId] {
        self.mobile.current()
    }

    pub fn voting_allowed(&self) -> bool {
        self.voting_allowed.current()
    }

    /// Roster the voting view shows: the revote selection when one is set,
    /// the full collection otherwise.
    pub fn voting_roster(&self) -> Vec<Participant> {
        views::voting_roster(
            self.participants().unwrap_or_default(),
            self.revote_selection(),
        )
    }

    /// Dashboard rows, votes descending.
    pub fn scoreboard(&self) -> Vec<Participant> {
        views::scoreboard(self.participants().unwrap_or_default())
    }

    /// Mobile display rows: the curated selection resolved against the
    /// last known collection, votes descending.
    pub fn mobile_display(&self) -> Vec<Participant> {
        views::mobile_display(
            self.participants().unwrap_or_default(),
            self.mobile_selection(),
        )
    }

    /// Record one vote for `id`, computed from the last known snapshot.
    ///
    /// Two clients voting from the same stale snapshot will both write the
    /// same total and lose one increment; the store offers no
    /// compare-and-swap, so that behavior is inherent to the contract.
    pub async fn cast_vote(&self, id: &ParticipantId) -> Result<(), VoteError> {
        let votes = self
            .participants
            .current()
            .and_then(|list| list.iter().find(|p| &p.id == id))
            .map(|p| p.votes)
            .ok_or_else(|| VoteError::NotFound(id.clone()))?;
        self.store
            .put(&paths::participant_votes(id), json!(votes + 1))
            .await?;
        info!(%id, votes = votes + 1, "vote recorded");
        Ok(())
    }

    /// Restrict the voting view to `ids`. An empty selection is rejected
    /// before any write reaches the store.
    pub async fn set_revote_selection(&self, ids: &[ParticipantId]) -> Result<(), VoteError> {
        if ids.is_empty() {
            return Err(VoteError::EmptySelection);
        }
        let changes = BTreeMap::from([(paths::REVOTE_PARTICIPANTS.to_string(), json!(ids))]);
        self.store.update(changes).await?;
        info!(count = ids.len(), "revote selection set");
        Ok(())
    }

    /// Restore the voting view to the full collection.
    pub async fn clear_revote_selection(&self) -> Result<(), VoteError> {
        let changes = BTreeMap::from([(paths::REVOTE_PARTICIPANTS.to_string(), Value::Null)]);
        self.store.update(changes).await?;
        info!("revote selection cleared");
        Ok(())
    }

    /// Overwrite the mobile display selection, preserving admin order.
    pub async fn set_mobile_display(&self, ids: &[ParticipantId]) -> Result<(), VoteError> {
        let changes = BTreeMap::from([(paths::MOBILE_DISPLAY.to_string(), json!(ids))]);
        self.store.update(changes).await?;
        info!(count = ids.len(), "mobile display selection set");
        Ok(())
    }

    /// Zero the vote counter of every currently-known participant in one
    /// atomic multi-path commit.
    pub async fn reset_all_votes(&self) -> Result<(), VoteError> {
        let changes: BTreeMap<String, Value> = self
            .participants
            .current()
            .unwrap_or_default()
            .iter()
            .map(|p| (paths::participant_votes(&p.id), json!(0)))
            .collect();
        let count = changes.len();
        self.store.update(changes).await?;
        info!(count, "vote counters reset");
        Ok(())
    }

    /// Create a participant under a store-assigned id. The id is written
    /// into the record as well, matching what every reader expects.
    pub async fn add_participant(
        &self,
        name: &str,
        picture: Option<&str>,
    ) -> Result<ParticipantId, VoteError> {
        let mut record = json!({ "name": name, "votes": 0 });
        if let Some(picture) = picture {
            record["picture"] = json!(picture);
        }
        let key = self.store.push(paths::PARTICIPANTS, record).await?;
        let id = ParticipantId::new(key);
        self.store
            .put(&format!("{}/id", paths::participant(&id)), json!(id.as_str()))
            .await?;
        info!(%id, name, "participant created");
        Ok(id)
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
