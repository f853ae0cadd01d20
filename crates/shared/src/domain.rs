use std::fmt;

use serde::{Deserialize, Serialize};

/// Substituted on read whenever a participant record has no picture.
/// Never written back to the store.
pub const PLACEHOLDER_PICTURE_URL: &str = "https://via.placeholder.com/100";

/// Store-assigned participant key. Assigned once at creation, never reused.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(pub String);

impl ParticipantId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ParticipantId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// A contestant as reshaped from a raw store snapshot: `votes` already
/// defaulted, `picture` already substituted with the placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub name: String,
    pub votes: u64,
    pub picture: String,
}

/// Admin-curated restriction of the voting view.
///
/// `Unset` means "no restriction": the voting roster degrades to the full
/// participant collection.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RevoteSelection {
    #[default]
    Unset,
    Only(Vec<ParticipantId>),
}

impl RevoteSelection {
    pub fn is_unset(&self) -> bool {
        matches!(self, RevoteSelection::Unset)
    }

    pub fn permits(&self, id: &ParticipantId) -> bool {
        match self {
            RevoteSelection::Unset => true,
            RevoteSelection::Only(ids) => ids.contains(id),
        }
    }
}

#[cfg(test)]
#[path = "tests/domain_tests.rs"]
mod tests;
