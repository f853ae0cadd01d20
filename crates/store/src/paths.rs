//! Builders for the store schema used by every client.
//!
//! Layout:
//! - `participants/{id}` -> `{ id, name, votes, picture }`
//! - `votingAllowed` -> bool
//! - `revoteParticipants` -> array of ids, null/absent = unset
//! - `mobileDisplay` -> array of ids

use shared::domain::ParticipantId;

pub const PARTICIPANTS: &str = "participants";
pub const VOTING_ALLOWED: &str = "votingAllowed";
pub const REVOTE_PARTICIPANTS: &str = "revoteParticipants";
pub const MOBILE_DISPLAY: &str = "mobileDisplay";

pub fn participant(id: &ParticipantId) -> String {
    format!("{PARTICIPANTS}/{id}")
}

pub fn participant_votes(id: &ParticipantId) -> String {
    format!("{PARTICIPANTS}/{id}/votes")
}
