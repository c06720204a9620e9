use super::RecordId;
use serde::{Deserialize, Serialize};

/// One signal taking part in a conversation, optionally under a callsign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub signal: RecordId,
    pub callsign: Option<String>,
}

impl Member {
    pub fn new(signal: RecordId, callsign: Option<String>) -> Self {
        Self { signal, callsign }
    }
}

/// A grouping of signals heard as one exchange.
///
/// Members are referenced by id and looked up through the owning
/// [`SignalLog`](super::SignalLog), so deleting a signal never leaves a
/// copy behind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub sender: RecordId,
    pub members: Vec<Member>,
}

impl Conversation {
    pub fn involves(&self, signal: RecordId) -> bool {
        self.members.iter().any(|member| member.signal == signal)
    }

    pub fn member(&self, signal: RecordId) -> Option<&Member> {
        self.members.iter().find(|member| member.signal == signal)
    }

    /// Member ids in merge order.
    pub fn signal_ids(&self) -> impl Iterator<Item = RecordId> + '_ {
        self.members.iter().map(|member| member.signal)
    }
}
