//! Conversation timeline and history replay.
//!
//! The backend persists conversation history as paired turn records. Replay
//! expands each turn into a participant message followed by the narrator's
//! reply, with timestamps synthesized from position rather than wall-clock,
//! so that replaying the same history always yields the same ordering.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use reverie_api::TurnRecord;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Milliseconds between consecutive replayed turns.
const TURN_SPACING_MS: u64 = 1_000;

/// Offset of the narrator reply within its replayed turn.
const NARRATOR_OFFSET_MS: u64 = 500;

/// Unique id for a timeline message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub Uuid);

impl MessageId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Who spoke a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    Participant,
    Narrator,
}

/// One entry in the conversation timeline.
///
/// Timestamps are monotonically non-decreasing across a conversation, and a
/// participant message always strictly precedes its paired narrator reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub origin: Origin,
    pub text: String,
    pub timestamp_ms: u64,
}

impl Message {
    /// A participant message stamped with the current wall clock.
    pub fn participant(text: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(),
            origin: Origin::Participant,
            text: text.into(),
            timestamp_ms: now_ms(),
        }
    }

    /// A narrator message stamped strictly after `after_ms`.
    pub fn narrator_after(text: impl Into<String>, after_ms: u64) -> Self {
        Self {
            id: MessageId::new(),
            origin: Origin::Narrator,
            text: text.into(),
            timestamp_ms: now_ms().max(after_ms + 1),
        }
    }
}

/// Expand persisted turn records into an ordered message timeline.
///
/// Produces exactly two messages per turn, in turn order. Empty participant
/// or narrator text is preserved as an empty message so indices stay aligned
/// with the source sequence.
pub fn replay(turns: &[TurnRecord]) -> Vec<Message> {
    let mut messages = Vec::with_capacity(turns.len() * 2);

    for (index, turn) in turns.iter().enumerate() {
        let base_ms = index as u64 * TURN_SPACING_MS;
        messages.push(Message {
            id: MessageId::new(),
            origin: Origin::Participant,
            text: turn.participant.clone(),
            timestamp_ms: base_ms,
        });
        messages.push(Message {
            id: MessageId::new(),
            origin: Origin::Narrator,
            text: turn.narrator.clone(),
            timestamp_ms: base_ms + NARRATOR_OFFSET_MS,
        });
    }

    messages
}

/// Current wall clock as epoch milliseconds.
pub(crate) fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
