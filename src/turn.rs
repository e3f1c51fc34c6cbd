//! Conversation turns read from the external session store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single turn of a conversation: who spoke, what they said, and when.
///
/// Turns are owned by the surrounding session store; the engine reads them
/// as an ordered, append-only sequence and never mutates them.
///
/// # Examples
///
/// ```
/// use qasmith::turn::ConversationTurn;
///
/// let q = ConversationTurn::user("What does section 4 cover?");
/// let a = ConversationTurn::assistant("Section 4 covers claim settlement.");
/// assert!(q.has_role(ConversationTurn::USER));
/// assert!(a.has_role(ConversationTurn::ASSISTANT));
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    /// The speaker's role, usually [`ConversationTurn::USER`] or
    /// [`ConversationTurn::ASSISTANT`].
    pub role: String,
    /// The text of the turn.
    pub text: String,
    /// When the turn was recorded.
    pub timestamp: DateTime<Utc>,
}

impl ConversationTurn {
    /// Role of a question asked by the end user.
    pub const USER: &'static str = "user";
    /// Role of an answer produced by the engine.
    pub const ASSISTANT: &'static str = "assistant";

    /// Creates a turn with an explicit role, timestamped now.
    #[must_use]
    pub fn new(role: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            text: text.into(),
            timestamp: Utc::now(),
        }
    }

    /// Creates a user turn timestamped now.
    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Self::USER, text)
    }

    /// Creates an assistant turn timestamped now.
    #[must_use]
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Self::ASSISTANT, text)
    }

    /// Returns true if this turn has the given role.
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.role == role
    }
}
