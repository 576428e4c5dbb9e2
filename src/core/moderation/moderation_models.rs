// Moderation domain models - data structures for the moderation service.
//
// These are pure domain types with no transport or UI dependencies.
// The messaging layer turns them into whatever its clients need (all of them
// serialize to camelCase JSON).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An active or expired suppression of a user's ability to post in one room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MutedUser {
    pub user_id: String,
    pub display_name: String,
    /// Moderator who issued the mute
    pub muted_by: String,
    pub reason: String,
    pub muted_at: DateTime<Utc>,
    /// `None` means the mute never expires on its own
    pub muted_until: Option<DateTime<Utc>>,
    pub room_id: String,
}

impl MutedUser {
    /// Whether the mute ran out strictly before `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.muted_until {
            Some(until) => until < now,
            None => false,
        }
    }

    pub fn is_indefinite(&self) -> bool {
        self.muted_until.is_none()
    }
}

/// Audit entry for a message a moderator deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletedMessageRecord {
    pub message_id: String,
    pub deleted_by: String,
    pub reason: String,
    pub deleted_at: DateTime<Utc>,
    pub room_id: String,
}

/// Why the content filter flagged a message.
///
/// Serializes as the human-readable text shown to the sender.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(into = "String")]
pub enum FilterWarning {
    /// A profanity rule matched and was redacted
    InappropriateLanguage,
    /// Repeated characters or a long uppercase run
    Spam,
    /// Longer than the configured maximum
    TooLong { max: usize },
}

impl FilterWarning {
    /// Whether this warning stops the message from being accepted.
    pub fn is_blocking(&self) -> bool {
        !matches!(self, FilterWarning::InappropriateLanguage)
    }
}

impl std::fmt::Display for FilterWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FilterWarning::InappropriateLanguage => {
                write!(f, "Message contains inappropriate language")
            }
            FilterWarning::Spam => write!(f, "Message appears to be spam"),
            FilterWarning::TooLong { max } => {
                write!(f, "Message is too long (max {} characters)", max)
            }
        }
    }
}

impl From<FilterWarning> for String {
    fn from(warning: FilterWarning) -> Self {
        warning.to_string()
    }
}

/// Result of running a message through the content filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterResult {
    /// Original content with every profanity match replaced by asterisks
    pub filtered: String,
    /// True when any blocking rule matched
    pub blocked: bool,
    /// Every triggered warning, in rule order
    pub warnings: Vec<FilterWarning>,
}

/// Result of a spam-rate check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpamCheckResult {
    pub is_spam: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl SpamCheckResult {
    /// Create a "not spam" result
    pub fn ok() -> Self {
        Self {
            is_spam: false,
            warning: None,
        }
    }

    /// Create a spam result
    pub fn spam(warning: impl Into<String>) -> Self {
        Self {
            is_spam: true,
            warning: Some(warning.into()),
        }
    }
}

/// Result of asking whether a user is muted in a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MuteStatus {
    pub muted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub muted_user: Option<MutedUser>,
}

impl MuteStatus {
    pub fn not_muted() -> Self {
        Self {
            muted: false,
            muted_user: None,
        }
    }

    pub fn muted(record: MutedUser) -> Self {
        Self {
            muted: true,
            muted_user: Some(record),
        }
    }
}

/// Outcome of the full admission check for one incoming message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(
    tag = "outcome",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum MessageVerdict {
    /// Deliver `filtered`; `warnings` only carries non-blocking notes
    Accepted {
        filtered: String,
        warnings: Vec<FilterWarning>,
    },
    /// Sender is muted in this room
    Muted { muted_user: MutedUser },
    /// Content filter refused the message
    Blocked {
        filtered: String,
        warnings: Vec<FilterWarning>,
    },
    /// Sender exceeded the message rate
    RateLimited { warning: String },
}

impl MessageVerdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, MessageVerdict::Accepted { .. })
    }
}
