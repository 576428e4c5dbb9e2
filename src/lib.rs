// Chat moderation engine - message admission control for multi-room chat.
//
// **Architecture Overview:**
// - `core/` = Business logic (no I/O, no framework types)
// - `infra/` = Implementations of core traits (clocks)
//
// The messaging layer owns rooms, membership and delivery. It builds one
// `ModerationService`, shares it across request handlers, and calls into it
// before accepting or broadcasting a message.

// Same trick as the binary: point each layer at a descriptive root file
// instead of a pile of identical mod.rs files.
#[path = "core/core_layer.rs"]
pub mod core;
#[path = "infra/infra_layer.rs"]
pub mod infra;

pub use crate::core::moderation::{
    Clock, ConfigError, ContentFilter, DeletedMessageRecord, FilterResult, FilterWarning,
    MessageVerdict, ModerationConfig, ModerationService, MuteStatus, MutedUser, SpamCheckResult,
    RATE_LIMIT_WARNING,
};
pub use crate::infra::clock::{ManualClock, SystemClock};
