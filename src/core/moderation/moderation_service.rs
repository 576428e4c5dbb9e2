// Moderation service - core business logic for chat admission control.
//
// This service handles:
// - Content filtering (profanity redaction, spam shapes, length)
// - Rate limiting (too many messages in a rolling window)
// - Timed and indefinite mutes per room, with lazy expiry
// - An append-only audit log of moderator deletions
//
// NO transport or UI dependencies here - just pure domain logic. All state
// lives in memory for the lifetime of the process.

use super::content_filter::ContentFilter;
use super::moderation_config::{ConfigError, ModerationConfig};
use super::moderation_models::{
    DeletedMessageRecord, FilterResult, MessageVerdict, MuteStatus, MutedUser, SpamCheckResult,
};
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

pub const RATE_LIMIT_WARNING: &str = "You are sending messages too quickly. Please slow down.";

// ============================================================================
// CLOCK TRAIT (PORT)
// ============================================================================

/// Source of "now" for expiry and rate-window decisions.
///
/// The infra layer provides a wall clock for production and a manual clock
/// for tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

// ============================================================================
// CORE SERVICE
// ============================================================================

/// Moderation service for one chat deployment.
///
/// A single instance serves every room. Each map is sharded by DashMap, and
/// every operation does its read-modify-write while holding the shard lock
/// for its key, so two calls for the same user (or room) never interleave.
pub struct ModerationService<C: Clock> {
    clock: C,
    config: ModerationConfig,
    filter: ContentFilter,
    /// Room ID -> mute records in storage order
    muted_users: DashMap<String, Vec<MutedUser>>,
    /// Room ID -> deletion audit log in insertion order
    deleted_messages: DashMap<String, Vec<DeletedMessageRecord>>,
    /// User ID -> arrival times inside the current spam window
    spam_windows: DashMap<String, Vec<DateTime<Utc>>>,
}

impl<C: Clock> ModerationService<C> {
    /// Create a new moderation service with the given clock and thresholds.
    ///
    /// Fails if any threshold is zero: a zero window cap would rate-limit
    /// every sender and a zero run length would block empty content.
    pub fn new(clock: C, config: ModerationConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::build(clock, config))
    }

    /// Create a service with the default thresholds.
    pub fn with_clock(clock: C) -> Self {
        Self::build(clock, ModerationConfig::default())
    }

    fn build(clock: C, config: ModerationConfig) -> Self {
        let filter = ContentFilter::new(&config);
        Self {
            clock,
            config,
            filter,
            muted_users: DashMap::new(),
            deleted_messages: DashMap::new(),
            spam_windows: DashMap::new(),
        }
    }

    pub fn config(&self) -> &ModerationConfig {
        &self.config
    }

    // ------------------------------------------------------------------------
    // Content filter
    // ------------------------------------------------------------------------

    /// Filter a message's content.
    ///
    /// `room_id` is carried for log correlation only; every room shares the
    /// same policy.
    pub fn filter_message(&self, content: &str, room_id: &str) -> FilterResult {
        let result = self.filter.filter(content);

        if !result.warnings.is_empty() {
            tracing::debug!(
                "Filter flagged message in room {}: blocked={}, warnings={}",
                room_id,
                result.blocked,
                result.warnings.len()
            );
        }

        result
    }

    // ------------------------------------------------------------------------
    // Spam-rate detector
    // ------------------------------------------------------------------------

    /// Check (and record) a message attempt against the user's spam window.
    ///
    /// The window is per user, not per room: flooding one room throttles the
    /// user everywhere. A rejected attempt is not recorded, so a user who
    /// stops sending recovers once old entries age out.
    pub fn check_spam_rate(&self, user_id: &str, room_id: &str) -> SpamCheckResult {
        let now = self.clock.now();
        let cutoff = now
            .checked_sub_signed(self.config.spam_window())
            .unwrap_or(DateTime::<Utc>::MIN_UTC);

        // Entry guard holds the shard lock for the whole prune-check-append
        let mut window = self.spam_windows.entry(user_id.to_string()).or_default();
        window.retain(|sent_at| *sent_at > cutoff);

        if window.len() >= self.config.max_messages_per_window {
            tracing::warn!(
                "User {} hit the rate limit in room {} ({} messages in {}s)",
                user_id,
                room_id,
                window.len(),
                self.config.spam_window_secs
            );
            return SpamCheckResult::spam(RATE_LIMIT_WARNING);
        }

        window.push(now);
        SpamCheckResult::ok()
    }

    /// Forget a user's spam window (admin action).
    ///
    /// Returns whether the user had one.
    pub fn clear_spam_window(&self, user_id: &str) -> bool {
        self.spam_windows.remove(user_id).is_some()
    }

    // ------------------------------------------------------------------------
    // Mute manager
    // ------------------------------------------------------------------------

    /// Mute a user in a room, replacing any existing mute for that pair.
    ///
    /// `duration_minutes` of `None` mutes indefinitely. No authority check
    /// is made on `muted_by`; the caller is expected to have done that.
    pub fn mute_user(
        &self,
        user_id: &str,
        display_name: &str,
        muted_by: &str,
        reason: &str,
        room_id: &str,
        duration_minutes: Option<u32>,
    ) -> MutedUser {
        let now = self.clock.now();
        let muted_until = duration_minutes
            .map(|minutes| Duration::minutes(i64::from(minutes)))
            .and_then(|duration| now.checked_add_signed(duration));

        let record = MutedUser {
            user_id: user_id.to_string(),
            display_name: display_name.to_string(),
            muted_by: muted_by.to_string(),
            reason: reason.to_string(),
            muted_at: now,
            muted_until,
            room_id: room_id.to_string(),
        };

        let mut room = self.muted_users.entry(room_id.to_string()).or_default();
        room.retain(|existing| existing.user_id != user_id);
        room.push(record.clone());

        match duration_minutes {
            Some(minutes) => tracing::info!(
                "User {} muted in room {} by {} for {} minutes: {}",
                user_id,
                room_id,
                muted_by,
                minutes,
                reason
            ),
            None => tracing::info!(
                "User {} muted indefinitely in room {} by {}: {}",
                user_id,
                room_id,
                muted_by,
                reason
            ),
        }

        record
    }

    /// Check whether a user is currently muted in a room.
    ///
    /// An expired record found here is removed on the spot.
    pub fn is_user_muted(&self, user_id: &str, room_id: &str) -> MuteStatus {
        let now = self.clock.now();

        let mut room = match self.muted_users.get_mut(room_id) {
            Some(room) => room,
            None => return MuteStatus::not_muted(),
        };

        let index = match room.iter().position(|m| m.user_id == user_id) {
            Some(index) => index,
            None => return MuteStatus::not_muted(),
        };

        if room[index].is_expired(now) {
            room.remove(index);
            tracing::debug!("Mute for user {} in room {} expired", user_id, room_id);
            return MuteStatus::not_muted();
        }

        MuteStatus::muted(room[index].clone())
    }

    /// Lift a user's mute in a room.
    ///
    /// Returns `false` if there was nothing to lift.
    pub fn unmute_user(&self, user_id: &str, room_id: &str) -> bool {
        let removed = match self.muted_users.get_mut(room_id) {
            Some(mut room) => {
                let before = room.len();
                room.retain(|m| m.user_id != user_id);
                room.len() != before
            }
            None => false,
        };

        if removed {
            tracing::info!("User {} unmuted in room {}", user_id, room_id);
        }

        removed
    }

    /// Every stored mute record for a room, in storage order.
    ///
    /// Expired records stay listed until something prunes them
    /// (`is_user_muted` for that user, or `purge_expired_mutes`).
    pub fn get_muted_users(&self, room_id: &str) -> Vec<MutedUser> {
        self.muted_users
            .get(room_id)
            .map(|room| room.clone())
            .unwrap_or_default()
    }

    /// Stored mute records for a room that have not expired yet.
    ///
    /// Read-only: expired records are skipped, not removed.
    pub fn get_active_muted_users(&self, room_id: &str) -> Vec<MutedUser> {
        let now = self.clock.now();
        let records = match self.muted_users.get(room_id) {
            Some(records) => records,
            None => return Vec::new(),
        };

        records
            .iter()
            .filter(|m| !m.is_expired(now))
            .cloned()
            .collect()
    }

    /// Remove every expired mute in every room. Returns how many were removed.
    ///
    /// Nothing calls this implicitly; the host decides whether and when to
    /// run it.
    pub fn purge_expired_mutes(&self) -> usize {
        let now = self.clock.now();
        let mut purged = 0;

        for mut room in self.muted_users.iter_mut() {
            let before = room.len();
            room.retain(|m| !m.is_expired(now));
            purged += before - room.len();
        }

        if purged > 0 {
            tracing::info!("Purged {} expired mutes", purged);
        }

        purged
    }

    // ------------------------------------------------------------------------
    // Deletion auditor
    // ------------------------------------------------------------------------

    /// Record that a moderator deleted a message. Always returns `true`.
    ///
    /// The message itself is not looked up; deleting it and checking the
    /// moderator's rights both belong to the caller.
    pub fn delete_message(
        &self,
        message_id: &str,
        deleted_by: &str,
        reason: &str,
        room_id: &str,
    ) -> bool {
        let record = DeletedMessageRecord {
            message_id: message_id.to_string(),
            deleted_by: deleted_by.to_string(),
            reason: reason.to_string(),
            deleted_at: self.clock.now(),
            room_id: room_id.to_string(),
        };

        self.deleted_messages
            .entry(room_id.to_string())
            .or_default()
            .push(record);

        tracing::info!(
            "Message {} deleted in room {} by {}: {}",
            message_id,
            room_id,
            deleted_by,
            reason
        );

        true
    }

    /// The deletion audit log for a room, oldest first.
    pub fn get_deleted_messages(&self, room_id: &str) -> Vec<DeletedMessageRecord> {
        self.deleted_messages
            .get(room_id)
            .map(|log| log.clone())
            .unwrap_or_default()
    }

    // ------------------------------------------------------------------------
    // Combined admission check
    // ------------------------------------------------------------------------

    /// Run the full admission flow for an incoming message.
    ///
    /// Order: mute status, content filter, spam rate. A muted sender or a
    /// blocked message never consumes a slot in the spam window.
    pub fn moderate_message(&self, user_id: &str, room_id: &str, content: &str) -> MessageVerdict {
        if let Some(muted_user) = self.is_user_muted(user_id, room_id).muted_user {
            return MessageVerdict::Muted { muted_user };
        }

        let FilterResult {
            filtered,
            blocked,
            warnings,
        } = self.filter_message(content, room_id);

        if blocked {
            return MessageVerdict::Blocked { filtered, warnings };
        }

        let spam = self.check_spam_rate(user_id, room_id);
        if spam.is_spam {
            return MessageVerdict::RateLimited {
                warning: spam
                    .warning
                    .unwrap_or_else(|| RATE_LIMIT_WARNING.to_string()),
            };
        }

        MessageVerdict::Accepted { filtered, warnings }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::moderation::FilterWarning;
    use crate::infra::clock::ManualClock;

    fn service() -> (ModerationService<ManualClock>, ManualClock) {
        let clock = ManualClock::at_epoch();
        (ModerationService::with_clock(clock.clone()), clock)
    }

    fn mute(
        service: &ModerationService<ManualClock>,
        user: &str,
        room: &str,
        minutes: Option<u32>,
    ) -> MutedUser {
        service.mute_user(user, "Student", "instructor-1", "disruptive", room, minutes)
    }

    #[test]
    fn test_ten_messages_allowed_eleventh_is_spam() {
        let (service, _clock) = service();

        for i in 0..10 {
            let result = service.check_spam_rate("u1", "r1");
            assert!(!result.is_spam, "Message {} should not be spam", i);
        }

        let result = service.check_spam_rate("u1", "r1");
        assert!(result.is_spam);
        assert_eq!(result.warning.as_deref(), Some(RATE_LIMIT_WARNING));
    }

    #[test]
    fn test_rejected_attempts_are_not_recorded() {
        let (service, clock) = service();

        for _ in 0..10 {
            service.check_spam_rate("u1", "r1");
        }
        // Hammering while blocked must not extend the block
        for _ in 0..50 {
            assert!(service.check_spam_rate("u1", "r1").is_spam);
        }

        clock.advance(Duration::seconds(61));
        assert!(!service.check_spam_rate("u1", "r1").is_spam);
    }

    #[test]
    fn test_window_slides() {
        let (service, clock) = service();

        // 5 messages at t=0, 5 at t=30
        for _ in 0..5 {
            service.check_spam_rate("u1", "r1");
        }
        clock.advance(Duration::seconds(30));
        for _ in 0..5 {
            service.check_spam_rate("u1", "r1");
        }
        assert!(service.check_spam_rate("u1", "r1").is_spam);

        // At t=60 the first five have aged out
        clock.advance(Duration::seconds(30));
        for i in 0..5 {
            assert!(!service.check_spam_rate("u1", "r1").is_spam, "slot {}", i);
        }
        assert!(service.check_spam_rate("u1", "r1").is_spam);
    }

    #[test]
    fn test_spam_window_is_shared_across_rooms() {
        let (service, _clock) = service();

        for i in 0..10 {
            service.check_spam_rate("u1", &format!("room-{}", i));
        }

        assert!(service.check_spam_rate("u1", "another-room").is_spam);
        assert!(!service.check_spam_rate("u2", "another-room").is_spam);
    }

    #[test]
    fn test_clear_spam_window() {
        let (service, _clock) = service();

        for _ in 0..10 {
            service.check_spam_rate("u1", "r1");
        }
        assert!(service.clear_spam_window("u1"));
        assert!(!service.clear_spam_window("u1"));
        assert!(!service.check_spam_rate("u1", "r1").is_spam);
    }

    #[test]
    fn test_timed_mute_expires_lazily() {
        let (service, clock) = service();

        mute(&service, "u1", "r1", Some(1));
        assert!(service.is_user_muted("u1", "r1").muted);

        // Still muted at exactly the expiry instant
        clock.advance(Duration::minutes(1));
        assert!(service.is_user_muted("u1", "r1").muted);

        clock.advance(Duration::seconds(1));
        // Listing still shows the stale record until something prunes it
        assert_eq!(service.get_muted_users("r1").len(), 1);
        assert!(service.get_active_muted_users("r1").is_empty());

        let status = service.is_user_muted("u1", "r1");
        assert!(!status.muted);
        assert!(status.muted_user.is_none());
        assert!(service.get_muted_users("r1").is_empty());
    }

    #[test]
    fn test_indefinite_mute() {
        let (service, clock) = service();

        let record = mute(&service, "u1", "r1", None);
        assert!(record.muted_until.is_none());

        clock.advance(Duration::days(365));
        let status = service.is_user_muted("u1", "r1");
        assert!(status.muted);
        assert_eq!(status.muted_user, Some(record));
    }

    #[test]
    fn test_mute_is_room_scoped() {
        let (service, _clock) = service();

        mute(&service, "u1", "r1", Some(10));

        assert!(service.is_user_muted("u1", "r1").muted);
        assert!(!service.is_user_muted("u1", "r2").muted);
        assert!(!service.is_user_muted("u2", "r1").muted);
    }

    #[test]
    fn test_remute_replaces_previous_record() {
        let (service, clock) = service();

        mute(&service, "u1", "r1", Some(5));
        mute(&service, "u2", "r1", Some(5));
        service.mute_user(
            "u1",
            "Student",
            "instructor-2",
            "second offence",
            "r1",
            Some(60),
        );

        let muted = service.get_muted_users("r1");
        assert_eq!(muted.len(), 2);
        // Replacement goes to the back of storage order
        assert_eq!(muted[0].user_id, "u2");
        assert_eq!(muted[1].user_id, "u1");
        assert_eq!(muted[1].reason, "second offence");
        assert_eq!(muted[1].muted_by, "instructor-2");

        // The longer duration wins
        clock.advance(Duration::minutes(30));
        assert!(service.is_user_muted("u1", "r1").muted);
    }

    #[test]
    fn test_unmute() {
        let (service, _clock) = service();

        assert!(!service.unmute_user("u1", "r1"));

        mute(&service, "u1", "r1", None);
        assert!(service.unmute_user("u1", "r1"));
        assert!(!service.is_user_muted("u1", "r1").muted);
        assert!(!service.unmute_user("u1", "r1"));
    }

    #[test]
    fn test_get_muted_users_keeps_insertion_order() {
        let (service, _clock) = service();

        for user in ["zoe", "adam", "mia"] {
            mute(&service, user, "r1", None);
        }
        mute(&service, "other", "r2", None);

        let ids: Vec<String> = service
            .get_muted_users("r1")
            .into_iter()
            .map(|m| m.user_id)
            .collect();
        assert_eq!(ids, vec!["zoe", "adam", "mia"]);
        assert!(service.get_muted_users("empty").is_empty());
    }

    #[test]
    fn test_purge_expired_mutes() {
        let (service, clock) = service();

        mute(&service, "u1", "r1", Some(1));
        mute(&service, "u2", "r1", None);
        mute(&service, "u3", "r2", Some(2));
        mute(&service, "u4", "r2", Some(60));

        clock.advance(Duration::minutes(5));
        assert_eq!(service.purge_expired_mutes(), 2);
        assert_eq!(service.purge_expired_mutes(), 0);

        assert_eq!(service.get_muted_users("r1")[0].user_id, "u2");
        assert_eq!(service.get_muted_users("r2")[0].user_id, "u4");
    }

    #[test]
    fn test_delete_message_appends_audit_record() {
        let (service, clock) = service();

        assert!(service.delete_message("m1", "instructor-1", "off topic", "r1"));
        clock.advance(Duration::seconds(5));
        assert!(service.delete_message("m1", "instructor-2", "again", "r1"));
        assert!(service.delete_message("m9", "instructor-1", "spam", "r2"));

        let log = service.get_deleted_messages("r1");
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].deleted_by, "instructor-1");
        assert_eq!(log[1].reason, "again");
        assert!(log[0].deleted_at < log[1].deleted_at);
        assert_eq!(service.get_deleted_messages("r2").len(), 1);
        assert!(service.get_deleted_messages("nowhere").is_empty());
    }

    #[test]
    fn test_moderate_accepts_and_redacts() {
        let (service, _clock) = service();

        let verdict = service.moderate_message("u1", "r1", "this homework is crap");

        assert_eq!(
            verdict,
            MessageVerdict::Accepted {
                filtered: "this homework is ****".to_string(),
                warnings: vec![FilterWarning::InappropriateLanguage],
            }
        );
    }

    #[test]
    fn test_moderate_muted_user_does_not_touch_window() {
        let (service, _clock) = service();

        mute(&service, "u1", "r1", None);
        for _ in 0..20 {
            let verdict = service.moderate_message("u1", "r1", "hello");
            assert!(matches!(verdict, MessageVerdict::Muted { .. }));
        }

        // Same user is free in another room and starts with an empty window
        assert!(service.moderate_message("u1", "r2", "hello").is_accepted());
    }

    #[test]
    fn test_moderate_blocked_then_rate_limited() {
        let (service, _clock) = service();

        let verdict = service.moderate_message("u1", "r1", "HELLOOOOO");
        assert!(matches!(verdict, MessageVerdict::Blocked { .. }));

        for _ in 0..10 {
            assert!(service.moderate_message("u1", "r1", "hi").is_accepted());
        }
        assert_eq!(
            service.moderate_message("u1", "r1", "hi"),
            MessageVerdict::RateLimited {
                warning: RATE_LIMIT_WARNING.to_string(),
            }
        );
    }

    #[test]
    fn test_custom_thresholds() {
        let config = ModerationConfig {
            spam_window_secs: 10,
            max_messages_per_window: 2,
            ..Default::default()
        };
        let clock = ManualClock::at_epoch();
        let service = ModerationService::new(clock.clone(), config).unwrap();

        assert!(!service.check_spam_rate("u1", "r1").is_spam);
        assert!(!service.check_spam_rate("u1", "r1").is_spam);
        assert!(service.check_spam_rate("u1", "r1").is_spam);

        clock.advance(Duration::seconds(10));
        assert!(!service.check_spam_rate("u1", "r1").is_spam);
    }

    #[test]
    fn test_zero_threshold_config_is_rejected() {
        let config = ModerationConfig {
            max_messages_per_window: 0,
            ..Default::default()
        };
        let result = ModerationService::new(ManualClock::at_epoch(), config);
        assert_eq!(
            result.err(),
            Some(ConfigError::Zero("max_messages_per_window"))
        );

        let config = ModerationConfig {
            uppercase_run: 0,
            ..Default::default()
        };
        let result = ModerationService::new(ManualClock::at_epoch(), config);
        assert_eq!(result.err(), Some(ConfigError::Zero("uppercase_run")));
    }
}
