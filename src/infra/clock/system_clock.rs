// Wall-clock implementation of the core `Clock` port.

use crate::core::moderation::Clock;
use chrono::{DateTime, Utc};

/// Reads the real system time. This is what production wiring uses.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
