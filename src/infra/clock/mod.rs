// Clock implementations for the moderation service.

pub mod manual_clock;
pub mod system_clock;

// Re-export for convenience
pub use manual_clock::ManualClock;
pub use system_clock::SystemClock;
