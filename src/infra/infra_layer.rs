// The infra module contains implementations of core traits.
// Each feature implementation goes in its own submodule.

#[path = "clock/mod.rs"]
pub mod clock;
