// Core moderation module - content filtering, spam-rate detection,
// mute management and the deletion audit log.

pub mod content_filter;
pub mod moderation_config;
pub mod moderation_models;
pub mod moderation_service;

pub use content_filter::*;
pub use moderation_config::*;
pub use moderation_models::*;
pub use moderation_service::*;
