//! Built-in stages.
//!
//! Each stage configures one radio subsystem and reports back through its
//! completer. Custom stages implement [`Stage`](super::Stage) the same way.

mod base;
mod privacy;
mod security;

pub use base::BaseStage;
pub use privacy::PrivacyStage;
pub use security::{SecurityEventCounts, SecurityEvents, SecurityStage};
