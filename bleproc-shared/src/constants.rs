//! Shared constants between the process core and radio bindings.

/// Well-known stage identities.
pub mod stages {
    /// Security manager configuration stage.
    pub const SECURITY: &str = "security";

    /// Privacy enablement stage (requires security).
    pub const PRIVACY: &str = "privacy";

    /// Innermost stage; declares readiness.
    pub const BASE: &str = "base";
}

/// Security manager constants
pub mod security {
    /// Number of decimal digits in a static passkey.
    pub const PASSKEY_LENGTH: usize = 6;
}

/// Logging defaults
pub mod logging {
    /// Filter directive used when `RUST_LOG` is not set.
    pub const DEFAULT_FILTER: &str = "info";
}
