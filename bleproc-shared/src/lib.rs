//! bleproc shared types
//!
//! This crate contains the contract between the BLE process core (bleproc)
//! and a concrete radio stack binding: the `RadioStack` trait, capability
//! and parameter types, and the error taxonomy used on both sides.

pub mod constants;
pub mod errors;
pub mod radio;

pub use errors::{BleError, BleResult, RadioError, StageFailure};
pub use radio::{
    Completion, ConnectionHandle, EventNotifier, Feature, IoCapability, Passkey, PrivacyConfig,
    RadioStack, ResolutionStrategy, SecurityEventHandler, SecurityParams,
};
