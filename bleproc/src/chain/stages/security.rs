//! Security manager stage and its event sink.

use crate::chain::{Progress, Stage, StageContext, StageError, StageId, StageKind};
use crate::options::SecurityConfig;
use bleproc_shared::constants::stages as stage_names;
use bleproc_shared::errors::RadioError;
use bleproc_shared::radio::{
    ConnectionHandle, Feature, Passkey, RadioStack, SecurityEventHandler,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// Configures the security manager.
///
/// Validates its [`SecurityConfig`] when it runs, issues `init_security`,
/// installs the [`SecurityEvents`] sink and, with bonding and a database
/// path, asks the stack to keep bonding state across resets.
pub struct SecurityStage {
    config: SecurityConfig,
    events: Arc<SecurityEvents>,
}

impl SecurityStage {
    pub fn new(config: SecurityConfig) -> Self {
        Self {
            config,
            events: Arc::new(SecurityEvents::default()),
        }
    }

    pub fn config(&self) -> &SecurityConfig {
        &self.config
    }

    /// Event sink installed on the radio when the stage runs.
    pub fn events(&self) -> Arc<SecurityEvents> {
        Arc::clone(&self.events)
    }
}

impl Stage for SecurityStage {
    fn id(&self) -> StageId {
        StageId::from(stage_names::SECURITY)
    }

    fn kind(&self) -> StageKind {
        StageKind::Security
    }

    fn begin(&self, cx: StageContext) -> Result<Progress, StageError> {
        let radio = cx.radio().clone();
        if !radio.is_feature_supported(Feature::Security) {
            return Err(StageError::Unsupported(Feature::Security));
        }

        let params = self.config.to_params()?;
        if params.enable_signing && !radio.is_feature_supported(Feature::Signing) {
            return Err(StageError::Unsupported(Feature::Signing));
        }

        tracing::debug!(
            bonding = params.enable_bonding,
            mitm = params.require_mitm,
            io = ?params.io_capability,
            signing = params.enable_signing,
            "Initializing security manager"
        );
        radio.init_security(&params, cx.into_completion())?;

        self.events.attach(&radio);
        radio.set_security_event_handler(Some(self.events.clone() as Arc<dyn SecurityEventHandler>));

        if self.config.preserves_bonding() {
            radio.preserve_bonding_state_on_reset(true)?;
            tracing::debug!(db_path = ?params.db_path, "Bonding state preserved across resets");
        }

        Ok(Progress::Pending)
    }
}

// ============================================================================
// Event Sink
// ============================================================================

/// Point-in-time copy of [`SecurityEvents`] counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SecurityEventCounts {
    pub pairing_requests: u64,
    pub pairings_completed: u64,
    pub pairings_failed: u64,
    pub links_encrypted: u64,
}

/// Long-lived security manager event sink.
///
/// Accepts every pairing request and keeps running totals of what happened.
/// Holds the radio weakly so the sink never keeps the stack alive.
#[derive(Default)]
pub struct SecurityEvents {
    radio: Mutex<Option<Weak<dyn RadioStack>>>,
    pairing_requests: AtomicU64,
    pairings_completed: AtomicU64,
    pairings_failed: AtomicU64,
    links_encrypted: AtomicU64,
}

impl SecurityEvents {
    fn attach(&self, radio: &Arc<dyn RadioStack>) {
        *self.radio.lock() = Some(Arc::downgrade(radio));
    }

    pub fn counts(&self) -> SecurityEventCounts {
        SecurityEventCounts {
            pairing_requests: self.pairing_requests.load(Ordering::Relaxed),
            pairings_completed: self.pairings_completed.load(Ordering::Relaxed),
            pairings_failed: self.pairings_failed.load(Ordering::Relaxed),
            links_encrypted: self.links_encrypted.load(Ordering::Relaxed),
        }
    }
}

impl SecurityEventHandler for SecurityEvents {
    fn pairing_request(&self, connection: ConnectionHandle) {
        self.pairing_requests.fetch_add(1, Ordering::Relaxed);

        let radio = self.radio.lock().as_ref().and_then(Weak::upgrade);
        let Some(radio) = radio else {
            tracing::warn!(%connection, "Pairing request with no radio attached");
            return;
        };

        match radio.accept_pairing_request(connection) {
            Ok(()) => tracing::info!(%connection, "Accepted pairing request"),
            Err(e) => tracing::warn!(%connection, "Failed to accept pairing request: {}", e),
        }
    }

    fn passkey_display(&self, connection: ConnectionHandle, passkey: Passkey) {
        let digits = format!("{:06}", passkey.value());
        tracing::debug!(%connection, passkey = %digits, "Display passkey");
    }

    fn pairing_result(&self, connection: ConnectionHandle, result: Result<(), RadioError>) {
        match result {
            Ok(()) => {
                self.pairings_completed.fetch_add(1, Ordering::Relaxed);
                tracing::info!(%connection, "Pairing complete");
            }
            Err(e) => {
                self.pairings_failed.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(%connection, "Pairing failed: {}", e);
            }
        }
    }

    fn link_encryption_result(&self, connection: ConnectionHandle, encrypted: bool) {
        if encrypted {
            self.links_encrypted.fetch_add(1, Ordering::Relaxed);
        }
        tracing::info!(%connection, encrypted, "Link encryption changed");
    }
}
