//! Scriptable in-memory radio stack.

use bleproc_shared::errors::RadioError;
use bleproc_shared::radio::{
    Completion, ConnectionHandle, EventNotifier, Feature, Passkey, PrivacyConfig, RadioStack,
    SecurityEventHandler, SecurityParams,
};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, ThreadId};

/// Radio operation whose outcome can be scripted.
///
/// `PreserveBonding` and `PrivacyConfig` are synchronous; only
/// [`Behavior::FailSync`] changes their result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Initialize,
    Security,
    Privacy,
    PreserveBonding,
    PrivacyConfig,
}

/// How the fake answers an asynchronous call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
    /// Accept, then run the completion with `Ok` before returning.
    Succeed,
    /// Reject synchronously; the completion is dropped.
    FailSync(RadioError),
    /// Accept, then run the completion with the error before returning.
    FailAsync(RadioError),
    /// Accept and keep the completion until [`FakeRadio::release`].
    Hold,
}

/// Every call the fake received, in order. Queries are not recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RadioCall {
    Initialize,
    Shutdown,
    SetEventNotifier { installed: bool },
    ProcessEvents,
    InitSecurity(SecurityParams),
    SetSecurityEventHandler { installed: bool },
    PreserveBondingState(bool),
    AcceptPairingRequest(ConnectionHandle),
    SetPrivacyConfiguration(PrivacyConfig),
    EnablePrivacy,
}

/// Security manager event the fake delivers from `process_events()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityEvent {
    PairingRequest(ConnectionHandle),
    PasskeyDisplay(ConnectionHandle, Passkey),
    PairingResult(ConnectionHandle, Result<(), RadioError>),
    LinkEncryption(ConnectionHandle, bool),
}

#[derive(Default)]
struct State {
    behaviors: HashMap<Op, Behavior>,
    held: HashMap<Op, Completion>,
    unsupported: HashSet<Feature>,
    notifier: Option<EventNotifier>,
    security_handler: Option<Arc<dyn SecurityEventHandler>>,
    pending_events: VecDeque<SecurityEvent>,
    calls: Vec<(RadioCall, ThreadId)>,
}

/// In-memory [`RadioStack`] that records calls and follows scripted behaviors.
///
/// Unscripted operations succeed. All features are supported unless removed.
#[derive(Default)]
pub struct FakeRadio {
    initialized: AtomicBool,
    state: Mutex<State>,
}

impl FakeRadio {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_behavior(&self, op: Op, behavior: Behavior) {
        self.state.lock().behaviors.insert(op, behavior);
    }

    pub fn remove_feature(&self, feature: Feature) {
        self.state.lock().unsupported.insert(feature);
    }

    pub fn set_initialized(&self, initialized: bool) {
        self.initialized.store(initialized, Ordering::SeqCst);
    }

    /// Whether a completion for `op` is being held.
    pub fn is_holding(&self, op: Op) -> bool {
        self.state.lock().held.contains_key(&op)
    }

    /// Run the held completion for `op`. Returns false if none was held.
    ///
    /// May be called from any thread.
    pub fn release(&self, op: Op, result: Result<(), RadioError>) -> bool {
        let completion = self.state.lock().held.remove(&op);
        let Some(completion) = completion else {
            return false;
        };
        if op == Op::Initialize && result.is_ok() {
            self.set_initialized(true);
        }
        completion(result);
        true
    }

    /// Fire the registered event notifier, as the hardware would.
    ///
    /// Returns false if no notifier is installed.
    pub fn notify_events_pending(&self) -> bool {
        let notifier = self.state.lock().notifier.clone();
        match notifier {
            Some(notify) => {
                notify();
                true
            }
            None => false,
        }
    }

    /// Queue a security event for the next `process_events()`.
    pub fn push_security_event(&self, event: SecurityEvent) {
        self.state.lock().pending_events.push_back(event);
    }

    pub fn has_notifier(&self) -> bool {
        self.state.lock().notifier.is_some()
    }

    pub fn has_security_handler(&self) -> bool {
        self.state.lock().security_handler.is_some()
    }

    pub fn calls(&self) -> Vec<RadioCall> {
        self.state.lock().calls.iter().map(|(c, _)| c.clone()).collect()
    }

    pub fn count(&self, matches: impl Fn(&RadioCall) -> bool) -> usize {
        self.state.lock().calls.iter().filter(|(c, _)| matches(c)).count()
    }

    /// Threads that made recorded calls.
    pub fn calling_threads(&self) -> HashSet<ThreadId> {
        self.state.lock().calls.iter().map(|(_, t)| *t).collect()
    }

    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    fn record(&self, call: RadioCall) {
        self.state.lock().calls.push((call, thread::current().id()));
    }

    fn behavior(&self, op: Op) -> Behavior {
        self.state
            .lock()
            .behaviors
            .get(&op)
            .copied()
            .unwrap_or(Behavior::Succeed)
    }

    fn sync_result(&self, op: Op) -> Result<(), RadioError> {
        match self.behavior(op) {
            Behavior::FailSync(e) => Err(e),
            _ => Ok(()),
        }
    }

    fn dispatch(&self, op: Op, on_complete: Completion) -> Result<(), RadioError> {
        match self.behavior(op) {
            Behavior::Succeed => {
                if op == Op::Initialize {
                    self.set_initialized(true);
                }
                on_complete(Ok(()));
                Ok(())
            }
            Behavior::FailSync(e) => Err(e),
            Behavior::FailAsync(e) => {
                on_complete(Err(e));
                Ok(())
            }
            Behavior::Hold => {
                self.state.lock().held.insert(op, on_complete);
                Ok(())
            }
        }
    }
}

impl RadioStack for FakeRadio {
    fn has_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    fn initialize(&self, on_complete: Completion) -> Result<(), RadioError> {
        self.record(RadioCall::Initialize);
        self.dispatch(Op::Initialize, on_complete)
    }

    fn shutdown(&self) {
        self.record(RadioCall::Shutdown);
        self.set_initialized(false);
    }

    fn is_feature_supported(&self, feature: Feature) -> bool {
        !self.state.lock().unsupported.contains(&feature)
    }

    fn set_event_notifier(&self, notifier: Option<EventNotifier>) {
        self.record(RadioCall::SetEventNotifier {
            installed: notifier.is_some(),
        });
        self.state.lock().notifier = notifier;
    }

    fn process_events(&self) {
        self.record(RadioCall::ProcessEvents);
        loop {
            let (event, handler) = {
                let mut state = self.state.lock();
                let Some(event) = state.pending_events.pop_front() else {
                    break;
                };
                (event, state.security_handler.clone())
            };
            let Some(handler) = handler else {
                continue;
            };
            match event {
                SecurityEvent::PairingRequest(conn) => handler.pairing_request(conn),
                SecurityEvent::PasskeyDisplay(conn, key) => handler.passkey_display(conn, key),
                SecurityEvent::PairingResult(conn, result) => handler.pairing_result(conn, result),
                SecurityEvent::LinkEncryption(conn, on) => handler.link_encryption_result(conn, on),
            }
        }
    }

    fn init_security(
        &self,
        params: &SecurityParams,
        on_complete: Completion,
    ) -> Result<(), RadioError> {
        self.record(RadioCall::InitSecurity(params.clone()));
        self.dispatch(Op::Security, on_complete)
    }

    fn set_security_event_handler(&self, handler: Option<Arc<dyn SecurityEventHandler>>) {
        self.record(RadioCall::SetSecurityEventHandler {
            installed: handler.is_some(),
        });
        self.state.lock().security_handler = handler;
    }

    fn preserve_bonding_state_on_reset(&self, enable: bool) -> Result<(), RadioError> {
        self.record(RadioCall::PreserveBondingState(enable));
        self.sync_result(Op::PreserveBonding)
    }

    fn accept_pairing_request(&self, connection: ConnectionHandle) -> Result<(), RadioError> {
        self.record(RadioCall::AcceptPairingRequest(connection));
        Ok(())
    }

    fn set_peripheral_privacy_configuration(
        &self,
        config: &PrivacyConfig,
    ) -> Result<(), RadioError> {
        self.record(RadioCall::SetPrivacyConfiguration(config.clone()));
        self.sync_result(Op::PrivacyConfig)
    }

    fn enable_privacy(&self, on_complete: Completion) -> Result<(), RadioError> {
        self.record(RadioCall::EnablePrivacy);
        self.dispatch(Op::Privacy, on_complete)
    }
}
