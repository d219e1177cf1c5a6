//! The RPC connection state machine and the state shared between the worker
//! thread and caller threads.

use crate::model::Configuration;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// Connection state, owned by the worker and transitioned only under `§4.5`'s
/// rules. Readers on caller threads take the lock; they never write it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RpcState {
    Disconnected,
    Connecting,
    Connected,
}

/// State shared between the engine's worker thread and the façade's caller
/// threads. Each field is independently locked per §5, rather than behind
/// one coarse mutex, since the worker and a caller thread legitimately need
/// to touch different fields concurrently (e.g. a caller reading `state`
/// while the worker writes `configuration`).
#[derive(Debug, Default)]
pub struct SharedState {
    state: Mutex<RpcStateCell>,
    configuration: Mutex<Option<Configuration>>,
    abort: AtomicBool,
    shutdown: AtomicBool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RpcStateCell(RpcState);

impl Default for RpcStateCell {
    fn default() -> Self {
        Self(RpcState::Disconnected)
    }
}

impl SharedState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> RpcState {
        self.state.lock().expect("state mutex poisoned").0
    }

    pub fn set_state(&self, state: RpcState) {
        self.state.lock().expect("state mutex poisoned").0 = state;
    }

    pub fn configuration(&self) -> Option<Configuration> {
        self.configuration
            .lock()
            .expect("configuration mutex poisoned")
            .clone()
    }

    pub fn set_configuration(&self, configuration: Configuration) {
        *self.configuration.lock().expect("configuration mutex poisoned") = Some(configuration);
    }

    pub fn is_abort(&self) -> bool {
        self.abort.load(Ordering::SeqCst)
    }

    /// Monotone: once set, never cleared for the lifetime of this instance.
    pub fn set_abort(&self) {
        self.abort.store(true, Ordering::SeqCst);
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    pub fn set_shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_disconnected_with_no_flags_set() {
        let shared = SharedState::new();
        assert_eq!(shared.state(), RpcState::Disconnected);
        assert!(!shared.is_abort());
        assert!(!shared.is_shutdown());
        assert!(shared.configuration().is_none());
    }

    #[test]
    fn state_transitions_are_observable() {
        let shared = SharedState::new();
        shared.set_state(RpcState::Connecting);
        assert_eq!(shared.state(), RpcState::Connecting);
        shared.set_state(RpcState::Connected);
        assert_eq!(shared.state(), RpcState::Connected);
    }

    #[test]
    fn abort_and_shutdown_flags_are_monotone_once_set() {
        let shared = SharedState::new();
        shared.set_shutdown();
        assert!(shared.is_shutdown());
        shared.set_abort();
        assert!(shared.is_abort());
        assert!(shared.is_shutdown());
    }

    #[test]
    fn configuration_round_trips() {
        let shared = SharedState::new();
        shared.set_configuration(Configuration {
            cdn_host: "cdn.example".into(),
            api_endpoint: "api.example".into(),
        });
        let configuration = shared.configuration().unwrap();
        assert_eq!(configuration.cdn_host, "cdn.example");
    }
}
