//! Engine- and transport-level configuration.
//!
//! The wire protocol itself (socket scan range, payload limit, handshake
//! version) is fixed by §4.1/§6 and lives as plain constants in
//! [`crate::ipc::protocol::constants`]. This module covers everything
//! layered on top of it: which local endpoint to target, how the worker
//! thread is sized and paced, and how events reach the caller.

use std::time::Duration;

/// Which local Discord IPC endpoint to connect to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipeConfig {
    /// Probe candidate sockets/pipes in order (0..max_sockets) and use the
    /// first one that accepts a connection.
    Auto,
    /// Connect to exactly this socket/pipe index, skipping discovery.
    PipeNumber(u8),
    /// Connect to an explicit filesystem path (Unix) or pipe name (Windows),
    /// bypassing discovery entirely. Mainly useful for tests and non-standard
    /// Discord installations.
    CustomPath(String),
}

impl Default for PipeConfig {
    fn default() -> Self {
        Self::Auto
    }
}

/// How server-originated messages reach the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    /// The worker thread invokes the caller's callback directly as each
    /// message is parsed. The callback runs on the worker thread and must
    /// not block it for long.
    Auto,
    /// Messages are pushed onto the bounded inbound queue and the caller
    /// retrieves them later with `invoke()` / `poll_events()`.
    Manual,
}

impl Default for DispatchMode {
    fn default() -> Self {
        Self::Manual
    }
}

/// Tuning knobs for the background connection engine spawned by [`crate::engine::spawn`].
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Capacity of the outbound command queue. 512 by default; overflow
    /// drops the oldest unsent command and logs an error, since it means the
    /// caller is producing commands faster than the worker can transmit them.
    pub outbound_capacity: usize,
    /// Capacity of the inbound message queue in [`DispatchMode::Manual`]. 128
    /// by default. A capacity of 0 means "never buffer, deliver only via
    /// callback" and only makes sense paired with [`DispatchMode::Auto`].
    pub inbound_capacity: usize,
    /// How long the worker blocks between checking the outbound queue signal
    /// and the transport for incoming data. Keeps the worker responsive to
    /// shutdown/abort requests without a dedicated wakeup for every case.
    pub poll_timeout: Duration,
    /// Minimum reconnect delay, used immediately after the first failure.
    pub backoff_min: Duration,
    /// Maximum reconnect delay, reached after 100 consecutive failures.
    pub backoff_max: Duration,
    /// How inbound server messages are delivered to the caller.
    pub dispatch_mode: DispatchMode,
    /// If true, calling `set_presence()` with a payload identical to the
    /// last one successfully sent is a no-op rather than a wire round-trip.
    pub skip_identical_presence: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            outbound_capacity: 512,
            inbound_capacity: 128,
            poll_timeout: Duration::from_millis(1000),
            backoff_min: Duration::from_millis(500),
            backoff_max: Duration::from_millis(60_000),
            dispatch_mode: DispatchMode::Manual,
            skip_identical_presence: true,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dispatch_mode(mut self, mode: DispatchMode) -> Self {
        self.dispatch_mode = mode;
        self
    }

    pub fn with_outbound_capacity(mut self, capacity: usize) -> Self {
        self.outbound_capacity = capacity;
        self
    }

    pub fn with_inbound_capacity(mut self, capacity: usize) -> Self {
        self.inbound_capacity = capacity;
        self
    }

    pub fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }

    pub fn with_backoff(mut self, min: Duration, max: Duration) -> Self {
        self.backoff_min = min;
        self.backoff_max = max;
        self
    }

    pub fn with_skip_identical_presence(mut self, skip: bool) -> Self {
        self.skip_identical_presence = skip;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let config = EngineConfig::default();
        assert_eq!(config.outbound_capacity, 512);
        assert_eq!(config.inbound_capacity, 128);
        assert_eq!(config.poll_timeout, Duration::from_millis(1000));
        assert_eq!(config.dispatch_mode, DispatchMode::Manual);
        assert!(config.skip_identical_presence);
    }

    #[test]
    fn builder_methods_override_defaults() {
        let config = EngineConfig::new()
            .with_dispatch_mode(DispatchMode::Auto)
            .with_outbound_capacity(16)
            .with_inbound_capacity(0)
            .with_poll_timeout(Duration::from_millis(250))
            .with_backoff(Duration::from_millis(100), Duration::from_millis(5_000))
            .with_skip_identical_presence(false);

        assert_eq!(config.dispatch_mode, DispatchMode::Auto);
        assert_eq!(config.outbound_capacity, 16);
        assert_eq!(config.inbound_capacity, 0);
        assert_eq!(config.poll_timeout, Duration::from_millis(250));
        assert_eq!(config.backoff_min, Duration::from_millis(100));
        assert_eq!(config.backoff_max, Duration::from_millis(5_000));
        assert!(!config.skip_identical_presence);
    }

    #[test]
    fn pipe_config_default_is_auto() {
        assert_eq!(PipeConfig::default(), PipeConfig::Auto);
    }
}
