//! The connection engine: a single worker thread that owns the transport and
//! the protocol state machine, and the handle the façade uses to talk to it.
//!
//! Grounded on the reconnect/dispatch loop shape of `EmbarkStudios/discord-sdk`'s
//! IO task, adapted from its tokio-async + crossbeam-channel design to the
//! blocking `std::thread` + `Mutex`/`Condvar` model this crate uses
//! throughout, since a blocking pipe read makes a dedicated OS thread the
//! simplest correct choice (§9's design note).

use crate::activity::Activity;
use crate::backoff::BackoffPolicy;
use crate::command::OutboundCommand;
use crate::config::EngineConfig;
use crate::ipc::protocol::{constants, HandshakePayload, IpcMessage, Opcode, ServerEvent};
use crate::ipc::transport::PipeTransport;
use crate::message::{Message, MessageKind};
use crate::model::{Application, Configuration, User};
use crate::nonce::NonceGenerator;
use crate::oauth::{AuthenticateResponse, AuthorizeResponse};
use crate::queue::{BoundedQueue, PushOutcome, QueueSignal};
use crate::state::{RpcState, SharedState};
use crate::voice::VoiceSettings;
use log::{debug, error, trace, warn};
use serde_json::Value;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// The caller-facing handle to a running engine. Cloning is not needed: all
/// state it exposes is already behind `Arc`, so callers share one handle
/// (the façade holds exactly one) across threads.
pub struct EngineHandle {
    outbound: Arc<BoundedQueue<OutboundCommand>>,
    inbound: Arc<BoundedQueue<Message>>,
    shared: Arc<SharedState>,
    signal: Arc<QueueSignal>,
    worker: Mutex<Option<JoinHandle<()>>>,
    pid: u32,
}

/// Spawns the worker thread and returns a handle to it. `callback` selects
/// the dispatch mode: `Some` delivers every message on the worker thread as
/// it's produced ([`crate::config::DispatchMode::Auto`]); `None` buffers
/// messages on the inbound queue for the caller to drain.
pub fn spawn<T>(
    transport: T,
    client_id: String,
    target: i32,
    pid: u32,
    config: EngineConfig,
    callback: Option<Arc<dyn Fn(Message) + Send + Sync>>,
) -> EngineHandle
where
    T: PipeTransport + Send + 'static,
{
    let outbound = Arc::new(BoundedQueue::new(config.outbound_capacity, "outbound"));
    let inbound = Arc::new(BoundedQueue::new(config.inbound_capacity, "inbound"));
    let shared = Arc::new(SharedState::new());
    let signal = Arc::new(QueueSignal::new());

    let backoff = BackoffPolicy::new(
        config.backoff_min.as_millis() as u64,
        config.backoff_max.as_millis() as u64,
    );
    let poll_timeout = config.poll_timeout;

    let worker = Worker {
        transport,
        shared: shared.clone(),
        outbound: outbound.clone(),
        inbound: inbound.clone(),
        signal: signal.clone(),
        backoff,
        nonce: NonceGenerator::new(),
        poll_timeout,
        client_id,
        target,
        callback,
    };

    let join_handle = thread::Builder::new()
        .name("presenceforge-worker".into())
        .spawn(move || worker.run())
        .expect("failed to spawn presenceforge worker thread");

    EngineHandle {
        outbound,
        inbound,
        shared,
        signal,
        worker: Mutex::new(Some(join_handle)),
        pid,
    }
}

impl EngineHandle {
    pub fn state(&self) -> RpcState {
        self.shared.state()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == RpcState::Connected
    }

    pub fn configuration(&self) -> Option<Configuration> {
        self.shared.configuration()
    }

    /// Pushes a command onto the outbound queue and wakes the worker.
    /// Overflow here is reported as an error: it means the caller is
    /// producing commands faster than the worker can transmit them.
    pub fn enqueue(&self, command: OutboundCommand) -> PushOutcome {
        let outcome = self.outbound.push_reporting_overflow_as_error(command);
        self.signal.notify();
        outcome
    }

    /// Atomically drains every message currently buffered on the inbound
    /// queue. Only meaningful in manual-dispatch mode; in auto-dispatch mode
    /// the inbound queue is never populated.
    pub fn drain_inbound(&self) -> Vec<Message> {
        self.inbound.drain_all()
    }

    /// Initiates a graceful shutdown: clears any queued commands, enqueues a
    /// clear-presence and the Close sentinel, and wakes the worker. The
    /// worker transmits both, sends the close handwave, and exits on the
    /// next disconnect without reconnecting.
    pub fn shutdown(&self) {
        self.outbound.clear();
        self.outbound.push(OutboundCommand::Presence {
            pid: self.pid,
            activity: None,
        });
        self.outbound.push(OutboundCommand::Close);
        self.shared.set_shutdown();
        self.signal.notify();
    }

    /// Hard-terminates the worker: it drops any queued commands without
    /// transmitting them, closes the transport, and exits at its next
    /// suspension point.
    pub fn abort(&self) {
        self.shared.set_abort();
        self.signal.notify();
    }

    /// Disposes of the engine: requests a graceful shutdown, waits up to
    /// `grace` for the worker to exit on its own, and force-aborts it if it
    /// hasn't. Blocks until the worker thread has actually exited.
    pub fn dispose(&self, grace: Duration) {
        self.shutdown();
        if !self.join_within(grace) {
            self.abort();
            self.join_within(Duration::from_secs(5));
        }
    }

    fn join_within(&self, timeout: Duration) -> bool {
        let handle = {
            let mut guard = self.worker.lock().expect("worker mutex poisoned");
            guard.take()
        };
        let Some(handle) = handle else {
            return true;
        };

        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let _ = handle.join();
            let _ = tx.send(());
        });
        rx.recv_timeout(timeout).is_ok()
    }
}

struct Worker<T: PipeTransport> {
    transport: T,
    shared: Arc<SharedState>,
    outbound: Arc<BoundedQueue<OutboundCommand>>,
    inbound: Arc<BoundedQueue<Message>>,
    signal: Arc<QueueSignal>,
    backoff: BackoffPolicy,
    nonce: NonceGenerator,
    poll_timeout: Duration,
    client_id: String,
    target: i32,
    callback: Option<Arc<dyn Fn(Message) + Send + Sync>>,
}

impl<T: PipeTransport> Worker<T> {
    fn run(mut self) {
        'outer: loop {
            if self.shared.is_abort() {
                break 'outer;
            }

            match self.transport.connect(self.target) {
                Ok(pipe) => {
                    self.emit(MessageKind::ConnectionEstablished { pipe });
                    let handshake = HandshakePayload {
                        v: constants::IPC_VERSION,
                        client_id: self.client_id.clone(),
                    };
                    if let Err(err) = self.transport.write_frame(Opcode::Handshake, &handshake) {
                        warn!("failed to write handshake: {}", err);
                        self.transport.close();
                        self.shared.set_state(RpcState::Disconnected);
                        if self.shared.is_abort() {
                            break 'outer;
                        }
                        thread::sleep(self.backoff.next_delay());
                        continue 'outer;
                    }
                    self.shared.set_state(RpcState::Connecting);
                }
                Err(_err) => {
                    self.emit(MessageKind::ConnectionFailed {
                        pipe: self.fixed_target(),
                    });
                    if self.shared.is_abort() {
                        break 'outer;
                    }
                    thread::sleep(self.backoff.next_delay());
                    continue 'outer;
                }
            }

            self.run_inner_loop();

            self.transport.close();
            self.shared.set_state(RpcState::Disconnected);

            if self.shared.is_abort() || self.shared.is_shutdown() {
                break 'outer;
            }
            thread::sleep(self.backoff.next_delay());
        }
    }

    fn fixed_target(&self) -> Option<u8> {
        u8::try_from(self.target).ok()
    }

    /// Runs while the connection is up and nothing has asked us to stop
    /// outright. Deliberately does not check `is_shutdown()`: a shutdown in
    /// progress still needs this loop running so the write-drain can flush
    /// the queued clear-presence and Close sentinel and observe Discord's
    /// handwave reply.
    fn run_inner_loop(&mut self) {
        let mut mainloop = true;
        while !self.shared.is_abort() && self.transport.is_connected() && mainloop {
            match self.transport.read_frame() {
                Ok(Some(frame)) => match frame.opcode {
                    Opcode::Close => {
                        let payload = frame.json().unwrap_or(Value::Null);
                        let code = payload.get("code").and_then(Value::as_i64).unwrap_or(0) as i32;
                        let reason = payload
                            .get("message")
                            .and_then(Value::as_str)
                            .unwrap_or_default()
                            .to_string();
                        self.emit(MessageKind::Close { code, reason });
                        mainloop = false;
                    }
                    Opcode::Ping => {
                        if let Err(err) = self.transport.write_raw_frame(Opcode::Pong, &frame.raw) {
                            warn!("failed to echo Pong: {}", err);
                            mainloop = false;
                        }
                    }
                    Opcode::Pong => {
                        trace!("received unsolicited Pong");
                    }
                    Opcode::Frame => {
                        if self.shared.is_shutdown() {
                            trace!("shutdown in progress, dropping inbound frame");
                        } else {
                            match frame.json() {
                                Ok(payload) => self.handle_frame_payload(payload),
                                Err(err) => warn!("dropping malformed frame payload: {}", err),
                            }
                        }
                    }
                    Opcode::Handshake => {
                        error!("received Handshake opcode outside the initial handshake, protocol desync");
                        mainloop = false;
                    }
                },
                Ok(None) => {}
                Err(err) => {
                    debug!("read_frame reported a broken connection: {}", err);
                    mainloop = false;
                }
            }

            if mainloop && self.transport.is_connected() && !self.shared.is_abort() {
                self.run_write_drain();
            }

            self.signal.wait_timeout(self.poll_timeout);
        }
    }

    fn handle_frame_payload(&mut self, payload: Value) {
        let cmd = payload.get("cmd").and_then(Value::as_str).unwrap_or("");
        let evt = payload.get("evt").and_then(Value::as_str);
        let data = payload.get("data").cloned().unwrap_or(Value::Null);

        if evt == Some("ERROR") {
            let code = data.get("code").and_then(Value::as_i64).unwrap_or(0) as i32;
            let message = data
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            self.emit(MessageKind::Error { code, message });
            return;
        }

        if self.shared.state() == RpcState::Connecting {
            if cmd == "DISPATCH" && evt == Some("READY") {
                let user = data
                    .get("user")
                    .and_then(|v| serde_json::from_value::<User>(v.clone()).ok());
                let configuration = data
                    .get("config")
                    .and_then(|v| serde_json::from_value::<Configuration>(v.clone()).ok())
                    .unwrap_or(Configuration {
                        cdn_host: String::new(),
                        api_endpoint: String::new(),
                    });
                self.shared.set_configuration(configuration.clone());
                self.shared.set_state(RpcState::Connected);
                self.backoff.reset();
                self.emit(MessageKind::Ready { user, configuration });
            } else {
                trace!("ignoring frame received before READY: cmd={}", cmd);
            }
            return;
        }

        if self.shared.state() != RpcState::Connected {
            trace!("ignoring frame while not connected: cmd={}", cmd);
            return;
        }

        match cmd {
            "DISPATCH" => self.handle_dispatch_event(evt, data),
            "AUTHORIZE" => {
                if let Ok(response) = serde_json::from_value::<AuthorizeResponse>(data) {
                    self.emit(MessageKind::Authorize { code: response.code });
                }
            }
            "AUTHENTICATE" => {
                if let Ok(response) = serde_json::from_value::<AuthenticateResponse>(data) {
                    self.emit(MessageKind::Authenticate {
                        user: response.user,
                        scopes: response.scopes,
                        expires: response.expires,
                        application: response.application,
                    });
                }
            }
            "SET_ACTIVITY" => {
                let presence = serde_json::from_value::<Activity>(data).ok();
                self.emit(MessageKind::Presence { presence });
            }
            "GET_VOICE_SETTINGS" | "SET_VOICE_SETTINGS" => {
                self.emit(MessageKind::VoiceSettings {
                    settings: VoiceSettings::new(data),
                });
            }
            "SUBSCRIBE" => {
                if let Some(event) = evt.and_then(parse_server_event) {
                    self.emit(MessageKind::Subscribe { event });
                }
            }
            "UNSUBSCRIBE" => {
                if let Some(event) = evt.and_then(parse_server_event) {
                    self.emit(MessageKind::Unsubscribe { event });
                }
            }
            "SEND_ACTIVITY_JOIN_INVITE" | "CLOSE_ACTIVITY_JOIN_REQUEST" => {
                trace!("acknowledged {}", cmd);
            }
            other => debug!("dropping response for unknown cmd {:?}", other),
        }
    }

    fn handle_dispatch_event(&mut self, evt: Option<&str>, data: Value) {
        match evt {
            Some("ACTIVITY_JOIN") => {
                if let Some(secret) = data.get("secret").and_then(Value::as_str) {
                    self.emit(MessageKind::Join {
                        secret: secret.to_string(),
                    });
                }
            }
            Some("ACTIVITY_SPECTATE") => {
                if let Some(secret) = data.get("secret").and_then(Value::as_str) {
                    self.emit(MessageKind::Spectate {
                        secret: secret.to_string(),
                    });
                }
            }
            Some("ACTIVITY_JOIN_REQUEST") => {
                if let Some(user_json) = data.get("user").cloned() {
                    if let Ok(user) = serde_json::from_value::<User>(user_json) {
                        self.emit(MessageKind::JoinRequest {
                            user,
                            configuration: None,
                        });
                    }
                }
            }
            other => trace!("dropping unhandled dispatch event: {:?}", other),
        }
    }

    /// While connected, transmits queued commands in FIFO order. Stops (and
    /// leaves the head in place) on the first write failure, so the outer
    /// loop's reconnect picks it back up.
    fn run_write_drain(&mut self) {
        loop {
            if !self.transport.is_connected() {
                return;
            }

            let is_empty = self.outbound.peek_front(|front| front.is_none());
            if is_empty {
                return;
            }

            let is_close = self
                .outbound
                .peek_front(|front| front.map(OutboundCommand::is_close_sentinel).unwrap_or(false));
            if is_close {
                let handshake = HandshakePayload {
                    v: constants::IPC_VERSION,
                    client_id: self.client_id.clone(),
                };
                match self.transport.write_frame(Opcode::Close, &handshake) {
                    Ok(()) => {
                        self.outbound.pop();
                        return;
                    }
                    Err(err) => {
                        warn!("failed to write close handwave: {}", err);
                        return;
                    }
                }
            }

            if self.shared.is_abort() {
                self.outbound.pop();
                continue;
            }

            let command = match self.outbound.peek_front(|front| front.cloned()) {
                Some(command) => command,
                None => return,
            };

            let nonce = self.nonce.next();
            let envelope = IpcMessage {
                cmd: command.wire_command(),
                args: command.args(),
                nonce,
                evt: command.wire_event(),
            };

            match self.transport.write_frame(Opcode::Frame, &envelope) {
                Ok(()) => {
                    self.outbound.pop();
                }
                Err(err) => {
                    warn!("write failed, will retry after reconnect: {}", err);
                    return;
                }
            }
        }
    }

    fn emit(&self, kind: MessageKind) {
        let message = Message::new(kind);
        match &self.callback {
            Some(callback) => callback(message),
            None => {
                self.inbound.push(message);
            }
        }
    }
}

fn parse_server_event(name: &str) -> Option<ServerEvent> {
    serde_json::from_value(Value::String(name.to_string())).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ipc::transport::Frame;
    use std::collections::VecDeque;
    use std::sync::Mutex as StdMutex;

    /// An in-process transport double driven entirely by queued scripted
    /// events, used to exercise the worker loop without any real IPC
    /// endpoint. Grounded on the teacher's own preference for testing
    /// protocol types directly against fixtures rather than a live socket.
    struct ScriptedTransport {
        connect_results: VecDeque<Result<u8, ()>>,
        inbound: StdMutex<VecDeque<Option<Frame>>>,
        written: Arc<StdMutex<Vec<(Opcode, Vec<u8>)>>>,
        connected: bool,
    }

    impl PipeTransport for ScriptedTransport {
        fn connect(&mut self, _target: i32) -> crate::error::Result<u8> {
            match self.connect_results.pop_front() {
                Some(Ok(pipe)) => {
                    self.connected = true;
                    Ok(pipe)
                }
                _ => Err(crate::error::DiscordIpcError::NoValidSocket),
            }
        }

        fn write_frame<V: serde::Serialize>(&mut self, opcode: Opcode, payload: &V) -> crate::error::Result<()> {
            let bytes = serde_json::to_vec(payload)?;
            self.written.lock().unwrap().push((opcode, bytes));
            Ok(())
        }

        fn write_raw_frame(&mut self, opcode: Opcode, bytes: &[u8]) -> crate::error::Result<()> {
            self.written.lock().unwrap().push((opcode, bytes.to_vec()));
            Ok(())
        }

        fn read_frame(&mut self) -> crate::error::Result<Option<Frame>> {
            match self.inbound.lock().unwrap().pop_front() {
                Some(frame) => Ok(frame),
                None => {
                    self.connected = false;
                    Err(crate::error::DiscordIpcError::SocketClosed)
                }
            }
        }

        fn is_connected(&self) -> bool {
            self.connected
        }

        fn connected_endpoint(&self) -> Option<u8> {
            if self.connected {
                Some(0)
            } else {
                None
            }
        }

        fn close(&mut self) {
            self.connected = false;
        }
    }

    fn ready_frame() -> Frame {
        let body = serde_json::json!({
            "cmd": "DISPATCH",
            "evt": "READY",
            "data": {
                "user": {"id": "u1"},
                "config": {"cdn_host": "c", "api_endpoint": "a"},
            }
        });
        Frame {
            opcode: Opcode::Frame,
            raw: serde_json::to_vec(&body).unwrap(),
        }
    }

    #[test]
    fn happy_path_transitions_to_connected_and_resets_backoff() {
        let written = Arc::new(StdMutex::new(Vec::new()));
        let transport = ScriptedTransport {
            connect_results: VecDeque::from([Ok(0)]),
            inbound: StdMutex::new(VecDeque::from([Some(ready_frame())])),
            written: written.clone(),
            connected: false,
        };

        let handle = spawn(
            transport,
            "123".to_string(),
            -1,
            std::process::id(),
            EngineConfig::default(),
            None,
        );

        // Give the worker a brief window to process the scripted frame, then
        // force it down cleanly regardless of timing.
        std::thread::sleep(Duration::from_millis(100));
        handle.abort();
        handle.join_within(Duration::from_secs(2));

        let messages = handle.drain_inbound();
        assert!(messages
            .iter()
            .any(|m| matches!(m.kind, MessageKind::ConnectionEstablished { pipe: 0 })));
        assert!(messages.iter().any(|m| matches!(m.kind, MessageKind::Ready { .. })));

        let wrote_handshake = written
            .lock()
            .unwrap()
            .iter()
            .any(|(opcode, _)| *opcode == Opcode::Handshake);
        assert!(wrote_handshake);
    }

    #[test]
    fn connect_failure_emits_connection_failed_and_backs_off() {
        let transport = ScriptedTransport {
            connect_results: VecDeque::new(),
            inbound: StdMutex::new(VecDeque::new()),
            written: Arc::new(StdMutex::new(Vec::new())),
            connected: false,
        };

        let handle = spawn(
            transport,
            "123".to_string(),
            -1,
            std::process::id(),
            EngineConfig::default().with_backoff(Duration::from_millis(10), Duration::from_millis(20)),
            None,
        );

        std::thread::sleep(Duration::from_millis(50));
        handle.abort();
        handle.join_within(Duration::from_secs(2));

        let messages = handle.drain_inbound();
        assert!(messages
            .iter()
            .any(|m| matches!(m.kind, MessageKind::ConnectionFailed { .. })));
    }
}
