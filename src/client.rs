//! The public façade: [`ClientBuilder`] configures a connection and
//! [`DiscordIpcClient`] owns the running engine plus the caller-visible
//! presence/configuration/subscription state the engine itself doesn't keep
//! (it has no business caring what the last presence sent was, or which
//! events the caller has subscribed to across reconnects).

use crate::activity::{Activity, ActivityAssets, ActivityParty};
use crate::command::OutboundCommand;
use crate::config::{DispatchMode, EngineConfig, PipeConfig};
use crate::engine::{self, EngineHandle};
use crate::error::{DiscordIpcError, Result};
use crate::events::EventFlags;
use crate::ipc::transport::{LocalSocketTransport, PipeTransport};
use crate::message::{Message, MessageKind};
use crate::model::Configuration;
use crate::registrar::{AlreadyRegistered, UriSchemeRegistrar};
use crate::state::RpcState;
use crate::voice::VoiceSettings;
use log::warn;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Builds a [`DiscordIpcClient`]. The client itself is not connected until
/// [`DiscordIpcClient::initialize`] is called.
pub struct ClientBuilder {
    client_id: String,
    pipe: PipeConfig,
    engine_config: EngineConfig,
    registrar: Box<dyn UriSchemeRegistrar + Send + Sync>,
    callback: Option<Arc<dyn Fn(Message) + Send + Sync>>,
}

impl ClientBuilder {
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            pipe: PipeConfig::default(),
            engine_config: EngineConfig::default(),
            registrar: Box::new(AlreadyRegistered),
            callback: None,
        }
    }

    pub fn with_pipe_config(mut self, pipe: PipeConfig) -> Self {
        self.pipe = pipe;
        self
    }

    pub fn with_engine_config(mut self, engine_config: EngineConfig) -> Self {
        self.engine_config = engine_config;
        self
    }

    pub fn with_uri_scheme_registrar(
        mut self,
        registrar: impl UriSchemeRegistrar + Send + Sync + 'static,
    ) -> Self {
        self.registrar = Box::new(registrar);
        self
    }

    /// Registers an event callback and selects [`DispatchMode::Auto`] delivery.
    /// `build()` rejects a config whose `dispatch_mode` is `Auto` with no callback.
    pub fn with_event_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(Message) + Send + Sync + 'static,
    {
        self.callback = Some(Arc::new(callback));
        self
    }

    pub fn build(self) -> Result<DiscordIpcClient> {
        if self.engine_config.dispatch_mode == DispatchMode::Auto && self.callback.is_none() {
            return Err(DiscordIpcError::usage(
                "DispatchMode::Auto requires a callback registered via with_event_callback()",
            ));
        }

        let inner = Inner {
            client_id: self.client_id,
            pipe: self.pipe,
            engine_config: self.engine_config,
            registrar: self.registrar,
            callback: self.callback,
            handle: Mutex::new(None),
            disposed: AtomicBool::new(false),
            current_presence: Mutex::new(None),
            configuration: Mutex::new(None),
            subscriptions: Mutex::new(EventFlags::NONE),
        };

        Ok(DiscordIpcClient {
            inner: Arc::new(inner),
        })
    }
}

struct Inner {
    client_id: String,
    pipe: PipeConfig,
    engine_config: EngineConfig,
    registrar: Box<dyn UriSchemeRegistrar + Send + Sync>,
    callback: Option<Arc<dyn Fn(Message) + Send + Sync>>,
    handle: Mutex<Option<Arc<EngineHandle>>>,
    /// Set once `dispose()` has run. Initializing is a one-way door per
    /// client: once disposed, a client never spawns another engine, even
    /// though `handle` itself goes back to `None` on dispose and would
    /// otherwise look identical to "never initialized".
    disposed: AtomicBool,
    current_presence: Mutex<Option<Activity>>,
    configuration: Mutex<Option<Configuration>>,
    subscriptions: Mutex<EventFlags>,
}

impl Inner {
    fn handle_ref(&self) -> Result<Arc<EngineHandle>> {
        self.handle
            .lock()
            .expect("client handle mutex poisoned")
            .clone()
            .ok_or_else(|| DiscordIpcError::usage("client is not initialized, or has already been disposed"))
    }
}

/// A running (or not-yet-initialized) Discord Rich Presence IPC client.
/// Cheap to clone: every clone shares the same underlying engine and state.
#[derive(Clone)]
pub struct DiscordIpcClient {
    inner: Arc<Inner>,
}

impl DiscordIpcClient {
    /// Starts the background engine over the default platform-appropriate
    /// local transport, per this client's [`PipeConfig`].
    pub fn initialize(&self) -> Result<()> {
        let poll_timeout = self.inner.engine_config.poll_timeout;
        match self.inner.pipe.clone() {
            PipeConfig::Auto => {
                let transport = LocalSocketTransport::new(poll_timeout);
                self.initialize_with_transport(transport, -1)
            }
            PipeConfig::PipeNumber(index) => {
                let transport = LocalSocketTransport::new(poll_timeout);
                self.initialize_with_transport(transport, index as i32)
            }
            PipeConfig::CustomPath(path) => {
                let transport = LocalSocketTransport::with_custom_path(poll_timeout, path);
                self.initialize_with_transport(transport, 0)
            }
        }
    }

    /// Starts the engine over a caller-supplied transport. `pub(crate)` so
    /// tests can drive the façade against a scripted transport the way
    /// [`crate::engine`]'s own tests drive the worker loop directly.
    pub(crate) fn initialize_with_transport<T>(&self, transport: T, target: i32) -> Result<()>
    where
        T: PipeTransport + Send + 'static,
    {
        if self.inner.disposed.load(Ordering::SeqCst) {
            return Err(DiscordIpcError::usage(
                "client has already been disposed and cannot be re-initialized",
            ));
        }

        let mut guard = self.inner.handle.lock().expect("client handle mutex poisoned");
        if guard.is_some() {
            return Err(DiscordIpcError::usage("client is already initialized"));
        }

        let dispatch_callback = self.inner.callback.clone().map(|user_callback| {
            let inner = self.inner.clone();
            Arc::new(move |message: Message| {
                user_callback(apply_message(&inner, message));
            }) as Arc<dyn Fn(Message) + Send + Sync>
        });

        let handle = engine::spawn(
            transport,
            self.inner.client_id.clone(),
            target,
            std::process::id(),
            self.inner.engine_config.clone(),
            dispatch_callback,
        );
        *guard = Some(Arc::new(handle));
        Ok(())
    }

    /// Gracefully shuts the engine down and waits (with a 5s grace period
    /// before a hard abort) for the worker thread to exit. A no-op if the
    /// client was never initialized or has already been disposed. Once
    /// called, this client can never be initialized again.
    pub fn dispose(&self) {
        self.inner.disposed.store(true, Ordering::SeqCst);
        let handle = self
            .inner
            .handle
            .lock()
            .expect("client handle mutex poisoned")
            .take();
        if let Some(handle) = handle {
            handle.dispose(Duration::from_secs(5));
        }
    }

    pub fn state(&self) -> RpcState {
        self.inner
            .handle
            .lock()
            .expect("client handle mutex poisoned")
            .as_ref()
            .map(|handle| handle.state())
            .unwrap_or(RpcState::Disconnected)
    }

    pub fn is_connected(&self) -> bool {
        self.state() == RpcState::Connected
    }

    pub fn configuration(&self) -> Option<Configuration> {
        self.inner
            .configuration
            .lock()
            .expect("configuration mutex poisoned")
            .clone()
    }

    /// Sets (or, with `None`, clears) the current presence. Validates the
    /// activity, checks secrets/party requirements, and skips the wire
    /// round-trip entirely if it's identical to what was last sent and
    /// [`EngineConfig::skip_identical_presence`] is set.
    pub fn set_presence(&self, activity: Option<Activity>) -> Result<()> {
        if let Some(activity) = &activity {
            activity.validate()?;

            if activity.has_secrets() && !self.inner.registrar.is_registered() {
                return Err(DiscordIpcError::usage(
                    "presence carries join/spectate secrets but no URI scheme is registered",
                ));
            }
            if activity.has_secrets() && !activity.has_party() {
                warn!("presence carries secrets without a party; they will not be actionable from Discord's UI");
            }
        }

        if self.inner.engine_config.skip_identical_presence {
            let current = self.inner.current_presence.lock().expect("presence mutex poisoned");
            if *current == activity {
                return Ok(());
            }
        }

        let handle = self.inner.handle_ref()?;
        handle.enqueue(OutboundCommand::Presence {
            pid: std::process::id(),
            activity: activity.clone(),
        });
        *self.inner.current_presence.lock().expect("presence mutex poisoned") = activity;
        Ok(())
    }

    pub fn clear_presence(&self) -> Result<()> {
        self.set_presence(None)
    }

    /// Applies `f` to a clone of the current presence (or a default one if
    /// none is set yet) and sends the result.
    fn patch_presence(&self, f: impl FnOnce(&mut Activity)) -> Result<()> {
        let mut activity = {
            let current = self.inner.current_presence.lock().expect("presence mutex poisoned");
            current.clone().unwrap_or_default()
        };
        f(&mut activity);
        self.set_presence(Some(activity))
    }

    pub fn update_state(&self, state: impl Into<String>) -> Result<()> {
        let state = state.into();
        self.patch_presence(|activity| activity.state = Some(state))
    }

    pub fn update_details(&self, details: impl Into<String>) -> Result<()> {
        let details = details.into();
        self.patch_presence(|activity| activity.details = Some(details))
    }

    pub fn update_party(&self, id: impl Into<String>, current_size: u32, max_size: u32) -> Result<()> {
        let id = id.into();
        self.patch_presence(|activity| {
            activity.party = Some(ActivityParty {
                id: Some(id),
                size: Some([current_size, max_size]),
            });
        })
    }

    pub fn update_large_image(&self, key: impl Into<String>, text: Option<String>) -> Result<()> {
        let key = key.into();
        self.patch_presence(|activity| {
            let assets = activity.assets.get_or_insert_with(ActivityAssets::default);
            assets.large_image = Some(key);
            assets.large_text = text;
        })
    }

    pub fn update_small_image(&self, key: impl Into<String>, text: Option<String>) -> Result<()> {
        let key = key.into();
        self.patch_presence(|activity| {
            let assets = activity.assets.get_or_insert_with(ActivityAssets::default);
            assets.small_image = Some(key);
            assets.small_text = text;
        })
    }

    pub fn subscribe(&self, flags: EventFlags) -> Result<()> {
        self.update_subscriptions(flags, false)
    }

    pub fn unsubscribe(&self, flags: EventFlags) -> Result<()> {
        self.update_subscriptions(flags, true)
    }

    /// Diffs `flags` against the currently tracked subscription set and only
    /// sends a `SUBSCRIBE`/`UNSUBSCRIBE` command for the bits that actually
    /// change, so re-subscribing to an already-subscribed event is a no-op.
    fn update_subscriptions(&self, flags: EventFlags, unsubscribing: bool) -> Result<()> {
        if !self.inner.registrar.is_registered() {
            return Err(DiscordIpcError::usage(
                "subscribing to join/spectate events requires a registered URI scheme",
            ));
        }

        let handle = self.inner.handle_ref()?;
        let mut current = self.inner.subscriptions.lock().expect("subscriptions mutex poisoned");
        for bit in flags.iter_bits() {
            let already_set = current.contains(bit);
            if already_set != unsubscribing {
                continue;
            }
            if let Some(event) = bit.server_event() {
                handle.enqueue(OutboundCommand::Subscribe { event, unsubscribe: unsubscribing });
                if unsubscribing {
                    current.remove(bit);
                } else {
                    current.insert(bit);
                }
            }
        }
        Ok(())
    }

    pub fn authorize(&self, client_id: impl Into<String>, scopes: Vec<String>) -> Result<()> {
        let handle = self.inner.handle_ref()?;
        handle.enqueue(OutboundCommand::Authorize {
            client_id: client_id.into(),
            scopes,
        });
        Ok(())
    }

    pub fn authenticate(&self, access_token: impl Into<String>) -> Result<()> {
        let handle = self.inner.handle_ref()?;
        handle.enqueue(OutboundCommand::Authenticate {
            access_token: access_token.into(),
        });
        Ok(())
    }

    pub fn get_voice_settings(&self) -> Result<()> {
        let handle = self.inner.handle_ref()?;
        handle.enqueue(OutboundCommand::GetVoiceSettings);
        Ok(())
    }

    pub fn set_voice_settings(&self, settings: VoiceSettings) -> Result<()> {
        let handle = self.inner.handle_ref()?;
        handle.enqueue(OutboundCommand::SetVoiceSettings { settings });
        Ok(())
    }

    pub fn respond(&self, user_id: impl Into<String>, accept: bool) -> Result<()> {
        let handle = self.inner.handle_ref()?;
        handle.enqueue(OutboundCommand::Respond {
            user_id: user_id.into(),
            accept,
        });
        Ok(())
    }

    /// Drains and applies every message buffered since the last call. Only
    /// valid in [`DispatchMode::Manual`]; in [`DispatchMode::Auto`] messages
    /// are delivered to the registered callback as they arrive instead.
    pub fn invoke(&self) -> Result<Vec<Message>> {
        if self.inner.engine_config.dispatch_mode != DispatchMode::Manual {
            return Err(DiscordIpcError::usage(
                "invoke() is only valid in DispatchMode::Manual",
            ));
        }

        let handle = self.inner.handle_ref()?;
        Ok(handle
            .drain_inbound()
            .into_iter()
            .map(|message| apply_message(&self.inner, message))
            .collect())
    }
}

impl Drop for DiscordIpcClient {
    fn drop(&mut self) {
        if Arc::strong_count(&self.inner) == 1 {
            self.dispose();
        }
    }
}

/// Applies the message-application rules common to both dispatch modes:
/// caching the configuration and resyncing presence/subscriptions on
/// `Ready`, merging `Presence` updates field-wise, tracking the local
/// subscription set, and attaching the cached configuration to `JoinRequest`.
fn apply_message(inner: &Arc<Inner>, mut message: Message) -> Message {
    match &mut message.kind {
        MessageKind::Ready { configuration, .. } => {
            *inner.configuration.lock().expect("configuration mutex poisoned") = Some(configuration.clone());
            synchronize_state(inner);
        }
        MessageKind::Presence { presence } => {
            let mut current = inner.current_presence.lock().expect("presence mutex poisoned");
            let merged = merge_presence(current.clone(), presence.clone());
            *presence = merged.clone();
            *current = merged;
        }
        MessageKind::Subscribe { event } => {
            if let Some(bit) = EventFlags::from_server_event(*event) {
                inner
                    .subscriptions
                    .lock()
                    .expect("subscriptions mutex poisoned")
                    .insert(bit);
            }
        }
        MessageKind::Unsubscribe { event } => {
            if let Some(bit) = EventFlags::from_server_event(*event) {
                inner
                    .subscriptions
                    .lock()
                    .expect("subscriptions mutex poisoned")
                    .remove(bit);
            }
        }
        MessageKind::JoinRequest { configuration, .. } => {
            *configuration = inner.configuration.lock().expect("configuration mutex poisoned").clone();
        }
        _ => {}
    }
    message
}

/// Re-sends the cached presence and subscription set after a fresh `Ready`,
/// since a reconnect means Discord has forgotten both.
fn synchronize_state(inner: &Arc<Inner>) {
    let handle = match inner.handle.lock().expect("client handle mutex poisoned").clone() {
        Some(handle) => handle,
        None => return,
    };

    let presence = inner.current_presence.lock().expect("presence mutex poisoned").clone();
    if presence.is_some() {
        handle.enqueue(OutboundCommand::Presence {
            pid: std::process::id(),
            activity: presence,
        });
    }

    let subscriptions = *inner.subscriptions.lock().expect("subscriptions mutex poisoned");
    for bit in subscriptions.iter_bits() {
        if let Some(event) = bit.server_event() {
            handle.enqueue(OutboundCommand::Subscribe { event, unsubscribe: false });
        }
    }
}

/// Field-wise non-null-wins merge: a `None` in `incoming` means the field
/// wasn't mentioned, not that it was explicitly cleared. `None` for
/// `incoming` itself (a cleared presence) always wins outright.
fn merge_presence(current: Option<Activity>, incoming: Option<Activity>) -> Option<Activity> {
    let Some(incoming) = incoming else {
        return None;
    };
    let Some(mut base) = current else {
        return Some(incoming);
    };

    if incoming.state.is_some() {
        base.state = incoming.state;
    }
    if incoming.details.is_some() {
        base.details = incoming.details;
    }
    if incoming.timestamps.is_some() {
        base.timestamps = incoming.timestamps;
    }
    if incoming.assets.is_some() {
        base.assets = incoming.assets;
    }
    if incoming.party.is_some() {
        base.party = incoming.party;
    }
    if incoming.secrets.is_some() {
        base.secrets = incoming.secrets;
    }
    if incoming.buttons.is_some() {
        base.buttons = incoming.buttons;
    }
    if incoming.instance.is_some() {
        base.instance = incoming.instance;
    }
    Some(base)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::ActivityBuilder;
    use crate::ipc::protocol::Opcode;
    use crate::ipc::transport::Frame;
    use crate::registrar::NotRegistered;
    use serde::Serialize;

    /// A transport that never connects, for exercising façade-level logic
    /// that doesn't depend on a live connection.
    struct NullTransport;

    impl PipeTransport for NullTransport {
        fn connect(&mut self, _target: i32) -> crate::error::Result<u8> {
            Err(DiscordIpcError::NoValidSocket)
        }

        fn write_frame<T: Serialize>(&mut self, _opcode: Opcode, _payload: &T) -> crate::error::Result<()> {
            Ok(())
        }

        fn write_raw_frame(&mut self, _opcode: Opcode, _bytes: &[u8]) -> crate::error::Result<()> {
            Ok(())
        }

        fn read_frame(&mut self) -> crate::error::Result<Option<Frame>> {
            Ok(None)
        }

        fn is_connected(&self) -> bool {
            false
        }

        fn connected_endpoint(&self) -> Option<u8> {
            None
        }

        fn close(&mut self) {}
    }

    fn test_client() -> DiscordIpcClient {
        ClientBuilder::new("123")
            .with_engine_config(
                EngineConfig::default().with_backoff(Duration::from_millis(5), Duration::from_millis(5)),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn builder_requires_callback_for_auto_dispatch() {
        let result = ClientBuilder::new("123")
            .with_engine_config(EngineConfig::default().with_dispatch_mode(DispatchMode::Auto))
            .build();
        assert!(matches!(result, Err(DiscordIpcError::UsageError(_))));
    }

    #[test]
    fn builder_accepts_auto_dispatch_with_callback() {
        let result = ClientBuilder::new("123")
            .with_engine_config(EngineConfig::default().with_dispatch_mode(DispatchMode::Auto))
            .with_event_callback(|_| {})
            .build();
        assert!(result.is_ok());
    }

    #[test]
    fn set_presence_rejects_invalid_activity_before_checking_initialization() {
        let client = test_client();
        let activity = Activity {
            state: Some("x".repeat(200)),
            ..Default::default()
        };
        let result = client.set_presence(Some(activity));
        assert!(matches!(result, Err(DiscordIpcError::InvalidActivity(_))));
    }

    #[test]
    fn operations_before_initialize_return_usage_error() {
        let client = test_client();
        let activity = ActivityBuilder::new().state("uninitialized").build();
        let result = client.set_presence(Some(activity));
        assert!(matches!(result, Err(DiscordIpcError::UsageError(_))));
    }

    #[test]
    fn subscribe_without_registered_scheme_fails() {
        let client = ClientBuilder::new("123")
            .with_uri_scheme_registrar(NotRegistered)
            .build()
            .unwrap();
        let result = client.subscribe(EventFlags::JOIN);
        assert!(matches!(result, Err(DiscordIpcError::UsageError(_))));
    }

    #[test]
    fn invoke_rejects_auto_dispatch_mode() {
        let client = ClientBuilder::new("123")
            .with_engine_config(EngineConfig::default().with_dispatch_mode(DispatchMode::Auto))
            .with_event_callback(|_| {})
            .build()
            .unwrap();
        let result = client.invoke();
        assert!(matches!(result, Err(DiscordIpcError::UsageError(_))));
    }

    #[test]
    fn set_presence_dedups_identical_payload() {
        let client = test_client();
        client.initialize_with_transport(NullTransport, -1).unwrap();

        let activity = ActivityBuilder::new().state("hi").build();
        client.set_presence(Some(activity.clone())).unwrap();
        client.set_presence(Some(activity.clone())).unwrap();

        assert_eq!(
            client.inner.current_presence.lock().unwrap().as_ref(),
            Some(&activity)
        );
        client.dispose();
    }

    #[test]
    fn initialize_after_dispose_returns_usage_error() {
        let client = test_client();
        client.initialize_with_transport(NullTransport, -1).unwrap();
        client.dispose();

        let result = client.initialize_with_transport(NullTransport, -1);
        assert!(matches!(result, Err(DiscordIpcError::UsageError(_))));
    }

    #[test]
    fn subscribe_then_unsubscribe_updates_local_set() {
        let client = ClientBuilder::new("123")
            .with_engine_config(
                EngineConfig::default().with_backoff(Duration::from_millis(5), Duration::from_millis(5)),
            )
            .build()
            .unwrap();
        client.initialize_with_transport(NullTransport, -1).unwrap();

        client.subscribe(EventFlags::JOIN).unwrap();
        assert!(client.inner.subscriptions.lock().unwrap().contains(EventFlags::JOIN));

        client.unsubscribe(EventFlags::JOIN).unwrap();
        assert!(!client.inner.subscriptions.lock().unwrap().contains(EventFlags::JOIN));

        client.dispose();
    }

    #[test]
    fn merge_presence_overwrites_only_non_null_fields() {
        let current = Some(Activity {
            state: Some("old".into()),
            details: Some("keep".into()),
            ..Default::default()
        });
        let incoming = Some(Activity {
            state: Some("new".into()),
            details: None,
            ..Default::default()
        });
        let merged = merge_presence(current, incoming).unwrap();
        assert_eq!(merged.state.as_deref(), Some("new"));
        assert_eq!(merged.details.as_deref(), Some("keep"));
    }

    #[test]
    fn merge_presence_none_clears_presence() {
        let current = Some(Activity::default());
        assert!(merge_presence(current, None).is_none());
    }
}
