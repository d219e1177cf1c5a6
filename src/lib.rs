//! # PresenceForge
//!
//! A Rust library for Discord Rich Presence (IPC) integration. A background
//! worker thread owns the connection, reconnecting with backoff as needed;
//! the [`DiscordIpcClient`] façade is what callers actually talk to.
//!
//! ## Example
//!
//! ```rust,no_run
//! use presenceforge::{ActivityBuilder, ClientBuilder};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let client = ClientBuilder::new("your_client_id").build()?;
//! client.initialize()?;
//!
//! let activity = ActivityBuilder::new()
//!     .state("Playing a game")
//!     .details("In the menu")
//!     .start_timestamp_now()?
//!     .large_image("game_logo")
//!     .large_text("My Awesome Game")
//!     .build();
//!
//! client.set_presence(Some(activity))?;
//!
//! // Keep the activity for some time...
//! std::thread::sleep(std::time::Duration::from_secs(10));
//!
//! client.clear_presence()?;
//! # Ok(())
//! # }
//! ```

pub mod activity;
pub mod backoff;
pub mod client;
pub mod command;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod ipc;
pub mod message;
pub mod model;
mod nonce;
pub mod oauth;
pub mod queue;
pub mod registrar;
pub mod state;
pub mod voice;

// Re-export the main public API
pub use activity::{
    Activity, ActivityAssets, ActivityBuilder, ActivityButton, ActivityParty, ActivitySecrets,
    ActivityTimestamps,
};
pub use client::{ClientBuilder, DiscordIpcClient};
pub use command::OutboundCommand;
pub use config::{DispatchMode, EngineConfig, PipeConfig};
pub use error::{DiscordIpcError, ProtocolContext, Result};
pub use events::EventFlags;
pub use ipc::{Command, Opcode};
pub use message::{Message, MessageKind};
pub use model::{Application, Configuration, User};
pub use oauth::{AuthenticateResponse, AuthorizeResponse};
pub use registrar::{AlreadyRegistered, NotRegistered, UriSchemeRegistrar};
pub use state::RpcState;
pub use voice::VoiceSettings;
