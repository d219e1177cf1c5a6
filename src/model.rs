//! Domain types that travel inside `Message` payloads but are not part of the
//! wire envelope itself: the Discord user object, the connection
//! configuration handed over at `READY`, and the minimal OAuth application
//! descriptor returned by `AUTHENTICATE`.

use serde::{Deserialize, Serialize};

/// The subset of Discord's user object the IPC channel actually sends.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discriminator: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

/// Connection configuration handed over with `READY`. Opaque to the engine;
/// the façade attaches it to avatar-URL helpers and to `JoinRequest` users.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Configuration {
    pub cdn_host: String,
    pub api_endpoint: String,
}

/// The OAuth2 application descriptor returned by `AUTHENTICATE`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Application {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}
