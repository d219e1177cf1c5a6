//! Response shapes for the OAuth2 passthrough commands.
//!
//! The actual HTTPS token exchange is an external collaborator (§1/§6 of the
//! design): this crate only carries the `access_token` the caller already
//! obtained into `authenticate()`, and decodes what Discord's local client
//! sends back over the IPC channel in response.

use crate::model::{Application, User};
use serde::{Deserialize, Serialize};

/// Response to an `AUTHORIZE` command: an OAuth2 authorization code the
/// caller exchanges for an access token out-of-band.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthorizeResponse {
    pub code: String,
}

/// Response to an `AUTHENTICATE` command.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthenticateResponse {
    pub user: User,
    pub scopes: Vec<String>,
    pub expires: String,
    pub application: Application,
}
