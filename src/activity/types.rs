use crate::error::{DiscordIpcError, Result};
use serde::{Deserialize, Serialize};

/// Discord's own limits on presence fields, enforced locally so a malformed
/// presence fails before it is ever framed and sent.
const MAX_STATE_LEN: usize = 128;
const MAX_DETAILS_LEN: usize = 128;
const MAX_ASSET_KEY_LEN: usize = 256;
const MAX_BUTTONS: usize = 2;

/// Rich Presence Activity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamps: Option<ActivityTimestamps>,
    
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assets: Option<ActivityAssets>,
    
    #[serde(skip_serializing_if = "Option::is_none")]
    pub party: Option<ActivityParty>,
    
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secrets: Option<ActivitySecrets>,
    
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buttons: Option<Vec<ActivityButton>>,
    
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance: Option<bool>,
}

/// Activity timestamps
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ActivityTimestamps {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<i64>,
    
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<i64>,
}

/// Activity assets (images)
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ActivityAssets {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub large_image: Option<String>,
    
    #[serde(skip_serializing_if = "Option::is_none")]
    pub large_text: Option<String>,
    
    #[serde(skip_serializing_if = "Option::is_none")]
    pub small_image: Option<String>,
    
    #[serde(skip_serializing_if = "Option::is_none")]
    pub small_text: Option<String>,
}

/// Activity party information
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ActivityParty {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<[u32; 2]>, // [current, max]
}

/// Activity secrets for join/spectate
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ActivitySecrets {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub join: Option<String>,
    
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spectate: Option<String>,
    
    #[serde(rename = "match", skip_serializing_if = "Option::is_none")]
    pub match_secret: Option<String>,
}

/// Activity button
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityButton {
    pub label: String,
    pub url: String,
}

impl Activity {
    /// Whether this presence carries join/spectate/match secrets. Secrets
    /// without a registered URI scheme will never be actionable by other
    /// Discord clients, and without a party are invisible in the UI.
    pub fn has_secrets(&self) -> bool {
        self.secrets.as_ref().is_some_and(|secrets| {
            secrets.join.is_some() || secrets.spectate.is_some() || secrets.match_secret.is_some()
        })
    }

    /// Whether this presence declares party size information.
    pub fn has_party(&self) -> bool {
        self.party.as_ref().is_some_and(|party| party.size.is_some())
    }

    /// Checks field lengths and cross-field constraints Discord enforces on
    /// the other end of the pipe, so a malformed presence fails locally
    /// instead of being silently dropped or rejected by the client.
    pub fn validate(&self) -> Result<()> {
        if let Some(state) = &self.state {
            if state.chars().count() > MAX_STATE_LEN {
                return Err(DiscordIpcError::InvalidActivity(format!(
                    "state exceeds {} characters",
                    MAX_STATE_LEN
                )));
            }
        }

        if let Some(details) = &self.details {
            if details.chars().count() > MAX_DETAILS_LEN {
                return Err(DiscordIpcError::InvalidActivity(format!(
                    "details exceeds {} characters",
                    MAX_DETAILS_LEN
                )));
            }
        }

        if let Some(assets) = &self.assets {
            for (field, value) in [
                ("large_image", &assets.large_image),
                ("large_text", &assets.large_text),
                ("small_image", &assets.small_image),
                ("small_text", &assets.small_text),
            ] {
                if let Some(value) = value {
                    if value.chars().count() > MAX_ASSET_KEY_LEN {
                        return Err(DiscordIpcError::InvalidActivity(format!(
                            "{} exceeds {} characters",
                            field, MAX_ASSET_KEY_LEN
                        )));
                    }
                }
            }
        }

        if let Some(buttons) = &self.buttons {
            if buttons.len() > MAX_BUTTONS {
                return Err(DiscordIpcError::InvalidActivity(format!(
                    "at most {} buttons are allowed",
                    MAX_BUTTONS
                )));
            }
            for button in buttons {
                let scheme_ok = button.url.starts_with("http://") || button.url.starts_with("https://");
                if !scheme_ok {
                    return Err(DiscordIpcError::InvalidActivity(format!(
                        "button url \"{}\" must use http or https",
                        button.url
                    )));
                }
            }
        }

        if let Some(party) = &self.party {
            if let Some([current, max]) = party.size {
                if max < current {
                    return Err(DiscordIpcError::InvalidActivity(format!(
                        "party max size {} is smaller than current size {}",
                        max, current
                    )));
                }
            }
        }

        Ok(())
    }
}

impl Default for Activity {
    fn default() -> Self {
        Self {
            state: None,
            details: None,
            timestamps: None,
            assets: None,
            party: None,
            secrets: None,
            buttons: None,
            instance: None,
        }
    }
}