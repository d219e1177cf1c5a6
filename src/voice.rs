//! Voice settings passthrough.
//!
//! Discord's voice settings payload has many optional nested fields (input
//! device, output device, mode, automatic gain control, echo cancellation,
//! ...) that this crate never inspects; `set_voice_settings`/`GET_VOICE_SETTINGS`
//! just need to round-trip whatever shape the caller or Discord provides.

use serde_json::Value;

/// An opaque voice settings document, passed through to and from Discord
/// without interpretation.
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceSettings(pub Value);

impl VoiceSettings {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn into_value(self) -> Value {
        self.0
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }
}

impl From<Value> for VoiceSettings {
    fn from(value: Value) -> Self {
        Self(value)
    }
}
