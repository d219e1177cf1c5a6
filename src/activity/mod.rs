//! Rich Presence activity payload: the JSON shape sent as the `args` of a
//! `SET_ACTIVITY` command, plus a builder for constructing one ergonomically.

mod builder;
mod types;

pub use builder::ActivityBuilder;
pub use types::{
    Activity, ActivityAssets, ActivityButton, ActivityParty, ActivitySecrets, ActivityTimestamps,
};
