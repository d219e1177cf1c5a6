//! URI-scheme registration: an external collaborator per §1/§6. Registering
//! `discord-<app_id>://` (optionally pointing at a Steam app or a local
//! executable) is how Discord is able to launch the host application back
//! when a user accepts a join/spectate invite. The core engine never touches
//! this; the façade consults the resulting boolean before allowing
//! `subscribe()` or presences carrying secrets.

/// Registers (or is told about a pre-existing registration of) a URI scheme
/// for join/spectate invites. Platform-specific implementations live outside
/// this crate's core; callers that already registered their own scheme (or
/// don't need one) can use [`AlreadyRegistered`]/[`NotRegistered`].
pub trait UriSchemeRegistrar {
    /// Registers the scheme for `app_id`, optionally associating a Steam app
    /// id or an explicit executable path. Returns whether registration (or
    /// verification that it's already in place) succeeded.
    fn register(&self, app_id: &str, steam_app_id: Option<&str>, executable: Option<&str>) -> bool;

    /// Whether the scheme is currently considered registered, without
    /// attempting to (re-)register it.
    fn is_registered(&self) -> bool;
}

/// A registrar that reports success without doing anything, for callers who
/// register their URI scheme through some other mechanism (an installer, a
/// packaging manifest) and just need the façade to treat it as present.
#[derive(Debug, Default, Clone, Copy)]
pub struct AlreadyRegistered;

impl UriSchemeRegistrar for AlreadyRegistered {
    fn register(&self, _app_id: &str, _steam_app_id: Option<&str>, _executable: Option<&str>) -> bool {
        true
    }

    fn is_registered(&self) -> bool {
        true
    }
}

/// A registrar that never succeeds, for callers that do not need join/
/// spectate invites and want `subscribe()`/secret-bearing presences to fail
/// validation rather than silently no-op.
#[derive(Debug, Default, Clone, Copy)]
pub struct NotRegistered;

impl UriSchemeRegistrar for NotRegistered {
    fn register(&self, _app_id: &str, _steam_app_id: Option<&str>, _executable: Option<&str>) -> bool {
        false
    }

    fn is_registered(&self) -> bool {
        false
    }
}
