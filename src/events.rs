//! The façade's subscription set: which server events the client has asked
//! Discord to push, tracked as a small bitmask instead of a `HashSet<ServerEvent>`
//! since [`crate::ipc::protocol::ServerEvent`] only models the events Discord
//! can actually dispatch, not the subset a caller can subscribe to.

use crate::ipc::protocol::ServerEvent;

/// Bitmask over the subscribable activity events (join, spectate, join request).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EventFlags(u8);

impl EventFlags {
    pub const NONE: Self = Self(0);
    pub const JOIN: Self = Self(1 << 0);
    pub const SPECTATE: Self = Self(1 << 1);
    pub const JOIN_REQUEST: Self = Self(1 << 2);

    pub fn contains(self, flag: Self) -> bool {
        self.0 & flag.0 == flag.0
    }

    pub fn insert(&mut self, flag: Self) {
        self.0 |= flag.0;
    }

    pub fn remove(&mut self, flag: Self) {
        self.0 &= !flag.0;
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// The `ServerEvent` this flag subscribes to on the wire, if any.
    pub fn server_event(self) -> Option<ServerEvent> {
        match self {
            Self::JOIN => Some(ServerEvent::ActivityJoin),
            Self::SPECTATE => Some(ServerEvent::ActivitySpectate),
            Self::JOIN_REQUEST => Some(ServerEvent::ActivityJoinRequest),
            _ => None,
        }
    }

    /// The inverse of [`Self::server_event`], for translating an inbound
    /// `SUBSCRIBE`/`UNSUBSCRIBE` acknowledgement back into a flag.
    pub fn from_server_event(event: ServerEvent) -> Option<Self> {
        match event {
            ServerEvent::ActivityJoin => Some(Self::JOIN),
            ServerEvent::ActivitySpectate => Some(Self::SPECTATE),
            ServerEvent::ActivityJoinRequest => Some(Self::JOIN_REQUEST),
            _ => None,
        }
    }

    /// All individual bits set in `self`, for diffing against another mask.
    pub fn iter_bits(self) -> impl Iterator<Item = Self> {
        [Self::JOIN, Self::SPECTATE, Self::JOIN_REQUEST]
            .into_iter()
            .filter(move |bit| self.contains(*bit))
    }
}

impl std::ops::BitOr for EventFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_contains() {
        let mut flags = EventFlags::NONE;
        assert!(!flags.contains(EventFlags::JOIN));
        flags.insert(EventFlags::JOIN);
        assert!(flags.contains(EventFlags::JOIN));
        assert!(!flags.contains(EventFlags::SPECTATE));
    }

    #[test]
    fn remove_clears_only_that_bit() {
        let mut flags = EventFlags::JOIN | EventFlags::SPECTATE;
        flags.remove(EventFlags::JOIN);
        assert!(!flags.contains(EventFlags::JOIN));
        assert!(flags.contains(EventFlags::SPECTATE));
    }

    #[test]
    fn server_event_mapping() {
        assert_eq!(EventFlags::JOIN.server_event(), Some(ServerEvent::ActivityJoin));
        assert_eq!(EventFlags::SPECTATE.server_event(), Some(ServerEvent::ActivitySpectate));
        assert_eq!(
            EventFlags::JOIN_REQUEST.server_event(),
            Some(ServerEvent::ActivityJoinRequest)
        );
        assert_eq!(EventFlags::NONE.server_event(), None);
    }

    #[test]
    fn iter_bits_yields_only_set_flags() {
        let flags = EventFlags::JOIN | EventFlags::JOIN_REQUEST;
        let bits: Vec<_> = flags.iter_bits().collect();
        assert_eq!(bits, vec![EventFlags::JOIN, EventFlags::JOIN_REQUEST]);
    }
}
