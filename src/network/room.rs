//! Rendezvous Codes
//!
//! A hosted game is addressed by a four-digit room code. The code names
//! both the peer identifier (`npat-game-<code>`) and the port the host
//! listens on (`base_port + code`).

use std::fmt;

use serde::{Serialize, Deserialize};

use crate::core::rng::DeterministicRng;

/// Prefix of every peer identifier.
pub const ID_PREFIX: &str = "npat-game-";

/// Four-digit room code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoomCode(u16);

impl RoomCode {
    /// Smallest code.
    pub const MIN: u16 = 1000;

    /// Largest code.
    pub const MAX: u16 = 9999;

    /// Wrap a value if it is in range.
    pub fn new(value: u16) -> Option<Self> {
        (Self::MIN..=Self::MAX).contains(&value).then_some(Self(value))
    }

    /// Uniform random code.
    pub fn random(rng: &mut DeterministicRng) -> Self {
        let span = u32::from(Self::MAX - Self::MIN) + 1;
        Self(Self::MIN + rng.next_int(span) as u16)
    }

    /// Parse four digits, optionally given as a full peer identifier.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        let digits = s.strip_prefix(ID_PREFIX).unwrap_or(s);
        if digits.len() != 4 || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse().ok().and_then(Self::new)
    }

    /// Numeric value.
    pub fn value(self) -> u16 {
        self.0
    }

    /// Peer identifier for this code.
    pub fn peer_id(self, prefix: &str) -> String {
        format!("{}{}", prefix, self)
    }

    /// WebSocket request path guests dial.
    pub fn path(self, prefix: &str) -> String {
        format!("/{}", self.peer_id(prefix))
    }

    /// Port a host with this code listens on.
    pub fn port(self, base_port: u16) -> Option<u16> {
        base_port.checked_add(self.0)
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!(RoomCode::parse("4821").map(RoomCode::value), Some(4821));
        assert_eq!(RoomCode::parse(" 1000 ").map(RoomCode::value), Some(1000));
        assert_eq!(RoomCode::parse("npat-game-9999").map(RoomCode::value), Some(9999));
        assert_eq!(RoomCode::parse("0999"), None);
        assert_eq!(RoomCode::parse("123"), None);
        assert_eq!(RoomCode::parse("12345"), None);
        assert_eq!(RoomCode::parse("12a4"), None);
        assert_eq!(RoomCode::parse("+123"), None);
    }

    #[test]
    fn test_identifiers() {
        let code = RoomCode::new(4821).unwrap();
        assert_eq!(code.to_string(), "4821");
        assert_eq!(code.peer_id(ID_PREFIX), "npat-game-4821");
        assert_eq!(code.path(ID_PREFIX), "/npat-game-4821");
        assert_eq!(code.port(40_000), Some(44_821));
        assert_eq!(code.port(60_000), None);
    }

    #[test]
    fn test_random_codes_in_range() {
        let mut rng = DeterministicRng::new(99);
        for _ in 0..1000 {
            let code = RoomCode::random(&mut rng);
            assert!((RoomCode::MIN..=RoomCode::MAX).contains(&code.value()));
        }
    }
}
