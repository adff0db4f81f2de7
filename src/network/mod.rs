//! Network Layer
//!
//! Two-player peer link: rendezvous codes, the WebSocket transport, and the
//! message schema. Nothing here knows about round rules; inbound messages
//! are handed to the session controller as they arrive.

pub mod protocol;
pub mod room;
pub mod transport;

pub use protocol::PeerMessage;
pub use room::{RoomCode, ID_PREFIX};
pub use transport::{dial, HostRoom, LinkEvent, PeerLink, TransportError};
