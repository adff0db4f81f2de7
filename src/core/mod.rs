//! Core primitives shared by the game logic.

pub mod rng;
pub mod hash;

// Re-export core types
pub use rng::DeterministicRng;
pub use hash::{round_fingerprint, Fingerprint};
