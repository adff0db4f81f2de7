//! # NPAT Duel
//!
//! Name, Place, Animal, Thing: a timed word game played solo or head to head
//! over a direct peer link, with answers scored by an external judge.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         NPAT DUEL                            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Deterministic primitives                  │
//! │  ├── rng.rs      - Xorshift128+ PRNG (letters, room codes)   │
//! │  └── hash.rs     - Verdict fingerprints for audit logs       │
//! │                                                              │
//! │  game/           - Round rules (no I/O)                      │
//! │  ├── state.rs    - Session data model                        │
//! │  ├── letters.rs  - Alphabet and non-repeating draws          │
//! │  ├── round.rs    - Round state machine                       │
//! │  ├── scoring.rs  - Collision reconciliation, score history   │
//! │  ├── effects.rs  - Effects returned by transitions           │
//! │  └── session.rs  - Session controller                        │
//! │                                                              │
//! │  judge/          - Answer judging                            │
//! │  ├── mod.rs      - Judge trait, local fallback               │
//! │  └── groq.rs     - Chat-completions client                   │
//! │                                                              │
//! │  network/        - Peer link                                 │
//! │  ├── protocol.rs - Message types                             │
//! │  ├── room.rs     - Room codes and peer identifiers           │
//! │  └── transport.rs- WebSocket host/guest link                 │
//! │                                                              │
//! │  runtime.rs      - Async driver executing effects            │
//! │  config.rs       - Environment and game settings             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Effects, Not I/O
//!
//! [`GameSession`] operations mutate session state and return a list of
//! [`Effect`]s (peer sends, timers, judge calls, UI notices). The
//! [`SessionRuntime`] carries them out. Timer fires and judge results come
//! back tagged with the round index they were issued for, so anything that
//! outlives its round is dropped instead of corrupting the next one.
//!
//! ## Peer Roles
//!
//! The host is the only letter and round authority. The guest follows
//! `START_ROUND` and `GAME_OVER` from the host and never advances on its own.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

use std::time::Duration;

pub mod config;
pub mod core;
pub mod game;
pub mod judge;
pub mod network;
pub mod runtime;

// Re-export commonly used types
pub use config::{GameConfig, JudgeConfig, PeerConfig};
pub use core::rng::DeterministicRng;
pub use game::effects::{Effect, Notice};
pub use game::session::{GameSession, SessionError};
pub use game::state::{
    Category, GameInputs, GameMode, GameStatus, Outcome, PlayerProfile, RoundTag,
    ValidationItem, ValidationResult,
};
pub use judge::{Judge, JudgeError};
pub use network::{PeerMessage, RoomCode};
pub use runtime::{Command, RuntimeEvent, SessionRuntime};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default round duration in seconds.
pub const DEFAULT_DURATION_SECS: u32 = 60;

/// Default rounds per session.
pub const DEFAULT_TOTAL_ROUNDS: u32 = 5;

/// Points for an accepted, unique answer.
pub const VALID_SCORE: u32 = 10;

/// Time the letter is shown before play starts.
pub const COUNTDOWN_DELAY: Duration = Duration::from_secs(2);
