//! Game Logic Module
//!
//! Round rules and session control. No I/O: every operation returns the
//! effects it needs carried out.
//!
//! ## Module Structure
//!
//! - `state`: Session data model
//! - `letters`: Letter alphabet and sampling
//! - `round`: Round state machine transitions
//! - `scoring`: Collision reconciliation and score history
//! - `effects`: Effects and UI notices returned by transitions
//! - `session`: Session controller

pub mod state;
pub mod letters;
pub mod round;
pub mod scoring;
pub mod effects;
pub mod session;

// Re-export key types
pub use effects::{Effect, JudgeRequest, Notice};
pub use session::{GameSession, SessionError};
pub use state::{
    Category, GameInputs, GameMode, GameStatus, Outcome, PlayerProfile, RoundTag,
    SessionState, ValidationItem, ValidationResult,
};
