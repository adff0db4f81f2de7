//! Peer Protocol Messages
//!
//! Wire format for the two-player link. One JSON text frame per message,
//! tagged by `type`.

use serde::{Serialize, Deserialize};

use crate::game::state::{GameInputs, PlayerProfile, ValidationResult};

/// Messages exchanged between host and guest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PeerMessage {
    /// Guest -> host: guest identity after connecting.
    Joined {
        /// Guest profile.
        profile: PlayerProfile,
    },

    /// Host -> guest: host identity.
    Welcome {
        /// Host profile.
        profile: PlayerProfile,
    },

    /// Host -> guest: authoritative round parameters.
    #[serde(rename_all = "camelCase")]
    StartRound {
        /// Round letter.
        letter: char,
        /// Index of the round being started.
        round_index: u32,
        /// Rounds in the session.
        total_rounds: u32,
        /// Round duration in seconds.
        duration: u32,
    },

    /// Either way: stop typing and submit now.
    StopRound,

    /// Either way: a completed round's answers and verdict.
    #[serde(rename_all = "camelCase")]
    SubmitAnswers {
        /// Frozen answers.
        inputs: GameInputs,
        /// Raw judged verdict.
        validation: ValidationResult,
        /// Round the verdict belongs to.
        round_index: u32,
    },

    /// Either way: chat line.
    #[serde(rename_all = "camelCase")]
    ChatMessage {
        /// Message text.
        text: String,
        /// Sender's display name.
        sender_name: String,
    },

    /// Host -> guest: session over.
    GameOver,

    /// Any `type` this build does not know. Dropped by the receiver.
    #[serde(other)]
    Unknown,
}

impl PeerMessage {
    /// Messages that bypass the round-index filter.
    pub fn is_lifecycle(&self) -> bool {
        matches!(
            self,
            PeerMessage::Joined { .. }
                | PeerMessage::Welcome { .. }
                | PeerMessage::StartRound { .. }
                | PeerMessage::StopRound
                | PeerMessage::GameOver
        )
    }

    /// Round index carried by the message, if any.
    pub fn round_index(&self) -> Option<u32> {
        match self {
            PeerMessage::StartRound { round_index, .. }
            | PeerMessage::SubmitAnswers { round_index, .. } => Some(*round_index),
            _ => None,
        }
    }

    /// Wire name, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            PeerMessage::Joined { .. } => "JOINED",
            PeerMessage::Welcome { .. } => "WELCOME",
            PeerMessage::StartRound { .. } => "START_ROUND",
            PeerMessage::StopRound => "STOP_ROUND",
            PeerMessage::SubmitAnswers { .. } => "SUBMIT_ANSWERS",
            PeerMessage::ChatMessage { .. } => "CHAT_MESSAGE",
            PeerMessage::GameOver => "GAME_OVER",
            PeerMessage::Unknown => "UNKNOWN",
        }
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}
