//! Game State Definitions
//!
//! Data model for one client's view of a session. The session controller is
//! the only writer; everything here is plain data.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};

use crate::game::scoring::{ReconciledRound, ScoreHistory};
use crate::{DEFAULT_DURATION_SECS, DEFAULT_TOTAL_ROUNDS};

// =============================================================================
// STATUS / MODE
// =============================================================================

/// Round lifecycle status.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameStatus {
    /// Lobby / mode selection.
    #[default]
    Menu,
    /// Letter shown, round about to start.
    Countdown,
    /// Players typing answers.
    Playing,
    /// Waiting on the judge.
    Validating,
    /// Verdicts shown (possibly still waiting on the opponent).
    RoundResult,
    /// Session finished.
    GameOver,
}

/// How this client participates in the session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameMode {
    /// Solo play, no peer.
    #[default]
    Single,
    /// Multiplayer, round authority.
    MultiHost,
    /// Multiplayer, follows the host.
    MultiGuest,
}

impl GameMode {
    /// Whether a peer takes part in this mode.
    pub fn is_multiplayer(self) -> bool {
        !matches!(self, GameMode::Single)
    }
}

/// Which end of the peer link this client is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PeerRole {
    /// Opened the room and accepts the connection.
    Host,
    /// Dialled the host's room code.
    Guest,
}

/// Final result of a session from the local point of view.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    /// Single player, no comparison.
    Solo,
    /// Local total above the opponent's.
    Won,
    /// Local total below the opponent's.
    Lost,
    /// Equal totals.
    Tie,
    /// Ended early because the peer vanished.
    Forfeit,
}

// =============================================================================
// PLAYER DATA
// =============================================================================

/// Name and avatar glyph shown to the opponent.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerProfile {
    /// Display name.
    pub name: String,
    /// Single emoji or glyph.
    pub avatar: String,
}

impl PlayerProfile {
    /// Create a profile.
    pub fn new(name: impl Into<String>, avatar: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            avatar: avatar.into(),
        }
    }
}

impl Default for PlayerProfile {
    fn default() -> Self {
        Self::new("Player", "🐶")
    }
}

/// The four answer categories.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// A person's name.
    Name,
    /// A place.
    Place,
    /// An animal.
    Animal,
    /// Any object.
    Thing,
}

impl Category {
    /// All categories in display order.
    pub const ALL: [Category; 4] = [
        Category::Name,
        Category::Place,
        Category::Animal,
        Category::Thing,
    ];

    /// Human-readable label.
    pub fn label(self) -> &'static str {
        match self {
            Category::Name => "Name",
            Category::Place => "Place",
            Category::Animal => "Animal",
            Category::Thing => "Thing",
        }
    }

    /// Parse a label or its first letter, case-insensitively.
    pub fn parse(s: &str) -> Option<Category> {
        match s.trim().to_lowercase().as_str() {
            "name" | "n" => Some(Category::Name),
            "place" | "p" => Some(Category::Place),
            "animal" | "a" => Some(Category::Animal),
            "thing" | "t" => Some(Category::Thing),
            _ => None,
        }
    }
}

/// One player's answers for one round.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameInputs {
    /// Name answer.
    pub name: String,
    /// Place answer.
    pub place: String,
    /// Animal answer.
    pub animal: String,
    /// Thing answer.
    pub thing: String,
}

impl GameInputs {
    /// Build from four answers.
    pub fn new(
        name: impl Into<String>,
        place: impl Into<String>,
        animal: impl Into<String>,
        thing: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            place: place.into(),
            animal: animal.into(),
            thing: thing.into(),
        }
    }

    /// Answer for a category.
    pub fn get(&self, category: Category) -> &str {
        match category {
            Category::Name => &self.name,
            Category::Place => &self.place,
            Category::Animal => &self.animal,
            Category::Thing => &self.thing,
        }
    }

    /// Replace the answer for a category.
    pub fn set(&mut self, category: Category, text: impl Into<String>) {
        let slot = match category {
            Category::Name => &mut self.name,
            Category::Place => &mut self.place,
            Category::Animal => &mut self.animal,
            Category::Thing => &mut self.thing,
        };
        *slot = text.into();
    }

    /// Trimmed, lowercased answer used for collision checks.
    pub fn normalized(&self, category: Category) -> String {
        self.get(category).trim().to_lowercase()
    }
}

// =============================================================================
// VERDICTS
// =============================================================================

/// Judge's verdict for one category.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationItem {
    /// Whether the answer was accepted.
    pub valid: bool,
    /// 0 or 10 from the judge, 5 after a collision.
    pub score: u32,
    /// Short explanation.
    pub message: String,
}

impl ValidationItem {
    /// Accepted answer worth full points.
    pub fn accepted(message: impl Into<String>) -> Self {
        Self {
            valid: true,
            score: crate::VALID_SCORE,
            message: message.into(),
        }
    }

    /// Rejected answer.
    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            valid: false,
            score: 0,
            message: message.into(),
        }
    }
}

/// All four verdicts for one player's round.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    /// Name verdict.
    pub name: ValidationItem,
    /// Place verdict.
    pub place: ValidationItem,
    /// Animal verdict.
    pub animal: ValidationItem,
    /// Thing verdict.
    pub thing: ValidationItem,
    /// Sum of the four scores.
    pub total_round_score: u32,
}

impl ValidationResult {
    /// Build from four items; the total is computed here.
    pub fn from_items(
        name: ValidationItem,
        place: ValidationItem,
        animal: ValidationItem,
        thing: ValidationItem,
    ) -> Self {
        let mut result = Self {
            name,
            place,
            animal,
            thing,
            total_round_score: 0,
        };
        result.recompute_total();
        result
    }

    /// Verdict for a category.
    pub fn item(&self, category: Category) -> &ValidationItem {
        match category {
            Category::Name => &self.name,
            Category::Place => &self.place,
            Category::Animal => &self.animal,
            Category::Thing => &self.thing,
        }
    }

    /// Mutable verdict for a category.
    pub fn item_mut(&mut self, category: Category) -> &mut ValidationItem {
        match category {
            Category::Name => &mut self.name,
            Category::Place => &mut self.place,
            Category::Animal => &mut self.animal,
            Category::Thing => &mut self.thing,
        }
    }

    /// Sum of the four category scores.
    pub fn category_sum(&self) -> u32 {
        Category::ALL.iter().map(|c| self.item(*c).score).sum()
    }

    /// Overwrite `total_round_score` with the category sum.
    pub fn recompute_total(&mut self) {
        self.total_round_score = self.category_sum();
    }
}

/// Scores recorded for one finished round.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundRecord {
    /// Round this record belongs to.
    pub round_index: u32,
    /// Letter played.
    pub letter: char,
    /// Local adjusted total.
    pub my: u32,
    /// Opponent adjusted total (0 in solo).
    pub opp: u32,
}

// =============================================================================
// PER-ROUND SLOT
// =============================================================================

/// Names one started round. Timer and judge callbacks carry the tag they
/// were issued under and are dropped when it no longer matches.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RoundTag {
    /// Count of rounds begun in this session, across games.
    pub generation: u64,
    /// Round index within the current game.
    pub round_index: u32,
}

/// Everything tied to the current round. Replaced wholesale at round start.
#[derive(Clone, Debug, Default)]
pub struct RoundSlot {
    /// Answers as typed so far.
    pub draft: GameInputs,
    /// Answers frozen at submission.
    pub inputs: Option<GameInputs>,
    /// Raw local verdict from the judge.
    pub verdict: Option<ValidationResult>,
    /// Opponent answers for this round.
    pub opponent_inputs: Option<GameInputs>,
    /// Raw opponent verdict for this round.
    pub opponent_verdict: Option<ValidationResult>,
    /// Collision-adjusted copies used for display and scoring.
    pub reconciled: Option<ReconciledRound>,
    /// Peer asked us to stop before PLAYING began.
    pub stop_requested: bool,
}

impl RoundSlot {
    /// Whether the opponent's verdict for this round is in.
    pub fn has_opponent(&self) -> bool {
        self.opponent_inputs.is_some() && self.opponent_verdict.is_some()
    }
}

/// One chat line.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatEntry {
    /// Sender's display name.
    pub sender_name: String,
    /// Message text.
    pub text: String,
    /// When the entry was appended locally.
    pub sent_at: DateTime<Utc>,
    /// Typed on this client.
    pub local: bool,
}

/// Peer link bookkeeping.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LinkState {
    /// Role taken on the link, if any.
    pub role: Option<PeerRole>,
    /// Room code (hosting: ours; guest: the one dialled).
    pub room_code: Option<String>,
    /// Link currently open.
    pub connected: bool,
}

// =============================================================================
// SESSION STATE
// =============================================================================

/// Complete session state, owned by the session controller.
#[derive(Clone, Debug)]
pub struct SessionState {
    /// Session identifier (for logs).
    pub session_id: [u8; 16],
    /// Lifecycle status.
    pub status: GameStatus,
    /// Participation mode.
    pub mode: GameMode,
    /// Active round index (0-based).
    pub round_index: u32,
    /// Bumped each time a round begins; never reset.
    pub generation: u64,
    /// Letter for the active round.
    pub current_letter: Option<char>,
    /// Letters already played this session.
    pub used_letters: BTreeSet<char>,
    /// Round duration in seconds.
    pub duration_secs: u32,
    /// Rounds in this session.
    pub total_rounds: u32,
    /// Seconds left on the round timer.
    pub time_left: u32,
    /// Local profile.
    pub profile: PlayerProfile,
    /// Set once the profile was sent to the peer.
    pub profile_locked: bool,
    /// Opponent profile from the handshake.
    pub opponent: Option<PlayerProfile>,
    /// Current round data.
    pub round: RoundSlot,
    /// Completed-round scores.
    pub history: ScoreHistory,
    /// Chat log.
    pub chat: Vec<ChatEntry>,
    /// Peer link bookkeeping.
    pub link: LinkState,
    /// Set on GAME_OVER.
    pub outcome: Option<Outcome>,
}

impl SessionState {
    /// Fresh session in MENU.
    pub fn new(session_id: [u8; 16], profile: PlayerProfile) -> Self {
        Self {
            session_id,
            status: GameStatus::Menu,
            mode: GameMode::Single,
            round_index: 0,
            generation: 0,
            current_letter: None,
            used_letters: BTreeSet::new(),
            duration_secs: DEFAULT_DURATION_SECS,
            total_rounds: DEFAULT_TOTAL_ROUNDS,
            time_left: 0,
            profile,
            profile_locked: false,
            opponent: None,
            round: RoundSlot::default(),
            history: ScoreHistory::new(),
            chat: Vec::new(),
            link: LinkState::default(),
            outcome: None,
        }
    }

    /// Tag of the active round.
    pub fn round_tag(&self) -> RoundTag {
        RoundTag {
            generation: self.generation,
            round_index: self.round_index,
        }
    }

    /// Whether the active round is the final one.
    pub fn is_last_round(&self) -> bool {
        self.round_index + 1 >= self.total_rounds
    }

    /// Local cumulative score.
    pub fn my_total(&self) -> u32 {
        self.history.my_total()
    }

    /// Opponent cumulative score.
    pub fn opponent_total(&self) -> u32 {
        self.history.opponent_total()
    }

    /// Short hex prefix of the session id.
    pub fn short_id(&self) -> String {
        hex::encode(&self.session_id[..4])
    }
}
