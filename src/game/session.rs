//! Game Session Controller
//!
//! Owns one client's [`SessionState`] and exposes the operations the UI,
//! the peer link, timers, and the judge call into. Each operation mutates
//! state and returns the [`Effect`]s the runtime must carry out; nothing
//! here touches the network or the clock.

use std::time::Duration;

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::GameConfig;
use crate::core::rng::DeterministicRng;
use crate::game::effects::{Effect, Notice};
use crate::game::letters::{draw_letter, is_playable};
use crate::game::round::{self, FinalizeCause, NextStep};
use crate::game::state::{
    Category, ChatEntry, GameInputs, GameMode, GameStatus, LinkState, Outcome, PeerRole,
    PlayerProfile, RoundSlot, RoundTag, SessionState, ValidationResult,
};
use crate::network::protocol::PeerMessage;
use crate::network::room::RoomCode;

/// Rejected operations. An `Err` means no state was changed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// No peer link is open.
    #[error("Not connected to a peer")]
    NotConnected,

    /// Peer connected but has not introduced itself yet.
    #[error("Opponent profile not received")]
    OpponentUnknown,

    /// Operation not allowed in the current status.
    #[error("Invalid state: {0:?}")]
    InvalidState(GameStatus),

    /// Only the host sequences rounds.
    #[error("Only the host can advance rounds")]
    NotRoundAuthority,

    /// Operation needs a peer link.
    #[error("Not in a multiplayer session")]
    NotMultiplayer,

    /// Profile already sent to the peer.
    #[error("Profile is locked for this session")]
    ProfileLocked,

    /// Duration or round count out of range.
    #[error("Invalid settings: {duration_secs}s x {total_rounds} rounds")]
    InvalidSettings {
        /// Requested duration.
        duration_secs: u32,
        /// Requested round count.
        total_rounds: u32,
    },

    /// Room code is not four digits.
    #[error("Invalid room code: {0}")]
    InvalidRoomCode(String),
}

/// Session controller for one client.
#[derive(Debug)]
pub struct GameSession {
    state: SessionState,
    rng: DeterministicRng,
    disconnect_grace: Duration,
    countdown_delay: Duration,
}

impl GameSession {
    /// New session with a random id and entropy-seeded letters.
    pub fn new(profile: PlayerProfile) -> Self {
        let session_id = *Uuid::new_v4().as_bytes();
        let rng = DeterministicRng::for_session(&session_id);
        Self::with_rng(session_id, profile, rng)
    }

    /// New session with a fixed letter seed.
    pub fn with_seed(profile: PlayerProfile, seed: u64) -> Self {
        let session_id = *Uuid::new_v4().as_bytes();
        Self::with_rng(session_id, profile, DeterministicRng::new(seed))
    }

    fn with_rng(session_id: [u8; 16], profile: PlayerProfile, rng: DeterministicRng) -> Self {
        let countdown_delay = GameConfig::default().countdown_delay();
        Self {
            state: SessionState::new(session_id, profile),
            rng,
            disconnect_grace: Duration::from_secs(30),
            countdown_delay,
        }
    }

    /// Override the grace period before a dropped peer forfeits.
    pub fn with_disconnect_grace(mut self, grace: Duration) -> Self {
        self.disconnect_grace = grace;
        self
    }

    /// Read-only view of the state.
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Current status.
    pub fn status(&self) -> GameStatus {
        self.state.status
    }

    // =========================================================================
    // LOBBY
    // =========================================================================

    /// Change the local profile. Locked once it was sent to a peer.
    pub fn set_profile(&mut self, profile: PlayerProfile) -> Result<(), SessionError> {
        if self.state.profile_locked {
            return Err(SessionError::ProfileLocked);
        }
        self.state.profile = profile;
        Ok(())
    }

    /// Start a solo game at round 0.
    pub fn start_solo(&mut self, config: GameConfig) -> Result<Vec<Effect>, SessionError> {
        self.require_status(GameStatus::Menu)?;
        config.validate()?;
        if self.state.link.role.is_some() {
            warn!("Solo start rejected while a peer link is open");
            return Err(SessionError::InvalidState(self.state.status));
        }

        self.state.mode = GameMode::Single;
        self.apply_settings(config);
        self.clear_scores();

        info!(
            "[{}] Solo game: {} rounds of {}s",
            self.state.short_id(),
            config.total_rounds,
            config.duration_secs
        );

        let letter = self.next_letter();
        Ok(round::begin_round(&mut self.state, 0, letter, self.countdown_delay))
    }

    /// Ask the runtime to open a room for a guest to join.
    pub fn host_room(&mut self) -> Result<Vec<Effect>, SessionError> {
        self.require_status(GameStatus::Menu)?;
        if self.state.link.role.is_some() {
            return Err(SessionError::InvalidState(self.state.status));
        }

        self.state.link = LinkState {
            role: Some(PeerRole::Host),
            room_code: None,
            connected: false,
        };
        Ok(vec![Effect::OpenRoom])
    }

    /// Room is listening under `code`.
    pub fn room_opened(&mut self, code: RoomCode) -> Vec<Effect> {
        if self.state.link.role != Some(PeerRole::Host) {
            return Vec::new();
        }

        let code = code.to_string();
        info!("[{}] Room {} open", self.state.short_id(), code);
        self.state.link.room_code = Some(code.clone());
        vec![Effect::Notify(Notice::RoomOpened(code))]
    }

    /// Start a multiplayer game as host.
    ///
    /// Needs an open link and the guest's profile. Round 0 is sent to the
    /// guest explicitly.
    pub fn start_as_host(&mut self, config: GameConfig) -> Result<Vec<Effect>, SessionError> {
        self.require_status(GameStatus::Menu)?;
        config.validate()?;
        if self.state.link.role != Some(PeerRole::Host) {
            return Err(SessionError::NotMultiplayer);
        }
        if !self.state.link.connected {
            warn!("Host start rejected: no guest connected");
            return Err(SessionError::NotConnected);
        }
        if self.state.opponent.is_none() {
            warn!("Host start rejected: guest profile unknown");
            return Err(SessionError::OpponentUnknown);
        }

        self.state.mode = GameMode::MultiHost;
        self.apply_settings(config);
        self.clear_scores();

        info!(
            "[{}] Hosting game: {} rounds of {}s",
            self.state.short_id(),
            config.total_rounds,
            config.duration_secs
        );

        Ok(self.host_round(0))
    }

    /// Dial a host's room. The first round comes from the host.
    pub fn join_as_guest(&mut self, room_code: &str) -> Result<Vec<Effect>, SessionError> {
        self.require_status(GameStatus::Menu)?;
        if self.state.link.role.is_some() {
            return Err(SessionError::InvalidState(self.state.status));
        }
        let code = RoomCode::parse(room_code)
            .ok_or_else(|| SessionError::InvalidRoomCode(room_code.trim().to_string()))?;

        self.state.mode = GameMode::MultiGuest;
        self.state.link = LinkState {
            role: Some(PeerRole::Guest),
            room_code: Some(code.to_string()),
            connected: false,
        };
        self.clear_scores();

        Ok(vec![Effect::Connect {
            room_code: code.to_string(),
        }])
    }

    /// Peer link came up. The guest introduces itself.
    pub fn peer_connected(&mut self) -> Vec<Effect> {
        let role = match self.state.link.role {
            Some(role) => role,
            None => return Vec::new(),
        };

        self.state.link.connected = true;
        info!("[{}] Peer connected as {:?}", self.state.short_id(), role);

        let mut effects = vec![Effect::Notify(Notice::PeerConnected)];
        if role == PeerRole::Guest {
            self.state.profile_locked = true;
            effects.push(Effect::Send(PeerMessage::Joined {
                profile: self.state.profile.clone(),
            }));
        }
        effects
    }

    /// Peer link dropped.
    ///
    /// In the lobby the link is discarded. Mid-game a forfeit is scheduled
    /// after the grace period.
    pub fn peer_disconnected(&mut self, reason: &str) -> Vec<Effect> {
        if self.state.link.role.is_none() {
            return Vec::new();
        }

        warn!("[{}] Peer disconnected: {}", self.state.short_id(), reason);
        self.state.link.connected = false;
        let mut effects = vec![Effect::Notify(Notice::PeerLost(reason.to_string()))];

        match self.state.status {
            GameStatus::Menu => {
                self.state.opponent = None;
                self.state.profile_locked = false;
                self.state.link = LinkState::default();
                self.state.mode = GameMode::Single;
                effects.push(Effect::CloseLink);
            }
            GameStatus::GameOver => {}
            _ => effects.push(Effect::ScheduleForfeit {
                grace: self.disconnect_grace,
            }),
        }
        effects
    }

    /// Grace period after a disconnect ran out.
    pub fn forfeit_elapsed(&mut self) -> Vec<Effect> {
        if self.state.link.connected
            || !self.state.mode.is_multiplayer()
            || matches!(self.state.status, GameStatus::Menu | GameStatus::GameOver)
        {
            return Vec::new();
        }

        warn!("[{}] Peer did not return, forfeiting", self.state.short_id());
        round::end_game(&mut self.state, Outcome::Forfeit)
    }

    // =========================================================================
    // ROUND
    // =========================================================================

    /// Update one answer while PLAYING.
    pub fn set_answer(&mut self, category: Category, text: &str) -> Result<(), SessionError> {
        self.require_status(GameStatus::Playing)?;
        self.state.round.draft.set(category, text);
        Ok(())
    }

    /// Submit these answers now. No-op once the round left PLAYING.
    pub fn submit_round(&mut self, inputs: GameInputs) -> Vec<Effect> {
        if self.state.status != GameStatus::Playing {
            debug!("Submit ignored in {:?}", self.state.status);
            return Vec::new();
        }
        self.state.round.draft = inputs;
        round::finalize_round(&mut self.state, FinalizeCause::LocalStop)
    }

    /// Stop early with the current draft. In multiplayer the peer is told to
    /// stop as well.
    pub fn stop_round(&mut self) -> Vec<Effect> {
        if self.state.status != GameStatus::Playing {
            return Vec::new();
        }

        let mut effects = Vec::new();
        if self.state.mode.is_multiplayer() && self.state.link.connected {
            effects.push(Effect::Send(PeerMessage::StopRound));
        }
        effects.extend(round::finalize_round(&mut self.state, FinalizeCause::LocalStop));
        effects
    }

    /// Countdown for the tagged round finished.
    pub fn countdown_elapsed(&mut self, tag: RoundTag) -> Vec<Effect> {
        round::countdown_elapsed(&mut self.state, tag)
    }

    /// Round clock tick.
    pub fn timer_tick(&mut self, tag: RoundTag, remaining: u32) -> Vec<Effect> {
        round::timer_tick(&mut self.state, tag, remaining)
    }

    /// Judge returned for the tagged round.
    pub fn complete_judging(&mut self, tag: RoundTag, verdict: ValidationResult) -> Vec<Effect> {
        round::complete_validation(&mut self.state, tag, verdict)
    }

    /// Move past ROUND_RESULT. Host and solo only.
    pub fn advance(&mut self) -> Result<Vec<Effect>, SessionError> {
        self.require_status(GameStatus::RoundResult)?;
        if self.state.mode == GameMode::MultiGuest {
            debug!("Guest advance suppressed, waiting for host");
            return Err(SessionError::NotRoundAuthority);
        }
        if self.state.round.reconciled.is_none() || !self.state.history.contains(self.state.round_index) {
            return Err(SessionError::InvalidState(self.state.status));
        }

        match round::next_step(&self.state) {
            NextStep::Round(next) => Ok(self.host_round(next)),
            NextStep::GameOver => {
                let outcome = round::final_outcome(&self.state);
                let mut effects = Vec::new();
                if self.state.mode == GameMode::MultiHost {
                    effects.push(Effect::Send(PeerMessage::GameOver));
                }
                effects.extend(round::end_game(&mut self.state, outcome));
                Ok(effects)
            }
        }
    }

    // =========================================================================
    // PEER MESSAGES
    // =========================================================================

    /// Apply an inbound peer message.
    pub fn receive_peer_message(&mut self, msg: PeerMessage) -> Vec<Effect> {
        if self.state.link.role.is_none() {
            debug!("Dropping {} without a peer link", msg.kind());
            return Vec::new();
        }

        if !msg.is_lifecycle() {
            if let Some(idx) = msg.round_index() {
                if idx != self.state.round_index {
                    debug!(
                        "Stale {} for round {} (active {})",
                        msg.kind(),
                        idx,
                        self.state.round_index
                    );
                    return Vec::new();
                }
            }
        }

        match msg {
            PeerMessage::Joined { profile } => self.on_joined(profile),
            PeerMessage::Welcome { profile } => self.on_welcome(profile),
            PeerMessage::StartRound {
                letter,
                round_index,
                total_rounds,
                duration,
            } => self.on_start_round(letter, round_index, total_rounds, duration),
            PeerMessage::StopRound => self.on_stop_round(),
            PeerMessage::SubmitAnswers {
                inputs,
                validation,
                round_index,
            } => self.on_submit_answers(inputs, validation, round_index),
            PeerMessage::ChatMessage { text, sender_name } => self.on_chat(text, sender_name),
            PeerMessage::GameOver => self.on_game_over(),
            PeerMessage::Unknown => {
                debug!("Dropping unknown peer message");
                Vec::new()
            }
        }
    }

    fn on_joined(&mut self, profile: PlayerProfile) -> Vec<Effect> {
        if self.state.link.role != Some(PeerRole::Host) || self.state.status != GameStatus::Menu {
            return Vec::new();
        }

        info!("Guest {} {} joined", profile.avatar, profile.name);
        self.state.opponent = Some(profile.clone());
        self.state.profile_locked = true;

        vec![
            Effect::Send(PeerMessage::Welcome {
                profile: self.state.profile.clone(),
            }),
            Effect::Notify(Notice::OpponentProfile(profile)),
        ]
    }

    fn on_welcome(&mut self, profile: PlayerProfile) -> Vec<Effect> {
        if self.state.link.role != Some(PeerRole::Guest) {
            return Vec::new();
        }

        info!("Host is {} {}", profile.avatar, profile.name);
        self.state.opponent = Some(profile.clone());
        vec![Effect::Notify(Notice::OpponentProfile(profile))]
    }

    fn on_start_round(&mut self, letter: char, round_index: u32, total_rounds: u32, duration: u32) -> Vec<Effect> {
        if self.state.mode != GameMode::MultiGuest || self.state.status == GameStatus::GameOver {
            return Vec::new();
        }
        if self.state.status != GameStatus::Menu && round_index <= self.state.round_index {
            debug!("Duplicate START_ROUND for round {}", round_index);
            return Vec::new();
        }
        if GameConfig::new(duration, total_rounds).is_err()
            || round_index >= total_rounds
            || !is_playable(letter)
        {
            warn!(
                "Ignoring START_ROUND with bad parameters: {} round {} of {} ({}s)",
                letter, round_index, total_rounds, duration
            );
            return Vec::new();
        }

        self.state.duration_secs = duration;
        self.state.total_rounds = total_rounds;
        round::begin_round(
            &mut self.state,
            round_index,
            letter.to_ascii_uppercase(),
            self.countdown_delay,
        )
    }

    fn on_stop_round(&mut self) -> Vec<Effect> {
        match self.state.status {
            GameStatus::Playing => round::finalize_round(&mut self.state, FinalizeCause::PeerStop),
            GameStatus::Countdown => {
                debug!("STOP_ROUND during countdown, applying when play starts");
                self.state.round.stop_requested = true;
                Vec::new()
            }
            _ => Vec::new(),
        }
    }

    fn on_submit_answers(&mut self, inputs: GameInputs, validation: ValidationResult, round_index: u32) -> Vec<Effect> {
        if !self.state.mode.is_multiplayer()
            || matches!(self.state.status, GameStatus::Menu | GameStatus::GameOver)
        {
            return Vec::new();
        }
        if self.state.round.has_opponent() {
            debug!("Duplicate SUBMIT_ANSWERS for round {}", round_index);
            return Vec::new();
        }

        debug!(
            "Opponent verdict for round {}: {}",
            round_index, validation.total_round_score
        );
        self.state.round.opponent_inputs = Some(inputs);
        self.state.round.opponent_verdict = Some(validation);
        round::try_settle(&mut self.state)
    }

    fn on_chat(&mut self, text: String, sender_name: String) -> Vec<Effect> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        let entry = ChatEntry {
            sender_name,
            text,
            sent_at: Utc::now(),
            local: false,
        };
        self.state.chat.push(entry.clone());
        vec![Effect::Notify(Notice::Chat(entry))]
    }

    fn on_game_over(&mut self) -> Vec<Effect> {
        if self.state.mode != GameMode::MultiGuest
            || matches!(self.state.status, GameStatus::Menu | GameStatus::GameOver)
        {
            return Vec::new();
        }
        let outcome = round::final_outcome(&self.state);
        round::end_game(&mut self.state, outcome)
    }

    // =========================================================================
    // CHAT / RESET
    // =========================================================================

    /// Send a chat line to the peer. Blank text is a no-op.
    pub fn send_chat(&mut self, text: &str) -> Result<Vec<Effect>, SessionError> {
        if self.state.link.role.is_none() {
            return Err(SessionError::NotMultiplayer);
        }
        let text = text.trim();
        if text.is_empty() {
            return Ok(Vec::new());
        }
        if !self.state.link.connected {
            return Err(SessionError::NotConnected);
        }

        let entry = ChatEntry {
            sender_name: self.state.profile.name.clone(),
            text: text.to_string(),
            sent_at: Utc::now(),
            local: true,
        };
        self.state.chat.push(entry.clone());

        Ok(vec![
            Effect::Send(PeerMessage::ChatMessage {
                text: entry.text.clone(),
                sender_name: entry.sender_name.clone(),
            }),
            Effect::Notify(Notice::Chat(entry)),
        ])
    }

    /// Back to MENU with a clean slate. Closes any peer link.
    pub fn reset(&mut self) -> Vec<Effect> {
        let mut effects = vec![Effect::CancelTimers];
        if self.state.link.role.is_some() {
            effects.push(Effect::CloseLink);
        }

        self.clear_scores();
        self.state.status = GameStatus::Menu;
        self.state.mode = GameMode::Single;
        self.state.opponent = None;
        self.state.profile_locked = false;
        self.state.chat.clear();
        self.state.link = LinkState::default();

        effects.push(Effect::status(GameStatus::Menu, 0, None));
        effects
    }

    // =========================================================================
    // HELPERS
    // =========================================================================

    fn require_status(&self, status: GameStatus) -> Result<(), SessionError> {
        if self.state.status != status {
            return Err(SessionError::InvalidState(self.state.status));
        }
        Ok(())
    }

    fn apply_settings(&mut self, config: GameConfig) {
        self.state.duration_secs = config.duration_secs;
        self.state.total_rounds = config.total_rounds;
    }

    fn clear_scores(&mut self) {
        self.state.history.clear();
        self.state.used_letters.clear();
        self.state.round_index = 0;
        self.state.current_letter = None;
        self.state.round = RoundSlot::default();
        self.state.time_left = 0;
        self.state.outcome = None;
    }

    fn next_letter(&mut self) -> char {
        let draw = draw_letter(&mut self.rng, &self.state.used_letters);
        if draw.repeated {
            debug!("Letter budget exhausted, repeating {}", draw.letter);
        } else if draw.attempts > 0 {
            debug!("Drew {} after {} re-draws", draw.letter, draw.attempts);
        }
        draw.letter
    }

    /// Begin `round_index` as letter authority, telling the guest if hosting.
    fn host_round(&mut self, round_index: u32) -> Vec<Effect> {
        let letter = self.next_letter();
        let mut effects = Vec::new();
        if self.state.mode == GameMode::MultiHost {
            effects.push(Effect::Send(PeerMessage::StartRound {
                letter,
                round_index,
                total_rounds: self.state.total_rounds,
                duration: self.state.duration_secs,
            }));
        }
        effects.extend(round::begin_round(&mut self.state, round_index, letter, self.countdown_delay));
        effects
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::effects::JudgeRequest;
    use crate::judge::local_validate;

    fn solo() -> GameSession {
        GameSession::with_seed(PlayerProfile::new("Solo", "🦊"), 7)
    }

    fn sent(effects: &[Effect]) -> Vec<PeerMessage> {
        effects
            .iter()
            .filter_map(|e| match e {
                Effect::Send(msg) => Some(msg.clone()),
                _ => None,
            })
            .collect()
    }

    fn judge_request(effects: &[Effect]) -> JudgeRequest {
        effects
            .iter()
            .find_map(|e| match e {
                Effect::Judge(req) => Some(req.clone()),
                _ => None,
            })
            .expect("no judge request")
    }

    fn judge(session: &mut GameSession, effects: &[Effect]) -> Vec<Effect> {
        let request = judge_request(effects);
        let verdict = local_validate(request.letter, &request.inputs, "Offline Mode");
        session.complete_judging(request.tag, verdict)
    }

    fn connected_host() -> GameSession {
        let mut host = GameSession::with_seed(PlayerProfile::new("Host", "🐱"), 1);
        host.host_room().unwrap();
        host.room_opened(RoomCode::parse("4821").unwrap());
        host.peer_connected();
        host
    }

    #[test]
    fn test_solo_round_flow() {
        let mut session = solo();
        let effects = session.start_solo(GameConfig::new(30, 2).unwrap()).unwrap();
        assert_eq!(session.status(), GameStatus::Countdown);
        assert!(sent(&effects).is_empty());

        session.countdown_elapsed(session.state().round_tag());
        let letter = session.state().current_letter.unwrap();
        session.set_answer(Category::Name, &format!("{}ob", letter)).unwrap();

        let effects = session.stop_round();
        assert!(sent(&effects).is_empty());
        judge(&mut session, &effects);

        assert_eq!(session.status(), GameStatus::RoundResult);
        assert_eq!(session.state().my_total(), 10);
    }

    #[test]
    fn test_start_rejects_bad_settings() {
        let mut session = solo();
        let err = session.start_solo(GameConfig { duration_secs: 3, total_rounds: 5 });
        assert!(matches!(err, Err(SessionError::InvalidSettings { .. })));
        assert_eq!(session.status(), GameStatus::Menu);
    }

    #[test]
    fn test_set_answer_outside_playing() {
        let mut session = solo();
        assert_eq!(
            session.set_answer(Category::Thing, "Box"),
            Err(SessionError::InvalidState(GameStatus::Menu))
        );
    }

    #[test]
    fn test_submit_is_idempotent() {
        let mut session = solo();
        session.start_solo(GameConfig::default()).unwrap();
        session.countdown_elapsed(session.state().round_tag());

        let first = session.submit_round(GameInputs::new("A", "B", "C", "D"));
        assert!(!first.is_empty());
        assert!(session.submit_round(GameInputs::default()).is_empty());
        assert!(session.stop_round().is_empty());
        assert_eq!(session.state().round.inputs.as_ref().unwrap().name, "A");
    }

    #[test]
    fn test_advance_requires_result() {
        let mut session = solo();
        session.start_solo(GameConfig::default()).unwrap();
        assert_eq!(
            session.advance(),
            Err(SessionError::InvalidState(GameStatus::Countdown))
        );
    }

    #[test]
    fn test_solo_advance_to_game_over() {
        let mut session = solo();
        session.start_solo(GameConfig::new(10, 1).unwrap()).unwrap();
        session.countdown_elapsed(session.state().round_tag());
        let effects = session.stop_round();
        judge(&mut session, &effects);

        let effects = session.advance().unwrap();
        assert_eq!(session.status(), GameStatus::GameOver);
        assert_eq!(session.state().outcome, Some(Outcome::Solo));
        assert!(sent(&effects).is_empty());
    }

    #[test]
    fn test_host_start_guards() {
        let mut session = solo();
        assert_eq!(
            session.start_as_host(GameConfig::default()),
            Err(SessionError::NotMultiplayer)
        );

        session.host_room().unwrap();
        assert_eq!(
            session.start_as_host(GameConfig::default()),
            Err(SessionError::NotConnected)
        );

        session.peer_connected();
        assert_eq!(
            session.start_as_host(GameConfig::default()),
            Err(SessionError::OpponentUnknown)
        );
        assert_eq!(session.status(), GameStatus::Menu);
    }

    #[test]
    fn test_host_handshake_and_start() {
        let mut host = connected_host();
        let effects = host.receive_peer_message(PeerMessage::Joined {
            profile: PlayerProfile::new("Guest", "🐸"),
        });

        assert_eq!(
            sent(&effects),
            vec![PeerMessage::Welcome {
                profile: PlayerProfile::new("Host", "🐱")
            }]
        );
        assert!(host.state().profile_locked);
        assert_eq!(
            host.set_profile(PlayerProfile::default()),
            Err(SessionError::ProfileLocked)
        );

        let effects = host.start_as_host(GameConfig::new(20, 3).unwrap()).unwrap();
        match sent(&effects).as_slice() {
            [PeerMessage::StartRound { round_index, total_rounds, duration, letter }] => {
                assert_eq!(*round_index, 0);
                assert_eq!(*total_rounds, 3);
                assert_eq!(*duration, 20);
                assert_eq!(Some(*letter), host.state().current_letter);
            }
            other => panic!("Unexpected sends: {:?}", other),
        }
    }

    #[test]
    fn test_guest_join_sends_profile() {
        let mut guest = GameSession::with_seed(PlayerProfile::new("Gus", "🐸"), 2);
        assert!(matches!(
            guest.join_as_guest("12"),
            Err(SessionError::InvalidRoomCode(_))
        ));

        let effects = guest.join_as_guest(" 4821 ").unwrap();
        assert_eq!(effects, vec![Effect::Connect { room_code: "4821".to_string() }]);
        assert_eq!(guest.state().mode, GameMode::MultiGuest);

        let effects = guest.peer_connected();
        assert_eq!(
            sent(&effects),
            vec![PeerMessage::Joined {
                profile: PlayerProfile::new("Gus", "🐸")
            }]
        );
    }

    #[test]
    fn test_guest_start_round_syncs_settings() {
        let mut guest = GameSession::with_seed(PlayerProfile::default(), 2);
        guest.join_as_guest("4821").unwrap();
        guest.peer_connected();

        guest.receive_peer_message(PeerMessage::StartRound {
            letter: 'm',
            round_index: 0,
            total_rounds: 2,
            duration: 15,
        });

        assert_eq!(guest.status(), GameStatus::Countdown);
        assert_eq!(guest.state().current_letter, Some('M'));
        assert_eq!(guest.state().duration_secs, 15);
        assert_eq!(guest.state().total_rounds, 2);

        // Replayed start for the same round changes nothing
        guest.countdown_elapsed(guest.state().round_tag());
        assert!(guest
            .receive_peer_message(PeerMessage::StartRound {
                letter: 'K',
                round_index: 0,
                total_rounds: 2,
                duration: 15,
            })
            .is_empty());
        assert_eq!(guest.status(), GameStatus::Playing);
    }

    #[test]
    fn test_guest_rejects_round_past_total() {
        let mut guest = GameSession::with_seed(PlayerProfile::default(), 2);
        guest.join_as_guest("4821").unwrap();
        guest.peer_connected();

        let past_end = PeerMessage::StartRound {
            letter: 'B',
            round_index: 7,
            total_rounds: 2,
            duration: 60,
        };
        assert!(guest.receive_peer_message(past_end).is_empty());
        assert_eq!(guest.status(), GameStatus::Menu);

        let unplayable = PeerMessage::StartRound {
            letter: 'Q',
            round_index: 0,
            total_rounds: 2,
            duration: 60,
        };
        assert!(guest.receive_peer_message(unplayable).is_empty());
        assert_eq!(guest.status(), GameStatus::Menu);
        assert_eq!(guest.state().round_index, 0);
    }

    #[test]
    fn test_verdict_from_previous_game_discarded() {
        let mut session = solo();
        session.start_solo(GameConfig::new(30, 2).unwrap()).unwrap();
        session.countdown_elapsed(session.state().round_tag());
        let old_letter = session.state().current_letter.unwrap();
        let effects = session.submit_round(GameInputs::new(
            format!("{}ob", old_letter),
            format!("{}razil", old_letter),
            format!("{}ear", old_letter),
            format!("{}ox", old_letter),
        ));
        let old_request = judge_request(&effects);

        // Back to the menu while the judge is still out, then a new game
        session.reset();
        session.start_solo(GameConfig::new(30, 2).unwrap()).unwrap();
        session.countdown_elapsed(session.state().round_tag());
        let effects = session.submit_round(GameInputs::default());
        let new_request = judge_request(&effects);

        assert_eq!(old_request.tag.round_index, new_request.tag.round_index);
        assert_ne!(old_request.tag, new_request.tag);

        let stale = local_validate(old_letter, &old_request.inputs, "Offline Mode");
        assert_eq!(stale.total_round_score, 40);
        assert!(session.complete_judging(old_request.tag, stale).is_empty());
        assert_eq!(session.status(), GameStatus::Validating);
        assert!(session.state().round.verdict.is_none());
        assert!(session.state().history.is_empty());

        let fresh = local_validate(new_request.letter, &new_request.inputs, "Offline Mode");
        session.complete_judging(new_request.tag, fresh);
        assert_eq!(session.status(), GameStatus::RoundResult);
        assert_eq!(session.state().my_total(), 0);
    }

    #[test]
    fn test_stop_round_during_countdown_deferred() {
        let mut guest = GameSession::with_seed(PlayerProfile::default(), 2);
        guest.join_as_guest("4821").unwrap();
        guest.peer_connected();
        guest.receive_peer_message(PeerMessage::StartRound {
            letter: 'A',
            round_index: 0,
            total_rounds: 2,
            duration: 60,
        });

        assert!(guest.receive_peer_message(PeerMessage::StopRound).is_empty());
        assert!(guest.state().round.stop_requested);

        let effects = guest.countdown_elapsed(guest.state().round_tag());
        assert_eq!(guest.status(), GameStatus::Validating);
        assert!(effects.iter().any(|e| matches!(e, Effect::Judge(_))));
    }

    #[test]
    fn test_local_stop_notifies_peer() {
        let mut host = connected_host();
        host.receive_peer_message(PeerMessage::Joined { profile: PlayerProfile::default() });
        host.start_as_host(GameConfig::default()).unwrap();
        host.countdown_elapsed(host.state().round_tag());

        let effects = host.stop_round();
        assert_eq!(sent(&effects), vec![PeerMessage::StopRound]);
        assert_eq!(host.status(), GameStatus::Validating);
    }

    #[test]
    fn test_disconnect_in_lobby_clears_link() {
        let mut host = connected_host();
        host.receive_peer_message(PeerMessage::Joined { profile: PlayerProfile::default() });

        let effects = host.peer_disconnected("closed");
        assert!(effects.contains(&Effect::CloseLink));
        assert!(host.state().opponent.is_none());
        assert_eq!(host.state().link, LinkState::default());
        assert!(host.forfeit_elapsed().is_empty());
    }

    #[test]
    fn test_disconnect_mid_game_forfeits() {
        let mut host = connected_host().with_disconnect_grace(Duration::from_secs(5));
        host.receive_peer_message(PeerMessage::Joined { profile: PlayerProfile::default() });
        host.start_as_host(GameConfig::default()).unwrap();

        let effects = host.peer_disconnected("reset by peer");
        assert!(effects.contains(&Effect::ScheduleForfeit { grace: Duration::from_secs(5) }));
        assert_eq!(host.status(), GameStatus::Countdown);

        host.forfeit_elapsed();
        assert_eq!(host.status(), GameStatus::GameOver);
        assert_eq!(host.state().outcome, Some(Outcome::Forfeit));
    }

    #[test]
    fn test_chat() {
        let mut session = solo();
        assert_eq!(session.send_chat("hi"), Err(SessionError::NotMultiplayer));

        let mut host = connected_host();
        assert_eq!(host.send_chat("   ").unwrap(), Vec::new());

        let effects = host.send_chat(" gg ").unwrap();
        assert_eq!(
            sent(&effects),
            vec![PeerMessage::ChatMessage {
                text: "gg".to_string(),
                sender_name: "Host".to_string()
            }]
        );

        host.receive_peer_message(PeerMessage::ChatMessage {
            text: "wp".to_string(),
            sender_name: "Guest".to_string(),
        });
        assert_eq!(host.state().chat.len(), 2);
        assert!(host.state().chat[0].local);
        assert!(!host.state().chat[1].local);
    }

    #[test]
    fn test_reset_closes_link() {
        let mut host = connected_host();
        let effects = host.reset();
        assert!(effects.contains(&Effect::CloseLink));
        assert_eq!(host.status(), GameStatus::Menu);
        assert!(host.state().link.role.is_none());
        assert!(host.set_profile(PlayerProfile::new("New", "🐼")).is_ok());
    }

    #[test]
    fn test_messages_without_link_dropped() {
        let mut session = solo();
        assert!(session.receive_peer_message(PeerMessage::GameOver).is_empty());
        assert!(session
            .receive_peer_message(PeerMessage::Joined { profile: PlayerProfile::default() })
            .is_empty());
    }
}
