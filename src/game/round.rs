//! Round State Machine
//!
//! Guarded transitions over [`SessionState`]. Every timer and judge callback
//! carries the [`RoundTag`] it was issued under; a callback whose tag or
//! status no longer matches is dropped without touching state. The tag's
//! generation survives resets, so a verdict from an earlier game never lands
//! in a later one that reached the same round index.
//!
//! ```text
//! MENU -> COUNTDOWN -> PLAYING -> VALIDATING -> ROUND_RESULT -> COUNTDOWN ...
//!                                                           \-> GAME_OVER
//! ```

use std::time::Duration;

use tracing::{debug, info};

use crate::game::effects::{Effect, JudgeRequest, Notice};
use crate::game::scoring::settle_round;
use crate::game::state::{GameStatus, Outcome, RoundSlot, RoundTag, SessionState, ValidationResult};
use crate::network::protocol::PeerMessage;

/// What ended the PLAYING phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FinalizeCause {
    /// Round clock reached zero.
    TimerExpired,
    /// Local player submitted or stopped early.
    LocalStop,
    /// Peer sent STOP_ROUND.
    PeerStop,
}

/// Where `advance` leads from ROUND_RESULT.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NextStep {
    /// Start the round with this index.
    Round(u32),
    /// Final round done.
    GameOver,
}

/// Enter COUNTDOWN for `round_index` with a fresh round slot.
pub fn begin_round(state: &mut SessionState, round_index: u32, letter: char, delay: Duration) -> Vec<Effect> {
    state.round_index = round_index;
    state.generation += 1;
    state.current_letter = Some(letter);
    state.used_letters.insert(letter);
    state.round = RoundSlot::default();
    state.time_left = state.duration_secs;
    state.status = GameStatus::Countdown;

    info!(
        "Round {}/{} letter {} ({}s)",
        round_index + 1,
        state.total_rounds,
        letter,
        state.duration_secs
    );

    vec![
        Effect::CancelTimers,
        Effect::status(GameStatus::Countdown, round_index, Some(letter)),
        Effect::StartCountdown {
            tag: state.round_tag(),
            delay,
        },
    ]
}

/// COUNTDOWN -> PLAYING. Applies a STOP_ROUND that arrived early.
pub fn countdown_elapsed(state: &mut SessionState, tag: RoundTag) -> Vec<Effect> {
    if state.status != GameStatus::Countdown || state.round_tag() != tag {
        debug!("Ignoring countdown for {:?}", tag);
        return Vec::new();
    }

    state.status = GameStatus::Playing;
    let mut effects = vec![
        Effect::status(GameStatus::Playing, tag.round_index, state.current_letter),
        Effect::StartRoundTimer {
            tag,
            seconds: state.duration_secs,
        },
    ];

    if state.round.stop_requested {
        effects.extend(finalize_round(state, FinalizeCause::PeerStop));
    }

    effects
}

/// One second of the round clock.
pub fn timer_tick(state: &mut SessionState, tag: RoundTag, remaining: u32) -> Vec<Effect> {
    if state.status != GameStatus::Playing || state.round_tag() != tag {
        return Vec::new();
    }

    state.time_left = remaining;
    let mut effects = vec![Effect::Notify(Notice::TimeLeft(remaining))];
    if remaining == 0 {
        effects.extend(finalize_round(state, FinalizeCause::TimerExpired));
    }
    effects
}

/// PLAYING -> VALIDATING. Freezes the draft and requests judging.
///
/// Only acts while PLAYING, so whichever trigger fires first wins and the
/// rest are no-ops.
pub fn finalize_round(state: &mut SessionState, cause: FinalizeCause) -> Vec<Effect> {
    if state.status != GameStatus::Playing {
        debug!("Round {} already finalized ({:?} ignored)", state.round_index, cause);
        return Vec::new();
    }

    let letter = match state.current_letter {
        Some(l) => l,
        None => return Vec::new(),
    };

    let inputs = state.round.draft.clone();
    state.round.inputs = Some(inputs.clone());
    state.status = GameStatus::Validating;

    info!("Round {} finalized: {:?}", state.round_index + 1, cause);

    vec![
        Effect::CancelTimers,
        Effect::status(GameStatus::Validating, state.round_index, Some(letter)),
        Effect::Judge(JudgeRequest {
            tag: state.round_tag(),
            letter,
            inputs,
        }),
    ]
}

/// VALIDATING -> ROUND_RESULT with the judged verdict.
///
/// A verdict for another round or an earlier game, or one arriving outside
/// VALIDATING, is discarded.
pub fn complete_validation(state: &mut SessionState, tag: RoundTag, verdict: ValidationResult) -> Vec<Effect> {
    if state.status != GameStatus::Validating || state.round_tag() != tag {
        debug!(
            "Discarding verdict for {:?} (active {:?}, {:?})",
            tag,
            state.round_tag(),
            state.status
        );
        return Vec::new();
    }
    let round_index = tag.round_index;

    let inputs = match &state.round.inputs {
        Some(inputs) => inputs.clone(),
        None => return Vec::new(),
    };

    state.round.verdict = Some(verdict.clone());
    state.status = GameStatus::RoundResult;

    let mut effects = Vec::new();
    if state.mode.is_multiplayer() {
        effects.push(Effect::Send(PeerMessage::SubmitAnswers {
            inputs,
            validation: verdict.clone(),
            round_index,
        }));
    }
    effects.push(Effect::Notify(Notice::LocalVerdict(verdict)));
    effects.push(Effect::status(GameStatus::RoundResult, round_index, state.current_letter));
    effects.extend(try_settle(state));
    effects
}

/// Reconcile and record the round if all verdicts are in.
pub fn try_settle(state: &mut SessionState) -> Vec<Effect> {
    if state.status != GameStatus::RoundResult {
        return Vec::new();
    }

    match settle_round(state) {
        Some(reconciled) => vec![Effect::Notify(Notice::RoundScored {
            round_index: state.round_index,
            mine: reconciled.mine,
            theirs: reconciled.theirs,
            my_total: state.my_total(),
            opponent_total: state.opponent_total(),
        })],
        None => Vec::new(),
    }
}

/// Next step after the active round. The next index is computed here, not
/// read back after the transition.
pub fn next_step(state: &SessionState) -> NextStep {
    if state.is_last_round() {
        NextStep::GameOver
    } else {
        NextStep::Round(state.round_index + 1)
    }
}

/// Result of a finished session from the local side.
pub fn final_outcome(state: &SessionState) -> Outcome {
    if !state.mode.is_multiplayer() {
        return Outcome::Solo;
    }

    let mine = state.my_total();
    let theirs = state.opponent_total();
    if mine > theirs {
        Outcome::Won
    } else if mine < theirs {
        Outcome::Lost
    } else {
        Outcome::Tie
    }
}

/// Enter GAME_OVER.
pub fn end_game(state: &mut SessionState, outcome: Outcome) -> Vec<Effect> {
    if state.status == GameStatus::GameOver {
        return Vec::new();
    }

    state.status = GameStatus::GameOver;
    state.outcome = Some(outcome);

    info!(
        "Game over ({:?}): {} - {} after {} rounds",
        outcome,
        state.my_total(),
        state.opponent_total(),
        state.history.len()
    );

    vec![
        Effect::CancelTimers,
        Effect::status(GameStatus::GameOver, state.round_index, state.current_letter),
        Effect::Notify(Notice::GameOver {
            outcome,
            my_total: state.my_total(),
            opponent_total: state.opponent_total(),
        }),
    ]
}
