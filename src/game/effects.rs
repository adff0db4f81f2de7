//! Transition Effects
//!
//! Transitions never perform I/O. They return effects that the runtime
//! executes: peer sends, timers, judge calls, and UI notices.

use std::time::Duration;

use crate::game::state::{
    ChatEntry, GameInputs, GameStatus, Outcome, PlayerProfile, RoundTag, ValidationResult,
};
use crate::network::protocol::PeerMessage;

/// A judge call tagged with the round it belongs to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JudgeRequest {
    /// Round the verdict will be filed under.
    pub tag: RoundTag,
    /// Round letter.
    pub letter: char,
    /// Frozen answers.
    pub inputs: GameInputs,
}

/// Side effect requested by a transition.
#[derive(Clone, Debug, PartialEq)]
pub enum Effect {
    /// Fire-and-forget message to the peer.
    Send(PeerMessage),
    /// Open a room and wait for a guest.
    OpenRoom,
    /// Dial a host's room.
    Connect {
        /// Code the host shared.
        room_code: String,
    },
    /// Tear down the peer link.
    CloseLink,
    /// Fire `countdown_elapsed(tag)` after `delay`.
    StartCountdown {
        /// Round being counted in.
        tag: RoundTag,
        /// Delay before PLAYING.
        delay: Duration,
    },
    /// Tick `timer_tick(tag, remaining)` once per second.
    StartRoundTimer {
        /// Round being timed.
        tag: RoundTag,
        /// Seconds on the clock.
        seconds: u32,
    },
    /// Cancel the countdown and round timers.
    CancelTimers,
    /// Run the judge and report through `complete_judging`.
    Judge(JudgeRequest),
    /// Fire `forfeit_elapsed()` after `grace`.
    ScheduleForfeit {
        /// Grace period before forfeiting.
        grace: Duration,
    },
    /// Something the UI should show.
    Notify(Notice),
}

/// UI-facing notifications.
#[derive(Clone, Debug, PartialEq)]
pub enum Notice {
    /// Status moved.
    Status {
        /// New status.
        status: GameStatus,
        /// Active round.
        round_index: u32,
        /// Active letter.
        letter: Option<char>,
    },
    /// Seconds left in the round.
    TimeLeft(u32),
    /// A room is open under this code.
    RoomOpened(String),
    /// Peer link came up.
    PeerConnected,
    /// Opponent identity arrived.
    OpponentProfile(PlayerProfile),
    /// Local verdict arrived; opponent may still be pending.
    LocalVerdict(ValidationResult),
    /// Round scored (adjusted results and running totals).
    RoundScored {
        /// Round index.
        round_index: u32,
        /// Adjusted local result.
        mine: ValidationResult,
        /// Adjusted opponent result (multiplayer).
        theirs: Option<ValidationResult>,
        /// Local cumulative total.
        my_total: u32,
        /// Opponent cumulative total.
        opponent_total: u32,
    },
    /// Chat line appended.
    Chat(ChatEntry),
    /// Peer link dropped.
    PeerLost(String),
    /// Session ended.
    GameOver {
        /// Result from the local point of view.
        outcome: Outcome,
        /// Local total.
        my_total: u32,
        /// Opponent total.
        opponent_total: u32,
    },
}

impl Effect {
    /// Shorthand for a status notice.
    pub fn status(status: GameStatus, round_index: u32, letter: Option<char>) -> Self {
        Effect::Notify(Notice::Status { status, round_index, letter })
    }
}
