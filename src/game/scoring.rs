//! Score Reconciliation
//!
//! Merges local and opponent verdicts for a round, applies the collision
//! rule, and keeps the append-only score history. Raw verdicts are never
//! touched: adjustment works on copies.

use serde::{Serialize, Deserialize};
use tracing::{debug, info, warn};

use crate::core::hash::{round_fingerprint, short_hex};
use crate::game::state::{
    Category, GameInputs, GameMode, RoundRecord, RoundSlot, SessionState, ValidationResult,
};

/// Points each player gets for a shared valid answer.
pub const COLLISION_SCORE: u32 = 5;

/// Message shown on the local side of a collision.
pub const COLLISION_MESSAGE_LOCAL: &str = "Same answer as opponent! (5pts)";

/// Message shown on the opponent's side of a collision.
pub const COLLISION_MESSAGE_OPPONENT: &str = "Same answer! (5pts)";

/// Adjusted verdicts for one round.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciledRound {
    /// Adjusted local result.
    pub mine: ValidationResult,
    /// Adjusted opponent result (multiplayer only).
    pub theirs: Option<ValidationResult>,
    /// Categories where both players gave the same valid answer.
    pub collisions: Vec<Category>,
}

/// Apply the collision rule to copies of both verdicts.
///
/// A category collides when both scores are positive and both answers are
/// equal and non-empty after trimming and lowercasing. Totals are recomputed
/// from the category scores afterwards.
pub fn apply_collisions(
    my_inputs: &GameInputs,
    mine: &ValidationResult,
    their_inputs: &GameInputs,
    theirs: &ValidationResult,
) -> ReconciledRound {
    let mut mine = mine.clone();
    let mut theirs = theirs.clone();
    let mut collisions = Vec::new();

    for category in Category::ALL {
        let my_word = my_inputs.normalized(category);
        let their_word = their_inputs.normalized(category);

        let both_scored = mine.item(category).score > 0 && theirs.item(category).score > 0;
        if both_scored && !my_word.is_empty() && my_word == their_word {
            let my_item = mine.item_mut(category);
            my_item.score = COLLISION_SCORE;
            my_item.message = COLLISION_MESSAGE_LOCAL.to_string();

            let their_item = theirs.item_mut(category);
            their_item.score = COLLISION_SCORE;
            their_item.message = COLLISION_MESSAGE_OPPONENT.to_string();

            collisions.push(category);
        }
    }

    mine.recompute_total();
    theirs.recompute_total();

    ReconciledRound {
        mine,
        theirs: Some(theirs),
        collisions,
    }
}

/// Reconcile the current round if everything it needs is present.
///
/// Solo needs the local verdict. Multiplayer needs local inputs and verdict
/// plus opponent inputs and verdict; partial data yields `None`.
pub fn reconcile(mode: GameMode, slot: &RoundSlot) -> Option<ReconciledRound> {
    let mine = slot.verdict.as_ref()?;

    if !mode.is_multiplayer() {
        return Some(ReconciledRound {
            mine: mine.clone(),
            theirs: None,
            collisions: Vec::new(),
        });
    }

    let my_inputs = slot.inputs.as_ref()?;
    let their_inputs = slot.opponent_inputs.as_ref()?;
    let theirs = slot.opponent_verdict.as_ref()?;

    Some(apply_collisions(my_inputs, mine, their_inputs, theirs))
}

/// Result of offering a record to the history.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordOutcome {
    /// Appended as the next round.
    Appended,
    /// A record for this index already exists.
    Duplicate,
    /// Appending would skip an index.
    OutOfOrder,
}

/// Append-only per-round scores. Totals are always sums over the records.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreHistory {
    records: Vec<RoundRecord>,
}

impl ScoreHistory {
    /// Empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record if its index is the next one.
    pub fn record(&mut self, record: RoundRecord) -> RecordOutcome {
        let next = self.records.len() as u32;
        if record.round_index < next {
            RecordOutcome::Duplicate
        } else if record.round_index > next {
            RecordOutcome::OutOfOrder
        } else {
            self.records.push(record);
            RecordOutcome::Appended
        }
    }

    /// Whether a round index has been recorded.
    pub fn contains(&self, round_index: u32) -> bool {
        (round_index as usize) < self.records.len()
    }

    /// All records, oldest first.
    pub fn records(&self) -> &[RoundRecord] {
        &self.records
    }

    /// Number of recorded rounds.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Local cumulative score.
    pub fn my_total(&self) -> u32 {
        self.records.iter().map(|r| r.my).sum()
    }

    /// Opponent cumulative score.
    pub fn opponent_total(&self) -> u32 {
        self.records.iter().map(|r| r.opp).sum()
    }

    /// Drop all records.
    pub fn clear(&mut self) {
        self.records.clear();
    }
}

/// Settle the current round: reconcile, store the adjusted copies, and
/// record the totals once.
///
/// Returns the adjusted round the first time it becomes available; later
/// calls for the same round return `None`.
pub fn settle_round(state: &mut SessionState) -> Option<ReconciledRound> {
    if state.round.reconciled.is_some() {
        return None;
    }

    let reconciled = reconcile(state.mode, &state.round)?;
    let letter = state.current_letter.unwrap_or('-');

    let record = RoundRecord {
        round_index: state.round_index,
        letter,
        my: reconciled.mine.total_round_score,
        opp: reconciled.theirs.as_ref().map(|r| r.total_round_score).unwrap_or(0),
    };

    match state.history.record(record.clone()) {
        RecordOutcome::Appended => {
            info!(
                "Round {} ({}) recorded: {} - {}",
                record.round_index + 1, letter, record.my, record.opp
            );
        }
        RecordOutcome::Duplicate => {
            debug!("Round {} already recorded", record.round_index);
        }
        RecordOutcome::OutOfOrder => {
            warn!(
                "Refusing to record round {} with {} rounds in history",
                record.round_index,
                state.history.len()
            );
        }
    }

    log_fingerprints(state);

    if !reconciled.collisions.is_empty() {
        debug!("Collisions in round {}: {:?}", state.round_index, reconciled.collisions);
    }

    state.round.reconciled = Some(reconciled.clone());
    Some(reconciled)
}

fn log_fingerprints(state: &SessionState) {
    let letter = state.current_letter.unwrap_or('-');
    let slot = &state.round;

    if let (Some(inputs), Some(verdict)) = (&slot.inputs, &slot.verdict) {
        let fp = round_fingerprint(state.round_index, letter, inputs, verdict);
        debug!("Local verdict fingerprint: {}", short_hex(&fp));
    }
    if let (Some(inputs), Some(verdict)) = (&slot.opponent_inputs, &slot.opponent_verdict) {
        let fp = round_fingerprint(state.round_index, letter, inputs, verdict);
        debug!("Opponent verdict fingerprint: {}", short_hex(&fp));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::state::{PlayerProfile, ValidationItem};
    use proptest::prelude::*;

    fn all_valid() -> ValidationResult {
        ValidationResult::from_items(
            ValidationItem::accepted("ok"),
            ValidationItem::accepted("ok"),
            ValidationItem::accepted("ok"),
            ValidationItem::accepted("ok"),
        )
    }

    fn record(round_index: u32, my: u32, opp: u32) -> RoundRecord {
        RoundRecord { round_index, letter: 'A', my, opp }
    }

    #[test]
    fn test_collision_on_same_thing() {
        let mine = GameInputs::new("Ann", "Angola", "Ant", "Apple");
        let theirs = GameInputs::new("Alice", "Austria", "Ape", " apple ");

        let result = apply_collisions(&mine, &all_valid(), &theirs, &all_valid());

        assert_eq!(result.collisions, vec![Category::Thing]);
        assert_eq!(result.mine.thing.score, COLLISION_SCORE);
        assert_eq!(result.mine.thing.message, COLLISION_MESSAGE_LOCAL);
        let theirs = result.theirs.unwrap();
        assert_eq!(theirs.thing.score, COLLISION_SCORE);
        assert_eq!(theirs.thing.message, COLLISION_MESSAGE_OPPONENT);
        assert_eq!(result.mine.total_round_score, 35);
        assert_eq!(theirs.total_round_score, 35);
    }

    #[test]
    fn test_no_collision_when_one_side_invalid() {
        let inputs = GameInputs::new("Ann", "Angola", "Ant", "Apple");
        let mut theirs = all_valid();
        theirs.thing = ValidationItem::rejected("Not a thing");
        theirs.recompute_total();

        let result = apply_collisions(&inputs, &all_valid(), &inputs, &theirs);

        // Every other category collides, thing does not
        assert_eq!(result.collisions.len(), 3);
        assert_eq!(result.mine.thing.score, 10);
        assert_eq!(result.mine.total_round_score, 25);
        assert_eq!(result.theirs.unwrap().total_round_score, 15);
    }

    #[test]
    fn test_empty_answers_never_collide() {
        let empty = GameInputs::default();
        let result = apply_collisions(&empty, &all_valid(), &empty, &all_valid());
        assert!(result.collisions.is_empty());
        assert_eq!(result.mine.total_round_score, 40);
    }

    #[test]
    fn test_raw_verdicts_untouched() {
        let inputs = GameInputs::new("Ann", "Angola", "Ant", "Apple");
        let mine = all_valid();
        let theirs = all_valid();

        let _ = apply_collisions(&inputs, &mine, &inputs, &theirs);

        assert_eq!(mine, all_valid());
        assert_eq!(theirs, all_valid());
    }

    #[test]
    fn test_reconcile_waits_for_all_parts() {
        let mut slot = RoundSlot::default();
        assert!(reconcile(GameMode::MultiHost, &slot).is_none());

        slot.verdict = Some(all_valid());
        slot.inputs = Some(GameInputs::new("Ann", "", "", ""));
        assert!(reconcile(GameMode::MultiHost, &slot).is_none());
        assert!(reconcile(GameMode::Single, &slot).is_some());

        slot.opponent_verdict = Some(all_valid());
        assert!(reconcile(GameMode::MultiGuest, &slot).is_none());

        slot.opponent_inputs = Some(GameInputs::new("Bea", "", "", ""));
        assert!(reconcile(GameMode::MultiGuest, &slot).is_some());
    }

    #[test]
    fn test_history_append_rules() {
        let mut history = ScoreHistory::new();
        assert_eq!(history.record(record(1, 10, 0)), RecordOutcome::OutOfOrder);
        assert_eq!(history.record(record(0, 40, 30)), RecordOutcome::Appended);
        assert_eq!(history.record(record(0, 40, 30)), RecordOutcome::Duplicate);
        assert_eq!(history.record(record(1, 20, 35)), RecordOutcome::Appended);

        assert_eq!(history.len(), 2);
        assert_eq!(history.my_total(), 60);
        assert_eq!(history.opponent_total(), 65);
        assert!(history.contains(1));
        assert!(!history.contains(2));
    }

    #[test]
    fn test_settle_round_is_idempotent() {
        let mut state = SessionState::new([0; 16], PlayerProfile::default());
        state.current_letter = Some('B');
        state.round.inputs = Some(GameInputs::new("Bob", "Brazil", "Bear", "Box"));
        state.round.verdict = Some(all_valid());

        let first = settle_round(&mut state);
        assert_eq!(first.unwrap().mine.total_round_score, 40);
        assert!(settle_round(&mut state).is_none());

        // Even if the slot were re-evaluated, the index is not recorded twice
        state.round.reconciled = None;
        assert!(settle_round(&mut state).is_some());
        assert_eq!(state.history.len(), 1);
        assert_eq!(state.my_total(), 40);
    }

    fn verdict_strategy() -> impl Strategy<Value = ValidationResult> {
        proptest::collection::vec(any::<bool>(), 4).prop_map(|flags| {
            let item = |ok: bool| {
                if ok {
                    ValidationItem::accepted("ok")
                } else {
                    ValidationItem::rejected("no")
                }
            };
            ValidationResult::from_items(item(flags[0]), item(flags[1]), item(flags[2]), item(flags[3]))
        })
    }

    fn word_strategy() -> impl Strategy<Value = String> {
        prop_oneof![
            Just(String::new()),
            Just("Apple".to_string()),
            Just(" apple".to_string()),
            Just("Ant".to_string()),
            "[a-zA-Z ]{0,6}",
        ]
    }

    fn inputs_strategy() -> impl Strategy<Value = GameInputs> {
        (word_strategy(), word_strategy(), word_strategy(), word_strategy())
            .prop_map(|(n, p, a, t)| GameInputs::new(n, p, a, t))
    }

    proptest! {
        #[test]
        fn prop_totals_match_category_sums(
            my_inputs in inputs_strategy(),
            their_inputs in inputs_strategy(),
            mine in verdict_strategy(),
            theirs in verdict_strategy(),
        ) {
            prop_assert_eq!(mine.total_round_score % 10, 0);

            let result = apply_collisions(&my_inputs, &mine, &their_inputs, &theirs);
            let adjusted_theirs = result.theirs.clone().unwrap();

            prop_assert_eq!(result.mine.total_round_score, result.mine.category_sum());
            prop_assert_eq!(adjusted_theirs.total_round_score, adjusted_theirs.category_sum());
            prop_assert_eq!(result.mine.total_round_score % 5, 0);
            prop_assert_eq!(adjusted_theirs.total_round_score % 5, 0);
        }

        #[test]
        fn prop_collision_rule(
            my_inputs in inputs_strategy(),
            their_inputs in inputs_strategy(),
            mine in verdict_strategy(),
            theirs in verdict_strategy(),
        ) {
            let result = apply_collisions(&my_inputs, &mine, &their_inputs, &theirs);
            let adjusted_theirs = result.theirs.clone().unwrap();

            for category in Category::ALL {
                let word = my_inputs.normalized(category);
                let expected = mine.item(category).score > 0
                    && theirs.item(category).score > 0
                    && !word.is_empty()
                    && word == their_inputs.normalized(category);

                prop_assert_eq!(result.collisions.contains(&category), expected);
                if expected {
                    prop_assert_eq!(result.mine.item(category).score, COLLISION_SCORE);
                    prop_assert_eq!(adjusted_theirs.item(category).score, COLLISION_SCORE);
                } else {
                    prop_assert_eq!(result.mine.item(category), mine.item(category));
                    prop_assert_eq!(adjusted_theirs.item(category), theirs.item(category));
                }
            }
        }

        #[test]
        fn prop_history_never_exceeds_index(offers in proptest::collection::vec(0u32..8, 0..40)) {
            let mut history = ScoreHistory::new();
            let mut highest: Option<u32> = None;
            for idx in offers {
                if history.record(record(idx, 10, 10)) == RecordOutcome::Appended {
                    highest = Some(highest.map_or(idx, |h| h.max(idx)));
                }
                let bound = highest.map_or(0, |h| h as usize + 1);
                prop_assert!(history.len() <= bound);
            }
            for (i, r) in history.records().iter().enumerate() {
                prop_assert_eq!(r.round_index as usize, i);
            }
        }
    }
}
