//! Score reconciliation benchmarks.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::{rngs::StdRng, Rng, SeedableRng};

use npat::game::scoring::{apply_collisions, settle_round};
use npat::game::state::{SessionState, ValidationItem};
use npat::{GameInputs, GameMode, PlayerProfile, ValidationResult};

const WORDS: [&str; 8] = ["Apple", "apple ", "Ant", "Angola", "Alice", "Axe", "", "Ape"];

fn random_inputs(rng: &mut StdRng) -> GameInputs {
    let mut pick = || WORDS[rng.gen_range(0..WORDS.len())];
    GameInputs::new(pick(), pick(), pick(), pick())
}

fn random_verdict(rng: &mut StdRng) -> ValidationResult {
    let mut item = || {
        if rng.gen_bool(0.7) {
            ValidationItem::accepted("ok")
        } else {
            ValidationItem::rejected("no")
        }
    };
    ValidationResult::from_items(item(), item(), item(), item())
}

fn bench_apply_collisions(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(7);
    let rounds: Vec<_> = (0..256)
        .map(|_| {
            (
                random_inputs(&mut rng),
                random_verdict(&mut rng),
                random_inputs(&mut rng),
                random_verdict(&mut rng),
            )
        })
        .collect();

    c.bench_function("apply_collisions_256", |b| {
        b.iter(|| {
            for (mi, mv, ti, tv) in &rounds {
                black_box(apply_collisions(mi, mv, ti, tv));
            }
        })
    });
}

fn bench_settle_game(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(11);
    let inputs = random_inputs(&mut rng);
    let verdict = random_verdict(&mut rng);

    c.bench_function("settle_20_rounds", |b| {
        b.iter(|| {
            let mut state = SessionState::new([0; 16], PlayerProfile::default());
            state.mode = GameMode::MultiHost;
            state.current_letter = Some('A');
            for round_index in 0..20 {
                state.round_index = round_index;
                state.round = Default::default();
                state.round.inputs = Some(inputs.clone());
                state.round.verdict = Some(verdict.clone());
                state.round.opponent_inputs = Some(inputs.clone());
                state.round.opponent_verdict = Some(verdict.clone());
                black_box(settle_round(&mut state));
            }
            black_box(state.my_total())
        })
    });
}

criterion_group!(benches, bench_apply_collisions, bench_settle_game);
criterion_main!(benches);
