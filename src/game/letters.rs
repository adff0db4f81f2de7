//! Letter Selection
//!
//! Twenty letters that reliably have a name, place, animal and thing.

use std::collections::BTreeSet;

use crate::core::rng::DeterministicRng;

/// Playable letters. Q, U, V, X, Y, Z are left out.
pub const ALPHABET: [char; 20] = [
    'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J',
    'K', 'L', 'M', 'N', 'O', 'P', 'R', 'S', 'T', 'W',
];

/// Re-draws allowed when the sampled letter was already used.
pub const MAX_LETTER_ATTEMPTS: u32 = 50;

/// A sampled letter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LetterDraw {
    /// The letter.
    pub letter: char,
    /// Re-draws spent avoiding used letters.
    pub attempts: u32,
    /// Retry budget ran out and a repeat was accepted.
    pub repeated: bool,
}

/// Draw a letter, re-sampling up to [`MAX_LETTER_ATTEMPTS`] times to avoid
/// letters already in `used`.
pub fn draw_letter(rng: &mut DeterministicRng, used: &BTreeSet<char>) -> LetterDraw {
    let mut letter = sample(rng);
    let mut attempts = 0;

    while used.contains(&letter) && attempts < MAX_LETTER_ATTEMPTS {
        letter = sample(rng);
        attempts += 1;
    }

    LetterDraw {
        letter,
        attempts,
        repeated: used.contains(&letter),
    }
}

fn sample(rng: &mut DeterministicRng) -> char {
    rng.choose(&ALPHABET).copied().unwrap_or('A')
}

/// Whether a letter belongs to the playable alphabet.
pub fn is_playable(letter: char) -> bool {
    ALPHABET.contains(&letter.to_ascii_uppercase())
}
