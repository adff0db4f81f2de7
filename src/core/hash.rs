//! Verdict Fingerprints
//!
//! SHA-256 digests of raw judged rounds. Logged next to every recorded round
//! so both peers' logs can be compared when scores disagree.

use sha2::{Sha256, Digest};

use crate::game::state::{Category, GameInputs, ValidationResult};

/// Hash output type (256 bits / 32 bytes)
pub type Fingerprint = [u8; 32];

/// Incremental hasher with a domain separator.
///
/// Order of updates is significant.
pub struct VerdictHasher {
    hasher: Sha256,
}

impl VerdictHasher {
    /// Create a new hasher with domain separator.
    pub fn new(domain: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(domain);
        Self { hasher }
    }

    /// Hasher for a judged round.
    pub fn for_round() -> Self {
        Self::new(b"NPAT_ROUND_V1")
    }

    /// Update with a u32 value (little-endian).
    #[inline]
    pub fn update_u32(&mut self, value: u32) {
        self.hasher.update(value.to_le_bytes());
    }

    /// Update with a boolean.
    #[inline]
    pub fn update_bool(&mut self, value: bool) {
        self.hasher.update([value as u8]);
    }

    /// Update with a length-prefixed string.
    pub fn update_str(&mut self, value: &str) {
        self.update_u32(value.len() as u32);
        self.hasher.update(value.as_bytes());
    }

    /// Finalize and return the digest.
    pub fn finalize(self) -> Fingerprint {
        self.hasher.finalize().into()
    }
}

/// Fingerprint one player's raw round: letter, answers, verdicts.
pub fn round_fingerprint(
    round_index: u32,
    letter: char,
    inputs: &GameInputs,
    verdict: &ValidationResult,
) -> Fingerprint {
    let mut hasher = VerdictHasher::for_round();
    hasher.update_u32(round_index);
    hasher.update_u32(letter as u32);

    for category in Category::ALL {
        let item = verdict.item(category);
        hasher.update_str(inputs.get(category));
        hasher.update_bool(item.valid);
        hasher.update_u32(item.score);
        hasher.update_str(&item.message);
    }
    hasher.update_u32(verdict.total_round_score);

    hasher.finalize()
}

/// Short hex form for log lines.
pub fn short_hex(fingerprint: &Fingerprint) -> String {
    hex::encode(&fingerprint[..6])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::state::ValidationItem;

    fn verdict() -> ValidationResult {
        ValidationResult::from_items(
            ValidationItem::accepted("ok"),
            ValidationItem::accepted("ok"),
            ValidationItem::rejected("Empty"),
            ValidationItem::accepted("ok"),
        )
    }

    #[test]
    fn test_fingerprint_determinism() {
        let inputs = GameInputs::new("Bob", "Brazil", "", "Box");
        let a = round_fingerprint(0, 'B', &inputs, &verdict());
        let b = round_fingerprint(0, 'B', &inputs, &verdict());
        assert_eq!(a, b);
    }

    #[test]
    fn test_fingerprint_sensitive_to_round_and_text() {
        let inputs = GameInputs::new("Bob", "Brazil", "", "Box");
        let base = round_fingerprint(0, 'B', &inputs, &verdict());

        assert_ne!(base, round_fingerprint(1, 'B', &inputs, &verdict()));

        let other = GameInputs::new("Bob", "Brazil", "", "Boxes");
        assert_ne!(base, round_fingerprint(0, 'B', &other, &verdict()));
    }

    #[test]
    fn test_length_prefix_separates_fields() {
        let a = GameInputs::new("ab", "c", "", "");
        let b = GameInputs::new("a", "bc", "", "");
        assert_ne!(
            round_fingerprint(0, 'A', &a, &verdict()),
            round_fingerprint(0, 'A', &b, &verdict()),
        );
    }

    #[test]
    fn test_short_hex() {
        let fp = [0xabu8; 32];
        assert_eq!(short_hex(&fp), "abababababab");
    }
}
