use std::fmt::Write as _;

use rand::{
    Rng, SeedableRng as _,
    distr::{Distribution, StandardUniform},
};
use rand_pcg::Pcg32;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::PieceKind;

/// Seed for deterministic piece generation.
///
/// This is a 128-bit (16-byte) seed used to initialize the random number
/// generator for piece generation. Using the same seed will produce the same
/// sequence of pieces, so simulated sessions can be reproduced exactly.
///
/// # Example
///
/// ```
/// use escape_engine::{PieceGenerator, PieceSeed};
///
/// let seed = PieceSeed::from_u64(42);
/// let mut a = PieceGenerator::with_seed(seed);
/// let mut b = PieceGenerator::with_seed(seed);
/// assert_eq!(a.pop_next(), b.pop_next());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PieceSeed([u8; 16]);

impl PieceSeed {
    /// Expands a small integer seed (e.g. from the command line) to a full seed.
    #[must_use]
    pub fn from_u64(seed: u64) -> Self {
        let mut rng = Pcg32::seed_from_u64(seed);
        let mut bytes = [0; 16];
        rng.fill(&mut bytes);
        Self(bytes)
    }

    /// Independent generator derived from this seed, for randomness other than pieces.
    #[must_use]
    pub fn rng_for_stream(self, stream: u64) -> Pcg32 {
        let [state @ .., _, _, _, _, _, _, _, _] = self.0;
        Pcg32::new(u64::from_be_bytes(state), stream)
    }
}

impl Serialize for PieceSeed {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let num = u128::from_be_bytes(self.0);
        let mut hex_str = String::with_capacity(2 * self.0.len());
        write!(&mut hex_str, "{num:032x}").map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&hex_str)
    }
}

impl<'de> Deserialize<'de> for PieceSeed {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let hex_str = String::deserialize(deserializer)?;
        if hex_str.len() != 32 {
            return Err(serde::de::Error::custom(format!(
                "invalid hex: expected 32 characters, got {}",
                hex_str.len()
            )));
        }
        let num = u128::from_str_radix(&hex_str, 16)
            .map_err(|e| serde::de::Error::custom(format!("invalid hex: {hex_str} ({e})")))?;
        Ok(Self(num.to_be_bytes()))
    }
}

impl Distribution<PieceSeed> for StandardUniform {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> PieceSeed {
        let mut seed = [0; 16];
        rng.fill(&mut seed);
        PieceSeed(seed)
    }
}

/// Uniform random piece source with a one-piece preview.
///
/// Every kind is drawn independently with equal probability; there is no bag.
#[derive(Debug, Clone)]
pub struct PieceGenerator {
    rng: Pcg32,
    next: PieceKind,
}

impl PieceGenerator {
    #[must_use]
    pub fn with_seed(seed: PieceSeed) -> Self {
        let mut rng = Pcg32::from_seed(seed.0);
        let next = rng.random();
        Self { rng, next }
    }

    /// Returns the piece that the next call to [`Self::pop_next`] yields.
    #[must_use]
    pub fn peek_next(&self) -> PieceKind {
        self.next
    }

    pub fn pop_next(&mut self) -> PieceKind {
        let upcoming = self.rng.random();
        std::mem::replace(&mut self.next, upcoming)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seed_from_bytes(bytes: [u8; 16]) -> PieceSeed {
        PieceSeed(bytes)
    }

    #[test]
    fn test_known_value_sequential_bytes() {
        let seed = seed_from_bytes([
            0x01, 0x23, 0x45, 0x67, 0x89, 0xAB, 0xCD, 0xEF, 0xFE, 0xDC, 0xBA, 0x98, 0x76, 0x54,
            0x32, 0x10,
        ]);
        let serialized = serde_json::to_string(&seed).unwrap();
        assert_eq!(serialized, "\"0123456789abcdeffedcba9876543210\"");

        let deserialized: PieceSeed = serde_json::from_str(&serialized).unwrap();
        assert_eq!(deserialized, seed);
    }

    #[test]
    fn test_deserialize_rejects_bad_hex() {
        for json in [
            "\"ghijklmnopqrstuvwxyzghijklmnopqr\"",
            "\"0123456789abcdef0123456789abcde\"",
            "\"\"",
        ] {
            let err = serde_json::from_str::<PieceSeed>(json).unwrap_err();
            assert!(err.to_string().contains("invalid hex"), "{json}: {err}");
        }
    }

    #[test]
    fn test_deterministic_piece_generation() {
        let seed = PieceSeed::from_u64(7);
        let mut gen1 = PieceGenerator::with_seed(seed);
        let mut gen2 = PieceGenerator::with_seed(seed);
        for _ in 0..50 {
            assert_eq!(gen1.peek_next(), gen2.peek_next());
            assert_eq!(gen1.pop_next(), gen2.pop_next());
        }
    }

    #[test]
    fn test_peek_matches_pop() {
        let mut generator = PieceGenerator::with_seed(PieceSeed::from_u64(3));
        for _ in 0..20 {
            let peeked = generator.peek_next();
            assert_eq!(generator.pop_next(), peeked);
        }
    }

    #[test]
    fn test_all_kinds_appear() {
        let mut generator = PieceGenerator::with_seed(PieceSeed::from_u64(11));
        let mut seen = [false; PieceKind::LEN];
        for _ in 0..500 {
            seen[generator.pop_next() as usize] = true;
        }
        assert!(seen.iter().all(|s| *s));
    }

    #[test]
    fn test_from_u64_differs_per_input() {
        assert_ne!(PieceSeed::from_u64(1), PieceSeed::from_u64(2));
        assert_eq!(PieceSeed::from_u64(5), PieceSeed::from_u64(5));
    }
}
