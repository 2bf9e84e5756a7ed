//! Serializable pseudo-random generator state.
//!
//! A [`RandomState`] captures a ChaCha8 stream exactly: its seed, stream id
//! and word position. Restoring it yields a generator that produces the same
//! sequence as the one it was captured from, so a suggestion can be replayed
//! bit-for-bit in a later process.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::errors::{SwError, SwResult};
use crate::data_integrity_error;

const TOKEN_PREFIX: &str = "chacha8";
/// ChaCha keeps a 68-bit word position; larger values do not round-trip.
const WORD_POS_LIMIT: u128 = 1 << 68;

/// Opaque random-state token threaded between invocations.
///
/// Serialized as a string of the form `chacha8:<seed>:<stream>:<word_pos>`
/// (all hex).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RandomState {
    seed: [u8; 32],
    stream: u64,
    word_pos: u128,
}

impl RandomState {
    /// Fresh state derived from a numeric seed.
    pub fn from_seed(seed: u64) -> Self {
        Self::capture(&ChaCha8Rng::seed_from_u64(seed))
    }

    /// Snapshot the position of a running generator.
    pub fn capture(rng: &ChaCha8Rng) -> Self {
        Self {
            seed: rng.get_seed(),
            stream: rng.get_stream(),
            word_pos: rng.get_word_pos(),
        }
    }

    /// Restore a generator positioned exactly where this state was captured.
    pub fn rng(&self) -> ChaCha8Rng {
        let mut rng = ChaCha8Rng::from_seed(self.seed);
        rng.set_stream(self.stream);
        rng.set_word_pos(self.word_pos);
        rng
    }
}

impl std::fmt::Display for RandomState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{TOKEN_PREFIX}:")?;
        for byte in &self.seed {
            write!(f, "{byte:02x}")?;
        }
        write!(f, ":{:x}:{:x}", self.stream, self.word_pos)
    }
}

impl FromStr for RandomState {
    type Err = SwError;

    fn from_str(s: &str) -> SwResult<Self> {
        let malformed = || data_integrity_error!("malformed random-state token '{s}'");

        let parts: Vec<&str> = s.trim().split(':').collect();
        let [prefix, seed_hex, stream_hex, pos_hex] = parts[..] else {
            return Err(malformed());
        };
        if prefix != TOKEN_PREFIX || seed_hex.len() != 64 || !seed_hex.is_ascii() {
            return Err(malformed());
        }

        let mut seed = [0u8; 32];
        for (i, byte) in seed.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&seed_hex[2 * i..2 * i + 2], 16).map_err(|_| malformed())?;
        }

        let word_pos = u128::from_str_radix(pos_hex, 16).map_err(|_| malformed())?;
        if word_pos >= WORD_POS_LIMIT {
            return Err(malformed());
        }

        Ok(Self {
            seed,
            stream: u64::from_str_radix(stream_hex, 16).map_err(|_| malformed())?,
            word_pos,
        })
    }
}

impl TryFrom<String> for RandomState {
    type Error = SwError;

    fn try_from(value: String) -> SwResult<Self> {
        value.parse()
    }
}

impl From<RandomState> for String {
    fn from(state: RandomState) -> Self {
        state.to_string()
    }
}
