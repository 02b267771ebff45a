//! Source of the RND trap's values.
use std::time::{SystemTime, UNIX_EPOCH};

/// A xorshift generator.  The same seed always gives the same
/// sequence, so runs which use RND can be repeated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Xorshift {
    state: u64,
}

impl Xorshift {
    /// The all-zero state is a fixed point, so it is never used.
    const FALLBACK_SEED: u64 = 0x9E37_79B9_7F4A_7C15;

    #[must_use]
    pub fn new(seed: u64) -> Xorshift {
        Xorshift {
            state: if seed == 0 {
                Xorshift::FALLBACK_SEED
            } else {
                seed
            },
        }
    }

    /// Seed from the clock.
    #[must_use]
    pub fn from_time() -> Xorshift {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        #[allow(clippy::cast_possible_truncation)]
        let seed = nanos as u64;
        Xorshift::new(seed)
    }

    pub fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }

    /// A value for a register.
    pub fn next_word(&mut self) -> i16 {
        #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
        let value = (self.next_u64() >> 48) as i16;
        value
    }
}
