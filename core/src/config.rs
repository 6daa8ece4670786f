#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// # Quirks
/// Instructions whose behavior differs between historical Chip-8 interpreters.
///
/// Programs are written against one interpreter or another, so these are selectable rather than
/// fixed. The defaults follow the original COSMAC VIP shifts and leave `i` alone after bulk
/// register transfers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct Quirks {
    /// 8xy6/8xyE shift Vy and store the result in both Vy and Vx.
    /// When unset they shift Vx in place and Vy is untouched.
    pub shift_uses_vy: bool,

    /// Fx55/Fx65 leave `i` pointing just past the last register transferred.
    pub load_store_increments_i: bool,
}

impl Default for Quirks {
    fn default() -> Self {
        Quirks {
            shift_uses_vy: true,
            load_store_increments_i: false,
        }
    }
}

/// Per-session interpreter settings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct Config {
    pub quirks: Quirks,

    /// Seed for Cxnn; seeded from the OS when absent
    pub rng_seed: Option<u64>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quirks(mut self, quirks: Quirks) -> Self {
        self.quirks = quirks;
        self
    }

    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }
}
