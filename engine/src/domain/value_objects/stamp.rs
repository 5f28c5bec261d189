//! Stamp value object
//! Generation counter handed out when a sticky flag is raised

use serde::{Deserialize, Serialize};
use std::fmt;

/// Highest bit of a packed flag word carries the active bit, so stamps use the rest.
pub(crate) const STAMP_MASK: u64 = u64::MAX >> 1;

/// Capability token proving which activation of a flag the holder raised
///
/// Presenting a stamp that is no longer current is harmless: the revert is
/// simply ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Stamp(u64);

impl Stamp {
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl From<u64> for Stamp {
    fn from(value: u64) -> Self {
        Self(value & STAMP_MASK)
    }
}

impl fmt::Display for Stamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
