//! Stamped Flag
//!
//! A boolean that can be raised, and reverted only by whoever holds the stamp
//! of the activation that is still current. The active bit and the stamp share
//! one atomic word so both are always read and swapped together.

use crate::domain::value_objects::stamp::STAMP_MASK;
use crate::domain::value_objects::Stamp;
use std::sync::atomic::{AtomicU64, Ordering};

const ACTIVE_BIT: u64 = !STAMP_MASK;

#[derive(Debug, Default)]
pub struct StampedFlag {
    word: AtomicU64,
}

impl StampedFlag {
    pub const fn new() -> Self {
        Self {
            word: AtomicU64::new(0),
        }
    }

    /// Raise the flag and return the stamp of the current activation
    ///
    /// Raising an already active flag returns the existing stamp without
    /// bumping it, so one revert clears any number of redundant activations.
    pub fn activate(&self) -> Stamp {
        let mut current = self.word.load(Ordering::Acquire);
        loop {
            if current & ACTIVE_BIT != 0 {
                return Stamp::from(current);
            }

            let next_stamp = (current & STAMP_MASK).wrapping_add(1) & STAMP_MASK;
            match self.word.compare_exchange_weak(
                current,
                ACTIVE_BIT | next_stamp,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Stamp::from(next_stamp),
                Err(actual) => current = actual,
            }
        }
    }

    /// Clear the flag if it is active and `stamp` is its current stamp
    ///
    /// Returns whether the flag was cleared. A stale stamp means someone
    /// re-armed the flag since, and their activation wins.
    pub fn revert(&self, stamp: Stamp) -> bool {
        self.word
            .compare_exchange(
                ACTIVE_BIT | stamp.value(),
                stamp.value(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    pub fn is_active(&self) -> bool {
        self.word.load(Ordering::Acquire) & ACTIVE_BIT != 0
    }

    /// Stamp of the latest activation (zero if never activated)
    pub fn stamp(&self) -> Stamp {
        Stamp::from(self.word.load(Ordering::Acquire))
    }
}
