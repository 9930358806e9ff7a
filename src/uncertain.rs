//! A boolean value paired with how sure we are of it.
//!
//! Most of the facts this crate observes come from poking at silicon through
//! a debug transport that may itself be blocked by the very protection the
//! probe is trying to characterize. Reading `0x00` or `0xFF` back from a
//! locked part's flash looks identical to reading blank/erased flash; the
//! crate must carry that ambiguity through to the caller rather than collapse
//! it into a plain `bool`.

use std::cmp::Ordering;

/// How confident an observation is, from a direct read (most confident) down
/// to a value that carries no diagnostic weight at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Certainty {
    /// The observation leaves no room for doubt (e.g. a register read that
    /// either succeeds cleanly or faults in a way specific to one state).
    Certain,
    /// Strong circumstantial evidence, but a different root cause can't be
    /// fully excluded.
    VeryLikely,
    /// Weaker circumstantial evidence.
    Likely,
    /// No diagnostic value; the value is a placeholder.
    Useless,
}

impl Certainty {
    fn rank(self) -> u8 {
        match self {
            Certainty::Certain => 3,
            Certainty::VeryLikely => 2,
            Certainty::Likely => 1,
            Certainty::Useless => 0,
        }
    }
}

impl PartialOrd for Certainty {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.rank().cmp(&other.rank()))
    }
}

/// A `bool` observed through a debug transport, annotated with how much that
/// observation should be trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UncertainBoolean {
    value: bool,
    certainty: Certainty,
}

impl UncertainBoolean {
    /// Builds a new uncertain boolean from a value and its certainty.
    pub fn new(value: bool, certainty: Certainty) -> Self {
        Self { value, certainty }
    }

    /// The observed value, regardless of how certain it is.
    pub fn value(&self) -> bool {
        self.value
    }

    /// How confident the crate is in [`Self::value`].
    pub fn certainty(&self) -> Certainty {
        self.certainty
    }

    /// Combines this observation with another that independently supports
    /// (or contradicts) it. Certainty is never raised above the lower of the
    /// two inputs: propagation can only erode confidence, never manufacture
    /// it.
    pub fn and_then(self, other: UncertainBoolean) -> UncertainBoolean {
        let certainty = if self.certainty < other.certainty {
            self.certainty
        } else {
            other.certainty
        };
        UncertainBoolean::new(self.value && other.value, certainty)
    }
}
