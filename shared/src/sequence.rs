use log::warn;

use crate::Sequence;

/// Returns whether `candidate` should replace `last` as the freshest sequence.
/// is_newer_sequence(2, 1) will return true
/// is_newer_sequence(1, 2) will return false
/// is_newer_sequence(1, 1) will return false
/// is_newer_sequence(0, _) will always return false
///
/// Plain integer comparison: a counter that wraps past `u32::MAX` is seen as stale.
pub fn is_newer_sequence(candidate: Sequence, last: Sequence) -> bool {
    candidate != 0 && candidate != last && candidate > last
}

/// Freshness filter for one entity's incoming updates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SequenceGate {
    last: Sequence,
}

impl SequenceGate {
    pub fn new() -> Self {
        Self { last: 0 }
    }

    /// Accepts `candidate` if it is newer than anything seen so far, recording it.
    /// With no prior state any non-zero sequence is accepted.
    pub fn accept(&mut self, candidate: Sequence) -> bool {
        if candidate == 0 {
            return false;
        }
        if !self.has_prior() {
            self.last = candidate;
            return true;
        }
        if is_newer_sequence(candidate, self.last) {
            self.last = candidate;
            return true;
        }
        false
    }

    pub fn has_prior(&self) -> bool {
        self.last != 0
    }

    pub fn last(&self) -> Sequence {
        self.last
    }

    pub fn reset(&mut self) {
        self.last = 0;
    }
}

/// Sender side counter. Starts at 1 and saturates at `u32::MAX`, never yielding 0.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SequenceCounter {
    current: Sequence,
    saturated: bool,
}

impl SequenceCounter {
    pub fn new() -> Self {
        Self {
            current: 0,
            saturated: false,
        }
    }

    pub fn next(&mut self) -> Sequence {
        if self.current == Sequence::MAX {
            if !self.saturated {
                warn!("outgoing sequence saturated at u32::MAX, receivers will drop further updates");
                self.saturated = true;
            }
            return self.current;
        }
        self.current += 1;
        self.current
    }

    pub fn current(&self) -> Sequence {
        self.current
    }
}
