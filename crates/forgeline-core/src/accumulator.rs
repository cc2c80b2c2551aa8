//! Integer rate quantization with carried remainders.
//!
//! Several boiler quantities are rates that only divide evenly by chance:
//! steam per unit of water, vanilla burn ticks per boiler tick, and energy
//! per throttled tick. A [`RateQuantizer`] turns such a rate into a whole
//! number of units per call while banking the sub-unit remainder, so the
//! summed output over any number of calls never drifts from the exact
//! total by a full quantum.

use serde::{Deserialize, Serialize};

/// A running remainder against a fixed quantum.
///
/// `excess` always satisfies `excess < quantum` after any public operation
/// returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateQuantizer {
    quantum: u64,
    excess: u64,
}

impl RateQuantizer {
    /// Create a quantizer with an empty remainder. A quantum of 0 is
    /// clamped to 1.
    pub fn new(quantum: u64) -> Self {
        Self {
            quantum: quantum.max(1),
            excess: 0,
        }
    }

    /// Create a quantizer resuming from a persisted remainder.
    pub fn with_excess(quantum: u64, excess: u64) -> Self {
        let mut q = Self::new(quantum);
        q.excess = excess;
        q
    }

    pub fn quantum(&self) -> u64 {
        self.quantum
    }

    /// The banked remainder, in the same units as the amounts fed in.
    pub fn excess(&self) -> u64 {
        self.excess
    }

    /// Change the quantum. The banked remainder is kept; it is settled
    /// against the new quantum on the next operation.
    pub fn set_quantum(&mut self, quantum: u64) {
        self.quantum = quantum.max(1);
    }

    /// Drop the banked remainder.
    pub fn clear(&mut self) {
        self.excess = 0;
    }

    /// Bank a sub-quantum remainder and release any whole quanta the bank
    /// now holds.
    pub fn bank(&mut self, remainder: u64) -> u64 {
        self.excess = self.excess.saturating_add(remainder);
        let whole = self.excess / self.quantum;
        self.excess %= self.quantum;
        whole
    }

    /// Whole quanta contained in `amount`, with the remainder banked.
    ///
    /// Summed over calls this equals `floor((Σ amount + initial excess) / quantum)`.
    pub fn carry(&mut self, amount: u64) -> u64 {
        let whole = amount / self.quantum;
        whole.saturating_add(self.bank(amount % self.quantum))
    }

    /// Number of quantum-sized units needed to cover `wanted`.
    ///
    /// Draws one unit more than the floor, credits the over-draw to the
    /// bank and then refunds whatever whole units the bank holds. Over any
    /// run of calls, `Σ units · quantum − Σ wanted` equals the final excess.
    pub fn cover(&mut self, wanted: u64) -> u64 {
        let q = self.quantum;
        let mut units = wanted.saturating_add(q) / q;
        self.excess = self
            .excess
            .saturating_add(units.saturating_mul(q).saturating_sub(wanted));
        units -= (self.excess / q).min(units);
        self.excess %= q;
        units
    }
}

impl Default for RateQuantizer {
    fn default() -> Self {
        Self::new(1)
    }
}
