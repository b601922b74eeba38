//! Property test strategies for reflux scenarios
//!
//! # Example
//!
//! ```rust
//! use reflux_testkit::strategies::arb_assignments;
//! use proptest::prelude::*;
//!
//! proptest! {
//!     #[test]
//!     fn slots_are_in_range(steps in arb_assignments(3, 20)) {
//!         prop_assert!(steps.iter().all(|step| step.slot < 3));
//!     }
//! }
//! ```

use proptest::prelude::*;

pub use proptest;

/// One assignment to one of several mutable inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Assignment {
    pub slot: usize,
    pub value: i32,
}

/// Small values, so repeated assignments of equal values are common.
pub fn arb_small_value() -> impl Strategy<Value = i32> {
    -4i32..=4
}

/// Up to `max_len` assignments spread over `slots` inputs.
pub fn arb_assignments(slots: usize, max_len: usize) -> impl Strategy<Value = Vec<Assignment>> {
    let slots = slots.max(1);
    prop::collection::vec(
        (0..slots, arb_small_value()).prop_map(|(slot, value)| Assignment { slot, value }),
        0..=max_len,
    )
}

/// Short names drawn from a tiny alphabet, including the empty name.
pub fn arb_name() -> impl Strategy<Value = String> {
    "[ab]{0,3}"
}

/// Timings in milliseconds for a burst of upstream emissions.
pub fn arb_burst(max_len: usize) -> impl Strategy<Value = Vec<u64>> {
    prop::collection::vec(0u64..200, 1..=max_len.max(1)).prop_map(|mut gaps| {
        let mut at = 0;
        for gap in gaps.iter_mut() {
            at += *gap;
            *gap = at;
        }
        gaps
    })
}
