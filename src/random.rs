//! RNG plumbing and discrete-event probability selection.
//!
//! The engine is driven by exactly one seeded [WyRng] per run (see the design notes on
//! reproducibility); nothing in `src/` reaches for `rand::rng()` / `ThreadRng`.

use core::cmp::min;
use find_fold::FindFold;
use rand::RngCore;
use std::ops::ControlFlow;

use crate::events;

/// Turn a whole percent into a `u64` that is `x` percent of [u64::MAX]. A rolled `u64` that
/// lands below this threshold counts as the event firing.
///
/// ```
/// use neat_rsu::random::percent;
/// const ONE_PERCENT: u64 = u64::MAX / 100;
/// assert_eq!(percent(50), 50 * ONE_PERCENT);
/// ```
pub const fn percent(x: u64) -> u64 {
    x * (u64::MAX / 100)
}

/// A small, fast, seedable RNG (wyhash-derived). Not cryptographic; good enough for mutation
/// and crossover coin flips where reproducibility from a seed matters more than unpredictability.
pub struct WyRng {
    state: u64,
}

impl WyRng {
    pub fn seeded(state: u64) -> Self {
        Self { state }
    }
}

impl RngCore for WyRng {
    fn next_u32(&mut self) -> u32 {
        self.next_u64() as u32
    }

    fn next_u64(&mut self) -> u64 {
        const WY_CONST_0: u64 = 0x2d35_8dcc_aa6c_78a5;
        const WY_CONST_1: u64 = 0x8bb8_4b93_962e_acc9;
        self.state = self.state.wrapping_add(WY_CONST_0);
        let t = u128::from(self.state) * u128::from(self.state ^ WY_CONST_1);
        (t as u64) ^ (t >> 64) as u64
    }

    fn fill_bytes(&mut self, dst: &mut [u8]) {
        if dst.is_empty() {
            return;
        }
        let mut idx = 0;
        while idx < dst.len() {
            let lim = min(8, dst.len() - idx);
            dst[idx..idx + lim].copy_from_slice(&self.next_u64().to_ne_bytes()[..lim]);
            idx += lim;
        }
    }
}

/// Seed a deterministic RNG from a caller-supplied seed. This is the only entry point the
/// evolutionary core uses; any entropy source (urandom, clock) is the caller's concern.
pub fn seeded_rng(seed: u64) -> WyRng {
    WyRng::seeded(seed)
}

/// Discrete event enums used for cumulative-probability event selection, e.g. "which mutation
/// fires this tick". Implemented via the [events!] macro.
pub trait EventKind: Copy {
    const COUNT: usize;
    fn variants() -> [Self; Self::COUNT];

    /// Roll against a table of cumulative-independent probabilities (each entry out of
    /// [u64::MAX]) and return the first variant whose running total the roll falls under, if
    /// any (the table need not sum to `u64::MAX`; a roll past the end picks nothing).
    fn pick<R: RngCore>(rng: &mut R, prob: [u64; Self::COUNT]) -> Option<Self> {
        let roll = rng.next_u64();
        prob.into_iter().enumerate().find_fold(0u64, |acc, (idx, p)| {
            if roll < p.saturating_add(acc) {
                ControlFlow::Break(Self::variants()[idx])
            } else {
                ControlFlow::Continue(p.saturating_add(acc))
            }
        })
    }
}

#[macro_export]
macro_rules! events {
    ($name:ident[$($variant:ident),+ $(,)?]) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum $name {
            $($variant),+
        }

        impl $crate::random::EventKind for $name {
            const COUNT: usize = $crate::events!(@count $($variant),+);

            fn variants() -> [Self; Self::COUNT] {
                [$(Self::$variant),+]
            }
        }
    };
    (@count $($variant:ident),+) => {
        <[()]>::len(&[$($crate::events!(@unit $variant)),+])
    };
    (@unit $variant:ident) => { () };
}

events!(GenomeMutation[AddNode, AddConnection, MutateWeights]);
events!(CrossoverOrigin[FitterParent, OtherParent]);
