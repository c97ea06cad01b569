//! Tie-break policies for graph replay.
//!
//! When several causally ready steps can run, the recorded partial order
//! does not care which goes first. A [`TieBreak`] picks one.

use super::frontier::ReplayCandidate;
use crate::util::DetRng;

/// Chooses among causally ready replay candidates.
pub trait TieBreak {
    /// Returns the index of the chosen candidate.
    ///
    /// `candidates` is never empty and is sorted by recorded total order.
    fn choose(&mut self, candidates: &[ReplayCandidate]) -> usize;

    /// Short policy name for descriptions.
    fn name(&self) -> &'static str;
}

/// Follows the recorded total order, reproducing the original interleaving.
#[derive(Debug, Clone, Copy, Default)]
pub struct TotalOrderTieBreak;

impl TieBreak for TotalOrderTieBreak {
    fn choose(&mut self, _candidates: &[ReplayCandidate]) -> usize {
        0
    }

    fn name(&self) -> &'static str {
        "total-order"
    }
}

/// Picks uniformly at random among the candidates.
#[derive(Debug, Clone)]
pub struct RandomTieBreak {
    rng: DetRng,
}

impl RandomTieBreak {
    /// Creates a random tie-break seeded with `seed`.
    #[must_use]
    pub const fn new(seed: u64) -> Self {
        Self {
            rng: DetRng::new(seed),
        }
    }
}

impl TieBreak for RandomTieBreak {
    fn choose(&mut self, candidates: &[ReplayCandidate]) -> usize {
        self.rng.next_usize(candidates.len().max(1))
    }

    fn name(&self) -> &'static str {
        "random"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ActorId, StepId};

    fn candidates(n: usize) -> Vec<ReplayCandidate> {
        (0..n)
            .map(|i| ReplayCandidate {
                step: StepId::from_index(i),
                actor: ActorId::new(i as u64),
                total_order: i,
            })
            .collect()
    }

    #[test]
    fn total_order_takes_first() {
        assert_eq!(TotalOrderTieBreak.choose(&candidates(3)), 0);
    }

    #[test]
    fn random_stays_in_range_and_varies() {
        let mut tie_break = RandomTieBreak::new(11);
        let pool = candidates(4);
        let picks: std::collections::BTreeSet<_> =
            (0..64).map(|_| tie_break.choose(&pool)).collect();
        assert!(picks.iter().all(|&i| i < 4));
        assert!(picks.len() > 1);
    }
}
