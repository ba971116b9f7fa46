// chain.rs - Per-chain bookkeeping shared by Metropolis and HMC

use crate::observables::{Observable, Observables};
use crate::utils::rng::chain_rng;
use rand_chacha::ChaCha20Rng;
use rayon::prelude::*;

/// Proposal/accept counters of one Markov chain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChainStats {
    pub proposals: u64,
    pub accepts: u64,
}

impl ChainStats {
    #[inline(always)]
    pub fn record(&mut self, accepted: bool) {
        self.proposals += 1;
        if accepted {
            self.accepts += 1;
        }
    }

    pub fn acceptance_rate(&self) -> f64 {
        if self.proposals == 0 {
            0.0
        } else {
            self.accepts as f64 / self.proposals as f64
        }
    }

    /// Counters accumulated since `earlier` was taken.
    pub fn since(&self, earlier: &ChainStats) -> ChainStats {
        ChainStats {
            proposals: self.proposals - earlier.proposals,
            accepts: self.accepts - earlier.accepts,
        }
    }
}

/// Everything a `run` hands back to the caller.
#[derive(Debug, Clone, Default)]
pub struct RunOutput {
    /// Measurements in Markov-chain time order.
    pub series: Vec<Observables>,
    /// Counters over the whole run, burn-in included.
    pub stats: ChainStats,
    /// Counters over the measured phase only.
    pub production_stats: ChainStats,
    /// H₁ − H₀ per trajectory after burn-in (HMC only).
    pub delta_h: Vec<f64>,
}

impl RunOutput {
    /// Acceptance rate over the entire run, burn-in included.
    pub fn acceptance_rate(&self) -> f64 {
        self.stats.acceptance_rate()
    }

    /// Time series of one scalar observable.
    pub fn observable(&self, which: Observable) -> Vec<f64> {
        self.series.iter().map(|obs| which.extract(obs)).collect()
    }

    /// Creutz check ⟨exp(−ΔH)⟩, which should be 1 within errors for a
    /// correct HMC. `None` for runs without trajectories.
    pub fn mean_exp_minus_delta_h(&self) -> Option<f64> {
        if self.delta_h.is_empty() {
            return None;
        }
        Some(self.delta_h.iter().map(|dh| (-dh).exp()).sum::<f64>() / self.delta_h.len() as f64)
    }
}

/// Run `n_replicas` independent chains in parallel.
///
/// Each replica gets its own RNG derived from `(master_seed, replica_id)`.
/// Results come back in replica order regardless of scheduling.
pub fn run_replicas<T, F>(master_seed: u64, n_replicas: usize, run: F) -> Vec<T>
where
    T: Send,
    F: Fn(usize, &mut ChaCha20Rng) -> T + Sync,
{
    (0..n_replicas)
        .into_par_iter()
        .map(|replica| {
            let mut rng = chain_rng(master_seed, replica);
            run(replica, &mut rng)
        })
        .collect()
}
