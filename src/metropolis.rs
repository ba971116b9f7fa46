// metropolis.rs - Local single-site Metropolis updates

use crate::chain::{ChainStats, RunOutput};
use crate::error::{check_burn_in, check_measurement_interval, check_step_size, Result};
use crate::lattice::LatticeAction;
use crate::observables::Observables;
use rand::distributions::{Distribution, Uniform};
use rand::Rng;
use tracing::debug;

/// min(1, exp(−ΔS)). NaN maps to 0 so a broken proposal is never taken.
pub fn acceptance_probability(delta: f64) -> f64 {
    if delta.is_nan() {
        0.0
    } else if delta <= 0.0 {
        1.0
    } else {
        (-delta).exp()
    }
}

/// Metropolis test with exactly one uniform draw, consumed even when ΔS ≤ 0
/// so the RNG stream does not depend on the outcome.
#[inline]
pub fn metropolis_accept(delta: f64, rng: &mut impl Rng) -> bool {
    let u: f64 = rng.gen();
    u < acceptance_probability(delta)
}

/// Returned by `update_site`.
#[derive(Debug, Clone, Copy)]
pub struct StepInfo {
    pub accepted: bool,
    pub delta_s: f64,
}

#[derive(Debug, Clone)]
pub struct MetropolisSampler {
    lattice: LatticeAction,
    step_size: f64,
    proposal: Uniform<f64>,
    stats: ChainStats,
}

impl MetropolisSampler {
    pub fn new(lattice: LatticeAction, step_size: f64) -> Result<Self> {
        lattice.params().validate()?;
        check_step_size(step_size)?;
        let proposal = Uniform::new(-step_size, step_size);
        Ok(Self { lattice, step_size, proposal, stats: ChainStats::default() })
    }

    pub fn lattice(&self) -> &LatticeAction {
        &self.lattice
    }

    pub fn step_size(&self) -> f64 {
        self.step_size
    }

    pub fn stats(&self) -> ChainStats {
        self.stats
    }

    /// Propose φ(site) → φ(site) + δ, δ ~ U(−ε, ε), and accept or reject it.
    pub fn update_site(&mut self, site: usize, rng: &mut impl Rng) -> StepInfo {
        let delta = self.proposal.sample(rng);
        let proposed = self.lattice.get(site) + delta;
        let delta_s = self.lattice.local_action_delta(site, proposed);
        let accepted = metropolis_accept(delta_s, rng);
        if accepted {
            self.lattice.set(site, proposed);
        }
        self.stats.record(accepted);
        StepInfo { accepted, delta_s }
    }

    /// One proposal per site in order 0..N. Returns the number accepted.
    pub fn sweep(&mut self, rng: &mut impl Rng) -> usize {
        let mut accepted = 0;
        for site in 0..self.lattice.n_sites() {
            if self.update_site(site, rng).accepted {
                accepted += 1;
            }
        }
        accepted
    }

    /// Measure the current configuration.
    pub fn measure(&self) -> Observables {
        Observables::measure(self.lattice.params(), self.lattice.field())
    }

    /// Run `n_sweeps` sweeps in total; the first `burn_in` are not measured,
    /// after that every `measurement_interval`-th sweep is.
    ///
    /// Counters keep running through burn-in, so `acceptance_rate()` of the
    /// output covers the whole run; `production_stats` covers only the
    /// measured phase.
    pub fn run(
        &mut self,
        rng: &mut impl Rng,
        n_sweeps: usize,
        burn_in: usize,
        measurement_interval: usize,
    ) -> Result<RunOutput> {
        check_burn_in(n_sweeps, burn_in)?;
        check_measurement_interval(measurement_interval)?;
        debug!(
            sampler = "metropolis",
            n_sites = self.lattice.n_sites(),
            step_size = self.step_size,
            n_sweeps,
            burn_in,
            measurement_interval,
            "starting run"
        );

        let start = self.stats;
        let mut production_start = start;
        let mut series = Vec::with_capacity((n_sweeps - burn_in) / measurement_interval);

        for sweep in 1..=n_sweeps {
            self.sweep(rng);
            if sweep == burn_in {
                production_start = self.stats;
            }
            if sweep > burn_in && (sweep - burn_in) % measurement_interval == 0 {
                series.push(self.measure());
            }
        }

        let output = RunOutput {
            series,
            stats: self.stats.since(&start),
            production_stats: self.stats.since(&production_start),
            delta_h: Vec::new(),
        };
        debug!(
            sampler = "metropolis",
            acceptance_rate = output.acceptance_rate(),
            production_acceptance_rate = output.production_stats.acceptance_rate(),
            n_samples = output.series.len(),
            "run finished"
        );
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::McError;
    use crate::lattice::LatticeParams;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    fn sampler(n: usize, step: f64) -> MetropolisSampler {
        let params = LatticeParams::new(n, 1.0, 0.0).unwrap();
        MetropolisSampler::new(LatticeAction::new(params).unwrap(), step).unwrap()
    }

    #[test]
    fn probability_bounds() {
        for &d in &[-100.0, -1.0, 0.0, 1e-9, 0.5, 3.0, 700.0, f64::INFINITY] {
            let p = acceptance_probability(d);
            assert!((0.0..=1.0).contains(&p), "ΔS={d} gave p={p}");
        }
        assert_eq!(acceptance_probability(-0.1), 1.0);
        assert_eq!(acceptance_probability(0.0), 1.0);
        assert_eq!(acceptance_probability(f64::NAN), 0.0);
    }

    #[test]
    fn downhill_always_accepted() {
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        assert!((0..1000).all(|_| metropolis_accept(-0.3, &mut rng)));
        assert!((0..1000).all(|_| metropolis_accept(0.0, &mut rng)));
    }

    #[test]
    fn rejects_bad_step_size() {
        let params = LatticeParams::new(4, 1.0, 0.0).unwrap();
        for step in [0.0, -0.5, f64::NAN, 1e308, f64::MAX, f64::INFINITY] {
            let lat = LatticeAction::new(params).unwrap();
            assert!(matches!(
                MetropolisSampler::new(lat, step),
                Err(McError::InvalidParameters(_))
            ));
        }

        // Wide but representable windows still sweep.
        let mut rng = ChaCha20Rng::seed_from_u64(3);
        let lat = LatticeAction::new(params).unwrap();
        let mut sampler = MetropolisSampler::new(lat, 1e300).unwrap();
        sampler.sweep(&mut rng);
        assert_eq!(sampler.stats().proposals, 4);
    }

    #[test]
    fn sweep_makes_n_proposals() {
        let mut rng = ChaCha20Rng::seed_from_u64(2);
        let mut s = sampler(10, 0.5);
        let accepted = s.sweep(&mut rng);
        assert_eq!(s.stats().proposals, 10);
        assert_eq!(s.stats().accepts as usize, accepted);
    }

    #[test]
    fn rejected_moves_leave_field_unchanged() {
        let mut rng = ChaCha20Rng::seed_from_u64(3);
        // Huge steps on a stiff lattice: almost everything is rejected.
        let params = LatticeParams::new(6, 50.0, 10.0).unwrap();
        let mut s = MetropolisSampler::new(LatticeAction::new(params).unwrap(), 100.0).unwrap();
        for site in 0..6 {
            let before = s.lattice().field().to_vec();
            let info = s.update_site(site, &mut rng);
            if !info.accepted {
                assert_eq!(before, s.lattice().field());
            }
        }
    }

    #[test]
    fn run_measurement_schedule() {
        let mut rng = ChaCha20Rng::seed_from_u64(4);
        let mut s = sampler(8, 0.5);
        let out = s.run(&mut rng, 100, 20, 5).unwrap();
        assert_eq!(out.series.len(), 16);
        assert_eq!(out.stats.proposals, 800);
        assert_eq!(out.production_stats.proposals, 640);
        assert!(out.delta_h.is_empty());
    }

    #[test]
    fn run_validates_arguments() {
        let mut rng = ChaCha20Rng::seed_from_u64(5);
        let mut s = sampler(4, 0.5);
        assert!(matches!(s.run(&mut rng, 10, 11, 1), Err(McError::InvalidParameters(_))));
        assert!(matches!(s.run(&mut rng, 10, 0, 0), Err(McError::InvalidParameters(_))));
        assert_eq!(s.run(&mut rng, 10, 10, 1).unwrap().series.len(), 0);
    }

    #[test]
    fn same_seed_same_chain() {
        let run = |seed| {
            let mut rng = ChaCha20Rng::seed_from_u64(seed);
            sampler(6, 0.7).run(&mut rng, 50, 10, 1).unwrap().series
        };
        assert_eq!(run(99), run(99));
    }
}
