//! Hybrid Monte Carlo (HMC) for the scalar lattice field.

use crate::chain::{ChainStats, RunOutput};
use crate::error::{check_burn_in, check_step_size, McError, Result};
use crate::lattice::LatticeAction;
use crate::leapfrog::{hamiltonian, leapfrog};
use crate::metropolis::{acceptance_probability, metropolis_accept};
use crate::observables::Observables;
use rand::Rng;
use rand_distr::StandardNormal;
use tracing::{debug, trace, warn};

/// HMC parameters.
#[derive(Debug, Clone, Copy)]
pub struct HmcParams {
    /// Molecular dynamics timestep ε.
    pub step_size: f64,

    /// Number of leapfrog steps L per trajectory.
    pub n_md_steps: usize,
}

impl Default for HmcParams {
    fn default() -> Self {
        Self { step_size: 0.1, n_md_steps: 10 }
    }
}

impl HmcParams {
    pub fn validate(&self) -> Result<()> {
        check_step_size(self.step_size)?;
        if self.n_md_steps < 1 {
            return Err(McError::InvalidParameters(
                "number of MD steps must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Trajectory length ε·L.
    pub fn trajectory_length(&self) -> f64 {
        self.step_size * self.n_md_steps as f64
    }
}

/// Outcome of one trajectory.
#[derive(Debug, Clone, Copy)]
pub struct TrajectoryInfo {
    pub accepted: bool,
    /// H₁ − H₀
    pub delta_h: f64,
    /// min(1, exp(−ΔH))
    pub acceptance_probability: f64,
}

#[derive(Debug, Clone)]
pub struct HmcSampler {
    lattice: LatticeAction,
    params: HmcParams,
    stats: ChainStats,
}

impl HmcSampler {
    pub fn new(lattice: LatticeAction, step_size: f64, n_md_steps: usize) -> Result<Self> {
        Self::with_params(lattice, HmcParams { step_size, n_md_steps })
    }

    pub fn with_params(lattice: LatticeAction, params: HmcParams) -> Result<Self> {
        lattice.params().validate()?;
        params.validate()?;
        Ok(Self { lattice, params, stats: ChainStats::default() })
    }

    pub fn lattice(&self) -> &LatticeAction {
        &self.lattice
    }

    pub fn params(&self) -> &HmcParams {
        &self.params
    }

    pub fn stats(&self) -> ChainStats {
        self.stats
    }

    /// Draw p(x) ~ N(0, 1) for every site.
    fn sample_momenta(&self, rng: &mut impl Rng) -> Vec<f64> {
        (0..self.lattice.n_sites()).map(|_| rng.sample(StandardNormal)).collect()
    }

    /// One momentum refresh, leapfrog trajectory and global accept/reject.
    pub fn trajectory(&mut self, rng: &mut impl Rng) -> TrajectoryInfo {
        let params = *self.lattice.params();

        // 1. Sample momenta from Gaussian distribution
        let momenta = self.sample_momenta(rng);

        // 2. Initial Hamiltonian
        let h_initial = hamiltonian(&params, self.lattice.field(), &momenta);

        // 3. Molecular dynamics on copies; the canonical field stays put
        let (field_final, momenta_final) = leapfrog(
            &params,
            self.lattice.field(),
            &momenta,
            self.params.step_size,
            self.params.n_md_steps,
        );

        // 4. Final Hamiltonian
        let h_final = hamiltonian(&params, &field_final, &momenta_final);
        let delta_h = h_final - h_initial;
        if !delta_h.is_finite() {
            warn!(h_initial, h_final, step_size = self.params.step_size, "non-finite ΔH, trajectory will be rejected");
        }

        // 5. Metropolis accept/reject; momenta are dropped either way
        let accepted = metropolis_accept(delta_h, rng);
        if accepted {
            self.lattice.replace_field(field_final);
        }
        self.stats.record(accepted);
        trace!(delta_h, accepted, "trajectory");

        TrajectoryInfo {
            accepted,
            delta_h,
            acceptance_probability: acceptance_probability(delta_h),
        }
    }

    pub fn measure(&self) -> Observables {
        Observables::measure(self.lattice.params(), self.lattice.field())
    }

    /// Run `n_trajectories` trajectories, measuring after each one once the
    /// first `burn_in` are done. Same acceptance-rate convention as
    /// `MetropolisSampler::run`.
    pub fn run(
        &mut self,
        rng: &mut impl Rng,
        n_trajectories: usize,
        burn_in: usize,
    ) -> Result<RunOutput> {
        check_burn_in(n_trajectories, burn_in)?;
        debug!(
            sampler = "hmc",
            n_sites = self.lattice.n_sites(),
            step_size = self.params.step_size,
            n_md_steps = self.params.n_md_steps,
            trajectory_length = self.params.trajectory_length(),
            n_trajectories,
            burn_in,
            "starting run"
        );

        let start = self.stats;
        let mut production_start = start;
        let n_measured = n_trajectories - burn_in;
        let mut series = Vec::with_capacity(n_measured);
        let mut delta_h = Vec::with_capacity(n_measured);

        for traj in 1..=n_trajectories {
            let info = self.trajectory(rng);
            if traj == burn_in {
                production_start = self.stats;
            }
            if traj > burn_in {
                delta_h.push(info.delta_h);
                series.push(self.measure());
            }
        }

        let output = RunOutput {
            series,
            stats: self.stats.since(&start),
            production_stats: self.stats.since(&production_start),
            delta_h,
        };
        debug!(
            sampler = "hmc",
            acceptance_rate = output.acceptance_rate(),
            production_acceptance_rate = output.production_stats.acceptance_rate(),
            creutz = output.mean_exp_minus_delta_h().unwrap_or(f64::NAN),
            n_samples = output.series.len(),
            "run finished"
        );
        Ok(output)
    }
}
