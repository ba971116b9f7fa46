// config.rs - Run configurations (single source of truth for defaults)

use crate::chain::RunOutput;
use crate::error::{check_burn_in, check_measurement_interval, Result};
use crate::hmc::HmcSampler;
use crate::lattice::{LatticeAction, LatticeParams};
use crate::metropolis::MetropolisSampler;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

/// Metropolis run: lattice, proposal width and measurement schedule.
#[derive(Debug, Clone, PartialEq)]
pub struct MetropolisConfig {
    pub lattice_size: usize,
    pub mass_squared: f64,
    pub lambda_coupling: f64,
    pub step_size: f64,
    pub n_sweeps: usize,
    pub burn_in: usize,
    pub measurement_interval: usize,
    pub seed: u64,
}

impl Default for MetropolisConfig {
    fn default() -> Self {
        Self {
            lattice_size: 10,
            mass_squared: 1.0,
            lambda_coupling: 0.0,
            step_size: 0.5,
            n_sweeps: 5_000,
            burn_in: 500,
            measurement_interval: 1,
            seed: 0x5EED,
        }
    }
}

impl MetropolisConfig {
    pub fn lattice_params(&self) -> Result<LatticeParams> {
        LatticeParams::new(self.lattice_size, self.mass_squared, self.lambda_coupling)
    }

    pub fn validate(&self) -> Result<()> {
        let lattice = LatticeAction::new(self.lattice_params()?)?;
        MetropolisSampler::new(lattice, self.step_size)?;
        check_burn_in(self.n_sweeps, self.burn_in)?;
        check_measurement_interval(self.measurement_interval)
    }

    /// Cold start with a `ChaCha20Rng` seeded from `seed`.
    pub fn run(&self) -> Result<RunOutput> {
        let mut rng = ChaCha20Rng::seed_from_u64(self.seed);
        self.run_with(&mut rng)
    }

    pub fn run_with(&self, rng: &mut ChaCha20Rng) -> Result<RunOutput> {
        let lattice = LatticeAction::new(self.lattice_params()?)?;
        let mut sampler = MetropolisSampler::new(lattice, self.step_size)?;
        sampler.run(rng, self.n_sweeps, self.burn_in, self.measurement_interval)
    }
}

/// HMC run: lattice, integrator settings and trajectory count.
#[derive(Debug, Clone, PartialEq)]
pub struct HmcConfig {
    pub lattice_size: usize,
    pub mass_squared: f64,
    pub lambda_coupling: f64,
    pub step_size: f64,
    pub n_md_steps: usize,
    pub n_trajectories: usize,
    pub burn_in: usize,
    pub seed: u64,
}

impl Default for HmcConfig {
    fn default() -> Self {
        Self {
            lattice_size: 10,
            mass_squared: 1.0,
            lambda_coupling: 0.0,
            step_size: 0.1,
            n_md_steps: 10,
            n_trajectories: 1_000,
            burn_in: 100,
            seed: 0x5EED,
        }
    }
}

impl HmcConfig {
    pub fn lattice_params(&self) -> Result<LatticeParams> {
        LatticeParams::new(self.lattice_size, self.mass_squared, self.lambda_coupling)
    }

    pub fn validate(&self) -> Result<()> {
        let lattice = LatticeAction::new(self.lattice_params()?)?;
        HmcSampler::new(lattice, self.step_size, self.n_md_steps)?;
        check_burn_in(self.n_trajectories, self.burn_in)
    }

    pub fn run(&self) -> Result<RunOutput> {
        let mut rng = ChaCha20Rng::seed_from_u64(self.seed);
        self.run_with(&mut rng)
    }

    pub fn run_with(&self, rng: &mut ChaCha20Rng) -> Result<RunOutput> {
        let lattice = LatticeAction::new(self.lattice_params()?)?;
        let mut sampler = HmcSampler::new(lattice, self.step_size, self.n_md_steps)?;
        sampler.run(rng, self.n_trajectories, self.burn_in)
    }
}
