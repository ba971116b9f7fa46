//! Command-line driver: run a Metropolis or HMC chain, or both side by side,
//! and dump the observable time series as CSV.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use csv::WriterBuilder;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

use scalar_mc::chain::{run_replicas, RunOutput};
use scalar_mc::config::{HmcConfig, MetropolisConfig};
use scalar_mc::error_analysis::{Cutoff, ErrorAnalysis};
use scalar_mc::observables::{free_field_phi2, Observable};

#[derive(Parser)]
#[command(name = "scalar-mc", about = "Metropolis and HMC sampling of a 1D φ⁴ lattice field")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Single-site Metropolis chain
    Metropolis(MetropolisArgs),
    /// Hybrid Monte Carlo chain
    Hmc(HmcArgs),
    /// Independent Metropolis and HMC replicas on the same lattice, in parallel
    Compare(CompareArgs),
}

#[derive(Args, Clone)]
struct LatticeArgs {
    #[arg(long, default_value_t = MetropolisConfig::default().lattice_size)]
    lattice_size: usize,

    #[arg(long, default_value_t = MetropolisConfig::default().mass_squared, allow_hyphen_values = true)]
    mass_squared: f64,

    #[arg(long, default_value_t = MetropolisConfig::default().lambda_coupling, allow_hyphen_values = true)]
    lambda_coupling: f64,

    #[arg(long, default_value_t = MetropolisConfig::default().seed)]
    seed: u64,
}

#[derive(Args)]
struct MetropolisArgs {
    #[command(flatten)]
    lattice: LatticeArgs,

    #[arg(long, default_value_t = MetropolisConfig::default().step_size)]
    step_size: f64,

    #[arg(long, default_value_t = MetropolisConfig::default().n_sweeps)]
    n_sweeps: usize,

    #[arg(long, default_value_t = MetropolisConfig::default().burn_in)]
    burn_in: usize,

    #[arg(long, default_value_t = MetropolisConfig::default().measurement_interval)]
    measurement_interval: usize,

    /// Output CSV for the observable time series
    #[arg(long, default_value = "metropolis_series.csv")]
    output: PathBuf,
}

impl MetropolisArgs {
    fn config(&self) -> MetropolisConfig {
        MetropolisConfig {
            lattice_size: self.lattice.lattice_size,
            mass_squared: self.lattice.mass_squared,
            lambda_coupling: self.lattice.lambda_coupling,
            step_size: self.step_size,
            n_sweeps: self.n_sweeps,
            burn_in: self.burn_in,
            measurement_interval: self.measurement_interval,
            seed: self.lattice.seed,
        }
    }
}

#[derive(Args)]
struct HmcArgs {
    #[command(flatten)]
    lattice: LatticeArgs,

    #[arg(long, default_value_t = HmcConfig::default().step_size)]
    step_size: f64,

    #[arg(long, default_value_t = HmcConfig::default().n_md_steps)]
    n_md_steps: usize,

    #[arg(long, default_value_t = HmcConfig::default().n_trajectories)]
    n_trajectories: usize,

    #[arg(long, default_value_t = HmcConfig::default().burn_in)]
    burn_in: usize,

    #[arg(long, default_value = "hmc_series.csv")]
    output: PathBuf,
}

impl HmcArgs {
    fn config(&self) -> HmcConfig {
        HmcConfig {
            lattice_size: self.lattice.lattice_size,
            mass_squared: self.lattice.mass_squared,
            lambda_coupling: self.lattice.lambda_coupling,
            step_size: self.step_size,
            n_md_steps: self.n_md_steps,
            n_trajectories: self.n_trajectories,
            burn_in: self.burn_in,
            seed: self.lattice.seed,
        }
    }
}

#[derive(Args)]
struct CompareArgs {
    #[command(flatten)]
    metropolis: MetropolisArgs,

    #[arg(long = "hmc-step-size", default_value_t = HmcConfig::default().step_size)]
    hmc_step_size: f64,

    #[arg(long, default_value_t = HmcConfig::default().n_md_steps)]
    n_md_steps: usize,

    #[arg(long, default_value_t = HmcConfig::default().n_trajectories)]
    n_trajectories: usize,

    #[arg(long = "hmc-burn-in", default_value_t = HmcConfig::default().burn_in)]
    hmc_burn_in: usize,

    /// Independent replicas per algorithm
    #[arg(long, default_value_t = 4)]
    replicas: usize,

    /// CSV for the first HMC replica; the first Metropolis replica goes to `--output`
    #[arg(long, default_value = "hmc_series.csv")]
    hmc_output: PathBuf,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer().with_target(true);
    Registry::default().with(filter).with(fmt_layer).init();
}

fn write_series(path: &Path, output: &RunOutput) -> Result<()> {
    let mut wtr = WriterBuilder::new()
        .from_path(path)
        .with_context(|| format!("cannot create {}", path.display()))?;

    let n_corr = output.series.first().map_or(0, |o| o.correlation.len());
    let mut columns = vec![
        Observable::MeanPhi,
        Observable::MeanPhi2,
        Observable::MeanPhi4,
        Observable::Magnetization,
        Observable::Action,
    ];
    columns.extend((0..n_corr).map(Observable::Correlation));

    let mut header = vec!["sample".to_string()];
    header.extend(columns.iter().map(Observable::name));
    wtr.write_record(&header)?;

    for (i, obs) in output.series.iter().enumerate() {
        let mut row = vec![i.to_string()];
        row.extend(columns.iter().map(|c| c.extract(obs).to_string()));
        wtr.write_record(&row)?;
    }
    wtr.flush()?;
    Ok(())
}

fn summarise(label: &str, output: &RunOutput) -> Result<()> {
    let phi2 = output.observable(Observable::MeanPhi2);
    let analysis = ErrorAnalysis::new(phi2, Cutoff::default())
        .with_context(|| format!("{label}: too few measurements to analyse"))?;
    let errors = analysis.errors();
    info!(
        sampler = label,
        acceptance_rate = output.acceptance_rate(),
        phi2 = analysis.mean(),
        phi2_error = errors.binning_error,
        tau_int = errors.tau_int,
        n_eff = errors.n_eff,
        "⟨φ²⟩"
    );
    if let Some(creutz) = output.mean_exp_minus_delta_h() {
        info!(sampler = label, exp_minus_delta_h = creutz, "Creutz check");
    }
    Ok(())
}

fn log_free_field_reference(lattice_size: usize, mass_squared: f64, lambda: f64) {
    if lambda == 0.0 && mass_squared > 0.0 {
        info!(exact_phi2 = free_field_phi2(lattice_size, mass_squared), "free-field reference");
    }
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::Metropolis(args) => {
            let cfg = args.config();
            cfg.validate()?;
            info!(?cfg, "metropolis run");
            let output = cfg.run()?;
            summarise("metropolis", &output)?;
            log_free_field_reference(cfg.lattice_size, cfg.mass_squared, cfg.lambda_coupling);
            write_series(&args.output, &output)?;
            info!(path = %args.output.display(), "series written");
        }
        Command::Hmc(args) => {
            let cfg = args.config();
            cfg.validate()?;
            info!(?cfg, "hmc run");
            let output = cfg.run()?;
            summarise("hmc", &output)?;
            log_free_field_reference(cfg.lattice_size, cfg.mass_squared, cfg.lambda_coupling);
            write_series(&args.output, &output)?;
            info!(path = %args.output.display(), "series written");
        }
        Command::Compare(args) => {
            let metro_cfg = args.metropolis.config();
            let hmc_cfg = HmcConfig {
                lattice_size: metro_cfg.lattice_size,
                mass_squared: metro_cfg.mass_squared,
                lambda_coupling: metro_cfg.lambda_coupling,
                step_size: args.hmc_step_size,
                n_md_steps: args.n_md_steps,
                n_trajectories: args.n_trajectories,
                burn_in: args.hmc_burn_in,
                seed: metro_cfg.seed,
            };
            metro_cfg.validate()?;
            hmc_cfg.validate()?;

            let bar = ProgressBar::new(2 * args.replicas as u64);
            bar.set_style(
                ProgressStyle::with_template(" {bar:40.cyan/blue} {pos}/{len} chains [{elapsed_precise}]")
                    .context("invalid progress template")?,
            );

            // Even replica ids run Metropolis, odd ones HMC; every chain has its own stream.
            let outputs = run_replicas(metro_cfg.seed, 2 * args.replicas, |id, rng| {
                let out = if id % 2 == 0 { metro_cfg.run_with(rng) } else { hmc_cfg.run_with(rng) };
                bar.inc(1);
                out
            });
            bar.finish();

            for (id, output) in outputs.into_iter().enumerate() {
                let output = output?;
                let label = if id % 2 == 0 { "metropolis" } else { "hmc" };
                summarise(&format!("{label}#{}", id / 2), &output)?;
                match id {
                    0 => write_series(&args.metropolis.output, &output)?,
                    1 => write_series(&args.hmc_output, &output)?,
                    _ => {}
                }
            }
            log_free_field_reference(metro_cfg.lattice_size, metro_cfg.mass_squared, metro_cfg.lambda_coupling);
        }
    }
    Ok(())
}
