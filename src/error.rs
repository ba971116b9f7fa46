// error.rs - Error taxonomy shared by the samplers and the statistics layer

use thiserror::Error;

/// Caller errors raised at the point of violation. None of them are transient:
/// once a chain has been validated, sweeps and trajectories cannot fail.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum McError {
    /// Lattice too small (N < 2).
    #[error("invalid lattice configuration: {0}")]
    InvalidConfiguration(String),

    /// Non-positive step size, zero MD steps, burn-in longer than the run, ...
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    /// Estimator given too few data points for the requested window.
    #[error("insufficient samples: need {required}, got {available}")]
    InsufficientSamples { required: usize, available: usize },
}

pub type Result<T> = std::result::Result<T, McError>;

/// Shared guard for step sizes: strictly positive, and 2ε (the width of the
/// Metropolis proposal window) must still be finite.
pub(crate) fn check_step_size(step_size: f64) -> Result<()> {
    if !(step_size > 0.0 && (2.0 * step_size).is_finite()) {
        return Err(McError::InvalidParameters(format!(
            "step size must be > 0 with 2ε finite, got {step_size}"
        )));
    }
    Ok(())
}

pub(crate) fn check_measurement_interval(interval: usize) -> Result<()> {
    if interval == 0 {
        return Err(McError::InvalidParameters(
            "measurement interval must be at least 1".to_string(),
        ));
    }
    Ok(())
}

/// Shared guard for run lengths: burn-in cannot exceed the total step count.
pub(crate) fn check_burn_in(total: usize, burn_in: usize) -> Result<()> {
    if total < burn_in {
        return Err(McError::InvalidParameters(format!(
            "burn-in ({burn_in}) exceeds total number of updates ({total})"
        )));
    }
    Ok(())
}
