// error_analysis.rs - Error analysis for correlated Monte Carlo time series

use crate::error::{McError, Result};
use rand::Rng;

/// Smallest number of bins a binning level may have in `ErrorAnalysis`.
pub const DEFAULT_MIN_BINS: usize = 32;

/// Where to stop summing ρ(t) in τ_int = ½ + Σ ρ(t).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cutoff {
    /// Sum ρ(1), ρ(2), ... up to, but not including, the first ρ(t) ≤ 0.
    FirstZeroCrossing,
    /// Sum exactly ρ(1)..=ρ(T).
    FixedWindow(usize),
    /// Sokal's self-consistent window: stop at the first T with
    /// T ≥ window_factor · τ_int(T).
    Automatic { window_factor: f64 },
}

impl Default for Cutoff {
    fn default() -> Self {
        Cutoff::Automatic { window_factor: 6.0 }
    }
}

/// τ_int together with the summation window that produced it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AutocorrelationTime {
    pub tau_int: f64,
    pub window: usize,
}

fn require(required: usize, available: usize) -> Result<()> {
    if available < required {
        return Err(McError::InsufficientSamples { required, available });
    }
    Ok(())
}

fn mean(data: &[f64]) -> f64 {
    data.iter().sum::<f64>() / data.len() as f64
}

/// Every sample equal to the first. The sample mean of such a series is off by
/// rounding, so its variance cannot be compared against zero.
fn is_constant(data: &[f64]) -> bool {
    data.iter().all(|&x| x == data[0])
}

/// Biased autocovariance (1/n) Σ_{i<n−t} (xᵢ − x̄)(x_{i+t} − x̄).
fn autocovariance(data: &[f64], mean: f64, lag: usize) -> f64 {
    let n = data.len();
    data[..n - lag]
        .iter()
        .zip(&data[lag..])
        .map(|(&a, &b)| (a - mean) * (b - mean))
        .sum::<f64>()
        / n as f64
}

/// Normalised autocorrelation ρ(t) for t = 0..=max_lag.
///
/// All lags share the same sample mean and the same (biased) variance. A
/// constant series has ρ(0) = 1 and ρ(t) = 0 for t > 0.
pub fn autocorrelation_function(series: &[f64], max_lag: usize) -> Result<Vec<(usize, f64)>> {
    require(max_lag + 1, series.len())?;
    let mu = mean(series);
    let c0 = autocovariance(series, mu, 0);
    let constant = is_constant(series);
    Ok((0..=max_lag)
        .map(|t| {
            let rho = if constant {
                if t == 0 { 1.0 } else { 0.0 }
            } else {
                autocovariance(series, mu, t) / c0
            };
            (t, rho)
        })
        .collect())
}

/// τ_int and the window used, under an explicit cutoff policy.
///
/// Never below ½; exactly ½ for a series with no variance.
pub fn autocorrelation_time(series: &[f64], cutoff: Cutoff) -> Result<AutocorrelationTime> {
    let n = series.len();
    require(2, n)?;

    if is_constant(series) {
        return Ok(AutocorrelationTime { tau_int: 0.5, window: 0 });
    }
    let mu = mean(series);
    let c0 = autocovariance(series, mu, 0);
    let rho = |t: usize| autocovariance(series, mu, t) / c0;

    // Open-ended policies never look past half the series.
    let max_lag = (n / 2).max(1);
    let mut tau = 0.5;
    let mut window = 0;

    match cutoff {
        Cutoff::FixedWindow(w) => {
            require(w + 1, n)?;
            for t in 1..=w {
                tau += rho(t);
            }
            window = w;
        }
        Cutoff::FirstZeroCrossing => {
            for t in 1..=max_lag {
                let r = rho(t);
                if r <= 0.0 {
                    break;
                }
                tau += r;
                window = t;
            }
        }
        Cutoff::Automatic { window_factor } => {
            if !(window_factor.is_finite() && window_factor > 0.0) {
                return Err(McError::InvalidParameters(format!(
                    "window factor must be finite and > 0, got {window_factor}"
                )));
            }
            for t in 1..=max_lag {
                tau += rho(t);
                window = t;
                if t as f64 >= window_factor * tau {
                    break;
                }
            }
        }
    }

    Ok(AutocorrelationTime { tau_int: tau.max(0.5), window })
}

/// τ_int = ½ + Σ_{t=1}^{T} ρ(t), T chosen by `cutoff`.
pub fn integrated_autocorrelation_time(series: &[f64], cutoff: Cutoff) -> Result<f64> {
    autocorrelation_time(series, cutoff).map(|a| a.tau_int)
}

/// N_eff = N / (2 τ_int).
pub fn effective_sample_size(series: &[f64], cutoff: Cutoff) -> Result<f64> {
    let tau = integrated_autocorrelation_time(series, cutoff)?;
    Ok(series.len() as f64 / (2.0 * tau))
}

/// Leave-one-out jackknife of the mean. Returns `(mean, error)`.
pub fn jackknife_error(series: &[f64]) -> Result<(f64, f64)> {
    let n = series.len();
    require(2, n)?;
    let total: f64 = series.iter().sum();
    let full = total / n as f64;
    let nf = n as f64;
    let sum_sq: f64 = series
        .iter()
        .map(|&x| {
            let mean_i = (total - x) / (nf - 1.0);
            (mean_i - full).powi(2)
        })
        .sum();
    Ok((full, ((nf - 1.0) / nf * sum_sq).sqrt()))
}

/// Jackknife for an arbitrary statistic. Returns `(estimate on full sample,
/// error)`.
pub fn jackknife_estimate<F>(series: &[f64], estimator: F) -> Result<(f64, f64)>
where
    F: Fn(&[f64]) -> f64,
{
    let n = series.len();
    require(2, n)?;

    let full_estimate = estimator(series);

    let mut jack_estimates = Vec::with_capacity(n);
    let mut subsample = Vec::with_capacity(n - 1);
    for i in 0..n {
        subsample.clear();
        subsample.extend(series.iter().enumerate().filter(|&(j, _)| j != i).map(|(_, &v)| v));
        jack_estimates.push(estimator(&subsample));
    }

    let jack_mean = mean(&jack_estimates);
    let jack_var = jack_estimates.iter().map(|&x| (x - jack_mean).powi(2)).sum::<f64>()
        * (n - 1) as f64
        / n as f64;

    Ok((full_estimate, jack_var.sqrt()))
}

/// Jackknife of the mean over contiguous blocks of `bin_size` samples.
/// A trailing partial block is dropped.
pub fn jackknife_binned(series: &[f64], bin_size: usize) -> Result<(f64, f64)> {
    if bin_size == 0 {
        return Err(McError::InvalidParameters("bin size must be at least 1".to_string()));
    }
    require(2 * bin_size, series.len())?;
    let bins = bin_means(series, bin_size);
    jackknife_error(&bins)
}

/// Bootstrap of the mean with `n_resamples` resamples of size n drawn with
/// replacement. Returns `(mean of series, std. dev. of resample means)`.
pub fn bootstrap_error(series: &[f64], n_resamples: usize, rng: &mut impl Rng) -> Result<(f64, f64)> {
    let n = series.len();
    require(1, n)?;
    require(2, n_resamples)?;

    let resample_means: Vec<f64> = (0..n_resamples)
        .map(|_| (0..n).map(|_| series[rng.gen_range(0..n)]).sum::<f64>() / n as f64)
        .collect();

    let boot_mean = mean(&resample_means);
    let var = resample_means.iter().map(|&m| (m - boot_mean).powi(2)).sum::<f64>()
        / (n_resamples - 1) as f64;

    Ok((mean(series), var.sqrt()))
}

/// Standard error of the mean at one bin size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BinningLevel {
    pub bin_size: usize,
    pub n_bins: usize,
    pub error: f64,
}

fn bin_means(series: &[f64], bin_size: usize) -> Vec<f64> {
    series
        .chunks_exact(bin_size)
        .map(|chunk| chunk.iter().sum::<f64>() / bin_size as f64)
        .collect()
}

/// Error of the mean for bin sizes 1, 2, 4, ... as long as at least
/// `min_bins` bins remain.
///
/// The level-1 error is the naive uncorrelated one; levels flatten out once
/// the bin size exceeds the autocorrelation length.
pub fn binning_analysis(series: &[f64], min_bins: usize) -> Result<Vec<BinningLevel>> {
    if min_bins < 2 {
        return Err(McError::InvalidParameters(format!(
            "binning needs at least 2 bins per level, got {min_bins}"
        )));
    }
    require(min_bins, series.len())?;

    let mut levels = Vec::new();
    let mut bin_size = 1;
    while series.len() / bin_size >= min_bins {
        let means = bin_means(series, bin_size);
        let nb = means.len() as f64;
        let mu = mean(&means);
        let var = means.iter().map(|&m| (m - mu).powi(2)).sum::<f64>() / (nb - 1.0);
        levels.push(BinningLevel { bin_size, n_bins: means.len(), error: (var / nb).sqrt() });
        bin_size *= 2;
    }
    Ok(levels)
}

/// Plateau of a binning analysis, taken as the largest level error.
pub fn plateau_error(levels: &[BinningLevel]) -> Option<f64> {
    levels.iter().map(|l| l.error).fold(None, |acc, e| Some(acc.map_or(e, |a: f64| a.max(e))))
}

/// τ_int implied by binning: ½ (σ_plateau / σ_naive)².
pub fn binning_tau(levels: &[BinningLevel]) -> Option<f64> {
    let naive = levels.first()?.error;
    if naive == 0.0 {
        return Some(0.5);
    }
    plateau_error(levels).map(|p| 0.5 * (p / naive).powi(2))
}

/// Full error analysis of one observable's time series.
#[derive(Debug, Clone)]
pub struct ErrorAnalysis {
    /// Raw time series data
    data: Vec<f64>,
    mean: f64,
    variance: f64,
    autocorr: AutocorrelationTime,
    /// Effective sample size
    n_eff: f64,
    /// Statistical error from the autocorrelation time
    stat_error: f64,
    jack_error: f64,
    binning: Vec<BinningLevel>,
}

impl ErrorAnalysis {
    /// Analyse `data` with the given τ_int cutoff. Needs at least 2 samples.
    pub fn new(data: Vec<f64>, cutoff: Cutoff) -> Result<Self> {
        let n = data.len();
        require(2, n)?;

        let mean = mean(&data);
        let variance = data.iter().map(|&x| (x - mean).powi(2)).sum::<f64>() / (n - 1) as f64;

        let autocorr = autocorrelation_time(&data, cutoff)?;
        let n_eff = n as f64 / (2.0 * autocorr.tau_int);
        let stat_error = (variance / n_eff).sqrt();

        let (_, jack_error) = jackknife_error(&data)?;
        let binning = binning_analysis(&data, DEFAULT_MIN_BINS.min(n))?;

        Ok(Self { data, mean, variance, autocorr, n_eff, stat_error, jack_error, binning })
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Sample variance with n − 1 denominator.
    pub fn variance(&self) -> f64 {
        self.variance
    }

    pub fn binning(&self) -> &[BinningLevel] {
        &self.binning
    }

    /// Get all error estimates
    pub fn errors(&self) -> ErrorEstimates {
        ErrorEstimates {
            tau_int: self.autocorr.tau_int,
            window: self.autocorr.window,
            n_eff: self.n_eff,
            stat_error: self.stat_error,
            jack_error: self.jack_error,
            binning_error: plateau_error(&self.binning).unwrap_or(self.stat_error),
            relative_error: self.stat_error / self.mean.abs(),
        }
    }
}

/// Container for different error estimates
#[derive(Debug, Clone, Copy)]
pub struct ErrorEstimates {
    pub tau_int: f64,
    pub window: usize,
    pub n_eff: f64,
    /// √(var · 2τ_int / N)
    pub stat_error: f64,
    /// Naive (uncorrelated) jackknife error
    pub jack_error: f64,
    /// Plateau of the binning analysis
    pub binning_error: f64,
    pub relative_error: f64,
}

/// Chi-squared comparison of measured values against expectations.
#[derive(Debug, Clone, Copy)]
pub struct ChiSquaredTest {
    chi2: f64,
    dof: usize,
}

impl ChiSquaredTest {
    /// Terms with a non-positive error are skipped. One degree of freedom is
    /// removed for the normalisation constraint of a histogram.
    pub fn new(observed: &[f64], expected: &[f64], errors: &[f64]) -> Result<Self> {
        if observed.len() != expected.len() || observed.len() != errors.len() {
            return Err(McError::InvalidParameters(format!(
                "length mismatch: {} observed, {} expected, {} errors",
                observed.len(),
                expected.len(),
                errors.len()
            )));
        }

        let mut chi2 = 0.0;
        let mut n_terms = 0usize;
        for ((&obs, &exp), &err) in observed.iter().zip(expected).zip(errors) {
            if err > 0.0 {
                chi2 += ((obs - exp) / err).powi(2);
                n_terms += 1;
            }
        }

        let dof = n_terms.saturating_sub(1);
        Ok(Self { chi2, dof })
    }

    pub fn chi2(&self) -> f64 { self.chi2 }
    pub fn dof(&self) -> usize { self.dof }
    pub fn chi2_per_dof(&self) -> f64 {
        if self.dof > 0 { self.chi2 / self.dof as f64 } else { 0.0 }
    }
}
