use scalar_mc::error_analysis::{
    autocorrelation_function, binning_analysis, binning_tau, bootstrap_error, effective_sample_size,
    integrated_autocorrelation_time, jackknife_binned, jackknife_error, plateau_error, Cutoff,
    ErrorAnalysis,
};

use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use rand_distr::{Distribution, Normal};

fn iid_series(seed: u64, n: usize, sigma: f64) -> Vec<f64> {
    let mut rng = ChaCha20Rng::seed_from_u64(seed);
    let dist = Normal::new(3.0, sigma).unwrap();
    (0..n).map(|_| dist.sample(&mut rng)).collect()
}

/// x_{t+1} = ρ x_t + η_t with unit-variance noise; τ_int = ½ + ρ/(1−ρ).
fn ar1_series(seed: u64, n: usize, rho: f64) -> Vec<f64> {
    let mut rng = ChaCha20Rng::seed_from_u64(seed);
    let noise = Normal::new(0.0, 1.0).unwrap();
    let mut x = 0.0;
    (0..n)
        .map(|_| {
            x = rho * x + noise.sample(&mut rng);
            x
        })
        .collect()
}

#[test]
fn test_iid_tau_approaches_one_half() {
    let short = iid_series(1, 500, 1.0);
    let long = iid_series(2, 50_000, 1.0);

    for cutoff in [Cutoff::FirstZeroCrossing, Cutoff::default()] {
        let tau_long = integrated_autocorrelation_time(&long, cutoff).unwrap();
        assert!((tau_long - 0.5).abs() < 0.03, "{cutoff:?}: τ_int = {tau_long}");
        let tau_short = integrated_autocorrelation_time(&short, cutoff).unwrap();
        assert!((tau_short - 0.5).abs() < 0.3, "{cutoff:?}: τ_int = {tau_short}");
    }
    let tau_fixed = integrated_autocorrelation_time(&long, Cutoff::FixedWindow(20)).unwrap();
    assert!((tau_fixed - 0.5).abs() < 0.1, "fixed window: τ_int = {tau_fixed}");

    let n_eff = effective_sample_size(&long, Cutoff::default()).unwrap();
    assert!(n_eff > 45_000.0, "N_eff = {n_eff}");
}

#[test]
fn test_ar1_autocorrelation() {
    let rho = 0.8;
    let data = ar1_series(3, 1 << 16, rho);

    let acf = autocorrelation_function(&data, 5).unwrap();
    for &(t, r) in &acf {
        assert!((r - rho.powi(t as i32)).abs() < 0.05, "ρ({t}) = {r}");
    }

    let exact_tau = 0.5 + rho / (1.0 - rho);
    let tau = integrated_autocorrelation_time(&data, Cutoff::default()).unwrap();
    assert!((tau - exact_tau).abs() < 0.8, "τ_int = {tau}, exact {exact_tau}");

    // The cutoff is a real knob: a window of 1 sees only ρ(1).
    let tau_w1 = integrated_autocorrelation_time(&data, Cutoff::FixedWindow(1)).unwrap();
    assert!((tau_w1 - (0.5 + rho)).abs() < 0.05);

    let n_eff = effective_sample_size(&data, Cutoff::default()).unwrap();
    assert!(n_eff < data.len() as f64 / 5.0);
}

#[test]
fn test_jackknife_and_bootstrap_converge_to_standard_error() {
    let sigma = 2.0;
    let mut rng = ChaCha20Rng::seed_from_u64(99);
    for (seed, n) in [(10u64, 1_000usize), (11, 10_000)] {
        let data = iid_series(seed, n, sigma);
        let expected = sigma / (n as f64).sqrt();

        let (mean_j, err_j) = jackknife_error(&data).unwrap();
        let (mean_b, err_b) = bootstrap_error(&data, 500, &mut rng).unwrap();
        assert_eq!(mean_j, mean_b);
        assert!((mean_j - 3.0).abs() < 5.0 * expected);

        for (name, err) in [("jackknife", err_j), ("bootstrap", err_b)] {
            let ratio = err / expected;
            assert!((0.85..1.15).contains(&ratio), "{name} n={n}: ratio {ratio:.3}");
        }
    }
}

#[test]
fn test_binning_exposes_underestimated_error() {
    let rho = 0.8;
    let data = ar1_series(5, 1 << 16, rho);
    let exact_tau = 0.5 + rho / (1.0 - rho);

    let levels = binning_analysis(&data, 32).unwrap();
    let naive = levels[0].error;
    let plateau = plateau_error(&levels).unwrap();
    let ratio = plateau / naive;
    let expected = (2.0 * exact_tau).sqrt();
    assert!(
        (2.3..4.0).contains(&ratio),
        "plateau/naive = {ratio:.2}, √(2τ_int) = {expected:.2}"
    );
    // Errors grow with bin size before the plateau.
    assert!(levels[1].error > naive && levels[3].error > levels[1].error);

    let tau_bin = binning_tau(&levels).unwrap();
    assert!((2.5..8.0).contains(&tau_bin), "binning τ = {tau_bin:.2}");

    // Blocked jackknife with bins far beyond τ agrees with the plateau.
    let (_, jack_blocked) = jackknife_binned(&data, 256).unwrap();
    assert!((jack_blocked / plateau - 1.0).abs() < 0.35);
}

#[test]
fn test_error_analysis_on_correlated_data() {
    let data = ar1_series(8, 20_000, 0.9);
    let analysis = ErrorAnalysis::new(data, Cutoff::default()).unwrap();
    let errors = analysis.errors();

    assert!(errors.tau_int > 5.0, "τ_int = {}", errors.tau_int);
    assert!(errors.n_eff < 2_000.0);
    // Naive jackknife ignores correlations; binning and τ_int do not.
    assert!(errors.binning_error > 2.0 * errors.jack_error);
    assert!(errors.stat_error > 2.0 * errors.jack_error);
}

#[test]
fn test_uncorrelated_binning_is_flat() {
    let data = iid_series(12, 1 << 14, 1.0);
    let levels = binning_analysis(&data, 32).unwrap();
    let naive = levels[0].error;
    for level in &levels {
        assert!((level.error / naive - 1.0).abs() < 0.4, "bin size {}: {}", level.bin_size, level.error);
    }
}
