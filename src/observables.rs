// observables.rs - Measurements on a single field configuration

use crate::lattice::LatticeParams;

/// One measurement taken after a sweep or trajectory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Observables {
    /// ⟨φ⟩ = (1/N) Σ φ(x)
    pub mean_phi: f64,
    /// ⟨φ²⟩
    pub mean_phi2: f64,
    /// ⟨φ⁴⟩
    pub mean_phi4: f64,
    /// |⟨φ⟩|, order parameter for the broken phase
    pub magnetization: f64,
    /// S[φ]
    pub action: f64,
    /// C(r) = (1/N) Σₓ φ(x) φ(x+r) for r = 0..=N/2
    pub correlation: Vec<f64>,
}

impl Observables {
    /// Measure all observables on `field`. Pure read; the caller owns when
    /// this happens relative to updates.
    pub fn measure(params: &LatticeParams, field: &[f64]) -> Self {
        let n = field.len();
        let inv_n = 1.0 / n as f64;

        let mut sum = 0.0;
        let mut sum2 = 0.0;
        let mut sum4 = 0.0;
        for &phi in field {
            let phi2 = phi * phi;
            sum += phi;
            sum2 += phi2;
            sum4 += phi2 * phi2;
        }

        let correlation = (0..=n / 2)
            .map(|r| {
                (0..n).map(|x| field[x] * field[(x + r) % n]).sum::<f64>() * inv_n
            })
            .collect();

        let mean_phi = sum * inv_n;
        Observables {
            mean_phi,
            mean_phi2: sum2 * inv_n,
            mean_phi4: sum4 * inv_n,
            magnetization: mean_phi.abs(),
            action: params.action_of(field),
            correlation,
        }
    }
}

/// Scalar observables that can be pulled out of a series of measurements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observable {
    MeanPhi,
    MeanPhi2,
    MeanPhi4,
    Magnetization,
    Action,
    /// C(r); out-of-range distances yield NaN.
    Correlation(usize),
}

impl Observable {
    pub fn extract(&self, obs: &Observables) -> f64 {
        match *self {
            Observable::MeanPhi => obs.mean_phi,
            Observable::MeanPhi2 => obs.mean_phi2,
            Observable::MeanPhi4 => obs.mean_phi4,
            Observable::Magnetization => obs.magnetization,
            Observable::Action => obs.action,
            Observable::Correlation(r) => obs.correlation.get(r).copied().unwrap_or(f64::NAN),
        }
    }

    pub fn name(&self) -> String {
        match self {
            Observable::MeanPhi => "mean_phi".to_string(),
            Observable::MeanPhi2 => "mean_phi2".to_string(),
            Observable::MeanPhi4 => "mean_phi4".to_string(),
            Observable::Magnetization => "magnetization".to_string(),
            Observable::Action => "action".to_string(),
            Observable::Correlation(r) => format!("corr_{r}"),
        }
    }
}

/// Ensemble quantities of the mean field ⟨φ⟩ over a whole time series.
///
/// These need the series, not a single configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct MagnetizationMoments {
    pub n_samples: usize,
    pub m1_abs: f64,
    pub m2: f64,
    pub m4: f64,
}

impl MagnetizationMoments {
    pub fn from_series(series: &[Observables]) -> Self {
        let mut acc = Self::default();
        for obs in series {
            let m = obs.mean_phi;
            acc.n_samples += 1;
            acc.m1_abs += m.abs();
            acc.m2 += m * m;
            acc.m4 += m.powi(4);
        }
        if acc.n_samples > 0 {
            let n = acc.n_samples as f64;
            acc.m1_abs /= n;
            acc.m2 /= n;
            acc.m4 /= n;
        }
        acc
    }

    /// χ = N (⟨M²⟩ − ⟨|M|⟩²)
    pub fn susceptibility(&self, n_sites: usize) -> f64 {
        n_sites as f64 * (self.m2 - self.m1_abs.powi(2))
    }

    /// U = 1 − ⟨M⁴⟩ / (3⟨M²⟩²); 0 for Gaussian fluctuations, 2/3 when ordered.
    pub fn binder_cumulant(&self) -> f64 {
        if self.m2 > 0.0 {
            1.0 - self.m4 / (3.0 * self.m2 * self.m2)
        } else {
            0.0
        }
    }
}

/// Exact ⟨φ(x)φ(x+r)⟩ of the free field (λ = 0) on an N-site ring:
/// (1/N) Σₖ cos(2πkr/N) / (4 sin²(πk/N) + m²). Requires m² > 0.
pub fn free_field_propagator(n_sites: usize, mass_squared: f64, r: usize) -> f64 {
    let n = n_sites as f64;
    (0..n_sites)
        .map(|k| {
            let p = std::f64::consts::PI * k as f64 / n;
            let lattice_p2 = 4.0 * p.sin().powi(2);
            (2.0 * p * r as f64).cos() / (lattice_p2 + mass_squared)
        })
        .sum::<f64>()
        / n
}

/// Exact free-field ⟨φ²⟩.
pub fn free_field_phi2(n_sites: usize, mass_squared: f64) -> f64 {
    free_field_propagator(n_sites, mass_squared, 0)
}
