// lattice.rs - 1D periodic scalar field and its φ⁴ action

use crate::error::{McError, Result};
use rand::distributions::{Distribution, Uniform};
use rand::Rng;

/// Couplings of S[φ] = Σₓ [ ½(φ(x+1)−φ(x))² + ½ m² φ(x)² + λ φ(x)⁴ ].
///
/// `mass_squared` may be negative (broken phase). A negative `lambda` is
/// accepted as well, but then the action is unbounded below.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatticeParams {
    pub n_sites: usize,
    pub mass_squared: f64,
    pub lambda: f64,
}

impl LatticeParams {
    pub fn new(n_sites: usize, mass_squared: f64, lambda: f64) -> Result<Self> {
        let params = Self { n_sites, mass_squared, lambda };
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<()> {
        if self.n_sites < 2 {
            return Err(McError::InvalidConfiguration(format!(
                "lattice needs at least 2 sites, got {}",
                self.n_sites
            )));
        }
        Ok(())
    }

    /// Left and right neighbour of `site` with periodic wrap.
    #[inline(always)]
    pub fn neighbours(&self, site: usize) -> (usize, usize) {
        let n = self.n_sites;
        ((site + n - 1) % n, (site + 1) % n)
    }

    /// Single-site potential ½ m² φ² + λ φ⁴.
    #[inline(always)]
    fn potential(&self, phi: f64) -> f64 {
        let phi2 = phi * phi;
        0.5 * self.mass_squared * phi2 + self.lambda * phi2 * phi2
    }

    /// Full action of an arbitrary field of length `n_sites`.
    pub fn action_of(&self, field: &[f64]) -> f64 {
        debug_assert_eq!(field.len(), self.n_sites);
        let n = field.len();
        (0..n)
            .map(|x| {
                let grad = field[(x + 1) % n] - field[x];
                0.5 * grad * grad + self.potential(field[x])
            })
            .sum()
    }

    /// −∂S/∂φ(site) for an arbitrary field.
    #[inline]
    pub fn force_at(&self, field: &[f64], site: usize) -> f64 {
        let (left, right) = self.neighbours(site);
        let phi = field[site];
        (field[right] - 2.0 * phi + field[left])
            - self.mass_squared * phi
            - 4.0 * self.lambda * phi * phi * phi
    }

    /// Force on every site of `field`, written into `out`.
    pub fn forces_into(&self, field: &[f64], out: &mut [f64]) {
        debug_assert_eq!(field.len(), out.len());
        for (site, f) in out.iter_mut().enumerate() {
            *f = self.force_at(field, site);
        }
    }
}

/// A field configuration together with the action that governs it.
///
/// Owned by exactly one sampler; mutated in place only after the sampler has
/// decided to accept an update.
#[derive(Debug, Clone)]
pub struct LatticeAction {
    params: LatticeParams,
    field: Vec<f64>,
}

impl LatticeAction {
    /// Cold start: φ(x) = 0 everywhere.
    pub fn new(params: LatticeParams) -> Result<Self> {
        params.validate()?;
        Ok(Self { field: vec![0.0; params.n_sites], params })
    }

    /// Hot start with φ(x) ~ U(−amplitude, amplitude), using a caller‑supplied
    /// RNG for reproducibility.
    pub fn random_with(rng: &mut impl Rng, params: LatticeParams, amplitude: f64) -> Result<Self> {
        params.validate()?;
        if !(amplitude.is_finite() && amplitude > 0.0) {
            return Err(McError::InvalidParameters(format!(
                "hot-start amplitude must be finite and > 0, got {amplitude}"
            )));
        }
        let dist = Uniform::new(-amplitude, amplitude);
        let field = (0..params.n_sites).map(|_| dist.sample(rng)).collect();
        Ok(Self { params, field })
    }

    /// Start from an explicit field; its length must match `params.n_sites`.
    pub fn from_field(params: LatticeParams, field: Vec<f64>) -> Result<Self> {
        params.validate()?;
        if field.len() != params.n_sites {
            return Err(McError::InvalidConfiguration(format!(
                "field has {} sites, parameters say {}",
                field.len(),
                params.n_sites
            )));
        }
        Ok(Self { params, field })
    }

    #[inline(always)]
    pub fn n_sites(&self) -> usize {
        self.params.n_sites
    }

    pub fn params(&self) -> &LatticeParams {
        &self.params
    }

    pub fn field(&self) -> &[f64] {
        &self.field
    }

    #[inline(always)]
    pub fn get(&self, site: usize) -> f64 {
        self.field[site]
    }

    /// S[φ], O(N).
    pub fn action(&self) -> f64 {
        self.params.action_of(&self.field)
    }

    /// ΔS for φ(site) → `proposed_value`, in O(1).
    ///
    /// Only the two bonds touching `site` and the site's own potential change;
    /// every other term of S cancels. For N = 2 both bonds join the same pair
    /// of sites, matching how `action` counts them.
    pub fn local_action_delta(&self, site: usize, proposed_value: f64) -> f64 {
        let (left, right) = self.params.neighbours(site);
        let l = self.field[left];
        let r = self.field[right];
        let old = self.field[site];
        let new = proposed_value;

        let kinetic = 0.5 * ((r - new).powi(2) - (r - old).powi(2))
            + 0.5 * ((new - l).powi(2) - (old - l).powi(2));
        kinetic + self.params.potential(new) - self.params.potential(old)
    }

    /// −∂S/∂φ(site).
    pub fn force(&self, site: usize) -> f64 {
        self.params.force_at(&self.field, site)
    }

    /// In-place update; the caller has already accepted the move.
    #[inline(always)]
    pub fn set(&mut self, site: usize, value: f64) {
        self.field[site] = value;
    }

    /// Swap in a whole new configuration (accepted HMC trajectory).
    pub(crate) fn replace_field(&mut self, field: Vec<f64>) {
        debug_assert_eq!(field.len(), self.params.n_sites);
        self.field = field;
    }
}
