//! Leapfrog integrator for the molecular-dynamics part of HMC.
//!
//! p(t+ε/2) = p(t) + (ε/2) F(φ(t))
//! φ(t+ε)   = φ(t) + ε p(t+ε/2)
//! p(t+ε)   = p(t+ε/2) + (ε/2) F(φ(t+ε))
//!
//! with F = −∂S/∂φ. Inner half-steps are merged into full steps.

use crate::lattice::LatticeParams;

/// K = ½ Σ p².
pub fn kinetic_energy(momentum: &[f64]) -> f64 {
    0.5 * momentum.iter().map(|p| p * p).sum::<f64>()
}

/// H = ½ Σ p² + S[φ].
pub fn hamiltonian(params: &LatticeParams, field: &[f64], momentum: &[f64]) -> f64 {
    kinetic_energy(momentum) + params.action_of(field)
}

/// Integrate `n_steps` leapfrog steps of size `step_size` starting from
/// `(field, momentum)` and return the evolved pair.
///
/// The inputs are only read, so the caller keeps the starting configuration
/// for rollback. Running again with `-step_size` from the output returns to
/// the input up to rounding.
pub fn leapfrog(
    params: &LatticeParams,
    field: &[f64],
    momentum: &[f64],
    step_size: f64,
    n_steps: usize,
) -> (Vec<f64>, Vec<f64>) {
    debug_assert_eq!(field.len(), momentum.len());
    let mut phi = field.to_vec();
    let mut p = momentum.to_vec();
    let mut force = vec![0.0; phi.len()];

    // Initial half-step for momenta
    params.forces_into(&phi, &mut force);
    kick(&mut p, &force, 0.5 * step_size);

    for k in 1..=n_steps {
        for (x, &px) in phi.iter_mut().zip(p.iter()) {
            *x += step_size * px;
        }
        if k < n_steps {
            params.forces_into(&phi, &mut force);
            kick(&mut p, &force, step_size);
        }
    }

    // Final half-step for momenta
    params.forces_into(&phi, &mut force);
    kick(&mut p, &force, 0.5 * step_size);

    (phi, p)
}

#[inline]
fn kick(momentum: &mut [f64], force: &[f64], dt: f64) {
    for (p, &f) in momentum.iter_mut().zip(force) {
        *p += dt * f;
    }
}
