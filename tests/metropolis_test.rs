//! Unit‑test: basic sanity check on Metropolis acceptance rate.

use scalar_mc::lattice::{LatticeAction, LatticeParams};
use scalar_mc::metropolis::{MetropolisSampler, StepInfo};

use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

#[test]
fn test_metropolis_acceptance_rate() {
    // -----------------------------------------------------------
    // Deterministic RNG so the test is repeatable.
    // -----------------------------------------------------------
    let mut rng = ChaCha20Rng::seed_from_u64(0xDEADBEEF);

    // Hot start with the same RNG.
    let params = LatticeParams::new(8, 1.0, 1.0).unwrap();
    let lattice = LatticeAction::random_with(&mut rng, params, 1.0).unwrap();
    let mut sampler = MetropolisSampler::new(lattice, 0.5).unwrap();

    let n_sweeps = 1_000;
    let mut accepted = 0usize;
    let mut downhill = 0usize;

    for _ in 0..n_sweeps {
        for site in 0..8 {
            let StepInfo { accepted: acc, delta_s } = sampler.update_site(site, &mut rng);
            if delta_s <= 0.0 {
                assert!(acc, "ΔS = {delta_s} must always be accepted");
                downhill += 1;
            }
            if acc { accepted += 1; }
        }
    }

    let acc_rate = accepted as f64 / (8 * n_sweeps) as f64;
    assert_eq!(sampler.stats().proposals, 8 * n_sweeps as u64);
    assert!((sampler.stats().acceptance_rate() - acc_rate).abs() < 1e-12);
    assert!(downhill > 0);

    // For a sensible ε we expect a rate strictly between 0 % and 100 %.
    assert!(
        (0.01..=0.99).contains(&acc_rate),
        "Acceptance rate {acc_rate:.3} is outside plausible range"
    );
}

#[test]
fn test_acceptance_falls_with_step_size() {
    let params = LatticeParams::new(10, 1.0, 0.0).unwrap();
    let rate = |step: f64| {
        let mut rng = ChaCha20Rng::seed_from_u64(5);
        let mut sampler = MetropolisSampler::new(LatticeAction::new(params).unwrap(), step).unwrap();
        sampler.run(&mut rng, 2_000, 200, 10).unwrap().acceptance_rate()
    };
    let small = rate(0.1);
    let medium = rate(1.0);
    let large = rate(5.0);
    assert!(small > medium && medium > large, "{small} {medium} {large}");
    assert!(small > 0.9 && large < 0.3);
}

#[test]
fn test_action_stays_consistent_over_a_run() {
    // Recomputing S from scratch matches the sum of accepted ΔS.
    let mut rng = ChaCha20Rng::seed_from_u64(31);
    let params = LatticeParams::new(12, -0.4, 0.3).unwrap();
    let lattice = LatticeAction::random_with(&mut rng, params, 1.0).unwrap();
    let mut sampler = MetropolisSampler::new(lattice, 0.8).unwrap();

    let mut action = sampler.lattice().action();
    for _ in 0..500 {
        for site in 0..12 {
            let info = sampler.update_site(site, &mut rng);
            if info.accepted {
                action += info.delta_s;
            }
        }
    }
    let fresh = sampler.lattice().action();
    assert!((action - fresh).abs() < 1e-8 * (1.0 + fresh.abs()), "{action} vs {fresh}");
}
