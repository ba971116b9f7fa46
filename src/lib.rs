pub mod error;
pub mod lattice;
pub mod observables;
pub mod chain;
pub mod metropolis;
pub mod leapfrog;
pub mod hmc;
pub mod error_analysis;
pub mod config;
pub mod utils;

pub use error::{McError, Result};
