//! Exact-cover formulation of beam placement and the solvers that consume it.
#![forbid(unsafe_code)]

pub mod coeffs;
pub mod configuration;
pub mod model;
pub mod solver;

pub use coeffs::{BaseCoefficients, Bias, Grain};
pub use configuration::{CONFIGURATIONS, Configuration};
pub use model::CoverModel;
pub use solver::{Assignment, BranchBoundSolver, CoverSolver, SolveOutcome};
