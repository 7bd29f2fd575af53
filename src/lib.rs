//! higgsfit — Higgs-sector coupling fits.
//!
//! Grid scans of small Higgs-sector parameter spaces against experimental
//! signal-strength measurements: a likelihood engine over published
//! combinations, the electroweak STU chi-square, an interface to the
//! external 2HDM solver, bounded minimization for profiled nuisances, and
//! confidence-region rendering. The analyses themselves live in
//! [`drivers`], one subcommand each.

pub mod config;
pub mod couplings;
pub mod drivers;
pub mod error;
pub mod likelihood;
pub mod loopamp;
pub mod minimize;
pub mod plot;
pub mod scan;
pub mod sm;
pub mod solver;
pub mod stu;
