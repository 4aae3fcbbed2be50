//! # Core Module
//!
//! Stateless building blocks consumed by the evaluation engine.
//!
//! - **Particle and neighbor data** ([`models`]) - the particle store with its local
//!   and ghost ranges, bonded-exclusion classification and the packed neighbor list
//! - **Interaction mathematics** ([`forcefield`]) - the analytic screening function,
//!   the interpolation table, the per-type scale matrix and parameter file loading
//!
//! Nothing in this module spawns threads or holds evaluation state; the
//! [`crate::engine`] layer owns both.

pub mod forcefield;
pub mod models;
