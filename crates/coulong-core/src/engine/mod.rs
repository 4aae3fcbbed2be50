//! # Engine Module
//!
//! The stateful side of the library: everything needed to run an evaluation
//! pass of the real-space Coulomb interaction over a particle store and its
//! neighbor list.
//!
//! ## Overview
//!
//! A [`coul_long::CoulLong`] engine is built once from validated
//! [`config::CoulLongSettings`] and a per-type scale matrix. It owns the
//! interpolation table, a fixed pool of worker threads and one set of private
//! buffers per worker. Every pass runs in three steps:
//!
//! 1. The request is resolved into per-pass flags and one of six compiled pair
//!    loops is selected.
//! 2. Each worker evaluates a contiguous slice of the neighbor list into its
//!    own force buffer and energy/virial accumulators.
//! 3. The reduction stage adds every worker's buffers into the shared force
//!    array and folds the accumulators into the pass totals.
//!
//! ## Submodules
//!
//! - **Configuration** ([`config`]) - settings and their builder
//! - **Requests** ([`request`]) - which energies and virials a pass computes
//! - **Accumulators** ([`tally`]) - energy and virial sums
//! - **Progress Monitoring** ([`progress`]) - callbacks for long-running workflows
//! - **Error Handling** ([`error`]) - engine-level error aggregation

pub mod config;
pub mod coul_long;
pub mod error;
pub(crate) mod executor;
pub mod kernel;
pub(crate) mod reduction;
pub mod progress;
pub mod request;
pub mod tally;
