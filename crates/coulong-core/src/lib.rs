//! # COULONG Core Library
//!
//! A multi-threaded evaluation kernel for the real-space part of Ewald-split
//! electrostatics (the `coul/long` pair interaction). For every particle pair
//! inside the cutoff it computes a screened Coulomb force and energy, either
//! from a closed-form erfc approximation or from a bit-indexed interpolation
//! table, and accumulates forces, energy and virial across worker threads.
//!
//! ## Architectural Philosophy
//!
//! The library follows a three-layer layout:
//!
//! - **[`core`]: The Foundation.** Stateless data models (`ParticleStore`,
//!   `NeighborList`, `SpecialBonds`) and the pure mathematics of the interaction
//!   (`screening`, `table`, per-type `scale` factors, parameter files).
//!
//! - **[`engine`]: The Evaluation Core.** The stateful `CoulLong` engine: the
//!   pair kernel, the per-thread executor with its private force buffers, the
//!   energy/virial tally and the reduction stage that merges thread results.
//!
//! - **[`workflows`]: The Public API.** End-to-end runs that build the neighbor
//!   list, construct the engine and drive one or more evaluation passes while
//!   reporting progress.

pub mod core;
pub mod engine;
pub mod workflows;
