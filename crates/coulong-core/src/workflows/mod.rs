//! # Workflows Module
//!
//! High-level entry points that drive the engine end to end.
//!
//! ## Overview
//!
//! A workflow takes raw particle data and a run configuration, prepares every
//! collaborator the engine needs (exclusion classes, the half neighbor list,
//! the interpolation table and the worker pool) and then runs one or more
//! evaluation passes while reporting progress through a
//! [`ProgressReporter`](crate::engine::progress::ProgressReporter).
//!
//! - **Evaluation Workflow** ([`evaluate`]) - forces, energy and virial of a
//!   particle configuration over a fixed number of passes.

pub mod evaluate;
