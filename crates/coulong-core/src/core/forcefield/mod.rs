//! # Force Field Module
//!
//! The mathematics of the real-space Ewald Coulomb interaction.
//!
//! ## Key Components
//!
//! - [`screening`] - rational-polynomial approximation of `erfc` used by the direct regime
//! - [`table`] - single-precision bit-indexed interpolation tables for force, energy and
//!   the exclusion correction
//! - [`scale`] - the symmetric per-type scale matrix applied to the Coulomb prefactor
//! - [`params`] - loading of Coulomb parameter files (constants, special factors, scales)
//!
//! The direct and tabulated regimes share one prefactor convention: the force
//! numerator returned for a pair is `F·r`, so multiplying it by `1/r²` and the
//! separation vector yields the Cartesian force.

pub mod params;
pub mod scale;
pub mod screening;
pub mod table;
