//! # Models Module
//!
//! Data structures describing what the kernel evaluates.
//!
//! - [`particles`] - positions, charges, types and the shared force array, split into a
//!   locally owned range followed by ghost images
//! - [`special`] - bonded-neighbor exclusion classes (1-2, 1-3, 1-4) derived from a bond list
//! - [`neighbor`] - the packed half neighbor list, with exclusion classes stored in the
//!   two high bits of each 32-bit entry, and a reference builder
//!
//! The engine only reads these structures during an evaluation pass; forces are
//! the single field it writes, and only after all worker threads have finished.

pub mod neighbor;
pub mod particles;
pub mod special;
