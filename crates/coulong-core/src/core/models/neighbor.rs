//! Packed half neighbor lists.
//!
//! Each neighbor entry is a `u32` whose low [`SBBITS`] bits hold the neighbor's
//! particle index and whose two high bits hold its [`ExclusionClass`]. Entries
//! are grouped per list position in a compressed-row layout.

use super::particles::ParticleStore;
use super::special::{ExclusionClass, SpecialBonds};
use kiddo::SquaredEuclidean;
use kiddo::float::kdtree::KdTree;
use nalgebra::Point3;
use thiserror::Error;
use tracing::{debug, instrument};

/// Number of low bits of a neighbor entry that hold the particle index.
pub const SBBITS: u32 = 30;
/// Mask extracting the particle index from a neighbor entry.
pub const NEIGHMASK: u32 = (1 << SBBITS) - 1;

/// Leaf size of the position tree. Lattice planes put many particles on one
/// coordinate value, and a leaf must be able to hold all of them.
const TREE_BUCKET: usize = 256;

type PositionTree = KdTree<f64, u64, 3, TREE_BUCKET, u32>;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum NeighborError {
    #[error("Particle index {0} does not fit in the 30-bit neighbor index field")]
    IndexOverflow(usize),
    #[error("Particle index {index} is out of range for {nall} particles")]
    IndexOutOfRange { index: usize, nall: usize },
    #[error("Bond connects particle {0} to itself")]
    SelfBond(usize),
    #[error("Special bond table covers {special} particles but the store holds {nall}")]
    SpecialSizeMismatch { special: usize, nall: usize },
    #[error("Neighbor search range must be positive and finite, got {0}")]
    InvalidRange(f64),
    #[error("{count} particles share one coordinate on axis {axis}; the position tree holds at most {limit}")]
    CoincidentCoordinates {
        axis: usize,
        count: usize,
        limit: usize,
    },
}

/// Packs a particle index and its exclusion class into one neighbor entry.
#[inline]
pub fn encode(index: usize, class: ExclusionClass) -> Result<u32, NeighborError> {
    if index > NEIGHMASK as usize {
        return Err(NeighborError::IndexOverflow(index));
    }
    Ok(index as u32 | ((class as u32) << SBBITS))
}

/// Exclusion class stored in the high bits of a neighbor entry.
#[inline]
pub fn sbmask(entry: u32) -> ExclusionClass {
    ExclusionClass::from_bits(entry >> SBBITS)
}

/// Splits a neighbor entry into particle index and exclusion class.
#[inline]
pub fn decode(entry: u32) -> (usize, ExclusionClass) {
    ((entry & NEIGHMASK) as usize, sbmask(entry))
}

/// Half neighbor list over a particle store.
///
/// Position `ii` of the list refers to particle `ilist()[ii]`; its neighbors
/// are [`neighbors(ii)`](Self::neighbors).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NeighborList {
    ilist: Vec<usize>,
    offsets: Vec<usize>,
    entries: Vec<u32>,
    nall: usize,
}

impl NeighborList {
    pub fn builder(nall: usize) -> NeighborListBuilder {
        NeighborListBuilder {
            list: NeighborList {
                ilist: Vec::new(),
                offsets: vec![0],
                entries: Vec::new(),
                nall,
            },
        }
    }

    /// Number of particles with a neighbor row.
    #[inline]
    pub fn inum(&self) -> usize {
        self.ilist.len()
    }

    /// Number of particles (local and ghost) the list was built for.
    #[inline]
    pub fn nall(&self) -> usize {
        self.nall
    }

    #[inline]
    pub fn ilist(&self) -> &[usize] {
        &self.ilist
    }

    /// Packed neighbor entries of list position `ii`.
    #[inline]
    pub fn neighbors(&self, ii: usize) -> &[u32] {
        &self.entries[self.offsets[ii]..self.offsets[ii + 1]]
    }

    /// Total number of stored pairs.
    pub fn npairs(&self) -> usize {
        self.entries.len()
    }

    /// Builds a half list for all pairs closer than `cutoff + skin`.
    ///
    /// Every local particle gets a row. Local-local pairs are stored once, on
    /// the lower index; pairs with a ghost are stored on the local side. Each
    /// entry carries the pair's exclusion class from `special`.
    #[instrument(skip_all, fields(nlocal = store.nlocal(), nghost = store.nghost()))]
    pub fn build_half(
        store: &ParticleStore,
        cutoff: f64,
        skin: f64,
        special: &SpecialBonds,
    ) -> Result<Self, NeighborError> {
        let range = cutoff + skin;
        if !(range.is_finite() && range > 0.0) {
            return Err(NeighborError::InvalidRange(range));
        }
        let nall = store.nall();
        let nlocal = store.nlocal();
        if special.len() != nall {
            return Err(NeighborError::SpecialSizeMismatch {
                special: special.len(),
                nall,
            });
        }
        if nall > NEIGHMASK as usize + 1 {
            return Err(NeighborError::IndexOverflow(nall - 1));
        }

        let positions = store.positions();
        check_coincident(positions)?;
        let mut tree = PositionTree::with_capacity(nall.max(1));
        for (j, p) in positions.iter().enumerate() {
            tree.add(&[p.x, p.y, p.z], j as u64);
        }
        let range_sq = range * range;

        let mut builder = Self::builder(nall);
        let mut row = Vec::new();
        for (i, xi) in positions.iter().enumerate().take(nlocal) {
            row.clear();
            row.extend(
                tree.within_unsorted::<SquaredEuclidean>(&[xi.x, xi.y, xi.z], range_sq)
                    .into_iter()
                    .map(|neighbour| neighbour.item as usize)
                    .filter(|&j| j != i && (j >= nlocal || j > i)),
            );
            row.sort_unstable();
            builder.push_row(i, row.iter().map(|&j| (j, special.class(i, j))))?;
        }

        let list = builder.build();
        debug!(
            inum = list.inum(),
            npairs = list.npairs(),
            range,
            "Built half neighbor list."
        );
        Ok(list)
    }
}

/// Rejects inputs where a tree leaf could fill up with particles that cannot be
/// separated along one axis.
fn check_coincident(positions: &[Point3<f64>]) -> Result<(), NeighborError> {
    let mut coords = Vec::with_capacity(positions.len());
    for axis in 0..3 {
        coords.clear();
        coords.extend(positions.iter().map(|p| p[axis]));
        coords.sort_unstable_by(f64::total_cmp);
        let count = coords
            .chunk_by(|a, b| a == b)
            .map(<[f64]>::len)
            .max()
            .unwrap_or(0);
        if count >= TREE_BUCKET {
            return Err(NeighborError::CoincidentCoordinates {
                axis,
                count,
                limit: TREE_BUCKET - 1,
            });
        }
    }
    Ok(())
}

/// Incremental construction of a [`NeighborList`], one row per particle.
#[derive(Debug)]
pub struct NeighborListBuilder {
    list: NeighborList,
}

impl NeighborListBuilder {
    pub fn push_row<I>(&mut self, i: usize, neighbors: I) -> Result<&mut Self, NeighborError>
    where
        I: IntoIterator<Item = (usize, ExclusionClass)>,
    {
        let nall = self.list.nall;
        if i >= nall {
            return Err(NeighborError::IndexOutOfRange { index: i, nall });
        }
        for (j, class) in neighbors {
            if j >= nall {
                self.list.entries.truncate(self.list.offsets[self.list.ilist.len()]);
                return Err(NeighborError::IndexOutOfRange { index: j, nall });
            }
            self.list.entries.push(encode(j, class)?);
        }
        self.list.ilist.push(i);
        self.list.offsets.push(self.list.entries.len());
        Ok(self)
    }

    pub fn build(self) -> NeighborList {
        self.list
    }
}
