use nalgebra::{Point3, Vector3};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParticleError {
    #[error("Local particle cannot be added after {nghost} ghost particle(s)")]
    LocalAfterGhost { nghost: usize },
    #[error("Particle store has {positions} positions but {charges} charges and {types} types")]
    LengthMismatch {
        positions: usize,
        charges: usize,
        types: usize,
    },
    #[error("Particle store declares {nlocal} local particles but holds only {nall}")]
    LocalCountTooLarge { nlocal: usize, nall: usize },
}

/// Read-only view of particle data shared by all worker threads during a pass.
#[derive(Debug, Clone, Copy)]
pub struct ParticleView<'a> {
    pub positions: &'a [Point3<f64>],
    pub charges: &'a [f64],
    pub types: &'a [usize],
    pub nlocal: usize,
}

/// Particle data for one evaluation: `nlocal` owned particles followed by
/// `nghost` images of particles owned elsewhere.
///
/// Forces are accumulated, never overwritten, by the evaluation engine.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParticleStore {
    positions: Vec<Point3<f64>>,
    charges: Vec<f64>,
    types: Vec<usize>,
    forces: Vec<Vector3<f64>>,
    nlocal: usize,
}

impl ParticleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store of `nlocal` local particles followed by ghosts from parallel arrays.
    pub fn from_parts(
        positions: Vec<Point3<f64>>,
        charges: Vec<f64>,
        types: Vec<usize>,
        nlocal: usize,
    ) -> Result<Self, ParticleError> {
        if positions.len() != charges.len() || positions.len() != types.len() {
            return Err(ParticleError::LengthMismatch {
                positions: positions.len(),
                charges: charges.len(),
                types: types.len(),
            });
        }
        if nlocal > positions.len() {
            return Err(ParticleError::LocalCountTooLarge {
                nlocal,
                nall: positions.len(),
            });
        }
        let forces = vec![Vector3::zeros(); positions.len()];
        Ok(Self {
            positions,
            charges,
            types,
            forces,
            nlocal,
        })
    }

    /// Appends a locally owned particle and returns its index.
    pub fn add_local(
        &mut self,
        position: Point3<f64>,
        charge: f64,
        type_id: usize,
    ) -> Result<usize, ParticleError> {
        if self.nghost() > 0 {
            return Err(ParticleError::LocalAfterGhost {
                nghost: self.nghost(),
            });
        }
        self.nlocal += 1;
        Ok(self.push(position, charge, type_id))
    }

    /// Appends a ghost image and returns its index.
    pub fn add_ghost(&mut self, position: Point3<f64>, charge: f64, type_id: usize) -> usize {
        self.push(position, charge, type_id)
    }

    fn push(&mut self, position: Point3<f64>, charge: f64, type_id: usize) -> usize {
        self.positions.push(position);
        self.charges.push(charge);
        self.types.push(type_id);
        self.forces.push(Vector3::zeros());
        self.positions.len() - 1
    }

    #[inline]
    pub fn nlocal(&self) -> usize {
        self.nlocal
    }

    #[inline]
    pub fn nghost(&self) -> usize {
        self.positions.len() - self.nlocal
    }

    #[inline]
    pub fn nall(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn positions(&self) -> &[Point3<f64>] {
        &self.positions
    }

    pub fn charges(&self) -> &[f64] {
        &self.charges
    }

    pub fn types(&self) -> &[usize] {
        &self.types
    }

    pub fn forces(&self) -> &[Vector3<f64>] {
        &self.forces
    }

    pub fn forces_mut(&mut self) -> &mut [Vector3<f64>] {
        &mut self.forces
    }

    pub fn clear_forces(&mut self) {
        self.forces.fill(Vector3::zeros());
    }

    /// Number of particle types referenced, i.e. the largest type id plus one.
    pub fn ntypes(&self) -> usize {
        self.types.iter().max().map_or(0, |&t| t + 1)
    }

    /// Splits the store into the shared read-only view and the force array.
    pub fn split_for_eval(&mut self) -> (ParticleView<'_>, &mut [Vector3<f64>]) {
        let view = ParticleView {
            positions: &self.positions,
            charges: &self.charges,
            types: &self.types,
            nlocal: self.nlocal,
        };
        (view, &mut self.forces)
    }
}
