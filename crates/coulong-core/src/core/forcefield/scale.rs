use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ScaleError {
    #[error("Type pair ({i}, {j}) is out of range for {ntypes} particle types")]
    TypeOutOfRange { i: usize, j: usize, ntypes: usize },
    #[error("Scale factor for type pair ({i}, {j}) must be finite, got {value}")]
    NonFinite { i: usize, j: usize, value: f64 },
}

/// Symmetric per-type-pair multiplier applied to the Coulomb prefactor.
///
/// Types are 0-based. Every entry starts at `1.0`; changing an entry through
/// [`set`](Self::set) updates both `(i, j)` and `(j, i)`.
#[derive(Debug, Clone, PartialEq)]
pub struct ScaleMatrix {
    ntypes: usize,
    values: Vec<f64>,
}

impl ScaleMatrix {
    pub fn new(ntypes: usize) -> Self {
        Self {
            ntypes,
            values: vec![1.0; ntypes * ntypes],
        }
    }

    pub fn ntypes(&self) -> usize {
        self.ntypes
    }

    #[inline]
    pub fn get(&self, itype: usize, jtype: usize) -> f64 {
        self.values[itype * self.ntypes + jtype]
    }

    pub fn set(&mut self, i: usize, j: usize, value: f64) -> Result<(), ScaleError> {
        if i >= self.ntypes || j >= self.ntypes {
            return Err(ScaleError::TypeOutOfRange {
                i,
                j,
                ntypes: self.ntypes,
            });
        }
        if !value.is_finite() {
            return Err(ScaleError::NonFinite { i, j, value });
        }
        self.values[i * self.ntypes + j] = value;
        self.values[j * self.ntypes + i] = value;
        Ok(())
    }

    /// Returns `true` when every type pair uses the unscaled prefactor.
    pub fn is_uniform(&self) -> bool {
        self.values.iter().all(|&v| v == 1.0)
    }
}
