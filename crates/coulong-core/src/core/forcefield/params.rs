use super::scale::{ScaleError, ScaleMatrix};
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

/// Coulomb conversion constant `e²/(4πε₀)` in kcal·Å/(mol·e²).
pub const COULOMB_CONSTANT_REAL: f64 = 332.06371;

fn default_coulomb_constant() -> f64 {
    COULOMB_CONSTANT_REAL
}

fn default_dielectric() -> f64 {
    1.0
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct GlobalParams {
    #[serde(default = "default_coulomb_constant")]
    pub coulomb_constant: f64,
    #[serde(default = "default_dielectric")]
    pub dielectric: f64,
    pub ntypes: usize,
}

/// Coulomb weights for 1-2, 1-3 and 1-4 bonded neighbors.
#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct SpecialParams {
    pub coul: [f64; 3],
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ScaleEntry {
    pub types: [usize; 2],
    pub value: f64,
}

/// Contents of a Coulomb parameter file.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct CoulombParams {
    pub globals: GlobalParams,
    #[serde(default)]
    pub special: SpecialParams,
    #[serde(default)]
    pub scale: Vec<ScaleEntry>,
}

#[derive(Debug, Error)]
pub enum ParamLoadError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("TOML parsing error for '{path}': {source}")]
    Toml {
        path: String,
        source: toml::de::Error,
    },
    #[error("Invalid scale entry: {0}")]
    Scale(#[from] ScaleError),
}

impl CoulombParams {
    pub fn load(path: &Path) -> Result<Self, ParamLoadError> {
        let content = std::fs::read_to_string(path).map_err(|e| ParamLoadError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ParamLoadError::Toml {
            path: path.to_string_lossy().to_string(),
            source: e,
        })
    }

    /// Builds the scale matrix for at least `ntypes` types.
    ///
    /// The matrix covers `max(ntypes, globals.ntypes)` types so that particle
    /// data may use types the file does not mention.
    pub fn scale_matrix(&self, ntypes: usize) -> Result<ScaleMatrix, ParamLoadError> {
        let mut matrix = ScaleMatrix::new(ntypes.max(self.globals.ntypes));
        for entry in &self.scale {
            matrix.set(entry.types[0], entry.types[1], entry.value)?;
        }
        Ok(matrix)
    }
}
