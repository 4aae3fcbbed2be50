use crate::error::{CliError, Result};
use coulong::engine::request::VirialMode;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Deserialize, Debug, Default, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FileVirialMode {
    None,
    #[default]
    Pairwise,
    Fdotr,
}

impl From<FileVirialMode> for VirialMode {
    fn from(mode: FileVirialMode) -> Self {
        match mode {
            FileVirialMode::None => VirialMode::None,
            FileVirialMode::Pairwise => VirialMode::Pairwise,
            FileVirialMode::Fdotr => VirialMode::FdotR,
        }
    }
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileCoulombConfig {
    pub cutoff: Option<f64>,
    pub g_ewald: Option<f64>,
    /// Coulomb parameter file, relative to the run configuration.
    pub params: Option<PathBuf>,
    pub table_bits: Option<u32>,
    pub table_inner: Option<f64>,
    pub newton_pair: Option<bool>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileNeighborConfig {
    pub skin: Option<f64>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileEvaluationConfig {
    pub passes: Option<usize>,
    pub energy: Option<bool>,
    pub virial: Option<FileVirialMode>,
    pub per_atom: Option<bool>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileConfig {
    pub coulomb: Option<FileCoulombConfig>,
    pub neighbor: Option<FileNeighborConfig>,
    pub evaluation: Option<FileEvaluationConfig>,
}

impl FileConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        let mut config: FileConfig =
            toml::from_str(&content).map_err(|e| CliError::FileParsing {
                path: path.to_path_buf(),
                source: e.into(),
            })?;

        if let (Some(base), Some(coulomb)) = (path.parent(), config.coulomb.as_mut()) {
            if let Some(params) = coulomb.params.as_mut() {
                if params.is_relative() {
                    *params = base.join(&*params);
                }
            }
        }
        Ok(config)
    }
}
