use coulong::core::forcefield::params::CoulombParams;
use coulong::engine::config::CoulLongSettings;
use coulong::engine::request::EvalRequest;
use std::path::PathBuf;

pub struct AppConfig {
    pub particles_path: PathBuf,
    pub bonds_path: Option<PathBuf>,
    pub output_path: Option<PathBuf>,
    pub settings: CoulLongSettings,
    /// Loaded parameter file; its scale entries are applied once the type count is known.
    pub params: Option<CoulombParams>,
    pub request: EvalRequest,
    pub skin: f64,
    pub passes: usize,
}

pub struct TableConfig {
    pub settings: CoulLongSettings,
    pub samples: usize,
}
