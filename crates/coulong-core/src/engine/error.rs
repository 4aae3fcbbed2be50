use thiserror::Error;

use super::config::ConfigError;
use crate::core::forcefield::params::ParamLoadError;
use crate::core::forcefield::scale::ScaleError;
use crate::core::forcefield::table::TableError;
use crate::core::models::neighbor::NeighborError;
use crate::core::models::particles::ParticleError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Configuration error: {source}")]
    Config {
        #[from]
        source: ConfigError,
    },

    #[error("Interpolation table error: {source}")]
    Table {
        #[from]
        source: TableError,
    },

    #[error("Neighbor list error: {source}")]
    Neighbor {
        #[from]
        source: NeighborError,
    },

    #[error("Particle data error: {source}")]
    Particles {
        #[from]
        source: ParticleError,
    },

    #[error("Scale matrix error: {source}")]
    Scale {
        #[from]
        source: ScaleError,
    },

    #[error("Parameter file error: {source}")]
    Params {
        #[from]
        source: ParamLoadError,
    },

    #[error("Failed to build worker thread pool: {0}")]
    ThreadPool(String),

    #[error("Neighbor list was built for {list} particles but the store holds {store}")]
    ParticleCountMismatch { list: usize, store: usize },

    #[error("Neighbor list position {ii} refers to particle {index}, which is not local (nlocal = {nlocal})")]
    NotLocal {
        ii: usize,
        index: usize,
        nlocal: usize,
    },

    #[error("Particle {index} has type {type_id} but only {ntypes} type(s) are configured")]
    TypeOutOfRange {
        index: usize,
        type_id: usize,
        ntypes: usize,
    },
}
