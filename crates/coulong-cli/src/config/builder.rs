use super::defaults::DefaultsConfig;
use super::file::{FileConfig, FileCoulombConfig};
use super::models::{AppConfig, TableConfig};
use crate::cli::{EvalArgs, TableArgs};
use crate::error::{CliError, Result};
use coulong::core::forcefield::params::CoulombParams;
use coulong::engine::config::{CoulLongSettings, CoulLongSettingsBuilder};
use coulong::engine::error::EngineError;
use coulong::engine::request::{EvalRequest, VirialMode};
use std::path::Path;
use tracing::debug;

pub fn build_eval_config(args: &EvalArgs, threads: Option<usize>) -> Result<AppConfig> {
    let defaults = DefaultsConfig::default();
    let mut file_config = FileConfig::from_file(&args.config)?;

    let coulomb_file = file_config.coulomb.take().unwrap_or_default();
    let neighbor_file = file_config.neighbor.take().unwrap_or_default();
    let eval_file = file_config.evaluation.take().unwrap_or_default();

    let params_path = args.params.as_deref().or(coulomb_file.params.as_deref());
    let params = params_path.map(load_params).transpose()?;

    let newton_pair = args
        .newton
        .resolve()
        .or(coulomb_file.newton_pair)
        .unwrap_or(defaults.newton_pair);
    let table_bits = if args.no_table {
        0
    } else {
        coulomb_file.table_bits.unwrap_or(defaults.table_bits)
    };

    let settings = settings_builder(&coulomb_file, &defaults, params.as_ref())
        .newton_pair(newton_pair)
        .table_bits(table_bits);
    let settings = match threads {
        Some(n) => settings.threads(n),
        None => settings,
    };
    let settings = finish(settings)?;

    let skin = args
        .skin
        .or(neighbor_file.skin)
        .unwrap_or(defaults.skin);
    if !skin.is_finite() || skin < 0.0 {
        return Err(CliError::Argument(format!(
            "neighbor skin must be non-negative, got {}",
            skin
        )));
    }

    let passes = args
        .passes
        .or(eval_file.passes)
        .unwrap_or(defaults.passes);
    if passes == 0 {
        return Err(CliError::Argument(
            "at least one evaluation pass is required".to_string(),
        ));
    }

    let per_atom = args.per_atom || eval_file.per_atom.unwrap_or(defaults.per_atom);
    let virial: VirialMode = eval_file.virial.unwrap_or_default().into();
    let request = EvalRequest {
        energy: eval_file.energy.unwrap_or(defaults.energy),
        energy_per_atom: per_atom,
        virial,
        virial_per_atom: per_atom,
    };

    debug!(?settings, ?request, skin, passes, "Resolved evaluation configuration.");
    Ok(AppConfig {
        particles_path: args.particles.clone(),
        bonds_path: args.bonds.clone(),
        output_path: args.output.clone(),
        settings,
        params,
        request,
        skin,
        passes,
    })
}

pub fn build_table_config(args: &TableArgs) -> Result<TableConfig> {
    let defaults = DefaultsConfig::default();
    let mut file_config = match &args.config {
        Some(path) => FileConfig::from_file(path)?,
        None => FileConfig::default(),
    };

    let mut coulomb_file = file_config.coulomb.take().unwrap_or_default();
    coulomb_file.cutoff = args.cutoff.or(coulomb_file.cutoff);
    coulomb_file.g_ewald = args.g_ewald.or(coulomb_file.g_ewald);
    coulomb_file.table_bits = args.bits.or(coulomb_file.table_bits);
    coulomb_file.table_inner = args.inner.or(coulomb_file.table_inner);

    if coulomb_file.table_bits == Some(0) {
        return Err(CliError::Argument(
            "the table command needs a non-zero number of table bits".to_string(),
        ));
    }
    if args.samples == 0 {
        return Err(CliError::Argument(
            "at least one sample distance is required".to_string(),
        ));
    }

    let params = coulomb_file
        .params
        .as_deref()
        .map(load_params)
        .transpose()?;
    let settings = finish(settings_builder(&coulomb_file, &defaults, params.as_ref()))?;

    Ok(TableConfig {
        settings,
        samples: args.samples,
    })
}

fn settings_builder(
    coulomb: &FileCoulombConfig,
    defaults: &DefaultsConfig,
    params: Option<&CoulombParams>,
) -> CoulLongSettingsBuilder {
    let mut builder = CoulLongSettingsBuilder::new()
        .table_bits(coulomb.table_bits.unwrap_or(defaults.table_bits))
        .table_inner(coulomb.table_inner.unwrap_or(defaults.table_inner))
        .newton_pair(coulomb.newton_pair.unwrap_or(defaults.newton_pair));
    if let Some(cutoff) = coulomb.cutoff {
        builder = builder.cutoff(cutoff);
    }
    if let Some(g_ewald) = coulomb.g_ewald {
        builder = builder.g_ewald(g_ewald);
    }
    if let Some(params) = params {
        builder = builder.with_params(params);
    }
    builder
}

fn finish(builder: CoulLongSettingsBuilder) -> Result<CoulLongSettings> {
    builder.build().map_err(|e| CliError::Config(e.to_string()))
}

fn load_params(path: &Path) -> Result<CoulombParams> {
    debug!("Loading Coulomb parameters from {:?}", path);
    CoulombParams::load(path).map_err(|e| CliError::Core(EngineError::from(e)))
}
