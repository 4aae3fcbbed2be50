use crate::core::forcefield::scale::ScaleMatrix;
use crate::core::models::neighbor::NeighborList;
use crate::core::models::particles::ParticleStore;
use crate::core::models::special::SpecialBonds;
use crate::engine::config::{ConfigError, CoulLongSettings};
use crate::engine::coul_long::CoulLong;
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::request::EvalRequest;
use crate::engine::tally::EnergyVirial;
use tracing::{info, instrument};

#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationConfig {
    pub settings: CoulLongSettings,
    pub scale: ScaleMatrix,
    pub request: EvalRequest,
    /// Extra neighbor search distance beyond the cutoff.
    pub skin: f64,
    pub passes: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationReport {
    /// Energy and virial of the final pass.
    pub totals: EnergyVirial,
    pub pass_energies: Vec<f64>,
    pub eatom: Vec<f64>,
    pub vatom: Vec<[f64; 6]>,
    pub neighbor_pairs: usize,
    pub nthreads: usize,
}

/// Evaluates the Coulomb interaction of `store` for `config.passes` passes.
///
/// Forces in `store` are cleared before every pass, so on return they hold
/// the forces of the final pass only.
#[instrument(skip_all, name = "evaluation_workflow")]
pub fn run(
    store: &mut ParticleStore,
    bonds: &[(usize, usize)],
    config: &EvaluationConfig,
    reporter: &ProgressReporter,
) -> Result<EvaluationReport, EngineError> {
    if config.passes == 0 {
        return Err(ConfigError::InvalidParameter {
            name: "passes",
            reason: "at least one pass is required".to_string(),
        }
        .into());
    }

    reporter.report(Progress::PhaseStart {
        name: "Preparation",
    });
    info!(
        nlocal = store.nlocal(),
        nghost = store.nghost(),
        bonds = bonds.len(),
        "Preparing evaluation."
    );
    let special = SpecialBonds::from_bonds(store.nall(), bonds)?;
    let list = NeighborList::build_half(store, config.settings.cutoff, config.skin, &special)?;
    let mut engine = CoulLong::new(config.settings.clone(), config.scale.clone())?;
    reporter.report(Progress::PhaseFinish);

    reporter.report(Progress::PassesStart {
        total: config.passes as u64,
    });
    let mut pass_energies = Vec::with_capacity(config.passes);
    let mut totals = EnergyVirial::default();
    for index in 0..config.passes {
        store.clear_forces();
        totals = engine.evaluate(store, &list, config.request)?;
        pass_energies.push(totals.ecoul);
        reporter.report(Progress::PassFinish {
            index,
            ecoul: totals.ecoul,
        });
    }
    reporter.report(Progress::PassesFinish);

    info!(
        passes = config.passes,
        ecoul = totals.ecoul,
        npairs = list.npairs(),
        "Evaluation complete."
    );
    Ok(EvaluationReport {
        totals,
        pass_energies,
        eatom: engine.eatom().to_vec(),
        vatom: engine.vatom().to_vec(),
        neighbor_pairs: list.npairs(),
        nthreads: engine.nthreads(),
    })
}
