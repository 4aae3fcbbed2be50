use crate::cli::EvalArgs;
use crate::config::{AppConfig, build_eval_config};
use crate::error::{CliError, Result};
use crate::io;
use crate::utils::progress::CliProgressHandler;
use coulong::{
    core::forcefield::scale::ScaleMatrix,
    engine::{error::EngineError, progress::ProgressReporter},
    workflows::evaluate::{self, EvaluationConfig, EvaluationReport},
};
use tracing::{info, warn};

/// Runs the evaluation; `quiet` also hides the progress display.
pub fn run(args: EvalArgs, threads: Option<usize>, quiet: bool) -> Result<()> {
    info!("Merging configuration from file and CLI arguments...");
    let config = build_eval_config(&args, threads)?;

    let mut store = io::read_particles(&config.particles_path)?;
    if store.is_empty() {
        warn!("Particle file {:?} contains no particles.", config.particles_path);
    }
    let bonds = match &config.bonds_path {
        Some(path) => io::read_bonds(path)?,
        None => Vec::new(),
    };

    let scale = scale_for(&config, store.ntypes())?;
    let eval_config = EvaluationConfig {
        settings: config.settings.clone(),
        scale,
        request: config.request,
        skin: config.skin,
        passes: config.passes,
    };

    let progress_handler = if quiet {
        CliProgressHandler::hidden()
    } else {
        CliProgressHandler::new()
    };
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!(
        "Evaluating {} particle(s) ({} ghost) for {} pass(es)...",
        store.nall(),
        store.nghost(),
        config.passes
    );
    let report = evaluate::run(&mut store, &bonds, &eval_config, &reporter)?;
    print_summary(&report);

    if let Some(path) = &config.output_path {
        io::write_forces(path, store.forces(), &report.eatom)?;
        println!("✓ Forces written to: {}", path.display());
    }
    Ok(())
}

fn scale_for(config: &AppConfig, ntypes: usize) -> Result<ScaleMatrix> {
    let ntypes = ntypes.max(1);
    match &config.params {
        Some(params) => params
            .scale_matrix(ntypes)
            .map_err(|e| CliError::Core(EngineError::from(e))),
        None => Ok(ScaleMatrix::new(ntypes)),
    }
}

fn print_summary(report: &EvaluationReport) {
    let [xx, yy, zz, xy, xz, yz] = report.totals.virial;
    println!(
        "Workers: {}    neighbor pairs: {}",
        report.nthreads, report.neighbor_pairs
    );
    println!("Coulomb energy: {:.8}", report.totals.ecoul);
    println!(
        "Virial (xx yy zz xy xz yz): {:.6} {:.6} {:.6} {:.6} {:.6} {:.6}",
        xx, yy, zz, xy, xz, yz
    );
    if report.pass_energies.len() > 1 {
        let drift = report
            .pass_energies
            .iter()
            .map(|e| (e - report.totals.ecoul).abs())
            .fold(0.0, f64::max);
        println!(
            "Passes: {}    max energy deviation from final pass: {:.3e}",
            report.pass_energies.len(),
            drift
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::NewtonOverride;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn args(dir: &std::path::Path, output: Option<PathBuf>) -> EvalArgs {
        EvalArgs {
            config: dir.join("run.toml"),
            particles: dir.join("particles.csv"),
            bonds: Some(dir.join("bonds.csv")),
            output,
            params: None,
            passes: Some(2),
            skin: None,
            no_table: false,
            newton: NewtonOverride {
                newton: false,
                no_newton: false,
            },
            per_atom: true,
        }
    }

    fn write_inputs(dir: &std::path::Path) {
        fs::write(
            dir.join("run.toml"),
            "[coulomb]\ncutoff = 8.0\ng-ewald = 0.3\n\n[evaluation]\nvirial = \"fdotr\"\n",
        )
        .unwrap();
        fs::write(
            dir.join("particles.csv"),
            "x,y,z,charge,type\n\
             0.0,0.0,0.0,-0.834,0\n\
             0.9572,0.0,0.0,0.417,1\n\
             -0.24,0.927,0.0,0.417,1\n\
             3.1,0.2,-0.4,-0.834,0\n\
             4.0572,0.2,-0.4,0.417,1\n",
        )
        .unwrap();
        fs::write(dir.join("bonds.csv"), "i,j\n0,1\n0,2\n3,4\n").unwrap();
    }

    #[test]
    fn eval_writes_forces_that_sum_to_zero() {
        let dir = tempdir().unwrap();
        write_inputs(dir.path());
        let output = dir.path().join("forces.csv");

        run(args(dir.path(), Some(output.clone())), Some(2), true).unwrap();

        let mut reader = csv::Reader::from_path(&output).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(
            headers.iter().collect::<Vec<_>>(),
            vec!["index", "fx", "fy", "fz", "energy"]
        );
        let mut net = [0.0f64; 3];
        let mut rows = 0;
        for record in reader.records() {
            let record = record.unwrap();
            for (axis, total) in net.iter_mut().enumerate() {
                *total += record[axis + 1].parse::<f64>().unwrap();
            }
            rows += 1;
        }
        assert_eq!(rows, 5);
        assert!(net.iter().all(|f| f.abs() < 1e-9), "net force {:?}", net);
    }

    #[test]
    fn eval_reports_missing_particle_file() {
        let dir = tempdir().unwrap();
        write_inputs(dir.path());
        fs::remove_file(dir.path().join("particles.csv")).unwrap();

        assert!(matches!(
            run(args(dir.path(), None), Some(1), true),
            Err(CliError::FileParsing { .. })
        ));
    }

    #[test]
    fn scale_covers_at_least_one_type() {
        let dir = tempdir().unwrap();
        write_inputs(dir.path());
        let config = build_eval_config(&args(dir.path(), None), None).unwrap();
        assert_eq!(scale_for(&config, 0).unwrap().ntypes(), 1);
        assert_eq!(scale_for(&config, 3).unwrap().ntypes(), 3);
    }
}
