use crate::cli::TableArgs;
use crate::config::build_table_config;
use crate::error::{CliError, Result};
use coulong::core::forcefield::scale::ScaleMatrix;
use coulong::engine::coul_long::CoulLong;
use tracing::info;

/// Worst relative deviations of the tabulated regime from direct evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TableAccuracy {
    pub max_force_error: f64,
    pub max_energy_error: f64,
    /// Distance at which the largest force error occurred.
    pub worst_force_r: f64,
}

pub fn run(args: TableArgs) -> Result<()> {
    let config = build_table_config(&args)?;
    let mut direct_settings = config.settings.clone();
    direct_settings.table = None;
    direct_settings.threads = Some(1);
    let mut tabulated_settings = config.settings;
    tabulated_settings.threads = Some(1);

    let tabulated = CoulLong::new(tabulated_settings, ScaleMatrix::new(1))?;
    let direct = CoulLong::new(direct_settings, ScaleMatrix::new(1))?;

    let table = tabulated.table().ok_or_else(|| {
        CliError::Argument(
            "the table inner cutoff must be below the Coulomb cutoff".to_string(),
        )
    })?;
    let bitmap = table.bitmap();
    println!("Table layout:");
    println!("  index bits:   {}", bitmap.bits);
    println!("  shift:        {}", bitmap.shift);
    println!("  mask:         {:#010x}", bitmap.mask);
    println!("  mask range:   {:#010x} .. {:#010x}", bitmap.mask_lo, bitmap.mask_hi);
    println!("  buckets:      {}", bitmap.buckets());
    println!("  inner r²:     {:.6}", table.inner_rsq());

    let accuracy = sample_accuracy(&tabulated, &direct, args.samples)?;
    info!(?accuracy, "Sampled table accuracy.");
    println!("Accuracy over {} sample(s):", args.samples);
    println!(
        "  max relative force error:  {:.3e} (at r = {:.4})",
        accuracy.max_force_error, accuracy.worst_force_r
    );
    println!("  max relative energy error: {:.3e}", accuracy.max_energy_error);
    Ok(())
}

/// Compares both engines for unit charges at `samples` distances strictly
/// between the table inner cutoff of `tabulated` (zero if it has no table)
/// and the Coulomb cutoff.
pub fn sample_accuracy(
    tabulated: &CoulLong,
    direct: &CoulLong,
    samples: usize,
) -> Result<TableAccuracy> {
    let cutoff = tabulated.settings().cutoff;
    let inner = tabulated
        .table()
        .map_or(0.0, |t| t.inner_rsq().sqrt());

    let mut accuracy = TableAccuracy {
        max_force_error: 0.0,
        max_energy_error: 0.0,
        worst_force_r: inner,
    };
    for k in 0..samples {
        let r = inner + (cutoff - inner) * (k as f64 + 0.5) / samples as f64;
        let rsq = r * r;
        let (Some(t), Some(d)) = (
            tabulated.single(1.0, 1.0, 0, 0, rsq, 1.0)?,
            direct.single(1.0, 1.0, 0, 0, rsq, 1.0)?,
        ) else {
            continue;
        };
        let force_error = relative(t.fpair, d.fpair);
        if force_error > accuracy.max_force_error {
            accuracy.max_force_error = force_error;
            accuracy.worst_force_r = r;
        }
        accuracy.max_energy_error = accuracy.max_energy_error.max(relative(t.ecoul, d.ecoul));
    }
    Ok(accuracy)
}

fn relative(value: f64, reference: f64) -> f64 {
    if reference == 0.0 {
        value.abs()
    } else {
        ((value - reference) / reference).abs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coulong::engine::config::CoulLongSettingsBuilder;

    fn engine(bits: u32) -> CoulLong {
        let settings = CoulLongSettingsBuilder::new()
            .cutoff(6.0)
            .g_ewald(0.3)
            .table_bits(bits)
            .threads(1)
            .build()
            .unwrap();
        CoulLong::new(settings, ScaleMatrix::new(1)).unwrap()
    }

    #[test]
    fn default_table_tracks_direct_evaluation() {
        let accuracy = sample_accuracy(&engine(12), &engine(0), 100).unwrap();
        assert!(accuracy.max_force_error < 1e-3, "{:?}", accuracy);
        assert!(accuracy.max_energy_error < 1e-3, "{:?}", accuracy);
        assert!(accuracy.worst_force_r > 1.4 && accuracy.worst_force_r < 6.0);
    }

    #[test]
    fn identical_engines_have_zero_error() {
        let accuracy = sample_accuracy(&engine(0), &engine(0), 20).unwrap();
        assert_eq!(accuracy.max_force_error, 0.0);
        assert_eq!(accuracy.max_energy_error, 0.0);
    }

    #[test]
    fn run_rejects_inner_beyond_cutoff() {
        let args = TableArgs {
            config: None,
            cutoff: Some(2.0),
            g_ewald: Some(0.3),
            bits: Some(12),
            inner: Some(3.0),
            samples: 10,
        };
        assert!(matches!(run(args), Err(CliError::Argument(_))));
    }

    #[test]
    fn relative_error_handles_zero_reference() {
        assert_eq!(relative(0.5, 0.0), 0.5);
        assert!((relative(1.01, 1.0) - 0.01).abs() < 1e-12);
    }
}
