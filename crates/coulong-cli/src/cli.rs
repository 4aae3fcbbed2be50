use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "Tony Kan, Ted Yu, William A. Goddard III, Victor Wai Tak Kam",
    version,
    about = "COULONG CLI - evaluates real-space Ewald Coulomb forces, energies and virials of particle configurations.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Set the number of worker threads for the pair loop.
    /// Defaults to the number of available logical cores.
    #[arg(short = 'j', long, global = true, value_name = "NUM")]
    pub threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Evaluate forces, energy and virial of a particle configuration.
    Eval(EvalArgs),
    /// Inspect the interpolation table layout and its accuracy against direct evaluation.
    Table(TableArgs),
}

/// Arguments for the `eval` subcommand.
#[derive(Args, Debug)]
pub struct EvalArgs {
    // --- Core Arguments ---
    /// Path to the run configuration file in TOML format.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub config: PathBuf,

    /// Path to the particle CSV file (columns: x, y, z, charge, type[, ghost]).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub particles: PathBuf,

    /// Path to an optional bond CSV file (columns: i, j).
    #[arg(short, long, value_name = "PATH")]
    pub bonds: Option<PathBuf>,

    /// Path for the per-particle force CSV output.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    // --- Overrides ---
    /// Override the Coulomb parameter file from the config file.
    #[arg(long, value_name = "PATH")]
    pub params: Option<PathBuf>,

    /// Override the number of evaluation passes.
    #[arg(short = 'n', long, value_name = "INT")]
    pub passes: Option<usize>,

    /// Override the neighbor skin distance.
    #[arg(long, value_name = "FLOAT")]
    pub skin: Option<f64>,

    /// Evaluate every pair directly, disabling the interpolation table.
    #[arg(long)]
    pub no_table: bool,

    /// Override `coulomb.newton-pair` from the config file.
    #[command(flatten)]
    pub newton: NewtonOverride,

    /// Also compute per-particle energies and virials.
    #[arg(long)]
    pub per_atom: bool,
}

/// A group to handle mutually exclusive flags for Newton's third law.
#[derive(Args, Debug, Clone, Copy)]
#[group(required = false, multiple = false)]
pub struct NewtonOverride {
    /// Apply forces to both partners of every listed pair.
    #[arg(long)]
    pub newton: bool,
    /// Apply forces only to locally owned partners.
    #[arg(long)]
    pub no_newton: bool,
}

impl NewtonOverride {
    pub fn resolve(self) -> Option<bool> {
        match (self.newton, self.no_newton) {
            (true, false) => Some(true),
            (false, true) => Some(false),
            _ => None,
        }
    }
}

/// Arguments for the `table` subcommand.
#[derive(Args, Debug)]
pub struct TableArgs {
    /// Read cutoff, splitting parameter and table settings from a run configuration.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Coulomb cutoff distance.
    #[arg(long, value_name = "FLOAT")]
    pub cutoff: Option<f64>,

    /// Ewald splitting parameter.
    #[arg(long, value_name = "FLOAT")]
    pub g_ewald: Option<f64>,

    /// Number of table index bits.
    #[arg(long, value_name = "INT")]
    pub bits: Option<u32>,

    /// Inner table cutoff distance.
    #[arg(long, value_name = "FLOAT")]
    pub inner: Option<f64>,

    /// Number of distances sampled between the inner cutoff and the cutoff.
    #[arg(long, default_value_t = 200, value_name = "INT")]
    pub samples: usize,
}
