use crate::core::forcefield::params::{COULOMB_CONSTANT_REAL, CoulombParams};
use thiserror::Error;

pub const DEFAULT_TABLE_BITS: u32 = 12;
pub const DEFAULT_TABLE_INNER: f64 = std::f64::consts::SQRT_2;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
    #[error("Invalid value for '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

/// Layout of the interpolation table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TableSpec {
    /// Number of bits used for the bucket index.
    pub bits: u32,
    /// Distance below which pairs are evaluated directly.
    pub inner: f64,
}

/// Validated parameters of the real-space Coulomb interaction.
#[derive(Debug, Clone, PartialEq)]
pub struct CoulLongSettings {
    pub cutoff: f64,
    pub g_ewald: f64,
    pub qqrd2e: f64,
    /// `None` evaluates every pair directly.
    pub table: Option<TableSpec>,
    /// Coulomb weights indexed by exclusion class; entry 0 is always 1.
    pub special_coul: [f64; 4],
    pub newton_pair: bool,
    /// Worker count; `None` uses the rayon default.
    pub threads: Option<usize>,
}

impl CoulLongSettings {
    #[inline]
    pub fn cutoff_sq(&self) -> f64 {
        self.cutoff * self.cutoff
    }
}

#[derive(Debug, Clone)]
pub struct CoulLongSettingsBuilder {
    cutoff: Option<f64>,
    g_ewald: Option<f64>,
    coulomb_constant: f64,
    dielectric: f64,
    table_bits: u32,
    table_inner: f64,
    special_coul: [f64; 3],
    newton_pair: bool,
    threads: Option<usize>,
}

impl Default for CoulLongSettingsBuilder {
    fn default() -> Self {
        Self {
            cutoff: None,
            g_ewald: None,
            coulomb_constant: COULOMB_CONSTANT_REAL,
            dielectric: 1.0,
            table_bits: DEFAULT_TABLE_BITS,
            table_inner: DEFAULT_TABLE_INNER,
            special_coul: [0.0; 3],
            newton_pair: true,
            threads: None,
        }
    }
}

impl CoulLongSettingsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cutoff(mut self, cutoff: f64) -> Self {
        self.cutoff = Some(cutoff);
        self
    }
    pub fn g_ewald(mut self, g_ewald: f64) -> Self {
        self.g_ewald = Some(g_ewald);
        self
    }
    pub fn coulomb_constant(mut self, value: f64) -> Self {
        self.coulomb_constant = value;
        self
    }
    pub fn dielectric(mut self, value: f64) -> Self {
        self.dielectric = value;
        self
    }
    /// Bucket index width; 0 disables the table.
    pub fn table_bits(mut self, bits: u32) -> Self {
        self.table_bits = bits;
        self
    }
    pub fn table_inner(mut self, inner: f64) -> Self {
        self.table_inner = inner;
        self
    }
    /// Weights for 1-2, 1-3 and 1-4 bonded pairs.
    pub fn special_coul(mut self, factors: [f64; 3]) -> Self {
        self.special_coul = factors;
        self
    }
    pub fn newton_pair(mut self, newton: bool) -> Self {
        self.newton_pair = newton;
        self
    }
    pub fn threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads);
        self
    }

    /// Takes the Coulomb constant, dielectric and special weights from a parameter file.
    pub fn with_params(self, params: &CoulombParams) -> Self {
        self.coulomb_constant(params.globals.coulomb_constant)
            .dielectric(params.globals.dielectric)
            .special_coul(params.special.coul)
    }

    pub fn build(self) -> Result<CoulLongSettings, ConfigError> {
        let cutoff = self.cutoff.ok_or(ConfigError::MissingParameter("cutoff"))?;
        let g_ewald = self
            .g_ewald
            .ok_or(ConfigError::MissingParameter("g_ewald"))?;

        positive("cutoff", cutoff)?;
        positive("g_ewald", g_ewald)?;
        positive("dielectric", self.dielectric)?;
        if !self.coulomb_constant.is_finite() {
            return Err(ConfigError::InvalidParameter {
                name: "coulomb_constant",
                reason: format!("{} is not finite", self.coulomb_constant),
            });
        }
        if let Some(factor) = self
            .special_coul
            .iter()
            .find(|f| !(0.0..=1.0).contains(*f))
        {
            return Err(ConfigError::InvalidParameter {
                name: "special_coul",
                reason: format!("factor {factor} is outside [0, 1]"),
            });
        }
        if self.threads == Some(0) {
            return Err(ConfigError::InvalidParameter {
                name: "threads",
                reason: "at least one worker thread is required".to_string(),
            });
        }

        let table = if self.table_bits == 0 {
            None
        } else {
            positive("table_inner", self.table_inner)?;
            Some(TableSpec {
                bits: self.table_bits,
                inner: self.table_inner,
            })
        };

        let [s12, s13, s14] = self.special_coul;
        Ok(CoulLongSettings {
            cutoff,
            g_ewald,
            qqrd2e: self.coulomb_constant / self.dielectric,
            table,
            special_coul: [1.0, s12, s13, s14],
            newton_pair: self.newton_pair,
            threads: self.threads,
        })
    }
}

fn positive(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidParameter {
            name,
            reason: format!("{value} must be positive and finite"),
        })
    }
}
