/// `2/√π`, the weight of the Gaussian term in the screened force.
pub const EWALD_F: f64 = 1.12837917;
pub const EWALD_P: f64 = 0.3275911;
pub const A1: f64 = 0.254829592;
pub const A2: f64 = -0.284496736;
pub const A3: f64 = 1.421413741;
pub const A4: f64 = -1.453152027;
pub const A5: f64 = 1.061405429;

/// The two transcendental terms needed by the direct-regime pair kernel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Screening {
    /// Approximation of `erfc(grij)`.
    pub erfc: f64,
    /// `exp(-grij²)`.
    pub expm2: f64,
}

/// Evaluates the screening terms for `grij = α·r`.
///
/// Uses the five-term rational approximation `erfc(x) ≈ t·P(t)·exp(-x²)` with
/// `t = 1/(1 + p·x)`, whose absolute error is bounded by `1.5e-7` for `x ≥ 0`.
#[inline]
pub fn screen(grij: f64) -> Screening {
    let expm2 = (-grij * grij).exp();
    let t = 1.0 / (1.0 + EWALD_P * grij);
    let erfc = t * (A1 + t * (A2 + t * (A3 + t * (A4 + t * A5)))) * expm2;
    Screening { erfc, expm2 }
}
