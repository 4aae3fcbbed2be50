//! Bit-indexed linear interpolation tables for the real-space Coulomb term.
//!
//! A squared distance is rounded to single precision and the low exponent bits
//! together with the high mantissa bits of its IEEE-754 representation are used
//! directly as the bucket index. Buckets are therefore geometrically spaced:
//! every octave of `rsq` between the inner and outer cutoff holds the same
//! number of buckets, and a lookup is a mask and a shift, never a search.

use super::screening::EWALD_F;
use statrs::function::erf::erfc;
use thiserror::Error;
use tracing::{debug, warn};

/// Number of significand bits of an `f32`, including the implicit leading one.
const F32_MANT_DIG: i32 = f32::MANTISSA_DIGITS as i32;
/// Number of bits of an `f32` that are not significand bits (sign and exponent).
const F32_EXP_BITS: i32 = 32 - F32_MANT_DIG;
/// Smallest number of mantissa bits that still yields a usable table.
const MIN_MANTISSA_BITS: i32 = 3;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum TableError {
    #[error("Table inner cutoff must be positive and finite, got {0}")]
    InvalidInnerCutoff(f64),
    #[error("Table outer cutoff must be positive and finite, got {0}")]
    InvalidOuterCutoff(f64),
    #[error("Table bit count {0} exceeds the width of a single-precision float")]
    TooManyBits(u32),
    #[error("Too many exponent bits ({0}) for lookup table")]
    TooManyExponentBits(i32),
    #[error("Too many mantissa bits ({0}) for lookup table")]
    TooManyMantissaBits(i32),
    #[error("Too few bits for lookup table: only {0} mantissa bits remain")]
    TooFewBits(i32),
}

/// Bit layout mapping a single-precision `rsq` onto a bucket index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableBitmap {
    /// Number of index bits; the table has `2^bits` buckets.
    pub bits: u32,
    /// Number of low mantissa bits discarded before indexing.
    pub shift: u32,
    /// Mask selecting the `bits + shift` low bits of the float representation.
    pub mask: u32,
    /// High bits shared by squared distances near the inner cutoff.
    pub mask_lo: u32,
    /// High bits shared by squared distances near the outer cutoff.
    pub mask_hi: u32,
}

impl TableBitmap {
    /// Derives the bucket layout for `inner < r < outer` with `bits` index bits.
    ///
    /// The exponent bits are chosen so that the octave range
    /// `[2^n, outer²]`, with `2^n ≤ inner² < 2^(n+1)`, fits in the index;
    /// whatever remains of `bits` becomes mantissa resolution.
    pub fn new(inner: f64, outer: f64, bits: u32) -> Result<Self, TableError> {
        if !(inner.is_finite() && inner > 0.0) {
            return Err(TableError::InvalidInnerCutoff(inner));
        }
        if !(outer.is_finite() && outer > 0.0) {
            return Err(TableError::InvalidOuterCutoff(outer));
        }
        if bits > u32::BITS {
            return Err(TableError::TooManyBits(bits));
        }
        if inner >= outer {
            warn!(inner, outer, "Table inner cutoff >= outer cutoff");
        }

        let inner_sq = inner * inner;
        let outer_sq = outer * outer;

        let mut n_lower_min: i32 = 1;
        loop {
            let low = 2f64.powi(n_lower_min);
            if low <= inner_sq && 2f64.powi(n_lower_min + 1) > inner_sq {
                break;
            }
            if low <= inner_sq {
                n_lower_min += 1;
            } else {
                n_lower_min -= 1;
            }
        }

        let required_range = outer_sq / 2f64.powi(n_lower_min);
        let mut n_exp_bits: i32 = 0;
        let mut available_range = 2.0;
        while available_range < required_range {
            n_exp_bits += 1;
            available_range = 2f64.powf(2f64.powi(n_exp_bits));
        }

        let n_mant_bits = bits as i32 - n_exp_bits;

        if n_exp_bits > F32_EXP_BITS {
            return Err(TableError::TooManyExponentBits(n_exp_bits));
        }
        if n_mant_bits + 1 > F32_MANT_DIG {
            return Err(TableError::TooManyMantissaBits(n_mant_bits));
        }
        if n_mant_bits < MIN_MANTISSA_BITS {
            return Err(TableError::TooFewBits(n_mant_bits));
        }

        let shift = (F32_MANT_DIG - (n_mant_bits + 1)) as u32;
        let mask = ((1u64 << (bits + shift)) - 1) as u32;
        let mask_hi = (outer_sq as f32).to_bits() & !mask;
        let mask_lo = (inner_sq as f32).to_bits() & !mask;

        debug!(
            bits,
            n_exp_bits, n_mant_bits, shift, mask, mask_lo, mask_hi, "Derived table bitmap."
        );

        Ok(Self {
            bits,
            shift,
            mask,
            mask_lo,
            mask_hi,
        })
    }

    /// Number of buckets.
    #[inline]
    pub fn buckets(&self) -> usize {
        1usize << self.bits
    }

    /// Bucket holding the single-precision squared distance `rsq`.
    #[inline]
    pub fn index(&self, rsq: f32) -> usize {
        ((rsq.to_bits() & self.mask) >> self.shift) as usize
    }

    /// Lower edge of bucket `index`, built on top of the given high bits.
    #[inline]
    fn edge(&self, index: usize, high_bits: u32) -> f32 {
        f32::from_bits(((index as u32) << self.shift) | high_bits)
    }
}

/// Position of one squared distance inside the table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TableCursor {
    pub index: usize,
    /// Fractional offset in `[0, 1)` between the bucket's lower and upper edge.
    pub fraction: f64,
}

/// Tabulated force, exclusion-correction and energy terms with their slopes.
///
/// All values include the Coulomb conversion constant and exclude the
/// particle charges and the per-type scale, which the kernel applies.
#[derive(Debug, Clone, PartialEq)]
pub struct CoulombTable {
    bitmap: TableBitmap,
    inner_rsq: f64,
    rtable: Vec<f64>,
    drtable: Vec<f64>,
    ftable: Vec<f64>,
    dftable: Vec<f64>,
    ctable: Vec<f64>,
    dctable: Vec<f64>,
    etable: Vec<f64>,
    detable: Vec<f64>,
}

struct Sample {
    force: f64,
    correction: f64,
    energy: f64,
}

fn sample(rsq: f32, g_ewald: f64, qqrd2e: f64) -> Sample {
    let r = f64::from(rsq.sqrt());
    let grij = g_ewald * r;
    let expm2 = (-grij * grij).exp();
    let derfc = erfc(grij);
    Sample {
        force: qqrd2e / r * (derfc + EWALD_F * grij * expm2),
        correction: qqrd2e / r,
        energy: qqrd2e / r * derfc,
    }
}

impl CoulombTable {
    /// Tabulates the screened Coulomb terms between `inner` and `cutoff`.
    ///
    /// The returned table's [`inner_rsq`](Self::inner_rsq) is the smallest
    /// tabulated squared distance, which may lie slightly below `inner²`;
    /// callers must use it, not `inner²`, as the direct/table boundary.
    pub fn build(
        cutoff: f64,
        inner: f64,
        bits: u32,
        g_ewald: f64,
        qqrd2e: f64,
    ) -> Result<Self, TableError> {
        let bitmap = TableBitmap::new(inner, cutoff, bits)?;
        let ntable = bitmap.buckets();
        let inner_sq = inner * inner;
        let cut_sq = cutoff * cutoff;

        let mut rtable = vec![0.0; ntable];
        let mut ftable = vec![0.0; ntable];
        let mut ctable = vec![0.0; ntable];
        let mut etable = vec![0.0; ntable];

        let mut min_rsq = bitmap.edge(0, bitmap.mask_hi);

        for i in 0..ntable {
            let mut rsq = bitmap.edge(i, bitmap.mask_lo);
            if f64::from(rsq) < inner_sq {
                rsq = bitmap.edge(i, bitmap.mask_hi);
            }
            let s = sample(rsq, g_ewald, qqrd2e);
            rtable[i] = f64::from(rsq);
            ftable[i] = s.force;
            ctable[i] = s.correction;
            etable[i] = s.energy;
            min_rsq = min_rsq.min(rsq);
        }

        let mut drtable = vec![0.0; ntable];
        let mut dftable = vec![0.0; ntable];
        let mut dctable = vec![0.0; ntable];
        let mut detable = vec![0.0; ntable];

        // Consecutive buckets are joined periodically: the last index wraps to the first.
        for i in 0..ntable {
            let next = (i + 1) % ntable;
            drtable[i] = 1.0 / (rtable[next] - rtable[i]);
            dftable[i] = ftable[next] - ftable[i];
            dctable[i] = ctable[next] - ctable[i];
            detable[i] = etable[next] - etable[i];
        }

        // The bucket holding the largest rsq ends exactly at the cutoff.
        let itable_min = bitmap.index(min_rsq);
        let itable_max = if itable_min == 0 {
            ntable - 1
        } else {
            itable_min - 1
        };
        if f64::from(bitmap.edge(itable_max, bitmap.mask_hi)) < cut_sq {
            let rsq = cut_sq as f32;
            let s = sample(rsq, g_ewald, qqrd2e);
            drtable[itable_max] = 1.0 / (f64::from(rsq) - rtable[itable_max]);
            dftable[itable_max] = s.force - ftable[itable_max];
            dctable[itable_max] = s.correction - ctable[itable_max];
            detable[itable_max] = s.energy - etable[itable_max];
        }

        let inner_rsq = f64::from(min_rsq);
        debug!(
            ntable,
            inner_rsq, itable_min, itable_max, "Built Coulomb interpolation table."
        );

        Ok(Self {
            bitmap,
            inner_rsq,
            rtable,
            drtable,
            ftable,
            dftable,
            ctable,
            dctable,
            etable,
            detable,
        })
    }

    pub fn bitmap(&self) -> &TableBitmap {
        &self.bitmap
    }

    /// Squared distance at or below which the direct regime is used.
    #[inline]
    pub fn inner_rsq(&self) -> f64 {
        self.inner_rsq
    }

    pub fn len(&self) -> usize {
        self.rtable.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rtable.is_empty()
    }

    /// Locates `rsq`, rounded to single precision, in its bucket.
    #[inline]
    pub fn locate(&self, rsq: f64) -> TableCursor {
        let rsq = rsq as f32;
        let index = self.bitmap.index(rsq);
        let fraction = (f64::from(rsq) - self.rtable[index]) * self.drtable[index];
        TableCursor { index, fraction }
    }

    /// Interpolated `F·r` of the screened interaction for unit charges.
    #[inline]
    pub fn force(&self, cursor: TableCursor) -> f64 {
        self.ftable[cursor.index] + cursor.fraction * self.dftable[cursor.index]
    }

    /// Interpolated bare Coulomb term `qqrd2e/r`, removed for excluded pairs.
    #[inline]
    pub fn correction(&self, cursor: TableCursor) -> f64 {
        self.ctable[cursor.index] + cursor.fraction * self.dctable[cursor.index]
    }

    /// Interpolated screened energy for unit charges.
    #[inline]
    pub fn energy(&self, cursor: TableCursor) -> f64 {
        self.etable[cursor.index] + cursor.fraction * self.detable[cursor.index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const G_EWALD: f64 = 0.3;
    const CUTOFF: f64 = 10.0;
    const QQRD2E: f64 = 332.06371;

    fn default_table() -> CoulombTable {
        CoulombTable::build(CUTOFF, 2f64.sqrt(), 12, G_EWALD, QQRD2E).unwrap()
    }

    fn exact_force(rsq: f64) -> f64 {
        let r = rsq.sqrt();
        let grij = G_EWALD * r;
        QQRD2E / r * (erfc(grij) + EWALD_F * grij * (-grij * grij).exp())
    }

    fn exact_energy(rsq: f64) -> f64 {
        let r = rsq.sqrt();
        QQRD2E / r * erfc(G_EWALD * r)
    }

    fn relative_error(approx: f64, exact: f64) -> f64 {
        ((approx - exact) / exact).abs()
    }

    #[test]
    fn bitmap_for_default_cutoffs_has_expected_layout() {
        let bitmap = TableBitmap::new(2f64.sqrt(), CUTOFF, 12).unwrap();
        assert_eq!(bitmap.bits, 12);
        assert_eq!(bitmap.shift, 14);
        assert_eq!(bitmap.mask, (1 << 26) - 1);
        assert_eq!(bitmap.buckets(), 4096);
    }

    #[test]
    fn bitmap_rejects_non_positive_inner_cutoff() {
        assert_eq!(
            TableBitmap::new(0.0, CUTOFF, 12),
            Err(TableError::InvalidInnerCutoff(0.0))
        );
    }

    #[test]
    fn bitmap_rejects_too_few_bits() {
        assert!(matches!(
            TableBitmap::new(2f64.sqrt(), CUTOFF, 4),
            Err(TableError::TooFewBits(_))
        ));
    }

    #[test]
    fn bitmap_rejects_too_many_mantissa_bits() {
        assert!(matches!(
            TableBitmap::new(2f64.sqrt(), CUTOFF, 30),
            Err(TableError::TooManyMantissaBits(_))
        ));
    }

    #[test]
    fn bitmap_rejects_bit_count_wider_than_a_float() {
        assert_eq!(
            TableBitmap::new(2f64.sqrt(), CUTOFF, 40),
            Err(TableError::TooManyBits(40))
        );
    }

    #[test]
    fn inner_rsq_does_not_exceed_requested_inner_square() {
        let table = default_table();
        assert!(table.inner_rsq() <= 2.0 + 1e-12);
        assert!(table.inner_rsq() > 0.0);
    }

    #[test]
    fn locate_returns_fraction_within_unit_interval() {
        let table = default_table();
        for &rsq in &[2.5, 7.3, 19.0, 42.0, 77.7, 99.9] {
            let cursor = table.locate(rsq);
            assert!(cursor.index < table.len());
            assert!(
                (0.0..1.0).contains(&cursor.fraction),
                "rsq = {rsq}: fraction = {}",
                cursor.fraction
            );
        }
    }

    #[test]
    fn interpolated_force_matches_exact_screened_force() {
        let table = default_table();
        for &rsq in &[2.1, 3.3, 9.0, 24.5, 50.0, 81.0, 99.5] {
            let cursor = table.locate(rsq);
            let err = relative_error(table.force(cursor), exact_force(rsq));
            assert!(err < 1e-4, "rsq = {rsq}: relative error {err}");
        }
    }

    #[test]
    fn interpolated_energy_matches_exact_screened_energy() {
        let table = default_table();
        for &rsq in &[2.1, 3.3, 9.0, 24.5, 50.0, 81.0] {
            let cursor = table.locate(rsq);
            let err = relative_error(table.energy(cursor), exact_energy(rsq));
            assert!(err < 1e-4, "rsq = {rsq}: relative error {err}");
        }
    }

    #[test]
    fn interpolated_correction_matches_bare_coulomb() {
        let table = default_table();
        for &rsq in &[2.1, 16.0, 64.0, 99.0] {
            let cursor = table.locate(rsq);
            let exact = QQRD2E / rsq.sqrt();
            assert!(relative_error(table.correction(cursor), exact) < 1e-5);
        }
    }

    #[test]
    fn last_bucket_interpolates_up_to_cutoff() {
        let table = default_table();
        let rsq = CUTOFF * CUTOFF * (1.0 - 1e-6);
        let cursor = table.locate(rsq);
        let err = relative_error(table.force(cursor), exact_force(rsq));
        assert!(err < 1e-4, "relative error {err}");
    }
}
