use super::config::CoulLongSettings;
use super::request::EvalFlags;
use super::tally::ThreadScratch;
use crate::core::forcefield::scale::ScaleMatrix;
use crate::core::forcefield::screening::{EWALD_F, screen};
use crate::core::forcefield::table::CoulombTable;
use crate::core::models::neighbor::{NeighborList, decode};
use crate::core::models::particles::ParticleView;
use nalgebra::Vector3;
use std::ops::Range;

/// Result of one pair inside the cutoff.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairInteraction {
    /// Force divided by distance; the force on `i` is `del·fpair`.
    pub fpair: f64,
    /// Pair energy, zero when energy was not requested.
    pub ecoul: f64,
}

/// Immutable per-pass view of everything the pair loop reads besides particles.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PairKernel<'a> {
    cut_coulsq: f64,
    g_ewald: f64,
    qqrd2e: f64,
    special_coul: [f64; 4],
    scale: &'a ScaleMatrix,
    table: Option<&'a CoulombTable>,
}

impl<'a> PairKernel<'a> {
    pub fn new(
        settings: &CoulLongSettings,
        scale: &'a ScaleMatrix,
        table: Option<&'a CoulombTable>,
    ) -> Self {
        Self {
            cut_coulsq: settings.cutoff_sq(),
            g_ewald: settings.g_ewald,
            qqrd2e: settings.qqrd2e,
            special_coul: settings.special_coul,
            scale,
            table,
        }
    }

    /// Evaluates one pair with `rsq` strictly inside the cutoff.
    ///
    /// `qiqj` is the charge product, `scale` the per-type factor and `factor`
    /// the exclusion weight. A weight below one removes `(1 - factor)` of the
    /// bare Coulomb term from both force and energy.
    #[inline(always)]
    pub fn interact<const EFLAG: bool>(
        &self,
        rsq: f64,
        qiqj: f64,
        scale: f64,
        factor: f64,
    ) -> PairInteraction {
        let r2inv = 1.0 / rsq;
        let mut ecoul = 0.0;

        let forcecoul = match self.table {
            Some(table) if rsq > table.inner_rsq() => {
                let cursor = table.locate(rsq);
                let weight = scale * qiqj;
                let mut forcecoul = weight * table.force(cursor);
                let mut prefactor = 0.0;
                if factor < 1.0 {
                    prefactor = weight * table.correction(cursor);
                    forcecoul -= (1.0 - factor) * prefactor;
                }
                if EFLAG {
                    ecoul = weight * table.energy(cursor);
                    if factor < 1.0 {
                        ecoul -= (1.0 - factor) * prefactor;
                    }
                }
                forcecoul
            }
            _ => {
                let r = rsq.sqrt();
                let grij = self.g_ewald * r;
                let s = screen(grij);
                let prefactor = self.qqrd2e * scale * qiqj / r;
                let mut forcecoul = prefactor * (s.erfc + EWALD_F * grij * s.expm2);
                if factor < 1.0 {
                    forcecoul -= (1.0 - factor) * prefactor;
                }
                if EFLAG {
                    ecoul = prefactor * s.erfc;
                    if factor < 1.0 {
                        ecoul -= (1.0 - factor) * prefactor;
                    }
                }
                forcecoul
            }
        };

        PairInteraction {
            fpair: forcecoul * r2inv,
            ecoul,
        }
    }

    /// Runs the pair loop over list positions `range`, writing into `scratch`.
    ///
    /// Forces on `j` are written only when `NEWTON` holds or `j` is local.
    pub fn eval<const EVFLAG: bool, const EFLAG: bool, const NEWTON: bool>(
        &self,
        view: ParticleView<'_>,
        list: &NeighborList,
        range: Range<usize>,
        flags: &EvalFlags,
        scratch: &mut ThreadScratch,
    ) {
        let nlocal = view.nlocal;
        for ii in range {
            let i = list.ilist()[ii];
            let qi = view.charges[i];
            let xi = view.positions[i];
            let itype = view.types[i];
            let mut fi = Vector3::zeros();

            for &entry in list.neighbors(ii) {
                let (j, class) = decode(entry);
                let factor = self.special_coul[class.index()];

                let del = xi - view.positions[j];
                let rsq = del.norm_squared();
                if rsq >= self.cut_coulsq {
                    continue;
                }

                let scale = self.scale.get(itype, view.types[j]);
                let pair = self.interact::<EFLAG>(rsq, qi * view.charges[j], scale, factor);
                let f = del * pair.fpair;

                fi += f;
                if NEWTON || j < nlocal {
                    scratch.forces[j] -= f;
                }

                if EVFLAG {
                    scratch.tally::<NEWTON>(flags, i, j, nlocal, pair.ecoul, pair.fpair, &del);
                }
            }

            scratch.forces[i] += fi;
        }
    }
}

/// One of the six compiled pair loops, chosen once per pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum KernelVariant {
    TallyEnergyNewton,
    TallyEnergy,
    TallyNewton,
    Tally,
    ForcesNewton,
    Forces,
}

impl KernelVariant {
    pub fn select(flags: &EvalFlags, newton: bool) -> Self {
        match (flags.evflag(), flags.eflag(), newton) {
            (true, true, true) => Self::TallyEnergyNewton,
            (true, true, false) => Self::TallyEnergy,
            (true, false, true) => Self::TallyNewton,
            (true, false, false) => Self::Tally,
            (false, _, true) => Self::ForcesNewton,
            (false, _, false) => Self::Forces,
        }
    }

    #[inline]
    pub fn run(
        self,
        kernel: &PairKernel<'_>,
        view: ParticleView<'_>,
        list: &NeighborList,
        range: Range<usize>,
        flags: &EvalFlags,
        scratch: &mut ThreadScratch,
    ) {
        match self {
            Self::TallyEnergyNewton => {
                kernel.eval::<true, true, true>(view, list, range, flags, scratch)
            }
            Self::TallyEnergy => kernel.eval::<true, true, false>(view, list, range, flags, scratch),
            Self::TallyNewton => kernel.eval::<true, false, true>(view, list, range, flags, scratch),
            Self::Tally => kernel.eval::<true, false, false>(view, list, range, flags, scratch),
            Self::ForcesNewton => {
                kernel.eval::<false, false, true>(view, list, range, flags, scratch)
            }
            Self::Forces => kernel.eval::<false, false, false>(view, list, range, flags, scratch),
        }
    }
}
