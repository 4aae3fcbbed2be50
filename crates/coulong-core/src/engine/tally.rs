use super::request::EvalFlags;
use nalgebra::Vector3;
use std::iter::Sum;
use std::ops::{Add, AddAssign};

/// Coulomb energy and virial `(xx, yy, zz, xy, xz, yz)` of a pass.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EnergyVirial {
    pub ecoul: f64,
    pub virial: [f64; 6],
}

impl EnergyVirial {
    pub fn new(ecoul: f64, virial: [f64; 6]) -> Self {
        Self { ecoul, virial }
    }

    /// Trace of the virial tensor.
    #[inline]
    pub fn virial_trace(&self) -> f64 {
        self.virial[0] + self.virial[1] + self.virial[2]
    }
}

impl Add for EnergyVirial {
    type Output = Self;

    fn add(mut self, rhs: Self) -> Self::Output {
        self += rhs;
        self
    }
}

impl AddAssign for EnergyVirial {
    fn add_assign(&mut self, rhs: Self) {
        self.ecoul += rhs.ecoul;
        for (v, r) in self.virial.iter_mut().zip(rhs.virial) {
            *v += r;
        }
    }
}

impl Sum for EnergyVirial {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), |acc, term| acc + term)
    }
}

#[inline]
pub(crate) fn pair_virial(del: &Vector3<f64>, fpair: f64) -> [f64; 6] {
    [
        del.x * del.x * fpair,
        del.y * del.y * fpair,
        del.z * del.z * fpair,
        del.x * del.y * fpair,
        del.x * del.z * fpair,
        del.y * del.z * fpair,
    ]
}

/// Buffers private to one worker for the duration of a pass.
#[derive(Debug, Clone, Default)]
pub(crate) struct ThreadScratch {
    pub forces: Vec<Vector3<f64>>,
    pub totals: EnergyVirial,
    pub eatom: Vec<f64>,
    pub vatom: Vec<[f64; 6]>,
}

impl ThreadScratch {
    /// Zeroes every accumulator and sizes the per-atom arrays to `nall`.
    pub fn reset(&mut self, nall: usize, flags: &EvalFlags) {
        self.forces.clear();
        self.forces.resize(nall, Vector3::zeros());
        self.totals = EnergyVirial::default();
        self.eatom.clear();
        if flags.eflag_atom {
            self.eatom.resize(nall, 0.0);
        }
        self.vatom.clear();
        if flags.vflag_atom {
            self.vatom.resize(nall, [0.0; 6]);
        }
    }

    /// Tallies one pair's energy and virial.
    ///
    /// Without Newton's third law a pair is seen from both owners, so each
    /// local endpoint receives half of the contribution.
    #[inline]
    #[allow(clippy::too_many_arguments)]
    pub fn tally<const NEWTON: bool>(
        &mut self,
        flags: &EvalFlags,
        i: usize,
        j: usize,
        nlocal: usize,
        ecoul: f64,
        fpair: f64,
        del: &Vector3<f64>,
    ) {
        let i_owned = NEWTON || i < nlocal;
        let j_owned = NEWTON || j < nlocal;

        if flags.eflag_global {
            if NEWTON {
                self.totals.ecoul += ecoul;
            } else {
                if i < nlocal {
                    self.totals.ecoul += 0.5 * ecoul;
                }
                if j < nlocal {
                    self.totals.ecoul += 0.5 * ecoul;
                }
            }
        }

        if flags.eflag_atom {
            let half = 0.5 * ecoul;
            if i_owned {
                self.eatom[i] += half;
            }
            if j_owned {
                self.eatom[j] += half;
            }
        }

        if flags.vflag() {
            let v = pair_virial(del, fpair);

            if flags.vflag_global {
                if NEWTON {
                    add6(&mut self.totals.virial, &v, 1.0);
                } else {
                    if i < nlocal {
                        add6(&mut self.totals.virial, &v, 0.5);
                    }
                    if j < nlocal {
                        add6(&mut self.totals.virial, &v, 0.5);
                    }
                }
            }

            if flags.vflag_atom {
                if i_owned {
                    add6(&mut self.vatom[i], &v, 0.5);
                }
                if j_owned {
                    add6(&mut self.vatom[j], &v, 0.5);
                }
            }
        }
    }
}

#[inline]
pub(crate) fn add6(target: &mut [f64; 6], v: &[f64; 6], weight: f64) {
    for (t, x) in target.iter_mut().zip(v) {
        *t += weight * x;
    }
}
