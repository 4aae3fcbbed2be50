use super::tally::{EnergyVirial, ThreadScratch, add6};
use nalgebra::{Point3, Vector3};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Particles per output slice handed to one reduction worker.
pub(crate) const REDUCE_CHUNK: usize = 1024;

/// Adds every worker's force buffer into `forces`.
///
/// Each output slice is written by exactly one worker. When `fdotr` is set the
/// returned tensor is `Σ xᵢ ⊗ Δfᵢ` over the deltas of this pass, in the order
/// `(xx, yy, zz, xy, xz, yz)`; otherwise it is zero.
pub(crate) fn reduce_forces(
    scratch: &[ThreadScratch],
    positions: &[Point3<f64>],
    forces: &mut [Vector3<f64>],
    fdotr: bool,
) -> [f64; 6] {
    #[cfg(not(feature = "parallel"))]
    let iterator = forces.chunks_mut(REDUCE_CHUNK).enumerate();

    #[cfg(feature = "parallel")]
    let iterator = forces.par_chunks_mut(REDUCE_CHUNK).enumerate();

    let partials: Vec<[f64; 6]> = iterator
        .map(|(chunk, out)| {
            let start = chunk * REDUCE_CHUNK;
            let mut virial = [0.0; 6];
            for (offset, f) in out.iter_mut().enumerate() {
                let index = start + offset;
                let delta = scratch
                    .iter()
                    .fold(Vector3::zeros(), |acc, s| acc + s.forces[index]);
                *f += delta;
                if fdotr {
                    let x = &positions[index];
                    add6(
                        &mut virial,
                        &[
                            delta.x * x.x,
                            delta.y * x.y,
                            delta.z * x.z,
                            delta.y * x.x,
                            delta.z * x.x,
                            delta.z * x.y,
                        ],
                        1.0,
                    );
                }
            }
            virial
        })
        .collect();

    let mut virial = [0.0; 6];
    for partial in &partials {
        add6(&mut virial, partial, 1.0);
    }
    virial
}

pub(crate) fn reduce_totals(scratch: &[ThreadScratch]) -> EnergyVirial {
    scratch.iter().map(|s| s.totals).sum()
}

/// Sums the per-atom energies of all workers into `eatom`, which must be sized and zeroed.
pub(crate) fn reduce_eatom(scratch: &[ThreadScratch], eatom: &mut [f64]) {
    #[cfg(not(feature = "parallel"))]
    let iterator = eatom.iter_mut().enumerate();

    #[cfg(feature = "parallel")]
    let iterator = eatom.par_iter_mut().enumerate();

    iterator.for_each(|(index, e)| {
        *e += scratch.iter().map(|s| s.eatom[index]).sum::<f64>();
    });
}

/// Sums the per-atom virials of all workers into `vatom`, which must be sized and zeroed.
pub(crate) fn reduce_vatom(scratch: &[ThreadScratch], vatom: &mut [[f64; 6]]) {
    #[cfg(not(feature = "parallel"))]
    let iterator = vatom.iter_mut().enumerate();

    #[cfg(feature = "parallel")]
    let iterator = vatom.par_iter_mut().enumerate();

    iterator.for_each(|(index, v)| {
        for s in scratch {
            add6(v, &s.vatom[index], 1.0);
        }
    });
}
