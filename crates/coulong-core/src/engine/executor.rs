use super::error::EngineError;
use super::kernel::{KernelVariant, PairKernel};
use super::request::EvalFlags;
use super::tally::ThreadScratch;
use crate::core::models::neighbor::NeighborList;
use crate::core::models::particles::ParticleView;
use std::ops::Range;
use tracing::{debug, trace};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// List positions handled by worker `tid` out of `nthreads`.
///
/// Every worker gets `1 + inum / nthreads` positions except the last
/// non-empty one; together the ranges cover `0..inum` exactly once.
#[inline]
pub fn partition(tid: usize, nthreads: usize, inum: usize) -> Range<usize> {
    let delta = 1 + inum / nthreads;
    let from = (tid * delta).min(inum);
    let to = (from + delta).min(inum);
    from..to
}

/// Fixed set of workers, each with private buffers that outlive a pass.
pub(crate) struct Executor {
    nthreads: usize,
    #[cfg(feature = "parallel")]
    pool: rayon::ThreadPool,
    scratch: Vec<ThreadScratch>,
}

impl Executor {
    /// Creates `threads` workers, or as many as rayon would use by default.
    pub fn new(threads: Option<usize>) -> Result<Self, EngineError> {
        #[cfg(feature = "parallel")]
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads.unwrap_or(0))
            .thread_name(|i| format!("coulong-{i}"))
            .build()
            .map_err(|e| EngineError::ThreadPool(e.to_string()))?;

        #[cfg(feature = "parallel")]
        let nthreads = pool.current_num_threads();

        #[cfg(not(feature = "parallel"))]
        let nthreads = threads.unwrap_or(1);

        debug!(nthreads, "Created evaluation workers.");
        Ok(Self {
            nthreads,
            #[cfg(feature = "parallel")]
            pool,
            scratch: vec![ThreadScratch::default(); nthreads],
        })
    }

    pub fn nthreads(&self) -> usize {
        self.nthreads
    }

    pub fn scratch(&self) -> &[ThreadScratch] {
        &self.scratch
    }

    /// Runs one parallel region: every worker zeroes its buffers, then
    /// evaluates its slice of the neighbor list. Returns after all workers finish.
    pub fn run(
        &mut self,
        kernel: &PairKernel<'_>,
        variant: KernelVariant,
        view: ParticleView<'_>,
        list: &NeighborList,
        flags: &EvalFlags,
    ) {
        let nall = view.positions.len();
        let inum = list.inum();
        let nthreads = self.nthreads;

        let work = |(tid, scratch): (usize, &mut ThreadScratch)| {
            scratch.reset(nall, flags);
            let range = partition(tid, nthreads, inum);
            trace!(tid, from = range.start, to = range.end, "Worker range.");
            variant.run(kernel, view, list, range, flags, scratch);
        };

        #[cfg(not(feature = "parallel"))]
        self.scratch.iter_mut().enumerate().for_each(work);

        #[cfg(feature = "parallel")]
        self.pool
            .install(|| self.scratch.par_iter_mut().enumerate().for_each(work));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partition_covers_range_exactly_once() {
        for inum in [0, 1, 7, 64, 1000, 1001] {
            for nthreads in [1, 2, 3, 4, 7, 16] {
                let mut covered = vec![0u32; inum];
                for tid in 0..nthreads {
                    for ii in partition(tid, nthreads, inum) {
                        covered[ii] += 1;
                    }
                }
                assert!(
                    covered.iter().all(|&c| c == 1),
                    "inum {inum}, nthreads {nthreads}"
                );
            }
        }
    }

    #[test]
    fn partition_uses_one_plus_quotient_chunks() {
        assert_eq!(partition(0, 4, 10), 0..3);
        assert_eq!(partition(1, 4, 10), 3..6);
        assert_eq!(partition(3, 4, 10), 9..10);
        assert_eq!(partition(3, 4, 2), 2..2);
    }

    #[test]
    fn executor_allocates_one_buffer_per_worker() {
        let executor = Executor::new(Some(3)).unwrap();
        assert_eq!(executor.nthreads(), 3);
        assert_eq!(executor.scratch().len(), 3);
    }
}
