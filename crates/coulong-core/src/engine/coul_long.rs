use super::config::CoulLongSettings;
use super::error::EngineError;
use super::executor::Executor;
use super::kernel::{KernelVariant, PairInteraction, PairKernel};
use super::reduction::{reduce_eatom, reduce_forces, reduce_totals, reduce_vatom};
use super::request::{EvalFlags, EvalRequest};
use super::tally::{EnergyVirial, add6};
use crate::core::forcefield::scale::{ScaleError, ScaleMatrix};
use crate::core::forcefield::table::CoulombTable;
use crate::core::models::neighbor::NeighborList;
use crate::core::models::particles::ParticleStore;
use tracing::{debug, info, instrument, warn};

/// The real-space Ewald Coulomb pair interaction.
///
/// An engine owns its interpolation table, its worker pool and every worker's
/// private buffers. Each call to [`evaluate`](Self::evaluate) is one complete
/// pass: forces are added to the store, and the requested energy and virial
/// replace the results of the previous pass.
pub struct CoulLong {
    settings: CoulLongSettings,
    scale: ScaleMatrix,
    table: Option<CoulombTable>,
    executor: Executor,
    totals: EnergyVirial,
    eatom: Vec<f64>,
    vatom: Vec<[f64; 6]>,
}

impl CoulLong {
    #[instrument(skip_all, name = "coul_long_init")]
    pub fn new(settings: CoulLongSettings, scale: ScaleMatrix) -> Result<Self, EngineError> {
        let table = match settings.table {
            Some(spec) => {
                if spec.inner >= settings.cutoff {
                    warn!(
                        inner = spec.inner,
                        cutoff = settings.cutoff,
                        "Table inner cutoff is not below the Coulomb cutoff; every pair will be evaluated directly."
                    );
                    None
                } else {
                    Some(CoulombTable::build(
                        settings.cutoff,
                        spec.inner,
                        spec.bits,
                        settings.g_ewald,
                        settings.qqrd2e,
                    )?)
                }
            }
            None => None,
        };

        let executor = Executor::new(settings.threads)?;
        info!(
            cutoff = settings.cutoff,
            g_ewald = settings.g_ewald,
            tabulated = table.is_some(),
            uniform_scale = scale.is_uniform(),
            newton_pair = settings.newton_pair,
            nthreads = executor.nthreads(),
            "Coulomb engine ready."
        );

        Ok(Self {
            settings,
            scale,
            table,
            executor,
            totals: EnergyVirial::default(),
            eatom: Vec::new(),
            vatom: Vec::new(),
        })
    }

    pub fn settings(&self) -> &CoulLongSettings {
        &self.settings
    }

    pub fn scale(&self) -> &ScaleMatrix {
        &self.scale
    }

    /// Updates one symmetric entry of the per-type scale matrix.
    pub fn set_scale(&mut self, i: usize, j: usize, value: f64) -> Result<(), ScaleError> {
        self.scale.set(i, j, value)
    }

    pub fn table(&self) -> Option<&CoulombTable> {
        self.table.as_ref()
    }

    pub fn nthreads(&self) -> usize {
        self.executor.nthreads()
    }

    /// Energy and virial of the last pass.
    pub fn totals(&self) -> EnergyVirial {
        self.totals
    }

    /// Per-particle energies of the last pass; empty unless requested.
    pub fn eatom(&self) -> &[f64] {
        &self.eatom
    }

    /// Per-particle virials of the last pass; empty unless requested.
    pub fn vatom(&self) -> &[[f64; 6]] {
        &self.vatom
    }

    /// Runs one evaluation pass over `list`.
    ///
    /// The contributions of this pass are added to the forces already in
    /// `store`. All preconditions are checked before any worker starts.
    #[instrument(skip_all, name = "coul_long_pass", fields(nall = store.nall(), inum = list.inum()))]
    pub fn evaluate(
        &mut self,
        store: &mut ParticleStore,
        list: &NeighborList,
        request: EvalRequest,
    ) -> Result<EnergyVirial, EngineError> {
        self.validate(store, list)?;

        let newton = self.settings.newton_pair;
        let flags = EvalFlags::setup(request, newton);
        let nall = store.nall();
        self.reset_accumulators(nall, &flags);

        let kernel = PairKernel::new(&self.settings, &self.scale, self.table.as_ref());
        let variant = KernelVariant::select(&flags, newton);
        debug!(?variant, "Selected pair kernel.");

        let (view, forces) = store.split_for_eval();
        self.executor.run(&kernel, variant, view, list, &flags);

        let scratch = self.executor.scratch();
        let fdotr = reduce_forces(scratch, view.positions, forces, flags.vflag_fdotr);
        let mut totals = if flags.evflag() {
            reduce_totals(scratch)
        } else {
            EnergyVirial::default()
        };
        if flags.vflag_fdotr {
            add6(&mut totals.virial, &fdotr, 1.0);
        }
        if flags.eflag_atom {
            reduce_eatom(scratch, &mut self.eatom);
        }
        if flags.vflag_atom {
            reduce_vatom(scratch, &mut self.vatom);
        }
        self.totals = totals;

        debug!(
            ecoul = totals.ecoul,
            virial_trace = totals.virial_trace(),
            "Pass complete."
        );
        Ok(totals)
    }

    /// Force and energy of a single pair, using the same regime selection as a pass.
    ///
    /// Returns `None` when `rsq` is not inside the cutoff.
    pub fn single(
        &self,
        qi: f64,
        qj: f64,
        itype: usize,
        jtype: usize,
        rsq: f64,
        factor_coul: f64,
    ) -> Result<Option<PairInteraction>, EngineError> {
        let ntypes = self.scale.ntypes();
        if itype >= ntypes || jtype >= ntypes {
            return Err(ScaleError::TypeOutOfRange {
                i: itype,
                j: jtype,
                ntypes,
            }
            .into());
        }
        if rsq >= self.settings.cutoff_sq() {
            return Ok(None);
        }
        let kernel = PairKernel::new(&self.settings, &self.scale, self.table.as_ref());
        Ok(Some(kernel.interact::<true>(
            rsq,
            qi * qj,
            self.scale.get(itype, jtype),
            factor_coul,
        )))
    }

    fn validate(&self, store: &ParticleStore, list: &NeighborList) -> Result<(), EngineError> {
        if list.nall() != store.nall() {
            return Err(EngineError::ParticleCountMismatch {
                list: list.nall(),
                store: store.nall(),
            });
        }
        let nlocal = store.nlocal();
        if let Some((ii, &index)) = list.ilist().iter().enumerate().find(|(_, i)| **i >= nlocal) {
            return Err(EngineError::NotLocal { ii, index, nlocal });
        }
        let ntypes = self.scale.ntypes();
        if let Some((index, &type_id)) = store
            .types()
            .iter()
            .enumerate()
            .find(|(_, t)| **t >= ntypes)
        {
            return Err(EngineError::TypeOutOfRange {
                index,
                type_id,
                ntypes,
            });
        }
        Ok(())
    }

    fn reset_accumulators(&mut self, nall: usize, flags: &EvalFlags) {
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
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::special::SpecialBonds;
    use crate::engine::config::CoulLongSettingsBuilder;
    use crate::engine::request::VirialMode;
    use nalgebra::{Point3, Vector3};

    const CUTOFF: f64 = 6.0;

    fn settings(threads: usize, newton: bool, table_bits: u32) -> CoulLongSettings {
        CoulLongSettingsBuilder::new()
            .cutoff(CUTOFF)
            .g_ewald(0.35)
            .table_bits(table_bits)
            .newton_pair(newton)
            .special_coul([0.0, 0.0, 0.5])
            .threads(threads)
            .build()
            .unwrap()
    }

    /// A small charge-neutral lattice with jittered positions.
    fn lattice(n: usize) -> ParticleStore {
        let mut store = ParticleStore::new();
        for x in 0..n {
            for y in 0..n {
                for z in 0..n {
                    let k = (x * n + y) * n + z;
                    let jitter = 0.1 * ((k * 7 % 11) as f64 / 11.0 - 0.5);
                    let position = Point3::new(
                        1.9 * x as f64 + jitter,
                        1.9 * y as f64 - jitter,
                        1.9 * z as f64 + 0.5 * jitter,
                    );
                    let charge = if k % 2 == 0 { 0.4 } else { -0.4 };
                    store.add_local(position, charge, k % 2).unwrap();
                }
            }
        }
        store
    }

    /// Runs one pass over a lattice whose first six particles form a bonded chain.
    fn run(
        settings: CoulLongSettings,
        store: &mut ParticleStore,
        request: EvalRequest,
    ) -> (CoulLong, EnergyVirial) {
        let bonds: Vec<_> = (0..5).map(|i| (i, i + 1)).collect();
        run_bonded(settings, store, &bonds, request)
    }

    fn run_bonded(
        settings: CoulLongSettings,
        store: &mut ParticleStore,
        bonds: &[(usize, usize)],
        request: EvalRequest,
    ) -> (CoulLong, EnergyVirial) {
        let special = SpecialBonds::from_bonds(store.nall(), bonds).unwrap();
        let list = NeighborList::build_half(store, settings.cutoff, 0.5, &special).unwrap();
        let mut engine = CoulLong::new(settings, ScaleMatrix::new(2)).unwrap();
        let totals = engine.evaluate(store, &list, request).unwrap();
        (engine, totals)
    }

    fn assert_close(a: f64, b: f64, tol: f64) {
        assert!(
            (a - b).abs() <= tol * (1.0 + b.abs()),
            "{a} differs from {b} by more than {tol}"
        );
    }

    #[test]
    fn results_are_independent_of_thread_count() {
        let mut reference_store = lattice(4);
        let (_, reference) = run(
            settings(1, true, 12),
            &mut reference_store,
            EvalRequest::energy_and_virial(VirialMode::Pairwise),
        );

        for threads in [2, 4] {
            let mut store = lattice(4);
            let (_, totals) = run(
                settings(threads, true, 12),
                &mut store,
                EvalRequest::energy_and_virial(VirialMode::Pairwise),
            );
            assert_close(totals.ecoul, reference.ecoul, 1e-10);
            for k in 0..6 {
                assert_close(totals.virial[k], reference.virial[k], 1e-10);
            }
            for (f, g) in store.forces().iter().zip(reference_store.forces()) {
                assert!((f - g).norm() <= 1e-10 * (1.0 + g.norm()));
            }
        }
    }

    /// `lattice(n)` followed by ghost images of its first plane, shifted one period along x.
    fn lattice_with_ghosts(n: usize) -> ParticleStore {
        let mut store = lattice(n);
        let period = Vector3::new(1.9 * n as f64, 0.0, 0.0);
        for k in 0..n * n {
            let position = store.positions()[k] + period;
            let (charge, type_id) = (store.charges()[k], store.types()[k]);
            store.add_ghost(position, charge, type_id);
        }
        store
    }

    #[test]
    fn ghost_and_bonded_results_are_independent_of_thread_count() {
        let n = 3;
        let nlocal = n * n * n;
        // A local chain plus bonds that reach into the ghost images.
        let mut bonds: Vec<_> = (0..5).map(|i| (i, i + 1)).collect();
        bonds.extend([(0, nlocal), (nlocal, nlocal + 1), (2 * n, nlocal + 3)]);

        for newton in [false, true] {
            let mut reference_store = lattice_with_ghosts(n);
            let (reference_engine, reference) = run_bonded(
                settings(1, newton, 12),
                &mut reference_store,
                &bonds,
                EvalRequest::everything(),
            );
            let reference_eatom: f64 = reference_engine.eatom().iter().sum();
            assert_close(reference_eatom, reference.ecoul, 1e-10);

            for threads in [3, 64] {
                let mut store = lattice_with_ghosts(n);
                let (engine, totals) = run_bonded(
                    settings(threads, newton, 12),
                    &mut store,
                    &bonds,
                    EvalRequest::everything(),
                );
                assert_eq!(engine.nthreads(), threads);
                assert_close(totals.ecoul, reference.ecoul, 1e-10);
                for k in 0..6 {
                    assert_close(totals.virial[k], reference.virial[k], 1e-10);
                }
                for (f, g) in store.forces().iter().zip(reference_store.forces()) {
                    assert!(
                        (f - g).norm() <= 1e-10 * (1.0 + g.norm()),
                        "newton {newton}, {threads} threads"
                    );
                }
                for (e, r) in engine.eatom().iter().zip(reference_engine.eatom()) {
                    assert_close(*e, *r, 1e-10);
                }
            }

            if !newton {
                let ghost_forces = &reference_store.forces()[nlocal..];
                assert!(ghost_forces.iter().all(|f| *f == Vector3::zeros()));
            }
        }
    }

    #[test]
    fn net_force_vanishes_with_newton() {
        let mut store = lattice(3);
        run(settings(2, true, 12), &mut store, EvalRequest::forces_only());
        let net: Vector3<f64> = store.forces().iter().sum();
        assert!(net.norm() < 1e-9, "net force {net}");
    }

    #[test]
    fn forces_accumulate_onto_prior_values() {
        let mut fresh = lattice(3);
        run(settings(2, true, 0), &mut fresh, EvalRequest::forces_only());

        let mut primed = lattice(3);
        primed.forces_mut()[0] = Vector3::new(1.0, -2.0, 3.0);
        run(settings(2, true, 0), &mut primed, EvalRequest::forces_only());

        assert!((primed.forces()[0] - fresh.forces()[0] - Vector3::new(1.0, -2.0, 3.0)).norm() < 1e-12);
        assert_eq!(primed.forces()[1], fresh.forces()[1]);
    }

    #[test]
    fn fdotr_virial_matches_pairwise_virial() {
        let mut pairwise_store = lattice(3);
        let (_, pairwise) = run(
            settings(2, true, 12),
            &mut pairwise_store,
            EvalRequest::energy_and_virial(VirialMode::Pairwise),
        );
        let mut fdotr_store = lattice(3);
        let (_, fdotr) = run(
            settings(2, true, 12),
            &mut fdotr_store,
            EvalRequest::energy_and_virial(VirialMode::FdotR),
        );

        assert_close(fdotr.ecoul, pairwise.ecoul, 1e-12);
        for k in 0..6 {
            assert_close(fdotr.virial[k], pairwise.virial[k], 1e-9);
        }
    }

    #[test]
    fn fdotr_global_virial_coexists_with_per_atom_virial() {
        let request = EvalRequest {
            energy: true,
            virial: VirialMode::FdotR,
            virial_per_atom: true,
            ..EvalRequest::default()
        };
        let mut store = lattice(3);
        let (engine, totals) = run(settings(2, true, 12), &mut store, request);

        let mut pairwise_store = lattice(3);
        let (_, pairwise) = run(
            settings(2, true, 12),
            &mut pairwise_store,
            EvalRequest::energy_and_virial(VirialMode::Pairwise),
        );
        for k in 0..6 {
            let per_atom: f64 = engine.vatom().iter().map(|v| v[k]).sum();
            assert_close(totals.virial[k], pairwise.virial[k], 1e-9);
            assert_close(per_atom, pairwise.virial[k], 1e-9);
        }
    }

    #[test]
    fn per_atom_energy_sums_to_global_energy() {
        let mut store = lattice(3);
        let (engine, totals) = run(settings(3, true, 12), &mut store, EvalRequest::everything());

        let eatom: f64 = engine.eatom().iter().sum();
        assert_close(eatom, totals.ecoul, 1e-10);
        let vxx: f64 = engine.vatom().iter().map(|v| v[0]).sum();
        assert_close(vxx, totals.virial[0], 1e-10);
        assert_eq!(engine.eatom().len(), store.nall());
    }

    #[test]
    fn requesting_nothing_leaves_totals_zero() {
        let mut store = lattice(2);
        let (engine, totals) = run(settings(2, true, 12), &mut store, EvalRequest::forces_only());
        assert_eq!(totals, EnergyVirial::default());
        assert!(engine.eatom().is_empty());
        assert!(store.forces().iter().any(|f| f.norm() > 0.0));
    }

    #[test]
    fn ghost_images_reproduce_local_pair_without_newton() {
        // One local pair versus the same pair split across a ghost boundary.
        let mut both_local = ParticleStore::new();
        both_local.add_local(Point3::origin(), 1.0, 0).unwrap();
        both_local.add_local(Point3::new(2.5, 0.0, 0.0), -1.0, 1).unwrap();
        let (_, local_totals) =
            run_bonded(settings(1, true, 0), &mut both_local, &[], EvalRequest::energy());

        let mut with_ghost = ParticleStore::new();
        with_ghost.add_local(Point3::origin(), 1.0, 0).unwrap();
        with_ghost.add_ghost(Point3::new(2.5, 0.0, 0.0), -1.0, 1);
        let (_, ghost_totals) =
            run_bonded(settings(2, false, 0), &mut with_ghost, &[], EvalRequest::energy());

        assert_close(ghost_totals.ecoul, 0.5 * local_totals.ecoul, 1e-12);
        assert_eq!(with_ghost.forces()[0], both_local.forces()[0]);
        assert_eq!(with_ghost.forces()[1], Vector3::zeros());
    }

    #[test]
    fn single_matches_pass_for_isolated_pair() {
        let mut store = ParticleStore::new();
        store.add_local(Point3::origin(), 0.7, 0).unwrap();
        store.add_local(Point3::new(0.0, 3.0, 0.0), -0.3, 1).unwrap();
        let (engine, totals) =
            run_bonded(settings(1, true, 12), &mut store, &[], EvalRequest::energy());

        let pair = engine.single(0.7, -0.3, 0, 1, 9.0, 1.0).unwrap().unwrap();
        assert_close(pair.ecoul, totals.ecoul, 1e-12);
        assert_close(-pair.fpair * 3.0, store.forces()[0].y, 1e-12);
        assert!(engine.single(0.7, -0.3, 0, 1, CUTOFF * CUTOFF, 1.0).unwrap().is_none());
    }

    #[test]
    fn single_rejects_unknown_type() {
        let engine = CoulLong::new(settings(1, true, 0), ScaleMatrix::new(1)).unwrap();
        assert!(matches!(
            engine.single(1.0, 1.0, 0, 1, 4.0, 1.0),
            Err(EngineError::Scale { .. })
        ));
    }

    #[test]
    fn type_scale_multiplies_pair_result() {
        let mut engine = CoulLong::new(settings(1, true, 0), ScaleMatrix::new(2)).unwrap();
        let plain = engine.single(1.0, 1.0, 0, 1, 4.0, 1.0).unwrap().unwrap();
        engine.set_scale(1, 0, 0.25).unwrap();
        let scaled = engine.single(1.0, 1.0, 0, 1, 4.0, 1.0).unwrap().unwrap();
        assert_close(scaled.ecoul, 0.25 * plain.ecoul, 1e-14);
        assert_close(scaled.fpair, 0.25 * plain.fpair, 1e-14);
    }

    #[test]
    fn evaluate_rejects_list_for_other_store() {
        let mut store = lattice(2);
        let special = SpecialBonds::none(store.nall());
        let list = NeighborList::build_half(&store, CUTOFF, 0.0, &special).unwrap();
        store.add_ghost(Point3::new(50.0, 0.0, 0.0), 1.0, 0);

        let mut engine = CoulLong::new(settings(1, true, 0), ScaleMatrix::new(2)).unwrap();
        let result = engine.evaluate(&mut store, &list, EvalRequest::energy());
        assert!(matches!(
            result,
            Err(EngineError::ParticleCountMismatch { list: 8, store: 9 })
        ));
    }

    #[test]
    fn evaluate_rejects_type_outside_scale_matrix() {
        let mut store = lattice(2);
        let special = SpecialBonds::none(store.nall());
        let list = NeighborList::build_half(&store, CUTOFF, 0.0, &special).unwrap();
        let mut engine = CoulLong::new(settings(1, true, 0), ScaleMatrix::new(1)).unwrap();
        assert!(matches!(
            engine.evaluate(&mut store, &list, EvalRequest::energy()),
            Err(EngineError::TypeOutOfRange { index: 1, type_id: 1, ntypes: 1 })
        ));
    }

    #[test]
    fn evaluate_rejects_ghost_row() {
        let mut store = ParticleStore::new();
        store.add_local(Point3::origin(), 1.0, 0).unwrap();
        store.add_ghost(Point3::new(1.0, 0.0, 0.0), 1.0, 0);
        let mut builder = NeighborList::builder(2);
        builder.push_row(1, []).unwrap();
        let list = builder.build();

        let mut engine = CoulLong::new(settings(1, true, 0), ScaleMatrix::new(1)).unwrap();
        assert!(matches!(
            engine.evaluate(&mut store, &list, EvalRequest::energy()),
            Err(EngineError::NotLocal { ii: 0, index: 1, nlocal: 1 })
        ));
    }

    #[test]
    fn inner_cutoff_beyond_cutoff_disables_table() {
        let settings = CoulLongSettingsBuilder::new()
            .cutoff(2.0)
            .g_ewald(0.3)
            .table_inner(3.0)
            .build()
            .unwrap();
        let engine = CoulLong::new(settings, ScaleMatrix::new(1)).unwrap();
        assert!(engine.table().is_none());
    }
}
