/// How the global virial of a pass is obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VirialMode {
    #[default]
    None,
    /// Summed pair by pair during the pass.
    Pairwise,
    /// Computed after the reduction as `Σ xᵢ ⊗ Δfᵢ` over all particles.
    /// Requires Newton's third law; otherwise the pairwise sum is used.
    FdotR,
}

/// Quantities requested from one evaluation pass. Forces are always computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EvalRequest {
    pub energy: bool,
    pub energy_per_atom: bool,
    pub virial: VirialMode,
    pub virial_per_atom: bool,
}

impl EvalRequest {
    pub fn forces_only() -> Self {
        Self::default()
    }

    pub fn energy() -> Self {
        Self {
            energy: true,
            ..Self::default()
        }
    }

    pub fn energy_and_virial(virial: VirialMode) -> Self {
        Self {
            energy: true,
            virial,
            ..Self::default()
        }
    }

    pub fn everything() -> Self {
        Self {
            energy: true,
            energy_per_atom: true,
            virial: VirialMode::Pairwise,
            virial_per_atom: true,
        }
    }
}

/// Per-pass switches resolved from a request and the Newton setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct EvalFlags {
    pub eflag_global: bool,
    pub eflag_atom: bool,
    pub vflag_global: bool,
    pub vflag_atom: bool,
    pub vflag_fdotr: bool,
}

impl EvalFlags {
    pub fn setup(request: EvalRequest, newton_pair: bool) -> Self {
        let mut flags = Self {
            eflag_global: request.energy,
            eflag_atom: request.energy_per_atom,
            vflag_global: request.virial != VirialMode::None,
            vflag_atom: request.virial_per_atom,
            vflag_fdotr: false,
        };
        if request.virial == VirialMode::FdotR && newton_pair {
            flags.vflag_fdotr = true;
            flags.vflag_global = false;
        }
        flags
    }

    /// Whether the kernel must tally per-pair energy or virial.
    #[inline]
    pub fn evflag(&self) -> bool {
        self.eflag_global || self.eflag_atom || self.vflag_global || self.vflag_atom
    }

    #[inline]
    pub fn eflag(&self) -> bool {
        self.eflag_global || self.eflag_atom
    }

    #[inline]
    pub fn vflag(&self) -> bool {
        self.vflag_global || self.vflag_atom
    }
}
