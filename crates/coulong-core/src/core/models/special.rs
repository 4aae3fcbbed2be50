use super::neighbor::NeighborError;
use std::collections::{HashMap, VecDeque};

/// Bonded relationship of a neighbor pair, selecting its Coulomb weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[repr(u8)]
pub enum ExclusionClass {
    /// Not bonded within three bonds; full interaction.
    #[default]
    None = 0,
    /// Directly bonded.
    OneTwo = 1,
    /// Separated by two bonds.
    OneThree = 2,
    /// Separated by three bonds.
    OneFour = 3,
}

impl ExclusionClass {
    /// Index into the four-entry special factor table.
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    #[inline]
    pub fn from_bits(bits: u32) -> Self {
        match bits & 3 {
            0 => Self::None,
            1 => Self::OneTwo,
            2 => Self::OneThree,
            _ => Self::OneFour,
        }
    }

    fn from_hops(hops: usize) -> Self {
        match hops {
            1 => Self::OneTwo,
            2 => Self::OneThree,
            3 => Self::OneFour,
            _ => Self::None,
        }
    }
}

/// Per-particle map of bonded partners up to three bonds away.
///
/// When two particles are connected by paths of different length (rings),
/// the shortest path decides the class.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpecialBonds {
    partners: Vec<HashMap<usize, ExclusionClass>>,
}

impl SpecialBonds {
    /// A topology without bonds: every pair interacts fully.
    pub fn none(nparticles: usize) -> Self {
        Self {
            partners: vec![HashMap::new(); nparticles],
        }
    }

    pub fn from_bonds(nparticles: usize, bonds: &[(usize, usize)]) -> Result<Self, NeighborError> {
        let mut adjacency = vec![Vec::new(); nparticles];
        for &(a, b) in bonds {
            for index in [a, b] {
                if index >= nparticles {
                    return Err(NeighborError::IndexOutOfRange {
                        index,
                        nall: nparticles,
                    });
                }
            }
            if a == b {
                return Err(NeighborError::SelfBond(a));
            }
            adjacency[a].push(b);
            adjacency[b].push(a);
        }

        let partners = (0..nparticles)
            .map(|origin| bonded_partners(origin, &adjacency))
            .collect();
        Ok(Self { partners })
    }

    #[inline]
    pub fn class(&self, i: usize, j: usize) -> ExclusionClass {
        self.partners
            .get(i)
            .and_then(|map| map.get(&j))
            .copied()
            .unwrap_or_default()
    }

    /// Number of particles covered.
    pub fn len(&self) -> usize {
        self.partners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.partners.is_empty()
    }
}

fn bonded_partners(origin: usize, adjacency: &[Vec<usize>]) -> HashMap<usize, ExclusionClass> {
    let mut found = HashMap::new();
    let mut queue = VecDeque::from([(origin, 0usize)]);
    while let Some((current, hops)) = queue.pop_front() {
        if hops == 3 {
            continue;
        }
        for &next in &adjacency[current] {
            if next == origin || found.contains_key(&next) {
                continue;
            }
            found.insert(next, ExclusionClass::from_hops(hops + 1));
            queue.push_back((next, hops + 1));
        }
    }
    found
}
