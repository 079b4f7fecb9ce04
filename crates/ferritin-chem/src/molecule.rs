//! Molecule graph.
//!
//! Atoms and bonds are stored in flat vectors; an adjacency list of
//! `(neighbor, bond index)` pairs is kept in sync by [`Molecule::add_bond`].
//! Hydrogens are normally carried as per-atom counts. Explicit hydrogen atoms
//! only exist when they were written as `[H]` and have not been removed.
use crate::element;
use crate::error::Result;
use strum::Display;

/// A neighbour slot in a tetrahedral stereo description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StereoRef {
    Atom(usize),
    /// Implicit hydrogen or lone pair.
    Implicit,
}

/// Tetrahedral configuration.
///
/// Looking from `refs[0]`, the remaining three references are arranged
/// anticlockwise (`@`) unless `clockwise` is set (`@@`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tetrahedral {
    pub refs: [StereoRef; 4],
    pub clockwise: bool,
}

impl Tetrahedral {
    /// The same configuration described with `order`, a permutation of `self.refs`.
    pub fn reordered(&self, order: [StereoRef; 4]) -> Option<Tetrahedral> {
        let mut perm = [0usize; 4];
        let mut used = [false; 4];
        for (slot, r) in order.iter().enumerate() {
            let pos = (0..4).find(|&i| !used[i] && self.refs[i] == *r)?;
            used[pos] = true;
            perm[slot] = pos;
        }
        Some(Tetrahedral {
            refs: order,
            clockwise: self.clockwise ^ is_odd_permutation(&perm),
        })
    }
}

fn is_odd_permutation(perm: &[usize]) -> bool {
    let mut inversions = 0;
    for i in 0..perm.len() {
        for j in i + 1..perm.len() {
            if perm[i] > perm[j] {
                inversions += 1;
            }
        }
    }
    inversions % 2 == 1
}

/// Kekulé bond order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display)]
pub enum BondOrder {
    #[strum(serialize = "-")]
    Single,
    #[strum(serialize = "=")]
    Double,
    #[strum(serialize = "#")]
    Triple,
    #[strum(serialize = "$")]
    Quadruple,
}

impl BondOrder {
    pub fn valence(&self) -> u8 {
        match self {
            BondOrder::Single => 1,
            BondOrder::Double => 2,
            BondOrder::Triple => 3,
            BondOrder::Quadruple => 4,
        }
    }
}

/// Cis/trans configuration of a double bond, relative to one reference
/// neighbour on each end (`(neighbor of begin, neighbor of end)`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BondStereo {
    #[default]
    None,
    Cis(usize, usize),
    Trans(usize, usize),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    pub atomic_number: u8,
    pub isotope: Option<u16>,
    pub charge: i8,
    /// Hydrogens carried by the atom (not counting explicit hydrogen atoms).
    pub hydrogens: u8,
    pub aromatic: bool,
    pub chirality: Option<Tetrahedral>,
    /// Written in brackets, so the hydrogen count is fixed.
    pub bracket: bool,
}

impl Atom {
    pub fn new(atomic_number: u8) -> Self {
        Self {
            atomic_number,
            isotope: None,
            charge: 0,
            hydrogens: 0,
            aromatic: false,
            chirality: None,
            bracket: false,
        }
    }

    pub fn symbol(&self) -> String {
        element::symbol(self.atomic_number)
    }

    pub fn is_hydrogen(&self) -> bool {
        self.atomic_number == element::HYDROGEN
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bond {
    pub begin: usize,
    pub end: usize,
    pub order: BondOrder,
    pub aromatic: bool,
    pub stereo: BondStereo,
}

impl Bond {
    pub fn other(&self, atom: usize) -> usize {
        if self.begin == atom {
            self.end
        } else {
            self.begin
        }
    }

    pub fn contains(&self, atom: usize) -> bool {
        self.begin == atom || self.end == atom
    }
}

/// A perceived ring: atoms in cycle order and the bonds closing the cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ring {
    pub atoms: Vec<usize>,
    pub bonds: Vec<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct Molecule {
    atoms: Vec<Atom>,
    bonds: Vec<Bond>,
    adjacency: Vec<Vec<(usize, usize)>>,
    rings: Vec<Ring>,
    ring_bonds: Vec<bool>,
}

impl Molecule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and sanitize a SMILES string.
    pub fn from_smiles(smiles: &str) -> Result<Self> {
        let mut mol = crate::smiles::parse(smiles)?;
        mol.sanitize()?;
        Ok(mol)
    }

    /// Canonical SMILES. Stereo descriptors and isotopes are only written when `isomeric`.
    pub fn to_smiles(&self, isomeric: bool) -> String {
        crate::smiles::write(self, isomeric)
    }

    /// Kekulize, assign implicit hydrogens, check valences and perceive rings and aromaticity.
    pub fn sanitize(&mut self) -> Result<()> {
        crate::sanitize::sanitize(self)
    }

    pub fn add_atom(&mut self, atom: Atom) -> usize {
        self.atoms.push(atom);
        self.adjacency.push(Vec::new());
        self.atoms.len() - 1
    }

    pub fn add_bond(&mut self, begin: usize, end: usize, order: BondOrder, aromatic: bool) -> usize {
        let idx = self.bonds.len();
        self.bonds.push(Bond {
            begin,
            end,
            order,
            aromatic,
            stereo: BondStereo::None,
        });
        self.adjacency[begin].push((end, idx));
        self.adjacency[end].push((begin, idx));
        self.ring_bonds.push(false);
        idx
    }

    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    pub fn bonds(&self) -> &[Bond] {
        &self.bonds
    }

    pub fn atom(&self, idx: usize) -> &Atom {
        &self.atoms[idx]
    }

    pub fn bond(&self, idx: usize) -> &Bond {
        &self.bonds[idx]
    }

    pub(crate) fn atom_mut(&mut self, idx: usize) -> &mut Atom {
        &mut self.atoms[idx]
    }

    pub(crate) fn bond_mut(&mut self, idx: usize) -> &mut Bond {
        &mut self.bonds[idx]
    }

    pub fn num_atoms(&self) -> usize {
        self.atoms.len()
    }

    pub fn num_bonds(&self) -> usize {
        self.bonds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    /// `(neighbor, bond index)` pairs in insertion order.
    pub fn neighbors(&self, atom: usize) -> &[(usize, usize)] {
        &self.adjacency[atom]
    }

    pub fn bond_between(&self, a: usize, b: usize) -> Option<usize> {
        self.adjacency[a]
            .iter()
            .find(|(nbr, _)| *nbr == b)
            .map(|(_, bond)| *bond)
    }

    pub fn degree(&self, atom: usize) -> usize {
        self.adjacency[atom].len()
    }

    pub fn heavy_degree(&self, atom: usize) -> usize {
        self.adjacency[atom]
            .iter()
            .filter(|(nbr, _)| !self.atoms[*nbr].is_hydrogen())
            .count()
    }

    /// Carried hydrogens plus bonded hydrogen atoms.
    pub fn total_hydrogens(&self, atom: usize) -> u8 {
        let explicit = self.degree(atom) - self.heavy_degree(atom);
        self.atoms[atom].hydrogens + explicit as u8
    }

    /// Sum of Kekulé bond orders, without hydrogens.
    pub fn bond_valence(&self, atom: usize) -> u8 {
        self.adjacency[atom]
            .iter()
            .map(|(_, bond)| self.bonds[*bond].order.valence())
            .sum()
    }

    pub fn valence(&self, atom: usize) -> u8 {
        self.bond_valence(atom) + self.atoms[atom].hydrogens
    }

    pub fn rings(&self) -> &[Ring] {
        &self.rings
    }

    pub fn is_ring_bond(&self, bond: usize) -> bool {
        self.ring_bonds[bond]
    }

    pub fn is_ring_atom(&self, atom: usize) -> bool {
        self.adjacency[atom]
            .iter()
            .any(|(_, bond)| self.ring_bonds[*bond])
    }

    pub(crate) fn set_rings(&mut self, rings: Vec<Ring>) {
        self.ring_bonds = vec![false; self.bonds.len()];
        for ring in &rings {
            for &bond in &ring.bonds {
                self.ring_bonds[bond] = true;
            }
        }
        self.rings = rings;
    }

    /// Copy of the molecule with plain explicit hydrogens folded into their
    /// heavy neighbours.
    ///
    /// Only `[H]` atoms without isotope or charge, bonded by a single bond to
    /// exactly one non-hydrogen atom, are removed. Tetrahedral references to a
    /// removed hydrogen become implicit; double bond references move to the
    /// other substituent.
    pub fn remove_hs(&self) -> Molecule {
        let removable: Vec<bool> = (0..self.num_atoms())
            .map(|idx| {
                let atom = &self.atoms[idx];
                if !atom.is_hydrogen() || atom.isotope.is_some() || atom.charge != 0 {
                    return false;
                }
                match self.adjacency[idx].as_slice() {
                    [(nbr, bond)] => {
                        !self.atoms[*nbr].is_hydrogen()
                            && self.bonds[*bond].order == BondOrder::Single
                    }
                    _ => false,
                }
            })
            .collect();
        if !removable.iter().any(|r| *r) {
            return self.clone();
        }

        let mut atoms = self.atoms.clone();
        for (idx, _) in removable.iter().enumerate().filter(|(_, r)| **r) {
            let parent = self.adjacency[idx][0].0;
            atoms[parent].hydrogens += 1;
            if let Some(chiral) = atoms[parent].chirality.as_mut() {
                for r in chiral.refs.iter_mut() {
                    if *r == StereoRef::Atom(idx) {
                        *r = StereoRef::Implicit;
                    }
                }
            }
        }

        let mut mapping = vec![None; self.num_atoms()];
        let mut mol = Molecule::new();
        for (idx, atom) in atoms.into_iter().enumerate() {
            if !removable[idx] {
                mapping[idx] = Some(mol.add_atom(atom));
            }
        }
        for atom in mol.atoms.iter_mut() {
            if let Some(chiral) = atom.chirality {
                let implicit = chiral
                    .refs
                    .iter()
                    .filter(|r| **r == StereoRef::Implicit)
                    .count();
                atom.chirality = if implicit > 1 {
                    None
                } else {
                    let mut refs = chiral.refs;
                    for r in refs.iter_mut() {
                        if let StereoRef::Atom(old) = *r {
                            *r = mapping[old].map_or(StereoRef::Implicit, StereoRef::Atom);
                        }
                    }
                    Some(Tetrahedral {
                        refs,
                        clockwise: chiral.clockwise,
                    })
                };
            }
        }

        for bond in &self.bonds {
            let (Some(begin), Some(end)) = (mapping[bond.begin], mapping[bond.end]) else {
                continue;
            };
            let idx = mol.add_bond(begin, end, bond.order, bond.aromatic);
            mol.bonds[idx].stereo = self.remap_bond_stereo(bond, &mapping);
        }

        let rings = self
            .rings
            .iter()
            .map(|ring| Ring {
                atoms: ring.atoms.iter().filter_map(|a| mapping[*a]).collect(),
                bonds: Vec::new(),
            })
            .collect::<Vec<_>>();
        let rings = rings
            .into_iter()
            .map(|ring| {
                let n = ring.atoms.len();
                let bonds = (0..n)
                    .filter_map(|i| mol.bond_between(ring.atoms[i], ring.atoms[(i + 1) % n]))
                    .collect();
                Ring { bonds, ..ring }
            })
            .collect();
        mol.set_rings(rings);
        mol
    }

    fn remap_bond_stereo(&self, bond: &Bond, mapping: &[Option<usize>]) -> BondStereo {
        let (ra, rb, cis) = match bond.stereo {
            BondStereo::None => return BondStereo::None,
            BondStereo::Cis(ra, rb) => (ra, rb, true),
            BondStereo::Trans(ra, rb) => (ra, rb, false),
        };
        let mut cis = cis;
        let mut resolve = |end: usize, other_end: usize, r: usize| -> Option<usize> {
            if let Some(mapped) = mapping[r] {
                return Some(mapped);
            }
            // swap to the remaining substituent, which lies on the opposite side
            let alt = self.adjacency[end]
                .iter()
                .map(|(nbr, _)| *nbr)
                .find(|nbr| *nbr != other_end && *nbr != r)?;
            cis = !cis;
            mapping[alt]
        };
        let ra = resolve(bond.begin, bond.end, ra);
        let rb = resolve(bond.end, bond.begin, rb);
        match (ra, rb) {
            (Some(ra), Some(rb)) if cis => BondStereo::Cis(ra, rb),
            (Some(ra), Some(rb)) => BondStereo::Trans(ra, rb),
            _ => BondStereo::None,
        }
    }
}
