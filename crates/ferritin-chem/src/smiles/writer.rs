//! Canonical SMILES writer.
//!
//! Each connected component is written depth first from its lowest ranked
//! atom, neighbours visited in rank order. The last child continues the main
//! chain, earlier children become branches. Ring closures take the lowest free
//! digit.
use crate::canon;
use crate::element::{self, NITROGEN, PHOSPHORUS};
use crate::molecule::{BondOrder, BondStereo, Molecule, StereoRef, Tetrahedral};
use itertools::Itertools;
use std::collections::HashMap;

const MAX_RANKINGS: usize = 64;

/// Canonical SMILES for an already sanitized molecule.
///
/// With stereo to write, every ranking from [`canon::candidate_rankings`] is
/// rendered and the smallest string wins, so the result doesn't depend on how
/// ties between symmetry-equivalent atoms were broken.
pub fn write(mol: &Molecule, isomeric: bool) -> String {
    if mol.is_empty() {
        return String::new();
    }
    let classes = canon::symmetry_classes(mol, isomeric);
    let mut chirality = if isomeric {
        valid_chirality(mol)
    } else {
        vec![None; mol.num_atoms()]
    };
    let bond_stereo = isomeric && mol.bonds().iter().any(|b| b.stereo != BondStereo::None);
    let limit = if bond_stereo || chirality.iter().any(Option::is_some) {
        MAX_RANKINGS
    } else {
        1
    };
    let rankings = canon::candidate_rankings(mol, isomeric, limit);

    // a centre whose mirror image writes the same molecule isn't a stereocentre
    for idx in 0..mol.num_atoms() {
        let Some(chiral) = chirality[idx] else {
            continue;
        };
        if !has_equivalent_neighbors(&chiral, &classes) {
            continue;
        }
        let kept = best_string(mol, isomeric, &rankings, &chirality, &classes);
        chirality[idx] = Some(Tetrahedral {
            clockwise: !chiral.clockwise,
            ..chiral
        });
        let mirrored = best_string(mol, isomeric, &rankings, &chirality, &classes);
        chirality[idx] = (kept != mirrored).then_some(chiral);
    }
    best_string(mol, isomeric, &rankings, &chirality, &classes)
}

fn best_string(
    mol: &Molecule,
    isomeric: bool,
    rankings: &[Vec<usize>],
    chirality: &[Option<Tetrahedral>],
    classes: &[usize],
) -> String {
    rankings
        .iter()
        .map(|ranks| render(mol, isomeric, ranks, chirality, classes))
        .min()
        .unwrap_or_default()
}

fn render(
    mol: &Molecule,
    isomeric: bool,
    ranks: &[usize],
    chirality: &[Option<Tetrahedral>],
    classes: &[usize],
) -> String {
    let traversal = Traversal::new(mol, ranks);
    let directions = if isomeric {
        bond_directions(mol, classes, &traversal)
    } else {
        vec![None; mol.num_bonds()]
    };

    let mut writer = Writer {
        mol,
        isomeric,
        traversal: &traversal,
        chirality,
        directions,
        in_use: [false; 100],
        digits: HashMap::new(),
        out: String::new(),
    };
    traversal
        .roots
        .iter()
        .map(|&root| {
            writer.out.clear();
            writer.write_atom(root);
            writer.out.clone()
        })
        .join(".")
}

/// Depth first spanning forest in output order.
struct Traversal {
    roots: Vec<usize>,
    position: Vec<usize>,
    parent: Vec<Option<(usize, usize)>>,
    children: Vec<Vec<(usize, usize)>>,
    ring_bonds: Vec<Vec<(usize, usize)>>,
}

impl Traversal {
    fn new(mol: &Molecule, ranks: &[usize]) -> Self {
        let n = mol.num_atoms();
        let mut traversal = Self {
            roots: Vec::new(),
            position: vec![usize::MAX; n],
            parent: vec![None; n],
            children: vec![Vec::new(); n],
            ring_bonds: vec![Vec::new(); n],
        };
        let mut used = vec![false; mol.num_bonds()];
        let mut next = 0;
        let by_rank = (0..n).sorted_by_key(|&a| ranks[a]);
        for atom in by_rank {
            if traversal.position[atom] == usize::MAX {
                traversal.roots.push(atom);
                traversal.visit(mol, ranks, atom, &mut used, &mut next);
            }
        }
        traversal
    }

    fn visit(&mut self, mol: &Molecule, ranks: &[usize], atom: usize, used: &mut [bool], next: &mut usize) {
        self.position[atom] = *next;
        *next += 1;
        let neighbors = mol
            .neighbors(atom)
            .iter()
            .copied()
            .sorted_by_key(|(nbr, _)| ranks[*nbr]);
        for (nbr, bond) in neighbors {
            if used[bond] {
                continue;
            }
            used[bond] = true;
            if self.position[nbr] != usize::MAX {
                self.ring_bonds[atom].push((nbr, bond));
                self.ring_bonds[nbr].push((atom, bond));
            } else {
                self.parent[nbr] = Some((atom, bond));
                self.children[atom].push((nbr, bond));
                self.visit(mol, ranks, nbr, used, next);
            }
        }
    }

    fn is_tree_bond(&self, bond: usize, atom: usize) -> bool {
        self.parent[atom].is_some_and(|(_, b)| b == bond)
            || self.children[atom].iter().any(|(_, b)| *b == bond)
    }
}

struct Writer<'a> {
    mol: &'a Molecule,
    isomeric: bool,
    traversal: &'a Traversal,
    chirality: &'a [Option<Tetrahedral>],
    /// `/` (+1) or `\` (-1) for tree bonds, read from parent to child
    directions: Vec<Option<i8>>,
    in_use: [bool; 100],
    digits: HashMap<usize, usize>,
    out: String,
}

impl Writer<'_> {
    fn write_atom(&mut self, atom: usize) {
        let t = self.traversal;
        let position = t.position[atom];

        let (mut closing, mut opening): (Vec<(usize, usize)>, Vec<(usize, usize)>) = t.ring_bonds
            [atom]
            .iter()
            .partition(|(partner, _)| t.position[*partner] < position);
        closing.sort_by_key(|(_, bond)| self.digits.get(bond).copied().unwrap_or(0));
        opening.sort_by_key(|(partner, _)| t.position[*partner]);

        let mut order: Vec<StereoRef> = Vec::with_capacity(4);
        if let Some((parent, _)) = t.parent[atom] {
            order.push(StereoRef::Atom(parent));
        }
        let chirality = self.chirality[atom].and_then(|chiral| {
            if chiral.refs.contains(&StereoRef::Implicit) {
                order.push(StereoRef::Implicit);
            }
            order.extend(closing.iter().chain(opening.iter()).map(|(p, _)| StereoRef::Atom(*p)));
            order.extend(t.children[atom].iter().map(|(c, _)| StereoRef::Atom(*c)));
            let order: [StereoRef; 4] = order.as_slice().try_into().ok()?;
            chiral.reordered(order)
        });
        self.out.push_str(&self.atom_token(atom, chirality.map(|c| c.clockwise)));

        let mut released = Vec::new();
        for (_, bond) in &closing {
            if let Some(digit) = self.digits.remove(bond) {
                self.out.push_str(&ring_label(digit));
                released.push(digit);
            }
        }
        for (partner, bond) in &opening {
            let digit = (1..100)
                .find(|d| !self.in_use[*d] && !released.contains(d))
                .unwrap_or(99);
            self.in_use[digit] = true;
            self.digits.insert(*bond, digit);
            let symbol = self.bond_token(*bond, atom, *partner);
            self.out.push_str(&symbol);
            self.out.push_str(&ring_label(digit));
        }
        for digit in released {
            self.in_use[digit] = false;
        }

        let children = &t.children[atom];
        for (i, (child, bond)) in children.iter().enumerate() {
            let branch = i + 1 < children.len();
            if branch {
                self.out.push('(');
            }
            let symbol = self.bond_token(*bond, atom, *child);
            self.out.push_str(&symbol);
            self.write_atom(*child);
            if branch {
                self.out.push(')');
            }
        }
    }

    fn bond_token(&self, bond: usize, from: usize, to: usize) -> String {
        if let Some(direction) = self.directions[bond] {
            let symbol = if direction > 0 { "/" } else { "\\" };
            return symbol.to_string();
        }
        let b = self.mol.bond(bond);
        if b.aromatic {
            return String::new();
        }
        match b.order {
            BondOrder::Single => {
                let both_aromatic = self.mol.atom(from).aromatic && self.mol.atom(to).aromatic;
                let symbol = if both_aromatic { "-" } else { "" };
                symbol.to_string()
            }
            order => order.to_string(),
        }
    }

    fn atom_token(&self, idx: usize, clockwise: Option<bool>) -> String {
        let atom = self.mol.atom(idx);
        let isotope = atom.isotope.filter(|_| self.isomeric);
        let z = atom.atomic_number;
        let symbol = if atom.aromatic {
            atom.symbol().to_lowercase()
        } else {
            atom.symbol()
        };

        let organic = isotope.is_none()
            && clockwise.is_none()
            && atom.charge == 0
            && element::is_organic_subset(z)
            && (!atom.aromatic || element::is_aromatic_organic(z))
            && !(atom.aromatic && matches!(z, NITROGEN | PHOSPHORUS) && atom.hydrogens > 0)
            && atom.hydrogens == implied_hydrogens(self.mol, idx);
        if organic {
            return symbol;
        }

        let mut token = String::from("[");
        if let Some(isotope) = isotope {
            token.push_str(&isotope.to_string());
        }
        token.push_str(&symbol);
        match clockwise {
            Some(true) => token.push_str("@@"),
            Some(false) => token.push('@'),
            None => {}
        }
        match atom.hydrogens {
            0 => {}
            1 => token.push('H'),
            h => token.push_str(&format!("H{h}")),
        }
        match atom.charge {
            0 => {}
            1 => token.push('+'),
            -1 => token.push('-'),
            c if c > 0 => token.push_str(&format!("+{c}")),
            c => token.push_str(&c.to_string()),
        }
        token.push(']');
        token
    }
}

fn ring_label(digit: usize) -> String {
    if digit < 10 {
        digit.to_string()
    } else {
        format!("%{digit}")
    }
}

/// Hydrogens a reader assigns to the atom when it is written without brackets.
fn implied_hydrogens(mol: &Molecule, idx: usize) -> u8 {
    let valence = mol.bond_valence(idx);
    element::default_valences(mol.atom(idx).atomic_number)
        .iter()
        .find(|v| **v >= valence)
        .map_or(0, |v| v - valence)
}

/// Tetrahedral centres whose references are bonded neighbours with at most
/// one implicit hydrogen.
fn valid_chirality(mol: &Molecule) -> Vec<Option<Tetrahedral>> {
    (0..mol.num_atoms())
        .map(|idx| {
            let chiral = mol.atom(idx).chirality?;
            let mut implicit = 0;
            for r in chiral.refs {
                match r {
                    StereoRef::Implicit => implicit += 1,
                    StereoRef::Atom(a) if mol.bond_between(idx, a).is_none() => return None,
                    StereoRef::Atom(_) => {}
                }
            }
            (implicit <= 1).then_some(chiral)
        })
        .collect()
}

fn has_equivalent_neighbors(chiral: &Tetrahedral, classes: &[usize]) -> bool {
    let atoms: Vec<usize> = chiral
        .refs
        .iter()
        .filter_map(|r| match r {
            StereoRef::Atom(a) => Some(classes[*a]),
            StereoRef::Implicit => None,
        })
        .collect();
    atoms.iter().enumerate().any(|(i, c)| atoms[i + 1..].contains(c))
}

/// `/` `\` marks for every double bond whose configuration survives.
///
/// The first mark written for a double bond is `/` unless a neighbouring
/// double bond already fixed it. The other end follows from the stored
/// cis/trans relation.
fn bond_directions(mol: &Molecule, classes: &[usize], t: &Traversal) -> Vec<Option<i8>> {
    let mut directions: Vec<Option<i8>> = vec![None; mol.num_bonds()];
    let stereo_bonds = (0..mol.num_bonds())
        .filter(|&b| mol.bond(b).stereo != BondStereo::None && !mol.is_ring_bond(b))
        .sorted_by_key(|&b| {
            let bond = mol.bond(b);
            t.position[bond.begin].min(t.position[bond.end])
        });

    for b in stereo_bonds {
        let bond = mol.bond(b);
        let (ra, rb, trans) = match bond.stereo {
            BondStereo::Cis(ra, rb) => (ra, rb, false),
            BondStereo::Trans(ra, rb) => (ra, rb, true),
            BondStereo::None => continue,
        };
        if !distinct_substituents(mol, classes, bond.begin, b) || !distinct_substituents(mol, classes, bond.end, b) {
            continue;
        }
        // both ends need a single tree bond to carry a mark
        let (Some(&first_a), Some(&first_b)) = (
            candidate_bonds(mol, t, bond.begin, b).first(),
            candidate_bonds(mol, t, bond.end, b).first(),
        ) else {
            continue;
        };

        let side_a = existing_side(mol, t, &directions, bond.begin, b, ra);
        let side_b = existing_side(mol, t, &directions, bond.end, b, rb);
        let flip = |s: i8| if trans { -s } else { s };
        match (side_a, side_b) {
            (Some(_), Some(_)) => {}
            (Some(sa), None) => assign_side(mol, t, &mut directions, bond.end, b, rb, flip(sa)),
            (None, Some(sb)) => assign_side(mol, t, &mut directions, bond.begin, b, ra, flip(sb)),
            (None, None) => {
                let (atom, reference, (nbr, first), other, other_reference) =
                    if written_at(t, bond.begin, first_a) < written_at(t, bond.end, first_b) {
                        (bond.begin, ra, first_a, bond.end, rb)
                    } else {
                        (bond.end, rb, first_b, bond.begin, ra)
                    };
                directions[first] = Some(1);
                let side = mark_side(t, atom, nbr, 1);
                let side = if nbr == reference { side } else { -side };
                assign_side(mol, t, &mut directions, other, b, other_reference, flip(side));
            }
        }
    }
    directions
}

fn distinct_substituents(mol: &Molecule, classes: &[usize], atom: usize, double: usize) -> bool {
    let others: Vec<usize> = mol
        .neighbors(atom)
        .iter()
        .filter(|(_, b)| *b != double)
        .map(|(nbr, _)| *nbr)
        .collect();
    match others.as_slice() {
        [_] => true,
        [x, y] => classes[*x] != classes[*y],
        _ => false,
    }
}

/// Output position of the tree bond between `atom` and `nbr`: the bond is
/// written just before the later of its two atoms.
fn written_at(t: &Traversal, atom: usize, (nbr, _): (usize, usize)) -> usize {
    t.position[atom].max(t.position[nbr])
}

/// Side of `nbr` as seen from `atom` when their bond carries direction `d`,
/// read from parent to child.
fn mark_side(t: &Traversal, atom: usize, nbr: usize, d: i8) -> i8 {
    if t.position[nbr] < t.position[atom] {
        d
    } else {
        -d
    }
}

/// Single tree bonds of `atom` other than the double bond, in output order.
fn candidate_bonds(mol: &Molecule, t: &Traversal, atom: usize, double: usize) -> Vec<(usize, usize)> {
    mol.neighbors(atom)
        .iter()
        .filter(|(_, b)| {
            *b != double
                && t.is_tree_bond(*b, atom)
                && mol.bond(*b).order == BondOrder::Single
                && !mol.bond(*b).aromatic
        })
        .copied()
        .sorted_by_key(|&pair| written_at(t, atom, pair))
        .collect()
}

/// Side of `reference` as seen from `atom`, from the first marked bond.
fn existing_side(
    mol: &Molecule,
    t: &Traversal,
    directions: &[Option<i8>],
    atom: usize,
    double: usize,
    reference: usize,
) -> Option<i8> {
    candidate_bonds(mol, t, atom, double)
        .into_iter()
        .find_map(|(nbr, b)| {
            let side = mark_side(t, atom, nbr, directions[b]?);
            Some(if nbr == reference { side } else { -side })
        })
}

/// Mark the first bond of `atom` so that `reference` ends up on `side`.
fn assign_side(
    mol: &Molecule,
    t: &Traversal,
    directions: &mut [Option<i8>],
    atom: usize,
    double: usize,
    reference: usize,
    side: i8,
) {
    if let Some(&(nbr, b)) = candidate_bonds(mol, t, atom, double).first() {
        let nbr_side = if nbr == reference { side } else { -side };
        directions[b] = Some(mark_side(t, atom, nbr, nbr_side));
    }
}

#[cfg(test)]
mod tests {
    use crate::molecule::Molecule;

    fn canonical(smiles: &str, isomeric: bool) -> String {
        Molecule::from_smiles(smiles).unwrap().to_smiles(isomeric)
    }

    #[test]
    fn test_simple_molecules() {
        assert_eq!(canonical("C1=CC=CC=C1", false), "c1ccccc1");
        assert_eq!(canonical("OCC", false), "CCO");
        assert_eq!(canonical("C", false), "C");
        assert_eq!(canonical("[CH4]", false), "C");
    }

    #[test]
    fn test_independent_of_input_order() {
        let groups = [
            vec!["CC(=O)O", "OC(C)=O", "O=C(O)C"],
            vec!["c1ccncc1", "n1ccccc1", "C1=CC=NC=C1"],
            vec!["CC(=O)Nc1ccc(O)cc1", "Oc1ccc(NC(C)=O)cc1"],
            vec!["c1ccc2ccccc2c1", "C1=CC=C2C=CC=CC2=C1"],
            vec!["C[N+](C)(C)C.[Cl-]", "[Cl-].C[N+](C)(C)C"],
        ];
        for group in groups {
            let first = canonical(group[0], true);
            for smiles in &group[1..] {
                assert_eq!(canonical(smiles, true), first, "{smiles}");
            }
        }
    }

    #[test]
    fn test_output_reparses_to_itself() {
        for smiles in [
            "c1cc[nH]c1",
            "O=c1cccc[nH]1",
            "C[n+]1ccccc1",
            "[13CH3]C",
            "N[C@@H](C)C(=O)O",
            "F/C=C/F",
            "C1CC2CCC1CC2",
            "[Na+].[O-]C(=O)C",
        ] {
            let once = canonical(smiles, true);
            assert_eq!(canonical(&once, true), once, "{smiles} -> {once}");
        }
    }

    #[test]
    fn test_stereo_output() {
        let l_ala = canonical("N[C@@H](C)C(=O)O", true);
        let d_ala = canonical("N[C@H](C)C(=O)O", true);
        assert_ne!(l_ala, d_ala);
        assert_eq!(canonical("C[C@H](N)C(=O)O", true), l_ala);
        assert_eq!(canonical("N[C@@H](C)C(=O)O", false), canonical("NC(C)C(=O)O", false));

        assert_ne!(canonical("F/C=C/F", true), canonical("F/C=C\\F", true));
        assert_eq!(canonical("F/C=C/F", true), canonical("F\\C=C\\F", true));
        // symmetric substituents carry no stereo
        assert_eq!(canonical("C[C@H](C)O", true), "CC(C)O");
    }

    #[test]
    fn test_double_bond_marks_follow_output_order() {
        let trans = [
            "C/C=C/C(=O)O",
            "C\\C=C\\C(=O)O",
            "OC(=O)/C=C/C",
            "OC(=O)\\C=C\\C",
        ];
        let cis = [
            "C/C=C\\C(=O)O",
            "C\\C=C/C(=O)O",
            "OC(=O)/C=C\\C",
            "OC(=O)\\C=C/C",
        ];
        let expected_trans = canonical(trans[0], true);
        let expected_cis = canonical(cis[0], true);
        assert_ne!(expected_trans, expected_cis);
        for smiles in trans {
            assert_eq!(canonical(smiles, true), expected_trans, "{smiles}");
        }
        for smiles in cis {
            assert_eq!(canonical(smiles, true), expected_cis, "{smiles}");
        }
        // the first mark written is always a forward slash
        assert!(expected_trans.find('/') < expected_trans.find('\\').or(Some(usize::MAX)));
        assert_eq!(canonical("F/C=C/Cl", true), canonical("Cl/C=C/F", true));
        assert_eq!(canonical("F\\C=C\\Cl", true), canonical("Cl/C=C/F", true));
    }

    #[test]
    fn test_ring_cis_trans_centres() {
        let cis = ["C[C@H]1CC[C@@H](C)CC1", "C[C@@H]1CC[C@H](C)CC1", "C1C[C@@H](C)CC[C@H]1C"];
        let trans = ["C[C@H]1CC[C@H](C)CC1", "C[C@@H]1CC[C@@H](C)CC1", "C1C[C@H](C)CC[C@H]1C"];
        let expected_cis = canonical(cis[0], true);
        let expected_trans = canonical(trans[0], true);
        assert_ne!(expected_cis, expected_trans);
        assert!(expected_cis.contains('@'), "{expected_cis}");
        for smiles in cis {
            assert_eq!(canonical(smiles, true), expected_cis, "{smiles}");
        }
        for smiles in trans {
            assert_eq!(canonical(smiles, true), expected_trans, "{smiles}");
        }
        assert_eq!(canonical(&expected_cis, true), expected_cis);
        assert_eq!(canonical(&expected_trans, true), expected_trans);
    }

    #[test]
    fn test_isotopes_need_isomeric_output() {
        assert_eq!(canonical("[13CH3]C", true), "C[13CH3]");
        assert_eq!(canonical("[13CH3]C", false), "CC");
    }
}
