//! Sanitization: Kekulé assignment, implicit hydrogens, valence checks,
//! ring perception and aromaticity.
//!
//! Running it twice gives the same molecule.
use crate::element::{self, BORON, CARBON, NITROGEN, OXYGEN, PHOSPHORUS, SELENIUM, SULFUR, TELLURIUM};
use crate::error::{ChemError, Result};
use crate::molecule::{BondOrder, Molecule, Ring};
use std::collections::{HashMap, HashSet, VecDeque};

const ARSENIC: u8 = 33;
const KEKULIZE_BUDGET: usize = 100_000;
const MAX_ENUMERATED_RINGS: usize = 16;

pub fn sanitize(mol: &mut Molecule) -> Result<()> {
    kekulize(mol)?;
    assign_implicit_hydrogens(mol);
    check_valences(mol)?;
    let rings = find_rings(mol);
    mol.set_rings(rings);
    perceive_aromaticity(mol);
    Ok(())
}

/// Replace aromatic bonds by an alternating single/double assignment.
fn kekulize(mol: &mut Molecule) -> Result<()> {
    let aromatic_bonds: Vec<usize> = (0..mol.num_bonds())
        .filter(|&b| mol.bond(b).aromatic)
        .collect();
    if aromatic_bonds.is_empty() && !mol.atoms().iter().any(|a| a.aromatic) {
        return Ok(());
    }
    for &b in &aromatic_bonds {
        mol.bond_mut(b).order = BondOrder::Single;
    }

    let needs: Vec<bool> = (0..mol.num_atoms())
        .map(|a| mol.atom(a).aromatic && needs_double_bond(mol, a))
        .collect();
    let mut matched = vec![false; mol.num_atoms()];
    let mut doubles = Vec::new();
    let mut budget = KEKULIZE_BUDGET;
    if !assign_doubles(mol, &needs, &mut matched, &mut doubles, &mut budget) {
        let atom = (0..needs.len())
            .find(|&a| needs[a] && !matched[a])
            .or_else(|| needs.iter().position(|n| *n))
            .unwrap_or(0);
        return Err(ChemError::Kekulize { atom });
    }

    for b in doubles {
        mol.bond_mut(b).order = BondOrder::Double;
    }
    for b in aromatic_bonds {
        mol.bond_mut(b).aromatic = false;
    }
    for a in 0..mol.num_atoms() {
        mol.atom_mut(a).aromatic = false;
    }
    Ok(())
}

/// Whether an aromatic atom takes part in one of the alternating double bonds.
fn needs_double_bond(mol: &Molecule, idx: usize) -> bool {
    let has_exocyclic_multiple = mol.neighbors(idx).iter().any(|(_, b)| {
        let bond = mol.bond(*b);
        !bond.aromatic && bond.order != BondOrder::Single
    });
    if has_exocyclic_multiple {
        return false;
    }
    let atom = mol.atom(idx);
    match atom.atomic_number {
        CARBON => atom.charge == 0,
        NITROGEN | PHOSPHORUS | ARSENIC => match atom.charge {
            1 => true,
            0 => atom.hydrogens == 0 && mol.degree(idx) < 3,
            _ => false,
        },
        OXYGEN | SULFUR | SELENIUM | TELLURIUM => atom.charge == 1,
        _ => false,
    }
}

// Backtracking perfect matching, most constrained atom first.
fn assign_doubles(
    mol: &Molecule,
    needs: &[bool],
    matched: &mut [bool],
    doubles: &mut Vec<usize>,
    budget: &mut usize,
) -> bool {
    let mut best: Option<(usize, Vec<(usize, usize)>)> = None;
    for a in 0..needs.len() {
        if !needs[a] || matched[a] {
            continue;
        }
        let options: Vec<(usize, usize)> = mol
            .neighbors(a)
            .iter()
            .filter(|(nbr, b)| mol.bond(*b).aromatic && needs[*nbr] && !matched[*nbr])
            .copied()
            .collect();
        if options.is_empty() {
            return false;
        }
        if best.as_ref().map_or(true, |(_, o)| options.len() < o.len()) {
            best = Some((a, options));
        }
    }
    let Some((a, options)) = best else {
        return true;
    };
    for (nbr, bond) in options {
        if *budget == 0 {
            return false;
        }
        *budget -= 1;
        matched[a] = true;
        matched[nbr] = true;
        doubles.push(bond);
        if assign_doubles(mol, needs, matched, doubles, budget) {
            return true;
        }
        matched[a] = false;
        matched[nbr] = false;
        doubles.pop();
    }
    false
}

/// Hydrogens of unbracketed atoms: lowest default valence that fits.
fn assign_implicit_hydrogens(mol: &mut Molecule) {
    for idx in 0..mol.num_atoms() {
        if mol.atom(idx).bracket {
            continue;
        }
        let valence = mol.bond_valence(idx);
        let hydrogens = element::default_valences(mol.atom(idx).atomic_number)
            .iter()
            .find(|v| **v >= valence)
            .map_or(0, |v| v - valence);
        mol.atom_mut(idx).hydrogens = hydrogens;
    }
}

fn check_valences(mol: &Molecule) -> Result<()> {
    for (idx, atom) in mol.atoms().iter().enumerate() {
        let valence = mol.valence(idx);
        if let Some(max) = element::max_valence(atom.atomic_number, atom.charge) {
            if valence > max {
                return Err(ChemError::Valence {
                    atom: idx,
                    symbol: atom.symbol(),
                    valence,
                    max,
                });
            }
        }
    }
    Ok(())
}

/// Shortest cycle through every bond that has one, without duplicates.
pub(crate) fn find_rings(mol: &Molecule) -> Vec<Ring> {
    let mut rings = Vec::new();
    let mut seen: HashSet<Vec<usize>> = HashSet::new();
    for bond_idx in 0..mol.num_bonds() {
        let bond = mol.bond(bond_idx);
        let Some(path) = shortest_path(mol, bond.begin, bond.end, bond_idx) else {
            continue;
        };
        let mut bonds: Vec<usize> = path
            .windows(2)
            .filter_map(|w| mol.bond_between(w[0], w[1]))
            .collect();
        bonds.push(bond_idx);
        let mut key = bonds.clone();
        key.sort_unstable();
        if seen.insert(key) {
            rings.push(Ring { atoms: path, bonds });
        }
    }
    rings
}

fn shortest_path(mol: &Molecule, from: usize, to: usize, skip: usize) -> Option<Vec<usize>> {
    let mut parent: Vec<Option<usize>> = vec![None; mol.num_atoms()];
    let mut visited = vec![false; mol.num_atoms()];
    let mut queue = VecDeque::from([from]);
    visited[from] = true;
    while let Some(atom) = queue.pop_front() {
        if atom == to {
            let mut path = vec![to];
            let mut current = to;
            while let Some(p) = parent[current] {
                path.push(p);
                current = p;
            }
            path.reverse();
            return Some(path);
        }
        for &(nbr, bond) in mol.neighbors(atom) {
            if bond == skip || visited[nbr] {
                continue;
            }
            visited[nbr] = true;
            parent[nbr] = Some(atom);
            queue.push_back(nbr);
        }
    }
    None
}

/// Hückel 4n+2 rule on every connected set of rings within a fused system.
///
/// Rings sharing a bond form a fused system. Each atom donates the same
/// electron count to every ring set of its system, so the outcome depends
/// only on the system and not on which Kekulé structure or ring set was found.
fn perceive_aromaticity(mol: &mut Molecule) {
    let rings = mol.rings().to_vec();
    let mut aromatic_atoms = vec![false; mol.num_atoms()];
    let mut aromatic_bonds = vec![false; mol.num_bonds()];

    for system in fused_systems(&rings) {
        let system_bonds: Vec<usize> = system
            .iter()
            .flat_map(|&r| rings[r].bonds.iter().copied())
            .collect();
        let electrons: HashMap<usize, Option<u32>> = system
            .iter()
            .flat_map(|&r| rings[r].atoms.iter().copied())
            .map(|atom| (atom, pi_electrons(mol, atom, &system_bonds).map(u32::from)))
            .collect();

        for subset in connected_ring_sets(&rings, &system) {
            let mut atoms: Vec<usize> = subset.iter().flat_map(|&r| rings[r].atoms.iter().copied()).collect();
            atoms.sort_unstable();
            atoms.dedup();
            let total: Option<u32> = atoms.iter().map(|a| electrons[a]).sum();
            if !total.is_some_and(|e| e >= 2 && (e - 2) % 4 == 0) {
                continue;
            }
            for &atom in &atoms {
                aromatic_atoms[atom] = true;
            }
            for &r in &subset {
                for &bond in &rings[r].bonds {
                    aromatic_bonds[bond] = true;
                }
            }
        }
    }
    for (idx, aromatic) in aromatic_atoms.into_iter().enumerate() {
        mol.atom_mut(idx).aromatic = aromatic;
    }
    for (idx, aromatic) in aromatic_bonds.into_iter().enumerate() {
        mol.bond_mut(idx).aromatic = aromatic;
    }
}

fn rings_fused(a: &Ring, b: &Ring) -> bool {
    a.bonds.iter().any(|bond| b.bonds.contains(bond))
}

/// Groups of ring indices connected through shared bonds.
fn fused_systems(rings: &[Ring]) -> Vec<Vec<usize>> {
    let mut system_of: Vec<Option<usize>> = vec![None; rings.len()];
    let mut systems = Vec::new();
    for start in 0..rings.len() {
        if system_of[start].is_some() {
            continue;
        }
        let id = systems.len();
        let mut members = vec![start];
        system_of[start] = Some(id);
        let mut queue = VecDeque::from([start]);
        while let Some(r) = queue.pop_front() {
            for other in 0..rings.len() {
                if system_of[other].is_none() && rings_fused(&rings[r], &rings[other]) {
                    system_of[other] = Some(id);
                    members.push(other);
                    queue.push_back(other);
                }
            }
        }
        members.sort_unstable();
        systems.push(members);
    }
    systems
}

/// Every connected subset of the rings in `system`. Large systems fall back
/// to single rings, fused pairs and the whole system.
fn connected_ring_sets(rings: &[Ring], system: &[usize]) -> Vec<Vec<usize>> {
    let k = system.len();
    let fused = |i: usize, j: usize| rings_fused(&rings[system[i]], &rings[system[j]]);
    let to_rings = |mask: u32| -> Vec<usize> {
        (0..k).filter(|i| mask & (1 << i) != 0).map(|i| system[i]).collect()
    };

    if k > MAX_ENUMERATED_RINGS {
        let mut sets: Vec<Vec<usize>> = system.iter().map(|&r| vec![r]).collect();
        for i in 0..k {
            for j in i + 1..k {
                if fused(i, j) {
                    sets.push(vec![system[i], system[j]]);
                }
            }
        }
        sets.push(system.to_vec());
        return sets;
    }

    let mut seen: HashSet<u32> = (0..k).map(|i| 1u32 << i).collect();
    let mut frontier: Vec<u32> = seen.iter().copied().collect();
    while let Some(mask) = frontier.pop() {
        for j in 0..k {
            if mask & (1 << j) != 0 {
                continue;
            }
            let touches = (0..k).any(|i| mask & (1 << i) != 0 && fused(i, j));
            let grown = mask | (1 << j);
            if touches && seen.insert(grown) {
                frontier.push(grown);
            }
        }
    }
    let mut masks: Vec<u32> = seen.into_iter().collect();
    masks.sort_unstable();
    masks.into_iter().map(to_rings).collect()
}

/// Electrons an atom donates to the pi system made of `system_bonds`, `None`
/// when the atom can't be part of an aromatic system.
fn pi_electrons(mol: &Molecule, idx: usize, system_bonds: &[usize]) -> Option<u8> {
    let atom = mol.atom(idx);
    let mut ring_double = false;
    let mut exocyclic_double = None;
    for &(nbr, b) in mol.neighbors(idx) {
        match mol.bond(b).order {
            BondOrder::Single => {}
            BondOrder::Double if system_bonds.contains(&b) => ring_double = true,
            BondOrder::Double => exocyclic_double = Some(nbr),
            _ => return None,
        }
    }
    match (ring_double, exocyclic_double) {
        (true, None) => return Some(1),
        (true, Some(_)) => return None,
        (false, Some(other)) => {
            let acceptor = matches!(mol.atom(other).atomic_number, NITROGEN | OXYGEN | SULFUR);
            return (atom.atomic_number == CARBON && acceptor).then_some(0);
        }
        (false, None) => {}
    }
    let connections = mol.degree(idx) + atom.hydrogens as usize;
    match (atom.atomic_number, atom.charge) {
        (CARBON, -1) => Some(2),
        (CARBON, 1) => Some(0),
        (NITROGEN | PHOSPHORUS | ARSENIC, 0) if connections <= 3 => Some(2),
        (NITROGEN | PHOSPHORUS | ARSENIC, -1) => Some(2),
        (OXYGEN | SULFUR | SELENIUM | TELLURIUM, 0) if connections == 2 => Some(2),
        (BORON, 0) if connections <= 3 => Some(0),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smiles::parse;

    fn sanitized(smiles: &str) -> Result<Molecule> {
        let mut mol = parse(smiles)?;
        sanitize(&mut mol)?;
        Ok(mol)
    }

    #[test]
    fn test_kekulize_benzene() {
        let mol = sanitized("c1ccccc1").unwrap();
        let doubles = mol
            .bonds()
            .iter()
            .filter(|b| b.order == BondOrder::Double)
            .count();
        assert_eq!(doubles, 3);
        assert!(mol.atoms().iter().all(|a| a.aromatic && a.hydrogens == 1));
        assert!(mol.bonds().iter().all(|b| b.aromatic));
        assert_eq!(mol.rings().len(), 1);
    }

    #[test]
    fn test_kekule_input_is_aromatic() {
        let mol = sanitized("C1=CC=CC=C1").unwrap();
        assert!(mol.atoms().iter().all(|a| a.aromatic));
        let mol = sanitized("C1=CNC=C1").unwrap();
        assert!(mol.atoms().iter().all(|a| a.aromatic));
        assert_eq!(mol.atom(2).hydrogens, 1);
    }

    #[test]
    fn test_heteroaromatics() {
        for smiles in ["c1ccncc1", "c1cc[nH]c1", "c1ccsc1", "Cn1cccc1", "O=c1cccc[nH]1", "c1ccc2ccccc2c1", "c1ccc2[nH]ccc2c1"] {
            let mol = sanitized(smiles).unwrap();
            let ring_atoms_aromatic = (0..mol.num_atoms())
                .filter(|&a| mol.is_ring_atom(a))
                .all(|a| mol.atom(a).aromatic);
            assert!(ring_atoms_aromatic, "{smiles}");
        }
        // pyrrole nitrogen needs its hydrogen spelled out
        assert!(matches!(sanitized("c1ccnc1"), Err(ChemError::Kekulize { .. })));
    }

    #[test]
    fn test_fused_systems() {
        for smiles in [
            "c1ccc2c(c1)ccc1ccccc12",
            "c1cccc2c1ccc1c2cccc1",
            "C1=CC2=C(C=C1)C1=CC=CC=C1C=C2",
            "c1ccc2cc3ccccc3cc2c1",
            "c1cc2ccc3cccc4ccc(c1)c2c34",
            "c1ccc2c(c1)[nH]c1ccccc12",
        ] {
            let mol = sanitized(smiles).unwrap();
            for atom in (0..mol.num_atoms()).filter(|&a| mol.is_ring_atom(a)) {
                assert!(mol.atom(atom).aromatic, "{smiles}: atom {atom}");
            }
        }
        // azulene is aromatic only as a whole
        let mol = sanitized("C1=CC2=CC=CC=CC2=C1").unwrap();
        assert!(mol.atoms().iter().all(|a| a.aromatic));
    }

    #[test]
    fn test_fused_system_with_saturated_ring() {
        // tetralin: the benzene ring stays aromatic, the CH2 ring does not
        let mol = sanitized("C1CCc2ccccc2C1").unwrap();
        let aromatic: Vec<bool> = mol.atoms().iter().map(|a| a.aromatic).collect();
        assert_eq!(
            aromatic,
            vec![false, false, false, true, true, true, true, true, true, false]
        );
    }

    #[test]
    fn test_non_aromatic_rings() {
        for smiles in ["C1CCCCC1", "C1=CCC=C1", "O=C1C=CC(=O)C=C1"] {
            let mol = sanitized(smiles).unwrap();
            assert!(mol.atoms().iter().all(|a| !a.aromatic), "{smiles}");
        }
    }

    #[test]
    fn test_valence_errors() {
        assert!(matches!(
            sanitized("C(C)(C)(C)(C)C"),
            Err(ChemError::Valence { atom: 0, max: 4, .. })
        ));
        assert!(sanitized("CN(=O)=O").is_err());
        assert!(sanitized("C[N+](=O)[O-]").is_ok());
        assert!(sanitized("CS(=O)(=O)C").is_ok());
        assert!(sanitized("[Na+].[Cl-]").is_ok());
    }

    #[test]
    fn test_implicit_hydrogens() {
        let mol = sanitized("CC(=O)O").unwrap();
        let hs: Vec<u8> = mol.atoms().iter().map(|a| a.hydrogens).collect();
        assert_eq!(hs, vec![3, 0, 0, 1]);
        let mol = sanitized("[CH2]C").unwrap();
        assert_eq!(mol.atom(0).hydrogens, 2);
    }

    #[test]
    fn test_sanitize_is_idempotent() {
        for smiles in ["c1ccc2ccccc2c1", "O=c1cccc[nH]1", "C1=CNC=C1", "CC(=O)Nc1ccc(O)cc1"] {
            let mut mol = sanitized(smiles).unwrap();
            let before: Vec<(bool, u8)> = mol.atoms().iter().map(|a| (a.aromatic, a.hydrogens)).collect();
            sanitize(&mut mol).unwrap();
            let after: Vec<(bool, u8)> = mol.atoms().iter().map(|a| (a.aromatic, a.hydrogens)).collect();
            assert_eq!(before, after, "{smiles}");
        }
    }
}
