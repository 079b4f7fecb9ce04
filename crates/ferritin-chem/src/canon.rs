//! Canonical atom ranking.
//!
//! Atoms start from a graph invariant and are refined by their neighbourhoods
//! until the partition is stable. The stable partition gives the symmetry
//! classes; canonical ranks break the remaining ties one atom at a time.
use crate::molecule::{Bond, Molecule};

fn invariants(mol: &Molecule, isomeric: bool) -> Vec<(usize, u8, u16, i8, u8, bool, bool)> {
    (0..mol.num_atoms())
        .map(|idx| {
            let atom = mol.atom(idx);
            let isotope = if isomeric { atom.isotope.unwrap_or(0) } else { 0 };
            (
                mol.degree(idx),
                atom.atomic_number,
                isotope,
                atom.charge,
                atom.hydrogens,
                atom.aromatic,
                mol.is_ring_atom(idx),
            )
        })
        .collect()
}

fn bond_code(bond: &Bond) -> u8 {
    if bond.aromatic {
        5
    } else {
        bond.order.valence()
    }
}

/// Dense ranks: equal keys share a rank, ranks are `0..distinct`.
fn dense_ranks<T: Ord>(keys: &[T]) -> Vec<usize> {
    let mut sorted: Vec<&T> = keys.iter().collect();
    sorted.sort();
    sorted.dedup();
    keys.iter()
        .map(|k| sorted.binary_search(&k).unwrap_or_else(|i| i))
        .collect()
}

fn count_classes(ranks: &[usize]) -> usize {
    ranks.iter().max().map_or(0, |m| m + 1)
}

fn refine(mol: &Molecule, mut ranks: Vec<usize>) -> Vec<usize> {
    let mut classes = count_classes(&ranks);
    loop {
        let keys: Vec<(usize, Vec<(usize, u8)>)> = (0..mol.num_atoms())
            .map(|idx| {
                let mut env: Vec<(usize, u8)> = mol
                    .neighbors(idx)
                    .iter()
                    .map(|(nbr, bond)| (ranks[*nbr], bond_code(mol.bond(*bond))))
                    .collect();
                env.sort_unstable();
                (ranks[idx], env)
            })
            .collect();
        let next = dense_ranks(&keys);
        let next_classes = count_classes(&next);
        if next_classes == classes {
            return next;
        }
        classes = next_classes;
        ranks = next;
    }
}

/// Atoms sharing a class are indistinguishable by graph invariants.
pub fn symmetry_classes(mol: &Molecule, isomeric: bool) -> Vec<usize> {
    refine(mol, dense_ranks(&invariants(mol, isomeric)))
}

fn lowest_tied_class(ranks: &[usize]) -> Option<usize> {
    let mut counts = vec![0usize; ranks.len()];
    for &r in ranks {
        counts[r] += 1;
    }
    counts.iter().position(|c| *c > 1)
}

/// Single out `chosen` from its class and refine again.
fn break_tie(mol: &Molecule, ranks: &[usize], tied: usize, chosen: usize) -> Vec<usize> {
    let keys: Vec<(usize, bool)> = ranks
        .iter()
        .enumerate()
        .map(|(idx, r)| (*r, *r == tied && idx != chosen))
        .collect();
    refine(mol, dense_ranks(&keys))
}

/// A permutation of `0..num_atoms` that doesn't depend on the input atom order
/// (up to ties between symmetry-equivalent atoms).
pub fn canonical_ranks(mol: &Molecule, isomeric: bool) -> Vec<usize> {
    let mut ranks = symmetry_classes(mol, isomeric);
    while let Some(tied) = lowest_tied_class(&ranks) {
        let Some(chosen) = ranks.iter().position(|r| *r == tied) else {
            break;
        };
        ranks = break_tie(mol, &ranks, tied, chosen);
    }
    ranks
}

/// Complete rankings reached by breaking each tie on every member of the
/// lowest tied class in turn, at most `limit` of them.
///
/// Once the limit is reached the remaining ties are broken on the first
/// member only. The first ranking returned is [`canonical_ranks`].
pub fn candidate_rankings(mol: &Molecule, isomeric: bool, limit: usize) -> Vec<Vec<usize>> {
    let mut done = Vec::new();
    let mut pending = vec![symmetry_classes(mol, isomeric)];
    while let Some(ranks) = pending.pop() {
        let Some(tied) = lowest_tied_class(&ranks) else {
            done.push(ranks);
            continue;
        };
        let members: Vec<usize> = (0..ranks.len()).filter(|&a| ranks[a] == tied).collect();
        let room = limit.saturating_sub(done.len() + pending.len());
        let branches = if members.len() <= room { members.len() } else { 1 };
        for &chosen in members[..branches].iter().rev() {
            pending.push(break_tie(mol, &ranks, tied, chosen));
        }
    }
    done
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symmetry_classes() {
        let mol = Molecule::from_smiles("CC(C)O").unwrap();
        let classes = symmetry_classes(&mol, false);
        assert_eq!(classes[0], classes[2]);
        assert_ne!(classes[0], classes[1]);
        assert_ne!(classes[1], classes[3]);

        let benzene = Molecule::from_smiles("c1ccccc1").unwrap();
        let classes = symmetry_classes(&benzene, false);
        assert!(classes.iter().all(|c| *c == classes[0]));
    }

    #[test]
    fn test_ranks_are_a_permutation() {
        let mol = Molecule::from_smiles("c1ccc2ccccc2c1").unwrap();
        let mut ranks = canonical_ranks(&mol, false);
        ranks.sort_unstable();
        assert_eq!(ranks, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_ranks_follow_atoms_across_orderings() {
        let a = Molecule::from_smiles("OCC").unwrap();
        let b = Molecule::from_smiles("CCO").unwrap();
        let ra = canonical_ranks(&a, false);
        let rb = canonical_ranks(&b, false);
        // oxygen, then the carbon bonded to it, then the methyl
        assert_eq!((ra[0], ra[1], ra[2]), (rb[2], rb[1], rb[0]));
    }

    #[test]
    fn test_candidate_rankings() {
        let mol = Molecule::from_smiles("CC(C)O").unwrap();
        let rankings = candidate_rankings(&mol, true, 64);
        assert_eq!(rankings.len(), 2);
        assert_eq!(rankings[0], canonical_ranks(&mol, true));
        // the two methyls trade places
        assert_eq!((rankings[0][0], rankings[0][2]), (rankings[1][2], rankings[1][0]));

        let cyclohexane = Molecule::from_smiles("C1CCCCC1").unwrap();
        assert_eq!(candidate_rankings(&cyclohexane, true, 64).len(), 12);
        let rankings = candidate_rankings(&cyclohexane, true, 4);
        assert!(rankings.len() <= 4);
        for mut ranks in rankings {
            ranks.sort_unstable();
            assert_eq!(ranks, (0..6).collect::<Vec<_>>());
        }

        let acid = Molecule::from_smiles("CC(=O)O").unwrap();
        assert_eq!(candidate_rankings(&acid, true, 64).len(), 1);
    }
}
