//! Morgan (ECFP-style) circular fingerprints and Tanimoto similarity.
use crate::element;
use crate::molecule::Molecule;
use bitvec::prelude::*;
use serde::{Deserialize, Serialize};

pub type Fingerprint = BitVec<u64, Lsb0>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FingerprintConfig {
    pub radius: u32,
    pub length: usize,
}

impl Default for FingerprintConfig {
    fn default() -> Self {
        Self {
            radius: 2,
            length: 4096,
        }
    }
}

impl FingerprintConfig {
    pub fn new(radius: u32, length: usize) -> Self {
        Self { radius, length }
    }
}

fn hash_combine(seed: &mut u32, value: u32) {
    *seed ^= value
        .wrapping_add(0x9e37_79b9)
        .wrapping_add(*seed << 6)
        .wrapping_add(*seed >> 2);
}

fn hash_values(values: impl IntoIterator<Item = u32>) -> u32 {
    let mut seed = 0u32;
    for v in values {
        hash_combine(&mut seed, v);
    }
    seed
}

fn atom_invariant(mol: &Molecule, idx: usize) -> u32 {
    let atom = mol.atom(idx);
    let isotope_delta = atom
        .isotope
        .map_or(0, |m| m as i32 - element::nominal_mass(atom.atomic_number) as i32);
    hash_values([
        atom.atomic_number as u32,
        mol.degree(idx) as u32,
        mol.total_hydrogens(idx) as u32,
        atom.charge as i32 as u32,
        isotope_delta as u32,
        u32::from(mol.is_ring_atom(idx)),
    ])
}

fn bond_invariant(mol: &Molecule, bond: usize) -> u32 {
    let bond = mol.bond(bond);
    if bond.aromatic {
        12
    } else {
        bond.order.valence() as u32
    }
}

/// Morgan fingerprint folded to `config.length` bits.
///
/// Explicit hydrogens are folded into their neighbours first. Every atom
/// environment of radius `0..=config.radius` sets the bit `identifier % length`;
/// an environment covering exactly the same bonds as one already seen is skipped.
pub fn morgan_fingerprint(mol: &Molecule, config: &FingerprintConfig) -> Fingerprint {
    let mut fp: Fingerprint = bitvec![u64, Lsb0; 0; config.length];
    if config.length == 0 {
        return fp;
    }
    let mol = mol.remove_hs();
    let n = mol.num_atoms();

    let mut ids: Vec<u32> = (0..n).map(|a| atom_invariant(&mol, a)).collect();
    for &id in &ids {
        fp.set(id as usize % config.length, true);
    }

    let mut environments: Vec<BitVec<u64, Lsb0>> = vec![bitvec![u64, Lsb0; 0; mol.num_bonds()]; n];
    let mut seen: Vec<BitVec<u64, Lsb0>> = Vec::new();
    for layer in 0..config.radius {
        let mut round: Vec<(BitVec<u64, Lsb0>, u32, usize)> = Vec::with_capacity(n);
        for atom in 0..n {
            let mut pairs: Vec<(u32, u32)> = mol
                .neighbors(atom)
                .iter()
                .map(|(nbr, bond)| (bond_invariant(&mol, *bond), ids[*nbr]))
                .collect();
            pairs.sort_unstable();

            let mut id = hash_values([layer, ids[atom]]);
            let mut env = environments[atom].clone();
            for &(nbr, bond) in mol.neighbors(atom) {
                env.set(bond, true);
                env |= environments[nbr].as_bitslice();
            }
            for (bond_code, nbr_id) in pairs {
                hash_combine(&mut id, bond_code);
                hash_combine(&mut id, nbr_id);
            }
            round.push((env, id, atom));
        }

        // one bit per distinct environment, lowest identifier first
        round.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)));
        for (env, id, _) in &round {
            if env.not_any() || seen.contains(env) {
                continue;
            }
            fp.set(*id as usize % config.length, true);
            seen.push(env.clone());
        }
        for (env, id, atom) in round {
            ids[atom] = id;
            environments[atom] = env;
        }
    }
    fp
}

/// `|a & b| / |a | b|`; two empty fingerprints have similarity 0.
pub fn tanimoto_similarity(a: &Fingerprint, b: &Fingerprint) -> f64 {
    let both = a.iter_ones().filter(|i| b.get(*i).is_some_and(|bit| *bit)).count();
    let union = a.count_ones() + b.count_ones() - both;
    if union == 0 {
        0.0
    } else {
        both as f64 / union as f64
    }
}

pub fn bulk_tanimoto_similarity(query: &Fingerprint, pool: &[Fingerprint]) -> Vec<f64> {
    pool.iter().map(|fp| tanimoto_similarity(query, fp)).collect()
}
