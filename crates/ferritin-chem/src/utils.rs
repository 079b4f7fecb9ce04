//! Canonicalization and fingerprint helpers over SMILES collections.
//!
//! The free functions use a default (muted) [`Toolkit`]; the same operations
//! are available as methods to pick a diagnostics level.
use crate::error::{ChemError, Result};
use crate::fingerprint::{morgan_fingerprint, Fingerprint, FingerprintConfig};
use crate::molecule::Molecule;
use crate::toolkit::Toolkit;
use std::collections::HashSet;
use tracing::warn;

/// Molecules read eagerly from a list, with the failures that were skipped.
#[derive(Debug, Clone, Default)]
pub struct MolBatch {
    pub mols: Vec<Molecule>,
    pub skipped: usize,
    /// `(input index, error)` for every skipped item.
    pub errors: Vec<(usize, ChemError)>,
}

impl MolBatch {
    pub fn len(&self) -> usize {
        self.mols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mols.is_empty()
    }
}

impl FromIterator<Result<Molecule>> for MolBatch {
    fn from_iter<I: IntoIterator<Item = Result<Molecule>>>(iter: I) -> Self {
        let mut batch = MolBatch::default();
        for (idx, item) in iter.into_iter().enumerate() {
            match item {
                Ok(mol) => batch.mols.push(mol),
                Err(err) => {
                    batch.skipped += 1;
                    batch.errors.push((idx, err));
                }
            }
        }
        batch
    }
}

impl Toolkit {
    /// Canonical SMILES, `None` if the input can't be read.
    pub fn canonicalize(&self, smiles: &str, include_stereocenters: bool, remove_hs: bool) -> Option<String> {
        let mol = self.mol_from_smiles(smiles).ok()?;
        let mol = if remove_hs { mol.remove_hs() } else { mol };
        Some(mol.to_smiles(include_stereocenters))
    }

    /// Unique canonical SMILES in first-seen order, plus the positions of
    /// duplicates. Positions count only the inputs that could be read.
    pub fn canonicalize_list<I, S>(
        &self,
        smiles: I,
        include_stereocenters: bool,
        remove_hs: bool,
    ) -> (Vec<String>, Vec<usize>)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let mut unique = Vec::new();
        let mut duplicates = Vec::new();
        let canonical = smiles
            .into_iter()
            .filter_map(|s| self.canonicalize(s.as_ref(), include_stereocenters, remove_hs));
        for (idx, smi) in canonical.enumerate() {
            if seen.insert(smi.clone()) {
                unique.push(smi);
            } else {
                duplicates.push(idx);
            }
        }
        (unique, duplicates)
    }

    /// Lazily read molecules, skipping (and logging) the ones that fail.
    pub fn get_mols<I, S>(&self, smiles: I) -> impl Iterator<Item = Molecule>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let toolkit = *self;
        smiles.into_iter().filter_map(move |s| {
            let s = s.as_ref();
            match toolkit.mol_from_smiles(s) {
                Ok(mol) => Some(mol),
                Err(err) => {
                    warn!(smiles = s, "skipping molecule: {err}");
                    None
                }
            }
        })
    }

    /// Eagerly read molecules; every item is parsed and checked by an
    /// explicit sanitization pass.
    pub fn get_mols_list<I, S>(&self, smiles: I) -> MolBatch
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        smiles
            .into_iter()
            .map(|s| {
                let mut mol = self.mol_from_smiles(s.as_ref())?;
                self.sanitize(&mut mol)?;
                Ok(mol)
            })
            .collect()
    }
}

pub fn canonicalize(smiles: &str, include_stereocenters: bool, remove_hs: bool) -> Option<String> {
    Toolkit::default().canonicalize(smiles, include_stereocenters, remove_hs)
}

pub fn canonicalize_list<I, S>(smiles: I, include_stereocenters: bool, remove_hs: bool) -> (Vec<String>, Vec<usize>)
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    Toolkit::default().canonicalize_list(smiles, include_stereocenters, remove_hs)
}

pub fn get_mols<I, S>(smiles: I) -> impl Iterator<Item = Molecule>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    Toolkit::default().get_mols(smiles)
}

pub fn get_mols_list<I, S>(smiles: I) -> MolBatch
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    Toolkit::default().get_mols_list(smiles)
}

/// Morgan fingerprints of `radius` folded to `length` bits.
pub fn get_fingerprints<'a, I>(mols: I, radius: u32, length: usize) -> Vec<Fingerprint>
where
    I: IntoIterator<Item = &'a Molecule>,
{
    let config = FingerprintConfig::new(radius, length);
    mols.into_iter()
        .map(|mol| morgan_fingerprint(mol, &config))
        .collect()
}

/// Fingerprints (radius 2, 4096 bits) of the readable SMILES in `smiles`.
pub fn get_fingerprints_from_smileslist<I, S>(smiles: I) -> Vec<Fingerprint>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let config = FingerprintConfig::default();
    let mols: Vec<Molecule> = get_mols(smiles).collect();
    get_fingerprints(&mols, config.radius, config.length)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonicalize_options() {
        assert_eq!(canonicalize("C1=CC=CC=C1", true, true).as_deref(), Some("c1ccccc1"));
        assert_eq!(canonicalize("[H]C([H])([H])O", false, true).as_deref(), Some("CO"));
        assert_eq!(canonicalize("[H]C([H])([H])O", false, false).as_deref(), Some("[H]C([H])([H])O"));
        assert_eq!(canonicalize("not_a_smiles", true, true), None);
    }

    #[test]
    fn test_filtered_duplicate_positions() {
        // the failure is dropped before positions are counted
        let (unique, duplicates) = canonicalize_list(["CCO", "bad(", "OCC"], true, true);
        assert_eq!(unique, vec!["CCO".to_string()]);
        assert_eq!(duplicates, vec![1]);
    }

    #[test]
    fn test_mol_batch_collects_errors() {
        let batch = get_mols_list(["CCO", "C1CC", "c1ccnc1", "CCN"]);
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.skipped, 2);
        let indices: Vec<usize> = batch.errors.iter().map(|(i, _)| *i).collect();
        assert_eq!(indices, vec![1, 2]);
        assert!(matches!(batch.errors[1].1, ChemError::Kekulize { .. }));
    }
}
