//! ferritin-chem
//!
//! Small-molecule utilities for preparing model inputs:
//!
//! - SMILES reading with sanitization (Kekulé assignment, valence checks, aromaticity)
//! - canonical SMILES for deduplication
//! - Morgan fingerprints and Tanimoto similarity
//!
//! ```
//! use ferritin_chem::utils::{canonicalize, canonicalize_list, get_fingerprints_from_smileslist};
//!
//! assert_eq!(canonicalize("C1=CC=CC=C1", true, true).as_deref(), Some("c1ccccc1"));
//!
//! let (unique, duplicates) = canonicalize_list(["CCO", "OCC", "CCO"], true, true);
//! assert_eq!(unique, vec!["CCO"]);
//! assert_eq!(duplicates, vec![1, 2]);
//!
//! let fps = get_fingerprints_from_smileslist(["CCO"]);
//! assert_eq!(fps[0].len(), 4096);
//! ```
pub mod canon;
pub mod element;
pub mod error;
pub mod fingerprint;
pub mod molecule;
pub mod sanitize;
pub mod smiles;
pub mod toolkit;
pub mod utils;

pub use error::ChemError;
pub use fingerprint::{
    bulk_tanimoto_similarity, morgan_fingerprint, tanimoto_similarity, Fingerprint,
    FingerprintConfig,
};
pub use molecule::{Atom, Bond, BondOrder, BondStereo, Molecule, StereoRef, Tetrahedral};
pub use toolkit::{Diagnostics, Toolkit, ToolkitConfig};
pub use utils::MolBatch;
