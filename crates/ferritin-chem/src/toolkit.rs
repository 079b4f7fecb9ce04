//! Toolkit entry point with explicit diagnostics configuration.
use crate::error::{ChemError, Result};
use crate::molecule::Molecule;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

/// Level at which per-molecule reader diagnostics are reported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Diagnostics {
    /// Reader messages are dropped.
    #[default]
    Off,
    Error,
    Warn,
    Info,
    Debug,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolkitConfig {
    pub diagnostics: Diagnostics,
}

impl ToolkitConfig {
    pub fn with_diagnostics(diagnostics: Diagnostics) -> Self {
        Self { diagnostics }
    }
}

/// Reads and sanitizes molecules.
///
/// ```
/// use ferritin_chem::{Diagnostics, Toolkit, ToolkitConfig};
///
/// let toolkit = Toolkit::new(ToolkitConfig::with_diagnostics(Diagnostics::Warn));
/// let mol = toolkit.mol_from_smiles("c1ccccc1O").unwrap();
/// assert_eq!(mol.num_atoms(), 7);
/// assert!(toolkit.mol_from_smiles("C1CC").is_err());
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct Toolkit {
    config: ToolkitConfig,
}

impl Toolkit {
    pub fn new(config: ToolkitConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ToolkitConfig {
        &self.config
    }

    /// Parse and sanitize.
    pub fn mol_from_smiles(&self, smiles: &str) -> Result<Molecule> {
        Molecule::from_smiles(smiles).inspect_err(|err| self.report(smiles, err))
    }

    /// Re-run sanitization on an existing molecule.
    pub fn sanitize(&self, mol: &mut Molecule) -> Result<()> {
        mol.sanitize().inspect_err(|err| self.report("<molecule>", err))
    }

    fn report(&self, smiles: &str, err: &ChemError) {
        match self.config.diagnostics {
            Diagnostics::Off => {}
            Diagnostics::Error => error!(smiles, "{err}"),
            Diagnostics::Warn => warn!(smiles, "{err}"),
            Diagnostics::Info => info!(smiles, "{err}"),
            Diagnostics::Debug => debug!(smiles, "{err}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_muted() {
        let toolkit = Toolkit::default();
        assert_eq!(toolkit.config().diagnostics, Diagnostics::Off);
        assert!(toolkit.mol_from_smiles("not_a_smiles").is_err());
    }

    #[test]
    fn test_config_serde() {
        let config: ToolkitConfig = serde_json::from_str(r#"{"diagnostics":"warn"}"#).unwrap();
        assert_eq!(config, ToolkitConfig::with_diagnostics(Diagnostics::Warn));
    }
}
