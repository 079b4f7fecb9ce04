use thiserror::Error;

/// Failures while reading or sanitizing a molecule.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChemError {
    #[error("SMILES parse error at position {position}: {message}")]
    Parse { position: usize, message: String },

    #[error("unknown element symbol '{0}'")]
    UnknownElement(String),

    #[error("can't kekulize the aromatic system containing atom {atom}")]
    Kekulize { atom: usize },

    #[error("explicit valence {valence} of atom {atom} ({symbol}) is greater than permitted ({max})")]
    Valence {
        atom: usize,
        symbol: String,
        valence: u8,
        max: u8,
    },
}

impl ChemError {
    pub(crate) fn parse(position: usize, message: impl Into<String>) -> Self {
        ChemError::Parse {
            position,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ChemError>;
