//! ferritin-test-data
//!
//! SMILES fixtures shared by the workspace tests.
//!
//! Each `TestFile` embeds a file at compile time and can write it back out to a
//! temporary path for binaries that want a real file.
use std::fs;
use tempfile::{Builder, NamedTempFile};

#[derive(Debug)]
/// Test File
///
/// Example usage:
///
/// ```ignore
/// // returns (filepath, _tempfile_handle).
/// // _handle ensures the tempfile remains in scope
/// use ferritin_test_data::TestFile;
/// let (smiles_file, _temp) = TestFile::smiles_01().create_temp().unwrap();
/// ```
pub struct TestFile {
    filebinary: &'static [u8],
    suffix: &'static str,
}

impl TestFile {
    /// Ten drug-like molecules with names. Lines 7/8 and 9/10 are the same
    /// molecule written two ways.
    pub fn smiles_01() -> Self {
        Self {
            filebinary: include_bytes!("../data/smiles/drugs.smi"),
            suffix: "smi",
        }
    }
    /// Seven entries: two spellings of ethanol, three unreadable lines,
    /// ethylamine and a salt.
    pub fn smiles_02() -> Self {
        Self {
            filebinary: include_bytes!("../data/smiles/mixed.smi"),
            suffix: "smi",
        }
    }

    /// Raw file contents.
    pub fn contents(&self) -> &'static str {
        std::str::from_utf8(self.filebinary).unwrap_or_default()
    }

    pub fn create_temp(&self) -> std::io::Result<(String, NamedTempFile)> {
        let temp = Builder::new()
            .suffix(&format!(".{}", self.suffix))
            .tempfile()?;

        fs::write(&temp, self.filebinary)?;
        let path = temp.path().to_string_lossy().into_owned();

        Ok((path, temp))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_temp() {
        let (path, _handle) = TestFile::smiles_02().create_temp().unwrap();
        assert!(path.ends_with(".smi"));
        let text = fs::read_to_string(path).unwrap();
        assert_eq!(text.lines().count(), 7);
    }
}
