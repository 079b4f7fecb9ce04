use anyhow::Context;
use std::fs;

pub mod canonicalize;
pub mod fingerprint;

/// Non-empty lines of a .smi file, without comments (`#`).
fn read_smiles(path: &str) -> anyhow::Result<Vec<String>> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {path}"))?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(String::from)
        .collect())
}
