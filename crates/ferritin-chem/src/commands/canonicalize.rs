use anyhow::Context;
use ferritin_chem::Toolkit;
use std::fs;
use tracing::info;

pub fn execute(
    toolkit: &Toolkit,
    input: String,
    output: String,
    isomeric: bool,
    remove_hs: bool,
) -> anyhow::Result<()> {
    let smiles = super::read_smiles(&input)?;
    let (unique, duplicates) = toolkit.canonicalize_list(&smiles, isomeric, remove_hs);
    let failed = smiles.len() - unique.len() - duplicates.len();

    let mut text = unique.join("\n");
    if !text.is_empty() {
        text.push('\n');
    }
    fs::write(&output, text).with_context(|| format!("writing {output}"))?;

    info!(total = smiles.len(), unique = unique.len(), "canonicalized {input}");
    eprintln!(
        "{} unique, {} duplicates, {} failed",
        unique.len(),
        duplicates.len(),
        failed
    );
    Ok(())
}
