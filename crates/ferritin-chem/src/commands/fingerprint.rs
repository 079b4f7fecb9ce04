use anyhow::Context;
use ferritin_chem::{morgan_fingerprint, FingerprintConfig, Toolkit};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};

#[derive(Serialize)]
struct FingerprintRecord<'a> {
    smiles: &'a str,
    length: usize,
    on_bits: Vec<usize>,
}

pub fn execute(
    toolkit: &Toolkit,
    input: String,
    output: String,
    radius: u32,
    length: usize,
) -> anyhow::Result<()> {
    let config = FingerprintConfig::new(radius, length);
    let smiles = super::read_smiles(&input)?;
    let file = File::create(&output).with_context(|| format!("creating {output}"))?;
    let mut writer = BufWriter::new(file);

    let mut written = 0;
    for smi in &smiles {
        let Ok(mol) = toolkit.mol_from_smiles(smi) else {
            continue;
        };
        let fp = morgan_fingerprint(&mol, &config);
        let record = FingerprintRecord {
            smiles: smi,
            length,
            on_bits: fp.iter_ones().collect(),
        };
        serde_json::to_writer(&mut writer, &record)?;
        writeln!(writer)?;
        written += 1;
    }
    writer.flush()?;
    eprintln!("{written} fingerprints, {} failed", smiles.len() - written);
    Ok(())
}
