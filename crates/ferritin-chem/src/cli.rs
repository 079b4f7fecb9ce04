use super::commands;
use clap::{Parser, Subcommand};
use ferritin_chem::{Diagnostics, Toolkit, ToolkitConfig};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Report why individual molecules could not be read
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the unique canonical SMILES of a .smi file
    Canonicalize {
        #[arg(short, long)]
        input: String,
        #[arg(short, long)]
        output: String,
        /// Drop chirality, double bond configuration and isotopes
        #[arg(long)]
        no_stereo: bool,
        /// Fold explicit hydrogens into their neighbours
        #[arg(long)]
        remove_hs: bool,
    },
    /// Write Morgan fingerprints as JSON lines
    Fingerprint {
        #[arg(short, long)]
        input: String,
        #[arg(short, long)]
        output: String,
        #[arg(long, default_value_t = 2)]
        radius: u32,
        #[arg(long, default_value_t = 4096)]
        length: usize,
    },
}

impl Cli {
    pub fn init_logging(&self) {
        let default = if self.verbose { "warn" } else { "error" };
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }

    fn toolkit(&self) -> Toolkit {
        let diagnostics = if self.verbose {
            Diagnostics::Warn
        } else {
            Diagnostics::Off
        };
        Toolkit::new(ToolkitConfig::with_diagnostics(diagnostics))
    }

    pub fn execute(self) -> anyhow::Result<()> {
        let toolkit = self.toolkit();
        match self.command {
            Commands::Canonicalize {
                input,
                output,
                no_stereo,
                remove_hs,
            } => commands::canonicalize::execute(&toolkit, input, output, !no_stereo, remove_hs),
            Commands::Fingerprint {
                input,
                output,
                radius,
                length,
            } => commands::fingerprint::execute(&toolkit, input, output, radius, length),
        }
    }
}
