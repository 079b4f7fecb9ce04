//! SMILES reading and canonical writing.
mod parser;
mod writer;

pub use parser::parse;
pub use writer::write;
