//! Collaborators around the core: line decoding, sorted sources,
//! compression, report output, source globbing, and column splitting.

pub mod compression;
pub mod glob;
pub mod jsonl;
pub mod lines;
pub mod source;
#[cfg(feature = "io-csv")]
pub mod split;
