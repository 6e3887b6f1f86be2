//! JSON Lines reports.
//!
//! Every record is written as one JSON object on its own line. Objects are
//! routed through [`serde_json::Value`], whose map keeps keys sorted, so the
//! output is byte-for-byte reproducible regardless of struct field order.

use crate::io::compression::{FinishWrite, auto_detect_writer};
use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::{File, create_dir_all};
use std::io::Write;
use std::path::Path;

/// Write one record as a single JSON line with sorted keys.
///
/// # Errors
/// Returns an error if the record fails to serialize or the write fails.
pub fn write_record<W: Write, T: Serialize>(mut w: W, record: &T) -> Result<()> {
    let value = serde_json::to_value(record).context("serialize record")?;
    serde_json::to_writer(&mut w, &value).context("write record")?;
    w.write_all(b"\n")?;
    Ok(())
}

/// Write every record in order, one line each, and flush.
///
/// # Returns
/// The number of records written.
///
/// # Errors
/// See [`write_record`].
pub fn write_records<W: Write, T: Serialize>(mut w: W, records: &[T]) -> Result<usize> {
    for (i, record) in records.iter().enumerate() {
        write_record(&mut w, record).with_context(|| format!("record #{i}"))?;
    }
    w.flush()?;
    Ok(records.len())
}

/// Create a report file, compressed according to its extension.
///
/// Parent directories are created as needed. The report is complete only
/// after [`FinishWrite::finish`], which writes the compression trailer.
///
/// # Errors
/// Returns an error if the directories or the file cannot be created.
pub fn create_report(path: impl AsRef<Path>) -> Result<Box<dyn FinishWrite>> {
    let path = path.as_ref();
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        create_dir_all(parent).with_context(|| format!("mkdir -p {}", parent.display()))?;
    }
    let f = File::create(path).with_context(|| format!("create {}", path.display()))?;
    auto_detect_writer(f, path).with_context(|| format!("setup compression for {}", path.display()))
}
