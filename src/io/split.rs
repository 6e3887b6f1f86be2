//! Column splitting for delimited files.
//!
//! A delimited file with a header row becomes one value file per column,
//! each ready to be sorted and summarized like any other source. Every data
//! row is counted in a histogram keyed by its field count; rows whose field
//! count differs from the header's contribute no values.
//!
//! ```no_run
//! use sortstat::io::split::ColumnSplitter;
//! # fn main() -> anyhow::Result<()> {
//! let split = ColumnSplitter::new().split_path("people.csv.gz")?;
//! for (len, rows) in split.histogram() {
//!     println!("{rows} rows with {len} fields");
//! }
//! println!("column files: {:?}", split.columns());
//! split.close()?;
//! # Ok(())
//! # }
//! ```

use crate::io::compression::auto_detect_reader;
use anyhow::{Context, Result, bail};
use csv::{ByteRecord, ReaderBuilder};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info};

/// Field delimiter used unless another is configured.
pub const DEFAULT_DELIMITER: u8 = b'|';

/// Number of data rows per field count.
pub type RowHistogram = BTreeMap<usize, u64>;

/// Splits delimited input into per-column value files.
#[derive(Clone, Debug)]
pub struct ColumnSplitter {
    delimiter: u8,
    temp_root: Option<PathBuf>,
}

impl Default for ColumnSplitter {
    fn default() -> Self {
        Self {
            delimiter: DEFAULT_DELIMITER,
            temp_root: None,
        }
    }
}

impl ColumnSplitter {
    /// `|`-delimited input, column files under the system temp directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `delimiter` between fields.
    #[must_use]
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Create the column directory under `root`.
    #[must_use]
    pub fn with_temp_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.temp_root = Some(root.into());
        self
    }

    /// Split the file at `path`, decompressing it by extension or magic bytes.
    ///
    /// # Errors
    /// See [`ColumnSplitter::split`].
    pub fn split_path(&self, path: impl AsRef<Path>) -> Result<ColumnSplit> {
        let path = path.as_ref();
        let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
        let reader = auto_detect_reader(file, path)
            .with_context(|| format!("setup decompression for {}", path.display()))?;
        self.split(reader)
            .with_context(|| format!("split {}", path.display()))
    }

    /// Split `input` into one file per header column.
    ///
    /// The first row is the header; only its field count is used. Each
    /// field of a matching row is written to its column's file followed by
    /// `\n`. Blank lines are not rows.
    ///
    /// # Errors
    /// Returns an error if the input has no header row, cannot be parsed,
    /// or a column file cannot be written.
    pub fn split<R: Read>(&self, input: R) -> Result<ColumnSplit> {
        let mut reader = ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(true)
            .flexible(true)
            .from_reader(input);
        let width = reader.byte_headers().context("read header row")?.len();
        if width == 0 {
            bail!("input has no header row");
        }

        let dir = self.create_dir()?;
        let mut columns = Vec::with_capacity(width);
        let mut writers = Vec::with_capacity(width);
        for n in 0..width {
            let path = dir.path().join(format!("col-{n}.txt"));
            let file = File::create(&path).with_context(|| format!("create {}", path.display()))?;
            writers.push(BufWriter::new(file));
            let name = path
                .to_str()
                .with_context(|| format!("column path {} is not UTF-8", path.display()))?;
            columns.push(name.to_string());
        }
        debug!(columns = width, dir = %dir.path().display(), "splitting columns");

        let mut histogram = RowHistogram::new();
        let mut record = ByteRecord::new();
        let mut rows = 0u64;
        let mut skipped = 0u64;
        while reader
            .read_byte_record(&mut record)
            .with_context(|| format!("parse row #{}", rows + 1))?
        {
            rows += 1;
            *histogram.entry(record.len()).or_insert(0) += 1;
            if record.len() != width {
                skipped += 1;
                continue;
            }
            for ((writer, field), path) in writers.iter_mut().zip(&record).zip(&columns) {
                writer
                    .write_all(field)
                    .and_then(|()| writer.write_all(b"\n"))
                    .with_context(|| format!("write {path}"))?;
            }
        }
        for (writer, path) in writers.iter_mut().zip(&columns) {
            writer.flush().with_context(|| format!("flush {path}"))?;
        }

        info!(rows, skipped, columns = width, "split input into columns");
        Ok(ColumnSplit {
            histogram,
            columns,
            dir,
        })
    }

    fn create_dir(&self) -> Result<TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("sortstat-columns-");
        match &self.temp_root {
            Some(root) => builder
                .tempdir_in(root)
                .with_context(|| format!("create column directory in {}", root.display())),
            None => builder.tempdir().context("create column directory"),
        }
    }
}

/// Column files produced by [`ColumnSplitter::split`].
///
/// The files live in a temporary directory owned by this value and are
/// deleted when it is dropped or closed.
#[derive(Debug)]
pub struct ColumnSplit {
    histogram: RowHistogram,
    columns: Vec<String>,
    dir: TempDir,
}

impl ColumnSplit {
    /// Data rows per field count, header excluded.
    #[must_use]
    pub fn histogram(&self) -> &RowHistogram {
        &self.histogram
    }

    /// Path of each column's value file, in header order.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Delete the column files now and report any failure.
    ///
    /// # Errors
    /// Returns an error if the directory cannot be removed.
    pub fn close(self) -> Result<()> {
        let path = self.dir.path().to_path_buf();
        self.dir
            .close()
            .with_context(|| format!("remove {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_delimiter_is_pipe() {
        let splitter = ColumnSplitter::new();
        assert_eq!(splitter.delimiter, b'|');
        assert!(splitter.temp_root.is_none());
    }

    #[test]
    fn header_only_input_has_empty_columns() -> Result<()> {
        let split = ColumnSplitter::new().split(&b"a|b|c\n"[..])?;
        assert!(split.histogram().is_empty());
        assert_eq!(split.columns().len(), 3);
        for column in split.columns() {
            assert!(std::fs::read(column)?.is_empty());
        }
        Ok(())
    }

    #[test]
    fn empty_input_is_rejected() {
        let err = ColumnSplitter::new().split(&b""[..]).unwrap_err();
        assert!(err.to_string().contains("no header row"));
    }
}
