#![cfg(feature = "io-csv")]

use anyhow::Result;
use sortstat::io::split::{ColumnSplitter, RowHistogram};
use sortstat::testing::{assert_approx_eq, bytes_file};
use sortstat::{InProcessSort, Runner};
use std::path::Path;
use tempfile::TempDir;

/// Header, a row with a blank field, a full row, and a short row.
const TOY: &[u8] = b"a|b\n1|\nfoobar|baz\nx";

fn column_lines(path: &str) -> Result<Vec<String>> {
    Ok(std::fs::read_to_string(path)?
        .lines()
        .map(str::to_string)
        .collect())
}

#[test]
fn toy_input_histogram_and_columns() -> Result<()> {
    let split = ColumnSplitter::new().split(TOY)?;
    assert_eq!(split.histogram(), &RowHistogram::from([(2, 2), (1, 1)]));
    assert_eq!(split.columns().len(), 2);
    assert_eq!(column_lines(&split.columns()[0])?, vec!["1", "foobar"]);
    assert_eq!(std::fs::read(&split.columns()[1])?, b"\nbaz\n");
    Ok(())
}

#[test]
fn columns_summarize_like_any_source() -> Result<()> {
    let split = ColumnSplitter::new().split(TOY)?;
    let results = Runner::new(2).summarize_all(&InProcessSort, split.columns())?;

    assert_eq!(results[0].path, split.columns()[0]);
    let first = &results[0].summary;
    assert_eq!((first.num_values, first.num_fills, first.num_uniques), (2, 2, 2));
    assert_eq!((first.min_len, first.max_len), (1, 6));
    assert_approx_eq(first.avg_len, 3.5);

    let second = &results[1].summary;
    assert_eq!((second.num_values, second.num_fills), (2, 1));
    assert_eq!((second.min_len, second.max_len), (0, 3));
    assert_approx_eq(second.fill_ratio, 0.5);
    assert_approx_eq(second.avg_len, 1.5);
    Ok(())
}

#[test]
fn mismatched_rows_are_counted_but_not_written() -> Result<()> {
    let split = ColumnSplitter::new().split(&b"a|b|c\n1|2|3\n4|5\n6|7|8|9\n10|11|12\n"[..])?;
    assert_eq!(split.histogram(), &RowHistogram::from([(2, 1), (3, 2), (4, 1)]));
    assert_eq!(column_lines(&split.columns()[0])?, vec!["1", "10"]);
    assert_eq!(column_lines(&split.columns()[2])?, vec!["3", "12"]);
    Ok(())
}

#[test]
fn custom_delimiter_and_quoted_fields() -> Result<()> {
    let split = ColumnSplitter::new()
        .with_delimiter(b',')
        .split(&b"name,city\n\"Doe, J\",Paris\nRoe|K,Oslo\n"[..])?;
    assert_eq!(split.histogram(), &RowHistogram::from([(2, 2)]));
    assert_eq!(column_lines(&split.columns()[0])?, vec!["Doe, J", "Roe|K"]);
    assert_eq!(column_lines(&split.columns()[1])?, vec!["Paris", "Oslo"]);
    Ok(())
}

#[test]
fn closing_deletes_the_column_files() -> Result<()> {
    let split = ColumnSplitter::new().split(TOY)?;
    let first = split.columns()[0].clone();
    assert!(Path::new(&first).exists());
    split.close()?;
    assert!(!Path::new(&first).exists());
    Ok(())
}

#[test]
fn dropping_deletes_the_column_files() -> Result<()> {
    let root = TempDir::new()?;
    let split = ColumnSplitter::new().with_temp_root(root.path()).split(TOY)?;
    assert!(split.columns().iter().all(|c| Path::new(c).starts_with(root.path())));
    drop(split);
    assert_eq!(std::fs::read_dir(root.path())?.count(), 0);
    Ok(())
}

#[test]
fn split_path_reads_plain_files() -> Result<()> {
    let file = bytes_file(".csv", TOY)?;
    let split = ColumnSplitter::new().split_path(file.path())?;
    assert_eq!(split.histogram().values().sum::<u64>(), 3);
    Ok(())
}

#[cfg(feature = "compression-gzip")]
#[test]
fn split_path_decompresses() -> Result<()> {
    let file = sortstat::testing::compressed_lines_file(".csv.gz", &["a|b", "1|2", "3|4"])?;
    let split = ColumnSplitter::new().split_path(file.path())?;
    assert_eq!(split.histogram(), &RowHistogram::from([(2, 2)]));
    assert_eq!(column_lines(&split.columns()[1])?, vec!["2", "4"]);
    Ok(())
}

#[test]
fn missing_file_names_the_path() {
    let err = ColumnSplitter::new()
        .split_path("/definitely/not/here.csv")
        .unwrap_err();
    assert!(format!("{err:#}").contains("/definitely/not/here.csv"));
}
