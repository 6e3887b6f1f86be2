use sortstat::summary::{SummaryRecord, summarize, summarize_reader, summarize_values};
use sortstat::testing::assert_approx_eq;
use sortstat::{Result, SummaryError};
use std::io::Cursor;

#[test]
fn blanks_and_repeats() -> Result<()> {
    let r = summarize_values(["", "", "a", "a", "b"])?;
    assert_eq!(r.num_values, 5);
    assert_eq!(r.num_fills, 3);
    assert_approx_eq(r.fill_ratio, 0.6);
    assert_eq!(r.num_uniques, 3);
    assert_eq!(r.max_len, 1);
    assert_eq!(r.min_len, 0);
    assert_approx_eq(r.avg_len, 0.6);
    Ok(())
}

#[test]
fn single_repeated_value() -> Result<()> {
    let r = summarize_values(["a", "a", "a"])?;
    assert_eq!(
        r,
        SummaryRecord {
            num_values: 3,
            num_fills: 3,
            fill_ratio: 1.0,
            max_len: 1,
            min_len: 1,
            avg_len: 1.0,
            num_uniques: 1,
        }
    );
    Ok(())
}

#[test]
fn blank_first_is_sorted_blank_last_is_not() -> Result<()> {
    let r = summarize_values(["", "x"])?;
    assert_eq!(r.num_values, 2);
    assert_eq!(r.num_fills, 1);
    assert_approx_eq(r.fill_ratio, 0.5);

    let err = summarize_values(["x", ""]).unwrap_err();
    assert!(matches!(err, SummaryError::Unsorted { position: 2 }));
    Ok(())
}

#[test]
fn adjacent_inversion_fails() {
    let err = summarize_values(["b", "a"]).unwrap_err();
    assert!(matches!(err, SummaryError::Unsorted { .. }));
}

#[test]
fn empty_input_fails() {
    let err = summarize_values(Vec::<Vec<u8>>::new()).unwrap_err();
    assert!(matches!(err, SummaryError::EmptyInput));
}

#[test]
fn all_blank_values() -> Result<()> {
    let r = summarize_values(["", "", ""])?;
    assert_eq!(r.num_values, 3);
    assert_eq!(r.num_fills, 0);
    assert_approx_eq(r.fill_ratio, 0.0);
    assert_eq!(r.max_len, 0);
    assert_eq!(r.min_len, 0);
    assert_approx_eq(r.avg_len, 0.0);
    assert_eq!(r.num_uniques, 1);
    Ok(())
}

#[test]
fn lengths_are_bytes_not_chars() -> Result<()> {
    // "é" is two bytes in UTF-8.
    let r = summarize_values(["a", "é"])?;
    assert_eq!(r.min_len, 1);
    assert_eq!(r.max_len, 2);
    assert_approx_eq(r.avg_len, 1.5);
    Ok(())
}

#[test]
fn average_weights_by_occurrence() -> Result<()> {
    let r = summarize_values(["aaaa", "aaaa", "aaaa", "b"])?;
    assert_eq!(r.num_uniques, 2);
    assert_approx_eq(r.avg_len, 13.0 / 4.0);
    Ok(())
}

#[test]
fn same_input_gives_same_record() -> Result<()> {
    let input = ["", "k", "k", "kk", "zz"];
    assert_eq!(summarize_values(input)?, summarize_values(input)?);
    Ok(())
}

#[test]
fn reader_strips_newlines() -> Result<()> {
    let r = summarize_reader("mem", Cursor::new(b"\n\na\na\nb\n".to_vec()))?;
    assert_eq!(r, summarize_values(["", "", "a", "a", "b"])?);
    Ok(())
}

#[test]
fn reader_keeps_carriage_returns() -> Result<()> {
    // "a\r" sorts after "a", and is two bytes long.
    let r = summarize_reader("mem", Cursor::new(b"a\na\r\n".to_vec()))?;
    assert_eq!(r.num_uniques, 2);
    assert_eq!(r.max_len, 2);
    Ok(())
}

#[test]
fn empty_reader_fails() {
    let err = summarize_reader("mem", Cursor::new(Vec::new())).unwrap_err();
    assert!(matches!(err, SummaryError::EmptyInput));
}

#[test]
fn read_failures_are_source_errors() {
    struct Broken;
    impl std::io::Read for Broken {
        fn read(&mut self, _: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::Error::other("disk on fire"))
        }
    }
    let err = summarize_reader("broken", std::io::BufReader::new(Broken)).unwrap_err();
    match err {
        SummaryError::SourceIo { path, .. } => assert_eq!(path, "broken"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn upstream_errors_stop_the_summary() {
    let values: Vec<Result<&str>> = vec![Ok("a"), Err(SummaryError::Cancelled)];
    assert!(matches!(summarize(values), Err(SummaryError::Cancelled)));
}
