//! Newline-delimited byte values.
//!
//! Values are opaque bytes: the stream is split on `\n` only, the delimiter
//! is stripped, and nothing else is decoded or trimmed (a `\r` stays part of
//! the value). A final line without a trailing newline is still a value.

use std::io::{self, BufRead};
use std::iter::FusedIterator;

/// Iterator over the `\n`-delimited values of a [`BufRead`].
pub struct ByteLines<R> {
    reader: R,
    done: bool,
}

impl<R: BufRead> ByteLines<R> {
    /// Wrap a buffered reader.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            done: false,
        }
    }
}

impl<R: BufRead> Iterator for ByteLines<R> {
    type Item = io::Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let mut buf = Vec::new();
        match self.reader.read_until(b'\n', &mut buf) {
            Ok(0) => {
                self.done = true;
                None
            }
            Ok(_) => {
                if buf.last() == Some(&b'\n') {
                    buf.pop();
                }
                Some(Ok(buf))
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

impl<R: BufRead> FusedIterator for ByteLines<R> {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn split(input: &[u8]) -> Vec<Vec<u8>> {
        ByteLines::new(Cursor::new(input.to_vec()))
            .collect::<io::Result<Vec<_>>>()
            .unwrap()
    }

    #[test]
    fn strips_only_the_newline() {
        assert_eq!(split(b"a\r\n\nbc\n"), vec![b"a\r".to_vec(), vec![], b"bc".to_vec()]);
    }

    #[test]
    fn keeps_unterminated_last_line() {
        assert_eq!(split(b"x\ny"), vec![b"x".to_vec(), b"y".to_vec()]);
    }

    #[test]
    fn empty_stream_has_no_values() {
        assert!(split(b"").is_empty());
    }

    #[test]
    fn lone_newline_is_one_blank_value() {
        assert_eq!(split(b"\n"), vec![Vec::<u8>::new()]);
    }

    #[test]
    fn non_utf8_bytes_pass_through() {
        assert_eq!(split(b"\xff\xfe\n"), vec![vec![0xff, 0xfe]]);
    }
}
