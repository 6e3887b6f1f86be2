//! Sorted-source collaborators.
//!
//! A [`SortedSource`] turns a source identifier (a file path) into a stream of
//! byte values in byte-lexicographic order. The summarizer trusts that order
//! and only verifies it, so any implementation that preserves byte-exact
//! values and `LC_ALL=C` ordering can be plugged in:
//!
//! - [`ExternalSort`] pipes the file through the system `sort` utility.
//! - [`InProcessSort`] loads every value into memory and sorts it there.
//! - [`Presorted`] streams a file that is already sorted.
//!
//! All three decompress inputs transparently via [`crate::io::compression`].

use crate::error::{Result, SummaryError};
use crate::io::compression::{SendRead, auto_detect_reader, detect_codec};
use crate::io::lines::ByteLines;
use std::ffi::{OsStr, OsString};
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::process::{Child, ChildStderr, Command, Stdio};
use std::thread::JoinHandle;
use tracing::debug;

/// Produces a sorted value stream for a source identifier.
pub trait SortedSource: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Open `path` as a sorted value stream.
    ///
    /// # Errors
    /// [`SummaryError::SourceIo`] if the source cannot be opened.
    fn open(&self, path: &str) -> Result<SortedLines>;
}

type ValueIter = Box<dyn Iterator<Item = io::Result<Vec<u8>>> + Send>;

/// An open sorted stream, exclusively owned by one pipeline.
///
/// Dropping the handle releases everything it holds. When it is backed by a
/// `sort` process, a child that is still running is killed and reaped.
pub struct SortedLines {
    path: String,
    // Declared before `process` so the pipe closes before the child is reaped.
    values: ValueIter,
    process: Option<SortProcess>,
}

impl SortedLines {
    /// Wrap an already-sorted value iterator.
    pub fn new<I>(path: impl Into<String>, values: I) -> Self
    where
        I: Iterator<Item = io::Result<Vec<u8>>> + Send + 'static,
    {
        Self {
            path: path.into(),
            values: Box::new(values),
            process: None,
        }
    }
}

impl Iterator for SortedLines {
    type Item = Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.values.next() {
            Some(Ok(value)) => Some(Ok(value)),
            Some(Err(e)) => {
                self.process = None;
                Some(Err(SummaryError::io(&self.path, e)))
            }
            None => {
                let process = self.process.take()?;
                process
                    .finish()
                    .err()
                    .map(|e| Err(SummaryError::io(&self.path, e)))
            }
        }
    }
}

struct SortProcess {
    program: OsString,
    child: Child,
    stderr: Option<ChildStderr>,
    feeder: Option<JoinHandle<io::Result<u64>>>,
}

impl SortProcess {
    /// Wait for a child whose stdout is exhausted and check how it exited.
    ///
    /// A failed child is reported with its stderr. The feeder's error only
    /// matters when the child succeeded: a child that exits early breaks the
    /// feeder's pipe, and that `EPIPE` says nothing about the cause.
    fn finish(mut self) -> io::Result<()> {
        let mut message = String::new();
        if let Some(mut stderr) = self.stderr.take() {
            stderr.read_to_string(&mut message)?;
        }
        let status = self.child.wait()?;
        let fed = self
            .feeder
            .take()
            .map(|feeder| {
                feeder
                    .join()
                    .map_err(|_| io::Error::other("input feeder thread panicked"))?
            })
            .transpose();
        if !status.success() {
            return Err(io::Error::other(format!(
                "{} exited with {status}: {}",
                self.program.to_string_lossy(),
                message.trim()
            )));
        }
        fed.map(|_| ())
    }
}

impl Drop for SortProcess {
    fn drop(&mut self) {
        if let Ok(None) = self.child.try_wait() {
            let _ = self.child.kill();
        }
        let _ = self.child.wait();
    }
}

/// Sorts each source with an external `sort` process under `LC_ALL=C`.
///
/// Plain files are handed to `sort` by path. Files with a compression
/// extension are decompressed here and streamed into the child's stdin.
#[derive(Clone, Debug)]
pub struct ExternalSort {
    program: OsString,
    args: Vec<OsString>,
}

impl Default for ExternalSort {
    fn default() -> Self {
        Self {
            program: OsString::from("sort"),
            args: Vec::new(),
        }
    }
}

impl ExternalSort {
    /// `sort` from `PATH`, no extra arguments.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different sort executable (e.g. `gsort`).
    #[must_use]
    pub fn with_program(mut self, program: impl Into<OsString>) -> Self {
        self.program = program.into();
        self
    }

    /// Extra arguments placed before the input, e.g. `["-S", "2G"]`.
    #[must_use]
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args = args.into_iter().map(|a| a.as_ref().to_owned()).collect();
        self
    }

    fn spawn(&self, path: &str) -> io::Result<(ValueIter, SortProcess)> {
        let codec = detect_codec(path);

        let mut cmd = Command::new(&self.program);
        cmd.env("LC_ALL", "C")
            .args(&self.args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if codec.is_some() {
            cmd.stdin(Stdio::piped());
        } else {
            cmd.stdin(Stdio::null()).arg("--").arg(path);
        }

        let mut child = cmd.spawn()?;
        let stdout = child.stdout.take();
        let stdin = child.stdin.take();
        let mut process = SortProcess {
            program: self.program.clone(),
            stderr: child.stderr.take(),
            child,
            feeder: None,
        };

        if let Some(codec) = codec {
            let mut stdin = stdin.ok_or_else(|| io::Error::other("sort stdin not captured"))?;
            let mut reader = codec.wrap_reader(Box::new(File::open(path)?))?;
            debug!(path, codec = codec.name(), "feeding decompressed input to sort");
            process.feeder = Some(std::thread::spawn(move || {
                io::copy(&mut reader, &mut stdin)
            }));
        }

        let stdout = stdout.ok_or_else(|| io::Error::other("sort stdout not captured"))?;
        Ok((Box::new(ByteLines::new(BufReader::new(stdout))), process))
    }
}

impl SortedSource for ExternalSort {
    fn name(&self) -> &str {
        "external"
    }

    fn open(&self, path: &str) -> Result<SortedLines> {
        let (values, process) = self.spawn(path).map_err(|e| SummaryError::io(path, e))?;
        debug!(path, program = ?self.program, "spawned external sort");
        Ok(SortedLines {
            path: path.to_string(),
            values,
            process: Some(process),
        })
    }
}

fn open_decompressed(path: &str) -> Result<SendRead> {
    File::open(path)
        .and_then(|f| auto_detect_reader(f, path))
        .map_err(|e| SummaryError::io(path, e))
}

/// Reads a whole source into memory and sorts it byte-wise.
///
/// Memory grows with the source; prefer [`ExternalSort`] for inputs that do
/// not fit.
#[derive(Clone, Copy, Debug, Default)]
pub struct InProcessSort;

impl SortedSource for InProcessSort {
    fn name(&self) -> &str {
        "in-process"
    }

    fn open(&self, path: &str) -> Result<SortedLines> {
        let reader = open_decompressed(path)?;
        let mut values = ByteLines::new(BufReader::new(reader))
            .collect::<io::Result<Vec<_>>>()
            .map_err(|e| SummaryError::io(path, e))?;
        values.sort_unstable();
        debug!(path, values = values.len(), "sorted source in memory");
        Ok(SortedLines::new(path, values.into_iter().map(Ok)))
    }
}

/// Streams a source that is already sorted.
///
/// Nothing is sorted here; an out-of-order file is reported by the
/// aggregator as [`SummaryError::Unsorted`].
#[derive(Clone, Copy, Debug, Default)]
pub struct Presorted;

impl SortedSource for Presorted {
    fn name(&self) -> &str {
        "presorted"
    }

    fn open(&self, path: &str) -> Result<SortedLines> {
        let reader = open_decompressed(path)?;
        Ok(SortedLines::new(path, ByteLines::new(BufReader::new(reader))))
    }
}
