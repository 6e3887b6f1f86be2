//! Transparent compression for source files and report files.
//!
//! Sources are decompressed before they reach the line splitter, so a
//! `values.txt.gz` summarizes exactly like `values.txt`. Reports written to a
//! path with a known extension are compressed the same way.
//!
//! ## Built-in Codecs
//!
//! When enabled via feature flags:
//! - **Gzip** (`.gz`) - via `flate2` (feature: `compression-gzip`)
//! - **Zstd** (`.zst`) - via `zstd` (feature: `compression-zstd`)
//! - **Bzip2** (`.bz2`) - via `bzip2` (feature: `compression-bzip2`)
//! - **Xz** (`.xz`) - via `xz2` (feature: `compression-xz`)
//!
//! Readers are detected by extension first and by magic bytes second;
//! writers by extension only. Additional codecs can be added with
//! [`register_codec`].
//!
//! Writers are [`FinishWrite`]: a compressed stream is only complete once its
//! trailer is written, so callers end it with [`FinishWrite::finish`] and get
//! the error instead of losing it in a destructor.
//!
//! ```no_run
//! use sortstat::io::compression::auto_detect_reader;
//! use std::fs::File;
//! # fn main() -> std::io::Result<()> {
//! let file = File::open("column.txt.gz")?;
//! let reader = auto_detect_reader(file, "column.txt.gz")?;
//! # Ok(())
//! # }
//! ```

use std::io::{BufRead, BufReader, BufWriter, IntoInnerError, Read, Write};
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};

/// Boxed reader that can move into a worker thread.
pub type SendRead = Box<dyn Read + Send>;

/// A writer that must be finished explicitly to be complete.
pub trait FinishWrite: Write {
    /// Flush buffered data, write any trailer, and finish the inner writer.
    ///
    /// # Errors
    /// Whatever the final writes or flushes return.
    fn finish(self: Box<Self>) -> std::io::Result<()>;
}

impl<W: Write> FinishWrite for BufWriter<W> {
    fn finish(self: Box<Self>) -> std::io::Result<()> {
        let mut inner = (*self).into_inner().map_err(IntoInnerError::into_error)?;
        inner.flush()
    }
}

static CODEC_REGISTRY: RwLock<Option<Vec<Arc<dyn CompressionCodec>>>> = RwLock::new(None);

fn builtin_codecs() -> Vec<Arc<dyn CompressionCodec>> {
    vec![
        #[cfg(feature = "compression-gzip")]
        Arc::new(GzipCodec),
        #[cfg(feature = "compression-zstd")]
        Arc::new(ZstdCodec),
        #[cfg(feature = "compression-bzip2")]
        Arc::new(Bzip2Codec),
        #[cfg(feature = "compression-xz")]
        Arc::new(XzCodec),
    ]
}

fn registry() -> Vec<Arc<dyn CompressionCodec>> {
    {
        let lock = CODEC_REGISTRY.read().unwrap_or_else(PoisonError::into_inner);
        if let Some(codecs) = lock.as_ref() {
            return codecs.clone();
        }
    }
    let mut lock = CODEC_REGISTRY.write().unwrap_or_else(PoisonError::into_inner);
    lock.get_or_insert_with(builtin_codecs).clone()
}

/// Register an extra codec alongside the built-in ones.
pub fn register_codec(codec: Arc<dyn CompressionCodec>) {
    let mut lock = CODEC_REGISTRY.write().unwrap_or_else(PoisonError::into_inner);
    lock.get_or_insert_with(builtin_codecs).push(codec);
}

/// A compression format that can wrap readers and writers.
pub trait CompressionCodec: Send + Sync {
    /// Human-readable codec name (e.g., "gzip").
    fn name(&self) -> &str;

    /// Lowercase extensions including the leading dot (e.g., `&[".gz"]`).
    fn extensions(&self) -> &[&str];

    /// Signature at the start of a compressed stream, if the format has one.
    fn magic_bytes(&self) -> Option<&[u8]>;

    /// Wrap a reader with decompression.
    fn wrap_reader(&self, reader: SendRead) -> std::io::Result<SendRead>;

    /// Wrap a writer with compression.
    fn wrap_writer(&self, writer: Box<dyn FinishWrite>) -> std::io::Result<Box<dyn FinishWrite>>;
}

/// The codec whose extension matches `path`, if any.
pub fn detect_codec(path: impl AsRef<Path>) -> Option<Arc<dyn CompressionCodec>> {
    let name = path.as_ref().to_string_lossy().to_lowercase();
    registry()
        .into_iter()
        .find(|codec| codec.extensions().iter().any(|ext| name.ends_with(ext)))
}

fn detect_from_magic<R: BufRead>(reader: &mut R) -> Option<Arc<dyn CompressionCodec>> {
    let buf = reader.fill_buf().ok()?;
    if buf.is_empty() {
        return None;
    }
    registry()
        .into_iter()
        .find(|codec| codec.magic_bytes().is_some_and(|magic| buf.starts_with(magic)))
}

/// Wrap `reader` with decompression if `path_hint` or the stream's first bytes
/// name a known codec; otherwise return it buffered and untouched.
///
/// # Errors
/// Returns an error if the codec fails to initialise on the stream.
pub fn auto_detect_reader<R: Read + Send + 'static>(
    reader: R,
    path_hint: impl AsRef<Path>,
) -> std::io::Result<SendRead> {
    if let Some(codec) = detect_codec(&path_hint) {
        return codec.wrap_reader(Box::new(reader));
    }
    let mut buffered = BufReader::new(reader);
    if let Some(codec) = detect_from_magic(&mut buffered) {
        return codec.wrap_reader(Box::new(buffered));
    }
    Ok(Box::new(buffered))
}

/// Buffer `writer` and wrap it with compression if `path_hint` has a known
/// extension.
///
/// The result must be ended with [`FinishWrite::finish`].
///
/// # Errors
/// Returns an error if the codec fails to initialise.
pub fn auto_detect_writer<W: Write + 'static>(
    writer: W,
    path_hint: impl AsRef<Path>,
) -> std::io::Result<Box<dyn FinishWrite>> {
    let buffered: Box<dyn FinishWrite> = Box::new(BufWriter::new(writer));
    match detect_codec(&path_hint) {
        Some(codec) => codec.wrap_writer(buffered),
        None => Ok(buffered),
    }
}

#[cfg(feature = "compression-gzip")]
struct GzipCodec;

#[cfg(feature = "compression-gzip")]
impl CompressionCodec for GzipCodec {
    fn name(&self) -> &str {
        "gzip"
    }

    fn extensions(&self) -> &[&str] {
        &[".gz", ".gzip"]
    }

    fn magic_bytes(&self) -> Option<&[u8]> {
        Some(&[0x1f, 0x8b])
    }

    fn wrap_reader(&self, reader: SendRead) -> std::io::Result<SendRead> {
        // Multi-member files are what `cat a.gz b.gz` produces.
        Ok(Box::new(flate2::read::MultiGzDecoder::new(reader)))
    }

    fn wrap_writer(&self, writer: Box<dyn FinishWrite>) -> std::io::Result<Box<dyn FinishWrite>> {
        use flate2::Compression;
        use flate2::write::GzEncoder;
        Ok(Box::new(GzEncoder::new(writer, Compression::default())))
    }
}

#[cfg(feature = "compression-gzip")]
impl FinishWrite for flate2::write::GzEncoder<Box<dyn FinishWrite>> {
    fn finish(mut self: Box<Self>) -> std::io::Result<()> {
        self.try_finish()?;
        flate2::write::GzEncoder::finish(*self)?.finish()
    }
}

#[cfg(feature = "compression-zstd")]
struct ZstdCodec;

#[cfg(feature = "compression-zstd")]
impl CompressionCodec for ZstdCodec {
    fn name(&self) -> &str {
        "zstd"
    }

    fn extensions(&self) -> &[&str] {
        &[".zst", ".zstd"]
    }

    fn magic_bytes(&self) -> Option<&[u8]> {
        Some(&[0x28, 0xb5, 0x2f, 0xfd])
    }

    fn wrap_reader(&self, reader: SendRead) -> std::io::Result<SendRead> {
        zstd::stream::read::Decoder::new(reader).map(|d| Box::new(d) as SendRead)
    }

    fn wrap_writer(&self, writer: Box<dyn FinishWrite>) -> std::io::Result<Box<dyn FinishWrite>> {
        zstd::stream::write::Encoder::new(writer, 3).map(|e| Box::new(e) as Box<dyn FinishWrite>)
    }
}

#[cfg(feature = "compression-zstd")]
impl FinishWrite for zstd::stream::write::Encoder<'static, Box<dyn FinishWrite>> {
    fn finish(self: Box<Self>) -> std::io::Result<()> {
        zstd::stream::write::Encoder::finish(*self)?.finish()
    }
}

#[cfg(feature = "compression-bzip2")]
struct Bzip2Codec;

#[cfg(feature = "compression-bzip2")]
impl CompressionCodec for Bzip2Codec {
    fn name(&self) -> &str {
        "bzip2"
    }

    fn extensions(&self) -> &[&str] {
        &[".bz2", ".bzip2"]
    }

    fn magic_bytes(&self) -> Option<&[u8]> {
        Some(b"BZh")
    }

    fn wrap_reader(&self, reader: SendRead) -> std::io::Result<SendRead> {
        Ok(Box::new(bzip2::read::MultiBzDecoder::new(reader)))
    }

    fn wrap_writer(&self, writer: Box<dyn FinishWrite>) -> std::io::Result<Box<dyn FinishWrite>> {
        use bzip2::Compression;
        use bzip2::write::BzEncoder;
        Ok(Box::new(BzEncoder::new(writer, Compression::default())))
    }
}

#[cfg(feature = "compression-bzip2")]
impl FinishWrite for bzip2::write::BzEncoder<Box<dyn FinishWrite>> {
    fn finish(mut self: Box<Self>) -> std::io::Result<()> {
        self.try_finish()?;
        bzip2::write::BzEncoder::finish(*self)?.finish()
    }
}

#[cfg(feature = "compression-xz")]
struct XzCodec;

#[cfg(feature = "compression-xz")]
impl CompressionCodec for XzCodec {
    fn name(&self) -> &str {
        "xz"
    }

    fn extensions(&self) -> &[&str] {
        &[".xz"]
    }

    fn magic_bytes(&self) -> Option<&[u8]> {
        Some(&[0xfd, 0x37, 0x7a, 0x58, 0x5a, 0x00])
    }

    fn wrap_reader(&self, reader: SendRead) -> std::io::Result<SendRead> {
        Ok(Box::new(xz2::read::XzDecoder::new_multi_decoder(reader)))
    }

    fn wrap_writer(&self, writer: Box<dyn FinishWrite>) -> std::io::Result<Box<dyn FinishWrite>> {
        Ok(Box::new(xz2::write::XzEncoder::new(writer, 6)))
    }
}

#[cfg(feature = "compression-xz")]
impl FinishWrite for xz2::write::XzEncoder<Box<dyn FinishWrite>> {
    fn finish(mut self: Box<Self>) -> std::io::Result<()> {
        self.try_finish()?;
        xz2::write::XzEncoder::finish(*self)?.finish()
    }
}
