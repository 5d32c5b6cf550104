use crate::parser::errors::{OpError, OpErrorKind, OpResult};
use log::debug;
use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

#[cfg(feature = "gzip")]
use flate2::read::MultiGzDecoder;

const GZIP_EXTENSION: &str = "gz";

///
/// One record of a block archive, exactly as found on disk.
///
/// The bytes are not validated as JSON: that is left to the chain adapter.
///
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawBlock {
    /// 1-based line number of the record in the (decompressed) archive
    pub line: usize,
    pub data: Vec<u8>,
}

impl AsRef<[u8]> for RawBlock {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

///
/// Streaming reader over a newline-delimited JSON block archive.
///
/// Records are materialized one line at a time. Paths ending in `.gz`
/// are decompressed transparently.
///
/// The underlying stream is released on the first of: end of input,
/// a read error, or `close()`.
///
pub struct BlockReader {
    inner: Option<Box<dyn BufRead + Send>>,
    path: Option<PathBuf>,
    compressed: bool,
    line: usize,
}

impl BlockReader {
    ///
    /// Open a block archive on disk.
    ///
    /// Fails with `IoError` if the file cannot be opened, and with
    /// `FormatError` if it is gzip-suffixed but not a gzip stream.
    ///
    pub fn open<P: AsRef<Path>>(path: P) -> OpResult<BlockReader> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| OpError::from(e).with_path(Some(path)))?;
        let compressed = is_gzip_path(path);
        let inner = if compressed {
            open_gzip(file, path)?
        } else {
            Box::new(BufReader::new(file)) as Box<dyn BufRead + Send>
        };
        debug!("opened {} (gzip: {})", path.display(), compressed);
        Ok(BlockReader {
            inner: Some(inner),
            path: Some(path.to_path_buf()),
            compressed,
            line: 0,
        })
    }

    /// Wrap an already opened, uncompressed source.
    pub fn from_reader<R: Read + Send + 'static>(reader: R) -> BlockReader {
        BlockReader {
            inner: Some(Box::new(BufReader::new(reader))),
            path: None,
            compressed: false,
            line: 0,
        }
    }

    ///
    /// Read the next non-blank record.
    ///
    /// `Ok(None)` marks the end of the archive and is returned
    /// on every later call as well.
    ///
    pub fn next_block(&mut self) -> OpResult<Option<RawBlock>> {
        loop {
            let mut data = Vec::new();
            let read = match self.inner.as_mut() {
                None => return Ok(None),
                Some(inner) => inner.read_until(b'\n', &mut data),
            };
            let read = match read {
                Ok(n) => n,
                Err(e) => {
                    let err = self.read_error(e);
                    self.close();
                    return Err(err);
                }
            };
            if read == 0 {
                self.close();
                return Ok(None);
            }
            self.line += 1;
            trim_line_ending(&mut data);
            if data.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            return Ok(Some(RawBlock {
                line: self.line,
                data,
            }));
        }
    }

    /// Release the underlying stream. Calling it again is a no-op.
    pub fn close(&mut self) {
        if self.inner.take().is_some() {
            debug!("closed {} after {} lines", self.display_path(), self.line);
        }
    }

    pub fn is_closed(&self) -> bool {
        self.inner.is_none()
    }

    /// path of the archive, `None` for in-memory sources
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// number of lines consumed so far, blank lines included
    pub fn lines_read(&self) -> usize {
        self.line
    }

    fn display_path(&self) -> String {
        match &self.path {
            Some(p) => p.display().to_string(),
            None => "<stream>".to_owned(),
        }
    }

    fn read_error(&self, err: io::Error) -> OpError {
        let line = self.line + 1;
        let err = if self.compressed && is_corrupt_stream(&err) {
            OpError::new(OpErrorKind::FormatError).join_msg(&format!("corrupt gzip stream: {}", err))
        } else {
            OpError::from(err)
        };
        err.with_path(self.path()).at_line(line)
    }
}

impl Iterator for BlockReader {
    type Item = OpResult<RawBlock>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_block().transpose()
    }
}

impl fmt::Debug for BlockReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockReader")
            .field("path", &self.path)
            .field("compressed", &self.compressed)
            .field("line", &self.line)
            .field("closed", &self.is_closed())
            .finish()
    }
}

fn is_gzip_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map_or(false, |ext| ext.eq_ignore_ascii_case(GZIP_EXTENSION))
}

fn is_corrupt_stream(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::InvalidInput | io::ErrorKind::InvalidData | io::ErrorKind::UnexpectedEof
    )
}

#[cfg(feature = "gzip")]
fn open_gzip(file: File, path: &Path) -> OpResult<Box<dyn BufRead + Send>> {
    let mut reader = BufReader::new(MultiGzDecoder::new(file));
    // decode the header now so a bad wrapper fails at open
    if let Err(e) = reader.fill_buf() {
        let err = if is_corrupt_stream(&e) {
            OpError::new(OpErrorKind::FormatError).join_msg(&format!("invalid gzip header: {}", e))
        } else {
            OpError::from(e)
        };
        return Err(err.with_path(Some(path)));
    }
    Ok(Box::new(reader))
}

#[cfg(not(feature = "gzip"))]
fn open_gzip(_file: File, path: &Path) -> OpResult<Box<dyn BufRead + Send>> {
    Err(OpError::new(OpErrorKind::FormatError)
        .join_msg("gzip support not enabled (feature `gzip`)")
        .with_path(Some(path)))
}

fn trim_line_ending(data: &mut Vec<u8>) {
    if data.last() == Some(&b'\n') {
        data.pop();
        if data.last() == Some(&b'\r') {
            data.pop();
        }
    }
}
