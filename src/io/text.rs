//! # Line-Oriented Text I/O
//!
//! Transparent reading and writing of plain or gzip-compressed text files.
//! Every other module goes through [`TextReader`] and [`TextWriter`].
//!
//! Text is treated as Latin-1: each byte becomes one `char` on read and goes
//! back to the same byte on write, so any 8-bit input survives a
//! read/write cycle unchanged. `\n` and `\r\n` terminators are stripped on
//! read and output lines always end with `\n`.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::error::{PopVcfError, Result};

/// True when the path names a gzip file
pub fn is_gzipped(path: &Path) -> bool {
    path.extension().map(|e| e == "gz").unwrap_or(false)
}

/// Line reader over a plain or gzip stream
pub struct TextReader {
    reader: Box<dyn BufRead + Send>,
    path: PathBuf,
    line_num: usize,
    bytes: Vec<u8>,
}

impl TextReader {
    /// Open a file, decompressing it when its name ends with `.gz`
    pub fn open(path: &Path) -> Result<Self> {
        let gzipped = is_gzipped(path);
        let file = File::open(path).map_err(|source| PopVcfError::FileOpen {
            path: path.to_path_buf(),
            gzipped,
            source,
        })?;

        let reader: Box<dyn BufRead + Send> = if gzipped {
            Box::new(BufReader::new(MultiGzDecoder::new(file)))
        } else {
            Box::new(BufReader::new(file))
        };

        Ok(Self::from_reader(reader, path))
    }

    /// Wrap an already opened reader; `path` is only used in messages
    pub fn from_reader(reader: Box<dyn BufRead + Send>, path: impl Into<PathBuf>) -> Self {
        Self {
            reader,
            path: path.into(),
            line_num: 0,
            bytes: Vec::with_capacity(1024),
        }
    }

    /// Read the next line into `buf` without its terminator.
    /// Returns `false` at end of input.
    pub fn read_line(&mut self, buf: &mut String) -> Result<bool> {
        buf.clear();
        self.bytes.clear();
        let n = self
            .reader
            .read_until(b'\n', &mut self.bytes)
            .map_err(|e| PopVcfError::io(&self.path, e))?;
        if n == 0 {
            return Ok(false);
        }
        self.line_num += 1;

        let mut end = self.bytes.len();
        if end > 0 && self.bytes[end - 1] == b'\n' {
            end -= 1;
            if end > 0 && self.bytes[end - 1] == b'\r' {
                end -= 1;
            }
        }
        buf.extend(self.bytes[..end].iter().map(|&b| b as char));
        Ok(true)
    }

    /// Number of lines read so far (1-based number of the last line)
    pub fn line_num(&self) -> usize {
        self.line_num
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name for error messages
    pub fn display_name(&self) -> String {
        self.path.display().to_string()
    }
}

enum Sink {
    Plain(BufWriter<Box<dyn Write + Send>>),
    Gzip(BufWriter<GzEncoder<File>>),
}

/// Line writer over a plain or gzip stream
pub struct TextWriter {
    sink: Option<Sink>,
    path: PathBuf,
    bytes: Vec<u8>,
}

impl TextWriter {
    /// Create a file, compressing it when its name ends with `.gz`
    pub fn create(path: &Path) -> Result<Self> {
        let gzipped = is_gzipped(path);
        let file = File::create(path).map_err(|source| PopVcfError::FileCreate {
            path: path.to_path_buf(),
            gzipped,
            source,
        })?;

        let sink = if gzipped {
            Sink::Gzip(BufWriter::new(GzEncoder::new(file, Compression::default())))
        } else {
            let inner: Box<dyn Write + Send> = Box::new(file);
            Sink::Plain(BufWriter::new(inner))
        };

        Ok(Self {
            sink: Some(sink),
            path: path.to_path_buf(),
            bytes: Vec::with_capacity(1024),
        })
    }

    /// Wrap an arbitrary writer (used by tests with in-memory buffers)
    pub fn from_writer(writer: Box<dyn Write + Send>, path: impl Into<PathBuf>) -> Self {
        Self {
            sink: Some(Sink::Plain(BufWriter::new(writer))),
            path: path.into(),
            bytes: Vec::with_capacity(1024),
        }
    }

    /// Write `line` followed by `\n`
    pub fn write_line(&mut self, line: &str) -> Result<()> {
        self.bytes.clear();
        // chars above U+00FF cannot come from a Latin-1 reader
        self.bytes
            .extend(line.chars().map(|c| u8::try_from(c).unwrap_or(b'?')));
        self.bytes.push(b'\n');

        let result = match self.sink.as_mut() {
            Some(Sink::Plain(w)) => w.write_all(&self.bytes),
            Some(Sink::Gzip(w)) => w.write_all(&self.bytes),
            None => Ok(()),
        };
        result.map_err(|e| PopVcfError::io(&self.path, e))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flush buffers and terminate the gzip stream
    pub fn finish(mut self) -> Result<()> {
        self.close()
    }

    fn close(&mut self) -> Result<()> {
        let path = self.path.clone();
        match self.sink.take() {
            Some(Sink::Plain(mut w)) => w.flush().map_err(|e| PopVcfError::io(&path, e)),
            Some(Sink::Gzip(w)) => {
                let encoder = w
                    .into_inner()
                    .map_err(|e| PopVcfError::io(&path, e.into_error()))?;
                encoder
                    .finish()
                    .map(|_| ())
                    .map_err(|e| PopVcfError::io(&path, e))
            }
            None => Ok(()),
        }
    }
}

impl Drop for TextWriter {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
