//! # FASTA Streaming
//!
//! Minimal record reader that keeps header and sequence lines verbatim so
//! selected records can be written back unchanged.

use std::path::Path;

use crate::error::{PopVcfError, Result};
use crate::io::text::TextReader;

/// One FASTA record as it appeared in the file
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FastaRecord {
    /// Header line including the leading `>`
    pub header: String,
    pub sequence_lines: Vec<String>,
}

impl FastaRecord {
    /// Identifier: header text after `>` up to the first whitespace
    pub fn id(&self) -> &str {
        self.header[1..].split_whitespace().next().unwrap_or("")
    }
}

/// Streaming FASTA reader
pub struct FastaReader {
    reader: TextReader,
    pending_header: Option<String>,
    line_buf: String,
}

impl FastaReader {
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self::from_text(TextReader::open(path)?))
    }

    pub fn from_text(reader: TextReader) -> Self {
        Self {
            reader,
            pending_header: None,
            line_buf: String::new(),
        }
    }

    /// Next record; `None` at end of input
    pub fn next_record(&mut self) -> Result<Option<FastaRecord>> {
        let header = match self.pending_header.take() {
            Some(header) => header,
            None => loop {
                if !self.reader.read_line(&mut self.line_buf)? {
                    return Ok(None);
                }
                if self.line_buf.starts_with('>') {
                    break self.line_buf.clone();
                }
                if !self.line_buf.trim().is_empty() {
                    return Err(PopVcfError::format(
                        self.reader.display_name(),
                        self.reader.line_num(),
                        "sequence data before the first '>' header",
                    ));
                }
            },
        };

        let mut sequence_lines = Vec::new();
        while self.reader.read_line(&mut self.line_buf)? {
            if self.line_buf.starts_with('>') {
                self.pending_header = Some(self.line_buf.clone());
                break;
            }
            sequence_lines.push(self.line_buf.clone());
        }

        Ok(Some(FastaRecord {
            header,
            sequence_lines,
        }))
    }
}
