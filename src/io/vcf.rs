//! # VCF Reading and Writing
//!
//! Streams a VCF one line at a time. Metadata (`##`) and the column header
//! (`#CHROM`) are kept verbatim; data lines become [`VariantRecord`]s. The
//! writer emits exactly what the reader produced, so a read/write cycle with
//! no transformation in between reproduces the input.

use std::path::Path;

use tracing::info_span;

use crate::data::record::VariantRecord;
use crate::error::{PopVcfError, Result};
use crate::io::text::{TextReader, TextWriter};

/// Number of fixed columns before the samples
pub const N_FIXED_COLUMNS: usize = 9;

/// The `#CHROM` line and the sample names it declares
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VcfHeader {
    pub line: String,
    pub samples: Vec<String>,
}

impl VcfHeader {
    pub fn parse(line: &str) -> Self {
        let samples = line
            .split('\t')
            .skip(N_FIXED_COLUMNS)
            .map(|s| s.to_string())
            .collect();
        Self {
            line: line.to_string(),
            samples,
        }
    }

    /// Build a header line for the given samples
    pub fn for_samples(samples: Vec<String>) -> Self {
        let mut line = String::from("#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT");
        for sample in &samples {
            line.push('\t');
            line.push_str(sample);
        }
        Self { line, samples }
    }

    pub fn n_samples(&self) -> usize {
        self.samples.len()
    }
}

/// A classified VCF line
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VcfLine {
    Meta(String),
    Header(VcfHeader),
    Record(VariantRecord),
}

/// Streaming VCF reader
pub struct VcfReader {
    reader: TextReader,
    header: Option<VcfHeader>,
    line_buf: String,
}

impl VcfReader {
    /// Open a plain or gzipped VCF
    pub fn open(path: &Path) -> Result<Self> {
        info_span!("vcf_open", path = ?path).in_scope(|| TextReader::open(path).map(Self::from_text))
    }

    /// Create from an already opened text reader
    pub fn from_text(reader: TextReader) -> Self {
        Self {
            reader,
            header: None,
            line_buf: String::with_capacity(4096),
        }
    }

    /// Header, once the `#CHROM` line has been read
    pub fn header(&self) -> Option<&VcfHeader> {
        self.header.as_ref()
    }

    /// Sample names declared by the header (empty before it is read)
    pub fn samples(&self) -> &[String] {
        self.header.as_ref().map(|h| h.samples.as_slice()).unwrap_or(&[])
    }

    /// Fail with `SampleNumberMismatch` unless the header declares `expected` samples
    pub fn expect_sample_count(&self, expected: usize) -> Result<()> {
        let found = self.samples().len();
        if found != expected {
            return Err(PopVcfError::SampleNumberMismatch {
                file: self.reader.display_name(),
                record: self.reader.line_num(),
                expected,
                found,
            });
        }
        Ok(())
    }

    /// Number of the last line read
    pub fn record_num(&self) -> usize {
        self.reader.line_num()
    }

    pub fn display_name(&self) -> String {
        self.reader.display_name()
    }

    /// Read and classify the next line; `None` at end of input
    pub fn next_line(&mut self) -> Result<Option<VcfLine>> {
        if !self.reader.read_line(&mut self.line_buf)? {
            return Ok(None);
        }
        let line = &self.line_buf;

        if line.starts_with("##") {
            return Ok(Some(VcfLine::Meta(line.clone())));
        }
        if line.starts_with('#') {
            let header = VcfHeader::parse(line);
            self.header = Some(header.clone());
            return Ok(Some(VcfLine::Header(header)));
        }

        let record = self.parse_record()?;
        Ok(Some(VcfLine::Record(record)))
    }

    /// Copy metadata and header lines to `writer` until the first record,
    /// which is returned
    pub fn copy_header(&mut self, writer: &mut VcfWriter) -> Result<Option<VariantRecord>> {
        while let Some(line) = self.next_line()? {
            match line {
                VcfLine::Record(record) => return Ok(Some(record)),
                other => writer.write(&other)?,
            }
        }
        Ok(None)
    }

    /// Next data record, skipping nothing: metadata after the header is an error
    pub fn next_record(&mut self) -> Result<Option<VariantRecord>> {
        match self.next_line()? {
            None => Ok(None),
            Some(VcfLine::Record(record)) => Ok(Some(record)),
            Some(_) => Err(PopVcfError::format(
                self.display_name(),
                self.record_num(),
                "header line found among variant records",
            )),
        }
    }

    fn parse_record(&self) -> Result<VariantRecord> {
        let file = self.reader.display_name();
        let record_num = self.reader.line_num();
        let line = &self.line_buf;

        let header = self.header.as_ref().ok_or_else(|| {
            PopVcfError::format(&file, record_num, "variant record before the #CHROM header")
        })?;

        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 8 {
            return Err(PopVcfError::parse(&file, record_num, line.as_str()));
        }

        let pos = match fields[1].parse::<u64>() {
            Ok(pos) if pos >= 1 => pos,
            _ => {
                return Err(PopVcfError::InvalidPosition {
                    file,
                    record: record_num,
                    token: fields[1].to_string(),
                })
            }
        };

        let samples: Vec<String> = fields
            .iter()
            .skip(N_FIXED_COLUMNS)
            .map(|s| s.to_string())
            .collect();
        if samples.len() != header.n_samples() {
            return Err(PopVcfError::SampleNumberMismatch {
                file,
                record: record_num,
                expected: header.n_samples(),
                found: samples.len(),
            });
        }

        Ok(VariantRecord {
            chrom: fields[0].to_string(),
            pos,
            id: fields[2].to_string(),
            ref_allele: fields[3].to_string(),
            alt: fields[4].to_string(),
            qual: fields[5].to_string(),
            filter: fields[6].to_string(),
            info: fields[7].to_string(),
            format: fields.get(8).copied().unwrap_or_default().to_string(),
            samples,
        })
    }
}

/// Streaming VCF writer
pub struct VcfWriter {
    writer: TextWriter,
}

impl VcfWriter {
    /// Create a plain or gzipped VCF
    pub fn create(path: &Path) -> Result<Self> {
        Ok(Self {
            writer: TextWriter::create(path)?,
        })
    }

    pub fn from_text(writer: TextWriter) -> Self {
        Self { writer }
    }

    pub fn write(&mut self, line: &VcfLine) -> Result<()> {
        match line {
            VcfLine::Meta(meta) => self.writer.write_line(meta),
            VcfLine::Header(header) => self.writer.write_line(&header.line),
            VcfLine::Record(record) => self.write_record(record),
        }
    }

    pub fn write_meta(&mut self, meta: &str) -> Result<()> {
        self.writer.write_line(meta)
    }

    pub fn write_header(&mut self, header: &VcfHeader) -> Result<()> {
        self.writer.write_line(&header.line)
    }

    pub fn write_record(&mut self, record: &VariantRecord) -> Result<()> {
        self.writer.write_line(&record.to_line())
    }

    /// Flush and close the underlying stream
    pub fn finish(self) -> Result<()> {
        self.writer.finish()
    }
}
