//! # Centralized Error Handling
//!
//! Unified error type for the entire crate using `thiserror`.
//!
//! Every variant carries a stable short code (`P001`, `F00x`, `L0xx`) that
//! prefixes its message. Argument errors exit with status 1, everything else
//! with status 3.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for popvcf operations
#[derive(Error, Debug)]
pub enum PopVcfError {
    /// Invalid command-line arguments or configuration values
    #[error("P001 argument error: {message}")]
    Config { message: String },

    /// An input file could not be opened
    #[error("{} cannot open {}: {source}", open_code(.gzipped), .path.display())]
    FileOpen {
        path: PathBuf,
        gzipped: bool,
        #[source]
        source: std::io::Error,
    },

    /// An output file could not be created
    #[error("{} cannot create {}: {source}", create_code(.gzipped), .path.display())]
    FileCreate {
        path: PathBuf,
        gzipped: bool,
        #[source]
        source: std::io::Error,
    },

    /// Read or write failure on an already opened stream
    #[error("F005 I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file structure is not what the reader expects
    #[error("F006 format error in {file} (record {record}): {message}")]
    Format {
        file: String,
        record: usize,
        message: String,
    },

    /// A per-sample column count differs from the header
    #[error("F006 wrong sample count in {file} (record {record}): expected {expected}, found {found}")]
    SampleNumberMismatch {
        file: String,
        record: usize,
        expected: usize,
        found: usize,
    },

    /// A record could not be split into its fields
    #[error("F009 record parse error in {file} (record {record}): {token:?}")]
    RecordParse {
        file: String,
        record: usize,
        token: String,
    },

    /// A sample is missing from the sample registry
    #[error("L002 sample {sample} is not in the sample file")]
    UnknownSample { sample: String },

    /// The sample file has no rows
    #[error("L003 the sample file {} is empty", .path.display())]
    EmptySampleList { path: PathBuf },

    /// POS is not a positive integer
    #[error("L005 position {token:?} is not a positive integer in {file} (record {record})")]
    InvalidPosition {
        file: String,
        record: usize,
        token: String,
    },

    /// FORMAT has no GT subfield
    #[error("L007 GT is absent from FORMAT in variant {variant_id}")]
    GtAbsent { variant_id: String },

    /// GT subfield has no allele separator
    #[error("L008 malformed GT {token:?} in variant {variant_id}")]
    MalformedGt { variant_id: String, token: String },

    /// The external tool result and the VCF do not hold the same samples
    #[error("L018 sample set mismatch: {message}")]
    SampleSetMismatch { message: String },

    /// More than two alleles where the tool requires biallelic variants
    #[error("L021 variant {variant_id} is multiallelic")]
    Multiallelic { variant_id: String },
}

fn open_code(gzipped: &bool) -> &'static str {
    if *gzipped {
        "F002"
    } else {
        "F001"
    }
}

fn create_code(gzipped: &bool) -> &'static str {
    if *gzipped {
        "F004"
    } else {
        "F003"
    }
}

/// Type alias for Results using PopVcfError
pub type Result<T> = std::result::Result<T, PopVcfError>;

impl PopVcfError {
    /// Create a configuration (argument) error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a format error located at a record of a file
    pub fn format(file: impl Into<String>, record: usize, message: impl Into<String>) -> Self {
        Self::Format {
            file: file.into(),
            record,
            message: message.into(),
        }
    }

    /// Create a record parse error
    pub fn parse(file: impl Into<String>, record: usize, token: impl Into<String>) -> Self {
        Self::RecordParse {
            file: file.into(),
            record,
            token: token.into(),
        }
    }

    /// Create an I/O error bound to a path
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create an unknown sample error
    pub fn unknown_sample(sample: impl Into<String>) -> Self {
        Self::UnknownSample {
            sample: sample.into(),
        }
    }

    /// Create a multiallelic error
    pub fn multiallelic(variant_id: impl Into<String>) -> Self {
        Self::Multiallelic {
            variant_id: variant_id.into(),
        }
    }

    /// Create a sample set mismatch error
    pub fn sample_set(message: impl Into<String>) -> Self {
        Self::SampleSetMismatch {
            message: message.into(),
        }
    }

    /// Short code shown in user-facing messages
    pub fn code(&self) -> &'static str {
        match self {
            Self::Config { .. } => "P001",
            Self::FileOpen { gzipped: false, .. } => "F001",
            Self::FileOpen { gzipped: true, .. } => "F002",
            Self::FileCreate { gzipped: false, .. } => "F003",
            Self::FileCreate { gzipped: true, .. } => "F004",
            Self::Io { .. } => "F005",
            Self::Format { .. } | Self::SampleNumberMismatch { .. } => "F006",
            Self::RecordParse { .. } => "F009",
            Self::UnknownSample { .. } => "L002",
            Self::EmptySampleList { .. } => "L003",
            Self::InvalidPosition { .. } => "L005",
            Self::GtAbsent { .. } => "L007",
            Self::MalformedGt { .. } => "L008",
            Self::SampleSetMismatch { .. } => "L018",
            Self::Multiallelic { .. } => "L021",
        }
    }

    /// Process exit status for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config { .. } => 1,
            _ => 3,
        }
    }
}
