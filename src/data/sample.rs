//! # Sample Registry
//!
//! Loads the semicolon-separated sample file
//! (`sample_id;species_id;mother_id`) and classifies each sample into one of
//! the two parental species or the hybrid group.

use std::collections::HashMap;
use std::path::Path;

use tracing::debug;

use crate::error::{PopVcfError, Result};
use crate::io::text::TextReader;

/// Literal used in the sample file and on the command line for "no value"
pub const NONE: &str = "NONE";

/// Species group of a sample
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Species {
    Sp1,
    Sp2,
    Hybrid,
}

impl Species {
    /// Numeric code used by Structure files
    pub fn code(self) -> u8 {
        match self {
            Species::Sp1 => 1,
            Species::Sp2 => 2,
            Species::Hybrid => 3,
        }
    }
}

/// The three species identifiers given on the command line
#[derive(Clone, Debug)]
pub struct SpeciesIds {
    sp1: String,
    sp2: String,
    hybrid: Option<String>,
}

impl SpeciesIds {
    /// `hybrid` equal to `NONE` means hybrids are not expected
    pub fn new(sp1: &str, sp2: &str, hybrid: &str) -> Result<Self> {
        let hybrid = (hybrid != NONE).then(|| hybrid.to_string());
        if sp1 == sp2 || hybrid.as_deref() == Some(sp1) || hybrid.as_deref() == Some(sp2) {
            return Err(PopVcfError::config(format!(
                "species identifiers must be different: sp1={}, sp2={}, hybrid={}",
                sp1,
                sp2,
                hybrid.as_deref().unwrap_or(NONE)
            )));
        }
        Ok(Self {
            sp1: sp1.to_string(),
            sp2: sp2.to_string(),
            hybrid,
        })
    }

    pub fn classify(&self, species_id: &str) -> Option<Species> {
        if species_id == self.sp1 {
            Some(Species::Sp1)
        } else if species_id == self.sp2 {
            Some(Species::Sp2)
        } else if self.hybrid.as_deref() == Some(species_id) {
            Some(Species::Hybrid)
        } else {
            None
        }
    }
}

/// One row of the sample file
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sample {
    pub id: String,
    pub species: Species,
    pub mother: Option<String>,
}

impl Sample {
    /// Adults have no recorded mother
    pub fn is_adult(&self) -> bool {
        self.mother.is_none()
    }
}

/// Read-only map from sample id to its row
#[derive(Clone, Debug, Default)]
pub struct SampleRegistry {
    samples: HashMap<String, Sample>,
}

impl SampleRegistry {
    /// Load and validate a sample file
    pub fn load(path: &Path, species: &SpeciesIds) -> Result<Self> {
        let mut reader = TextReader::open(path)?;
        let file = reader.display_name();
        let mut samples = HashMap::new();
        let mut line = String::new();

        while reader.read_line(&mut line)? {
            let row = reader.line_num();
            let fields: Vec<&str> = line.split(';').collect();
            if fields.len() != 3 {
                return Err(PopVcfError::format(
                    &file,
                    row,
                    format!("expected sample_id;species_id;mother_id, found {:?}", line),
                ));
            }
            let (id, species_id, mother) = (fields[0], fields[1], fields[2]);
            let species_class = species.classify(species_id).ok_or_else(|| {
                PopVcfError::format(&file, row, format!("unknown species {:?}", species_id))
            })?;
            let sample = Sample {
                id: id.to_string(),
                species: species_class,
                mother: (mother != NONE).then(|| mother.to_string()),
            };
            if samples.insert(id.to_string(), sample).is_some() {
                return Err(PopVcfError::format(
                    &file,
                    row,
                    format!("duplicate sample {:?}", id),
                ));
            }
        }

        if samples.is_empty() {
            return Err(PopVcfError::EmptySampleList {
                path: path.to_path_buf(),
            });
        }
        debug!(n_samples = samples.len(), path = %file, "sample registry loaded");
        Ok(Self { samples })
    }

    /// Build a registry from rows already in memory
    pub fn from_samples(samples: impl IntoIterator<Item = Sample>) -> Self {
        Self {
            samples: samples.into_iter().map(|s| (s.id.clone(), s)).collect(),
        }
    }

    /// Look up a sample, failing with `L002` when it is not registered
    pub fn get(&self, id: &str) -> Result<&Sample> {
        self.samples
            .get(id)
            .ok_or_else(|| PopVcfError::unknown_sample(id))
    }

    /// Check that every sample named in a VCF header is registered
    pub fn check_samples<S: AsRef<str>>(&self, ids: &[S]) -> Result<()> {
        ids.iter().try_for_each(|id| self.get(id.as_ref()).map(|_| ()))
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}
