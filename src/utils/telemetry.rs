//! # Run Telemetry
//!
//! Progress counters and record tracing shared by every tool.
//!
//! - `verbose` shows running counters on stderr, rewritten in place.
//! - `trace` dumps per-record details through `tracing::trace!`, but only
//!   for records on the watchlist (sequence ids or `chrom-pos` variant ids).
//!
//! Counters are atomics so worker threads can bump them without locking.

use std::collections::HashSet;
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;

use crate::data::record::VariantRecord;
use crate::data::sample::NONE;

/// How often (in records read) the verbose line is refreshed
const REPORT_EVERY: u64 = 1000;

/// Ids whose records are traced
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Watchlist {
    /// No restriction
    #[default]
    All,
    /// Sequence ids (VCF column 0)
    Sequences(HashSet<String>),
    /// `chrom-pos` variant ids
    Variants(HashSet<String>),
}

impl Watchlist {
    /// Build from the `--tsi` / `--tvi` values (`NONE` or a comma list)
    pub fn from_args(sequences: Option<&str>, variants: Option<&str>) -> Self {
        if let Some(set) = variants.and_then(parse_id_list) {
            return Watchlist::Variants(set);
        }
        if let Some(set) = sequences.and_then(parse_id_list) {
            return Watchlist::Sequences(set);
        }
        Watchlist::All
    }

    pub fn matches(&self, chrom: &str, variant_id: impl FnOnce() -> String) -> bool {
        match self {
            Watchlist::All => true,
            Watchlist::Sequences(ids) => ids.contains(chrom),
            Watchlist::Variants(ids) => ids.contains(&variant_id()),
        }
    }
}

fn parse_id_list(value: &str) -> Option<HashSet<String>> {
    if value == NONE || value.is_empty() {
        return None;
    }
    Some(
        value
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
    )
}

/// Running counters for one tool invocation
pub struct Progress {
    label: &'static str,
    read: AtomicU64,
    written: AtomicU64,
    changed: AtomicU64,
    enabled: AtomicBool,
    start: Instant,
}

impl Progress {
    pub fn new(label: &'static str, enabled: bool) -> Self {
        Self {
            label,
            read: AtomicU64::new(0),
            written: AtomicU64::new(0),
            changed: AtomicU64::new(0),
            enabled: AtomicBool::new(enabled),
            start: Instant::now(),
        }
    }

    #[inline]
    pub fn record_read(&self) {
        let n = self.read.fetch_add(1, Ordering::Relaxed) + 1;
        if n % REPORT_EVERY == 0 {
            self.report();
        }
    }

    #[inline]
    pub fn record_written(&self) {
        self.written.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_changed(&self) {
        self.changed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn read(&self) -> u64 {
        self.read.load(Ordering::Relaxed)
    }

    pub fn written(&self) -> u64 {
        self.written.load(Ordering::Relaxed)
    }

    pub fn changed(&self) -> u64 {
        self.changed.load(Ordering::Relaxed)
    }

    fn line(&self) -> String {
        format!(
            "{}: {} records read, {} written, {} changed",
            self.label,
            self.read(),
            self.written(),
            self.changed()
        )
    }

    fn report(&self) {
        if self.enabled.load(Ordering::Relaxed) {
            let mut stderr = io::stderr().lock();
            let _ = write!(stderr, "\r{}", self.line());
            let _ = stderr.flush();
        }
    }

    /// Print the final counters and end the in-place line
    pub fn finish(&self) {
        if self.enabled.swap(false, Ordering::Relaxed) {
            let mut stderr = io::stderr().lock();
            let _ = writeln!(
                stderr,
                "\r{} ({:.2}s)",
                self.line(),
                self.start.elapsed().as_secs_f64()
            );
        }
        tracing::info!(
            tool = self.label,
            read = self.read(),
            written = self.written(),
            changed = self.changed(),
            "done"
        );
    }
}

/// Verbose/trace switches and the watchlist, built once at startup
#[derive(Clone, Debug, Default)]
pub struct RunContext {
    pub verbose: bool,
    pub trace: bool,
    pub watchlist: Watchlist,
}

impl RunContext {
    pub fn new(verbose: bool, trace: bool, watchlist: Watchlist) -> Self {
        Self {
            verbose,
            trace,
            watchlist,
        }
    }

    /// Silent context (no counters, no tracing)
    pub fn quiet() -> Self {
        Self::default()
    }

    /// Counters for one tool run, printed only in verbose mode
    pub fn progress(&self, label: &'static str) -> Progress {
        Progress::new(label, self.verbose)
    }

    /// Whether a record should produce trace output
    pub fn traces(&self, record: &VariantRecord) -> bool {
        self.trace && self.watchlist.matches(&record.chrom, || record.variant_id())
    }

    /// Whether a sequence should produce trace output
    pub fn traces_sequence(&self, seq_id: &str) -> bool {
        self.trace
            && match &self.watchlist {
                Watchlist::Variants(ids) => ids
                    .iter()
                    .any(|v| v.rsplit_once('-').map(|(c, _)| c == seq_id).unwrap_or(false)),
                other => other.matches(seq_id, String::new),
            }
    }

    /// Dump a record when it is on the watchlist
    pub fn trace_record(&self, stage: &str, record: &VariantRecord) {
        if self.traces(record) {
            tracing::trace!(stage, variant = %record.variant_id(), line = %record.to_line());
        }
    }
}
