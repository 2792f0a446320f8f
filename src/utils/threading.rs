//! # Threading Configuration
//!
//! Build the rayon pool used by the parallel imputer. The pool is created
//! once per run and reused for every batch.

use crate::error::{PopVcfError, Result};

/// Effective worker count: `min(requested, cpus)`, `0` meaning all cpus
pub fn effective_threads(requested: usize) -> usize {
    let cpus = num_cpus::get().max(1);
    if requested == 0 {
        cpus
    } else {
        requested.min(cpus)
    }
}

/// Create a configured thread pool with `n_threads` named workers
pub fn build_thread_pool(n_threads: usize) -> Result<rayon::ThreadPool> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(n_threads.max(1))
        .thread_name(|i| format!("popvcf-worker-{}", i))
        .build()
        .map_err(|e| PopVcfError::config(format!("failed to create thread pool: {}", e)))
}
