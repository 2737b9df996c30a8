//! Workload variants, one per file.

pub mod memcopy;
