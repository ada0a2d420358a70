//! VM configuration
//!
//! Runtime limits and host policy for one VM instance. Configuration only
//! states constraints; the machine and evaluator enforce them.

use crate::memory::DEFAULT_CAPACITY;

/// Default cap on nested blocks and calls
pub const DEFAULT_MAX_DEPTH: usize = 1024;

/// Default cap on recorded history events
pub const DEFAULT_HISTORY_LIMIT: usize = 1 << 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmConfig {
    /// Number of cells in the address space
    pub memory_size: usize,

    /// Maximum nesting of blocks and calls
    pub max_depth: usize,

    /// Skip unknown host call ids with a warning instead of failing
    pub lenient_host_calls: bool,

    /// Maximum number of timer firings after the entry function returns
    pub timer_budget: usize,

    /// Maximum number of mutation events kept by the history recorder
    pub history_limit: usize,

    /// Seed for the `random` capability; `None` seeds from entropy
    pub seed: Option<u64>,
}

impl Default for VmConfig {
    fn default() -> Self {
        VmConfig {
            memory_size: DEFAULT_CAPACITY,
            max_depth: DEFAULT_MAX_DEPTH,
            lenient_host_calls: false,
            timer_budget: 1000,
            history_limit: DEFAULT_HISTORY_LIMIT,
            seed: None,
        }
    }
}

impl VmConfig {
    pub fn new() -> Self {
        Self::default()
    }
}
