//! Execution configuration
//!
//! Controls how the orchestrator schedules partitions. Results never depend
//! on these settings, only throughput does.

use crate::error::{Error, ErrorCode, Result};

// ============================================================================
// Threading Mode
// ============================================================================

/// How partition blocks are scheduled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThreadingMode {
    /// Process partitions one after another on the calling thread
    #[default]
    SingleThread,
    /// Spread partitions across scoped worker threads
    MultiThread,
}

// ============================================================================
// Execution Configuration
// ============================================================================

/// Settings for `Applier`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecConfig {
    /// Scheduling mode
    pub threading_mode: ThreadingMode,
    /// Worker threads used in multi-thread mode
    pub worker_threads: usize,
}

impl Default for ExecConfig {
    fn default() -> Self {
        Self {
            threading_mode: ThreadingMode::SingleThread,
            worker_threads: default_worker_threads(),
        }
    }
}

impl ExecConfig {
    /// Single-threaded configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Multi-threaded configuration with `workers` threads
    pub fn multi_thread(workers: usize) -> Self {
        Self {
            threading_mode: ThreadingMode::MultiThread,
            worker_threads: workers,
        }
    }

    /// Set the threading mode
    pub fn with_threading_mode(mut self, mode: ThreadingMode) -> Self {
        self.threading_mode = mode;
        self
    }

    /// Set the worker thread count
    pub fn with_worker_threads(mut self, workers: usize) -> Self {
        self.worker_threads = workers;
        self
    }

    /// Reject unusable settings
    pub fn validate(&self) -> Result<()> {
        if self.threading_mode == ThreadingMode::MultiThread && self.worker_threads == 0 {
            return Err(Error::with_message(
                ErrorCode::Misuse,
                "multi-thread mode needs at least one worker thread",
            ));
        }
        Ok(())
    }

    /// Number of threads partitions are actually spread over
    pub fn effective_workers(&self, partitions: usize) -> usize {
        match self.threading_mode {
            ThreadingMode::SingleThread => 1,
            ThreadingMode::MultiThread => self.worker_threads.min(partitions).max(1),
        }
    }
}

fn default_worker_threads() -> usize {
    std::thread::available_parallelism().map_or(1, |n| n.get())
}
