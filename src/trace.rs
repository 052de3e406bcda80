//! Execution Tracing
//!
//! Observes partitioned execution for debugging and profiling. Callers
//! register a callback with a mask of the events they care about; nothing
//! is formatted or timed unless a callback is installed.

use std::fmt;
use std::sync::Arc;

// ============================================================================
// Trace Flags
// ============================================================================

bitflags::bitflags! {
    /// Flags to control which events are traced
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TraceFlags: u32 {
        /// Dataset sorted and split into partitions
        const PARTITION = 0x01;
        /// Window function applied to one partition block
        const BLOCK = 0x02;
        /// Whole operation completed with timing
        const PROFILE = 0x04;
    }
}

impl Default for TraceFlags {
    fn default() -> Self {
        TraceFlags::empty()
    }
}

// ============================================================================
// Trace Event
// ============================================================================

/// Type of trace event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceEvent {
    Partition,
    Block,
    Profile,
}

impl TraceEvent {
    /// Get the flag corresponding to this event
    pub fn flag(&self) -> TraceFlags {
        match self {
            TraceEvent::Partition => TraceFlags::PARTITION,
            TraceEvent::Block => TraceFlags::BLOCK,
            TraceEvent::Profile => TraceFlags::PROFILE,
        }
    }
}

// ============================================================================
// Trace Info
// ============================================================================

/// Information passed to trace callbacks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceInfo {
    /// Type of event
    pub event: TraceEvent,
    /// Window function being applied
    pub function: String,
    /// Row count (dataset for Partition/Profile, block for Block)
    pub rows: usize,
    /// Partition count (Partition) or partition index (Block)
    pub partition: Option<usize>,
    /// Execution time in nanoseconds (Profile)
    pub elapsed_ns: Option<u64>,
}

impl TraceInfo {
    /// Create a PARTITION trace event
    pub fn partition(function: &str, rows: usize, partitions: usize) -> Self {
        Self {
            event: TraceEvent::Partition,
            function: function.to_string(),
            rows,
            partition: Some(partitions),
            elapsed_ns: None,
        }
    }

    /// Create a BLOCK trace event
    pub fn block(function: &str, index: usize, rows: usize) -> Self {
        Self {
            event: TraceEvent::Block,
            function: function.to_string(),
            rows,
            partition: Some(index),
            elapsed_ns: None,
        }
    }

    /// Create a PROFILE trace event
    pub fn profile(function: &str, rows: usize, elapsed_ns: u64) -> Self {
        Self {
            event: TraceEvent::Profile,
            function: function.to_string(),
            rows,
            partition: None,
            elapsed_ns: Some(elapsed_ns),
        }
    }
}

impl fmt::Display for TraceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.event {
            TraceEvent::Partition => write!(
                f,
                "PARTITION: {} rows into {} partitions for {}",
                self.rows,
                self.partition.unwrap_or(0),
                self.function
            ),
            TraceEvent::Block => write!(
                f,
                "BLOCK: {} partition {} ({} rows)",
                self.function,
                self.partition.unwrap_or(0),
                self.rows
            ),
            TraceEvent::Profile => write!(
                f,
                "PROFILE: {} over {} rows -- {} ns",
                self.function,
                self.rows,
                self.elapsed_ns.unwrap_or(0)
            ),
        }
    }
}

// ============================================================================
// Tracer
// ============================================================================

/// Callback function for trace events
pub type TraceCallback = Arc<dyn Fn(&TraceInfo) + Send + Sync>;

/// Callback plus the mask of events it receives
#[derive(Clone)]
pub struct Tracer {
    callback: Option<TraceCallback>,
    mask: TraceFlags,
}

impl Default for Tracer {
    fn default() -> Self {
        Self::new()
    }
}

impl Tracer {
    /// Create a new tracer with no callback
    pub fn new() -> Self {
        Self {
            callback: None,
            mask: TraceFlags::empty(),
        }
    }

    /// Create a tracer delivering `mask` events to `callback`
    pub fn with_callback(callback: TraceCallback, mask: TraceFlags) -> Self {
        Self {
            callback: Some(callback),
            mask,
        }
    }

    /// Set the trace callback and mask
    pub fn set(&mut self, callback: Option<TraceCallback>, mask: TraceFlags) {
        self.callback = callback;
        self.mask = mask;
    }

    /// Check if a particular event type should be traced
    pub fn should_trace(&self, event: TraceEvent) -> bool {
        self.callback.is_some() && self.mask.contains(event.flag())
    }

    /// Emit a trace event
    pub fn trace(&self, info: &TraceInfo) {
        if let Some(ref cb) = self.callback {
            if self.mask.contains(info.event.flag()) {
                cb(info);
            }
        }
    }

    /// Emit a PARTITION event
    pub fn trace_partition(&self, function: &str, rows: usize, partitions: usize) {
        if self.should_trace(TraceEvent::Partition) {
            self.trace(&TraceInfo::partition(function, rows, partitions));
        }
    }

    /// Emit a BLOCK event
    pub fn trace_block(&self, function: &str, index: usize, rows: usize) {
        if self.should_trace(TraceEvent::Block) {
            self.trace(&TraceInfo::block(function, index, rows));
        }
    }

    /// Emit a PROFILE event
    pub fn trace_profile(&self, function: &str, rows: usize, elapsed_ns: u64) {
        if self.should_trace(TraceEvent::Profile) {
            self.trace(&TraceInfo::profile(function, rows, elapsed_ns));
        }
    }
}

impl fmt::Debug for Tracer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tracer")
            .field("has_callback", &self.callback.is_some())
            .field("mask", &self.mask)
            .finish()
    }
}
