//! partitionby - SQL PARTITION BY and window functions over in-memory tables
//!
//! Rows of a numeric `Dataset` are grouped by key columns, ordered within
//! each group, and fed one partition at a time to a `WindowFunction`. The
//! per-partition results come back aligned with the original row order.

pub mod error;
pub mod types;
pub mod sort;
pub mod partition;
pub mod window;
pub mod apply;
pub mod config;
pub mod trace;

// Re-export main public types
pub use error::{Error, ErrorCode, Result};
pub use types::{Dataset, DatasetView, SortOrder, Value};

// Re-export the operations
pub use apply::{apply_over_partition, Applier};
pub use config::{ExecConfig, ThreadingMode};
pub use partition::{partition, partition_number, PartitionSpec, Partitioning};
pub use trace::{TraceCallback, TraceEvent, TraceFlags, TraceInfo, Tracer};
pub use window::{Avg, RowNumber, Top, WindowFuncType, WindowFunction};
