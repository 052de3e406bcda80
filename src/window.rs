//! Window Functions
//!
//! A window function sees one partition block at a time, with rows already
//! in the partition's defined order, and returns exactly one value per row.

use crate::error::{Error, ErrorCode, Result};
use crate::types::{DatasetView, Value};

// ============================================================================
// Window Function Contract
// ============================================================================

/// A per-partition computation with a fixed parameter set
pub trait WindowFunction: Send + Sync {
    /// Function name for tracing and error messages
    fn name(&self) -> &str;

    /// Check parameters against the dataset's column count
    ///
    /// Called once before any partition is processed.
    fn validate(&self, _column_count: usize) -> Result<()> {
        Ok(())
    }

    /// Compute one value per row of `block`, in block order
    fn apply(&self, block: &DatasetView<'_>) -> Result<Vec<Value>>;
}

impl<W: WindowFunction + ?Sized> WindowFunction for Box<W> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn validate(&self, column_count: usize) -> Result<()> {
        (**self).validate(column_count)
    }

    fn apply(&self, block: &DatasetView<'_>) -> Result<Vec<Value>> {
        (**self).apply(block)
    }
}

// ============================================================================
// ROW_NUMBER
// ============================================================================

/// 0-based position of each row within its partition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RowNumber;

impl WindowFunction for RowNumber {
    fn name(&self) -> &str {
        "row_number"
    }

    fn apply(&self, block: &DatasetView<'_>) -> Result<Vec<Value>> {
        Ok((0..block.row_count() as i64).map(Value::Integer).collect())
    }
}

// ============================================================================
// TOP(n)
// ============================================================================

/// Filter that is true for the first `n` rows of each partition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Top {
    /// Number of leading rows to keep
    pub n: usize,
}

impl Top {
    /// Keep the first `n` rows of each partition
    pub fn new(n: usize) -> Self {
        Self { n }
    }
}

impl WindowFunction for Top {
    fn name(&self) -> &str {
        "top"
    }

    fn apply(&self, block: &DatasetView<'_>) -> Result<Vec<Value>> {
        Ok((0..block.row_count())
            .map(|i| Value::Boolean(i < self.n))
            .collect())
    }
}

// ============================================================================
// AVG(column, top_n)
// ============================================================================

/// Mean of a column over the leading rows, broadcast to every row
///
/// With `top_n` unset the mean covers the whole partition. Otherwise the
/// first `top_n` rows are summed and divided by `min(top_n, row_count)`,
/// so `top_n = 0` yields NaN.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Avg {
    /// Column to average
    pub column: usize,
    /// Number of leading rows to include
    pub top_n: Option<usize>,
}

impl Avg {
    /// Average over the whole partition
    pub fn new(column: usize) -> Self {
        Self { column, top_n: None }
    }

    /// Average over the first `top_n` rows
    pub fn top(column: usize, top_n: usize) -> Self {
        Self {
            column,
            top_n: Some(top_n),
        }
    }
}

impl WindowFunction for Avg {
    fn name(&self) -> &str {
        "avg"
    }

    fn validate(&self, column_count: usize) -> Result<()> {
        if self.column >= column_count {
            return Err(Error::with_message(
                ErrorCode::InvalidSpecification,
                format!(
                    "avg column {} out of range for dataset with {} columns",
                    self.column, column_count
                ),
            ));
        }
        Ok(())
    }

    fn apply(&self, block: &DatasetView<'_>) -> Result<Vec<Value>> {
        self.validate(block.column_count())?;

        let row_count = block.row_count();
        let take = self.top_n.map_or(row_count, |n| n.min(row_count));
        let sum: f64 = block.column(self.column).take(take).sum();
        let avg = sum / take as f64;

        Ok(vec![Value::Real(avg); row_count])
    }
}

// ============================================================================
// Lookup by Name
// ============================================================================

/// Built-in window functions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowFuncType {
    /// ROW_NUMBER() - position within partition
    RowNumber,
    /// TOP(n) - leading-row filter
    Top,
    /// AVG(column, top_n) - partition mean
    Avg,
}

impl WindowFuncType {
    /// Parse a function name (case-insensitive)
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "row_number" => Some(WindowFuncType::RowNumber),
            "top" => Some(WindowFuncType::Top),
            "avg" => Some(WindowFuncType::Avg),
            _ => None,
        }
    }

    /// Whether the function reads a value column
    pub fn needs_column(&self) -> bool {
        matches!(self, WindowFuncType::Avg)
    }

    /// Instantiate with the given arguments
    ///
    /// `Top` requires `n`; `Avg` requires `column` and treats `n` as `top_n`.
    pub fn create(&self, column: Option<usize>, n: Option<usize>) -> Result<Box<dyn WindowFunction>> {
        if self.needs_column() && column.is_none() {
            return Err(Error::with_message(
                ErrorCode::InvalidSpecification,
                format!("{:?} requires a column", self),
            ));
        }
        match self {
            WindowFuncType::RowNumber => Ok(Box::new(RowNumber)),
            WindowFuncType::Top => {
                let n = n.ok_or_else(|| {
                    Error::with_message(ErrorCode::InvalidSpecification, "top requires n")
                })?;
                Ok(Box::new(Top::new(n)))
            }
            WindowFuncType::Avg => Ok(Box::new(Avg {
                column: column.unwrap_or_default(),
                top_n: n,
            })),
        }
    }
}
