//! Core data types for partitionby
//!
//! A `Dataset` is an immutable, rectangular, row-major matrix of `f64`.
//! Partition blocks are handed to window functions as borrowed
//! `DatasetView`s so splitting the sorted data never copies rows.

use std::ops::Range;

use crate::error::{Error, ErrorCode, Result};

// ============================================================================
// Sort Direction
// ============================================================================

/// Direction in which a value column is ordered inside a partition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Smallest value first
    #[default]
    Ascending,
    /// Largest value first
    Descending,
}

impl SortOrder {
    /// Convert the `+1` / `-1` sign convention into a direction
    pub fn from_sign(sign: i64) -> Result<Self> {
        match sign {
            1 => Ok(SortOrder::Ascending),
            -1 => Ok(SortOrder::Descending),
            _ => Err(Error::with_message(
                ErrorCode::InvalidSpecification,
                format!("sort sign must be 1 or -1, got {}", sign),
            )),
        }
    }

    /// Whether this is descending order
    pub fn is_descending(&self) -> bool {
        matches!(self, SortOrder::Descending)
    }
}

// ============================================================================
// Window Output Value
// ============================================================================

/// One window-function result for one row
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    /// Integer result (row numbers)
    Integer(i64),
    /// Floating-point result (averages)
    Real(f64),
    /// Boolean result (row filters)
    Boolean(bool),
}

impl Value {
    /// Integer payload, if this is an integer
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric payload as f64
    ///
    /// - Integer -> converted to float
    /// - Real -> value
    /// - Boolean -> None
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Real(f) => Some(*f),
            Value::Boolean(_) => None,
        }
    }

    /// Boolean payload, if this is a boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Real(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

// ============================================================================
// Dataset
// ============================================================================

/// Immutable rectangular numeric matrix stored row-major
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dataset {
    data: Vec<f64>,
    rows: usize,
    cols: usize,
}

impl Dataset {
    /// Build a dataset from a flat row-major buffer
    pub fn new(rows: usize, cols: usize, data: Vec<f64>) -> Result<Self> {
        let expected = rows.checked_mul(cols).ok_or_else(|| {
            Error::with_message(ErrorCode::InvalidSpecification, "dataset shape overflows")
        })?;
        if data.len() != expected {
            return Err(Error::with_message(
                ErrorCode::InvalidSpecification,
                format!(
                    "buffer of {} values does not fill a {}x{} dataset",
                    data.len(),
                    rows,
                    cols
                ),
            ));
        }
        Ok(Self { data, rows, cols })
    }

    /// Build a dataset from nested rows; every row must have the same width
    ///
    /// The width is taken from the first row, so an empty slice yields a
    /// 0-column dataset that rejects any column index. Use
    /// `from_rows_with_width` (or `Dataset::empty`) when the input may be
    /// empty.
    pub fn from_rows<R: AsRef<[f64]>>(rows: &[R]) -> Result<Self> {
        let cols = rows.first().map_or(0, |r| r.as_ref().len());
        Self::from_rows_with_width(cols, rows)
    }

    /// Build a dataset of `cols` columns from nested rows
    ///
    /// Every row must have exactly `cols` values; with no rows the result is
    /// an empty dataset that still has `cols` columns.
    pub fn from_rows_with_width<R: AsRef<[f64]>>(cols: usize, rows: &[R]) -> Result<Self> {
        let mut data = Vec::with_capacity(rows.len() * cols);
        for (i, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            if row.len() != cols {
                return Err(Error::with_message(
                    ErrorCode::InvalidSpecification,
                    format!(
                        "row {} has {} columns, expected {} (non-rectangular input)",
                        i,
                        row.len(),
                        cols
                    ),
                ));
            }
            data.extend_from_slice(row);
        }
        Ok(Self {
            data,
            rows: rows.len(),
            cols,
        })
    }

    /// A dataset with no rows and the given column count
    pub fn empty(cols: usize) -> Self {
        Self {
            data: Vec::new(),
            rows: 0,
            cols,
        }
    }

    /// Number of rows
    pub fn row_count(&self) -> usize {
        self.rows
    }

    /// Number of columns
    pub fn column_count(&self) -> usize {
        self.cols
    }

    /// Whether the dataset has no rows
    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// Row-major backing buffer
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Borrow a single row
    pub fn row(&self, idx: usize) -> &[f64] {
        let start = idx * self.cols;
        &self.data[start..start + self.cols]
    }

    /// Value at (row, column)
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.cols + col]
    }

    /// Iterate over rows in order
    pub fn rows(&self) -> impl Iterator<Item = &[f64]> + '_ {
        (0..self.rows).map(move |i| self.row(i))
    }

    /// Borrow the whole dataset as a view
    pub fn view(&self) -> DatasetView<'_> {
        self.slice_rows(0..self.rows)
    }

    /// Borrow a contiguous range of rows
    pub fn slice_rows(&self, range: Range<usize>) -> DatasetView<'_> {
        DatasetView {
            data: &self.data[range.start * self.cols..range.end * self.cols],
            rows: range.end - range.start,
            cols: self.cols,
        }
    }

    /// New dataset whose row `i` is row `indexes[i]` of this one
    pub fn take_rows(&self, indexes: &[usize]) -> Dataset {
        let mut data = Vec::with_capacity(indexes.len() * self.cols);
        for &idx in indexes {
            data.extend_from_slice(self.row(idx));
        }
        Dataset {
            data,
            rows: indexes.len(),
            cols: self.cols,
        }
    }
}

// ============================================================================
// Dataset View
// ============================================================================

/// Borrowed block of consecutive rows of a `Dataset`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DatasetView<'a> {
    data: &'a [f64],
    rows: usize,
    cols: usize,
}

impl<'a> DatasetView<'a> {
    /// Number of rows in the block
    pub fn row_count(&self) -> usize {
        self.rows
    }

    /// Number of columns (same layout as the parent dataset)
    pub fn column_count(&self) -> usize {
        self.cols
    }

    /// Whether the block has no rows
    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// Borrow a single row
    pub fn row(&self, idx: usize) -> &'a [f64] {
        let start = idx * self.cols;
        &self.data[start..start + self.cols]
    }

    /// Value at (row, column)
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.cols + col]
    }

    /// Iterate over rows in block order
    pub fn rows(&self) -> impl Iterator<Item = &'a [f64]> + 'a {
        let data = self.data;
        let cols = self.cols;
        (0..self.rows).map(move |i| &data[i * cols..(i + 1) * cols])
    }

    /// Iterate over one column top to bottom
    pub fn column(&self, col: usize) -> impl Iterator<Item = f64> + 'a {
        self.rows().map(move |row| row[col])
    }

    /// Copy the block into an owned dataset
    pub fn to_dataset(&self) -> Dataset {
        Dataset {
            data: self.data.to_vec(),
            rows: self.rows,
            cols: self.cols,
        }
    }
}
