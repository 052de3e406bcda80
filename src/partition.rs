//! Partitioning Engine
//!
//! Sorts a dataset so every partition (rows sharing the same key-column
//! values) becomes one contiguous block, ordered internally by the value
//! columns, then locates the block boundaries by comparing each sorted row
//! with its predecessor.
//!
//! Key columns dominate the ordering in declared order. Value columns break
//! ties, with the last listed value column the most significant of them.

use std::ops::Range;

use crate::error::{Error, ErrorCode, Result};
use crate::sort::{argsort, inverse_permutation, KeyInfo};
use crate::types::{Dataset, DatasetView, SortOrder};

// ============================================================================
// Partition Specification
// ============================================================================

/// `PARTITION BY` key columns plus the intra-partition ordering
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PartitionSpec {
    /// Columns defining partition membership
    pub key_columns: Vec<usize>,
    /// Columns ordering rows inside a partition
    pub value_columns: Vec<usize>,
    /// Direction of each value column
    pub value_orders: Vec<SortOrder>,
}

impl PartitionSpec {
    /// Create a spec; `value_columns` and `value_orders` must be parallel
    pub fn new(
        key_columns: Vec<usize>,
        value_columns: Vec<usize>,
        value_orders: Vec<SortOrder>,
    ) -> Result<Self> {
        if value_columns.len() != value_orders.len() {
            return Err(Error::with_message(
                ErrorCode::InvalidSpecification,
                format!(
                    "{} value columns but {} sort orders",
                    value_columns.len(),
                    value_orders.len()
                ),
            ));
        }
        Ok(Self {
            key_columns,
            value_columns,
            value_orders,
        })
    }

    /// Create a spec from `+1` (ascending) / `-1` (descending) signs
    pub fn with_signs(
        key_columns: Vec<usize>,
        value_columns: Vec<usize>,
        value_signs: &[i64],
    ) -> Result<Self> {
        let value_orders = value_signs
            .iter()
            .map(|&s| SortOrder::from_sign(s))
            .collect::<Result<Vec<_>>>()?;
        Self::new(key_columns, value_columns, value_orders)
    }

    /// Partition by key columns only, keeping original order inside groups
    pub fn by_keys(key_columns: Vec<usize>) -> Self {
        Self {
            key_columns,
            value_columns: Vec::new(),
            value_orders: Vec::new(),
        }
    }

    /// Check the spec against a dataset with `column_count` columns
    pub fn validate(&self, column_count: usize) -> Result<()> {
        if self.value_columns.len() != self.value_orders.len() {
            return Err(Error::with_message(
                ErrorCode::InvalidSpecification,
                format!(
                    "{} value columns but {} sort orders",
                    self.value_columns.len(),
                    self.value_orders.len()
                ),
            ));
        }
        self.sort_key().validate(column_count)
    }

    /// Composite sort key, most significant field first
    pub fn sort_key(&self) -> KeyInfo {
        let mut columns = self.key_columns.clone();
        let mut sort_orders = vec![SortOrder::Ascending; self.key_columns.len()];
        columns.extend(self.value_columns.iter().rev());
        sort_orders.extend(self.value_orders.iter().rev());
        KeyInfo {
            columns,
            sort_orders,
        }
    }
}

// ============================================================================
// Partitioning Result
// ============================================================================

/// Sorted dataset together with its partition layout
#[derive(Debug, Clone, PartialEq)]
pub struct Partitioning {
    /// Original row index of each sorted row
    pub ordering: Vec<usize>,
    /// Dataset rows in sorted order
    pub sorted: Dataset,
    /// True where a sorted row starts a new partition
    pub boundaries: Vec<bool>,
    /// Sorted-row indexes of the true boundaries (starts with 0 when non-empty)
    pub split_indexes: Vec<usize>,
}

impl Partitioning {
    /// Number of partitions
    pub fn partition_count(&self) -> usize {
        self.split_indexes.len()
    }

    /// Sorted-row range covered by each partition, in split order
    pub fn partition_ranges(&self) -> Vec<Range<usize>> {
        let total = self.sorted.row_count();
        self.split_indexes
            .iter()
            .enumerate()
            .map(|(i, &start)| {
                let end = self.split_indexes.get(i + 1).copied().unwrap_or(total);
                start..end
            })
            .collect()
    }

    /// Partition blocks as views into the sorted dataset, in split order
    pub fn partitions(&self) -> Vec<DatasetView<'_>> {
        self.partition_ranges()
            .into_iter()
            .map(|range| self.sorted.slice_rows(range))
            .collect()
    }

    /// Sorted position of each original row
    pub fn inverse_ordering(&self) -> Vec<usize> {
        inverse_permutation(&self.ordering)
    }

    /// 1-based partition label of every sorted row
    fn sorted_labels(&self) -> Vec<usize> {
        self.boundaries
            .iter()
            .scan(0usize, |count, &b| {
                if b {
                    *count += 1;
                }
                Some(*count)
            })
            .collect()
    }
}

// ============================================================================
// Operations
// ============================================================================

/// Sort `dataset` by `spec` and split it into partitions
pub fn partition(dataset: &Dataset, spec: &PartitionSpec) -> Result<Partitioning> {
    spec.validate(dataset.column_count())?;

    let ordering = argsort(dataset, &spec.sort_key());
    let sorted = dataset.take_rows(&ordering);
    let boundaries = find_boundaries(&sorted, &spec.key_columns);
    let split_indexes = boundaries
        .iter()
        .enumerate()
        .filter_map(|(i, &b)| b.then_some(i))
        .collect();

    Ok(Partitioning {
        ordering,
        sorted,
        boundaries,
        split_indexes,
    })
}

/// 1-based partition label of every row, in original row order
///
/// Labels count partitions in the order they first appear in the sorted
/// dataset.
pub fn partition_number(dataset: &Dataset, spec: &PartitionSpec) -> Result<Vec<usize>> {
    let partitioning = partition(dataset, spec)?;
    let labels = partitioning.sorted_labels();
    Ok(partitioning
        .inverse_ordering()
        .into_iter()
        .map(|pos| labels[pos])
        .collect())
}

/// Flag each sorted row whose key columns differ from the previous row
fn find_boundaries(sorted: &Dataset, key_columns: &[usize]) -> Vec<bool> {
    (0..sorted.row_count())
        .map(|i| {
            i == 0 || {
                let prev = sorted.row(i - 1);
                let row = sorted.row(i);
                key_columns.iter().any(|&c| row[c] != prev[c])
            }
        })
        .collect()
}
