//! Row Ordering
//!
//! This module orders dataset rows under a multi-column key and provides
//! the permutation helpers needed to move between original and sorted
//! row order.
//!
//! Ordering is always stable: rows whose key fields compare equal keep
//! their original relative order. NaN compares equal to NaN and sorts
//! after every number regardless of direction.

use std::cmp::Ordering;

use crate::error::{Error, ErrorCode, Result};
use crate::types::{Dataset, SortOrder};

// ============================================================================
// Key Info
// ============================================================================

/// Describes the fields rows are compared on, most significant first
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct KeyInfo {
    /// Column index of each key field
    pub columns: Vec<usize>,
    /// Direction of each key field
    pub sort_orders: Vec<SortOrder>,
}

impl KeyInfo {
    /// All fields ascending
    pub fn new(columns: Vec<usize>) -> Self {
        let sort_orders = vec![SortOrder::Ascending; columns.len()];
        Self {
            columns,
            sort_orders,
        }
    }

    /// Fields with explicit directions; both lists must be parallel
    pub fn with_orders(columns: Vec<usize>, sort_orders: Vec<SortOrder>) -> Result<Self> {
        if columns.len() != sort_orders.len() {
            return Err(Error::with_message(
                ErrorCode::InvalidSpecification,
                format!(
                    "{} key columns but {} sort orders",
                    columns.len(),
                    sort_orders.len()
                ),
            ));
        }
        Ok(Self {
            columns,
            sort_orders,
        })
    }

    /// Check every key column exists in a dataset of `column_count` columns
    pub fn validate(&self, column_count: usize) -> Result<()> {
        match self.columns.iter().find(|&&c| c >= column_count) {
            Some(col) => Err(Error::with_message(
                ErrorCode::InvalidSpecification,
                format!(
                    "column index {} out of range for dataset with {} columns",
                    col, column_count
                ),
            )),
            None => Ok(()),
        }
    }
}

// ============================================================================
// Comparison
// ============================================================================

/// Compare two field values in the given direction
pub fn compare_values(a: f64, b: f64, order: SortOrder) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => {
            let cmp = a.partial_cmp(&b).unwrap_or(Ordering::Equal);
            if order.is_descending() {
                cmp.reverse()
            } else {
                cmp
            }
        }
    }
}

/// Compare two rows field by field under `key_info`
pub fn compare_rows(row_a: &[f64], row_b: &[f64], key_info: &KeyInfo) -> Ordering {
    for (&col, &order) in key_info.columns.iter().zip(&key_info.sort_orders) {
        let cmp = compare_values(row_a[col], row_b[col], order);
        if cmp != Ordering::Equal {
            return cmp;
        }
    }
    Ordering::Equal
}

// ============================================================================
// Permutations
// ============================================================================

/// Stable argsort of the dataset's rows
///
/// Returns the ordering permutation: indexing the dataset by the result
/// yields its rows in sorted order.
pub fn argsort(dataset: &Dataset, key_info: &KeyInfo) -> Vec<usize> {
    let mut ordering: Vec<usize> = (0..dataset.row_count()).collect();
    ordering.sort_by(|&a, &b| compare_rows(dataset.row(a), dataset.row(b), key_info));
    ordering
}

/// Inverse of a permutation: `inverse[perm[i]] == i`
pub fn inverse_permutation(perm: &[usize]) -> Vec<usize> {
    let mut inverse = vec![0; perm.len()];
    for (pos, &idx) in perm.iter().enumerate() {
        inverse[idx] = pos;
    }
    inverse
}

/// Whether `perm` is a bijection on `0..perm.len()`
pub fn is_permutation(perm: &[usize]) -> bool {
    let mut seen = vec![false; perm.len()];
    for &idx in perm {
        if idx >= perm.len() || seen[idx] {
            return false;
        }
        seen[idx] = true;
    }
    true
}

/// Move values from sorted order back to original row order
///
/// `sorted[i]` belongs to original row `ordering[i]`; the result holds that
/// value at position `ordering[i]`.
pub fn unsort<T: Clone>(sorted: &[T], ordering: &[usize]) -> Vec<T> {
    inverse_permutation(ordering)
        .into_iter()
        .map(|pos| sorted[pos].clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Dataset {
        Dataset::from_rows(&[[1.0, 1.0, 3.0], [2.0, 2.0, 3.0], [1.0, 1.0, 4.0]]).unwrap()
    }

    #[test]
    fn test_key_info_length_mismatch() {
        let err = KeyInfo::with_orders(vec![0, 1], vec![SortOrder::Ascending]).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidSpecification);
    }

    #[test]
    fn test_key_info_validate() {
        let key_info = KeyInfo::new(vec![0, 2]);
        assert!(key_info.validate(3).is_ok());
        let err = key_info.validate(2).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidSpecification);
    }

    #[test]
    fn test_compare_values_nan_last() {
        assert_eq!(
            compare_values(f64::NAN, 1.0, SortOrder::Ascending),
            Ordering::Greater
        );
        assert_eq!(
            compare_values(f64::NAN, 1.0, SortOrder::Descending),
            Ordering::Greater
        );
        assert_eq!(
            compare_values(f64::NAN, f64::NAN, SortOrder::Ascending),
            Ordering::Equal
        );
        assert_eq!(compare_values(-0.0, 0.0, SortOrder::Ascending), Ordering::Equal);
    }

    #[test]
    fn test_compare_rows_descending() {
        let key_info = KeyInfo::with_orders(vec![0, 1], vec![SortOrder::Ascending, SortOrder::Descending])
            .unwrap();
        assert_eq!(compare_rows(&[1.0, 5.0], &[1.0, 3.0], &key_info), Ordering::Less);
        assert_eq!(compare_rows(&[2.0, 5.0], &[1.0, 3.0], &key_info), Ordering::Greater);
        assert_eq!(compare_rows(&[1.0, 3.0], &[1.0, 3.0], &key_info), Ordering::Equal);
    }

    #[test]
    fn test_argsort() {
        let key_info = KeyInfo::with_orders(
            vec![0, 1, 2],
            vec![SortOrder::Ascending, SortOrder::Ascending, SortOrder::Descending],
        )
        .unwrap();
        assert_eq!(argsort(&sample(), &key_info), vec![2, 0, 1]);
    }

    #[test]
    fn test_argsort_is_stable() {
        let ds = Dataset::from_rows(&[[1.0, 9.0], [0.0, 8.0], [1.0, 7.0], [0.0, 6.0]]).unwrap();
        let key_info = KeyInfo::new(vec![0]);
        assert_eq!(argsort(&ds, &key_info), vec![1, 3, 0, 2]);
    }

    #[test]
    fn test_inverse_permutation() {
        let perm = vec![2, 0, 1];
        let inverse = inverse_permutation(&perm);
        assert_eq!(inverse, vec![1, 2, 0]);
        for (i, &p) in perm.iter().enumerate() {
            assert_eq!(inverse[p], i);
        }
    }

    #[test]
    fn test_is_permutation() {
        assert!(is_permutation(&[]));
        assert!(is_permutation(&[2, 0, 1]));
        assert!(!is_permutation(&[0, 0, 1]));
        assert!(!is_permutation(&[0, 3, 1]));
    }

    #[test]
    fn test_unsort() {
        // Sorted position 0 came from row 2, etc.
        let ordering = vec![2, 0, 1];
        let sorted = vec!["a", "b", "c"];
        assert_eq!(unsort(&sorted, &ordering), vec!["b", "c", "a"]);
    }
}
