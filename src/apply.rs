//! Apply-Over-Partition
//!
//! Runs a window function over every partition block and scatters the
//! per-partition results back so `result[i]` belongs to original row `i`.
//!
//! Blocks are processed in split order, or spread across scoped worker
//! threads in multi-thread mode. Either way the results are stitched back
//! together in split order, so the output does not depend on scheduling.

use std::thread;
use std::time::Instant;

use crate::config::ExecConfig;
use crate::error::{Error, ErrorCode, Result};
use crate::partition::{partition, PartitionSpec};
use crate::sort::unsort;
use crate::trace::Tracer;
use crate::types::{Dataset, DatasetView, Value};
use crate::window::WindowFunction;

/// Apply `window_fn` to each partition of `dataset` on the calling thread
pub fn apply_over_partition<W: WindowFunction + ?Sized>(
    dataset: &Dataset,
    spec: &PartitionSpec,
    window_fn: &W,
) -> Result<Vec<Value>> {
    Applier::new().apply(dataset, spec, window_fn)
}

// ============================================================================
// Applier
// ============================================================================

/// Orchestrator carrying execution settings and a tracer
#[derive(Debug, Clone, Default)]
pub struct Applier {
    config: ExecConfig,
    tracer: Tracer,
}

impl Applier {
    /// Single-threaded applier without tracing
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the execution settings
    pub fn with_config(mut self, config: ExecConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the tracer
    pub fn with_tracer(mut self, tracer: Tracer) -> Self {
        self.tracer = tracer;
        self
    }

    /// Apply `window_fn` to each partition and realign to original row order
    ///
    /// Everything is validated before any partition is processed. Fails with
    /// `ShapeMismatch` if the function returns the wrong number of values
    /// for any block; when several blocks fail, the error of the first one in
    /// split order is returned.
    ///
    /// In multi-thread mode BLOCK trace events are emitted from the worker
    /// threads, so the callback may see them in any order. PARTITION and
    /// PROFILE events always come from the calling thread.
    pub fn apply<W: WindowFunction + ?Sized>(
        &self,
        dataset: &Dataset,
        spec: &PartitionSpec,
        window_fn: &W,
    ) -> Result<Vec<Value>> {
        let start = Instant::now();
        self.config.validate()?;
        spec.validate(dataset.column_count())?;
        window_fn.validate(dataset.column_count())?;

        let partitioning = partition(dataset, spec)?;
        let blocks = partitioning.partitions();
        self.tracer
            .trace_partition(window_fn.name(), dataset.row_count(), blocks.len());

        let workers = self.config.effective_workers(blocks.len());
        let per_block = if workers <= 1 {
            blocks
                .iter()
                .enumerate()
                .map(|(i, block)| run_block(window_fn, i, block, &self.tracer))
                .collect::<Result<Vec<_>>>()?
        } else {
            run_parallel(window_fn, &blocks, workers, &self.tracer)?
        };

        let sorted_results: Vec<Value> = per_block.into_iter().flatten().collect();
        let result = unsort(&sorted_results, &partitioning.ordering);

        self.tracer.trace_profile(
            window_fn.name(),
            dataset.row_count(),
            start.elapsed().as_nanos() as u64,
        );
        Ok(result)
    }
}

/// Apply to one block and enforce one output value per row
fn run_block<W: WindowFunction + ?Sized>(
    window_fn: &W,
    index: usize,
    block: &DatasetView<'_>,
    tracer: &Tracer,
) -> Result<Vec<Value>> {
    let out = window_fn.apply(block)?;
    if out.len() != block.row_count() {
        return Err(Error::with_message(
            ErrorCode::ShapeMismatch,
            format!(
                "{} returned {} values for partition {} with {} rows",
                window_fn.name(),
                out.len(),
                index,
                block.row_count()
            ),
        ));
    }
    tracer.trace_block(window_fn.name(), index, block.row_count());
    Ok(out)
}

/// Split blocks into contiguous runs, one per worker, and merge in order
fn run_parallel<W: WindowFunction + ?Sized>(
    window_fn: &W,
    blocks: &[DatasetView<'_>],
    workers: usize,
    tracer: &Tracer,
) -> Result<Vec<Vec<Value>>> {
    let chunk_size = blocks.len().div_ceil(workers);

    thread::scope(|scope| {
        let handles: Vec<_> = blocks
            .chunks(chunk_size)
            .enumerate()
            .map(|(c, chunk)| {
                let first = c * chunk_size;
                scope.spawn(move || {
                    chunk
                        .iter()
                        .enumerate()
                        .map(|(i, block)| run_block(window_fn, first + i, block, tracer))
                        .collect::<Result<Vec<_>>>()
                })
            })
            .collect();

        let mut results = Vec::with_capacity(blocks.len());
        for handle in handles {
            match handle.join() {
                Ok(chunk) => results.extend(chunk?),
                Err(panic) => std::panic::resume_unwind(panic),
            }
        }
        Ok(results)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::{TraceEvent, TraceFlags, TraceInfo};
    use crate::window::{Avg, RowNumber, Top};
    use std::sync::{Arc, Mutex};

    fn sample() -> Dataset {
        Dataset::from_rows(&[[1.0, 1.0, 3.0], [2.0, 2.0, 3.0], [1.0, 1.0, 4.0]]).unwrap()
    }

    fn sample_spec() -> PartitionSpec {
        PartitionSpec::with_signs(vec![0, 1], vec![2], &[-1]).unwrap()
    }

    fn reals(values: &[Value]) -> Vec<f64> {
        values.iter().map(|v| v.as_f64().unwrap()).collect()
    }

    /// Returns one value too many for every block
    struct Broken;

    impl WindowFunction for Broken {
        fn name(&self) -> &str {
            "broken"
        }

        fn apply(&self, block: &DatasetView<'_>) -> Result<Vec<Value>> {
            Ok(vec![Value::Integer(0); block.row_count() + 1])
        }
    }

    /// Fails on every block from `from` onwards, naming the block
    struct FailFrom {
        from: usize,
    }

    impl WindowFunction for FailFrom {
        fn name(&self) -> &str {
            "fail_from"
        }

        fn apply(&self, block: &DatasetView<'_>) -> Result<Vec<Value>> {
            // Key column 0 holds the block index.
            let index = block.get(0, 0) as usize;
            if index >= self.from {
                return Err(Error::with_message(
                    ErrorCode::InvalidSpecification,
                    format!("blk {}", index),
                ));
            }
            Ok(vec![Value::Integer(0); block.row_count()])
        }
    }

    #[test]
    fn test_apply_row_number() {
        let out = apply_over_partition(&sample(), &sample_spec(), &RowNumber).unwrap();
        assert_eq!(
            out,
            vec![Value::Integer(1), Value::Integer(0), Value::Integer(0)]
        );
    }

    #[test]
    fn test_apply_avg() {
        let out = apply_over_partition(&sample(), &sample_spec(), &Avg::top(2, 2)).unwrap();
        assert_eq!(reals(&out), vec![3.5, 3.0, 3.5]);

        let out = apply_over_partition(&sample(), &sample_spec(), &Avg::top(2, 1)).unwrap();
        assert_eq!(reals(&out), vec![4.0, 3.0, 4.0]);
    }

    #[test]
    fn test_apply_top() {
        let out = apply_over_partition(&sample(), &sample_spec(), &Top::new(1)).unwrap();
        assert_eq!(
            out,
            vec![Value::Boolean(false), Value::Boolean(true), Value::Boolean(true)]
        );
    }

    #[test]
    fn test_apply_empty_dataset() {
        let out = apply_over_partition(&Dataset::empty(3), &sample_spec(), &RowNumber).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_apply_single_row() {
        let ds = Dataset::from_rows(&[[4.0, 5.0, 6.0]]).unwrap();
        let out = apply_over_partition(&ds, &sample_spec(), &RowNumber).unwrap();
        assert_eq!(out, vec![Value::Integer(0)]);
    }

    #[test]
    fn test_shape_mismatch() {
        let err = apply_over_partition(&sample(), &sample_spec(), &Broken).unwrap_err();
        assert_eq!(err.code, ErrorCode::ShapeMismatch);

        let applier = Applier::new().with_config(ExecConfig::multi_thread(2));
        let err = applier.apply(&sample(), &sample_spec(), &Broken).unwrap_err();
        assert_eq!(err.code, ErrorCode::ShapeMismatch);
    }

    #[test]
    fn test_window_fn_validated_up_front() {
        let err = apply_over_partition(&sample(), &sample_spec(), &Avg::new(9)).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidSpecification);

        // Validation applies even when there is nothing to process.
        let err = apply_over_partition(&Dataset::empty(3), &sample_spec(), &Avg::new(9)).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidSpecification);
    }

    #[test]
    fn test_boxed_window_fn() {
        let f: Box<dyn WindowFunction> = Box::new(RowNumber);
        let out = apply_over_partition(&sample(), &sample_spec(), &f).unwrap();
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn test_multi_thread_matches_single_thread() {
        let rows: Vec<Vec<f64>> = (0..200)
            .map(|i| vec![(i % 7) as f64, ((i * 31) % 17) as f64])
            .collect();
        let ds = Dataset::from_rows(&rows).unwrap();
        let spec = PartitionSpec::with_signs(vec![0], vec![1], &[-1]).unwrap();

        let single = apply_over_partition(&ds, &spec, &RowNumber).unwrap();
        let applier = Applier::new().with_config(ExecConfig::multi_thread(3));
        let multi = applier.apply(&ds, &spec, &RowNumber).unwrap();
        assert_eq!(single, multi);
    }

    #[test]
    fn test_parallel_error_is_first_in_split_order() {
        let rows: Vec<[f64; 2]> = (0..10).flat_map(|k| [[k as f64, 0.0], [k as f64, 1.0]]).collect();
        let ds = Dataset::from_rows(&rows).unwrap();
        let spec = PartitionSpec::by_keys(vec![0]);
        let applier = Applier::new().with_config(ExecConfig::multi_thread(4));

        for _ in 0..20 {
            let err = applier.apply(&ds, &spec, &FailFrom { from: 5 }).unwrap_err();
            assert_eq!(err.message.as_deref(), Some("blk 5"));
        }

        let single = apply_over_partition(&ds, &spec, &FailFrom { from: 5 }).unwrap_err();
        assert_eq!(single.message.as_deref(), Some("blk 5"));
    }

    #[test]
    fn test_zero_workers_is_misuse() {
        let config = ExecConfig::multi_thread(0);
        let err = Applier::new()
            .with_config(config)
            .apply(&sample(), &sample_spec(), &RowNumber)
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Misuse);
    }

    #[test]
    fn test_tracing_events() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let events_clone = Arc::clone(&events);
        let tracer = Tracer::with_callback(
            Arc::new(move |info: &TraceInfo| events_clone.lock().unwrap().push(info.clone())),
            TraceFlags::all(),
        );

        Applier::new()
            .with_tracer(tracer)
            .apply(&sample(), &sample_spec(), &RowNumber)
            .unwrap();

        let captured = events.lock().unwrap();
        let kinds: Vec<TraceEvent> = captured.iter().map(|e| e.event).collect();
        assert_eq!(
            kinds,
            vec![
                TraceEvent::Partition,
                TraceEvent::Block,
                TraceEvent::Block,
                TraceEvent::Profile
            ]
        );
        assert_eq!(captured[0].partition, Some(2));
        assert_eq!(captured[1].rows, 2);
        assert_eq!(captured[2].rows, 1);
    }
}
