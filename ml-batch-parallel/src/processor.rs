//! Parallel conversion of fetched records
//!
//! Every record is converted on the worker pool and its result lands in the
//! slot matching its fetch index, so the batch keeps fetch order no matter
//! how the work is scheduled.
//!
//! Failed records are handled differently depending on whether metadata is
//! collected. Without metadata a failed record is logged and its slot left
//! empty. With metadata the first failure, by fetch index, aborts the batch.
//! Fatal errors such as an out-of-range class label abort in both cases.

use rayon::prelude::*;
use tracing::warn;

use ml_batch_core::{convert, ConvertedBatch, FieldConverter, LabelColumns};

use crate::error::Result;
use crate::fetcher::FetchedRecords;
use crate::pool::WorkerPool;

/// Converts fetched records into examples on a [`WorkerPool`]
#[derive(Debug, Clone, Copy, Default)]
pub struct ParallelBatchProcessor;

impl ParallelBatchProcessor {
    /// Convert `fetched` into slots aligned with the fetch order
    pub fn process(
        pool: &WorkerPool,
        fetched: FetchedRecords,
        columns: &LabelColumns,
        converter: Option<&dyn FieldConverter>,
        collect_metadata: bool,
    ) -> Result<ConvertedBatch> {
        let FetchedRecords { records, metadata } = fetched;

        let results = pool.install(|| {
            records
                .par_iter()
                .map(|record| convert(record, columns, converter))
                .collect::<Vec<_>>()
        })?;

        let mut examples = Vec::with_capacity(results.len());
        for (index, result) in results.into_iter().enumerate() {
            match result {
                Ok(example) => examples.push(Some(example)),
                Err(error) if collect_metadata || error.is_fatal() => return Err(error.into()),
                Err(error) => {
                    warn!(index, %error, "unable to convert record, skipping");
                    examples.push(None);
                }
            }
        }

        Ok(ConvertedBatch::new(examples, metadata))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use ml_batch_core::{Field, IteratorConfig, RawRecord, RecordMetadata};
    use uuid::Uuid;

    fn columns() -> LabelColumns {
        LabelColumns::from_config(&IteratorConfig::classification(4, 1, 2)).unwrap()
    }

    fn fetched(records: Vec<RawRecord>, with_metadata: bool) -> FetchedRecords {
        let source = Uuid::new_v4();
        let metadata = with_metadata.then(|| {
            (0..records.len() as u64)
                .map(|i| RecordMetadata::new(source, i))
                .collect()
        });
        FetchedRecords { records, metadata }
    }

    fn with_bad_record() -> Vec<RawRecord> {
        vec![
            RawRecord::from_scalars(&[1.0, 0.0]),
            // scalar features mixed with a pre-built vector
            vec![Field::Scalar(2.0), Field::CategoryCode(1), Field::vector(vec![1.0])].into(),
            RawRecord::from_scalars(&[3.0, 1.0]),
        ]
    }

    #[test]
    fn test_slots_follow_fetch_order() {
        let pool = WorkerPool::with_threads(4).unwrap();
        let records: Vec<_> = (0..64)
            .map(|i| RawRecord::from_scalars(&[f64::from(i), f64::from(i % 2)]))
            .collect();

        let converted =
            ParallelBatchProcessor::process(&pool, fetched(records, false), &columns(), None, false).unwrap();

        assert_eq!(converted.len(), 64);
        for (i, slot) in converted.examples.iter().enumerate() {
            assert_eq!(slot.as_ref().unwrap().features, vec![i as f64]);
        }
    }

    #[test]
    fn test_failed_record_skipped_without_metadata() {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
        let pool = WorkerPool::with_threads(2).unwrap();

        let converted =
            ParallelBatchProcessor::process(&pool, fetched(with_bad_record(), false), &columns(), None, false)
                .unwrap();

        assert!(converted.examples[0].is_some());
        assert!(converted.examples[1].is_none());
        assert!(converted.examples[2].is_some());
    }

    #[test]
    fn test_failed_record_aborts_with_metadata() {
        let pool = WorkerPool::with_threads(2).unwrap();
        let err = ParallelBatchProcessor::process(&pool, fetched(with_bad_record(), true), &columns(), None, true)
            .unwrap_err();

        assert!(matches!(err, Error::Core(ml_batch_core::Error::RecordConversion(_))));
    }

    #[test]
    fn test_invalid_label_always_propagates() {
        let pool = WorkerPool::with_threads(2).unwrap();
        let records = vec![
            RawRecord::from_scalars(&[1.0, 0.0]),
            RawRecord::from_scalars(&[2.0, 7.0]),
        ];

        let err = ParallelBatchProcessor::process(&pool, fetched(records, false), &columns(), None, false)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Core(ml_batch_core::Error::InvalidLabel { value: 7, column: 1, num_possible_labels: 2 })
        ));
    }

    #[test]
    fn test_lowest_failing_index_wins() {
        let pool = WorkerPool::with_threads(4).unwrap();
        let records = vec![
            RawRecord::from_scalars(&[1.0, 0.0]),
            RawRecord::from_scalars(&[2.0, 5.0]),
            RawRecord::from_scalars(&[3.0, 9.0]),
        ];

        let err = ParallelBatchProcessor::process(&pool, fetched(records, true), &columns(), None, true)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Core(ml_batch_core::Error::InvalidLabel { value: 5, .. })
        ));
    }

    #[test]
    fn test_shut_down_pool() {
        let mut pool = WorkerPool::with_threads(1).unwrap();
        pool.shutdown();

        let result = ParallelBatchProcessor::process(&pool, fetched(vec![], false), &columns(), None, false);
        assert!(matches!(result, Err(Error::PoolShutdown)));
    }
}
