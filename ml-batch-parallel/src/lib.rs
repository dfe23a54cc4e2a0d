//! Parallel batch assembly over record sources
//!
//! Records are fetched sequentially, converted on a fixed-size worker pool,
//! and merged into batches in fetch order.
//!
//! ```no_run
//! use ml_batch_core::{CollectionRecordReader, IteratorConfig, RawRecord};
//! use ml_batch_parallel::RecordReaderBatchIterator;
//!
//! let records = vec![
//!     RawRecord::from_scalars(&[1.0, 2.0, 0.0]),
//!     RawRecord::from_scalars(&[3.0, 4.0, 1.0]),
//! ];
//! let mut iter = RecordReaderBatchIterator::builder()
//!     .records(CollectionRecordReader::new(records))
//!     .config(IteratorConfig::classification(2, 2, 2))
//!     .build()?;
//!
//! while let Some(batch) = iter.next_batch(2)? {
//!     assert!(batch.num_examples() <= 2);
//! }
//! # Ok::<(), ml_batch_parallel::Error>(())
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod fetcher;
pub mod iterator;
pub mod pool;
pub mod processor;

// Re-export key types for convenience
pub use error::{Error, Result};
pub use fetcher::{BatchFetcher, FetchedRecords};
pub use iterator::{IteratorPhase, RecordReaderBatchIterator, RecordReaderBatchIteratorBuilder};
pub use pool::{default_threads, WorkerPool, WorkerPoolConfig};
pub use processor::ParallelBatchProcessor;

static_assertions::assert_impl_all!(RecordReaderBatchIterator: Send);
static_assertions::assert_impl_all!(WorkerPool: Send, Sync);
static_assertions::assert_impl_all!(Error: Send, Sync);
