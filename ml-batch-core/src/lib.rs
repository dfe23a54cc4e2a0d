//! Core types for turning records into training batches
//!
//! This crate holds everything that does not need a thread pool: typed fields
//! and records, the record source traits, metadata handles for replay, the
//! iterator configuration, the per-record conversion into feature and label
//! vectors, dense matrices, and the merging of converted records into a
//! [`Batch`]. The parallel iterator built on top of it lives in
//! `ml-batch-parallel`.

#![warn(missing_docs)]

pub mod batch;
pub mod collection;
pub mod config;
pub mod convert;
pub mod converter;
pub mod error;
pub mod field;
pub mod merge;
pub mod metadata;
pub mod preprocess;
pub mod record;
pub mod source;
pub mod tensor;

// Re-export key types for convenience
pub use batch::Batch;
pub use collection::{CollectionRecordReader, CollectionSequenceRecordReader};
pub use config::{IteratorConfig, LabelColumns};
pub use convert::{convert, one_hot, Example};
pub use converter::{FieldConverter, IdentityConverter, LabelCodeConverter};
pub use error::{Error, Result};
pub use field::Field;
pub use merge::{merge, BatchFinisher, ConvertedBatch};
pub use metadata::RecordMetadata;
pub use preprocess::{BatchPreProcessor, PreProcessorChain, RangeScaler};
pub use record::{RawRecord, Record};
pub use source::{RecordReader, RecordSource, SequenceRecordReader};
pub use tensor::Matrix;

static_assertions::assert_impl_all!(Batch: Send, Sync);
static_assertions::assert_impl_all!(RecordSource: Send);
static_assertions::assert_impl_all!(Error: Send, Sync);
static_assertions::assert_impl_all!(Field: Send, Sync);
