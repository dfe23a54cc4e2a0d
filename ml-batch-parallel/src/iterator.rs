//! The batch iterator over a record source
//!
//! Each call to [`RecordReaderBatchIterator::next_batch`] runs two strictly
//! sequential phases: the fetcher pulls up to `count` records on the calling
//! thread, then the processor converts them on the worker pool. The merged
//! batch gets the source's label names and finally the pre-processor.
//!
//! Shape queries made before the first batch produce that batch early and
//! keep it; the next calls to `next_batch` hand it out without touching the
//! source, split into pieces of at most the requested size.

use std::mem;
use std::slice;

use tracing::debug;

use ml_batch_core::{
    convert, merge, Batch, BatchFinisher, BatchPreProcessor, ConvertedBatch, FieldConverter, IteratorConfig,
    LabelColumns, RecordMetadata, RecordReader, RecordSource, SequenceRecordReader,
};

use crate::error::{Error, Result};
use crate::fetcher::{BatchFetcher, FetchedRecords};
use crate::pool::{WorkerPool, WorkerPoolConfig};
use crate::processor::ParallelBatchProcessor;

/// Where the iterator is in its pass over the source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IteratorPhase {
    /// No batch produced since construction or the last reset
    Fresh,

    /// At least one batch produced
    Iterating,

    /// The source ran dry or the batch limit was reached
    Exhausted,
}

/// Feature and label widths of a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct BatchShape {
    inputs: usize,
    outcomes: usize,
}

impl BatchShape {
    fn of(batch: &Batch) -> Self {
        Self {
            inputs: batch.num_inputs(),
            outcomes: batch.num_outcomes(),
        }
    }
}

/// What the iterator holds on to between calls
#[derive(Debug, Default)]
enum Lookahead {
    #[default]
    Empty,

    /// Rows produced by a shape query, not yet handed out or pre-processed
    PendingReplay(Batch),

    /// Shape of the batch most recently handed out
    Last(BatchShape),
}

impl Lookahead {
    fn shape(&self) -> Option<BatchShape> {
        match self {
            Lookahead::Empty => None,
            Lookahead::PendingReplay(batch) => Some(BatchShape::of(batch)),
            Lookahead::Last(shape) => Some(*shape),
        }
    }
}

/// Turns records from a [`RecordSource`] into [`Batch`]es
///
/// Built with [`RecordReaderBatchIteratorBuilder`]. Also implements
/// [`Iterator`], yielding batches of the configured size.
pub struct RecordReaderBatchIterator {
    fetcher: BatchFetcher,
    config: IteratorConfig,
    columns: Option<LabelColumns>,
    converter: Option<Box<dyn FieldConverter>>,
    pre_processor: Option<Box<dyn BatchPreProcessor>>,
    pool: WorkerPool,
    batches_emitted: usize,
    lookahead: Lookahead,
    phase: IteratorPhase,
}

impl RecordReaderBatchIterator {
    /// Start building an iterator
    pub fn builder() -> RecordReaderBatchIteratorBuilder {
        RecordReaderBatchIteratorBuilder::new()
    }

    /// Produce the next batch of at most `count` examples
    ///
    /// Returns `Ok(None)` once no records remain or the batch limit is
    /// reached.
    pub fn next_batch(&mut self, count: usize) -> Result<Option<Batch>> {
        if self.pool.is_shutdown() {
            return Err(Error::PoolShutdown);
        }
        if count == 0 {
            return Err(ml_batch_core::Error::InvalidConfiguration("batch size must be at least 1".into()).into());
        }

        match mem::take(&mut self.lookahead) {
            Lookahead::PendingReplay(batch) => {
                let batch = self.take_pending(batch, count)?;
                return Ok(Some(self.hand_out(batch)));
            }
            other => self.lookahead = other,
        }

        match self.produce(count)? {
            Some(batch) => Ok(Some(self.hand_out(batch))),
            None => Ok(None),
        }
    }

    /// Feature width of the batches, producing the first batch if needed
    pub fn input_columns(&mut self) -> Result<usize> {
        Ok(self.peek()?.inputs)
    }

    /// Label width of the batches, producing the first batch if needed
    pub fn total_outcomes(&mut self) -> Result<usize> {
        Ok(self.peek()?.outcomes)
    }

    /// Whether another batch can be produced
    pub fn has_next(&self) -> bool {
        matches!(self.lookahead, Lookahead::PendingReplay(_)) || (self.fetcher.has_next() && !self.limit_reached())
    }

    /// Rewind to the start of the source
    ///
    /// The configuration and any inferred label column are kept.
    pub fn reset(&mut self) -> Result<()> {
        self.fetcher.reset()?;
        self.batches_emitted = 0;
        self.lookahead = Lookahead::Empty;
        self.phase = IteratorPhase::Fresh;
        debug!("iterator reset");
        Ok(())
    }

    /// Configured number of examples per batch
    pub fn batch_size(&self) -> usize {
        self.config.batch_size
    }

    /// The configuration the iterator was built with
    pub fn config(&self) -> &IteratorConfig {
        &self.config
    }

    /// Class names, if the source knows them
    pub fn labels(&self) -> Option<&[String]> {
        self.fetcher.labels()
    }

    /// Number of batches produced since construction or the last reset
    pub fn batches_emitted(&self) -> usize {
        self.batches_emitted
    }

    /// Current phase of the pass over the source
    pub fn phase(&self) -> IteratorPhase {
        self.phase
    }

    /// Replace the pre-processor applied to every batch handed out
    pub fn set_pre_processor<P: BatchPreProcessor + 'static>(&mut self, pre_processor: P) {
        self.pre_processor = Some(Box::new(pre_processor));
    }

    /// Rebuild a batch from metadata handles
    ///
    /// Records are re-read from the source and converted on the calling
    /// thread. Any failure aborts the call. The fetch cursor is untouched.
    pub fn load_from_metadata(&mut self, handles: &[RecordMetadata]) -> Result<Option<Batch>> {
        let records = self.fetcher.load_from_metadata(handles)?;
        let Some(first) = records.first() else {
            return Ok(None);
        };
        let columns = self.label_columns(first.record.len());

        let mut examples = Vec::with_capacity(records.len());
        let mut metadata = Vec::with_capacity(records.len());
        for record in &records {
            examples.push(Some(convert(&record.record, &columns, self.converter.as_deref())?));
            metadata.push(record.metadata);
        }

        let Some(batch) = merge(ConvertedBatch::new(examples, Some(metadata)))? else {
            return Ok(None);
        };
        let batch = BatchFinisher::new(self.fetcher.labels(), self.pre_processor.as_deref()).finish(batch);

        debug!(rows = batch.num_examples(), "rebuilt batch from metadata");
        self.remember_shape(&batch);
        Ok(Some(batch))
    }

    /// Rebuild a single-example batch from one handle
    pub fn load_one(&mut self, handle: &RecordMetadata) -> Result<Option<Batch>> {
        self.load_from_metadata(slice::from_ref(handle))
    }

    /// Release the worker pool; later calls to `next_batch` fail
    pub fn shutdown(&mut self) {
        self.pool.shutdown();
    }

    /// The shape held for shape queries, producing a batch if there is none
    fn peek(&mut self) -> Result<BatchShape> {
        if matches!(self.lookahead, Lookahead::Empty) {
            if self.pool.is_shutdown() {
                return Err(Error::PoolShutdown);
            }
            let batch = self
                .produce(self.config.batch_size)?
                .ok_or(Error::NoData("the source holds no records to infer batch shapes from"))?;
            self.lookahead = Lookahead::PendingReplay(batch);
        }
        self.lookahead
            .shape()
            .ok_or(Error::NoData("no batch available for shape queries"))
    }

    /// Fetch, convert and merge one batch without pre-processing it
    ///
    /// Batches whose records were all skipped are not returned; fetching
    /// continues until a batch has rows or the source runs dry.
    fn produce(&mut self, count: usize) -> Result<Option<Batch>> {
        loop {
            if !self.fetcher.has_next() || self.limit_reached() {
                self.phase = IteratorPhase::Exhausted;
                return Ok(None);
            }

            let fetched = self.fetcher.fetch(count)?;
            let Some(columns) = self.resolve_columns(&fetched) else {
                self.phase = IteratorPhase::Exhausted;
                return Ok(None);
            };

            let converted = ParallelBatchProcessor::process(
                &self.pool,
                fetched,
                &columns,
                self.converter.as_deref(),
                self.config.collect_metadata,
            )?;

            let Some(mut batch) = merge(converted)? else {
                debug!("every record of the batch was skipped");
                continue;
            };
            BatchFinisher::new(self.fetcher.labels(), None).attach_label_names(&mut batch);

            self.batches_emitted += 1;
            self.phase = IteratorPhase::Iterating;
            debug!(
                batch = self.batches_emitted,
                rows = batch.num_examples(),
                inputs = batch.num_inputs(),
                outcomes = batch.num_outcomes(),
                "produced batch"
            );
            return Ok(Some(batch));
        }
    }

    /// Split the first `count` rows off a pending batch, keeping the rest
    /// pending
    fn take_pending(&mut self, batch: Batch, count: usize) -> Result<Batch> {
        let rows = batch.num_examples();
        if rows <= count {
            return Ok(batch);
        }

        let head = batch.slice_rows(0..count)?;
        self.lookahead = Lookahead::PendingReplay(batch.slice_rows(count..rows)?);
        debug!(rows = count, remaining = rows - count, "split pending batch");
        Ok(head)
    }

    /// Pre-process a batch and remember its shape
    fn hand_out(&mut self, mut batch: Batch) -> Batch {
        BatchFinisher::new(None, self.pre_processor.as_deref()).pre_process(&mut batch);
        self.remember_shape(&batch);
        batch
    }

    /// Record the shape of a batch handed out, unless rows are still pending
    fn remember_shape(&mut self, batch: &Batch) {
        if !matches!(self.lookahead, Lookahead::PendingReplay(_)) {
            self.lookahead = Lookahead::Last(BatchShape::of(batch));
        }
    }

    /// Label layout for the fetched records, inferring it from the first
    /// record ever fetched when needed
    fn resolve_columns(&mut self, fetched: &FetchedRecords) -> Option<LabelColumns> {
        let first = fetched.records.first()?;
        Some(self.label_columns(first.len()))
    }

    fn label_columns(&mut self, record_len: usize) -> LabelColumns {
        *self
            .columns
            .get_or_insert_with(|| LabelColumns::resolve(&self.config, record_len))
    }

    fn limit_reached(&self) -> bool {
        self.config
            .max_num_batches
            .is_some_and(|max| self.batches_emitted >= max)
    }
}

impl Iterator for RecordReaderBatchIterator {
    type Item = Result<Batch>;

    fn next(&mut self) -> Option<Self::Item> {
        if !self.has_next() {
            return None;
        }
        self.next_batch(self.config.batch_size).transpose()
    }
}

/// Builder for [`RecordReaderBatchIterator`]
#[derive(Default)]
pub struct RecordReaderBatchIteratorBuilder {
    /// The source of records
    source: Option<RecordSource>,

    /// Batching configuration
    config: IteratorConfig,

    /// Converter for classification labels
    converter: Option<Box<dyn FieldConverter>>,

    /// Pre-processor applied to every batch
    pre_processor: Option<Box<dyn BatchPreProcessor>>,

    /// A pool built by the caller
    pool: Option<WorkerPool>,

    /// Settings for a pool built here
    pool_config: WorkerPoolConfig,
}

impl RecordReaderBatchIteratorBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the record source
    #[must_use]
    pub fn source(mut self, source: RecordSource) -> Self {
        self.source = Some(source);
        self
    }

    /// Read from a flat record reader
    #[must_use]
    pub fn records<R: RecordReader + 'static>(self, reader: R) -> Self {
        self.source(RecordSource::records(reader))
    }

    /// Read from a sequence reader, flattening sequences step by step
    #[must_use]
    pub fn sequences<R: SequenceRecordReader + 'static>(self, reader: R) -> Self {
        self.source(RecordSource::sequences(reader))
    }

    /// Set the batching configuration
    #[must_use]
    pub fn config(mut self, config: IteratorConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the converter applied to classification labels
    #[must_use]
    pub fn converter<C: FieldConverter + 'static>(mut self, converter: C) -> Self {
        self.converter = Some(Box::new(converter));
        self
    }

    /// Set the pre-processor applied to every batch
    #[must_use]
    pub fn pre_processor<P: BatchPreProcessor + 'static>(mut self, pre_processor: P) -> Self {
        self.pre_processor = Some(Box::new(pre_processor));
        self
    }

    /// Use a pool built by the caller
    #[must_use]
    pub fn pool(mut self, pool: WorkerPool) -> Self {
        self.pool = Some(pool);
        self
    }

    /// Settings for the pool built when none is given
    #[must_use]
    pub fn pool_config(mut self, pool_config: WorkerPoolConfig) -> Self {
        self.pool_config = pool_config;
        self
    }

    /// Build the iterator
    pub fn build(self) -> Result<RecordReaderBatchIterator> {
        let source = self.source.ok_or_else(|| {
            ml_batch_core::Error::InvalidConfiguration("a record source is required".into())
        })?;
        self.config.validate()?;

        let pool = match self.pool {
            Some(pool) if pool.is_shutdown() => return Err(Error::PoolShutdown),
            Some(pool) => pool,
            None => WorkerPool::new(&self.pool_config)?,
        };

        debug!(
            batch_size = self.config.batch_size,
            sequences = source.is_sequence(),
            workers = pool.num_threads(),
            "built record batch iterator"
        );

        Ok(RecordReaderBatchIterator {
            fetcher: BatchFetcher::new(source, self.config.collect_metadata),
            columns: LabelColumns::from_config(&self.config),
            config: self.config,
            converter: self.converter,
            pre_processor: self.pre_processor,
            pool,
            batches_emitted: 0,
            lookahead: Lookahead::Empty,
            phase: IteratorPhase::Fresh,
        })
    }
}
