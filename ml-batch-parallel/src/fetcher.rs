//! Sequential record fetching from a [`RecordSource`]
//!
//! Fetching is single-threaded so readers see their records requested in
//! order. Sequence sources are flattened step by step; a sequence that does
//! not fit in one fetch carries over to the next.

use std::collections::VecDeque;

use tracing::trace;
use uuid::Uuid;

use ml_batch_core::{RawRecord, Record, RecordMetadata, RecordSource};

use crate::error::Result;

/// Records pulled by one [`BatchFetcher::fetch`] call, in fetch order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchedRecords {
    /// The raw records
    pub records: Vec<RawRecord>,

    /// One handle per record, when metadata is collected
    pub metadata: Option<Vec<RecordMetadata>>,
}

impl FetchedRecords {
    /// Number of records fetched
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if nothing was fetched
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Pulls records from a source, one batch worth at a time
pub struct BatchFetcher {
    /// The source being read
    source: RecordSource,

    /// Steps of a partially drained sequence
    pending: VecDeque<(RawRecord, Option<RecordMetadata>)>,

    /// Whether handles are requested from the source
    collect_metadata: bool,
}

impl BatchFetcher {
    /// Create a fetcher over `source`
    pub fn new(source: RecordSource, collect_metadata: bool) -> Self {
        Self {
            source,
            pending: VecDeque::new(),
            collect_metadata,
        }
    }

    /// Pull up to `limit` records
    ///
    /// Stops early only when the source is exhausted.
    pub fn fetch(&mut self, limit: usize) -> Result<FetchedRecords> {
        let mut records = Vec::with_capacity(limit);
        let mut metadata = self.collect_metadata.then(|| Vec::with_capacity(limit));

        while records.len() < limit {
            let (record, handle) = match &mut self.source {
                RecordSource::Records(reader) => {
                    if !reader.has_next() {
                        break;
                    }
                    if self.collect_metadata {
                        let Record { record, metadata } = reader.next_with_metadata()?;
                        (record, Some(metadata))
                    } else {
                        (reader.next_record()?, None)
                    }
                }
                RecordSource::Sequences(reader) => match self.pending.pop_front() {
                    Some(step) => step,
                    None => {
                        if !reader.has_next() {
                            break;
                        }
                        if self.collect_metadata {
                            self.pending.extend(
                                reader
                                    .next_sequence_with_metadata()?
                                    .into_iter()
                                    .map(|Record { record, metadata }| (record, Some(metadata))),
                            );
                        } else {
                            self.pending
                                .extend(reader.next_sequence()?.into_iter().map(|record| (record, None)));
                        }
                        continue;
                    }
                },
            };

            records.push(record);
            if let (Some(metadata), Some(handle)) = (metadata.as_mut(), handle) {
                metadata.push(handle);
            }
        }

        trace!(
            requested = limit,
            fetched = records.len(),
            pending_steps = self.pending.len(),
            "fetched records"
        );
        Ok(FetchedRecords { records, metadata })
    }

    /// Whether another record can be fetched, counting pending sequence steps
    pub fn has_next(&self) -> bool {
        !self.pending.is_empty() || self.source.reader().has_next()
    }

    /// Drop pending sequence steps and rewind the source
    pub fn reset(&mut self) -> Result<()> {
        self.pending.clear();
        self.source.reader_mut().reset()?;
        Ok(())
    }

    /// Class names, if the source knows them
    pub fn labels(&self) -> Option<&[String]> {
        self.source.reader().labels()
    }

    /// Identity of the underlying source
    pub fn source_id(&self) -> Uuid {
        self.source.reader().source_id()
    }

    /// Re-read records by handle, bypassing the fetch cursor
    pub fn load_from_metadata(&mut self, handles: &[RecordMetadata]) -> Result<Vec<Record>> {
        Ok(self.source.reader_mut().load_from_metadata(handles)?)
    }
}
