//! In-memory record sources
//!
//! [`CollectionRecordReader`] and [`CollectionSequenceRecordReader`] serve
//! records that are already materialized, issuing positional metadata handles
//! that can be replayed against the same reader.

use uuid::Uuid;

use crate::error::{Error, Result};
use crate::metadata::RecordMetadata;
use crate::record::{RawRecord, Record};
use crate::source::{RecordReader, SequenceRecordReader};

/// A record source backed by a vector of records
#[derive(Debug, Clone)]
pub struct CollectionRecordReader {
    /// Identity stamped on issued handles
    id: Uuid,

    /// The records to serve
    records: Vec<RawRecord>,

    /// Class names, if known
    labels: Option<Vec<String>>,

    /// The current record index
    current_index: usize,
}

impl CollectionRecordReader {
    /// Create a new reader over `records`
    pub fn new(records: Vec<RawRecord>) -> Self {
        Self {
            id: Uuid::new_v4(),
            records,
            labels: None,
            current_index: 0,
        }
    }

    /// Attach class names
    #[must_use]
    pub fn with_labels(mut self, labels: Vec<String>) -> Self {
        self.labels = Some(labels);
        self
    }

    /// Number of records served so far
    pub fn position(&self) -> usize {
        self.current_index
    }

    /// Total number of records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if the reader holds no records
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn take_next(&mut self) -> Result<(usize, RawRecord)> {
        let index = self.current_index;
        let record = self.records.get(index).ok_or(Error::SourceExhausted)?.clone();
        self.current_index += 1;
        Ok((index, record))
    }
}

impl RecordReader for CollectionRecordReader {
    fn has_next(&self) -> bool {
        self.current_index < self.records.len()
    }

    fn next_record(&mut self) -> Result<RawRecord> {
        self.take_next().map(|(_, record)| record)
    }

    fn next_with_metadata(&mut self) -> Result<Record> {
        let (index, record) = self.take_next()?;
        Ok(Record::new(record, RecordMetadata::new(self.id, index as u64)))
    }

    fn reset(&mut self) -> Result<()> {
        self.current_index = 0;
        Ok(())
    }

    fn labels(&self) -> Option<&[String]> {
        self.labels.as_deref()
    }

    fn source_id(&self) -> Uuid {
        self.id
    }

    fn load_from_metadata(&mut self, handles: &[RecordMetadata]) -> Result<Vec<Record>> {
        handles
            .iter()
            .map(|handle| {
                handle.ensure_source(self.id)?;
                let record = usize::try_from(handle.position())
                    .ok()
                    .and_then(|index| self.records.get(index))
                    .ok_or_else(|| {
                        Error::MetadataMismatch(format!("no record at position {}", handle.position()))
                    })?;
                Ok(Record::new(record.clone(), *handle))
            })
            .collect()
    }
}

/// A sequence source backed by a vector of sequences
#[derive(Debug, Clone)]
pub struct CollectionSequenceRecordReader {
    /// Identity stamped on issued handles
    id: Uuid,

    /// The sequences to serve
    sequences: Vec<Vec<RawRecord>>,

    /// Class names, if known
    labels: Option<Vec<String>>,

    /// The current sequence index
    current_index: usize,
}

impl CollectionSequenceRecordReader {
    /// Create a new reader over `sequences`
    pub fn new(sequences: Vec<Vec<RawRecord>>) -> Self {
        Self {
            id: Uuid::new_v4(),
            sequences,
            labels: None,
            current_index: 0,
        }
    }

    /// Attach class names
    #[must_use]
    pub fn with_labels(mut self, labels: Vec<String>) -> Self {
        self.labels = Some(labels);
        self
    }

    fn take_next(&mut self) -> Result<(usize, Vec<RawRecord>)> {
        let index = self.current_index;
        let sequence = self
            .sequences
            .get(index)
            .ok_or(Error::SourceExhausted)?
            .clone();
        self.current_index += 1;
        Ok((index, sequence))
    }

    fn step(&self, handle: &RecordMetadata) -> Option<&RawRecord> {
        let position = usize::try_from(handle.position()).ok()?;
        let step = usize::try_from(handle.step()?).ok()?;
        self.sequences.get(position)?.get(step)
    }
}

impl RecordReader for CollectionSequenceRecordReader {
    fn has_next(&self) -> bool {
        self.current_index < self.sequences.len()
    }

    /// Reads the first step of the next sequence; prefer
    /// [`SequenceRecordReader::next_sequence`].
    fn next_record(&mut self) -> Result<RawRecord> {
        let (_, sequence) = self.take_next()?;
        sequence
            .into_iter()
            .next()
            .ok_or_else(|| Error::RecordConversion("empty sequence".into()))
    }

    fn next_with_metadata(&mut self) -> Result<Record> {
        let (index, sequence) = self.take_next()?;
        let record = sequence
            .into_iter()
            .next()
            .ok_or_else(|| Error::RecordConversion("empty sequence".into()))?;
        Ok(Record::new(
            record,
            RecordMetadata::sequence_step(self.id, index as u64, 0),
        ))
    }

    fn reset(&mut self) -> Result<()> {
        self.current_index = 0;
        Ok(())
    }

    fn labels(&self) -> Option<&[String]> {
        self.labels.as_deref()
    }

    fn source_id(&self) -> Uuid {
        self.id
    }

    fn load_from_metadata(&mut self, handles: &[RecordMetadata]) -> Result<Vec<Record>> {
        handles
            .iter()
            .map(|handle| {
                handle.ensure_source(self.id)?;
                let record = self.step(handle).ok_or_else(|| {
                    Error::MetadataMismatch(format!("no sequence step for handle {handle}"))
                })?;
                Ok(Record::new(record.clone(), *handle))
            })
            .collect()
    }
}

impl SequenceRecordReader for CollectionSequenceRecordReader {
    fn next_sequence(&mut self) -> Result<Vec<RawRecord>> {
        self.take_next().map(|(_, sequence)| sequence)
    }

    fn next_sequence_with_metadata(&mut self) -> Result<Vec<Record>> {
        let (index, sequence) = self.take_next()?;
        Ok(sequence
            .into_iter()
            .enumerate()
            .map(|(step, record)| {
                Record::new(
                    record,
                    RecordMetadata::sequence_step(self.id, index as u64, step as u64),
                )
            })
            .collect())
    }
}
