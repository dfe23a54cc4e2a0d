//! Record source traits consumed by the batching pipeline

use uuid::Uuid;

use crate::error::Result;
use crate::metadata::RecordMetadata;
use crate::record::{RawRecord, Record};

/// A source of raw records, read one at a time
pub trait RecordReader: Send {
    /// Whether another record (or sequence) can be read
    fn has_next(&self) -> bool;

    /// Read the next record
    fn next_record(&mut self) -> Result<RawRecord>;

    /// Read the next record together with its metadata handle
    fn next_with_metadata(&mut self) -> Result<Record>;

    /// Reset the source to start reading from the beginning
    fn reset(&mut self) -> Result<()>;

    /// Names of the classes, if the source knows them
    fn labels(&self) -> Option<&[String]> {
        None
    }

    /// Identity stamped on every handle this source issues
    fn source_id(&self) -> Uuid;

    /// Re-read the records named by `handles`, in the order given
    fn load_from_metadata(&mut self, handles: &[RecordMetadata]) -> Result<Vec<Record>>;
}

/// A source whose unit of reading is a whole sequence of records
pub trait SequenceRecordReader: RecordReader {
    /// Read the next sequence
    fn next_sequence(&mut self) -> Result<Vec<RawRecord>>;

    /// Read the next sequence, each step carrying its own handle
    fn next_sequence_with_metadata(&mut self) -> Result<Vec<Record>>;
}

/// The two source shapes the pipeline can pull from
///
/// The shape is fixed when the pipeline is built.
pub enum RecordSource {
    /// Flat record source
    Records(Box<dyn RecordReader>),

    /// Sequence source; sequences are flattened step by step
    Sequences(Box<dyn SequenceRecordReader>),
}

impl RecordSource {
    /// Wrap a flat record source
    pub fn records<R: RecordReader + 'static>(reader: R) -> Self {
        RecordSource::Records(Box::new(reader))
    }

    /// Wrap a sequence source
    pub fn sequences<R: SequenceRecordReader + 'static>(reader: R) -> Self {
        RecordSource::Sequences(Box::new(reader))
    }

    /// Access the source through the common record-reader interface
    pub fn reader(&self) -> &dyn RecordReader {
        match self {
            RecordSource::Records(reader) => reader.as_ref(),
            RecordSource::Sequences(reader) => reader.as_ref(),
        }
    }

    /// Mutable access through the common record-reader interface
    pub fn reader_mut(&mut self) -> &mut dyn RecordReader {
        match self {
            RecordSource::Records(reader) => reader.as_mut(),
            RecordSource::Sequences(reader) => reader.as_mut(),
        }
    }

    /// Whether this is a sequence source
    pub fn is_sequence(&self) -> bool {
        matches!(self, RecordSource::Sequences(_))
    }
}
