//! Raw records and records paired with their origin

use std::ops::Deref;

use crate::field::Field;
use crate::metadata::RecordMetadata;

/// An ordered sequence of fields describing one example before tensorization
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRecord {
    fields: Vec<Field>,
}

impl RawRecord {
    /// Create a record from its fields
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    /// Create a record of scalar fields
    pub fn from_scalars(values: &[f64]) -> Self {
        values.iter().copied().map(Field::Scalar).collect()
    }

    /// Get the fields of this record
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }
}

impl Deref for RawRecord {
    type Target = [Field];

    fn deref(&self) -> &Self::Target {
        &self.fields
    }
}

impl From<Vec<Field>> for RawRecord {
    fn from(fields: Vec<Field>) -> Self {
        Self::new(fields)
    }
}

impl FromIterator<Field> for RawRecord {
    fn from_iter<I: IntoIterator<Item = Field>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// A raw record together with the handle identifying where it came from
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// The record fields
    pub record: RawRecord,

    /// Origin of the record in its source
    pub metadata: RecordMetadata,
}

impl Record {
    /// Pair a record with its metadata
    pub fn new(record: RawRecord, metadata: RecordMetadata) -> Self {
        Self { record, metadata }
    }
}
