//! Record metadata handles and their persistence
//!
//! A [`RecordMetadata`] handle names the origin of one record inside the
//! source that produced it. Handles collected while iterating can be written
//! out with [`encode_handles`] or [`write_handles_json`] and later handed back
//! to a source to rebuild exactly those examples.

use std::fmt;
use std::io::{Read, Write};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Opaque handle identifying a record's origin in its source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordMetadata {
    /// Identity of the source that issued this handle
    source: Uuid,

    /// Record index, or sequence index for sequence sources
    position: u64,

    /// Step within the sequence, for sequence sources
    step: Option<u64>,
}

impl RecordMetadata {
    /// Handle for the record at `position` of a flat source
    pub fn new(source: Uuid, position: u64) -> Self {
        Self {
            source,
            position,
            step: None,
        }
    }

    /// Handle for step `step` of the sequence at `position`
    pub fn sequence_step(source: Uuid, position: u64, step: u64) -> Self {
        Self {
            source,
            position,
            step: Some(step),
        }
    }

    /// Identity of the issuing source
    pub fn source(&self) -> Uuid {
        self.source
    }

    /// Record or sequence index
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Step within the sequence, if any
    pub fn step(&self) -> Option<u64> {
        self.step
    }

    /// Fail unless this handle was issued by `source`
    pub fn ensure_source(&self, source: Uuid) -> Result<()> {
        if self.source == source {
            Ok(())
        } else {
            Err(Error::MetadataMismatch(format!(
                "handle {self} was issued by source {}, not {source}",
                self.source
            )))
        }
    }
}

impl fmt::Display for RecordMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.step {
            Some(step) => write!(f, "{}#{}:{}", self.source, self.position, step),
            None => write!(f, "{}#{}", self.source, self.position),
        }
    }
}

/// Serialize handles to a compact binary form
pub fn encode_handles(handles: &[RecordMetadata]) -> Result<Vec<u8>> {
    Ok(bincode::serialize(handles)?)
}

/// Deserialize handles produced by [`encode_handles`]
pub fn decode_handles(bytes: &[u8]) -> Result<Vec<RecordMetadata>> {
    Ok(bincode::deserialize(bytes)?)
}

/// Write handles as a JSON array
pub fn write_handles_json<W: Write>(writer: W, handles: &[RecordMetadata]) -> Result<()> {
    serde_json::to_writer(writer, handles)?;
    Ok(())
}

/// Read a JSON array of handles
pub fn read_handles_json<R: Read>(reader: R) -> Result<Vec<RecordMetadata>> {
    Ok(serde_json::from_reader(reader)?)
}
