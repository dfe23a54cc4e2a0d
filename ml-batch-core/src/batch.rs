//! Batches of examples ready for a training loop

use std::ops::Range;

use crate::error::Result;
use crate::metadata::RecordMetadata;
use crate::tensor::Matrix;

/// A feature matrix and a label matrix with one row per example
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    features: Matrix,
    labels: Matrix,
    metadata: Option<Vec<RecordMetadata>>,
    label_names: Option<Vec<String>>,
}

impl Batch {
    /// Create a batch from its matrices
    pub fn new(features: Matrix, labels: Matrix) -> Self {
        Self {
            features,
            labels,
            metadata: None,
            label_names: None,
        }
    }

    /// Feature matrix, one row per example
    pub fn features(&self) -> &Matrix {
        &self.features
    }

    /// Mutable feature matrix
    pub fn features_mut(&mut self) -> &mut Matrix {
        &mut self.features
    }

    /// Label matrix, one row per example
    pub fn labels(&self) -> &Matrix {
        &self.labels
    }

    /// Mutable label matrix
    pub fn labels_mut(&mut self) -> &mut Matrix {
        &mut self.labels
    }

    /// Number of examples
    pub fn num_examples(&self) -> usize {
        self.features.rows()
    }

    /// Feature width
    pub fn num_inputs(&self) -> usize {
        self.features.cols()
    }

    /// Label width
    pub fn num_outcomes(&self) -> usize {
        self.labels.cols()
    }

    /// Per-example metadata handles, if collected
    pub fn metadata(&self) -> Option<&[RecordMetadata]> {
        self.metadata.as_deref()
    }

    /// Attach per-example metadata handles
    pub fn set_metadata(&mut self, metadata: Vec<RecordMetadata>) {
        self.metadata = Some(metadata);
    }

    /// Class names, if the source provided them
    pub fn label_names(&self) -> Option<&[String]> {
        self.label_names.as_deref()
    }

    /// Attach class names
    pub fn set_label_names(&mut self, names: Vec<String>) {
        self.label_names = Some(names);
    }

    /// Copy a contiguous range of examples, keeping metadata aligned
    pub fn slice_rows(&self, range: Range<usize>) -> Result<Self> {
        Ok(Self {
            features: self.features.slice_rows(range.clone())?,
            labels: self.labels.slice_rows(range.clone())?,
            metadata: self.metadata.as_ref().map(|meta| meta[range].to_vec()),
            label_names: self.label_names.clone(),
        })
    }

    /// Copy the given examples into a new batch, keeping metadata aligned
    pub fn select_rows(&self, indices: &[usize]) -> Result<Self> {
        Ok(Self {
            features: self.features.select_rows(indices)?,
            labels: self.labels.select_rows(indices)?,
            metadata: self
                .metadata
                .as_ref()
                .map(|meta| indices.iter().map(|&i| meta[i]).collect()),
            label_names: self.label_names.clone(),
        })
    }
}
