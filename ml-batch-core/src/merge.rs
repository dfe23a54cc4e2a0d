//! Stacking converted examples into a [`Batch`]

use crate::batch::Batch;
use crate::convert::Example;
use crate::error::{Error, Result};
use crate::metadata::RecordMetadata;
use crate::preprocess::BatchPreProcessor;
use crate::tensor::Matrix;

/// Per-record conversion results, in fetch order
///
/// An empty slot is a record that was skipped. When present, `metadata` holds
/// one handle per slot, including the empty ones.
#[derive(Debug, Clone, Default)]
pub struct ConvertedBatch {
    /// Converted examples; `None` for skipped records
    pub examples: Vec<Option<Example>>,

    /// Handles aligned with `examples`
    pub metadata: Option<Vec<RecordMetadata>>,
}

impl ConvertedBatch {
    /// Create a converted batch from slots and optional handles
    pub fn new(examples: Vec<Option<Example>>, metadata: Option<Vec<RecordMetadata>>) -> Self {
        Self { examples, metadata }
    }

    /// Number of slots, skipped ones included
    pub fn len(&self) -> usize {
        self.examples.len()
    }

    /// Check if there are no slots at all
    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }
}

impl From<Vec<Example>> for ConvertedBatch {
    fn from(examples: Vec<Example>) -> Self {
        Self::new(examples.into_iter().map(Some).collect(), None)
    }
}

/// Stack the surviving examples into a batch
///
/// Returns `None` when every slot is empty. Rows keep the order of their
/// slots and metadata stays aligned with the rows.
pub fn merge(converted: ConvertedBatch) -> Result<Option<Batch>> {
    let ConvertedBatch { examples, metadata } = converted;

    if let Some(handles) = &metadata {
        if handles.len() != examples.len() {
            return Err(Error::MetadataMismatch(format!(
                "{} handles for {} converted records",
                handles.len(),
                examples.len()
            )));
        }
    }

    let mut features = Vec::with_capacity(examples.len());
    let mut labels = Vec::with_capacity(examples.len());
    let mut kept = metadata.as_ref().map(|_| Vec::with_capacity(examples.len()));

    for (i, slot) in examples.into_iter().enumerate() {
        let Some(example) = slot else {
            continue;
        };
        if let (Some(kept), Some(handles)) = (kept.as_mut(), metadata.as_ref()) {
            kept.push(handles[i]);
        }
        features.push(example.features);
        labels.push(example.labels);
    }

    if features.is_empty() {
        return Ok(None);
    }

    let mut batch = Batch::new(
        Matrix::from_rows("features", &features)?,
        Matrix::from_rows("labels", &labels)?,
    );
    if let Some(kept) = kept {
        batch.set_metadata(kept);
    }

    Ok(Some(batch))
}

/// Final touches applied to every merged batch
///
/// Label names go on first so the pre-processor can see them.
#[derive(Clone, Copy, Default)]
pub struct BatchFinisher<'a> {
    label_names: Option<&'a [String]>,
    pre_processor: Option<&'a dyn BatchPreProcessor>,
}

impl<'a> BatchFinisher<'a> {
    /// Create a finisher from the source's label names and a pre-processor
    pub fn new(label_names: Option<&'a [String]>, pre_processor: Option<&'a dyn BatchPreProcessor>) -> Self {
        Self {
            label_names,
            pre_processor,
        }
    }

    /// Attach the label names, if any
    pub fn attach_label_names(&self, batch: &mut Batch) {
        if let Some(names) = self.label_names {
            batch.set_label_names(names.to_vec());
        }
    }

    /// Run the pre-processor, if any
    pub fn pre_process(&self, batch: &mut Batch) {
        if let Some(pre_processor) = self.pre_processor {
            pre_processor.pre_process(batch);
        }
    }

    /// Attach label names, then pre-process
    pub fn finish(&self, mut batch: Batch) -> Batch {
        self.attach_label_names(&mut batch);
        self.pre_process(&mut batch);
        batch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn example(features: &[f64], labels: &[f64]) -> Example {
        Example {
            features: features.to_vec(),
            labels: labels.to_vec(),
        }
    }

    #[test]
    fn test_merge_drops_empty_slots() {
        let source = Uuid::new_v4();
        let handles: Vec<_> = (0..3).map(|i| RecordMetadata::new(source, i)).collect();
        let converted = ConvertedBatch::new(
            vec![
                Some(example(&[1.0, 2.0], &[1.0, 0.0])),
                None,
                Some(example(&[3.0, 4.0], &[0.0, 1.0])),
            ],
            Some(handles.clone()),
        );

        let batch = merge(converted).unwrap().unwrap();
        assert_eq!(batch.features().as_slice(), &[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(batch.labels().as_slice(), &[1.0, 0.0, 0.0, 1.0]);
        assert_eq!(batch.metadata().unwrap(), &[handles[0], handles[2]]);
    }

    #[test]
    fn test_merge_all_empty() {
        assert!(merge(ConvertedBatch::new(vec![None, None], None)).unwrap().is_none());
        assert!(merge(ConvertedBatch::default()).unwrap().is_none());
    }

    #[test]
    fn test_merge_ragged_labels() {
        let converted = ConvertedBatch::from(vec![example(&[1.0], &[1.0, 0.0]), example(&[2.0], &[1.0])]);
        let err = merge(converted).unwrap_err();

        assert!(matches!(
            err,
            Error::ShapeMismatch { matrix: "labels", expected: 2, actual: 1, row: 1 }
        ));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_merge_misaligned_metadata() {
        let converted = ConvertedBatch::new(
            vec![Some(example(&[1.0], &[1.0]))],
            Some(vec![]),
        );
        assert!(matches!(merge(converted), Err(Error::MetadataMismatch(_))));
    }

    #[test]
    fn test_finisher_order() {
        let names = vec!["cat".to_string(), "dog".to_string()];
        let seen = std::sync::Mutex::new(None);
        let record_names = |batch: &mut Batch| {
            *seen.lock().unwrap() = batch.label_names().map(<[String]>::len);
        };

        let batch = merge(ConvertedBatch::from(vec![example(&[1.0], &[0.0, 1.0])]))
            .unwrap()
            .unwrap();
        let finished = BatchFinisher::new(Some(names.as_slice()), Some(&record_names as &dyn BatchPreProcessor))
            .finish(batch);

        assert_eq!(finished.label_names().unwrap(), names.as_slice());
        assert_eq!(*seen.lock().unwrap(), Some(2));
    }
}
