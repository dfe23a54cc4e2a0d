//! Conversion of one raw record into a feature vector and a label vector
//!
//! [`convert`] is a pure function of the record, the resolved
//! [`LabelColumns`] and an optional [`FieldConverter`] for class labels. Two
//! shortcuts handle records made of pre-built vectors; everything else goes
//! through the column-by-column path:
//!
//! - `Missing` fields are skipped and never reserve a column.
//! - Regression label columns fill a label vector in arrival order, unless a
//!   single label column holds a pre-built vector, which is used as-is.
//! - The classification label column becomes a one-hot vector.
//! - Remaining scalars are features. A pre-built vector outside the shortcuts
//!   supplies the whole feature vector.
//!
//! A record without a label column is its own target.

use std::borrow::Cow;
use std::sync::Arc;

use tracing::warn;

use crate::config::{invalid_label_count, LabelColumns};
use crate::converter::FieldConverter;
use crate::error::{Error, Result};
use crate::field::Field;
use crate::record::RawRecord;

/// One converted record
#[derive(Debug, Clone, PartialEq)]
pub struct Example {
    /// Feature vector
    pub features: Vec<f64>,

    /// Label vector; equal to the features for unsupervised records
    pub labels: Vec<f64>,
}

impl Example {
    /// An example whose target is its own input
    pub fn self_target(values: &[f64]) -> Self {
        Self {
            features: values.to_vec(),
            labels: values.to_vec(),
        }
    }
}

/// Build a one-hot vector of `width` with a 1 at `index`
pub fn one_hot(index: usize, width: usize) -> Vec<f64> {
    let mut vector = vec![0.0; width];
    if let Some(slot) = vector.get_mut(index) {
        *slot = 1.0;
    }
    vector
}

/// Convert one record into an [`Example`]
pub fn convert(
    record: &RawRecord,
    columns: &LabelColumns,
    converter: Option<&dyn FieldConverter>,
) -> Result<Example> {
    if let Some(example) = convert_vector_pair(record, columns)? {
        return Ok(example);
    }

    // Exact feature width: non-missing fields outside the label columns.
    let width = record
        .iter()
        .enumerate()
        .filter(|(j, field)| !field.is_missing() && !columns.is_label_column(*j))
        .count();

    let regression_range = columns.regression_range();
    let mut features = FeatureVector::new(width);
    let mut label: Option<Vec<f64>> = None;
    let mut label_count = 0;

    for (j, field) in record.iter().enumerate() {
        if field.is_missing() {
            continue;
        }

        if let Some(range) = regression_range.as_ref().filter(|range| range.contains(&j)) {
            match field {
                Field::PrebuiltVector(values) if range.start() == range.end() => {
                    label = Some(values.to_vec());
                }
                _ => {
                    let target = label.get_or_insert_with(|| vec![0.0; columns.regression_width()]);
                    target[label_count] = field.to_f64()?;
                    label_count += 1;
                }
            }
        } else if !columns.is_regression() && columns.from() == Some(j) {
            let field = convert_label_field(field, converter);
            label = Some(class_label(&field, j, columns.num_possible_labels())?);
        } else {
            features.push(j, field)?;
        }
    }

    let features = features.finish()?;
    let labels = match columns.from() {
        Some(column) => label.ok_or_else(|| {
            Error::RecordConversion(format!("label column {column} is missing from the record"))
        })?,
        None => features.clone(),
    };

    Ok(Example { features, labels })
}

/// Records of exactly two fields whose first field is a pre-built vector
fn convert_vector_pair(record: &RawRecord, columns: &LabelColumns) -> Result<Option<Example>> {
    let [first, second] = record.fields() else {
        return Ok(None);
    };
    let Some(features) = first.as_vector() else {
        return Ok(None);
    };

    if let Some(target) = second.as_vector() {
        if Arc::ptr_eq(features, target) {
            return Ok(Some(Example::self_target(features)));
        }
    }

    let labels = if columns.is_regression() {
        match second {
            Field::PrebuiltVector(values) => values.to_vec(),
            other => vec![other.to_f64()?],
        }
    } else {
        class_label(second, 1, columns.num_possible_labels())?
    };

    Ok(Some(Example {
        features: features.to_vec(),
        labels,
    }))
}

/// Apply the label converter, falling back to the raw field when it fails
fn convert_label_field<'a>(field: &'a Field, converter: Option<&dyn FieldConverter>) -> Cow<'a, Field> {
    match converter.map(|converter| converter.convert(field)) {
        Some(Ok(converted)) => Cow::Owned(converted),
        Some(Err(error)) => {
            warn!(%error, field = %field, "label conversion failed, using the unconverted value");
            Cow::Borrowed(field)
        }
        None => Cow::Borrowed(field),
    }
}

/// One-hot class label for the value held in `field`
fn class_label(field: &Field, column: usize, num_possible_labels: usize) -> Result<Vec<f64>> {
    if num_possible_labels < 1 {
        return Err(invalid_label_count());
    }

    let value = field.to_i64()?;
    let index = usize::try_from(value)
        .ok()
        .filter(|&index| index < num_possible_labels)
        .ok_or(Error::InvalidLabel {
            value,
            column,
            num_possible_labels,
        })?;

    Ok(one_hot(index, num_possible_labels))
}

/// Feature values gathered column by column
struct FeatureVector {
    values: Vec<f64>,
    prebuilt: bool,
}

impl FeatureVector {
    fn new(width: usize) -> Self {
        Self {
            values: Vec::with_capacity(width),
            prebuilt: false,
        }
    }

    fn push(&mut self, column: usize, field: &Field) -> Result<()> {
        match field {
            Field::PrebuiltVector(vector) if self.values.is_empty() && !self.prebuilt => {
                self.values = vector.to_vec();
                self.prebuilt = true;
            }
            Field::Scalar(_) | Field::CategoryCode(_) if !self.prebuilt => {
                self.values.push(field.to_f64()?);
            }
            _ => {
                return Err(Error::RecordConversion(format!(
                    "column {column} cannot be combined with the feature values read so far; \
                     a pre-built vector must be the only feature field"
                )));
            }
        }
        Ok(())
    }

    fn finish(self) -> Result<Vec<f64>> {
        if self.values.is_empty() && !self.prebuilt {
            return Err(Error::RecordConversion("record has no feature values".into()));
        }
        Ok(self.values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IteratorConfig;
    use crate::converter::LabelCodeConverter;
    use proptest::prelude::*;

    fn columns(config: &IteratorConfig) -> LabelColumns {
        LabelColumns::from_config(config).unwrap()
    }

    fn scalars(values: &[f64]) -> RawRecord {
        RawRecord::from_scalars(values)
    }

    #[test]
    fn test_classification_one_hot() {
        let cols = columns(&IteratorConfig::classification(2, 2, 2));

        let first = convert(&scalars(&[1.0, 2.0, 0.0]), &cols, None).unwrap();
        let second = convert(&scalars(&[3.0, 4.0, 1.0]), &cols, None).unwrap();

        assert_eq!(first.features, vec![1.0, 2.0]);
        assert_eq!(first.labels, vec![1.0, 0.0]);
        assert_eq!(second.features, vec![3.0, 4.0]);
        assert_eq!(second.labels, vec![0.0, 1.0]);
    }

    #[test]
    fn test_label_out_of_range() {
        let cols = columns(&IteratorConfig::classification(2, 2, 2));
        let err = convert(&scalars(&[1.0, 2.0, 5.0]), &cols, None).unwrap_err();

        assert!(matches!(
            err,
            Error::InvalidLabel { value: 5, column: 2, num_possible_labels: 2 }
        ));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_negative_label() {
        let cols = columns(&IteratorConfig::classification(2, 0, 3));
        let record: RawRecord = vec![Field::CategoryCode(-1), Field::Scalar(1.0)].into();
        assert!(matches!(
            convert(&record, &cols, None),
            Err(Error::InvalidLabel { value: -1, .. })
        ));
    }

    #[test]
    fn test_multi_output_regression() {
        let cols = columns(&IteratorConfig::multi_regression(1, 1, 2));
        let example = convert(&scalars(&[1.0, 4.0, 5.0]), &cols, None).unwrap();

        assert_eq!(example.features, vec![1.0]);
        assert_eq!(example.labels, vec![4.0, 5.0]);
    }

    #[test]
    fn test_regression_vector_label() {
        let cols = columns(&IteratorConfig::regression(1, 1));
        let record: RawRecord = vec![Field::Scalar(1.0), Field::vector(vec![7.0, 8.0]), Field::Scalar(2.0)].into();
        let example = convert(&record, &cols, None).unwrap();

        assert_eq!(example.features, vec![1.0, 2.0]);
        assert_eq!(example.labels, vec![7.0, 8.0]);
    }

    #[test]
    fn test_missing_fields_are_skipped() {
        let cols = columns(&IteratorConfig::classification(1, 3, 2));
        let record: RawRecord = vec![
            Field::Scalar(1.0),
            Field::Missing,
            Field::Scalar(2.0),
            Field::CategoryCode(1),
        ]
        .into();
        let example = convert(&record, &cols, None).unwrap();

        assert_eq!(example.features, vec![1.0, 2.0]);
        assert_eq!(example.labels, vec![0.0, 1.0]);
    }

    #[test]
    fn test_unsupervised_is_own_target() {
        let cols = columns(&IteratorConfig::unsupervised(1));
        let example = convert(&scalars(&[0.5, 1.5]), &cols, None).unwrap();
        assert_eq!(example.labels, example.features);
    }

    #[test]
    fn test_shared_vector_pair() {
        let shared = Field::vector(vec![1.0, 2.0, 3.0]);
        let record: RawRecord = vec![shared.clone(), shared].into();
        let example = convert(&record, &columns(&IteratorConfig::unsupervised(1)), None).unwrap();

        assert_eq!(example, Example::self_target(&[1.0, 2.0, 3.0]));
    }

    #[test]
    fn test_vector_with_class_label() {
        let record: RawRecord = vec![Field::vector(vec![0.1, 0.2]), Field::Scalar(2.0)].into();
        let cols = columns(&IteratorConfig::classification(1, 1, 3));
        let example = convert(&record, &cols, None).unwrap();

        assert_eq!(example.features, vec![0.1, 0.2]);
        assert_eq!(example.labels, vec![0.0, 0.0, 1.0]);

        let too_big: RawRecord = vec![Field::vector(vec![0.1, 0.2]), Field::Scalar(3.0)].into();
        assert!(matches!(
            convert(&too_big, &cols, None),
            Err(Error::InvalidLabel { value: 3, .. })
        ));
    }

    #[test]
    fn test_vector_with_regression_target() {
        let cols = columns(&IteratorConfig::regression(1, 1));
        let scalar_target: RawRecord = vec![Field::vector(vec![0.1]), Field::Scalar(9.5)].into();
        let vector_target: RawRecord = vec![Field::vector(vec![0.1]), Field::vector(vec![1.0, 2.0])].into();

        assert_eq!(convert(&scalar_target, &cols, None).unwrap().labels, vec![9.5]);
        assert_eq!(convert(&vector_target, &cols, None).unwrap().labels, vec![1.0, 2.0]);
    }

    #[test]
    fn test_vector_features_in_general_path() {
        let cols = columns(&IteratorConfig::classification(1, 0, 2));
        let record: RawRecord = vec![Field::CategoryCode(1), Field::vector(vec![4.0, 5.0, 6.0])].into();
        let example = convert(&record, &cols, None).unwrap();

        assert_eq!(example.features, vec![4.0, 5.0, 6.0]);
        assert_eq!(example.labels, vec![0.0, 1.0]);
    }

    #[test]
    fn test_vector_mixed_with_scalars() {
        let cols = columns(&IteratorConfig::classification(1, 0, 2));
        let record: RawRecord = vec![Field::CategoryCode(1), Field::Scalar(1.0), Field::vector(vec![4.0])].into();
        let err = convert(&record, &cols, None).unwrap_err();

        assert!(matches!(err, Error::RecordConversion(_)));
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_missing_label_column() {
        let cols = columns(&IteratorConfig::classification(1, 2, 2));
        let record: RawRecord = vec![Field::Scalar(1.0), Field::Scalar(2.0), Field::Missing].into();
        assert!(matches!(convert(&record, &cols, None), Err(Error::RecordConversion(_))));
    }

    #[test]
    fn test_label_converter() {
        let cols = columns(&IteratorConfig::classification(1, 1, 2));
        let converter = LabelCodeConverter::new([10, 20]);
        let example = convert(&scalars(&[3.0, 20.0]), &cols, Some(&converter)).unwrap();
        assert_eq!(example.labels, vec![0.0, 1.0]);
    }

    #[test]
    fn test_failed_label_conversion_uses_raw_value() {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
        let cols = columns(&IteratorConfig::classification(1, 1, 2));
        let converter = LabelCodeConverter::new([10, 20]);
        // 1 is not a known code, so the raw value is used as the class index
        let example = convert(&scalars(&[3.0, 1.0]), &cols, Some(&converter)).unwrap();
        assert_eq!(example.labels, vec![0.0, 1.0]);
    }

    #[test]
    fn test_zero_classes_is_a_configuration_error() {
        let config = IteratorConfig {
            label_index_from: Some(1),
            label_index_to: Some(1),
            ..IteratorConfig::default()
        };
        let err = convert(&scalars(&[3.0, 1.0]), &columns(&config), None).unwrap_err();
        assert!(matches!(err, Error::InvalidConfiguration(_)));
    }

    #[test]
    fn test_inferred_label_column() {
        let config = IteratorConfig::classification_last_column(1, 3);
        let cols = LabelColumns::resolve(&config, 4);
        let example = convert(&scalars(&[1.0, 2.0, 3.0, 2.0]), &cols, None).unwrap();

        assert_eq!(example.features, vec![1.0, 2.0, 3.0]);
        assert_eq!(example.labels, vec![0.0, 0.0, 1.0]);
    }

    proptest! {
        #[test]
        fn prop_in_range_labels_are_one_hot(
            (num_labels, label) in (1usize..64).prop_flat_map(|n| (Just(n), 0..n)),
            features in prop::collection::vec(-1e6f64..1e6, 1..8),
        ) {
            let mut fields: Vec<Field> = features.iter().copied().map(Field::Scalar).collect();
            let label_index = fields.len();
            fields.push(Field::CategoryCode(label as i64));

            let cols = columns(&IteratorConfig::classification(1, label_index, num_labels));
            let example = convert(&fields.into(), &cols, None).unwrap();

            prop_assert_eq!(example.labels.len(), num_labels);
            prop_assert_eq!(example.labels.iter().filter(|&&v| v == 1.0).count(), 1);
            prop_assert_eq!(example.labels[label], 1.0);
            prop_assert_eq!(example.features, features);
        }

        #[test]
        fn prop_out_of_range_labels_fail(num_labels in 1usize..64, excess in 0i64..1000) {
            let label = num_labels as i64 + excess;
            let record: RawRecord = vec![Field::Scalar(0.0), Field::CategoryCode(label)].into();
            let cols = columns(&IteratorConfig::classification(1, 1, num_labels));

            let is_invalid_label = matches!(
                convert(&record, &cols, None),
                Err(Error::InvalidLabel { value, .. }) if value == label
            );
            prop_assert!(is_invalid_label);
        }
    }
}
