//! Iterator configuration and derived label layout

use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Configuration for turning records into batches
///
/// Fixed once the iterator is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IteratorConfig {
    /// Number of examples per batch
    pub batch_size: usize,

    /// Column of the label, or first label column for multi-output regression
    pub label_index_from: Option<usize>,

    /// Last label column, inclusive. Only read for regression.
    pub label_index_to: Option<usize>,

    /// Number of classes for classification; 0 when unknown
    pub num_possible_labels: usize,

    /// Regression targets instead of one-hot classes
    pub regression: bool,

    /// Attach per-example metadata handles to each batch
    pub collect_metadata: bool,

    /// Stop after this many batches
    pub max_num_batches: Option<usize>,
}

impl Default for IteratorConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            label_index_from: None,
            label_index_to: None,
            num_possible_labels: 0,
            regression: false,
            collect_metadata: false,
            max_num_batches: None,
        }
    }
}

impl IteratorConfig {
    /// Classification with the class index at `label_index`
    pub fn classification(batch_size: usize, label_index: usize, num_possible_labels: usize) -> Self {
        Self {
            batch_size,
            label_index_from: Some(label_index),
            label_index_to: Some(label_index),
            num_possible_labels,
            ..Self::default()
        }
    }

    /// Classification with the class index in the last column of each record
    pub fn classification_last_column(batch_size: usize, num_possible_labels: usize) -> Self {
        Self {
            batch_size,
            num_possible_labels,
            ..Self::default()
        }
    }

    /// Single-output regression with the target at `label_index`
    pub fn regression(batch_size: usize, label_index: usize) -> Self {
        Self::multi_regression(batch_size, label_index, label_index)
    }

    /// Multi-output regression over the inclusive column range `from..=to`
    pub fn multi_regression(batch_size: usize, from: usize, to: usize) -> Self {
        Self {
            batch_size,
            label_index_from: Some(from),
            label_index_to: Some(to),
            regression: true,
            ..Self::default()
        }
    }

    /// No labels; each example is its own target
    pub fn unsupervised(batch_size: usize) -> Self {
        Self {
            batch_size,
            ..Self::default()
        }
    }

    /// Limit the number of batches produced between resets
    #[must_use]
    pub fn with_max_batches(mut self, max_num_batches: usize) -> Self {
        self.max_num_batches = Some(max_num_batches);
        self
    }

    /// Enable or disable metadata collection
    #[must_use]
    pub fn with_metadata(mut self, collect_metadata: bool) -> Self {
        self.collect_metadata = collect_metadata;
        self
    }

    /// Check the configuration for contradictions
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(Error::InvalidConfiguration("batch size must be at least 1".into()));
        }

        if let (Some(from), Some(to)) = (self.label_index_from, self.label_index_to) {
            if from > to {
                return Err(Error::InvalidConfiguration(format!(
                    "label index range is empty: from {from} > to {to}"
                )));
            }
            if !self.regression && from != to {
                return Err(Error::InvalidConfiguration(format!(
                    "classification takes a single label column, got range {from}..={to}"
                )));
            }
        }

        if self.label_index_to.is_some() && self.label_index_from.is_none() {
            return Err(Error::InvalidConfiguration(
                "label_index_to is set without label_index_from".into(),
            ));
        }

        if !self.regression && self.label_index_from.is_some() && self.num_possible_labels < 1 {
            return Err(invalid_label_count());
        }

        Ok(())
    }

    /// Whether the label column must be inferred from the first record
    pub fn infers_label_index(&self) -> bool {
        self.num_possible_labels >= 1 && self.label_index_from.is_none()
    }

    /// Parse a configuration from JSON; missing keys take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize this configuration to JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

pub(crate) fn invalid_label_count() -> Error {
    Error::InvalidConfiguration("number of possible labels invalid, must be >= 1".into())
}

/// Label layout derived from the configuration
///
/// When the label column is inferred, this is resolved once from the first
/// record and reused for the lifetime of the iterator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelColumns {
    from: Option<usize>,
    to: Option<usize>,
    num_possible_labels: usize,
    regression: bool,
}

impl LabelColumns {
    /// Resolve the layout without looking at any record
    ///
    /// Returns `None` when the label column must be inferred from data.
    pub fn from_config(config: &IteratorConfig) -> Option<Self> {
        if config.infers_label_index() {
            None
        } else {
            Some(Self::build(config, config.label_index_from))
        }
    }

    /// Resolve the layout, inferring the label column from a record of
    /// `record_len` fields if none was configured.
    pub fn resolve(config: &IteratorConfig, record_len: usize) -> Self {
        let from = if config.infers_label_index() {
            record_len.checked_sub(1)
        } else {
            config.label_index_from
        };
        Self::build(config, from)
    }

    fn build(config: &IteratorConfig, from: Option<usize>) -> Self {
        let to = match (from, config.label_index_to) {
            (Some(_), Some(to)) if config.regression => Some(to),
            (Some(from), _) => Some(from),
            (None, _) => None,
        };
        Self {
            from,
            to,
            num_possible_labels: config.num_possible_labels,
            regression: config.regression,
        }
    }

    /// First label column
    pub fn from(&self) -> Option<usize> {
        self.from
    }

    /// Last label column, inclusive
    pub fn to(&self) -> Option<usize> {
        self.to
    }

    /// Number of classes
    pub fn num_possible_labels(&self) -> usize {
        self.num_possible_labels
    }

    /// Whether labels are regression targets
    pub fn is_regression(&self) -> bool {
        self.regression
    }

    /// Columns holding regression targets
    pub fn regression_range(&self) -> Option<RangeInclusive<usize>> {
        match (self.regression, self.from, self.to) {
            (true, Some(from), Some(to)) => Some(from..=to),
            _ => None,
        }
    }

    /// Whether column `j` is consumed as a label
    pub fn is_label_column(&self, j: usize) -> bool {
        match self.regression_range() {
            Some(range) => range.contains(&j),
            None => self.from == Some(j),
        }
    }

    /// Width of a multi-column regression label
    pub fn regression_width(&self) -> usize {
        self.regression_range().map_or(0, |range| range.end() - range.start() + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(IteratorConfig { batch_size: 0, ..IteratorConfig::default() } ; "zero batch size")]
    #[test_case(IteratorConfig::multi_regression(4, 3, 1) ; "reversed regression range")]
    #[test_case(IteratorConfig { label_index_to: Some(3), ..IteratorConfig::classification(4, 1, 2) } ; "classification range")]
    #[test_case(IteratorConfig::classification(4, 1, 0) ; "no classes")]
    #[test_case(IteratorConfig { label_index_to: Some(2), ..IteratorConfig::unsupervised(4) } ; "to without from")]
    fn test_invalid_configs(config: IteratorConfig) {
        assert!(matches!(config.validate(), Err(Error::InvalidConfiguration(_))));
    }

    #[test_case(IteratorConfig::classification(2, 2, 2))]
    #[test_case(IteratorConfig::regression(2, 0))]
    #[test_case(IteratorConfig::multi_regression(2, 1, 2))]
    #[test_case(IteratorConfig::unsupervised(8))]
    #[test_case(IteratorConfig::classification_last_column(8, 3))]
    fn test_valid_configs(config: IteratorConfig) {
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_inferred_label_column() {
        let config = IteratorConfig::classification_last_column(4, 3);
        assert!(LabelColumns::from_config(&config).is_none());

        let columns = LabelColumns::resolve(&config, 5);
        assert_eq!(columns.from(), Some(4));
        assert_eq!(columns.to(), Some(4));
        assert!(columns.is_label_column(4));
        assert!(!columns.is_label_column(3));
    }

    #[test]
    fn test_regression_columns() {
        let columns = LabelColumns::from_config(&IteratorConfig::multi_regression(4, 1, 2)).unwrap();
        assert_eq!(columns.regression_width(), 2);
        assert!(columns.is_label_column(1));
        assert!(columns.is_label_column(2));
        assert!(!columns.is_label_column(0));
    }

    #[test]
    fn test_json_defaults() {
        let config = IteratorConfig::from_json(
            r#"{ "batch_size": 32, "label_index_from": 4, "num_possible_labels": 3 }"#,
        )
        .unwrap();
        assert_eq!(config.batch_size, 32);
        assert_eq!(config.label_index_from, Some(4));
        assert!(!config.collect_metadata);

        let again = IteratorConfig::from_json(&config.to_json().unwrap()).unwrap();
        assert_eq!(again, config);
    }
}
