//! Typed field values held by raw records

use std::fmt;
use std::sync::Arc;

use crate::error::{Error, Result};

/// One typed value within a record
#[derive(Debug, Clone)]
pub enum Field {
    /// A single numeric value
    Scalar(f64),

    /// An integer category code, usually a class index
    CategoryCode(i64),

    /// A dense vector built ahead of time
    ///
    /// Two fields holding the same `Arc` are the same vector instance.
    PrebuiltVector(Arc<[f64]>),

    /// An empty value; never contributes a column
    Missing,
}

impl Field {
    /// Create a pre-built vector field from owned values
    pub fn vector(values: impl Into<Vec<f64>>) -> Self {
        Field::PrebuiltVector(Arc::from(values.into()))
    }

    /// Check whether this field is missing
    pub fn is_missing(&self) -> bool {
        matches!(self, Field::Missing)
    }

    /// Get the pre-built vector held by this field, if any
    pub fn as_vector(&self) -> Option<&Arc<[f64]>> {
        match self {
            Field::PrebuiltVector(values) => Some(values),
            _ => None,
        }
    }

    /// Read this field as a single `f64`
    #[allow(clippy::cast_precision_loss)]
    pub fn to_f64(&self) -> Result<f64> {
        match self {
            Field::Scalar(value) => Ok(*value),
            Field::CategoryCode(code) => Ok(*code as f64),
            Field::PrebuiltVector(_) | Field::Missing => Err(self.not_scalar()),
        }
    }

    /// Read this field as an integer, truncating scalars toward zero
    #[allow(clippy::cast_possible_truncation)]
    pub fn to_i64(&self) -> Result<i64> {
        match self {
            Field::CategoryCode(code) => Ok(*code),
            Field::Scalar(value) if value.is_finite() => Ok(value.trunc() as i64),
            Field::Scalar(value) => Err(Error::UnsupportedOperation(format!(
                "cannot read non-finite value {value} as an integer"
            ))),
            Field::PrebuiltVector(_) | Field::Missing => Err(self.not_scalar()),
        }
    }

    fn not_scalar(&self) -> Error {
        match self {
            Field::PrebuiltVector(values) => Error::UnsupportedOperation(format!(
                "cannot read a vector of length {} as a scalar",
                values.len()
            )),
            _ => Error::UnsupportedOperation("cannot read a missing field as a scalar".into()),
        }
    }
}

impl PartialEq for Field {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Field::Scalar(a), Field::Scalar(b)) => a.to_bits() == b.to_bits(),
            (Field::CategoryCode(a), Field::CategoryCode(b)) => a == b,
            (Field::PrebuiltVector(a), Field::PrebuiltVector(b)) => a[..] == b[..],
            (Field::Missing, Field::Missing) => true,
            _ => false,
        }
    }
}

impl From<f64> for Field {
    fn from(value: f64) -> Self {
        Field::Scalar(value)
    }
}

impl From<i64> for Field {
    fn from(code: i64) -> Self {
        Field::CategoryCode(code)
    }
}

impl From<Vec<f64>> for Field {
    fn from(values: Vec<f64>) -> Self {
        Field::vector(values)
    }
}

impl<T: Into<Field>> From<Option<T>> for Field {
    fn from(value: Option<T>) -> Self {
        value.map_or(Field::Missing, Into::into)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Scalar(value) => write!(f, "{value}"),
            Field::CategoryCode(code) => write!(f, "{code}"),
            Field::PrebuiltVector(values) => write!(f, "{values:?}"),
            Field::Missing => Ok(()),
        }
    }
}
