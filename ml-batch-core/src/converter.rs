//! Field converters applied to classification labels before indexing

use crate::error::{Error, Result};
use crate::field::Field;

/// Converts a single field into another field
pub trait FieldConverter: Send + Sync {
    /// Convert `field`; failures are reported as [`Error::FieldConversion`]
    fn convert(&self, field: &Field) -> Result<Field>;
}

impl<F> FieldConverter for F
where
    F: Fn(&Field) -> Result<Field> + Send + Sync,
{
    fn convert(&self, field: &Field) -> Result<Field> {
        self(field)
    }
}

/// Returns every field unchanged
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityConverter;

impl FieldConverter for IdentityConverter {
    fn convert(&self, field: &Field) -> Result<Field> {
        Ok(field.clone())
    }
}

/// Maps raw label codes onto contiguous class indices
///
/// Codes are looked up in the order given, so `LabelCodeConverter::new([10, 20, 30])`
/// turns code 20 into class 1.
#[derive(Debug, Clone, Default)]
pub struct LabelCodeConverter {
    codes: Vec<i64>,
}

impl LabelCodeConverter {
    /// Create a converter from the list of known codes
    pub fn new(codes: impl IntoIterator<Item = i64>) -> Self {
        Self {
            codes: codes.into_iter().collect(),
        }
    }
}

impl FieldConverter for LabelCodeConverter {
    #[allow(clippy::cast_possible_wrap)]
    fn convert(&self, field: &Field) -> Result<Field> {
        let code = field
            .to_i64()
            .map_err(|e| Error::FieldConversion(e.to_string()))?;
        self.codes
            .iter()
            .position(|&known| known == code)
            .map(|index| Field::CategoryCode(index as i64))
            .ok_or_else(|| Error::FieldConversion(format!("unknown label code {code}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_codes() {
        let converter = LabelCodeConverter::new([10, 20, 30]);
        assert_eq!(converter.convert(&Field::CategoryCode(20)).unwrap(), Field::CategoryCode(1));
        assert_eq!(converter.convert(&Field::Scalar(30.0)).unwrap(), Field::CategoryCode(2));
        assert!(matches!(
            converter.convert(&Field::CategoryCode(40)),
            Err(Error::FieldConversion(_))
        ));
    }

    #[test]
    fn test_closure_converter() {
        let shift = |field: &Field| -> Result<Field> { Ok(Field::CategoryCode(field.to_i64()? - 1)) };
        assert_eq!(shift.convert(&Field::Scalar(3.0)).unwrap(), Field::CategoryCode(2));
        assert_eq!(IdentityConverter.convert(&Field::Missing).unwrap(), Field::Missing);
    }
}
