use std::borrow::Cow;
use std::fmt;

use serde::{Serialize, Serializer};

/// One loosely typed cell of an uploaded table.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl CellValue {
    /// Total text coercion used before classification and export.
    ///
    /// Empty cells become `""`, floats use the shortest round-trip form,
    /// booleans render as `True` / `False`.
    #[must_use]
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            Self::Empty => Cow::Borrowed(""),
            Self::Text(text) => Cow::Borrowed(text.as_str()),
            Self::Int(value) => Cow::Owned(value.to_string()),
            Self::Float(value) => Cow::Owned(value.to_string()),
            Self::Bool(true) => Cow::Borrowed("True"),
            Self::Bool(false) => Cow::Borrowed("False"),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(text) => text.trim().is_empty(),
            _ => false,
        }
    }

    /// Returns the same value converted to [`CellValue::Text`].
    #[must_use]
    pub fn into_text(self) -> Self {
        match self {
            Self::Text(_) => self,
            other => Self::Text(other.as_text().into_owned()),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_text())
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl Serialize for CellValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Empty => serializer.serialize_none(),
            Self::Text(text) => serializer.serialize_str(text),
            Self::Int(value) => serializer.serialize_i64(*value),
            Self::Float(value) if value.is_finite() => serializer.serialize_f64(*value),
            Self::Float(_) => serializer.serialize_none(),
            Self::Bool(value) => serializer.serialize_bool(*value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(CellValue::Empty, "")]
    #[case(CellValue::Text("bagus".into()), "bagus")]
    #[case(CellValue::Int(42), "42")]
    #[case(CellValue::Float(2.5), "2.5")]
    #[case(CellValue::Float(3.0), "3")]
    #[case(CellValue::Bool(true), "True")]
    #[case(CellValue::Bool(false), "False")]
    fn as_text_is_total(#[case] value: CellValue, #[case] expected: &str) {
        assert_eq!(value.as_text(), expected);
    }

    #[test]
    fn into_text_keeps_representation() {
        assert_eq!(CellValue::Int(7).into_text(), CellValue::Text("7".into()));
        assert_eq!(CellValue::Empty.into_text(), CellValue::Text(String::new()));
    }

    #[test]
    fn serializes_non_finite_float_as_null() {
        let json = serde_json::to_string(&vec![
            CellValue::Float(f64::NAN),
            CellValue::Int(1),
            CellValue::Empty,
        ])
        .expect("serialize");
        assert_eq!(json, "[null,1,null]");
    }
}
