//! Result rows.
//!
//! A [`ResultRow`] is one row of a statement's result, positionally aligned
//! with the column header the statement reported first.

use std::fmt;
use std::sync::Arc;

use super::error::{ClientError, ClientResult};
use crate::bee::{Blob, ColumnInfo, Value};

// ============================================================================
// ResultRow
// ============================================================================

/// One result row.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRow {
    /// Header shared by every row of the statement
    columns: Arc<[ColumnInfo]>,
    /// Values in header order
    values: Vec<Value>,
}

impl ResultRow {
    /// Create a row. `values` must be aligned with `columns`.
    pub fn new(columns: Arc<[ColumnInfo]>, values: Vec<Value>) -> Self {
        Self { columns, values }
    }

    /// Column header.
    pub fn columns(&self) -> &[ColumnInfo] {
        &self.columns
    }

    /// Values in column order.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Consume the row into its values.
    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    /// Number of values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if the row has no values.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Position of the first column called `name`.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Value at `index`.
    pub fn get_by_index(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Value of the first column called `name`.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.index_of(name).and_then(|i| self.values.get(i))
    }

    /// Value of column `name` converted to `T`.
    pub fn get_as<T>(&self, name: &str) -> ClientResult<T>
    where
        T: TryFrom<Value, Error = ClientError>,
    {
        self.get(name)
            .cloned()
            .ok_or_else(|| ClientError::ColumnNotFound(name.to_string()))
            .and_then(T::try_from)
    }

    /// Value at `index` converted to `T`.
    pub fn get_index_as<T>(&self, index: usize) -> ClientResult<T>
    where
        T: TryFrom<Value, Error = ClientError>,
    {
        self.get_by_index(index)
            .cloned()
            .ok_or_else(|| ClientError::ColumnNotFound(format!("#{}", index)))
            .and_then(T::try_from)
    }

    /// Integer column.
    pub fn get_int(&self, name: &str) -> ClientResult<i64> {
        self.get_as::<i64>(name)
    }

    /// Number column. Integers widen.
    pub fn get_number(&self, name: &str) -> ClientResult<f64> {
        self.get_as::<f64>(name)
    }

    /// Boolean column.
    pub fn get_bool(&self, name: &str) -> ClientResult<bool> {
        self.get_as::<bool>(name)
    }

    /// String column.
    pub fn get_string(&self, name: &str) -> ClientResult<String> {
        self.get_as::<String>(name)
    }

    /// Bytes column.
    pub fn get_blob(&self, name: &str) -> ClientResult<Blob> {
        self.get_as::<Blob>(name)
    }

    /// Column value, `None` for nil.
    pub fn get_optional<T>(&self, name: &str) -> ClientResult<Option<T>>
    where
        T: TryFrom<Value, Error = ClientError>,
    {
        match self.get(name) {
            None => Err(ClientError::ColumnNotFound(name.to_string())),
            Some(Value::Nil) => Ok(None),
            Some(v) => T::try_from(v.clone()).map(Some),
        }
    }
}

impl fmt::Display for ResultRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pairs: Vec<String> = self
            .columns
            .iter()
            .zip(self.values.iter())
            .map(|(c, v)| format!("{}: {}", c.name, v))
            .collect();
        write!(f, "{{{}}}", pairs.join(", "))
    }
}

impl<'a> IntoIterator for &'a ResultRow {
    type Item = (&'a ColumnInfo, &'a Value);
    type IntoIter = std::iter::Zip<std::slice::Iter<'a, ColumnInfo>, std::slice::Iter<'a, Value>>;

    fn into_iter(self) -> Self::IntoIter {
        self.columns.iter().zip(self.values.iter())
    }
}

// ============================================================================
// Value conversions
// ============================================================================

fn mismatch(expected: &str, value: &Value) -> ClientError {
    ClientError::type_conversion(format!("expected {}, got {}", expected, value.data_type()))
}

impl TryFrom<Value> for i64 {
    type Error = ClientError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        value.as_int().ok_or_else(|| mismatch("Integer", &value))
    }
}

impl TryFrom<Value> for f64 {
    type Error = ClientError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        value.as_number().ok_or_else(|| mismatch("Number", &value))
    }
}

impl TryFrom<Value> for bool {
    type Error = ClientError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        value.as_bool().ok_or_else(|| mismatch("Boolean", &value))
    }
}

impl TryFrom<Value> for String {
    type Error = ClientError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::String(s) => Ok(s),
            other => Err(mismatch("String", &other)),
        }
    }
}

impl TryFrom<Value> for Blob {
    type Error = ClientError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Bytes(b) => Ok(b),
            other => Err(mismatch("Bytes", &other)),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bee::DataType;

    fn row() -> ResultRow {
        let columns: Arc<[ColumnInfo]> = vec![
            ColumnInfo::new("a", DataType::Integer),
            ColumnInfo::new("b", DataType::String),
            ColumnInfo::new("a", DataType::Number),
            ColumnInfo::new("c", DataType::Nil),
        ]
        .into();
        ResultRow::new(
            columns,
            vec![Value::Integer(1), Value::from("x"), Value::Number(2.5), Value::Nil],
        )
    }

    #[test]
    fn test_lookup_by_index_and_name() {
        let row = row();
        assert_eq!(row.len(), 4);
        assert_eq!(row.get_by_index(1), Some(&Value::from("x")));
        assert_eq!(row.get("b"), Some(&Value::from("x")));
        assert_eq!(row.get("missing"), None);
    }

    #[test]
    fn test_first_matching_name_wins() {
        let row = row();
        assert_eq!(row.index_of("a"), Some(0));
        assert_eq!(row.get_int("a").unwrap(), 1);
        assert_eq!(row.get_index_as::<f64>(2).unwrap(), 2.5);
    }

    #[test]
    fn test_typed_getters() {
        let row = row();
        assert_eq!(row.get_string("b").unwrap(), "x");
        assert_eq!(row.get_number("a").unwrap(), 1.0);
        assert_eq!(row.get_optional::<i64>("c").unwrap(), None);
        assert!(matches!(row.get_bool("b"), Err(ClientError::TypeConversion(_))));
        assert!(matches!(row.get_int("zzz"), Err(ClientError::ColumnNotFound(_))));
        assert!(matches!(row.get_blob("a"), Err(ClientError::TypeConversion(_))));
    }

    #[test]
    fn test_display_and_iter() {
        let row = row();
        assert_eq!(row.to_string(), "{a: 1, b: \"x\", a: 2.5, c: null}");
        let names: Vec<&str> = (&row).into_iter().map(|(c, _)| c.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "a", "c"]);
    }
}
