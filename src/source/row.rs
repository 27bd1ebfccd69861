//! Result rows

use super::value::SqlValue;
use std::sync::Arc;

/// A single result row. Column lookup ignores ASCII case.
#[derive(Debug, Clone)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<SqlValue>,
}

impl Row {
    pub fn new(columns: Arc<[String]>, values: Vec<SqlValue>) -> Self {
        debug_assert_eq!(columns.len(), values.len());
        Self { columns, values }
    }

    /// Build a row from name/value pairs
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, SqlValue)>,
        S: Into<String>,
    {
        let (columns, values): (Vec<String>, Vec<SqlValue>) =
            pairs.into_iter().map(|(c, v)| (c.into(), v)).unzip();
        Self::new(columns.into(), values)
    }

    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(column))
            .map(|i| &self.values[i])
    }

    pub fn get_index(&self, index: usize) -> Option<&SqlValue> {
        self.values.get(index)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_insensitive_lookup() {
        let row = Row::from_pairs([
            ("OID", SqlValue::Integer(1)),
            ("name", SqlValue::Text("Ann".into())),
        ]);
        assert_eq!(row.get("oid"), Some(&SqlValue::Integer(1)));
        assert_eq!(row.get("NAME"), Some(&SqlValue::Text("Ann".into())));
        assert_eq!(row.get("AGE"), None);
        assert_eq!(row.get_index(1), row.get("name"));
        assert_eq!(row.len(), 2);
    }
}
