use std::fmt;

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Row – one line of the source resource
// ---------------------------------------------------------------------------

/// A single row: ordered string fields.
pub type Row = Vec<String>;

// ---------------------------------------------------------------------------
// Table – the complete loaded content
// ---------------------------------------------------------------------------

/// Ordered rows of string fields. Rows may have different widths; no schema
/// is enforced beyond "rows of fields".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
#[serde(transparent)]
pub struct Table {
    rows: Vec<Row>,
}

impl Table {
    /// An empty table (no rows).
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rows(rows: Vec<Row>) -> Self {
        Table { rows }
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn push_row(&mut self, row: Row) {
        self.rows.push(row);
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Widest row, in fields.
    pub fn width(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Every field, row-major then field-major.
    pub fn fields_mut(&mut self) -> impl Iterator<Item = &mut String> {
        self.rows.iter_mut().flat_map(|row| row.iter_mut())
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }
}

impl<R, F> FromIterator<R> for Table
where
    R: IntoIterator<Item = F>,
    F: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = R>>(iter: I) -> Self {
        Table {
            rows: iter
                .into_iter()
                .map(|row| row.into_iter().map(Into::into).collect())
                .collect(),
        }
    }
}

/// Comma-joined lines, one per row.
impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in &self.rows {
            writeln!(f, "{}", row.join(","))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_from_nested_str_slices() {
        let table: Table = [["a", "b"], ["c", "d"]].into_iter().collect();
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows()[1], vec!["c".to_string(), "d".to_string()]);
    }

    #[test]
    fn width_is_widest_row() {
        let table = Table::from_rows(vec![
            vec!["x".into()],
            vec!["a".into(), "b".into(), "c".into()],
        ]);
        assert_eq!(table.width(), 3);
        assert_eq!(Table::new().width(), 0);
    }

    #[test]
    fn fields_mut_visits_row_major() {
        let mut table: Table = [["1", "2"], ["3", "4"]].into_iter().collect();
        let mut seen = Vec::new();
        for (i, field) in table.fields_mut().enumerate() {
            seen.push(field.clone());
            *field = i.to_string();
        }
        assert_eq!(seen, ["1", "2", "3", "4"]);
        assert_eq!(table.to_string(), "0,1\n2,3\n");
    }
}
