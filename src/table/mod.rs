//! Row/column table parsed from an uploaded file.
mod loader;
mod value;

use thiserror::Error;

pub use loader::{ALLOWED_EXTENSIONS, TableFormat, load_table};
pub use value::CellValue;

/// Row width does not match the header.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("row {row} has {found} cells, expected {expected}")]
pub struct ShapeError {
    pub row: usize,
    pub found: usize,
    pub expected: usize,
}

/// Ordered rows sharing one named column set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<CellValue>>,
}

impl Table {
    #[must_use]
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Builds a table and checks every row against the header width.
    ///
    /// # Errors
    /// Returns [`ShapeError`] for the first row whose width differs.
    pub fn from_rows(columns: Vec<String>, rows: Vec<Vec<CellValue>>) -> Result<Self, ShapeError> {
        let mut table = Self::new(columns);
        for row in rows {
            table.push_row(row)?;
        }
        Ok(table)
    }

    /// # Errors
    /// Returns [`ShapeError`] when `row` is not exactly as wide as the header.
    pub fn push_row(&mut self, row: Vec<CellValue>) -> Result<(), ShapeError> {
        if row.len() != self.columns.len() {
            return Err(ShapeError {
                row: self.rows.len(),
                found: row.len(),
                expected: self.columns.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    #[must_use]
    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    #[must_use]
    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Values of one column in row order.
    pub fn column_values(&self, name: &str) -> Option<impl Iterator<Item = &CellValue> + '_> {
        let index = self.column_index(name)?;
        Some(self.rows.iter().map(move |row| &row[index]))
    }

    pub(crate) fn coerce_column_to_text(&mut self, index: usize) {
        for row in &mut self.rows {
            let cell = std::mem::replace(&mut row[index], CellValue::Empty);
            row[index] = cell.into_text();
        }
    }

    /// Returns a copy with `name` set to `values`, overwriting an existing
    /// column of that name or appending a new one.
    ///
    /// # Errors
    /// Returns [`ShapeError`] when `values` does not have one entry per row.
    pub fn with_column(&self, name: &str, values: Vec<CellValue>) -> Result<Self, ShapeError> {
        if values.len() != self.rows.len() {
            return Err(ShapeError {
                row: values.len(),
                found: values.len(),
                expected: self.rows.len(),
            });
        }

        let mut columns = self.columns.clone();
        let mut rows = self.rows.clone();
        match self.column_index(name) {
            Some(index) => {
                for (row, value) in rows.iter_mut().zip(values) {
                    row[index] = value;
                }
            }
            None => {
                columns.push(name.to_string());
                for (row, value) in rows.iter_mut().zip(values) {
                    row.push(value);
                }
            }
        }
        Ok(Self { columns, rows })
    }
}

/// Header cleanup shared by the CSV and XLSX readers: blank names become
/// `Unnamed: <index>`, repeated names get `.1`, `.2`, ... suffixes.
pub(crate) fn normalize_headers(raw: Vec<String>) -> Vec<String> {
    let mut seen: Vec<String> = Vec::with_capacity(raw.len());
    for (index, name) in raw.into_iter().enumerate() {
        let base = if name.trim().is_empty() {
            format!("Unnamed: {index}")
        } else {
            name.trim().to_string()
        };
        let mut candidate = base.clone();
        let mut suffix = 1;
        while seen.contains(&candidate) {
            candidate = format!("{base}.{suffix}");
            suffix += 1;
        }
        seen.push(candidate);
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        Table::from_rows(
            vec!["id".into(), "review".into()],
            vec![
                vec![CellValue::Int(1), "bagus".into()],
                vec![CellValue::Int(2), "jelek".into()],
            ],
        )
        .expect("valid table")
    }

    #[test]
    fn push_row_rejects_wrong_width() {
        let mut table = Table::new(vec!["a".into(), "b".into()]);
        let error = table.push_row(vec!["x".into()]).expect_err("too short");
        assert_eq!(
            error,
            ShapeError {
                row: 0,
                found: 1,
                expected: 2
            }
        );
    }

    #[test]
    fn column_values_follow_row_order() {
        let table = sample();
        let values: Vec<String> = table
            .column_values("review")
            .expect("column exists")
            .map(ToString::to_string)
            .collect();
        assert_eq!(values, vec!["bagus", "jelek"]);
        assert!(table.column_values("missing").is_none());
    }

    #[test]
    fn with_column_appends_or_overwrites() {
        let table = sample();
        let appended = table
            .with_column("label", vec!["a".into(), "b".into()])
            .expect("append");
        assert_eq!(appended.columns(), &["id", "review", "label"]);

        let overwritten = appended
            .with_column("label", vec!["c".into(), "d".into()])
            .expect("overwrite");
        assert_eq!(overwritten.columns().len(), 3);
        assert_eq!(overwritten.rows()[1][2], CellValue::from("d"));
    }

    #[test]
    fn with_column_checks_length() {
        assert!(sample().with_column("label", vec!["a".into()]).is_err());
    }

    #[test]
    fn coerce_column_to_text_converts_every_cell() {
        let mut table = sample();
        table.coerce_column_to_text(0);
        assert_eq!(table.rows()[0][0], CellValue::Text("1".into()));
    }

    #[test]
    fn normalize_headers_handles_blank_and_duplicate_names() {
        let headers = normalize_headers(vec![
            "review".into(),
            " ".into(),
            "review".into(),
            "review".into(),
        ]);
        assert_eq!(headers, vec!["review", "Unnamed: 1", "review.1", "review.2"]);
    }
}
