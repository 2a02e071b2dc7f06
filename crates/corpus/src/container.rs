//! Result container: one named, ragged column of strings per backend.

use chrono::{DateTime, Utc};

/// Collected text keyed by backend display name.
///
/// Columns keep the order they were first inserted in. Inserting under an
/// existing name replaces that column in place, so two backends sharing a
/// display name leave only the later write.
#[derive(Debug, Clone, PartialEq)]
pub struct TextContainer {
    created_at: DateTime<Utc>,
    columns: Vec<(String, Vec<String>)>,
}

impl Default for TextContainer {
    fn default() -> Self {
        Self::new()
    }
}

impl TextContainer {
    /// Create an empty container stamped with the current time.
    pub fn new() -> Self {
        Self::with_timestamp(Utc::now())
    }

    pub fn with_timestamp(created_at: DateTime<Utc>) -> Self {
        Self {
            created_at,
            columns: Vec::new(),
        }
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Set a column, returning the rows it replaced.
    pub fn insert(&mut self, name: impl Into<String>, rows: Vec<String>) -> Option<Vec<String>> {
        let name = name.into();
        match self.columns.iter_mut().find(|(column, _)| *column == name) {
            Some((_, existing)) => Some(std::mem::replace(existing, rows)),
            None => {
                self.columns.push((name, rows));
                None
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.columns
            .iter()
            .find(|(column, _)| column == name)
            .map(|(_, rows)| rows.as_slice())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Columns in insertion order.
    pub fn columns(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.columns
            .iter()
            .map(|(name, rows)| (name.as_str(), rows.as_slice()))
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Length of the longest column, 0 when empty.
    pub fn max_rows(&self) -> usize {
        self.columns
            .iter()
            .map(|(_, rows)| rows.len())
            .max()
            .unwrap_or(0)
    }

    /// Drop empty strings from every column, keeping relative order.
    pub fn remove_null_value_per_column(&mut self) {
        for (_, rows) in &mut self.columns {
            rows.retain(|row| !row.is_empty());
        }
    }

    /// Rectangular view padded with empty cells up to [`max_rows`](Self::max_rows).
    pub fn collate(&self) -> CollatedTable<'_> {
        CollatedTable {
            container: self,
            rows: self.max_rows(),
        }
    }
}

/// Padded, row-major view over a [`TextContainer`].
#[derive(Debug, Clone, Copy)]
pub struct CollatedTable<'a> {
    container: &'a TextContainer,
    rows: usize,
}

impl<'a> CollatedTable<'a> {
    pub fn header(&self) -> Vec<&'a str> {
        self.container.column_names()
    }

    pub fn row_count(&self) -> usize {
        self.rows
    }

    /// Rows with missing cells filled by `""`.
    pub fn rows(&self) -> impl Iterator<Item = Vec<&'a str>> + 'a {
        let container = self.container;
        (0..self.rows).map(move |index| {
            container
                .columns
                .iter()
                .map(|(_, rows)| rows.get(index).map(String::as_str).unwrap_or(""))
                .collect()
        })
    }
}
