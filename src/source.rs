//! CSV-backed record source.
//!
//! The loader consumes records as plain field-name → raw-value mappings,
//! so the mapper never touches CSV machinery. [`CsvSource`] opens a fresh
//! reader on every iteration, which lets the same file be reprocessed for
//! retry runs.

use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecord, StringRecordsIntoIter};

use crate::error::Result;

/// A single delimited record as a field-name → raw string value mapping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceRecord {
    fields: HashMap<String, String>,
}

impl SourceRecord {
    /// Empty record.
    pub fn new() -> Self {
        SourceRecord::default()
    }

    /// Record built from (field, value) pairs.
    pub fn from_pairs<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let fields = pairs
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        SourceRecord { fields }
    }

    /// Sets a field, replacing any previous value.
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(field.into(), value.into());
    }

    /// Raw value of a field, if the column was present.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    /// Trimmed value of a field, filtered to non-empty.
    pub fn get_nonblank(&self, field: &str) -> Option<&str> {
        self.get(field).map(str::trim).filter(|v| !v.is_empty())
    }
}

/// Record source reading a headered CSV file.
///
/// Rows wider or narrower than the header are tolerated; missing cells
/// simply leave their fields absent from the record.
#[derive(Debug, Clone)]
pub struct CsvSource {
    path: PathBuf,
    delimiter: u8,
}

impl CsvSource {
    /// Source over a comma-delimited file.
    pub fn new(path: impl AsRef<Path>) -> Self {
        CsvSource {
            path: path.as_ref().to_path_buf(),
            delimiter: b',',
        }
    }

    /// Overrides the field delimiter.
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Path of the underlying file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Opens a fresh reader and returns an iterator over the file's
    /// records. Calling this again restarts from the first row.
    pub fn records(&self) -> Result<RecordIter> {
        let mut reader = ReaderBuilder::new()
            .flexible(true)
            .delimiter(self.delimiter)
            .from_path(&self.path)?;
        let headers = reader.headers()?.clone();
        Ok(RecordIter {
            headers,
            inner: reader.into_records(),
        })
    }
}

/// Iterator over one pass of a [`CsvSource`].
pub struct RecordIter {
    headers: StringRecord,
    inner: StringRecordsIntoIter<File>,
}

impl Iterator for RecordIter {
    type Item = std::result::Result<SourceRecord, csv::Error>;

    fn next(&mut self) -> Option<Self::Item> {
        let row = match self.inner.next()? {
            Ok(row) => row,
            Err(err) => return Some(Err(err)),
        };
        let mut record = SourceRecord::new();
        for (field, value) in self.headers.iter().zip(row.iter()) {
            record.set(field, value);
        }
        Some(Ok(record))
    }
}
