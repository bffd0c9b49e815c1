//! Tabular input: one record per form submission attempt

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use crate::error::{HarnessError, HarnessResult};

/// One dataset row, columns in file order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    fields: IndexMap<String, String>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value of `field`, or `""` when the column is absent
    pub fn get(&self, field: &str) -> &str {
        self.fields.get(field).map(String::as_str).unwrap_or("")
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(field.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Maps a record column onto a form input
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMapping {
    /// Label/name fragments tried in order
    pub hints: Vec<String>,

    /// Record column supplying the value
    pub source: String,

    /// Short name used in step names
    pub tag: String,
}

impl FieldMapping {
    pub fn new(hints: &[&str], source: &str, tag: &str) -> Self {
        Self {
            hints: hints.iter().map(|h| h.to_string()).collect(),
            source: source.to_string(),
            tag: tag.to_string(),
        }
    }
}

pub fn default_field_mappings() -> Vec<FieldMapping> {
    vec![
        FieldMapping::new(&["First Name", "First"], "FirstName", "FirstName"),
        FieldMapping::new(&["Last Name", "Last", "Surname"], "LastName", "LastName"),
        FieldMapping::new(&["Phone", "Telephone", "Mobile"], "Phone", "Phone"),
        FieldMapping::new(&["Email", "E-mail"], "Email", "Email"),
        FieldMapping::new(&["Building", "House"], "BuildingNumber", "BuildingNumber"),
        FieldMapping::new(&["Street", "Address Line 1", "Address"], "AddressLine1", "Address1"),
        FieldMapping::new(&["City", "Town"], "City", "City"),
        FieldMapping::new(&["Postcode", "Postal Code", "ZIP"], "Postcode", "Postcode"),
    ]
}

/// Ordered records loaded from a CSV file with a header row
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    records: Vec<Record>,
}

impl Dataset {
    pub fn from_records(records: Vec<Record>) -> Self {
        Self { records }
    }

    pub fn from_csv(path: &Path) -> HarnessResult<Self> {
        if !path.exists() {
            return Err(HarnessError::Dataset(format!(
                "CSV not found: {}",
                path.display()
            )));
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::Headers)
            .from_path(path)?;
        let dataset = Self::from_reader(&mut reader)?;

        info!("Loaded {} rows from {}", dataset.len(), path.display());
        Ok(dataset)
    }

    /// Short rows leave their trailing columns absent rather than failing.
    fn from_reader<R: std::io::Read>(reader: &mut csv::Reader<R>) -> HarnessResult<Self> {
        let headers = reader.headers()?.clone();
        let mut records = Vec::new();

        for row in reader.records() {
            let row = row?;
            let record = headers
                .iter()
                .zip(row.iter())
                .collect::<Record>();
            records.push(record);
        }

        Ok(Self { records })
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
