use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

// Placeholder sentinels. A field that could not be located renders as one of
// these, so every record from the same page keeps a uniform shape.
pub const NOT_SPECIFIED: &str = "Not specified";
pub const NOT_DISCLOSED: &str = "Not disclosed";
pub const NO_DESCRIPTION: &str = "No description provided";
pub const NOT_PROVIDED: &str = "Not provided";

pub const TITLE: &str = "title";
pub const URL: &str = "url";

/// One scraped listing: a field-name to value map. `title` and `url` are
/// always present; a listing where they cannot be located is never
/// constructed in the first place.
#[derive(Debug, Clone, Serialize)]
pub struct ListingRecord {
    #[serde(flatten)]
    fields: BTreeMap<String, String>,
}

impl ListingRecord {
    pub fn new(title: String, url: String) -> Self {
        let mut fields = BTreeMap::new();
        fields.insert(TITLE.to_string(), title);
        fields.insert(URL.to_string(), url);
        ListingRecord { fields }
    }

    pub fn set(&mut self, field: &str, value: String) {
        self.fields.insert(field.to_string(), value);
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    pub fn title(&self) -> &str {
        self.fields[TITLE].as_str()
    }

    pub fn url(&self) -> &str {
        self.fields[URL].as_str()
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }
}

/// Ordered, append-only accumulation of records across pages. Created empty
/// at run start and finalized exactly once, however the run ends.
#[derive(Debug, Default)]
pub struct ResultSet {
    records: Vec<ListingRecord>,
}

impl ResultSet {
    pub fn new() -> Self {
        ResultSet::default()
    }

    pub fn extend_page(&mut self, page: Vec<ListingRecord>) {
        self.records.extend(page);
    }

    pub fn records(&self) -> &[ListingRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<ListingRecord> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Sorted union of every field name seen across all records. Output
    /// columns come from this, not from any single record.
    pub fn field_union(&self) -> Vec<String> {
        let union: BTreeSet<&str> = self
            .records
            .iter()
            .flat_map(|record| record.field_names())
            .collect();
        union.into_iter().map(str::to_string).collect()
    }
}
