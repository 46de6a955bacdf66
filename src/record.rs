use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

lazy_static! {
    static ref DATASET_NAME_REGEX: Regex = Regex::new(r"^[A-Za-z0-9][A-Za-z0-9 _-]*$").unwrap();
}

/// True when a name is safe to splice into an A1-notation range.
///
/// Dataset names arrive from the wire at the proxy boundary, so anything that
/// could change the meaning of a range string is rejected up front.
pub fn is_valid_dataset_name(name: &str) -> bool {
    DATASET_NAME_REGEX.is_match(name)
}

/// A field-name-keyed set of cell values destined for one spreadsheet row.
///
/// Field lookup is case-insensitive and ignores surrounding whitespace, so a
/// record built with `set("Invoice Number", ..)` is found by a column named
/// `invoice number `. Values are always strings; callers format dates and
/// currency before building the record.
#[derive(Clone, Serialize, Deserialize, Debug, Default, PartialEq)]
pub struct Record {
    fields: BTreeMap<String, String>,
}

/// Lower-cased, trimmed form of a field or dataset name, used for every
/// name comparison in the crate.
pub(crate) fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

impl Record {
    pub fn new() -> Self {
        Record {
            fields: BTreeMap::new(),
        }
    }

    /// Set a field value, replacing any value stored under an equivalent name.
    pub fn set(&mut self, field: &str, value: impl Into<String>) {
        let normalized = normalize_name(field);
        self.fields.retain(|k, _| normalize_name(k) != normalized);
        self.fields.insert(field.to_string(), value.into());
    }

    /// Look up a field by normalized name.
    pub fn get(&self, field: &str) -> Option<&String> {
        let normalized = normalize_name(field);
        self.fields
            .iter()
            .find(|(k, _)| normalize_name(k) == normalized)
            .map(|(_, v)| v)
    }

    /// True if the field is present with a non-empty value.
    pub fn has_value(&self, field: &str) -> bool {
        self.get(field).map(|v| !v.trim().is_empty()).unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterate over the stored field names and values.
    pub fn fields(&self) -> impl Iterator<Item = (&String, &String)> {
        self.fields.iter()
    }

    pub fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        let mut record = Record::new();
        for (field, value) in pairs {
            record.set(field, *value);
        }
        record
    }

    /// Build a record from a JSON object, stringifying scalar values.
    ///
    /// Strings are taken as-is, numbers and booleans are rendered with their
    /// JSON representation, and null fields are skipped entirely (an absent
    /// field encodes to an empty cell anyway).
    pub fn from_json_map(map: &serde_json::Map<String, serde_json::Value>) -> Self {
        let mut record = Record::new();
        for (field, value) in map {
            match value {
                serde_json::Value::Null => {}
                serde_json::Value::String(s) => record.set(field, s.clone()),
                other => record.set(field, other.to_string()),
            }
        }
        record
    }
}

/// Description of one logical dataset backed by a sheet tab.
///
/// The canonical header order is the fixed column layout used whenever no
/// column-index mapping is available for the dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetSpec {
    /// Tab name in the backing spreadsheet (case preserved for ranges).
    pub name: String,

    /// Field holding the sequential index, if the dataset allocates one.
    pub index_field: Option<String>,

    /// Fallback header order used when the column mapping is empty.
    pub fallback_headers: Vec<String>,
}

impl DatasetSpec {
    pub fn new(name: &str, index_field: Option<&str>, fallback_headers: &[&str]) -> Self {
        DatasetSpec {
            name: name.to_string(),
            index_field: index_field.map(|f| f.to_string()),
            fallback_headers: fallback_headers.iter().map(|h| h.to_string()).collect(),
        }
    }

    pub fn invoices() -> Self {
        Self::new(
            "Invoices",
            Some("Index"),
            &[
                "Index",
                "Invoice Number",
                "Date",
                "Client",
                "Description",
                "Amount",
                "Status",
                "Due Date",
            ],
        )
    }

    pub fn expenses() -> Self {
        Self::new(
            "Expenses",
            Some("Index"),
            &[
                "Index", "Date", "Merchant", "Category", "Amount", "Currency", "Receipt", "Notes",
            ],
        )
    }

    pub fn bundles() -> Self {
        Self::new(
            "Bundles",
            Some("Index"),
            &["Index", "Name", "Created", "Invoice Numbers", "Total"],
        )
    }

    pub fn contacts() -> Self {
        Self::new(
            "Contacts",
            Some("Index"),
            &["Index", "Name", "Company", "Email", "Phone", "Address", "Notes"],
        )
    }

    /// Resolve one of the built-in datasets by name, case-insensitively.
    pub fn builtin(name: &str) -> Option<Self> {
        match normalize_name(name).as_str() {
            "invoices" => Some(Self::invoices()),
            "expenses" => Some(Self::expenses()),
            "bundles" => Some(Self::bundles()),
            "contacts" => Some(Self::contacts()),
            _ => None,
        }
    }

    /// Range covering the dataset's data rows, header row excluded.
    pub fn data_range(&self) -> String {
        format!("{}!A2:ZZ", self.name)
    }

    /// Range covering the dataset's index column, header row excluded.
    ///
    /// The column is taken from the mapped position of the index field when a
    /// mapping is available, and defaults to column A otherwise.
    pub fn index_scan_range(&self, mapping: Option<&crate::registry::ColumnMapping>) -> String {
        let position = self
            .index_field
            .as_deref()
            .and_then(|field| mapping.and_then(|m| m.position(field)))
            .unwrap_or(0);
        let letter = column_letter(position);
        format!("{}!{}2:{}", self.name, letter, letter)
    }
}

/// Convert a zero-based column position to its sheet letter (0 is A, 25 is Z,
/// 26 is AA).
pub fn column_letter(position: u32) -> String {
    let mut col = position + 1;
    let mut result = String::new();
    while col > 0 {
        col -= 1;
        result.push(((col % 26) as u8 + b'A') as char);
        col /= 26;
    }
    result.chars().rev().collect()
}
