use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::record::normalize_name;
use crate::transport::{Transport, read_with_fallback};

/// Sanity bound on column positions, rejecting corrupt index data.
pub const MAX_COLUMN_INDEX: u32 = 2000;

/// Candidate ranges holding the user-editable column-index table. The first
/// range that yields at least one entry for the requested dataset wins.
pub const COLUMNS_INDEX_RANGES: [&str; 2] = ["Columns Index!A1:C", "ColumnsIndex!A1:C"];

/// A mapping from field name to zero-based column position for one dataset.
///
/// Entries keep their first-seen order so that position collisions resolve in
/// favor of the earlier entry. A `None` position marks a retired column whose
/// name stays reserved but is never written.
#[derive(Clone, Serialize, Deserialize, Debug, Default, PartialEq)]
pub struct ColumnMapping {
    entries: Vec<(String, Option<u32>)>,
}

impl ColumnMapping {
    pub fn new() -> Self {
        ColumnMapping { entries: Vec::new() }
    }

    pub fn from_pairs(pairs: &[(&str, Option<u32>)]) -> Self {
        ColumnMapping {
            entries: pairs
                .iter()
                .map(|(name, pos)| (name.to_string(), *pos))
                .collect(),
        }
    }

    pub(crate) fn push(&mut self, name: String, position: Option<u32>) {
        self.entries.push((name, position));
    }

    /// Position of a field, looked up by normalized name.
    pub fn position(&self, field: &str) -> Option<u32> {
        let normalized = normalize_name(field);
        self.entries
            .iter()
            .find(|(name, _)| normalize_name(name) == normalized)
            .and_then(|(_, pos)| *pos)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, Option<u32>)> {
        self.entries.iter()
    }

    /// Largest numeric position in the mapping.
    pub fn max_position(&self) -> Option<u32> {
        self.entries.iter().filter_map(|(_, pos)| *pos).max()
    }

    /// True if at least one entry carries a numeric position.
    pub fn has_numeric(&self) -> bool {
        self.entries.iter().any(|(_, pos)| pos.is_some())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One rejected column-index entry with the reason it was rejected.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct InvalidEntry {
    pub name: String,
    pub raw: String,
    pub reason: String,
}

/// Outcome of validating raw column-index entries. Partial invalidity is a
/// warning-level condition and the validated subset remains usable.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MappingReport {
    pub mapping: ColumnMapping,
    pub invalid: Vec<InvalidEntry>,
}

/// Resolves where each field of a dataset goes in its positional row.
///
/// Mappings come from a user-editable column-index sheet and are cached per
/// dataset for the lifetime of the registry. The registry is an explicit state
/// object owned by the gateway; callers never mutate the cache directly.
pub struct ColumnIndexRegistry {
    cache: HashMap<String, ColumnMapping>,
}

impl Default for ColumnIndexRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ColumnIndexRegistry {
    pub fn new() -> Self {
        ColumnIndexRegistry {
            cache: HashMap::new(),
        }
    }

    /// Load the column mapping for a dataset, reading through the transports
    /// unless a cached mapping exists.
    ///
    /// The candidate ranges are tried in order and the first one producing at
    /// least one entry for the dataset is used. An empty mapping is a valid
    /// outcome meaning "use the fallback header order"; it is cached like any
    /// other so repeated calls stay cheap.
    ///
    /// # Arguments
    /// * `dataset` - Dataset name, matched case-insensitively
    /// * `transports` - Ordered access paths to the backing spreadsheet
    /// * `force` - Bypass the cache and re-read the source
    pub fn load(
        &mut self,
        dataset: &str,
        transports: &[Box<dyn Transport>],
        force: bool,
    ) -> ColumnMapping {
        let key = normalize_name(dataset);
        if !force {
            if let Some(cached) = self.cache.get(&key) {
                debug!("column mapping cache hit for {}", dataset);
                return cached.clone();
            }
        }

        let mut entries = Vec::new();
        for range in COLUMNS_INDEX_RANGES {
            match read_with_fallback(transports, range) {
                Ok(rows) => {
                    entries = parse_index_rows(dataset, &rows);
                    if !entries.is_empty() {
                        break;
                    }
                }
                Err(reason) => {
                    debug!("column index range {} unavailable: {}", range, reason);
                }
            }
        }

        let report = validate(&entries);
        if !report.invalid.is_empty() {
            warn!(
                "{} invalid column index entries for {}: {}",
                report.invalid.len(),
                dataset,
                report
                    .invalid
                    .iter()
                    .map(|e| format!("{} ({})", e.name, e.reason))
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }

        let mapping = normalize_positions(report.mapping);
        self.cache.insert(key, mapping.clone());
        mapping
    }

    /// Cached mapping for a dataset, without any I/O.
    pub fn get_cached(&self, dataset: &str) -> Option<&ColumnMapping> {
        self.cache.get(&normalize_name(dataset))
    }
}

/// Extract the raw `(column name, raw index)` entries for one dataset from the
/// rows of the column-index table.
///
/// Row shapes are dispatched on width. Three-column rows are
/// `[Dataset, ColumnName, Index]`. Two-column rows are ambiguous: when the
/// first cell names the dataset the second is a column name with no index,
/// otherwise the first cell is the column name and the second is its index if
/// numeric. One-column rows are unusable and skipped.
pub fn parse_index_rows(dataset: &str, rows: &[Vec<String>]) -> Vec<(String, Option<String>)> {
    let target = normalize_name(dataset);
    let mut entries = Vec::new();

    for row in rows {
        match row.len() {
            0 | 1 => {}
            2 => {
                if normalize_name(&row[0]) == target {
                    if !row[1].trim().is_empty() {
                        entries.push((row[1].trim().to_string(), None));
                    }
                } else if !row[0].trim().is_empty() {
                    let index = if row[1].trim().parse::<i64>().is_ok() {
                        Some(row[1].trim().to_string())
                    } else {
                        None
                    };
                    entries.push((row[0].trim().to_string(), index));
                }
            }
            _ => {
                if normalize_name(&row[0]) == target && !row[1].trim().is_empty() {
                    let raw = row[2].trim();
                    let index = if raw.is_empty() {
                        None
                    } else {
                        Some(raw.to_string())
                    };
                    entries.push((row[1].trim().to_string(), index));
                }
            }
        }
    }

    entries
}

/// Validate raw column-index entries into a usable mapping.
///
/// A blank index is accepted as a retired-column marker. Anything else must
/// parse as a non-negative integer no larger than [`MAX_COLUMN_INDEX`], and
/// must not collide with a position already accepted for this mapping. The
/// first entry claiming a position wins; later claimants are reported invalid
/// rather than applied.
pub fn validate(entries: &[(String, Option<String>)]) -> MappingReport {
    let mut report = MappingReport::default();
    let mut taken: HashMap<u32, String> = HashMap::new();

    for (name, raw) in entries {
        let raw = match raw {
            None => {
                report.mapping.push(name.clone(), None);
                continue;
            }
            Some(raw) => raw,
        };

        let position = match raw.parse::<i64>() {
            Ok(p) => p,
            Err(_) => {
                report.invalid.push(InvalidEntry {
                    name: name.clone(),
                    raw: raw.clone(),
                    reason: "not a number".to_string(),
                });
                continue;
            }
        };

        if position < 0 {
            report.invalid.push(InvalidEntry {
                name: name.clone(),
                raw: raw.clone(),
                reason: "negative position".to_string(),
            });
            continue;
        }
        if position > MAX_COLUMN_INDEX as i64 {
            report.invalid.push(InvalidEntry {
                name: name.clone(),
                raw: raw.clone(),
                reason: format!("position above {}", MAX_COLUMN_INDEX),
            });
            continue;
        }

        let position = position as u32;
        if let Some(holder) = taken.get(&position) {
            report.invalid.push(InvalidEntry {
                name: name.clone(),
                raw: raw.clone(),
                reason: format!("position already used by {}", holder),
            });
            continue;
        }

        taken.insert(position, name.clone());
        report.mapping.push(name.clone(), Some(position));
    }

    report
}

/// Normalize a mapping that expresses positions as 1-based.
///
/// The heuristic: when every numeric position is at least 1 and none is 0, the
/// source is treated as 1-based and every position shifts down by one. This is
/// the only place in the crate that applies the heuristic.
pub fn normalize_positions(mapping: ColumnMapping) -> ColumnMapping {
    let numeric: Vec<u32> = mapping.iter().filter_map(|(_, pos)| *pos).collect();
    if numeric.is_empty() || numeric.iter().any(|&p| p == 0) {
        return mapping;
    }

    let mut normalized = ColumnMapping::new();
    for (name, pos) in mapping.iter() {
        normalized.push(name.clone(), pos.map(|p| p - 1));
    }
    normalized
}
