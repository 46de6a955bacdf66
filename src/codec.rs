use crate::record::Record;
use crate::registry::ColumnMapping;

/// An ordered sequence of string cell values ready for append. Gaps are empty
/// strings, never missing cells.
pub type PositionalRow = Vec<String>;

/// Convert a record into a positional row using a column mapping.
///
/// When the mapping has at least one numeric position, the row spans from
/// column 0 to the largest mapped position and every mapped field is written
/// at its position. Record fields with no mapping entry are dropped; this is
/// lossy on purpose and mirrors how the column-index table acts as the schema
/// of record.
///
/// When the mapping has no numeric positions at all, the fallback header
/// order drives the row instead, producing exactly one cell per header.
///
/// This function performs no I/O and cannot fail.
///
/// # Examples
/// ```
/// use sheetbook::codec::encode;
/// use sheetbook::record::Record;
/// use sheetbook::registry::ColumnMapping;
///
/// let record = Record::from_pairs(&[("Index", "5"), ("Name", "Bob")]);
/// let mapping = ColumnMapping::from_pairs(&[("Index", Some(0)), ("Name", Some(2))]);
/// assert_eq!(encode(&record, &mapping, &[]), vec!["5", "", "Bob"]);
/// ```
pub fn encode(record: &Record, mapping: &ColumnMapping, fallback_headers: &[String]) -> PositionalRow {
    if mapping.has_numeric() {
        let width = mapping.max_position().map(|m| m as usize + 1).unwrap_or(0);
        let mut row = vec![String::new(); width];
        for (name, position) in mapping.iter() {
            if let Some(position) = position {
                if let Some(value) = record.get(name) {
                    row[*position as usize] = value.clone();
                }
            }
        }
        row
    } else {
        fallback_headers
            .iter()
            .map(|header| record.get(header).cloned().unwrap_or_default())
            .collect()
    }
}

/// Convert a positional row back into a record, the inverse of [`encode`].
///
/// Mapped positions (or the fallback header order when the mapping has no
/// numeric entries) are read back under their field names. Empty cells yield
/// no field, so a decode of an encode recovers exactly the fields that were
/// written.
pub fn decode(row: &[String], mapping: &ColumnMapping, fallback_headers: &[String]) -> Record {
    let mut record = Record::new();
    if mapping.has_numeric() {
        for (name, position) in mapping.iter() {
            if let Some(position) = position {
                if let Some(cell) = row.get(*position as usize) {
                    if !cell.is_empty() {
                        record.set(name, cell.clone());
                    }
                }
            }
        }
    } else {
        for (position, header) in fallback_headers.iter().enumerate() {
            if let Some(cell) = row.get(position) {
                if !cell.is_empty() {
                    record.set(header, cell.clone());
                }
            }
        }
    }
    record
}
