use sheetbook::codec::{decode, encode};
use sheetbook::record::Record;
use sheetbook::registry::{ColumnMapping, normalize_positions, parse_index_rows, validate};

fn headers(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

// Encoding with an empty mapping must be driven entirely by the fallback
// header order, one cell per header.
fn test_encode_fallback_headers() {
    println!("\n====== Testing encode with fallback headers ======");

    let record = Record::from_pairs(&[("Date", "2024-05-01"), ("Amount", "19.99")]);
    let fallback = headers(&["Index", "Date", "Merchant", "Amount"]);

    let row = encode(&record, &ColumnMapping::new(), &fallback);
    assert_eq!(row.len(), 4);
    assert_eq!(row, vec!["", "2024-05-01", "", "19.99"]);
    println!("✓ Row has one cell per fallback header");

    let empty = encode(&Record::new(), &ColumnMapping::new(), &fallback);
    assert_eq!(empty.len(), 4);
    assert!(empty.iter().all(|cell| cell.is_empty()));
    println!("✓ Empty record still produces a full-width row");
}

// Mapped encoding spans from column 0 to the largest mapped position, with
// empty strings in the gaps.
fn test_encode_with_mapping() {
    println!("\n====== Testing encode with a sparse mapping ======");

    let mapping = ColumnMapping::from_pairs(&[("A", Some(0)), ("B", Some(2)), ("C", Some(5))]);
    let record = Record::from_pairs(&[("A", "1"), ("B", "2"), ("C", "3")]);

    let row = encode(&record, &mapping, &[]);
    assert_eq!(row.len(), 6);
    assert_eq!(row, vec!["1", "", "2", "", "", "3"]);
    println!("✓ Sparse mapping 0,2,5 produces a 6-cell row with gaps");

    // Unmapped record fields are dropped.
    let record = Record::from_pairs(&[("A", "1"), ("Unmapped", "x")]);
    let row = encode(&record, &mapping, &[]);
    assert_eq!(row, vec!["1", "", "", "", "", ""]);
    println!("✓ Fields without a mapping entry are dropped");

    // Retired columns are never written.
    let mapping = ColumnMapping::from_pairs(&[("A", Some(0)), ("Old", None), ("B", Some(1))]);
    let record = Record::from_pairs(&[("A", "1"), ("Old", "stale"), ("B", "2")]);
    let row = encode(&record, &mapping, &[]);
    assert_eq!(row, vec!["1", "2"]);
    println!("✓ Retired columns stay reserved but unwritten");
}

// Field lookup is case-insensitive and trims whitespace on both sides.
fn test_encode_normalized_lookup() {
    println!("\n====== Testing normalized field lookup ======");

    let mapping = ColumnMapping::from_pairs(&[("Invoice Number", Some(0))]);
    let record = Record::from_pairs(&[(" invoice number ", "INV-7")]);

    let row = encode(&record, &mapping, &[]);
    assert_eq!(row, vec!["INV-7"]);
    println!("✓ Lookup matches across case and whitespace differences");
}

fn test_round_trip() {
    println!("\n====== Testing encode/decode round trip ======");

    let mapping = ColumnMapping::from_pairs(&[("A", Some(0)), ("B", Some(1))]);
    let record = Record::from_pairs(&[("A", "1"), ("B", "2")]);

    let row = encode(&record, &mapping, &[]);
    let recovered = decode(&row, &mapping, &[]);
    assert_eq!(recovered.get("A"), Some(&"1".to_string()));
    assert_eq!(recovered.get("B"), Some(&"2".to_string()));
    assert_eq!(recovered.len(), 2);
    println!("✓ decode(encode(record)) recovers the record");

    let fallback = headers(&["X", "Y"]);
    let record = Record::from_pairs(&[("X", "left"), ("Y", "right")]);
    let row = encode(&record, &ColumnMapping::new(), &fallback);
    let recovered = decode(&row, &ColumnMapping::new(), &fallback);
    assert_eq!(recovered, record);
    println!("✓ Round trip also holds through fallback headers");
}

// The 1-based scenario from the column-index sheet: positions 1 and 3 must
// land on columns 0 and 2.
fn test_one_based_source_scenario() {
    println!("\n====== Testing 1-based source rows end to end ======");

    let rows = vec![
        vec!["Invoices".to_string(), "Index".to_string(), "1".to_string()],
        vec!["Invoices".to_string(), "Name".to_string(), "3".to_string()],
    ];

    let entries = parse_index_rows("Invoices", &rows);
    let report = validate(&entries);
    assert!(report.invalid.is_empty());

    let mapping = normalize_positions(report.mapping);
    assert_eq!(mapping.position("Index"), Some(0));
    assert_eq!(mapping.position("Name"), Some(2));
    println!("✓ Positions 1 and 3 normalize to 0 and 2");

    let record = Record::from_pairs(&[("Index", "5"), ("Name", "Bob")]);
    let row = encode(&record, &mapping, &[]);
    assert_eq!(row, vec!["5", "", "Bob"]);
    println!("✓ Encoded row is ['5', '', 'Bob']");
}

fn main() {
    println!("Running codec tests...");

    test_encode_fallback_headers();
    test_encode_with_mapping();
    test_encode_normalized_lookup();
    test_round_trip();
    test_one_based_source_scenario();

    println!("\nAll codec tests passed!");
}
