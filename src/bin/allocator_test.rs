use sheetbook::allocator::{IndexValue, SequentialIndexAllocator};

fn column(cells: &[&str]) -> Option<Vec<Vec<String>>> {
    Some(cells.iter().map(|cell| vec![cell.to_string()]).collect())
}

fn test_empty_store() {
    println!("\n====== Testing allocation against an empty store ======");

    let mut allocator = SequentialIndexAllocator::new();

    let first = allocator.next_index("X", None, || column(&[]));
    assert_eq!(first, IndexValue::Number(1));
    println!("✓ Empty store starts at 1");

    // The second call must not re-scan; the watermark drives it.
    let second = allocator.next_index("X", None, || panic!("scan should not run"));
    assert_eq!(second, IndexValue::Number(2));
    println!("✓ Second call increments the session watermark");
}

fn test_scan_existing_rows() {
    println!("\n====== Testing scan of existing rows ======");

    let mut allocator = SequentialIndexAllocator::new();

    let next = allocator.next_index("Invoices", None, || {
        column(&["3", "7", "unpaid", "", " 5 "])
    });
    assert_eq!(next, IndexValue::Number(8));
    println!("✓ Non-numeric and blank cells are ignored, max + 1 wins");

    assert_eq!(allocator.last_allocated("invoices"), Some(8));
    println!("✓ Watermark lookup is case-insensitive");
}

fn test_explicit_values() {
    println!("\n====== Testing explicit values ======");

    let mut allocator = SequentialIndexAllocator::new();

    let value = allocator.next_index("X", Some("42"), || panic!("scan should not run"));
    assert_eq!(value, IndexValue::Number(42));
    println!("✓ Explicit numeric value returns as a number");

    let next = allocator.next_index("X", None, || panic!("scan should not run"));
    assert_eq!(next, IndexValue::Number(43));
    println!("✓ Next implicit call never duplicates the explicit value");

    // A lower explicit value must not pull the watermark backwards.
    let value = allocator.next_index("X", Some("10"), || panic!("scan should not run"));
    assert_eq!(value, IndexValue::Number(10));
    let next = allocator.next_index("X", None, || panic!("scan should not run"));
    assert_eq!(next, IndexValue::Number(44));
    println!("✓ Lower explicit value leaves the watermark alone");

    let value = allocator.next_index("X", Some("INV-2024-07"), || panic!("scan should not run"));
    assert_eq!(value, IndexValue::Raw("INV-2024-07".to_string()));
    assert_eq!(value.as_cell(), "INV-2024-07");
    let next = allocator.next_index("X", None, || panic!("scan should not run"));
    assert_eq!(next, IndexValue::Number(45));
    println!("✓ Non-numeric explicit value passes through untouched");

    // Blank explicit values fall back to implicit allocation.
    let mut allocator = SequentialIndexAllocator::new();
    let value = allocator.next_index("Y", Some("  "), || column(&["9"]));
    assert_eq!(value, IndexValue::Number(10));
    println!("✓ Blank explicit value allocates implicitly");
}

fn test_degraded_scan() {
    println!("\n====== Testing degraded mode ======");

    let mut allocator = SequentialIndexAllocator::new();

    let value = allocator.next_index("Expenses", None, || None);
    assert_eq!(value, IndexValue::Number(1));
    println!("✓ Unreadable index column defaults to 1");

    let next = allocator.next_index("Expenses", None, || None);
    assert_eq!(next, IndexValue::Number(2));
    println!("✓ Degraded default is cached like a normal allocation");
}

fn test_reserve_block() {
    println!("\n====== Testing block reservation ======");

    let mut allocator = SequentialIndexAllocator::new();

    let base = allocator.reserve_block("Invoices", 3, || column(&["7", "2"]));
    assert_eq!(base, 8);
    assert_eq!(allocator.last_allocated("Invoices"), Some(10));
    println!("✓ Block of 3 above max 7 reserves 8, 9, 10");

    let next = allocator.next_index("Invoices", None, || panic!("scan should not run"));
    assert_eq!(next, IndexValue::Number(11));
    println!("✓ Allocation continues past the reserved block");

    let base = allocator.reserve_block("Bundles", 1, || column(&[]));
    assert_eq!(base, 1);
    assert_eq!(allocator.last_allocated("Bundles"), Some(1));
    println!("✓ Single-item block behaves like a plain allocation");
}

fn test_independent_datasets() {
    println!("\n====== Testing dataset isolation ======");

    let mut allocator = SequentialIndexAllocator::new();

    let a = allocator.next_index("Invoices", None, || column(&["4"]));
    let b = allocator.next_index("Expenses", None, || column(&["90"]));
    assert_eq!(a, IndexValue::Number(5));
    assert_eq!(b, IndexValue::Number(91));
    println!("✓ Watermarks are independent per dataset");
}

fn main() {
    println!("Running allocator tests...");

    test_empty_store();
    test_scan_existing_rows();
    test_explicit_values();
    test_degraded_scan();
    test_reserve_block();
    test_independent_datasets();

    println!("\nAll allocator tests passed!");
}
