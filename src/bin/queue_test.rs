use sheetbook::queue::{LocalDurableQueue, PendingAppend};

fn rows(cells: &[&[&str]]) -> Vec<Vec<String>> {
    cells
        .iter()
        .map(|row| row.iter().map(|cell| cell.to_string()).collect())
        .collect()
}

fn test_starts_empty() {
    println!("\n====== Testing fresh queue ======");

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pending.bin.gz");

    let queue = LocalDurableQueue::load(&path).unwrap();
    assert!(queue.is_empty());
    assert_eq!(queue.len(), 0);
    assert!(queue.front().is_none());
    assert!(!path.exists());
    println!("✓ Missing file loads as an empty queue without creating it");
}

fn test_fifo_order_and_persistence() {
    println!("\n====== Testing FIFO order across a reload ======");

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pending.bin.gz");

    let first = PendingAppend::new("Invoices", rows(&[&["1", "Acme"]]));
    let second = PendingAppend::new("Expenses", rows(&[&["1", "2024-05-01"], &["2", "2024-05-02"]]));
    let first_id = first.id.clone();

    {
        let mut queue = LocalDurableQueue::load(&path).unwrap();
        queue.enqueue(first).unwrap();
        queue.enqueue(second).unwrap();
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.front().unwrap().dataset, "Invoices");
    }
    assert!(path.exists());
    println!("✓ Enqueue persists to disk");

    let mut queue = LocalDurableQueue::load(&path).unwrap();
    assert_eq!(queue.len(), 2);
    assert_eq!(queue.front().unwrap().dataset, "Invoices");
    assert_eq!(queue.items()[1].dataset, "Expenses");
    assert_eq!(queue.items()[1].rows.len(), 2);
    println!("✓ Contents and order survive a reload");

    assert!(queue.remove(&first_id).unwrap());
    assert_eq!(queue.front().unwrap().dataset, "Expenses");
    println!("✓ Removing the front promotes the next item");

    let queue = LocalDurableQueue::load(&path).unwrap();
    assert_eq!(queue.len(), 1);
    assert_eq!(queue.front().unwrap().dataset, "Expenses");
    println!("✓ Removal is persisted too");
}

fn test_remove_unknown_id() {
    println!("\n====== Testing removal of unknown ids ======");

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pending.bin.gz");

    let mut queue = LocalDurableQueue::load(&path).unwrap();
    queue
        .enqueue(PendingAppend::new("Bundles", rows(&[&["1"]])))
        .unwrap();

    assert!(!queue.remove("no-such-id").unwrap());
    assert_eq!(queue.len(), 1);
    println!("✓ Unknown id removes nothing and reports it");
}

fn test_item_metadata() {
    println!("\n====== Testing queued item metadata ======");

    let item = PendingAppend::new("Contacts", rows(&[&["1", "Maria"]]));
    assert!(!item.id.is_empty());
    assert!(!item.queued_at.is_empty());
    assert_eq!(item.dataset, "Contacts");

    let other = PendingAppend::new("Contacts", rows(&[&["1", "Maria"]]));
    assert_ne!(item.id, other.id);
    println!("✓ Items carry unique ids and a timestamp");
}

fn main() {
    println!("Running queue tests...");

    test_starts_empty();
    test_fifo_order_and_persistence();
    test_remove_unknown_id();
    test_item_metadata();

    println!("\nAll queue tests passed!");
}
