use log::warn;
use std::collections::HashMap;
use std::fmt;

use crate::record::normalize_name;

/// Value assigned to a dataset's index column.
///
/// Implicit allocation always produces a number. An explicit caller-supplied
/// value passes through as a number when it parses as one and as raw text
/// otherwise.
#[derive(Clone, Debug, PartialEq)]
pub enum IndexValue {
    Number(i64),
    Raw(String),
}

impl IndexValue {
    /// Cell representation of the value.
    pub fn as_cell(&self) -> String {
        match self {
            IndexValue::Number(n) => n.to_string(),
            IndexValue::Raw(s) => s.clone(),
        }
    }
}

impl fmt::Display for IndexValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexValue::Number(n) => write!(f, "{}", n),
            IndexValue::Raw(s) => write!(f, "{}", s),
        }
    }
}

/// Produces the next integer for a dataset's index column.
///
/// The allocator keeps a per-dataset watermark of the last value it handed
/// out, so allocation is monotonic within one session even when the backing
/// store has not yet reflected an earlier write. The watermark lives only as
/// long as the allocator; a fresh session re-scans the authoritative store.
/// Two independent sessions can still race and allocate the same index; that
/// limitation is accepted and documented rather than solved here.
pub struct SequentialIndexAllocator {
    last_allocated: HashMap<String, i64>,
}

impl Default for SequentialIndexAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl SequentialIndexAllocator {
    pub fn new() -> Self {
        SequentialIndexAllocator {
            last_allocated: HashMap::new(),
        }
    }

    /// Next index for a dataset.
    ///
    /// An explicit non-empty value bypasses allocation: a numeric value comes
    /// back as a number and also raises the watermark so later implicit calls
    /// never duplicate it, while a non-numeric value passes through untouched.
    ///
    /// Without an explicit value, a cached watermark is incremented and
    /// returned. On the first request of a session `scan` is invoked to read
    /// the existing index column; the next index is one past the largest
    /// numeric cell found, or 1 for an empty column. A failed scan degrades to
    /// 1 as well, which can collide with data written by other sessions, so it
    /// is logged loudly rather than treated as a normal success.
    pub fn next_index<F>(&mut self, dataset: &str, explicit: Option<&str>, scan: F) -> IndexValue
    where
        F: FnOnce() -> Option<Vec<Vec<String>>>,
    {
        if let Some(raw) = explicit {
            let trimmed = raw.trim();
            if !trimmed.is_empty() {
                return match trimmed.parse::<i64>() {
                    Ok(n) => {
                        let key = normalize_name(dataset);
                        self.last_allocated
                            .entry(key)
                            .and_modify(|last| *last = (*last).max(n))
                            .or_insert(n);
                        IndexValue::Number(n)
                    }
                    Err(_) => IndexValue::Raw(raw.to_string()),
                };
            }
        }

        IndexValue::Number(self.next_implicit(dataset, scan))
    }

    /// Reserve `count` consecutive indexes and return the first one.
    ///
    /// The caller assigns `base + i` to the i-th record of a batch; the
    /// watermark moves to the end of the block so a later call continues
    /// past it.
    pub fn reserve_block<F>(&mut self, dataset: &str, count: usize, scan: F) -> i64
    where
        F: FnOnce() -> Option<Vec<Vec<String>>>,
    {
        let base = self.next_implicit(dataset, scan);
        if count > 1 {
            self.last_allocated
                .insert(normalize_name(dataset), base + count as i64 - 1);
        }
        base
    }

    /// Watermark for a dataset, if one exists in this session.
    pub fn last_allocated(&self, dataset: &str) -> Option<i64> {
        self.last_allocated.get(&normalize_name(dataset)).copied()
    }

    fn next_implicit<F>(&mut self, dataset: &str, scan: F) -> i64
    where
        F: FnOnce() -> Option<Vec<Vec<String>>>,
    {
        let key = normalize_name(dataset);
        if let Some(last) = self.last_allocated.get_mut(&key) {
            *last += 1;
            return *last;
        }

        let next = match scan() {
            Some(rows) => rows
                .iter()
                .filter_map(|row| row.first())
                .filter_map(|cell| cell.trim().parse::<i64>().ok())
                .max()
                .map(|max| max + 1)
                .unwrap_or(1),
            None => {
                warn!(
                    "could not read index column for {}, defaulting to 1; \
                     duplicate indexes across sessions are possible",
                    dataset
                );
                1
            }
        };

        self.last_allocated.insert(key, next);
        next
    }
}
