use log::{error, info, warn};

use crate::allocator::{IndexValue, SequentialIndexAllocator};
use crate::codec::{self, PositionalRow};
use crate::config::SheetConfig;
use crate::queue::{LocalDurableQueue, PendingAppend};
use crate::record::{DatasetSpec, Record};
use crate::registry::ColumnIndexRegistry;
use crate::transport::{Transport, append_with_fallback, read_with_fallback};

/// Options for one append call.
#[derive(Clone, Debug, Default)]
pub struct AppendOptions {
    /// Re-read the column-index sheet instead of using a cached mapping.
    pub force_mapping_refresh: bool,
}

/// Result of an append that did not hit a configuration error.
///
/// A batch that could not reach the spreadsheet through any transport is
/// parked in the durable queue and reported as `Enqueued`; that outcome is a
/// soft warning, not a failure the caller should abort on.
#[derive(Clone, Debug, PartialEq)]
pub enum AppendOutcome {
    Appended { rows_appended: usize },
    Enqueued { rows_enqueued: usize },
}

/// Result of draining the durable queue.
#[derive(Clone, Debug, PartialEq)]
pub struct FlushOutcome {
    pub flushed: usize,
    pub remaining: usize,
}

/// The dataset-facing operation every writing module goes through.
///
/// Owns the column-index registry, the sequential allocator, the ordered
/// transport list and the durable queue, and runs each append through the
/// same pipeline: allocate indexes, resolve the mapping, encode rows, try the
/// transports in order, enqueue on total failure.
pub struct DatasetSyncGateway {
    config: SheetConfig,
    transports: Vec<Box<dyn Transport>>,
    registry: ColumnIndexRegistry,
    allocator: SequentialIndexAllocator,
    queue: LocalDurableQueue,
}

impl DatasetSyncGateway {
    /// Build a gateway from explicit parts.
    ///
    /// # Errors
    /// Configuration errors only: an empty spreadsheet id or an empty
    /// transport list.
    pub fn new(
        config: SheetConfig,
        transports: Vec<Box<dyn Transport>>,
        queue: LocalDurableQueue,
    ) -> Result<Self, String> {
        if config.spreadsheet_id.trim().is_empty() {
            return Err("No spreadsheet id configured".to_string());
        }
        if transports.is_empty() {
            return Err("No transports configured".to_string());
        }

        Ok(DatasetSyncGateway {
            config,
            transports,
            registry: ColumnIndexRegistry::new(),
            allocator: SequentialIndexAllocator::new(),
            queue,
        })
    }

    /// Build a gateway from configuration, constructing the transport chain
    /// and loading the durable queue from disk.
    pub fn from_config(config: SheetConfig) -> Result<Self, String> {
        config.validate()?;
        let transports = config.build_transports()?;
        let queue = LocalDurableQueue::load(config.queue_path())
            .map_err(|e| format!("Failed to load pending queue: {}", e))?;
        Self::new(config, transports, queue)
    }

    pub fn config(&self) -> &SheetConfig {
        &self.config
    }

    /// Items currently parked in the durable queue.
    pub fn pending(&self) -> &[PendingAppend] {
        self.queue.items()
    }

    /// Column mapping for a dataset, loading it on first use.
    pub fn mapping_for(&mut self, spec: &DatasetSpec) -> crate::registry::ColumnMapping {
        self.registry.load(&spec.name, &self.transports, false)
    }

    /// Append a batch of records to a dataset.
    ///
    /// Records missing a value for the dataset's index field get sequential
    /// indexes in array order, starting one past the highest index already
    /// allocated or stored. Records that carry an explicit index keep it, and
    /// a numeric explicit index raises the allocation watermark so it is
    /// never handed out again this session.
    ///
    /// # Errors
    /// Configuration errors only. Transport exhaustion enqueues the rows and
    /// reports `Ok(AppendOutcome::Enqueued { .. })`.
    pub fn append_records(
        &mut self,
        spec: &DatasetSpec,
        mut records: Vec<Record>,
        opts: &AppendOptions,
    ) -> Result<AppendOutcome, String> {
        if records.is_empty() {
            return Ok(AppendOutcome::Appended { rows_appended: 0 });
        }

        if let Some(index_field) = spec.index_field.clone() {
            self.allocate_indexes(spec, &index_field, &mut records);
        }

        let mapping = self
            .registry
            .load(&spec.name, &self.transports, opts.force_mapping_refresh);

        let rows: Vec<PositionalRow> = records
            .iter()
            .map(|record| codec::encode(record, &mapping, &spec.fallback_headers))
            .collect();

        match append_with_fallback(&self.transports, &spec.name, &rows) {
            Ok(rows_appended) => {
                info!("appended {} rows to {}", rows_appended, spec.name);
                Ok(AppendOutcome::Appended { rows_appended })
            }
            Err(reason) => {
                warn!(
                    "append to {} failed, queueing {} rows locally: {}",
                    spec.name,
                    rows.len(),
                    reason
                );
                Ok(self.enqueue_rows(&spec.name, rows))
            }
        }
    }

    /// Append rows that are already positional, skipping allocation and
    /// encoding. This is the path the append proxy and the queue replay use.
    pub fn append_raw(&mut self, dataset: &str, rows: Vec<PositionalRow>) -> AppendOutcome {
        match append_with_fallback(&self.transports, dataset, &rows) {
            Ok(rows_appended) => AppendOutcome::Appended { rows_appended },
            Err(reason) => {
                warn!(
                    "append to {} failed, queueing {} rows locally: {}",
                    dataset,
                    rows.len(),
                    reason
                );
                self.enqueue_rows(dataset, rows)
            }
        }
    }

    /// Read a dataset back as records, decoding through the column mapping
    /// or the fallback header order.
    pub fn load_records(&mut self, spec: &DatasetSpec) -> Result<Vec<Record>, String> {
        let mapping = self.registry.load(&spec.name, &self.transports, false);
        let rows = read_with_fallback(&self.transports, &spec.data_range())?;
        Ok(rows
            .iter()
            .map(|row| codec::decode(row, &mapping, &spec.fallback_headers))
            .collect())
    }

    /// Retry queued appends oldest-first, removing only the ones that land.
    ///
    /// The drain stops at the first item that still fails, preserving FIFO
    /// order for the next attempt.
    pub fn flush_pending(&mut self) -> FlushOutcome {
        let mut flushed = 0;

        while let Some(item) = self.queue.front().cloned() {
            match append_with_fallback(&self.transports, &item.dataset, &item.rows) {
                Ok(_) => {
                    if let Err(e) = self.queue.remove(&item.id) {
                        error!("failed to persist queue after flush: {}", e);
                    }
                    flushed += 1;
                }
                Err(reason) => {
                    info!("flush stopped at {}: {}", item.dataset, reason);
                    break;
                }
            }
        }

        FlushOutcome {
            flushed,
            remaining: self.queue.len(),
        }
    }

    fn allocate_indexes(&mut self, spec: &DatasetSpec, index_field: &str, records: &mut [Record]) {
        let scan_range = spec.index_scan_range(self.registry.get_cached(&spec.name));
        let transports = &self.transports;
        let allocator = &mut self.allocator;

        // Explicit indexes first, so the watermark clears them before the
        // block for the implicit ones is reserved.
        for record in records.iter_mut() {
            if record.has_value(index_field) {
                let explicit = record.get(index_field).cloned().unwrap_or_default();
                let value = allocator.next_index(&spec.name, Some(&explicit), || {
                    read_with_fallback(transports, &scan_range).ok()
                });
                record.set(index_field, value.as_cell());
            }
        }

        let missing = records
            .iter()
            .filter(|record| !record.has_value(index_field))
            .count();
        if missing == 0 {
            return;
        }

        let base = allocator.reserve_block(&spec.name, missing, || {
            read_with_fallback(transports, &scan_range).ok()
        });

        let mut offset = 0;
        for record in records.iter_mut() {
            if !record.has_value(index_field) {
                record.set(index_field, IndexValue::Number(base + offset).as_cell());
                offset += 1;
            }
        }
    }

    fn enqueue_rows(&mut self, dataset: &str, rows: Vec<PositionalRow>) -> AppendOutcome {
        let rows_enqueued = rows.len();
        let item = PendingAppend::new(dataset, rows);
        if let Err(e) = self.queue.enqueue(item) {
            error!("failed to persist pending queue: {}", e);
        }
        AppendOutcome::Enqueued { rows_enqueued }
    }
}
