/*!
# Sheetbook

A bookkeeping sync core that treats a hosted spreadsheet as its database.

## Overview

This project is the data layer of a browser-based invoicing and bookkeeping
tool. All durable state lives in a spreadsheet the user owns; this crate is
responsible for getting keyed records into and out of that spreadsheet
reliably. The interesting parts are the reconciliation routines: resolving
where each field goes from a user-editable column-index sheet, converting
between keyed records and positional rows, allocating sequential numeric
indexes by scanning existing data, and falling back to a local durable queue
when no access path to the spreadsheet works.

## Architecture

The crate composes four small pieces behind one gateway:

### Core Components
- **Column Index Registry** - Loads and validates the per-dataset mapping
  from field name to column position, with session caching and a centralized
  1-based-to-0-based normalization heuristic
- **Row Codec** - Pure conversion between keyed records and positional rows,
  with a canonical fallback header order per dataset when no mapping exists
- **Sequential Index Allocator** - Hands out the next integer for a dataset's
  index column, monotonic within a session even before writes land
- **Dataset Sync Gateway** - Runs every append through the same pipeline:
  allocate, map, encode, transmit, and enqueue locally on total failure

### Access Paths
Transports are tried in a fixed preference order: the direct
service-credential path, the same-origin append proxy, then the OAuth path.
The first transport that succeeds wins. Token acquisition is outside this
crate; transports are handed bearer tokens through configuration.

### Persistence Layer
- `database/config.json` for connection settings with environment overrides
- `database/pending.bin.gz` for the gzip-compressed FIFO of failed appends

## Datasets

Invoices, Expenses, Bundles and Contacts ship as built-in dataset
descriptions, each with its canonical column layout and a sequential index
field. Dataset names are matched case-insensitively everywhere.

## Limitations

Allocation state is per session. Two tabs or processes pointed at the same
spreadsheet can race and allocate the same index; the authoritative store is
only re-scanned when a session starts cold. A failed scan degrades to index 1
and is logged as a risk rather than raised as an error.

## Modules

- **record**: Record and dataset descriptions, name normalization
- **registry**: column-index loading, validation and caching
- **codec**: record to positional-row conversion and back
- **allocator**: sequential index allocation with session watermarks
- **transport**: access paths to the spreadsheet values API
- **queue**: durable FIFO of appends that could not be transmitted
- **config**: configuration file, environment overrides, transport wiring
- **gateway**: the composed append/read/flush operations
- **app**: static hosting and the CORS-safe append proxy (feature `web`)

## REST API Endpoints (feature `web`)

- `POST /api/append` - Append keyed records to a built-in dataset
- `POST /api/append_rows` - Append already-positional rows (the proxy path)
- `GET /api/records/{dataset}` - Read a dataset back as records
- `GET /api/pending` - Inspect the durable queue
- `POST /api/flush` - Retry queued appends
*/

pub mod allocator;
pub mod codec;
pub mod config;
pub mod gateway;
pub mod queue;
pub mod record;
pub mod registry;
pub mod transport;

#[cfg(feature = "web")]
pub mod app;

/// Re-export everything from these modules to make it easier to use
pub use allocator::*;
pub use codec::*;
pub use config::*;
pub use gateway::*;
pub use queue::*;
pub use record::*;
pub use registry::*;
pub use transport::*;
