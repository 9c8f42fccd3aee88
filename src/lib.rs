/*!
# Sheetlink

A typed access layer over a remote spreadsheet service (Google Sheets v4),
built in Rust.

## Overview

The crate presents a remote spreadsheet document as three nested
abstractions:

- **Workbook** - one document, bound by URL or key. Owns the connection.
- **Worksheet** - one tab of a workbook. Borrows the workbook and keeps the
  dirty set of cells changed since the last flush.
- **Cell** - one `(row, column)` position. Borrows its worksheet; value and
  style setters register the change in the worksheet's dirty set.

Writes are deferred by default: assignments accumulate locally and
`Worksheet::flush_pending_changes` sends them as at most one value batch and
at most one formatting batch. An immediate policy, where each value
assignment is written at once, can be selected per workbook or through
`Config`.

## Architecture

### Access Layer
- **workbook**: document binding, worksheet lookup, add/delete
- **worksheet**: cell reads, row/column ranges, borders, dirty set and flush
- **cell**: per-cell value and style state

### Service Layer
- **client**: the `SheetsClient` trait, every remote operation the layer uses
- **google**: HTTPS implementation with service account authorization
- **memory**: in-process implementation that logs every request

### Support
- **a1**: A1 notation conversions
- **styles**: colors, fonts, alignment, borders
- **model**: wire types shared by the clients
- **credentials**: service account key loading from path, JSON or map
- **config**: endpoints, scopes, timeout and write policy, from the environment
- **error**: the `SheetError` type

## Usage

`Workbook::open` binds to a live document with a service account key (the
`google` feature, on by default). Any other `SheetsClient` works the same
way; here the in-process one:

```
use sheetlink::{Bounds, MemoryClient, ValueRenderOption, Workbook};

let client = MemoryClient::new();
client.add_document("1pzCWLj0Azskd8LVggQ", "Budget");
client.add_sheet("1pzCWLj0Azskd8LVggQ", "Sheet1", 10, 4)?;

let workbook = Workbook::with_client(
    "https://docs.google.com/spreadsheets/d/1pzCWLj0Azskd8LVggQ/edit",
    client.clone(),
)?;
let sheet = workbook.worksheet("Sheet1")?;

let mut cell = sheet.cell("B2", ValueRenderOption::FormattedValue)?;
cell.set_value("hello")?;
cell.set_fill("yellow")?;
sheet.flush_pending_changes()?;

for row in sheet.iter_rows(Bounds::all().rows(1, 5))? {
    let line: Vec<String> = row.iter().map(|c| c.value().to_string()).collect();
    println!("{}", line.join("\t"));
}
# Ok::<(), sheetlink::SheetError>(())
```
*/

pub mod a1;
pub mod cell;
pub mod client;
pub mod config;
pub mod credentials;
pub mod error;
#[cfg(feature = "google")]
pub mod google;
pub mod memory;
pub mod model;
pub mod styles;
pub mod workbook;
pub mod worksheet;

/// Re-export the main types to make the crate easier to use
pub use a1::{a1_to_coordinates, column_index, column_letter, coordinates_to_a1};
pub use cell::Cell;
pub use client::SheetsClient;
pub use config::{Config, WritePolicy};
pub use credentials::{Credentials, ServiceAccountKey};
pub use error::{Result, SheetError};
#[cfg(feature = "google")]
pub use google::GoogleClient;
pub use memory::MemoryClient;
pub use model::{CellValue, ValueRenderOption};
pub use styles::{Border, BorderSide, BorderStyle, Color, Font, HorizontalAlign};
pub use workbook::{SheetSelector, SheetTarget, Workbook};
pub use worksheet::{Bounds, CellSelector, Worksheet};
