/*!
# Access Log Dashboard

Filter and summarize document-access events exported from a document
management system, built in Rust.

## Overview

The report export (an xlsx sheet, or its CSV equivalent) lists who opened,
downloaded or edited which document and when. This crate loads it once,
normalizes it and answers the questions a dashboard asks: which users,
actions and file types exist, what matches the current selection, and how
the matching events break down.

## Pipeline

1. **loader** - reads the sheet, maps the source headers
   (`Id. de usuario`, `Ocurrencia (GMT)`, `Evento`, `Tipo de elemento`,
   `Ubicación del documento`, `SourceFileName`) onto [`AccessEvent`] fields,
   drops rows without a timestamp and keeps only pdf, doc, docx, xls and xlsx
   documents
2. **dataset** - the immutable [`AccessLog`]
3. **facets** - option lists for the selection inputs
4. **filter** - [`FilterSpec`] turns the log into a [`FilteredView`]
5. **aggregate** - metrics, frequency tables and the daily series
6. **downloader** - CSV / XLSX export of the filtered table
7. **graph** - PNG charts (feature `charts`)
8. **app** - JSON/PNG HTTP endpoints (feature `web`)

## Example

```no_run
use access_dashboard::{FilterSpec, Summary, config::SourceConfig, loader};

let log = loader::load_access_log(&SourceConfig::default())?;
let view = FilterSpec::new().with_user("ana").apply(&log)?;
let summary = Summary::from_view(&view);
println!("{} accesses by {} users", summary.total, summary.unique_users);
# Ok::<(), access_dashboard::DashboardError>(())
```
*/

pub mod aggregate;
pub mod config;
pub mod dataset;
pub mod downloader;
pub mod error;
pub mod facets;
pub mod filter;
pub mod loader;
pub mod record;

#[cfg(feature = "charts")]
pub mod graph;

#[cfg(feature = "web")]
pub mod app;

/// Re-export the main types to make them easier to use
pub use aggregate::{DailyCount, FrequencyTable, Summary};
pub use dataset::AccessLog;
pub use error::DashboardError;
pub use facets::FacetOptions;
pub use filter::{FilterSpec, FilteredView};
pub use record::{AccessEvent, FileType, TableRow};

/// Banner shown above every report
pub const AUDIT_NOTICE: &str = "⚠️ Toda la actividad en este dashboard es monitoreada y registrada con fines de auditoría. Uso indebido puede ser sancionado. — Gerencia de Auditoría Externa de Sistemas";
