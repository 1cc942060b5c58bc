//! Production reports for field-service technicians.
//!
//! Work-order rows are cleaned into [`types::WorkOrder`]s, filtered with
//! [`filter::Filter`], grouped by [`reports::aggregate`] and turned into a
//! render-ready [`output::RenderedTable`] with pass/fail tagged rates.
pub mod config;
pub mod dimensions;
pub mod error;
pub mod filter;
pub mod loader;
pub mod logging;
pub mod output;
pub mod reports;
pub mod snapshot;
pub mod types;
pub mod util;

pub use config::ReportConfig;
pub use error::{ReportError, Result};
pub use filter::Filter;
pub use snapshot::{Snapshot, SnapshotCache};
pub use types::{AggregateRow, Grouping, WorkOrder};
