// Immutable view of one load of the source, and a cache that reloads it when
// the file changes on disk.
use crate::config::ReportConfig;
use crate::dimensions::DimensionIndex;
use crate::error::{ReportError, Result};
use crate::filter::Filter;
use crate::loader::{load_path, LoadReport};
use crate::reports::{build_report, Report};
use crate::types::{Grouping, WorkOrder};
use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::SystemTime;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct Snapshot {
    pub orders: Vec<WorkOrder>,
    pub load: LoadReport,
    pub index: DimensionIndex,
}

impl Snapshot {
    pub fn new(orders: Vec<WorkOrder>, load: LoadReport, config: &ReportConfig) -> Self {
        let index = DimensionIndex::build(&orders, config);
        Self {
            orders,
            load,
            index,
        }
    }

    pub fn report(&self, filter: &Filter, grouping: Grouping, config: &ReportConfig) -> Report {
        build_report(&self.orders, filter, grouping, config)
    }

    /// Most recent execution date among the accepted orders, shown as
    /// "Dati aggiornati al". `None` when nothing was accepted.
    pub fn last_update(&self) -> Option<NaiveDate> {
        self.index.days.last().copied()
    }
}

/// Freshness token of the source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SourceStamp {
    modified: SystemTime,
    len: u64,
}

impl SourceStamp {
    fn read(path: &Path) -> Result<Self> {
        let meta = std::fs::metadata(path)
            .map_err(|e| ReportError::unavailable(path.display().to_string(), e))?;
        Ok(Self {
            modified: meta.modified()?,
            len: meta.len(),
        })
    }
}

pub struct SnapshotCache {
    path: PathBuf,
    config: ReportConfig,
    current: Option<(SourceStamp, Rc<Snapshot>)>,
}

impl SnapshotCache {
    pub fn new(path: &Path, config: ReportConfig) -> Self {
        Self {
            path: path.to_path_buf(),
            config,
            current: None,
        }
    }

    pub fn config(&self) -> &ReportConfig {
        &self.config
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current snapshot, reloading first if the file's modification time or
    /// size changed since the last load.
    pub fn get(&mut self) -> Result<Rc<Snapshot>> {
        let stamp = SourceStamp::read(&self.path)?;
        if let Some((cached, snap)) = &self.current {
            if *cached == stamp {
                debug!(path = %self.path.display(), "snapshot cache hit");
                return Ok(Rc::clone(snap));
            }
            info!(path = %self.path.display(), "source changed, reloading");
        }
        let (orders, load) = load_path(&self.path, &self.config)?;
        let snap = Rc::new(Snapshot::new(orders, load, &self.config));
        self.current = Some((stamp, Rc::clone(&snap)));
        Ok(snap)
    }

    /// Drop the cached snapshot; the next `get` reloads unconditionally.
    pub fn invalidate(&mut self) {
        self.current = None;
    }

    pub fn is_loaded(&self) -> bool {
        self.current.is_some()
    }
}
