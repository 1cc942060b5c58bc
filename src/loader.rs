use crate::config::{ColumnAliases, ReportConfig};
use crate::error::{ReportError, Result};
use crate::types::{ClosureClass, InstallClass, RawRow, WorkOrder};
use crate::util::{
    excel_serial_to_date, format_day, normalize_name, parse_code_safe, parse_date_safe,
};
use calamine::{open_workbook_auto, Data, Reader};
use chrono::Datelike;
use csv::ReaderBuilder;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Raw rows as read from a source, plus the number of records the source
/// could not decode at all.
#[derive(Debug, Clone, Default)]
pub struct RawBatch {
    pub rows: Vec<RawRow>,
    pub unreadable: usize,
}

/// Anything that can hand over the full set of raw rows in one go.
pub trait RowSource {
    fn read(&self) -> Result<RawBatch>;

    fn describe(&self) -> String;
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct LoadReport {
    pub total_rows: usize,
    pub unreadable_rows: usize,
    pub rejected_date: usize,
    pub rejected_technician: usize,
    pub unmapped_department: usize,
    pub accepted: usize,
}

impl LoadReport {
    pub fn rejected(&self) -> usize {
        self.unreadable_rows + self.rejected_date + self.rejected_technician
    }
}

/// Why a single row was left out of the working set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowRejected {
    MissingDate,
    InvalidDate,
    MissingTechnician,
}

/// Clean one raw row into a [`WorkOrder`].
///
/// - The date is read day-first; missing or impossible dates reject the row.
/// - The technician name is trimmed, collapsed and upper-cased; a blank name
///   rejects the row.
/// - Installation type and closure reason are compared verbatim with the
///   configured FTTH label and completion code.
/// - Unknown department codes keep the row with no label.
pub fn normalize_row(
    row: &RawRow,
    config: &ReportConfig,
) -> std::result::Result<WorkOrder, RowRejected> {
    let date_text = row.execution_date.as_deref().map(str::trim).unwrap_or("");
    if date_text.is_empty() {
        return Err(RowRejected::MissingDate);
    }
    let execution_date = parse_date_safe(Some(date_text)).ok_or(RowRejected::InvalidDate)?;

    let technician = normalize_name(row.technician.as_deref().unwrap_or(""));
    if technician.is_empty() {
        return Err(RowRejected::MissingTechnician);
    }

    // Classification compares the values exactly as written in the source.
    let installation_type = row.installation_type.clone().unwrap_or_default();
    let closure_reason = row.closure_reason.clone().unwrap_or_default();
    let department_code = parse_code_safe(row.department_code.as_deref());
    let department = department_code
        .and_then(|code| config.department_label(code))
        .map(str::to_string);

    let install_class = if config.is_ftth(&installation_type) {
        InstallClass::Ftth
    } else {
        InstallClass::Other
    };
    let closure_class = if config.is_completed(&closure_reason) {
        ClosureClass::Completed
    } else {
        ClosureClass::NotCompleted
    };

    Ok(WorkOrder {
        month_name: config.month_name(execution_date.month()).to_string(),
        execution_date,
        technician,
        installation_type,
        closure_reason,
        department_code,
        department,
        install_class,
        closure_class,
    })
}

/// Read every row from `source` and keep the ones that normalize.
///
/// Dropped rows are logged at debug level and counted per reason in the
/// returned [`LoadReport`]. Only source-level failures (unreadable file,
/// missing column) are errors.
pub fn load_and_clean(
    source: &dyn RowSource,
    config: &ReportConfig,
) -> Result<(Vec<WorkOrder>, LoadReport)> {
    let batch = source.read()?;
    let mut report = LoadReport {
        total_rows: batch.rows.len() + batch.unreadable,
        unreadable_rows: batch.unreadable,
        ..LoadReport::default()
    };

    let mut orders = Vec::with_capacity(batch.rows.len());
    for (idx, row) in batch.rows.iter().enumerate() {
        match normalize_row(row, config) {
            Ok(order) => {
                if order.department.is_none() {
                    report.unmapped_department += 1;
                }
                orders.push(order);
            }
            Err(reason) => {
                debug!(row = idx + 1, ?reason, "row dropped");
                match reason {
                    RowRejected::MissingDate | RowRejected::InvalidDate => {
                        report.rejected_date += 1
                    }
                    RowRejected::MissingTechnician => report.rejected_technician += 1,
                }
            }
        }
    }
    report.accepted = orders.len();

    info!(
        source = %source.describe(),
        total = report.total_rows,
        accepted = report.accepted,
        rejected = report.rejected(),
        unmapped_department = report.unmapped_department,
        "work orders loaded"
    );
    Ok((orders, report))
}

/// Pick a source implementation from the file extension.
///
/// `.csv` and `.txt` go through [`CsvSource`]; `.xlsx`, `.xlsm`, `.xls` and
/// `.ods` through [`ExcelSource`]. Anything else is `UnsupportedFormat`.
pub fn source_for_path(path: &Path, config: &ReportConfig) -> Result<Box<dyn RowSource>> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();
    match ext.as_str() {
        "csv" | "txt" => Ok(Box::new(CsvSource::new(path, config))),
        "xlsx" | "xlsm" | "xls" | "ods" => Ok(Box::new(ExcelSource::new(path, config))),
        _ => Err(ReportError::UnsupportedFormat(ext)),
    }
}

pub fn load_path(path: &Path, config: &ReportConfig) -> Result<(Vec<WorkOrder>, LoadReport)> {
    let source = source_for_path(path, config)?;
    load_and_clean(source.as_ref(), config)
}

// ---------------------------------------------------------------------------
// Header resolution
// ---------------------------------------------------------------------------

fn header_key(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Column positions of the five canonical fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct HeaderIndex {
    execution_date: usize,
    technician: usize,
    installation_type: usize,
    closure_reason: usize,
    department_code: usize,
}

impl HeaderIndex {
    fn resolve(headers: &[String], aliases: &ColumnAliases) -> Result<Self> {
        let keys: Vec<String> = headers.iter().map(|h| header_key(h)).collect();
        let find = |field: &str, names: &[String]| -> Result<usize> {
            names
                .iter()
                .find_map(|name| {
                    let wanted = header_key(name);
                    keys.iter().position(|k| *k == wanted)
                })
                .ok_or_else(|| ReportError::MissingColumn(field.to_string()))
        };
        Ok(Self {
            execution_date: find("execution_date", &aliases.execution_date)?,
            technician: find("technician", &aliases.technician)?,
            installation_type: find("installation_type", &aliases.installation_type)?,
            closure_reason: find("closure_reason", &aliases.closure_reason)?,
            department_code: find("department_code", &aliases.department_code)?,
        })
    }

    /// Pick the five fields out of one record. Whitespace-only cells count
    /// as missing; other cells are kept verbatim.
    fn build<'a>(&self, cell: impl Fn(usize) -> Option<&'a str>) -> RawRow {
        let take = |i: usize| {
            cell(i)
                .filter(|v| !v.trim().is_empty())
                .map(str::to_string)
        };
        RawRow {
            execution_date: take(self.execution_date),
            technician: take(self.technician),
            installation_type: take(self.installation_type),
            closure_reason: take(self.closure_reason),
            department_code: take(self.department_code),
        }
    }
}

fn is_blank(row: &RawRow) -> bool {
    *row == RawRow::default()
}

// ---------------------------------------------------------------------------
// CSV
// ---------------------------------------------------------------------------

/// Delimited text file with a header row.
///
/// The separator comes from the config or is sniffed from the header line
/// (`;` when it outnumbers `,`). A UTF-8 BOM is stripped, all-blank rows are
/// skipped and records the CSV reader cannot decode are counted as
/// unreadable.
pub struct CsvSource {
    path: PathBuf,
    aliases: ColumnAliases,
    delimiter: Option<u8>,
}

impl CsvSource {
    pub fn new(path: &Path, config: &ReportConfig) -> Self {
        Self {
            path: path.to_path_buf(),
            aliases: config.columns.clone(),
            delimiter: config.delimiter.and_then(|c| u8::try_from(c).ok()),
        }
    }

    fn sniff_delimiter(&self) -> Result<u8> {
        if let Some(d) = self.delimiter {
            return Ok(d);
        }
        let content = std::fs::read(&self.path)
            .map_err(|e| ReportError::unavailable(self.path.display().to_string(), e))?;
        let first_line = content.split(|b| *b == b'\n').next().unwrap_or(&[]);
        let semis = first_line.iter().filter(|b| **b == b';').count();
        let commas = first_line.iter().filter(|b| **b == b',').count();
        Ok(if semis > commas { b';' } else { b',' })
    }
}

impl RowSource for CsvSource {
    fn read(&self) -> Result<RawBatch> {
        let display = self.path.display().to_string();
        let delimiter = self.sniff_delimiter()?;
        let mut rdr = ReaderBuilder::new()
            .delimiter(delimiter)
            .flexible(true)
            .from_path(&self.path)
            .map_err(|e| ReportError::unavailable(&display, e))?;

        let headers: Vec<String> = rdr
            .headers()
            .map_err(|e| ReportError::unavailable(&display, e))?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').to_string())
            .collect();
        let index = HeaderIndex::resolve(&headers, &self.aliases)?;

        let mut batch = RawBatch::default();
        for result in rdr.records() {
            let record = match result {
                Ok(r) => r,
                Err(e) => {
                    debug!(error = %e, "unreadable CSV record");
                    batch.unreadable += 1;
                    continue;
                }
            };
            let row = index.build(|i| record.get(i));
            if !is_blank(&row) {
                batch.rows.push(row);
            }
        }
        Ok(batch)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

// ---------------------------------------------------------------------------
// Excel
// ---------------------------------------------------------------------------

/// First worksheet of an Excel/ODS workbook; the first row holds headers.
pub struct ExcelSource {
    path: PathBuf,
    aliases: ColumnAliases,
}

impl ExcelSource {
    pub fn new(path: &Path, config: &ReportConfig) -> Self {
        Self {
            path: path.to_path_buf(),
            aliases: config.columns.clone(),
        }
    }
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::DateTime(dt) => excel_serial_to_date(dt.as_f64())
            .map(format_day)
            .unwrap_or_default(),
        Data::Float(f) if f.fract() == 0.0 => format!("{}", *f as i64),
        other => other.to_string(),
    }
}

impl RowSource for ExcelSource {
    fn read(&self) -> Result<RawBatch> {
        let display = self.path.display().to_string();
        let mut workbook =
            open_workbook_auto(&self.path).map_err(|e| ReportError::unavailable(&display, e))?;
        let sheet = workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| ReportError::unavailable(&display, "workbook has no worksheets"))?;
        let range = workbook
            .worksheet_range(&sheet)
            .map_err(|e| ReportError::unavailable(&display, e))?;

        let mut rows = range.rows();
        let headers: Vec<String> = rows
            .next()
            .ok_or_else(|| ReportError::unavailable(&display, "worksheet is empty"))?
            .iter()
            .map(cell_text)
            .collect();
        let index = HeaderIndex::resolve(&headers, &self.aliases)?;

        let mut batch = RawBatch::default();
        for data_row in rows {
            let cells: Vec<String> = data_row.iter().map(cell_text).collect();
            let row = index.build(|i| cells.get(i).map(String::as_str));
            if !is_blank(&row) {
                batch.rows.push(row);
            }
        }
        Ok(batch)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

// ---------------------------------------------------------------------------
// In memory
// ---------------------------------------------------------------------------

/// Rows already held in memory, e.g. from a manual-entry form.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    pub rows: Vec<RawRow>,
}

impl MemorySource {
    pub fn new(rows: Vec<RawRow>) -> Self {
        Self { rows }
    }
}

impl RowSource for MemorySource {
    fn read(&self) -> Result<RawBatch> {
        Ok(RawBatch {
            rows: self.rows.clone(),
            unreadable: 0,
        })
    }

    fn describe(&self) -> String {
        format!("memory ({} rows)", self.rows.len())
    }
}
