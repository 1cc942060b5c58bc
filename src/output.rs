// Presenter and output sinks.
//
// `present` turns a `Report` into a `RenderedTable`: typed cells with a
// pass/fail tag on every defined rate. Sinks only read that structure.
use crate::config::ReportConfig;
use crate::error::Result;
use crate::reports::Report;
use crate::types::{AggregateRow, GroupKey, Grouping};
use crate::util::{completion_rate, format_day, format_int, format_percent};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tabled::builder::Builder;
use tabled::settings::object::Cell as TableCell;
use tabled::settings::{Color, Modify, Style};

pub const TOTAL_LABEL: &str = "TOTALE";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StyleTag {
    Pass,
    Fail,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum CellValue {
    Text(String),
    Count(usize),
    Percent(String),
    Blank,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cell {
    pub value: CellValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<StyleTag>,
}

impl Cell {
    fn text(s: impl Into<String>) -> Self {
        Cell {
            value: CellValue::Text(s.into()),
            style: None,
        }
    }

    fn count(n: usize) -> Self {
        Cell {
            value: CellValue::Count(n),
            style: None,
        }
    }

    fn blank() -> Self {
        Cell {
            value: CellValue::Blank,
            style: None,
        }
    }

    fn rate(rate: Option<f64>, threshold: f64) -> Self {
        match rate {
            Some(_) => Cell {
                value: CellValue::Percent(format_percent(rate)),
                style: classify(rate, threshold),
            },
            None => Cell::blank(),
        }
    }

    /// Plain text for files: counts without separators, blanks empty.
    pub fn plain(&self) -> String {
        match &self.value {
            CellValue::Text(s) | CellValue::Percent(s) => s.clone(),
            CellValue::Count(n) => n.to_string(),
            CellValue::Blank => String::new(),
        }
    }

    fn console(&self) -> String {
        match &self.value {
            CellValue::Count(n) => format_int(*n),
            _ => self.plain(),
        }
    }
}

/// Render-ready table: column labels plus rows of cells in the same order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl RenderedTable {
    pub fn cell(&self, row: usize, label: &str) -> Option<&Cell> {
        let col = self.columns.iter().position(|c| c == label)?;
        self.rows.get(row)?.get(col)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Pass at or above `threshold`; undefined rates are never classified.
/// The unrounded rate is compared, so 74.6% shows as "75%" but fails a 75
/// threshold.
pub fn classify(rate: Option<f64>, threshold: f64) -> Option<StyleTag> {
    rate.map(|r| {
        if r >= threshold {
            StyleTag::Pass
        } else {
            StyleTag::Fail
        }
    })
}

fn key_columns(grouping: Grouping) -> &'static [&'static str] {
    match grouping {
        Grouping::Technician => &["Tecnico"],
        Grouping::Day => &["Data"],
        Grouping::Month => &["Mese"],
        Grouping::Department => &["Reparto"],
        Grouping::DayTechnician => &["Data", "Tecnico"],
        Grouping::MonthTechnician => &["Mese", "Tecnico"],
    }
}

const FTTH_COLUMNS: [&str; 3] = ["FTTH Gestiti", "FTTH Espletati", "FTTH %"];
const OTHER_COLUMNS: [&str; 3] = ["Altro Gestiti", "Altro Espletati", "Altro %"];

fn key_cells(key: &GroupKey, config: &ReportConfig) -> Vec<Cell> {
    match key {
        GroupKey::Technician(t) | GroupKey::Department(t) => vec![Cell::text(t.as_str())],
        GroupKey::Day(d) => vec![Cell::text(format_day(*d))],
        GroupKey::Month(m) => vec![Cell::text(config.month_name(*m))],
        GroupKey::DayTechnician(d, t) => vec![Cell::text(format_day(*d)), Cell::text(t.as_str())],
        GroupKey::MonthTechnician(m, t) => {
            vec![Cell::text(config.month_name(*m)), Cell::text(t.as_str())]
        }
    }
}

fn metric_cells(
    counts: [usize; 4],
    rates: (Option<f64>, Option<f64>),
    show_ftth: bool,
    config: &ReportConfig,
) -> Vec<Cell> {
    let [handled_ftth, completed_ftth, handled_other, completed_other] = counts;
    let mut cells = Vec::with_capacity(6);
    if show_ftth {
        cells.push(Cell::count(handled_ftth));
        cells.push(Cell::count(completed_ftth));
        cells.push(Cell::rate(rates.0, config.thresholds.ftth));
    }
    cells.push(Cell::count(handled_other));
    cells.push(Cell::count(completed_other));
    cells.push(Cell::rate(rates.1, config.thresholds.other));
    cells
}

fn row_cells(row: &AggregateRow, show_ftth: bool, config: &ReportConfig) -> Vec<Cell> {
    let mut cells = key_cells(&row.key, config);
    cells.extend(metric_cells(
        [
            row.handled_ftth,
            row.completed_ftth,
            row.handled_other,
            row.completed_other,
        ],
        (row.rate_ftth, row.rate_other),
        show_ftth,
        config,
    ));
    cells
}

/// Build the table for `report`.
///
/// - Key columns come first, named after the grouping (`Tecnico`, `Data`,
///   `Mese`, `Reparto`); months show their Italian name, days `dd/mm/yyyy`.
/// - Then handled, completed and rate for FTTH, then the same for other
///   work. The three FTTH columns are left out when `report.show_ftth` is
///   false.
/// - Rate cells carry a pass/fail tag against their own threshold; an
///   undefined rate is a blank cell with no tag.
/// - With `totals`, a final `TOTALE` row sums the groups and recomputes the
///   rates from those sums. An empty report gets no totals row.
pub fn present(report: &Report, config: &ReportConfig, totals: bool) -> RenderedTable {
    let keys = key_columns(report.grouping);
    let mut columns: Vec<String> = keys.iter().map(|s| s.to_string()).collect();
    if report.show_ftth {
        columns.extend(FTTH_COLUMNS.iter().map(|s| s.to_string()));
    }
    columns.extend(OTHER_COLUMNS.iter().map(|s| s.to_string()));

    let mut rows: Vec<Vec<Cell>> = report
        .rows
        .iter()
        .map(|r| row_cells(r, report.show_ftth, config))
        .collect();

    if totals && !report.rows.is_empty() {
        let mut sums = [0usize; 4];
        for r in &report.rows {
            sums[0] += r.handled_ftth;
            sums[1] += r.completed_ftth;
            sums[2] += r.handled_other;
            sums[3] += r.completed_other;
        }
        let rates = (
            completion_rate(sums[1], sums[0]),
            completion_rate(sums[3], sums[2]),
        );
        let mut total = vec![Cell::text(TOTAL_LABEL)];
        total.extend((1..keys.len()).map(|_| Cell::blank()));
        total.extend(metric_cells(sums, rates, report.show_ftth, config));
        rows.push(total);
    }

    RenderedTable { columns, rows }
}

// ---------------------------------------------------------------------------
// Sinks
// ---------------------------------------------------------------------------

/// Consumer of a rendered table.
pub trait ReportSink {
    fn render(&mut self, title: &str, table: &RenderedTable) -> Result<()>;
}

/// Markdown table on stdout.
///
/// With `color`, passing rates are green and failing ones red; counts use
/// Italian thousands separators. `max_rows` truncates long tables and prints
/// the full row count underneath.
#[derive(Debug, Clone, Default)]
pub struct ConsoleSink {
    pub color: bool,
    pub max_rows: Option<usize>,
}

impl ConsoleSink {
    pub fn to_markdown(&self, table: &RenderedTable) -> String {
        let take = self.max_rows.unwrap_or(usize::MAX);
        let mut builder = Builder::default();
        builder.push_record(table.columns.iter().cloned());
        for row in table.rows.iter().take(take) {
            builder.push_record(row.iter().map(Cell::console));
        }
        let mut out = builder.build();
        out.with(Style::markdown());
        if self.color {
            for (r, row) in table.rows.iter().take(take).enumerate() {
                for (c, cell) in row.iter().enumerate() {
                    let color = match cell.style {
                        Some(StyleTag::Pass) => Color::FG_GREEN,
                        Some(StyleTag::Fail) => Color::FG_RED,
                        None => continue,
                    };
                    // Row 0 is the header.
                    out.with(Modify::new(TableCell::new(r + 1, c)).with(color));
                }
            }
        }
        out.to_string()
    }
}

impl ReportSink for ConsoleSink {
    fn render(&mut self, title: &str, table: &RenderedTable) -> Result<()> {
        println!("{}\n", title);
        if table.is_empty() {
            println!("(nessuna riga)\n");
            return Ok(());
        }
        println!("{}\n", self.to_markdown(table));
        if let Some(max) = self.max_rows {
            if table.rows.len() > max {
                println!("({} righe in totale)\n", format_int(table.rows.len()));
            }
        }
        Ok(())
    }
}

pub struct CsvSink {
    path: PathBuf,
}

impl CsvSink {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }
}

impl ReportSink for CsvSink {
    fn render(&mut self, _title: &str, table: &RenderedTable) -> Result<()> {
        let mut wtr = csv::Writer::from_path(&self.path)?;
        wtr.write_record(&table.columns)?;
        for row in &table.rows {
            wtr.write_record(row.iter().map(Cell::plain))?;
        }
        wtr.flush()?;
        Ok(())
    }
}

pub struct JsonSink {
    path: PathBuf,
}

impl JsonSink {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }
}

impl ReportSink for JsonSink {
    fn render(&mut self, title: &str, table: &RenderedTable) -> Result<()> {
        #[derive(Serialize)]
        struct Doc<'a> {
            title: &'a str,
            #[serde(flatten)]
            table: &'a RenderedTable,
        }
        write_json(&self.path, &Doc { title, table })
    }
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s)?;
    Ok(())
}
