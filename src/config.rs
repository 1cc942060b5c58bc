// Business constants used by the normalizer, the aggregator and the presenter.
//
// Every value can be overridden from a JSON file; missing keys fall back to
// the defaults below.
use crate::error::{ReportError, Result};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

pub const ITALIAN_MONTHS: [&str; 12] = [
    "Gennaio",
    "Febbraio",
    "Marzo",
    "Aprile",
    "Maggio",
    "Giugno",
    "Luglio",
    "Agosto",
    "Settembre",
    "Ottobre",
    "Novembre",
    "Dicembre",
];

pub const DEFAULT_DEPARTMENTS: [(i64, &str); 2] = [(500100, "OLO"), (400340, "TIM")];
pub const DEFAULT_COMPLETION_CODE: &str = "COMPLWR";
pub const DEFAULT_FTTH_LABEL: &str = "FTTH";
pub const DEFAULT_FTTH_THRESHOLD: f64 = 75.0;
pub const DEFAULT_OTHER_THRESHOLD: f64 = 70.0;

static BUILTIN: Lazy<ReportConfig> = Lazy::new(ReportConfig::default);

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub ftth: f64,
    pub other: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            ftth: DEFAULT_FTTH_THRESHOLD,
            other: DEFAULT_OTHER_THRESHOLD,
        }
    }
}

/// Accepted header names for each canonical source field.
///
/// - Matching ignores case and whitespace runs (`Data  Esec. Lavoro` matches
///   `data esec. lavoro`).
/// - Aliases are tried in order and the first one present in the header row
///   wins, so a sheet carrying both `Codice Cliente` and `Reparto` reads the
///   department code from `Codice Cliente`.
/// - The defaults cover the canonical field names and the Italian layouts of
///   the delivery workbook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnAliases {
    pub execution_date: Vec<String>,
    pub technician: Vec<String>,
    pub installation_type: Vec<String>,
    pub closure_reason: Vec<String>,
    pub department_code: Vec<String>,
}

fn names(v: &[&str]) -> Vec<String> {
    v.iter().map(|s| s.to_string()).collect()
}

impl Default for ColumnAliases {
    fn default() -> Self {
        Self {
            execution_date: names(&[
                "execution_date",
                "data esec. lavoro",
                "data esec lavoro",
                "data esecuzione",
                "data_esecuzione",
                "data chiusura",
                "data",
            ]),
            technician: names(&[
                "technician",
                "tecnico assegnato",
                "tecnico",
                "nome tecnico",
                "risorsa",
            ]),
            installation_type: names(&[
                "installation_type",
                "tipo impianto",
                "tipo_impianto",
                "tipologia",
                "tipo",
            ]),
            closure_reason: names(&[
                "closure_reason",
                "causale chiusura",
                "causale_chiusura",
                "causale",
            ]),
            department_code: names(&[
                "department_code",
                "codice cliente",
                "codice_cliente",
                "reparto",
                "cod reparto",
                "committente",
                "cliente",
            ]),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub departments: BTreeMap<i64, String>,
    pub completion_code: String,
    pub ftth_label: String,
    pub thresholds: Thresholds,
    pub month_names: Vec<String>,
    /// Departments that never handle FTTH work; selecting one of them drops
    /// the FTTH columns from the report.
    pub no_ftth_departments: Vec<String>,
    pub columns: ColumnAliases,
    /// CSV field separator; sniffed from the header line when unset.
    pub delimiter: Option<char>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            departments: DEFAULT_DEPARTMENTS
                .iter()
                .map(|(code, label)| (*code, label.to_string()))
                .collect(),
            completion_code: DEFAULT_COMPLETION_CODE.to_string(),
            ftth_label: DEFAULT_FTTH_LABEL.to_string(),
            thresholds: Thresholds::default(),
            month_names: names(&ITALIAN_MONTHS),
            no_ftth_departments: vec!["OLO".to_string()],
            columns: ColumnAliases::default(),
            delimiter: None,
        }
    }
}

impl ReportConfig {
    /// Shared default configuration.
    pub fn builtin() -> &'static ReportConfig {
        &BUILTIN
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ReportError::Config(format!("{}: {e}", path.display())))?;
        let cfg: ReportConfig = serde_json::from_str(&content)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.month_names.len() != 12 {
            return Err(ReportError::Config(format!(
                "month_names must have 12 entries, found {}",
                self.month_names.len()
            )));
        }
        if self.completion_code.trim().is_empty() {
            return Err(ReportError::Config("completion_code is empty".into()));
        }
        if self.ftth_label.trim().is_empty() {
            return Err(ReportError::Config("ftth_label is empty".into()));
        }
        for (name, v) in [("ftth", self.thresholds.ftth), ("other", self.thresholds.other)] {
            if !(0.0..=100.0).contains(&v) {
                return Err(ReportError::Config(format!(
                    "threshold {name} must be within 0..=100, got {v}"
                )));
            }
        }
        Ok(())
    }

    pub fn department_label(&self, code: i64) -> Option<&str> {
        self.departments.get(&code).map(String::as_str)
    }

    /// Month name for a 1-based month number.
    pub fn month_name(&self, month: u32) -> &str {
        let idx = (month.clamp(1, 12) - 1) as usize;
        &self.month_names[idx]
    }

    /// 1-based month number for a configured month name, case-insensitive.
    pub fn month_number(&self, name: &str) -> Option<u32> {
        let name = name.trim();
        self.month_names
            .iter()
            .position(|m| m.eq_ignore_ascii_case(name))
            .map(|i| i as u32 + 1)
    }

    pub fn is_ftth(&self, installation_type: &str) -> bool {
        installation_type == self.ftth_label
    }

    pub fn is_completed(&self, closure_reason: &str) -> bool {
        closure_reason == self.completion_code
    }

    pub fn hides_ftth(&self, department: &str) -> bool {
        self.no_ftth_departments.iter().any(|d| d == department)
    }
}
