use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One source row before cleaning. Every field is optional text; the
/// department code may arrive as `500100`, `500100.0` or blank.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawRow {
    pub execution_date: Option<String>,
    pub technician: Option<String>,
    pub installation_type: Option<String>,
    pub closure_reason: Option<String>,
    pub department_code: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum InstallClass {
    Ftth,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ClosureClass {
    Completed,
    NotCompleted,
}

/// Canonical work order. Always has a date and a non-empty technician.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkOrder {
    pub execution_date: NaiveDate,
    pub technician: String,
    pub installation_type: String,
    pub closure_reason: String,
    pub department_code: Option<i64>,
    pub department: Option<String>,
    pub month_name: String,
    pub install_class: InstallClass,
    pub closure_class: ClosureClass,
}

impl WorkOrder {
    pub fn is_ftth(&self) -> bool {
        self.install_class == InstallClass::Ftth
    }

    pub fn is_completed(&self) -> bool {
        self.closure_class == ClosureClass::Completed
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimension {
    Department,
    Technician,
    Month,
    Day,
}

/// What the aggregator partitions on. Two-dimension groupings sort by the
/// first dimension, then by technician.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Grouping {
    #[default]
    Technician,
    Day,
    Month,
    Department,
    DayTechnician,
    MonthTechnician,
}

impl Grouping {
    pub const ALL: [Grouping; 6] = [
        Grouping::Technician,
        Grouping::Day,
        Grouping::Month,
        Grouping::Department,
        Grouping::DayTechnician,
        Grouping::MonthTechnician,
    ];

    pub fn dimensions(self) -> &'static [Dimension] {
        match self {
            Grouping::Technician => &[Dimension::Technician],
            Grouping::Day => &[Dimension::Day],
            Grouping::Month => &[Dimension::Month],
            Grouping::Department => &[Dimension::Department],
            Grouping::DayTechnician => &[Dimension::Day, Dimension::Technician],
            Grouping::MonthTechnician => &[Dimension::Month, Dimension::Technician],
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Grouping::Technician => "technician",
            Grouping::Day => "day",
            Grouping::Month => "month",
            Grouping::Department => "department",
            Grouping::DayTechnician => "day-technician",
            Grouping::MonthTechnician => "month-technician",
        }
    }
}

impl fmt::Display for Grouping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Grouping {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
        Grouping::ALL
            .into_iter()
            .find(|g| g.as_str() == wanted)
            .ok_or_else(|| {
                let valid: Vec<&str> = Grouping::ALL.iter().map(|g| g.as_str()).collect();
                format!("unknown grouping '{s}' (expected one of: {})", valid.join(", "))
            })
    }
}

/// Group key of one aggregate row. The derived ordering gives chronological
/// days, calendar months and lexical names within a grouping.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum GroupKey {
    Technician(String),
    Day(NaiveDate),
    Month(u32),
    Department(String),
    DayTechnician(NaiveDate, String),
    MonthTechnician(u32, String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateRow {
    pub key: GroupKey,
    pub handled_ftth: usize,
    pub completed_ftth: usize,
    pub rate_ftth: Option<f64>,
    pub handled_other: usize,
    pub completed_other: usize,
    pub rate_other: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSummary {
    pub total_orders: usize,
    pub total_technicians: usize,
    pub handled_ftth: usize,
    pub completed_ftth: usize,
    pub rate_ftth: Option<f64>,
    pub handled_other: usize,
    pub completed_other: usize,
    pub rate_other: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grouping_parses_cli_spellings() {
        assert_eq!("technician".parse::<Grouping>(), Ok(Grouping::Technician));
        assert_eq!("Month_Technician".parse::<Grouping>(), Ok(Grouping::MonthTechnician));
        assert!("week".parse::<Grouping>().is_err());
    }

    #[test]
    fn group_keys_order_by_date_then_name() {
        let d1 = NaiveDate::from_ymd_opt(2025, 1, 2).unwrap();
        let d2 = NaiveDate::from_ymd_opt(2025, 1, 10).unwrap();
        let mut keys = vec![
            GroupKey::DayTechnician(d2, "ALFA".into()),
            GroupKey::DayTechnician(d1, "ZETA".into()),
            GroupKey::DayTechnician(d1, "BETA".into()),
        ];
        keys.sort();
        assert_eq!(
            keys,
            vec![
                GroupKey::DayTechnician(d1, "BETA".into()),
                GroupKey::DayTechnician(d1, "ZETA".into()),
                GroupKey::DayTechnician(d2, "ALFA".into()),
            ]
        );
    }
}
