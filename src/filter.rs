use crate::config::ReportConfig;
use crate::dimensions::ALL;
use crate::types::WorkOrder;
use crate::util::{format_day, normalize_name, parse_date_safe};
use chrono::NaiveDate;
use std::fmt;

/// Day constraint of a [`Filter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DaySelection {
    On(NaiveDate),
    /// Selector text that is not a date. No order has such a day, so the
    /// filter keeps nothing.
    Unrecognized(String),
}

impl fmt::Display for DaySelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DaySelection::On(d) => f.write_str(&format_day(*d)),
            DaySelection::Unrecognized(text) => f.write_str(text),
        }
    }
}

/// Equality filters, one per dimension. `None` leaves the dimension
/// unconstrained; active filters are combined with AND.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    pub department: Option<String>,
    pub technician: Option<String>,
    pub month: Option<String>,
    pub day: Option<DaySelection>,
}

fn selected(value: Option<&str>) -> Option<&str> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case(ALL))
}

impl Filter {
    /// Build a filter from selector text.
    ///
    /// - The [`ALL`] sentinel (any case) and blanks leave a dimension open.
    /// - Technician names are normalized like the source rows.
    /// - Month names match the configured table case-insensitively and are
    ///   stored in its spelling; unknown names are kept as typed.
    /// - Days are read day-first (`05/01/2025`); text that is not a date
    ///   becomes [`DaySelection::Unrecognized`].
    ///
    /// Never fails: a selection nobody matches is an empty result, not an
    /// error.
    pub fn from_selections(
        department: Option<&str>,
        technician: Option<&str>,
        month: Option<&str>,
        day: Option<&str>,
        config: &ReportConfig,
    ) -> Self {
        Self {
            department: selected(department).map(str::to_string),
            technician: selected(technician).map(normalize_name),
            month: selected(month).map(|m| match config.month_number(m) {
                Some(n) => config.month_name(n).to_string(),
                None => m.to_string(),
            }),
            day: selected(day).map(|text| match parse_date_safe(Some(text)) {
                Some(d) => DaySelection::On(d),
                None => DaySelection::Unrecognized(text.to_string()),
            }),
        }
    }

    pub fn with_department(mut self, v: &str) -> Self {
        self.department = Some(v.to_string());
        self
    }

    pub fn with_technician(mut self, v: &str) -> Self {
        self.technician = Some(v.to_string());
        self
    }

    pub fn with_month(mut self, v: &str) -> Self {
        self.month = Some(v.to_string());
        self
    }

    pub fn with_day(mut self, v: NaiveDate) -> Self {
        self.day = Some(DaySelection::On(v));
        self
    }

    /// True when no dimension is constrained.
    pub fn is_empty(&self) -> bool {
        *self == Filter::default()
    }

    pub fn matches(&self, o: &WorkOrder) -> bool {
        // A row without a department label never satisfies a department filter.
        if let Some(d) = &self.department {
            if o.department.as_deref() != Some(d.as_str()) {
                return false;
            }
        }
        if let Some(t) = &self.technician {
            if &o.technician != t {
                return false;
            }
        }
        if let Some(m) = &self.month {
            if &o.month_name != m {
                return false;
            }
        }
        match &self.day {
            Some(DaySelection::On(day)) if o.execution_date != *day => return false,
            Some(DaySelection::Unrecognized(_)) => return false,
            _ => {}
        }
        true
    }

    pub fn apply(&self, orders: &[WorkOrder]) -> Vec<WorkOrder> {
        orders.iter().filter(|o| self.matches(o)).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::normalize_row;
    use crate::types::RawRow;

    fn order(date: &str, tech: &str, dept: &str) -> WorkOrder {
        let raw = RawRow {
            execution_date: Some(date.into()),
            technician: Some(tech.into()),
            installation_type: Some("FTTH".into()),
            closure_reason: Some("COMPLWR".into()),
            department_code: Some(dept.into()),
        };
        normalize_row(&raw, &ReportConfig::default()).unwrap()
    }

    fn sample() -> Vec<WorkOrder> {
        vec![
            order("05/01/2025", "ROSSI", "500100"),
            order("06/01/2025", "VERDI", "400340"),
            order("07/02/2025", "ROSSI", "400340"),
            order("08/02/2025", "BIANCHI", "123"),
            order("05/01/2025", "ROSSI", "400340"),
        ]
    }

    #[test]
    fn no_selection_keeps_everything() {
        let f = Filter::from_selections(
            Some("Tutti"),
            Some(""),
            None,
            Some("tutti"),
            ReportConfig::builtin(),
        );
        assert!(f.is_empty());
        assert_eq!(f.apply(&sample()).len(), 5);
    }

    #[test]
    fn filters_are_conjunctive_and_order_free() {
        let data = sample();
        let both = Filter::default().with_month("Gennaio").with_technician("ROSSI");
        let reversed = Filter::default().with_technician("ROSSI").with_month("Gennaio");
        assert_eq!(both.apply(&data), reversed.apply(&data));

        let by_month = Filter::default().with_month("Gennaio").apply(&data);
        let by_tech = Filter::default().with_technician("ROSSI").apply(&data);
        let intersection: Vec<WorkOrder> = by_month
            .iter()
            .filter(|o| by_tech.contains(o))
            .cloned()
            .collect();
        assert_eq!(both.apply(&data), intersection);
        assert_eq!(intersection.len(), 2);

        // Applying one filter after the other gives the same subset.
        let chained = Filter::default()
            .with_technician("ROSSI")
            .apply(&Filter::default().with_month("Gennaio").apply(&data));
        assert_eq!(chained, intersection);
    }

    #[test]
    fn department_filter_skips_unmapped_rows() {
        let data = sample();
        let tim = Filter::default().with_department("TIM").apply(&data);
        assert_eq!(tim.len(), 3);
        assert!(tim.iter().all(|o| o.department.as_deref() == Some("TIM")));
        assert!(!tim.iter().any(|o| o.technician == "BIANCHI"));
    }

    #[test]
    fn selections_are_normalized() {
        let f = Filter::from_selections(
            None,
            Some(" rossi "),
            Some("gennaio"),
            Some("05/01/2025"),
            ReportConfig::builtin(),
        );
        assert_eq!(f.technician.as_deref(), Some("ROSSI"));
        assert_eq!(f.month.as_deref(), Some("Gennaio"));
        assert_eq!(f.apply(&sample()).len(), 2);
    }

    #[test]
    fn unmatched_selection_is_an_empty_result() {
        let f = Filter::default().with_technician("NESSUNO");
        assert!(f.apply(&sample()).is_empty());
    }

    #[test]
    fn day_text_that_is_not_a_date_matches_nothing() {
        let f = Filter::from_selections(None, None, None, Some("ieri"), ReportConfig::builtin());
        assert_eq!(f.day, Some(DaySelection::Unrecognized("ieri".into())));
        assert!(!f.is_empty());
        assert!(f.apply(&sample()).is_empty());
    }

    #[test]
    fn day_selection_accepts_other_day_first_spellings() {
        let f = Filter::from_selections(None, None, None, Some("5-1-2025"), ReportConfig::builtin());
        assert_eq!(f.day.as_ref().map(ToString::to_string).as_deref(), Some("05/01/2025"));
        assert_eq!(f.apply(&sample()).len(), 2);
    }
}
