// Option lists for the filter selectors.
use crate::config::ReportConfig;
use crate::types::{Dimension, WorkOrder};
use crate::util::format_day;
use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::collections::BTreeSet;

/// Sentinel shown first in every option list; selecting it means "no filter".
pub const ALL: &str = "Tutti";

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DimensionIndex {
    pub departments: Vec<String>,
    pub technicians: Vec<String>,
    /// Month names in calendar order.
    pub months: Vec<String>,
    pub days: Vec<NaiveDate>,
}

impl DimensionIndex {
    pub fn build(orders: &[WorkOrder], config: &ReportConfig) -> Self {
        let mut departments = BTreeSet::new();
        let mut technicians = BTreeSet::new();
        let mut months = BTreeSet::new();
        let mut days = BTreeSet::new();
        for o in orders {
            if let Some(d) = &o.department {
                departments.insert(d.clone());
            }
            technicians.insert(o.technician.clone());
            months.insert(o.execution_date.month());
            days.insert(o.execution_date);
        }
        Self {
            departments: departments.into_iter().collect(),
            technicians: technicians.into_iter().collect(),
            months: months
                .into_iter()
                .map(|m| config.month_name(m).to_string())
                .collect(),
            days: days.into_iter().collect(),
        }
    }

    /// Display values for one selector, prefixed with [`ALL`].
    pub fn options(&self, dim: Dimension) -> Vec<String> {
        let values: Vec<String> = match dim {
            Dimension::Department => self.departments.clone(),
            Dimension::Technician => self.technicians.clone(),
            Dimension::Month => self.months.clone(),
            Dimension::Day => self.days.iter().copied().map(format_day).collect(),
        };
        std::iter::once(ALL.to_string()).chain(values).collect()
    }
}
