use crate::config::ReportConfig;
use crate::filter::Filter;
use crate::types::{AggregateRow, GroupKey, Grouping, ReportSummary, WorkOrder};
use crate::util::completion_rate;
use chrono::Datelike;
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

/// Aggregated report for one filter selection and grouping.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub grouping: Grouping,
    pub filter: Filter,
    pub rows: Vec<AggregateRow>,
    /// False when the selected department does not handle FTTH work; the
    /// FTTH columns are then left out of the rendered table.
    pub show_ftth: bool,
    pub summary: ReportSummary,
}

#[derive(Default)]
struct Acc {
    handled_ftth: usize,
    completed_ftth: usize,
    handled_other: usize,
    completed_other: usize,
}

impl Acc {
    fn add(&mut self, o: &WorkOrder) {
        let done = usize::from(o.is_completed());
        if o.is_ftth() {
            self.handled_ftth += 1;
            self.completed_ftth += done;
        } else {
            self.handled_other += 1;
            self.completed_other += done;
        }
    }

    fn into_row(self, key: GroupKey) -> AggregateRow {
        AggregateRow {
            key,
            rate_ftth: completion_rate(self.completed_ftth, self.handled_ftth),
            rate_other: completion_rate(self.completed_other, self.handled_other),
            handled_ftth: self.handled_ftth,
            completed_ftth: self.completed_ftth,
            handled_other: self.handled_other,
            completed_other: self.completed_other,
        }
    }
}

/// Key of `o` under `grouping`; `None` when the order has no value for a
/// grouped dimension (only possible for an unmapped department).
pub fn group_key(o: &WorkOrder, grouping: Grouping) -> Option<GroupKey> {
    let key = match grouping {
        Grouping::Technician => GroupKey::Technician(o.technician.clone()),
        Grouping::Day => GroupKey::Day(o.execution_date),
        Grouping::Month => GroupKey::Month(o.execution_date.month()),
        Grouping::Department => GroupKey::Department(o.department.clone()?),
        Grouping::DayTechnician => GroupKey::DayTechnician(o.execution_date, o.technician.clone()),
        Grouping::MonthTechnician => {
            GroupKey::MonthTechnician(o.execution_date.month(), o.technician.clone())
        }
    };
    Some(key)
}

/// One row per distinct key present in `orders`, in key order.
///
/// - FTTH and other work are counted separately within each group.
/// - A group with no FTTH (or no other) work still gets zero counts and an
///   undefined rate for that side.
/// - Orders without a key under `grouping` are skipped.
pub fn aggregate(orders: &[WorkOrder], grouping: Grouping) -> Vec<AggregateRow> {
    let mut map: BTreeMap<GroupKey, Acc> = BTreeMap::new();
    for o in orders {
        if let Some(key) = group_key(o, grouping) {
            map.entry(key).or_default().add(o);
        }
    }
    map.into_iter().map(|(key, acc)| acc.into_row(key)).collect()
}

pub fn generate_summary(orders: &[WorkOrder]) -> ReportSummary {
    let mut acc = Acc::default();
    for o in orders {
        acc.add(o);
    }
    let technicians: HashSet<&str> = orders.iter().map(|o| o.technician.as_str()).collect();
    ReportSummary {
        total_orders: orders.len(),
        total_technicians: technicians.len(),
        handled_ftth: acc.handled_ftth,
        completed_ftth: acc.completed_ftth,
        rate_ftth: completion_rate(acc.completed_ftth, acc.handled_ftth),
        handled_other: acc.handled_other,
        completed_other: acc.completed_other,
        rate_other: completion_rate(acc.completed_other, acc.handled_other),
    }
}

/// Filter, group and summarize. Pure: the same inputs always give the same
/// report.
pub fn build_report(
    orders: &[WorkOrder],
    filter: &Filter,
    grouping: Grouping,
    config: &ReportConfig,
) -> Report {
    let selected = filter.apply(orders);
    let show_ftth = !filter
        .department
        .as_deref()
        .is_some_and(|d| config.hides_ftth(d));
    if !show_ftth {
        debug!(department = ?filter.department, "FTTH columns suppressed");
    }
    let rows = aggregate(&selected, grouping);
    debug!(
        %grouping,
        matched = selected.len(),
        groups = rows.len(),
        "report aggregated"
    );
    Report {
        grouping,
        filter: filter.clone(),
        rows,
        show_ftth,
        summary: generate_summary(&selected),
    }
}
