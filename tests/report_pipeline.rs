use prod_report::output::{present, CellValue, StyleTag};
use prod_report::types::{Dimension, GroupKey};
use prod_report::util::format_day;
use prod_report::{Filter, Grouping, ReportConfig, SnapshotCache};
use std::io::Write;

const ORDERS: &str = "\
Data Esecuzione;Tecnico;Tipo Impianto;Causale Chiusura;Codice Cliente
01/01/2025;mario rossi ;FTTH;COMPLWR;500100
01/01/2025;MARIO ROSSI;FTTH;OTHER;500100
31/02/2025;MARIO ROSSI;FTTH;COMPLWR;500100
;LUIGI VERDI;FTTH;COMPLWR;400340
15/01/2025;luigi  verdi;FTTH;COMPLWR;400340
15/01/2025;Luigi Verdi;FTTH;COMPLWR;400340
15/01/2025;Luigi Verdi;FTTH;COMPLWR;400340
15/01/2025;Luigi Verdi;FTTH;KO;400340
03/02/2025;Luigi Verdi;RAME;COMPLWR;400340
03/02/2025;Anna Neri;RAME;KO;123456
";

fn cache() -> (tempfile::TempDir, SnapshotCache) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ordini.csv");
    let mut f = std::fs::File::create(&path).unwrap();
    f.write_all(ORDERS.as_bytes()).unwrap();
    let cache = SnapshotCache::new(&path, ReportConfig::default());
    (dir, cache)
}

#[test]
fn load_drops_invalid_rows_and_indexes_the_rest() {
    let (_dir, mut cache) = cache();
    let snap = cache.get().unwrap();

    assert_eq!(snap.load.total_rows, 10);
    assert_eq!(snap.load.accepted, 8);
    assert_eq!(snap.load.rejected_date, 2);
    assert_eq!(snap.load.unmapped_department, 1);

    assert_eq!(
        snap.index.options(Dimension::Technician),
        vec!["Tutti", "ANNA NERI", "LUIGI VERDI", "MARIO ROSSI"]
    );
    assert_eq!(
        snap.index.options(Dimension::Month),
        vec!["Tutti", "Gennaio", "Febbraio"]
    );
    assert_eq!(
        snap.index.options(Dimension::Day),
        vec!["Tutti", "01/01/2025", "15/01/2025", "03/02/2025"]
    );
    assert_eq!(snap.last_update().map(format_day).as_deref(), Some("03/02/2025"));
}

#[test]
fn olo_report_has_no_ftth_columns() {
    let (_dir, mut cache) = cache();
    let snap = cache.get().unwrap();
    let cfg = cache.config();

    let filter = Filter::from_selections(Some("OLO"), None, None, None, cfg);
    let report = snap.report(&filter, Grouping::Technician, cfg);
    assert_eq!(report.rows.len(), 1);
    assert_eq!(report.rows[0].key, GroupKey::Technician("MARIO ROSSI".into()));
    assert_eq!(report.rows[0].handled_ftth, 2);
    assert_eq!(report.rows[0].completed_ftth, 1);
    assert_eq!(report.rows[0].rate_ftth, Some(50.0));

    let table = present(&report, cfg, false);
    assert!(table.columns.iter().all(|c| !c.starts_with("FTTH")));
    assert_eq!(table.cell(0, "Altro Gestiti").unwrap().value, CellValue::Count(0));
    assert_eq!(table.cell(0, "Altro %").unwrap().value, CellValue::Blank);
}

#[test]
fn month_by_technician_report_with_styles() {
    let (_dir, mut cache) = cache();
    let snap = cache.get().unwrap();
    let cfg = cache.config();

    let report = snap.report(&Filter::default(), Grouping::MonthTechnician, cfg);
    let keys: Vec<GroupKey> = report.rows.iter().map(|r| r.key.clone()).collect();
    assert_eq!(
        keys,
        vec![
            GroupKey::MonthTechnician(1, "LUIGI VERDI".into()),
            GroupKey::MonthTechnician(1, "MARIO ROSSI".into()),
            GroupKey::MonthTechnician(2, "ANNA NERI".into()),
            GroupKey::MonthTechnician(2, "LUIGI VERDI".into()),
        ]
    );

    let table = present(&report, cfg, true);
    assert_eq!(table.cell(0, "Mese").unwrap().plain(), "Gennaio");
    // LUIGI VERDI in January: 3 of 4 FTTH jobs, exactly on the 75 threshold.
    let verdi = table.cell(0, "FTTH %").unwrap();
    assert_eq!(verdi.plain(), "75%");
    assert_eq!(verdi.style, Some(StyleTag::Pass));
    // MARIO ROSSI: 50% fails.
    assert_eq!(table.cell(1, "FTTH %").unwrap().style, Some(StyleTag::Fail));
    // ANNA NERI did no FTTH work: blank, untagged.
    let neri = table.cell(2, "FTTH %").unwrap();
    assert_eq!(neri.value, CellValue::Blank);
    assert_eq!(neri.style, None);

    let total = table.rows.len() - 1;
    assert_eq!(table.cell(total, "Mese").unwrap().plain(), "TOTALE");
    assert_eq!(table.cell(total, "FTTH Gestiti").unwrap().value, CellValue::Count(6));
    assert_eq!(table.cell(total, "Altro Gestiti").unwrap().value, CellValue::Count(2));
    assert_eq!(table.cell(total, "Altro %").unwrap().plain(), "50%");
}

#[test]
fn unmapped_department_only_counts_in_all_view() {
    let (_dir, mut cache) = cache();
    let snap = cache.get().unwrap();
    let cfg = cache.config();

    let all = snap.report(&Filter::default(), Grouping::Technician, cfg);
    assert!(all
        .rows
        .iter()
        .any(|r| r.key == GroupKey::Technician("ANNA NERI".into())));

    for dept in ["OLO", "TIM"] {
        let filter = Filter::default().with_department(dept);
        let scoped = snap.report(&filter, Grouping::Technician, cfg);
        assert!(scoped
            .rows
            .iter()
            .all(|r| r.key != GroupKey::Technician("ANNA NERI".into())));
    }
}
