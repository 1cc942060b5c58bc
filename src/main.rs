// Entry point and CLI flow.
//
// - `report` loads the file once, applies the selection and prints one table.
// - `options` prints the values available for each selector.
// - `menu` is the interactive loop: load the file, pick filters, generate the
//   report, then go back to the menu or exit. The file is reloaded only when
//   it changed on disk.
use clap::{Args, Parser, Subcommand};
use prod_report::dimensions::ALL;
use prod_report::output::{present, write_json, ConsoleSink, CsvSink, JsonSink, ReportSink};
use prod_report::types::Dimension;
use prod_report::util::{format_day, format_int};
use prod_report::{logging, Filter, Grouping, ReportConfig, Result, Snapshot, SnapshotCache};
use std::io::{self, Write};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "prod_report",
    version,
    about = "Technician production reports from work-order spreadsheets"
)]
struct Cli {
    /// Print debug diagnostics (every dropped row) to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct SourceArgs {
    /// Work-order file (.csv, .xlsx, .xls, .ods)
    #[arg(short, long)]
    input: PathBuf,

    /// JSON file overriding department codes, thresholds, month names...
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[derive(Args)]
struct SelectionArgs {
    #[arg(long)]
    department: Option<String>,
    #[arg(long)]
    technician: Option<String>,
    #[arg(long)]
    month: Option<String>,
    /// Day in dd/mm/yyyy form
    #[arg(long)]
    day: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print one production report
    Report {
        #[command(flatten)]
        source: SourceArgs,
        #[command(flatten)]
        selection: SelectionArgs,
        /// technician, day, month, department, day-technician, month-technician
        #[arg(long, default_value = "technician")]
        group_by: Grouping,
        /// Append a TOTALE row
        #[arg(long)]
        totals: bool,
        /// Also write the table as CSV
        #[arg(long)]
        csv: Option<PathBuf>,
        /// Also write the table as JSON
        #[arg(long)]
        json: Option<PathBuf>,
        /// Write overall counts and rates as JSON
        #[arg(long)]
        summary: Option<PathBuf>,
        #[arg(long)]
        no_color: bool,
    },
    /// List the selectable values of every filter
    Options {
        #[command(flatten)]
        source: SourceArgs,
    },
    /// Interactive menu
    Menu {
        #[command(flatten)]
        source: SourceArgs,
    },
}

fn load_config(path: Option<&PathBuf>) -> Result<ReportConfig> {
    match path {
        Some(p) => ReportConfig::load(p),
        None => Ok(ReportConfig::default()),
    }
}

/// Load outcome and data freshness, printed after every (re)load:
///
/// - rows read and rows kept, with Italian thousands separators;
/// - a breakdown of dropped rows when there are any;
/// - how many rows carry an unmapped customer code;
/// - the latest execution date ("Dati aggiornati al").
fn print_load_report(snapshot: &Snapshot) {
    let load = &snapshot.load;
    println!(
        "Elaborazione dataset... ({} righe lette, {} valide)",
        format_int(load.total_rows),
        format_int(load.accepted)
    );
    if load.rejected() > 0 {
        println!(
            "Nota: {} righe scartate (data non valida: {}, tecnico mancante: {}, illeggibili: {}).",
            format_int(load.rejected()),
            format_int(load.rejected_date),
            format_int(load.rejected_technician),
            format_int(load.unreadable_rows)
        );
    }
    if load.unmapped_department > 0 {
        println!(
            "Info: {} righe con codice cliente non mappato (visibili solo in \"{}\").",
            format_int(load.unmapped_department),
            ALL
        );
    }
    if let Some(day) = snapshot.last_update() {
        println!("Dati aggiornati al: {}", format_day(day));
    }
    println!();
}

fn report_title(grouping: Grouping, filter: &Filter) -> String {
    if filter.is_empty() {
        return format!("Produzione per {grouping} ({ALL})");
    }
    let mut parts = Vec::new();
    if let Some(d) = &filter.department {
        parts.push(format!("reparto {d}"));
    }
    if let Some(t) = &filter.technician {
        parts.push(format!("tecnico {t}"));
    }
    if let Some(m) = &filter.month {
        parts.push(format!("mese {m}"));
    }
    if let Some(d) = &filter.day {
        parts.push(format!("giorno {d}"));
    }
    format!("Produzione per {grouping} ({})", parts.join(", "))
}

fn run_report(
    source: SourceArgs,
    selection: SelectionArgs,
    group_by: Grouping,
    totals: bool,
    outputs: (Option<PathBuf>, Option<PathBuf>, Option<PathBuf>),
    color: bool,
) -> Result<()> {
    let config = load_config(source.config.as_ref())?;
    let filter = Filter::from_selections(
        selection.department.as_deref(),
        selection.technician.as_deref(),
        selection.month.as_deref(),
        selection.day.as_deref(),
        &config,
    );
    let mut cache = SnapshotCache::new(&source.input, config);
    let snapshot = cache.get()?;
    print_load_report(&snapshot);

    let config = cache.config();
    let report = snapshot.report(&filter, group_by, config);
    let table = present(&report, config, totals);
    let title = report_title(group_by, &filter);

    ConsoleSink {
        color,
        max_rows: None,
    }
    .render(&title, &table)?;

    let (csv, json, summary) = outputs;
    if let Some(path) = csv {
        CsvSink::new(&path).render(&title, &table)?;
        println!("(Tabella esportata in {})", path.display());
    }
    if let Some(path) = json {
        JsonSink::new(&path).render(&title, &table)?;
        println!("(Tabella esportata in {})", path.display());
    }
    if let Some(path) = summary {
        write_json(&path, &report.summary)?;
        println!("(Riepilogo esportato in {})", path.display());
    }
    Ok(())
}

fn print_options(snapshot: &Snapshot) {
    let dims = [
        ("Reparto", Dimension::Department),
        ("Tecnico", Dimension::Technician),
        ("Mese", Dimension::Month),
        ("Giorno", Dimension::Day),
    ];
    for (label, dim) in dims {
        println!("{label}: {}", snapshot.index.options(dim).join(" | "));
    }
    println!();
}

fn run_options(source: SourceArgs) -> Result<()> {
    let config = load_config(source.config.as_ref())?;
    let mut cache = SnapshotCache::new(&source.input, config);
    let snapshot = cache.get()?;
    print_load_report(&snapshot);
    print_options(&snapshot);
    Ok(())
}

// ---------------------------------------------------------------------------
// Interactive menu
// ---------------------------------------------------------------------------

/// Print `label` and read one trimmed line from stdin.
fn prompt(label: &str) -> String {
    print!("{label}");
    let _ = io::stdout().flush();
    let mut buf = String::new();
    // End of input closes the menu instead of spinning on empty answers.
    if matches!(io::stdin().read_line(&mut buf), Ok(0)) {
        println!();
        std::process::exit(0);
    }
    buf.trim().to_string()
}

fn read_choice() -> String {
    prompt("Scelta: ")
}

/// Ask whether to go back to the menu after a report. `true` for `S`.
fn prompt_back_to_menu() -> bool {
    loop {
        let resp = prompt("Tornare al menu? (S/N): ").to_uppercase();
        match resp.as_str() {
            "S" => return true,
            "N" => return false,
            _ => println!("Scelta non valida. Inserire S o N."),
        }
    }
}

/// Show the options of `dim` and read a selection; blank means all.
fn prompt_selection(snapshot: &Snapshot, label: &str, dim: Dimension) -> Option<String> {
    println!("{label}: {}", snapshot.index.options(dim).join(" | "));
    let v = prompt(&format!("{label} [{ALL}]: "));
    (!v.is_empty()).then_some(v)
}

fn handle_load(cache: &mut SnapshotCache) {
    cache.invalidate();
    match cache.get() {
        Ok(snapshot) => print_load_report(&snapshot),
        Err(e) => eprintln!("Caricamento fallito: {}\n", e),
    }
}

fn handle_generate_report(cache: &mut SnapshotCache) -> Result<()> {
    if !cache.is_loaded() {
        println!("Errore: nessun dato caricato. Caricare prima il file (opzione 1).\n");
        return Ok(());
    }
    let snapshot = cache.get()?;
    let department = prompt_selection(&snapshot, "Reparto", Dimension::Department);
    let technician = prompt_selection(&snapshot, "Tecnico", Dimension::Technician);
    let month = prompt_selection(&snapshot, "Mese", Dimension::Month);
    let day = prompt_selection(&snapshot, "Giorno", Dimension::Day);

    let names: Vec<&str> = Grouping::ALL.iter().map(|g| g.as_str()).collect();
    let grouping = loop {
        let v = prompt(&format!("Raggruppamento ({}) [technician]: ", names.join(", ")));
        if v.is_empty() {
            break Grouping::default();
        }
        match v.parse::<Grouping>() {
            Ok(g) => break g,
            Err(e) => println!("{e}"),
        }
    };

    let config = cache.config();
    let filter = Filter::from_selections(
        department.as_deref(),
        technician.as_deref(),
        month.as_deref(),
        day.as_deref(),
        config,
    );
    let report = snapshot.report(&filter, grouping, config);
    let table = present(&report, config, true);
    println!();
    ConsoleSink {
        color: true,
        max_rows: None,
    }
    .render(&report_title(grouping, &filter), &table)
}

fn run_menu(source: SourceArgs) -> Result<()> {
    let config = load_config(source.config.as_ref())?;
    let mut cache = SnapshotCache::new(&source.input, config);
    loop {
        println!("Report produzione tecnici ({})", cache.path().display());
        println!("[1] Carica il file");
        println!("[2] Genera report\n");
        match read_choice().as_str() {
            "1" => handle_load(&mut cache),
            "2" => {
                println!();
                if let Err(e) = handle_generate_report(&mut cache) {
                    eprintln!("Errore: {}\n", e);
                }
                if !prompt_back_to_menu() {
                    println!("Uscita dal programma.");
                    return Ok(());
                }
            }
            _ => println!("Scelta non valida. Inserire 1 o 2.\n"),
        }
    }
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let result = match cli.command {
        Commands::Report {
            source,
            selection,
            group_by,
            totals,
            csv,
            json,
            summary,
            no_color,
        } => run_report(
            source,
            selection,
            group_by,
            totals,
            (csv, json, summary),
            !no_color,
        ),
        Commands::Options { source } => run_options(source),
        Commands::Menu { source } => run_menu(source),
    };

    if let Err(e) = result {
        eprintln!("Errore: {e}");
        std::process::exit(1);
    }
}
