use access_dashboard::aggregate::{FrequencyTable, Summary};
use access_dashboard::config::DashboardConfig;
use access_dashboard::facets::FacetOptions;
use access_dashboard::filter::{FilterSpec, FilteredView};
use access_dashboard::record::FileType;
use access_dashboard::{AUDIT_NOTICE, AccessLog, DashboardError, downloader, loader};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "access-dashboard",
    version,
    about = "Filter and summarize document access logs"
)]
struct Cli {
    /// Optional TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Access log export (.xlsx or .csv)
    #[arg(long, global = true)]
    source: Option<PathBuf>,

    /// Sheet holding the report
    #[arg(long, global = true)]
    sheet: Option<String>,

    /// Zero-based row of the column headers
    #[arg(long, global = true)]
    header_row: Option<usize>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print metrics and breakdowns for the selection (default)
    Report {
        #[command(flatten)]
        filters: FilterArgs,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,

        /// Also print the matching rows
        #[arg(long)]
        rows: bool,
    },

    /// List the values available for each filter
    Facets {
        #[arg(long)]
        json: bool,
    },

    /// Write the matching rows to a .csv or .xlsx file
    Export {
        out: PathBuf,

        #[command(flatten)]
        filters: FilterArgs,
    },

    /// Render the dashboard charts as PNG files
    Charts {
        dir: PathBuf,

        #[command(flatten)]
        filters: FilterArgs,
    },
}

#[derive(Args, Debug, Default)]
struct FilterArgs {
    #[arg(long)]
    user: Option<String>,

    #[arg(long)]
    action: Option<String>,

    /// pdf, doc, docx, xls or xlsx
    #[arg(long)]
    file_type: Option<String>,

    /// Case-insensitive part of the file name
    #[arg(long)]
    search: Option<String>,

    /// Exact file name
    #[arg(long)]
    file: Option<String>,

    /// First day (YYYY-MM-DD), inclusive
    #[arg(long)]
    from: Option<NaiveDate>,

    /// Last day (YYYY-MM-DD), inclusive
    #[arg(long)]
    to: Option<NaiveDate>,
}

impl FilterArgs {
    fn to_spec(&self) -> Result<FilterSpec, DashboardError> {
        Ok(FilterSpec {
            user: self.user.clone(),
            action: self.action.clone(),
            file_type: self.file_type.as_deref().map(str::parse::<FileType>).transpose()?,
            file_name_contains: self.search.clone(),
            file_name: self.file.clone(),
            start_date: self.from,
            end_date: self.to,
        })
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = match &cli.config {
        Some(path) => DashboardConfig::from_file(path)?,
        None => DashboardConfig::default(),
    }
    .with_overrides(cli.source, cli.sheet, cli.header_row);

    let log = loader::load_access_log(&config.source)?;

    match cli.command.unwrap_or(Command::Report {
        filters: FilterArgs::default(),
        json: false,
        rows: false,
    }) {
        Command::Report {
            filters,
            json,
            rows,
        } => {
            let view = filters.to_spec()?.apply(&log)?;
            let summary = Summary::from_view(&view);
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print_report(&log, &summary);
            }
            if rows {
                print_rows(&view);
            }
        }
        Command::Facets { json } => {
            let facets = FacetOptions::from_log(&log);
            if json {
                println!("{}", serde_json::to_string_pretty(&facets)?);
            } else {
                print_facets(&facets);
            }
        }
        Command::Export { out, filters } => {
            let view = filters.to_spec()?.apply(&log)?;
            downloader::export_to_file(&view, &out)?;
            println!("Wrote {} rows to {}", view.len(), out.display());
        }
        Command::Charts { dir, filters } => {
            write_charts(&dir, &Summary::from_view(&filters.to_spec()?.apply(&log)?))?;
        }
    }

    Ok(())
}

fn print_report(log: &AccessLog, summary: &Summary) {
    println!("{AUDIT_NOTICE}\n");
    println!("Total de accesos: {}", summary.total);
    println!("Usuarios únicos:  {}", summary.unique_users);
    if log.has_file_names() {
        println!("Archivos únicos:  {}", summary.unique_files);
    } else {
        println!("Archivos únicos:  0 (sin columna de nombre de archivo)");
    }

    print_table("Accesos por tipo de archivo", &summary.by_file_type);
    print_table("Accesos por usuario", &summary.by_user);
    print_table("Acciones realizadas", &summary.by_action);

    println!("\nAccesos por día");
    if summary.daily.is_empty() {
        println!("  (sin datos)");
    }
    for day in &summary.daily {
        println!("  {}  {:>6}", day.date, day.count);
    }
}

fn print_table(title: &str, table: &FrequencyTable) {
    println!("\n{title}");
    if table.is_empty() {
        println!("  (sin datos)");
        return;
    }
    let width = table.entries.iter().map(|(v, _)| v.chars().count()).max().unwrap_or(0);
    for (value, count) in &table.entries {
        println!("  {value:<width$}  {count:>6}");
    }
    if table.missing > 0 {
        println!("  {:<width$}  {:>6}", "(vacío)", table.missing);
    }
}

fn print_rows(view: &FilteredView<'_>) {
    println!("\nAccesos por usuario y archivo");
    if !view.has_table() {
        println!("  No hay datos que coincidan con los filtros seleccionados.");
        return;
    }
    for row in view.table_rows() {
        println!(
            "  {}\t{}\t{}\t{}",
            row.user.unwrap_or("-"),
            row.timestamp,
            row.action.unwrap_or("-"),
            row.file_name.unwrap_or("-")
        );
    }
}

fn print_facets(facets: &FacetOptions) {
    println!("Usuarios: {}", facets.users.join(", "));
    println!("Acciones: {}", facets.actions.join(", "));
    let types: Vec<&str> = facets.file_types.iter().map(FileType::as_str).collect();
    println!("Tipos de archivo: {}", types.join(", "));
    match &facets.file_names {
        Some(names) => println!("Archivos: {}", names.join(", ")),
        None => println!("Archivos: (sin columna de nombre de archivo)"),
    }
    match facets.date_bounds {
        Some((min, max)) => println!("Rango de fechas: {min} .. {max}"),
        None => println!("Rango de fechas: (sin datos)"),
    }
}

#[cfg(feature = "charts")]
fn write_charts(dir: &std::path::Path, summary: &Summary) -> Result<(), DashboardError> {
    use access_dashboard::graph::{ChartKind, ChartOptions, ChartOutcome, render_chart};

    std::fs::create_dir_all(dir).map_err(|source| DashboardError::Io {
        path: dir.display().to_string(),
        source,
    })?;
    for kind in ChartKind::ALL {
        match render_chart(summary, kind, &ChartOptions::default())? {
            ChartOutcome::Png(png) => {
                let path = dir.join(format!("{}.png", kind.slug()));
                std::fs::write(&path, png).map_err(|source| DashboardError::Io {
                    path: path.display().to_string(),
                    source,
                })?;
                println!("Created {} chart at {}", kind, path.display());
            }
            ChartOutcome::NoData => println!("No data for the {} chart", kind),
        }
    }
    Ok(())
}

#[cfg(not(feature = "charts"))]
fn write_charts(_dir: &std::path::Path, _summary: &Summary) -> Result<(), DashboardError> {
    Err(DashboardError::Config(
        "charts are not available, rebuild with --features charts".to_string(),
    ))
}
