// Entry point for the terminal viewer.
//
// The CSV is loaded once at startup on a worker thread. After that the user
// drives the view with short commands (filter, sort, page, view, ...) and the
// current page of the active view is printed after each one.
use clap::Parser;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use fmsca_viewer::output::{self, ViewSummary};
use fmsca_viewer::pivot::{Aggregator, PivotSpec};
use fmsca_viewer::util::format_int;
use fmsca_viewer::{
    spawn_load, App, AppConfig, IngestOptions, ResourceLocator, SortDirection, SortState,
    ViewError, ViewMode,
};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(version, about = "Browse the FMSCA carrier CSV as a table, pivot or grouped grid")]
struct Args {
    /// CSV file path or http(s) URL (overrides `source.location` from the config)
    source: Option<String>,

    /// TOML configuration file
    #[arg(long = "config")]
    config: Option<PathBuf>,

    /// Write the default configuration to this path and exit
    #[arg(long = "write-default-config")]
    write_default_config: Option<PathBuf>,

    /// Overwrite an existing file with --write-default-config
    #[arg(long = "force", action)]
    force: bool,

    /// Initial view: table, pivot or grid
    #[arg(long = "view")]
    view: Option<ViewMode>,

    /// Initial filter query
    #[arg(long = "filter")]
    filter: Option<String>,

    /// Column to sort by
    #[arg(long = "sort")]
    sort: Option<String>,

    /// Sort descending
    #[arg(long = "desc", action)]
    desc: bool,

    /// Zero-based page to show
    #[arg(long = "page")]
    page: Option<usize>,

    #[arg(long = "page-size")]
    page_size: Option<usize>,

    /// Pivot row fields
    #[arg(long = "pivot-rows", value_delimiter = ',')]
    pivot_rows: Vec<String>,

    /// Pivot column field
    #[arg(long = "pivot-col")]
    pivot_col: Option<String>,

    /// Pivot aggregator: count, or sum:/avg:/median:/min:/max:/count_unique:<column>
    #[arg(long = "aggregate")]
    aggregate: Option<Aggregator>,

    /// Field the grouped grid buckets by
    #[arg(long = "group-by")]
    group_by: Option<String>,

    /// Print the view once and exit instead of starting the command loop
    #[arg(long = "print", action)]
    print: bool,

    /// Write the filtered and sorted rows to this CSV file
    #[arg(long = "export-csv")]
    export_csv: Option<String>,

    /// Write a JSON summary of the view state to this file
    #[arg(long = "summary-json")]
    summary_json: Option<String>,

    /// Log at debug level (RUST_LOG takes precedence)
    #[arg(long = "verbose", short = 'v', action)]
    verbose: bool,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

/// Drive the app's timers until nothing is pending.
fn wait_until_idle(app: &mut App) {
    while app.is_busy() {
        let now = Instant::now();
        if !app.tick(now) {
            let pause = app
                .next_deadline()
                .map(|d| d.saturating_duration_since(now))
                .unwrap_or(Duration::from_millis(25))
                .min(Duration::from_millis(25));
            std::thread::sleep(pause);
        }
    }
}

fn show(app: &App) {
    println!("{}", output::status_line(app));
    match output::render(app) {
        Ok(Some(body)) => println!("{}\n", body),
        Ok(None) => println!("(working...)\n"),
        Err(ViewError::EmptyDataset) => println!("(no data loaded)\n"),
        Err(e) => println!("{}\n", e),
    }
}

fn apply_args(app: &mut App, args: &Args) -> Result<()> {
    if !args.pivot_rows.is_empty() || args.pivot_col.is_some() || args.aggregate.is_some() {
        let mut spec = app.pivot_spec().clone();
        if !args.pivot_rows.is_empty() {
            spec.rows = args.pivot_rows.clone();
        }
        if args.pivot_col.is_some() {
            spec.column = args.pivot_col.clone();
        }
        if let Some(agg) = &args.aggregate {
            spec.aggregator = agg.clone();
        }
        app.set_pivot_spec(spec)?;
    }
    if let Some(field) = &args.group_by {
        app.set_group_field(field)?;
    }
    if let Some(column) = &args.sort {
        let direction = if args.desc {
            SortDirection::Desc
        } else {
            SortDirection::Asc
        };
        app.set_sort(Some(SortState::new(column.clone(), direction)))?;
    }
    if let Some(q) = &args.filter {
        if !app.set_query(q, Instant::now()) {
            return Err(eyre!("filter query is too long"));
        }
    }
    if let Some(size) = args.page_size {
        app.set_page_size(size)?;
    }
    if let Some(view) = args.view {
        app.request_view(view);
    }
    wait_until_idle(app);
    if let Some(page) = args.page {
        app.set_page(page);
    }
    Ok(())
}

fn export(app: &App, args: &Args) {
    if let Some(path) = &args.export_csv {
        match output::write_csv(path, app.schema(), app.visible_rows()) {
            Ok(()) => println!(
                "Exported {} rows to {}",
                format_int(app.visible_rows().len()),
                path
            ),
            Err(e) => eprintln!("Write error: {}", e),
        }
    }
    if let Some(path) = &args.summary_json {
        if let Err(e) = output::write_json(path, &ViewSummary::from_app(app)) {
            eprintln!("Write error: {}", e);
        }
    }
}

const HELP: &str = "\
Commands:
  filter <text>          filter rows (no text clears the filter)
  sort <column> [desc]   sort by a column; `sort` alone restores the default
  page <n> | next | prev move between pages (n is zero-based)
  size <n>               rows per page
  view [table|pivot|grid] switch view (no argument cycles)
  rows <a,b,...>         pivot row fields
  col <field|->          pivot column field (`-` for none)
  agg <aggregator>       count, sum:<col>, avg:<col>, median:<col>, min:<col>, max:<col>, count_unique:<col>
  group <field>          grouped grid field
  export <path>          write visible rows as CSV
  help | quit";

/// Handle one command line. Returns false when the user asked to quit.
fn handle_command(app: &mut App, line: &str) -> bool {
    let (cmd, rest) = line
        .trim()
        .split_once(char::is_whitespace)
        .map(|(c, r)| (c, r.trim()))
        .unwrap_or((line.trim(), ""));

    let result: std::result::Result<(), String> = match cmd {
        "" => Ok(()),
        "quit" | "exit" | "q" => return false,
        "help" | "?" => {
            println!("{HELP}\n");
            return true;
        }
        "filter" | "f" => {
            if app.set_query(rest, Instant::now()) {
                Ok(())
            } else {
                Err("filter query is too long".to_string())
            }
        }
        "sort" => {
            let mut parts = rest.split_whitespace();
            match parts.next() {
                None => app.set_sort(None).map_err(|e| e.to_string()),
                Some(column) => {
                    let direction = match parts.next() {
                        Some("desc") => SortDirection::Desc,
                        _ => SortDirection::Asc,
                    };
                    app.set_sort(Some(SortState::new(column, direction)))
                        .map_err(|e| e.to_string())
                }
            }
        }
        "page" => rest
            .parse::<usize>()
            .map(|p| app.set_page(p))
            .map_err(|_| "page needs a number".to_string()),
        "next" | "n" => {
            app.next_page();
            Ok(())
        }
        "prev" | "p" => {
            app.prev_page();
            Ok(())
        }
        "size" => match rest.parse::<usize>() {
            Ok(size) => app.set_page_size(size).map_err(|e| e.to_string()),
            Err(_) => Err("size needs a number".to_string()),
        },
        "view" | "v" => {
            if rest.is_empty() {
                app.toggle_view();
                Ok(())
            } else {
                rest.parse::<ViewMode>().map(|m| app.request_view(m))
            }
        }
        "rows" => {
            let spec = PivotSpec {
                rows: rest.split(',').map(|s| s.trim().to_string()).collect(),
                ..app.pivot_spec().clone()
            };
            app.set_pivot_spec(spec).map_err(|e| e.to_string())
        }
        "col" => {
            let column = match rest {
                "" | "-" => None,
                c => Some(c.to_string()),
            };
            let spec = PivotSpec {
                column,
                ..app.pivot_spec().clone()
            };
            app.set_pivot_spec(spec).map_err(|e| e.to_string())
        }
        "agg" => rest.parse::<Aggregator>().and_then(|aggregator| {
            let spec = PivotSpec {
                aggregator,
                ..app.pivot_spec().clone()
            };
            app.set_pivot_spec(spec).map_err(|e| e.to_string())
        }),
        "group" => app.set_group_field(rest).map_err(|e| e.to_string()),
        "export" => output::write_csv(rest, app.schema(), app.visible_rows())
            .map(|_| println!("Exported {} rows to {}", format_int(app.visible_rows().len()), rest))
            .map_err(|e| format!("Write error: {}", e)),
        other => Err(format!("Unknown command `{other}`. Type `help` for a list.")),
    };

    match result {
        Ok(()) => {
            wait_until_idle(app);
            show(app);
        }
        Err(msg) => println!("{}\n", msg),
    }
    true
}

fn run_loop(app: &mut App) -> Result<()> {
    println!("{HELP}\n");
    show(app);
    let stdin = io::stdin();
    loop {
        print!("Enter command: ");
        io::stdout().flush()?;
        let mut buf = String::new();
        if stdin.lock().read_line(&mut buf)? == 0 {
            break;
        }
        if !handle_command(app, &buf) {
            println!("Exiting the viewer.");
            break;
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();
    init_tracing(args.verbose);

    if let Some(path) = &args.write_default_config {
        AppConfig::write_default(path, args.force)?;
        println!("Wrote default configuration to {}", path.display());
        return Ok(());
    }

    let config = match &args.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };
    let location = args
        .source
        .clone()
        .unwrap_or_else(|| config.source.location.clone());

    let mut app = App::new(&config)?;
    println!("Loading {}...", location);
    app.begin_load(spawn_load(
        ResourceLocator::parse(&location),
        IngestOptions::from(&config),
    ));
    wait_until_idle(&mut app);
    if let Some(report) = app.load_report() {
        println!(
            "Loaded {} rows, {} columns ({} empty cells).\n",
            format_int(report.total_rows),
            report.columns,
            format_int(report.null_cells)
        );
    }

    apply_args(&mut app, &args)?;
    export(&app, &args);

    if args.print {
        show(&app);
        return Ok(());
    }
    run_loop(&mut app)
}
