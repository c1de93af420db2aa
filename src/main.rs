use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use sift::commands::{ViewOptions, cmd_export, cmd_filters, cmd_query};
use sift::export::ExportFormat;
use sift::logging::{LogConfig, init_logging};
use sift::query::{PageSize, Sort};

#[derive(Parser)]
#[command(name = "sift")]
#[command(about = "Filter selection and query synchronization engine")]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Config file (default: ./sift.yaml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the flattened filter list of a catalog
    Filters {
        /// Catalog file (YAML or JSON)
        catalog: PathBuf,

        /// Filter values selected initially (comma-separated)
        #[arg(short, long, value_delimiter = ',')]
        select: Vec<String>,

        /// Row index to toggle; repeat to toggle several rows in order
        #[arg(short, long)]
        toggle: Vec<usize>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Query a dataset and print one page of results
    #[command(visible_alias = "q")]
    Query {
        #[command(flatten)]
        view: ViewArgs,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Download every matching item into a timestamped file
    Export {
        #[command(flatten)]
        view: ViewArgs,

        /// Export format: json, csv
        #[arg(short, long, default_value = "json")]
        format: ExportFormat,

        /// Directory to write into
        #[arg(short, long, default_value = ".")]
        out: PathBuf,
    },
}

#[derive(clap::Args)]
struct ViewArgs {
    /// Catalog file (YAML or JSON)
    catalog: PathBuf,

    /// Dataset file (JSON array of objects)
    dataset: PathBuf,

    /// Filter values to select (comma-separated)
    #[arg(short, long, value_delimiter = ',')]
    select: Vec<String>,

    /// Text search as COLUMN=TEXT
    #[arg(long, value_parser = parse_search)]
    search: Option<(String, String)>,

    /// Sort as COLUMN or COLUMN:asc|desc
    #[arg(long)]
    sort: Option<Sort>,

    /// Page number (starts at 1)
    #[arg(short, long)]
    page: Option<u32>,

    /// Items per page: 10, 20, 50, 100
    #[arg(long)]
    page_size: Option<PageSize>,

    /// Include records hidden by the scope field
    #[arg(long)]
    show_all: bool,

    /// Extra query flag as KEY=true|false (repeatable)
    #[arg(long = "flag", value_parser = parse_flag)]
    flags: Vec<(String, bool)>,

    /// Dataset field holding dates (repeatable)
    #[arg(long = "time-column")]
    time_columns: Vec<String>,

    /// Field that hides a record when false, unless --show-all
    #[arg(long)]
    scope_field: Option<String>,
}

impl ViewArgs {
    fn into_options(self, config: Option<PathBuf>) -> ViewOptions {
        ViewOptions {
            catalog: self.catalog,
            dataset: self.dataset,
            config,
            select: self.select,
            search: self.search,
            sort: self.sort,
            page: self.page,
            page_size: self.page_size,
            show_all: self.show_all,
            flags: self.flags,
            time_columns: self.time_columns,
            scope_field: self.scope_field,
        }
    }
}

fn parse_search(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((column, text)) if !column.is_empty() => Ok((column.to_string(), text.to_string())),
        _ => Err(format!("expected COLUMN=TEXT, got '{s}'")),
    }
}

fn parse_flag(s: &str) -> Result<(String, bool), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=true|false, got '{s}'"))?;
    let value = value
        .parse::<bool>()
        .map_err(|_| format!("flag value must be true or false, got '{value}'"))?;
    Ok((key.to_string(), value))
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging(&LogConfig::from_verbosity(cli.verbose)) {
        eprintln!("{}", e);
    }

    let result = match cli.command {
        Commands::Filters {
            catalog,
            select,
            toggle,
            json,
        } => cmd_filters(&catalog, &select, &toggle, json),
        Commands::Query { view, json } => cmd_query(&view.into_options(cli.config), json).await,
        Commands::Export { view, format, out } => {
            cmd_export(&view.into_options(cli.config), format, &out).await
        }
    };

    match result {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e);
            // Bad selectors are usage errors, like clap's own
            if e.is_programming_error() {
                ExitCode::from(2)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}
