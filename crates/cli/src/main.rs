// gridedit CLI - edit a tabular dataset and save it to the dataset server

mod exit_codes;
mod load;
mod repl;
mod table;

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use gridedit_client::{ApiClient, ClientError};
use gridedit_config::{DisplayPreference, Settings};
use gridedit_engine::display::DisplayMode;
use gridedit_engine::extract::extract;
use gridedit_engine::EngineError;

use exit_codes::{engine_exit_code, EXIT_IO, EXIT_PERSISTENCE, EXIT_SUCCESS, EXIT_USAGE};
use repl::{Repl, ReplOptions};
use table::{open_grid, GridOptions};

#[derive(Parser)]
#[command(name = "gridedit")]
#[command(about = "Edit a tabular dataset and save it back to the dataset server")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// Log at debug level (RUST_LOG overrides)
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    /// Answer yes to every confirmation
    #[arg(long, short = 'y', global = true)]
    yes: bool,

    /// Dataset server base URL (default from settings.json)
    #[arg(long, global = true, env = "GRIDEDIT_SERVER")]
    server: Option<String>,

    /// Cookie header sent with every request, e.g. "session=abc"
    #[arg(long, global = true, env = "GRIDEDIT_SESSION_COOKIE", hide_env_values = true)]
    cookie: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Open a CSV and edit it interactively
    #[command(after_help = "\
Examples:
  gridedit edit crimes.csv
  gridedit edit crimes.csv --raw --no-year-filter
  gridedit edit crimes.csv --search 'Hotspot #3' --server http://10.0.0.5:5000

Type `help` at the prompt for the command list.")]
    Edit {
        /// CSV file to edit
        file: PathBuf,

        /// Show stored values instead of friendly labels
        #[arg(long)]
        raw: bool,

        /// Initial search term (overrides the year filter)
        #[arg(long)]
        search: Option<String>,

        /// Start with every year visible
        #[arg(long)]
        no_year_filter: bool,
    },

    /// Extract a CSV through the grid and print it as JSON
    #[command(after_help = "\
Examples:
  gridedit extract crimes.csv
  gridedit extract crimes.csv --search 2016 | jq '.rows | length'")]
    Extract {
        file: PathBuf,

        /// Search applied before extraction (extraction ignores it)
        #[arg(long)]
        search: Option<String>,
    },

    /// Delete an uploaded table on the server
    DeleteFile {
        table: String,
    },

    /// Use a table as the forecast data source
    #[command(name = "use-for-forecast")]
    UseForForecast {
        table: String,
    },

    /// Retrain the forecasting model
    Retrain,
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("GIT_COMMIT_HASH"), ")",
        "\nengine:  gridedit-engine ", env!("CARGO_PKG_VERSION"),
        "\ntarget:  ", env!("TARGET"),
    )
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();

    let settings = Settings::load();
    let result = match cli.command {
        Commands::Edit { ref file, raw, ref search, no_year_filter } => {
            cmd_edit(&cli, &settings, file, raw, search.clone(), no_year_filter)
        }
        Commands::Extract { ref file, ref search } => cmd_extract(&settings, file, search.clone()),
        Commands::DeleteFile { ref table } => {
            if !cli.yes && !confirm_stdin(&format!("Delete table {:?} on the server?", table)) {
                Ok(())
            } else {
                client(&cli, &settings).and_then(|c| c.delete_file(table).map_err(CliError::client)).map(print_line)
            }
        }
        Commands::UseForForecast { ref table } => client(&cli, &settings)
            .and_then(|c| c.set_forecast_source(table).map_err(CliError::client))
            .map(print_line),
        Commands::Retrain => client(&cli, &settings)
            .and_then(|c| c.retrain_model().map_err(CliError::client))
            .map(print_line),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_IO, message: msg.into(), hint: None }
    }

    /// Create error from an engine error with its registered exit code.
    pub fn engine(err: EngineError) -> Self {
        let hint = match &err {
            EngineError::NotEditing => Some("type `begin` to enter edit mode".to_string()),
            EngineError::SchemaMismatch { .. } => Some("fix the row width in the source file".to_string()),
            _ => None,
        };
        Self { code: engine_exit_code(&err), message: err.to_string(), hint }
    }

    pub fn client(err: ClientError) -> Self {
        let hint = match &err {
            ClientError::Network(_) => Some("is the dataset server running? see --server".to_string()),
            _ => None,
        };
        Self { code: EXIT_PERSISTENCE, message: err.to_string(), hint }
    }
}

impl From<io::Error> for CliError {
    fn from(err: io::Error) -> Self {
        CliError::io(err.to_string())
    }
}

fn print_line(message: String) {
    println!("{}", message);
}

/// y/N question on stdin.
fn confirm_stdin(question: &str) -> bool {
    eprint!("{} [y/N] ", question);
    let _ = io::stderr().flush();
    let mut answer = String::new();
    io::stdin().read_line(&mut answer).is_ok()
        && matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

fn client(cli: &Cli, settings: &Settings) -> Result<ApiClient, CliError> {
    let url = cli.server.clone().unwrap_or_else(|| settings.server_url.clone());
    let client = ApiClient::new(url, Duration::from_secs(settings.timeout_secs)).map_err(CliError::client)?;
    Ok(match &cli.cookie {
        Some(cookie) => client.with_session_cookie(cookie.clone()),
        None => client,
    })
}

fn display_mode(raw: bool, settings: &Settings) -> DisplayMode {
    match (raw, settings.display_mode) {
        (true, _) | (false, DisplayPreference::Raw) => DisplayMode::Raw,
        (false, DisplayPreference::Friendly) => DisplayMode::Friendly,
    }
}

// ============================================================================
// edit
// ============================================================================

fn cmd_edit(
    cli: &Cli,
    settings: &Settings,
    file: &Path,
    raw: bool,
    search: Option<String>,
    no_year_filter: bool,
) -> Result<(), CliError> {
    let dataset = load::load_csv(file)?;
    let opts = GridOptions {
        mode: display_mode(raw, settings),
        order_column: settings.order_column.clone(),
        search,
        year_filter: settings.apply_year_filter && !no_year_filter,
        preferred_year: settings.preferred_year,
    };
    let opened = open_grid(dataset, &opts)?;
    let server = client(cli, settings)?;

    let stdin = io::stdin();
    let mut repl = Repl::new(
        opened.grid,
        opened.years,
        server,
        stdin.lock(),
        io::stdout(),
        ReplOptions { assume_yes: cli.yes, confirm_discard: settings.confirm_discard },
    );
    repl.run()
}

// ============================================================================
// extract
// ============================================================================

fn cmd_extract(settings: &Settings, file: &Path, search: Option<String>) -> Result<(), CliError> {
    let dataset = load::load_csv(file)?;
    let opts = GridOptions {
        mode: display_mode(false, settings),
        order_column: settings.order_column.clone(),
        search,
        year_filter: false,
        preferred_year: settings.preferred_year,
    };
    let mut grid = open_grid(dataset, &opts)?.grid;
    let extraction = extract(&mut grid).map_err(CliError::engine)?;

    let out = serde_json::json!({
        "method": extraction.method.label(),
        "strategy": extraction.method,
        "headers": extraction.header,
        "rows": extraction.rows,
    });
    let text = serde_json::to_string_pretty(&out).map_err(|e| CliError::io(e.to_string()))?;
    println!("{}", text);
    Ok(())
}
