// Water billing CLI - headless front end over the billing store
//
// Every command opens the persisted store, does one thing, and exits.

mod exit_codes;

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use waterbill_config::{JsonFileBackend, Settings};
use waterbill_core::{BillingFilter, ReadingEdit, Row, RowQuery, Sheet};
use waterbill_store::{BackupLocations, BillingSession, DocumentStore, SaveOutcome, SessionError};

use exit_codes::{session_exit_code, EXIT_ERROR, EXIT_IO, EXIT_SUCCESS};

/// Env var holding the log filter (e.g. `waterbill_store=debug`)
const LOG_ENV: &str = "WATERBILL_LOG";

#[derive(Parser)]
#[command(name = "waterbill")]
#[command(about = "Water meter billing: import, bill, back up")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// Preferences file holding the stored sheet
    #[arg(long, global = true, env = "WATERBILL_STORE", value_name = "PATH")]
    store: Option<PathBuf>,

    /// Directory receiving AS_ auto-saves and the Backup folder
    #[arg(long, global = true, env = "WATERBILL_DOWNLOADS", value_name = "DIR")]
    downloads: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a billing spreadsheet, replacing the stored sheet
    #[command(after_help = "\
Examples:
  waterbill import march.xlsx
  waterbill --store ./state.json import march.xlsx")]
    Import {
        /// .xlsx file to import
        file: PathBuf,
    },

    /// Write the stored sheet to an .xlsx file
    Export {
        /// Destination file (replaced if it exists)
        file: PathBuf,
    },

    /// List rows of the stored sheet
    #[command(after_help = "\
Examples:
  waterbill show --filter unbilled
  waterbill show --search 'main st' --json")]
    Show {
        #[arg(long, value_enum, default_value = "all")]
        filter: FilterArg,

        /// Case-insensitive text to look for in any column
        #[arg(long, short = 's', default_value = "")]
        search: String,

        /// Output JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Totals of billed and unbilled records
    Summary {
        /// Output JSON
        #[arg(long)]
        json: bool,
    },

    /// Record a meter reading for one row
    #[command(after_help = "\
Examples:
  waterbill bill 3 1250
  waterbill bill 7 980 --for-evaluation
  waterbill bill 3 ''          # clear the reading")]
    Bill {
        /// Row id as shown by `show`
        row_id: String,

        /// New Current reading (blank clears it)
        current: String,

        /// Flag the row for evaluation
        #[arg(long)]
        for_evaluation: bool,
    },

    /// Back up the stored sheet
    Backup {
        /// Destination (default: <downloads>/Backup/water_billing_backup_<ms>.xlsx)
        file: Option<PathBuf>,
    },

    /// Replace the stored sheet with a backup file
    Restore {
        file: PathBuf,
    },

    /// Remove the stored sheet and reset the bill counter
    Clear,

    /// Turn autosave on or off
    Autosave {
        #[arg(value_enum)]
        state: Toggle,
    },

    /// Show store location, autosave state, and bill counter
    Status {
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum FilterArg {
    All,
    Billed,
    Unbilled,
    ForEvaluation,
}

impl From<FilterArg> for BillingFilter {
    fn from(arg: FilterArg) -> Self {
        match arg {
            FilterArg::All => BillingFilter::All,
            FilterArg::Billed => BillingFilter::Billed,
            FilterArg::Unbilled => BillingFilter::Unbilled,
            FilterArg::ForEvaluation => BillingFilter::ForEvaluation,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Toggle {
    On,
    Off,
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("GIT_COMMIT_HASH"), ")",
        "\ntarget:  ", env!("TARGET"),
    )
}

fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();

    let result = run(cli);

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

fn run(cli: Cli) -> Result<(), CliError> {
    let paths = Paths::resolve(cli.store, cli.downloads);
    let mut session = paths.open();

    match cli.command {
        Commands::Import { file } => cmd_import(&mut session, &file),
        Commands::Export { file } => cmd_export(&session, &file),
        Commands::Show { filter, search, json } => cmd_show(&session, filter.into(), search, json),
        Commands::Summary { json } => cmd_summary(&session, json),
        Commands::Bill { row_id, current, for_evaluation } => {
            cmd_bill(&mut session, &row_id, ReadingEdit::new(current, for_evaluation))
        }
        Commands::Backup { file } => cmd_backup(&session, file.as_deref()),
        Commands::Restore { file } => cmd_restore(&mut session, &file),
        Commands::Clear => cmd_clear(&mut session),
        Commands::Autosave { state } => cmd_autosave(&session, state),
        Commands::Status { json } => cmd_status(&session, &paths, json),
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_IO, message: msg.into(), hint: None }
    }

    pub fn other(msg: impl Into<String>) -> Self {
        Self { code: EXIT_ERROR, message: msg.into(), hint: None }
    }

    /// Create error from session error with proper exit code.
    pub fn session(err: SessionError) -> Self {
        let code = session_exit_code(&err);
        let hint = match &err {
            SessionError::NoData => {
                Some("import a billing file first: waterbill import FILE".to_string())
            }
            SessionError::UnknownRow(_) => Some("list row ids with: waterbill show".to_string()),
            _ => None,
        };
        Self { code, message: err.to_string(), hint }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<SessionError> for CliError {
    fn from(err: SessionError) -> Self {
        Self::session(err)
    }
}

// ============================================================================
// Paths
// ============================================================================

/// Store and downloads locations after applying flags over settings.json
struct Paths {
    store: PathBuf,
    locations: BackupLocations,
}

impl Paths {
    fn resolve(store: Option<PathBuf>, downloads: Option<PathBuf>) -> Self {
        let settings = Settings::load();
        let paths = Self {
            store: store.unwrap_or_else(|| settings.preferences_path()),
            locations: match downloads {
                Some(dir) => BackupLocations::new(dir),
                None => BackupLocations::from_settings(&settings),
            },
        };
        log::debug!(
            "store {}, downloads {}",
            paths.store.display(),
            paths.locations.downloads.display()
        );
        paths
    }

    fn open(&self) -> BillingSession<JsonFileBackend> {
        let store = DocumentStore::new(JsonFileBackend::new(&self.store), self.locations.clone());
        BillingSession::open(store)
    }
}

fn write_out(out: &mut impl Write, line: impl std::fmt::Display) -> Result<(), CliError> {
    writeln!(out, "{}", line).map_err(|e| CliError::io(e.to_string()))
}

fn print_outcome(outcome: &SaveOutcome) {
    if !outcome.persisted {
        eprintln!("note: autosave is off; not saved to the store");
    }
    if let Some(export) = &outcome.auto_export {
        eprintln!("{}", export.message());
    }
}

type Session = BillingSession<JsonFileBackend>;

// ============================================================================
// import / export
// ============================================================================

fn cmd_import(session: &mut Session, file: &Path) -> Result<(), CliError> {
    let (report, outcome) = session.import(file).map_err(|e| {
        let hint = e.codec().filter(|c| !c.is_format()).map(|_| "check the path and permissions");
        let err = CliError::session(e);
        match hint {
            Some(hint) => err.with_hint(hint),
            None => err,
        }
    })?;
    print_outcome(&outcome);

    let name = file.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();
    eprintln!("Imported {}: {}", name, report.summary());
    Ok(())
}

fn cmd_export(session: &Session, file: &Path) -> Result<(), CliError> {
    session.export(file)?;
    eprintln!("Exported to {}", file.display());
    Ok(())
}

// ============================================================================
// show / summary
// ============================================================================

fn cmd_show(
    session: &Session,
    filter: BillingFilter,
    search: String,
    json: bool,
) -> Result<(), CliError> {
    let sheet = session.sheet().ok_or(SessionError::NoData)?;
    let rows = session.query(&RowQuery::new(filter, search))?;

    let stdout = io::stdout();
    let mut out = stdout.lock();

    if json {
        let records: Vec<serde_json::Value> = rows.iter().map(|row| row_json(sheet, row)).collect();
        let text = serde_json::to_string_pretty(&records)
            .map_err(|e| CliError::other(e.to_string()))?;
        return write_out(&mut out, text);
    }

    let mut header = vec!["id".to_string()];
    header.extend(sheet.headers.iter().cloned());
    write_out(&mut out, header.join("\t"))?;
    for row in rows {
        let mut cells = vec![row.id.clone()];
        cells.extend(sheet.headers.iter().map(|h| row.get(h).unwrap_or("").to_string()));
        write_out(&mut out, cells.join("\t"))?;
    }
    Ok(())
}

/// Row as a JSON object in header order, led by its id.
/// Columns set by edits but absent from the header row (ForEvaluation) follow.
fn row_json(sheet: &Sheet, row: &Row) -> serde_json::Value {
    let mut obj = serde_json::Map::new();
    obj.insert("id".to_string(), row.id.clone().into());
    for header in &sheet.headers {
        obj.insert(header.clone(), row.get(header).unwrap_or("").into());
    }
    let mut extra: Vec<_> = row.columns.iter().filter(|(k, _)| !sheet.has_header(k)).collect();
    extra.sort();
    for (key, value) in extra {
        obj.insert(key.clone(), value.clone().into());
    }
    serde_json::Value::Object(obj)
}

fn cmd_summary(session: &Session, json: bool) -> Result<(), CliError> {
    let summary = session.summary()?;

    let stdout = io::stdout();
    let mut out = stdout.lock();

    if json {
        let text = serde_json::to_string_pretty(&summary)
            .map_err(|e| CliError::other(e.to_string()))?;
        return write_out(&mut out, text);
    }

    write_out(&mut out, summary.summary())?;
    for sample in &summary.sample_records {
        write_out(
            &mut out,
            format!("  {}: current {}, previous {}", sample.name, sample.current, sample.previous),
        )?;
    }
    Ok(())
}

// ============================================================================
// bill
// ============================================================================

fn cmd_bill(session: &mut Session, row_id: &str, edit: ReadingEdit) -> Result<(), CliError> {
    let (row, outcome) = session.update_row(row_id, &edit)?;
    print_outcome(&outcome);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    write_out(
        &mut out,
        format!(
            "row {}: Current {}, Consumed {}",
            row.id,
            display_or_dash(row.get(waterbill_core::CURRENT)),
            display_or_dash(row.get(waterbill_core::CONSUMED)),
        ),
    )
}

fn display_or_dash(value: Option<&str>) -> &str {
    match value {
        Some(v) if !v.is_empty() => v,
        _ => "-",
    }
}

// ============================================================================
// backup / restore / clear
// ============================================================================

fn cmd_backup(session: &Session, file: Option<&Path>) -> Result<(), CliError> {
    let path = session.backup(file)?;
    eprintln!("Backup written to {}", path.display());
    Ok(())
}

fn cmd_restore(session: &mut Session, file: &Path) -> Result<(), CliError> {
    let outcome = session.restore(file)?;
    print_outcome(&outcome);
    if outcome.persisted {
        eprintln!("Restored from {}", file.display());
    }
    Ok(())
}

fn cmd_clear(session: &mut Session) -> Result<(), CliError> {
    session.clear()?;
    eprintln!("All data cleared");
    Ok(())
}

// ============================================================================
// autosave / status
// ============================================================================

fn cmd_autosave(session: &Session, state: Toggle) -> Result<(), CliError> {
    let enabled = matches!(state, Toggle::On);
    session.set_autosave(enabled)?;
    eprintln!("Autosave {}", if enabled { "enabled" } else { "disabled" });
    Ok(())
}

#[derive(serde::Serialize)]
struct Status {
    store: PathBuf,
    downloads: PathBuf,
    autosave_enabled: bool,
    bill_count: u8,
    current_filename: Option<String>,
    last_modified: Option<String>,
    records: Option<usize>,
}

fn cmd_status(session: &Session, paths: &Paths, json: bool) -> Result<(), CliError> {
    let store = session.store();
    let status = Status {
        store: paths.store.clone(),
        downloads: store.locations().downloads.clone(),
        autosave_enabled: store.autosave_enabled().map_err(SessionError::from)?,
        bill_count: store.bill_count().map_err(SessionError::from)?,
        current_filename: store.current_filename().map_err(SessionError::from)?,
        last_modified: store
            .last_modified()
            .map_err(SessionError::from)?
            .and_then(chrono::DateTime::<chrono::Utc>::from_timestamp_millis)
            .map(|t| t.to_rfc3339()),
        records: session.sheet().map(Sheet::len),
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();

    if json {
        let text = serde_json::to_string_pretty(&status)
            .map_err(|e| CliError::other(e.to_string()))?;
        return write_out(&mut out, text);
    }

    write_out(&mut out, format!("store:      {}", status.store.display()))?;
    write_out(&mut out, format!("downloads:  {}", status.downloads.display()))?;
    let autosave = if status.autosave_enabled { "on" } else { "off" };
    write_out(&mut out, format!("autosave:   {}", autosave))?;
    write_out(&mut out, format!("bill count: {}/5", status.bill_count))?;
    let file = status.current_filename.as_deref().unwrap_or("-");
    write_out(&mut out, format!("file:       {}", file))?;
    write_out(&mut out, format!("modified:   {}", status.last_modified.as_deref().unwrap_or("-")))?;
    match status.records {
        Some(n) => write_out(&mut out, format!("records:    {}", n)),
        None => write_out(&mut out, "records:    none"),
    }
}
