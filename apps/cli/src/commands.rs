//! CLI command definitions, routing, and tracing setup.

use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use ekyc_core::{
    Dispatcher, NotifyEscalation, OnboardingOutcome, Pipeline, ProgressReporter, Stage,
    index_policy_text, parse_date, parse_dob,
};
use ekyc_extract::FieldExtractor;
use ekyc_notify::Transport;
use ekyc_shared::{AppConfig, IdentityRecord, expand_home, init_config, load_config, mask_id};
use ekyc_storage::Storage;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// ekyc: identity-document onboarding from extracted text.
#[derive(Parser)]
#[command(
    name = "ekyc",
    version,
    about = "Extract identity fields from document text, verify them and onboard the customer.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Database path (overrides storage.database_path).
    #[arg(long, global = true, env = "EKYC_DB")]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Extract name, date of birth and identity number from document text.
    Extract {
        /// Text file, or `-` for stdin.
        input: String,
    },

    /// Run the full onboarding workflow for one document.
    Onboard {
        /// Text file, or `-` for stdin.
        input: String,

        /// Customer phone number included in notifications.
        #[arg(long)]
        phone: Option<String>,

        /// Evaluate the age as of this date (DD/MM/YYYY) instead of today.
        #[arg(long)]
        today: Option<String>,
    },

    /// Execute a serialized decision token.
    Dispatch {
        /// `ACTION|name:..,dob:..,idNumber:..,age:..`
        token: String,
    },

    /// Identity registry management.
    Registry {
        #[command(subcommand)]
        action: RegistryAction,
    },

    /// List onboarded customers.
    Customers,

    /// Show recent onboarding runs from the audit trail.
    Runs {
        /// Number of runs to show.
        #[arg(short, long, default_value = "20")]
        limit: u32,
    },

    /// Onboarding policy index.
    Policy {
        #[command(subcommand)]
        action: PolicyAction,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Registry subcommands.
#[derive(Subcommand)]
pub(crate) enum RegistryAction {
    /// Add or replace one registry entry.
    Add {
        /// 12-digit identity number.
        #[arg(long)]
        id: String,
        #[arg(long)]
        name: String,
        /// Date of birth, DD/MM/YYYY.
        #[arg(long)]
        dob: String,
    },
    /// Import a JSON array of `{idNumber, name, dob}` entries.
    Import { file: PathBuf },
    /// Show the entry for an identity number.
    Show { id: String },
}

/// Policy subcommands.
#[derive(Subcommand)]
pub(crate) enum PolicyAction {
    /// Chunk and index a policy text file.
    Index {
        file: PathBuf,
        /// Source name (defaults to the file name).
        #[arg(long)]
        source: Option<String>,
    },
    /// Search the policy index.
    Search {
        query: String,
        #[arg(short, default_value = "2")]
        k: u32,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "ekyc=info",
        1 => "ekyc=debug",
        _ => "ekyc=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let db = cli.db;
    match cli.command {
        Command::Extract { input } => cmd_extract(&input),
        Command::Onboard {
            input,
            phone,
            today,
        } => cmd_onboard(db.as_deref(), &input, phone.as_deref(), today.as_deref()).await,
        Command::Dispatch { token } => cmd_dispatch(db.as_deref(), &token).await,
        Command::Registry { action } => match action {
            RegistryAction::Add { id, name, dob } => {
                cmd_registry_add(db.as_deref(), IdentityRecord {
                    id_number: id,
                    name,
                    dob,
                })
                .await
            }
            RegistryAction::Import { file } => cmd_registry_import(db.as_deref(), &file).await,
            RegistryAction::Show { id } => cmd_registry_show(db.as_deref(), &id).await,
        },
        Command::Customers => cmd_customers(db.as_deref()).await,
        Command::Runs { limit } => cmd_runs(db.as_deref(), limit).await,
        Command::Policy { action } => match action {
            PolicyAction::Index { file, source } => {
                cmd_policy_index(db.as_deref(), &file, source.as_deref()).await
            }
            PolicyAction::Search { query, k } => cmd_policy_search(db.as_deref(), &query, k).await,
        },
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Read document text from a file, or stdin for `-`.
fn read_input(input: &str) -> Result<String> {
    if input == "-" {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text)?;
        return Ok(text);
    }
    std::fs::read_to_string(input).map_err(|e| eyre!("cannot read '{input}': {e}"))
}

fn database_path(config: &AppConfig, db: Option<&Path>) -> Result<PathBuf> {
    match db {
        Some(p) => Ok(p.to_path_buf()),
        None => Ok(expand_home(&config.storage.database_path)?),
    }
}

async fn open_storage(config: &AppConfig, db: Option<&Path>) -> Result<Storage> {
    let path = database_path(config, db)?;
    info!(path = %path.display(), "opening database");
    Ok(Storage::open(&path).await?)
}

async fn open_storage_readonly(config: &AppConfig, db: Option<&Path>) -> Result<Storage> {
    let path = database_path(config, db)?;
    if !path.exists() {
        return Err(eyre!(
            "no database at '{}'. Import a registry first: ekyc registry import <file>",
            path.display()
        ));
    }
    Ok(Storage::open_readonly(&path).await?)
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

fn cmd_extract(input: &str) -> Result<()> {
    let config = load_config()?;
    let text = read_input(input)?;
    let fields = FieldExtractor::new(&config.extraction).extract(&text)?;
    println!("{}", serde_json::to_string_pretty(&fields)?);
    Ok(())
}

async fn cmd_onboard(
    db: Option<&Path>,
    input: &str,
    phone: Option<&str>,
    today: Option<&str>,
) -> Result<()> {
    let config = load_config()?;
    let text = read_input(input)?;
    let today: NaiveDate = match today {
        Some(d) => parse_date(d)?,
        None => Local::now().date_naive(),
    };

    let storage = open_storage(&config, db).await?;
    let transport = Transport::from_config(&config.notify)?;
    let pipeline = Pipeline::new(&config, &storage, &transport);

    let reporter = CliProgress::new();
    let outcome = pipeline.run(&text, phone, today, &reporter).await?;

    println!("{}", serde_json::to_string_pretty(&outcome)?);
    if !outcome.is_success() {
        return Err(eyre!(
            "onboarding stopped at {} with {}",
            outcome.stage.as_str(),
            outcome.code
        ));
    }
    Ok(())
}

async fn cmd_dispatch(db: Option<&Path>, token: &str) -> Result<()> {
    let config = load_config()?;
    let storage = open_storage(&config, db).await?;
    let transport = Transport::from_config(&config.notify)?;
    let dispatcher = Dispatcher::new(
        &storage,
        NotifyEscalation::new(&transport, config.notify.recipient.clone()),
    );

    let result = dispatcher.dispatch(token).await?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

async fn cmd_registry_add(db: Option<&Path>, record: IdentityRecord) -> Result<()> {
    parse_dob(&record.dob)?;
    let config = load_config()?;
    let storage = open_storage(&config, db).await?;
    storage.upsert_identity(&record).await?;
    println!("Registry entry saved: {}", mask_id(&record.id_number));
    Ok(())
}

async fn cmd_registry_import(db: Option<&Path>, file: &Path) -> Result<()> {
    let content = std::fs::read_to_string(file)
        .map_err(|e| eyre!("cannot read '{}': {e}", file.display()))?;
    let records: Vec<IdentityRecord> = serde_json::from_str(&content)?;

    let config = load_config()?;
    let storage = open_storage(&config, db).await?;
    let count = storage.import_identities(&records).await?;
    println!("Imported {count} registry entries");
    Ok(())
}

async fn cmd_registry_show(db: Option<&Path>, id: &str) -> Result<()> {
    let config = load_config()?;
    let storage = open_storage_readonly(&config, db).await?;
    match storage.lookup_identity(id).await? {
        Some(record) => println!("{}", serde_json::to_string_pretty(&record)?),
        None => return Err(eyre!("no registry entry for {}", mask_id(id))),
    }
    Ok(())
}

async fn cmd_customers(db: Option<&Path>) -> Result<()> {
    let config = load_config()?;
    let storage = open_storage_readonly(&config, db).await?;
    let customers = storage.list_customers().await?;

    if customers.is_empty() {
        println!("No customers onboarded yet.");
        return Ok(());
    }
    for c in &customers {
        println!(
            "  {}  {:<30} {}  age {:>3}  {}  {}",
            mask_id(&c.id_number),
            c.name,
            c.dob,
            c.age,
            c.status.as_str(),
            c.onboarded_at.format("%Y-%m-%d %H:%M")
        );
    }
    println!();
    println!("  {} customer(s)", customers.len());
    Ok(())
}

async fn cmd_runs(db: Option<&Path>, limit: u32) -> Result<()> {
    let config = load_config()?;
    let storage = open_storage_readonly(&config, db).await?;
    let runs = storage.list_runs(limit).await?;
    for run in &runs {
        println!(
            "  {}  {:<8} {:<16} {}  {}",
            run.created_at.format("%Y-%m-%d %H:%M:%S"),
            run.stage,
            run.code,
            &run.document_sha256[..12.min(run.document_sha256.len())],
            run.action.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}

async fn cmd_policy_index(db: Option<&Path>, file: &Path, source: Option<&str>) -> Result<()> {
    let text = std::fs::read_to_string(file)
        .map_err(|e| eyre!("cannot read '{}': {e}", file.display()))?;
    let source = match source {
        Some(s) => s.to_string(),
        None => file
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| file.display().to_string()),
    };

    let config = load_config()?;
    let storage = open_storage(&config, db).await?;
    let count = index_policy_text(&storage, &source, &text).await?;
    println!("Indexed {count} chunk(s) from {source}");
    Ok(())
}

async fn cmd_policy_search(db: Option<&Path>, query: &str, k: u32) -> Result<()> {
    let config = load_config()?;
    let storage = open_storage_readonly(&config, db).await?;
    let hits = storage.search_policy(query, k).await?;
    if hits.is_empty() {
        println!("No matching policy text.");
    }
    for hit in hits {
        println!("[{} #{}]", hit.source, hit.chunk_index);
        println!("{}", hit.content);
        println!();
    }
    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn stage(&self, stage: Stage) {
        let message = match stage {
            Stage::Extract => "Extracting identity fields",
            Stage::Validate => "Checking identity registry",
            Stage::Decide => "Deciding onboarding action",
            Stage::Dispatch => "Executing decision",
        };
        self.spinner.set_message(message);
    }

    fn done(&self, _outcome: &OnboardingOutcome) {
        self.spinner.finish_and_clear();
    }
}
