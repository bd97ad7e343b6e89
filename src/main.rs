use anyhow::{bail, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use storefront_ops::catalog::{builtin_catalog, load_catalog_file, BuiltinCatalog, Catalog};
use storefront_ops::config::{
    Config, Overrides, ENV_ACCESS_TOKEN, ENV_API_VERSION, ENV_STORE,
};
use storefront_ops::ensure::{
    run_batch, OperationOutcome, ResourceEnsurer, ResourceKind, ResourceSpec, Summary, Throttle,
};
use storefront_ops::shopify::client::AdminClient;
use storefront_ops::shopify::http::status_hint;
use storefront_ops::translations::{self, TranslationMap};
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

/// Storefront maintenance: ensure collections and pages exist, fix theme translation keys
#[derive(Parser, Debug)]
#[command(name = "sfops", version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Log level for debugging (written to the log file)
    #[arg(long, value_enum, default_value = "off", global = true)]
    log_level: LogLevel,

    /// Config file to use instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create missing product collections
    Collections(ShopArgs),
    /// Create the range calculator page
    Page(ShopArgs),
    /// Replace translation keys in theme section files
    Translations(TranslationArgs),
}

#[derive(clap::Args, Debug)]
struct ShopArgs {
    /// Store domain, e.g. my-shop.myshopify.com
    #[arg(long, env = ENV_STORE)]
    store: Option<String>,

    /// Admin API access token
    #[arg(long, env = ENV_ACCESS_TOKEN, hide_env_values = true)]
    token: Option<String>,

    /// Admin API version
    #[arg(long, env = ENV_API_VERSION)]
    api_version: Option<String>,

    /// Request timeout in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Fixed pause between requests in milliseconds
    #[arg(long)]
    delay_ms: Option<u64>,

    /// Catalog file (JSON or YAML) replacing the built-in one
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Send requests to this origin instead of https://{store}
    #[arg(long, hide = true)]
    base_url: Option<String>,
}

impl ShopArgs {
    fn overrides(&self) -> Overrides {
        Overrides {
            store: self.store.clone(),
            access_token: self.token.clone(),
            api_version: self.api_version.clone(),
            timeout_secs: self.timeout_secs,
            delay_ms: self.delay_ms,
            base_url: self.base_url.clone(),
        }
    }
}

#[derive(clap::Args, Debug)]
struct TranslationArgs {
    /// Directory containing the section files
    #[arg(long, default_value = translations::DEFAULT_SECTIONS_DIR)]
    dir: PathBuf,

    /// Extension of the files to process
    #[arg(long, default_value = translations::DEFAULT_EXTENSION)]
    extension: String,

    /// JSON mapping file replacing the built-in one
    #[arg(long)]
    mapping: Option<PathBuf>,

    /// Report changes without writing files
    #[arg(long)]
    dry_run: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn as_directive(self) -> Option<&'static str> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some("error"),
            LogLevel::Warn => Some("warn"),
            LogLevel::Info => Some("info"),
            LogLevel::Debug => Some("debug"),
            LogLevel::Trace => Some("trace"),
        }
    }
}

fn setup_logging(level: LogLevel) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let directive = level.as_directive()?;

    let log_path = get_log_path();

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let file = match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
    {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Warning: cannot open log file {:?}: {}", log_path, e);
            return None;
        }
    };

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    // RUST_LOG takes precedence over --log-level
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(non_blocking.with_max_level(tracing::Level::TRACE))
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("sfops started with log level: {:?}", level);
    tracing::info!("Log file: {:?}", log_path);

    Some(guard)
}

fn get_log_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("storefront-ops").join("sfops.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".storefront-ops").join("sfops.log");
    }
    PathBuf::from("sfops.log")
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    let _log_guard = setup_logging(args.log_level);

    match &args.command {
        Command::Collections(shop) => {
            println!("🛒 Creating missing collections...");
            run_ensure(shop, args.config.as_deref(), BuiltinCatalog::Collections).await
        }
        Command::Page(shop) => {
            println!("📄 Creating Range Calculator page...");
            run_ensure(shop, args.config.as_deref(), BuiltinCatalog::Pages).await
        }
        Command::Translations(opts) => run_translations(opts),
    }
}

fn same_kind(a: &ResourceKind, b: &ResourceKind) -> bool {
    std::mem::discriminant(a) == std::mem::discriminant(b)
}

async fn run_ensure(
    shop: &ShopArgs,
    config_path: Option<&Path>,
    builtin: BuiltinCatalog,
) -> Result<ExitCode> {
    let config = match config_path {
        Some(path) => Config::load_from(path)?,
        None => Config::load(),
    };
    let settings = config.resolve(&shop.overrides())?;

    let default_catalog = builtin_catalog(builtin);
    let catalog: Catalog = match &shop.catalog {
        Some(path) => {
            let catalog = load_catalog_file(path)?;
            if !same_kind(&catalog.kind, &default_catalog.kind) {
                bail!(
                    "Catalog {} holds {} resources, expected {}",
                    path.display(),
                    catalog.kind.envelope(),
                    default_catalog.kind.envelope()
                );
            }
            catalog
        }
        None => default_catalog.clone(),
    };

    tracing::info!(
        "Ensuring {} {} resources on {}",
        catalog.len(),
        catalog.kind.envelope(),
        settings.store
    );

    let client = AdminClient::new(&settings)?;
    let ensurer = ResourceEnsurer::new(client, catalog.kind.clone())?;
    let mut throttle = Throttle::new(&settings.throttle);
    println!();

    let report = run_batch(&ensurer, &catalog.resources, &mut throttle, |spec, outcome| {
        print_status(&ensurer, spec, outcome)
    })
    .await;

    print_summary(&report.summary);

    Ok(if report.summary.is_clean() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn print_status(ensurer: &ResourceEnsurer, spec: &ResourceSpec, outcome: &OperationOutcome) {
    let kind = ensurer.kind();
    match outcome {
        OperationOutcome::Created(created) => println!(
            "✅ Created {}: {} ({})",
            kind.envelope(),
            created.title,
            ensurer
                .client()
                .storefront_url(&kind.storefront_path(&created.handle))
        ),
        OperationOutcome::AlreadyExists => println!(
            "⚠️  {} already exists: {}",
            capitalize(kind.envelope()),
            spec.title
        ),
        OperationOutcome::Failed(err) => {
            println!("❌ Error creating {}: {}", spec.title, err);
            if let Some(hint) = err.status().and_then(status_hint) {
                println!("   {}", hint);
            }
        }
    }
}

fn print_summary(summary: &Summary) {
    println!();
    println!("📊 Summary:");
    println!("   ✅ Created: {}", summary.created);
    println!("   ⚠️  Already existed: {}", summary.already_exists);
    println!("   ❌ Failed: {}", summary.failed);
    println!("   📦 Total: {}", summary.total);
}

fn run_translations(opts: &TranslationArgs) -> Result<ExitCode> {
    let custom;
    let map = match &opts.mapping {
        Some(path) => {
            custom = TranslationMap::load(path)?;
            &custom
        }
        None => TranslationMap::builtin(),
    };

    println!(
        "🔧 Processing .{} files in {} ({} keys)...",
        opts.extension.trim_start_matches('.'),
        opts.dir.display(),
        map.len()
    );
    println!();

    let report = translations::fix_directory(
        &opts.dir,
        &opts.extension,
        map,
        opts.dry_run,
        |path, changed| {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            if changed {
                println!("  ✅ Fixed translation keys in {}", name);
            } else {
                println!("  ✓ No changes needed in {}", name);
            }
        },
    )?;

    println!();
    let verb = if opts.dry_run { "Would fix" } else { "Fixed" };
    println!(
        "🎉 Complete! {} translation keys in {}/{} files",
        verb,
        report.fixed.len(),
        report.scanned
    );

    Ok(ExitCode::SUCCESS)
}
