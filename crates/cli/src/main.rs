//! CLI entrypoint and subcommand orchestration.

mod config;
mod discover;
#[cfg(test)]
mod test_support;
mod tui;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use config::{Config, ENV_VARS};
use discover::LocalModel;

#[cfg(not(test))]
use std::sync::Arc;

use anyhow::Context;

#[cfg(not(test))]
use catalog::{HubClient, ModelCatalog};
#[cfg(not(test))]
use tracing::info;
#[cfg(not(test))]
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Top-level command-line arguments for lload.
#[derive(Parser)]
#[command(name = "lload")]
#[command(about = "Terminal launcher for local and remote llama.cpp models", version)]
struct Cli {
    /// Path to config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory scanned for model files (overrides config)
    #[arg(short, long)]
    models_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// CLI subcommands available in the application.
#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Commands {
    /// Start the full-screen launcher (default when no subcommand is given)
    Tui,
    /// List model files in the models directory and exit
    List,
    /// Print the effective configuration and recognised environment variables
    Config,
    /// Print the version and exit
    Version,
}

#[cfg(not(test))]
#[tokio::main]
/// Program entrypoint.
async fn main() -> anyhow::Result<()> {
    let mut cli = Cli::parse();
    let command = cli.command.take().unwrap_or(Commands::Tui);
    let is_tui = command == Commands::Tui;

    // Runs before the TUI takes the terminal so the error reaches stderr.
    let config = resolve_config(&cli)?;

    // Console output is suppressed in TUI mode so it cannot corrupt the display.
    let console_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    // WorkerGuard must outlive main() so buffered file writes are flushed on exit.
    let _file_guard: Option<tracing_appender::non_blocking::WorkerGuard>;

    let file_writer = match config.log_file_path().and_then(split_log_path) {
        Some((dir, name)) => {
            std::fs::create_dir_all(&dir).ok();
            let appender = tracing_appender::rolling::never(&dir, name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            _file_guard = Some(guard);
            Some(writer)
        }
        None => {
            _file_guard = None;
            None
        }
    };

    match (is_tui, file_writer) {
        (true, Some(writer)) => {
            let console = fmt::layer()
                .with_writer(std::io::sink)
                .with_target(false)
                .with_filter(console_filter);
            let file = fmt::layer()
                .with_writer(writer)
                .with_target(true)
                .with_ansi(false)
                .with_filter(EnvFilter::new(&config.log_level));
            tracing_subscriber::registry()
                .with(console)
                .with(file)
                .init();
        }
        (true, None) => {
            fmt()
                .with_env_filter(console_filter)
                .with_writer(std::io::sink)
                .with_target(false)
                .init();
        }
        (false, Some(writer)) => {
            let console = fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_filter(console_filter);
            let file = fmt::layer()
                .with_writer(writer)
                .with_target(true)
                .with_ansi(false)
                .with_filter(EnvFilter::new(&config.log_level));
            tracing_subscriber::registry()
                .with(console)
                .with(file)
                .init();
        }
        (false, None) => {
            fmt()
                .with_env_filter(console_filter)
                .with_writer(std::io::stderr)
                .with_target(false)
                .init();
        }
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        command = ?command,
        models_dir = %config.models_dir.display(),
        "========== lload session start =========="
    );

    match command {
        Commands::Tui => cmd_tui(config).await,
        Commands::List => cmd_list(&config),
        Commands::Config => {
            print!("{}", format_config_report(&config));
            Ok(())
        }
        Commands::Version => {
            println!("lload version {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

#[cfg(not(test))]
/// Starts the full-screen launcher.
async fn cmd_tui(config: Config) -> anyhow::Result<()> {
    let local_models = load_local_models(&config)?;
    let hub = HubClient::with_endpoint(&config.catalog.endpoint)
        .context("failed to build catalog client")?
        .with_token(config.catalog_token())
        .with_search_limit(config.catalog.search_limit);
    let catalog: Arc<dyn ModelCatalog> = Arc::new(hub);
    tui::run_tui(&config, local_models, catalog).await
}

#[cfg(not(test))]
/// Prints the models directory listing.
fn cmd_list(config: &Config) -> anyhow::Result<()> {
    let models = load_local_models(config)?;
    print!("{}", format_model_table(&models));
    Ok(())
}

#[cfg(not(test))]
/// Lists the models directory; failure to read it is fatal.
fn load_local_models(config: &Config) -> anyhow::Result<Vec<LocalModel>> {
    let models = discover::discover_models(&config.models_dir)
        .with_context(|| format!("cannot list models in {}", config.models_dir.display()))?;
    info!(count = models.len(), dir = %config.models_dir.display(), "Local models discovered");
    Ok(models)
}

/// Loads the configuration and applies command-line overrides. A malformed
/// file, a missing `--config` path or a bad environment value is fatal.
fn resolve_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = Config::load(cli.config.as_deref()).with_context(|| match &cli.config {
        Some(path) => format!("failed to load config from {}", path.display()),
        None => "failed to load config".to_string(),
    })?;
    if let Some(dir) = &cli.models_dir {
        config.models_dir = dir.clone();
    }
    if cli.verbose {
        config.log_level = "debug".to_string();
    }
    Ok(config)
}

/// Splits a log file path into the directory and file name the appender needs.
fn split_log_path(path: &std::path::Path) -> Option<(PathBuf, String)> {
    let name = path.file_name()?.to_string_lossy().into_owned();
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    Some((dir, name))
}

/// Renders the `list` subcommand output.
fn format_model_table(models: &[LocalModel]) -> String {
    if models.is_empty() {
        return "No models found.\n".to_string();
    }
    let name_width = models
        .iter()
        .map(|m| m.name.chars().count())
        .max()
        .unwrap_or(0)
        .max("NAME".len());
    let sizes: Vec<String> = models
        .iter()
        .map(|m| format!("{:.2} MB", m.size_mb()))
        .collect();
    let size_width = sizes
        .iter()
        .map(String::len)
        .max()
        .unwrap_or(0)
        .max("SIZE".len());

    let mut out = format!("{:<name_width$}  {:>size_width$}  PATH\n", "NAME", "SIZE");
    for (model, size) in models.iter().zip(&sizes) {
        out.push_str(&format!(
            "{:<name_width$}  {:>size_width$}  {}\n",
            model.name,
            size,
            model.path.display()
        ));
    }
    out
}

/// Renders the `config` subcommand output.
fn format_config_report(config: &Config) -> String {
    let source = config
        .source
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "(defaults)".to_string());
    let token = if config.catalog_token().is_some() {
        "set"
    } else {
        "not set"
    };
    let log_file = config
        .log_file_path()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "(disabled)".to_string());

    let mut out = String::new();
    out.push_str(&format!("Config file:      {source}\n"));
    out.push_str(&format!("Models dir:       {}\n", config.models_dir.display()));
    out.push_str(&format!("Default NGL:      {}\n", config.default_ngl));
    out.push_str(&format!("Default CtxSize:  {}\n", config.default_ctx_size));
    out.push_str(&format!("Server template:  {}\n", config.server_template));
    out.push_str(&format!("CLI template:     {}\n", config.cli_template));
    out.push_str(&format!("Catalog endpoint: {}\n", config.catalog.endpoint));
    out.push_str(&format!("Catalog token:    {token}\n"));
    out.push_str(&format!("Search limit:     {}\n", config.catalog.search_limit));
    out.push_str(&format!("Log level:        {}\n", config.log_level));
    out.push_str(&format!("Log file:         {log_file}\n"));
    out.push_str("\nEnvironment variables:\n");
    for (name, description) in ENV_VARS {
        out.push_str(&format!("  {name:<24}{description}\n"));
    }
    out
}
