use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use eyre::{Result, WrapErr};
use log::{debug, info, warn};

mod cli;

use cli::Cli;
use necture::config::{API_KEY_ENV, Config, DOTENV_FILE, Settings};
use necture::notes::GeminiClient;
use necture::shell::Shell;
use necture::youtube::YouTubeCaptions;

fn setup_logging() -> Result<()> {
    let log_dir = log_dir();
    std::fs::create_dir_all(&log_dir)?;
    let log_file = log_dir.join("necture.log");

    let target = Box::new(std::fs::OpenOptions::new().create(true).append(true).open(&log_file)?);

    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized: {}", log_file.display());
    Ok(())
}

fn log_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("necture")
        .join("logs")
}

fn build_after_help() -> String {
    let key_line = if std::env::var(API_KEY_ENV).is_ok_and(|k| !k.trim().is_empty()) {
        format!("  \x1b[32m✅\x1b[0m {API_KEY_ENV}")
    } else {
        format!("  \x1b[31m❌\x1b[0m {API_KEY_ENV} (not set; note generation will fail until it is)")
    };

    let log_path = log_dir().join("necture.log");

    format!(
        "\nCREDENTIALS:\n{key_line}\n\nConfig is read from: {}\nLogs are written to: {}",
        necture::config::config_path().display(),
        log_path.display()
    )
}

/// Resolve settings: CLI flags over environment over config file over defaults
fn resolve_settings(cli: &Cli) -> Settings {
    let loaded = match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    };

    // Config file is optional; a broken one falls back to defaults
    let config = loaded.unwrap_or_else(|e| {
        warn!("Ignoring config file: {e:#}");
        Config::default()
    });

    let mut settings = Settings::from_env(config);
    if let Some(bind) = &cli.bind {
        settings.bind = bind.clone();
    }
    if let Some(model) = &cli.model {
        settings.model = model.clone();
    }
    if let Some(lang) = &cli.lang {
        settings.lang = lang.clone();
    }
    settings
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env may set RUST_LOG
    let dotenv = necture::config::load_dotenv(Path::new(DOTENV_FILE));
    setup_logging()?;
    match dotenv {
        Ok(true) => debug!("Loaded environment from {DOTENV_FILE}"),
        Ok(false) => debug!("No {DOTENV_FILE} file found"),
        Err(e) => warn!("Ignoring {DOTENV_FILE}: {e:#}"),
    }

    let after_help = build_after_help();
    let cmd = <Cli as clap::CommandFactory>::command().after_help(after_help);
    let matches = cmd.get_matches();
    let cli = <Cli as clap::FromArgMatches>::from_arg_matches(&matches)?;

    let settings = resolve_settings(&cli);
    debug!(
        "Settings: model={} lang={} bind={} api_key_set={}",
        settings.model,
        settings.lang,
        settings.bind,
        settings.gemini_api_key.is_some()
    );

    if cli.verbose {
        let config_path = cli.config.clone().unwrap_or_else(necture::config::config_path);
        if config_path.exists() {
            eprintln!("Config: {}", config_path.display());
        }
        eprintln!("Model: {}", settings.model);
        eprintln!("Language: {}", settings.lang);
        if settings.gemini_api_key.is_none() {
            eprintln!("Warning: {API_KEY_ENV} is not set; note generation will fail");
        }
    }

    let addr: SocketAddr = settings
        .bind
        .parse()
        .wrap_err_with(|| format!("invalid bind address: {}", settings.bind))?;

    let client = reqwest::Client::new();
    let transcripts = Arc::new(YouTubeCaptions::new(client.clone(), settings.lang.clone()));
    let model = Arc::new(GeminiClient::new(client, &settings));
    let shell = Shell::new(transcripts, model);

    eprintln!("Necture running at http://{addr}");
    necture::server::serve(addr, shell).await
}
