//! Main entrypoint for the Cohost voice agent.
//!
//! This binary is responsible for:
//! 1. Loading configuration from the environment and the command line.
//! 2. Merging saved settings with command line overrides.
//! 3. Connecting to the realtime API and running the dialogue engine until
//!    the session ends.

use anyhow::Context;
use clap::Parser;
use cohost_service::{
    cli::Cli,
    config::Config,
    runtime::run_session,
    settings::SettingsStore,
};
use openai_realtime::RealtimeConfig;
use tracing::info;
use tracing_subscriber::{EnvFilter, filter::LevelFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // --- 1. Load Configuration ---
    let config = Config::from_env().context("Failed to load configuration")?;

    // --- 2. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(
            LevelFilter::from_level(config.log_level).to_string(),
        ))
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .init();

    // --- 3. Resolve Settings ---
    let store = SettingsStore::new(&config.settings_path);
    if cli.clear_settings {
        store.clear().context("Failed to clear saved settings")?;
        info!(path = %store.path().display(), "Saved settings cleared");
    }
    let mut settings = store.load_or_default();
    cli.apply(&mut settings)?;
    if cli.save {
        store.save(&settings).context("Failed to save settings")?;
    }

    let Config {
        openai_api_key,
        tavily_api_key,
        realtime_url,
        ..
    } = config;
    let session = settings.to_session_config(tavily_api_key);
    let realtime = RealtimeConfig::new(openai_api_key, session.model.clone()).with_url(realtime_url);

    // --- 4. Run Session ---
    info!(
        agent = %session.agent_name(),
        model = %session.model,
        voice = %session.voice,
        web_search = session.has_search_credential(),
        "Agent configured. Connecting..."
    );
    run_session(realtime, session, cli.audio_stdin).await?;

    info!("Session has ended.");
    Ok(())
}
