use anyhow::{Context, Result};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use t1_session_core::config::Config;
use t1_session_core::extensions::{MenuItem, ToolbarAction};
use t1_session_core::models::AppState;
use t1_session_core::platform::NativePlatform;
use tracing::Level;
use tracing_subscriber::{filter::EnvFilter, fmt::format::FmtSpan, FmtSubscriber};

const RESOLUTION_TIMEOUT: Duration = Duration::from_secs(10);

fn setup_logging(log_level_str: &str) {
    let level = match log_level_str.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("t1_session_core={},t1_actions={}", level, level)));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_ansi(false)
        .with_writer(std::io::stderr)
        .with_level(true)
        .with_span_events(FmtSpan::CLOSE)
        .json()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ResolvedAction {
    #[serde(flatten)]
    action: ToolbarAction,
    menu: Vec<MenuItem>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Report {
    current_dir: String,
    actions: Vec<ResolvedAction>,
}

/// Resolves the toolbar a new tab would show for a directory and prints it,
/// menus included, as JSON.
#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;
    setup_logging(&config.log_level);
    tracing::info!(version = %env!("CARGO_PKG_VERSION"), "Starting t1-actions");
    tracing::debug!("Loaded configuration: {:?}", config);

    if which::which("git").is_err() {
        tracing::warn!("git is not installed or not in PATH. The git toolbar action will never show.");
    }

    let target = match std::env::args().nth(1) {
        Some(arg) => t1_session_core::config::expand_tilde(&arg)?,
        None => std::env::current_dir().context("Failed to read current directory")?,
    };
    let target = dunce::canonicalize(&target).with_context(|| format!("No such directory: {}", target.display()))?;
    if !target.is_dir() {
        anyhow::bail!("Not a directory: {}", target.display());
    }
    let current_dir = target.to_string_lossy().into_owned();

    let config = Arc::new(config);
    let platform = Arc::new(NativePlatform::new(&config));
    let app_state = AppState::new(config.clone(), platform);
    app_state.init().await;

    let session = app_state.session_manager().new_tab(Some(current_dir.clone()));
    let mut toolbar_rx = session.subscribe_toolbar_actions();
    session.set_cwd(current_dir.clone());

    tokio::time::timeout(RESOLUTION_TIMEOUT, toolbar_rx.changed())
        .await
        .context("Timed out resolving toolbar actions")?
        .context("Session closed before the toolbar resolved")?;

    let mut actions = Vec::new();
    for action in session.toolbar_actions().iter() {
        let menu = app_state.trigger_action(action).await;
        actions.push(ResolvedAction {
            action: action.clone(),
            menu,
        });
    }

    let report = Report { current_dir, actions };
    println!("{}", serde_json::to_string_pretty(&report)?);

    app_state.session_manager().close_active_tab();
    app_state.shutdown();
    tracing::info!("Done.");
    Ok(())
}
