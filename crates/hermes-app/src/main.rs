mod cli;
mod repl;

use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let args = cli::parse();

    // Initialize logging
    let directive = args.log_level.as_deref().unwrap_or("hermes=info");
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(
                directive
                    .parse()
                    .unwrap_or_else(|_| "hermes=info".parse().unwrap()),
            ),
        )
        .init();

    tracing::info!("Hermes v{} starting...", env!("CARGO_PKG_VERSION"));

    let paths = match &args.config_dir {
        Some(dir) => hermes_config::StoragePaths::in_dir(dir.clone()),
        None => match hermes_config::StoragePaths::default_locations() {
            Ok(paths) => paths,
            Err(e) => {
                tracing::error!("cannot resolve a config directory: {e}");
                return;
            }
        },
    };

    let settings = hermes_config::load_settings(&paths.settings).unwrap_or_else(|e| {
        tracing::warn!("settings load failed, using defaults: {e}");
        hermes_config::Settings::default()
    });

    let sessions = hermes_config::load_sessions(&paths.sessions).unwrap_or_else(|e| {
        tracing::warn!("session history unreadable, starting empty: {e}");
        Vec::new()
    });
    tracing::info!("loaded {} session(s)", sessions.len());

    if let Err(e) = repl::run(settings, sessions, paths).await {
        tracing::error!("fatal: {e}");
    }
    tracing::info!("Shutdown complete");
}
