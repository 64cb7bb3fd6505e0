//! coches server binary.
//!
//! Usage: `coches-server [CONFIG_PATH]`. Without an argument the path comes
//! from `COCHES_CONFIG_PATH`, then `config.toml` in the working directory.

use coches_server::config::{self, Config, LoggingConfig};
use coches_server::{app, build_store, AppState};
use std::error::Error;
use std::net::SocketAddr;
use std::process::ExitCode;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG_PATH: &str = "config.toml";
const CONFIG_PATH_VAR: &str = "COCHES_CONFIG_PATH";

/// Where the config path came from.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ConfigSource {
    Argument(String),
    Environment(String),
    Fallback,
}

impl ConfigSource {
    /// Picks the first non-blank candidate: command-line argument, then the
    /// environment variable read through `lookup`.
    fn resolve<F>(arg: Option<String>, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let usable = |value: &String| !value.trim().is_empty();

        arg.filter(usable)
            .map(ConfigSource::Argument)
            .or_else(|| {
                lookup(CONFIG_PATH_VAR)
                    .filter(usable)
                    .map(ConfigSource::Environment)
            })
            .unwrap_or(ConfigSource::Fallback)
    }

    fn path(&self) -> &str {
        match self {
            ConfigSource::Argument(path) | ConfigSource::Environment(path) => path,
            ConfigSource::Fallback => DEFAULT_CONFIG_PATH,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            ConfigSource::Argument(_) => "argument",
            ConfigSource::Environment(_) => CONFIG_PATH_VAR,
            ConfigSource::Fallback => "default",
        }
    }
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_new(&logging.level).unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let source = ConfigSource::resolve(std::env::args().nth(1), |key| std::env::var(key).ok());

    let config = match config::load_config(Some(source.path())) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("coches-server: cannot load {}: {e}", source.path());
            return ExitCode::FAILURE;
        }
    };

    init_tracing(&config.logging);
    tracing::info!(source = source.label(), path = source.path(), "configuration loaded");

    match serve(config).await {
        Ok(()) => {
            tracing::info!("coches server stopped");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "coches server failed");
            ExitCode::FAILURE
        }
    }
}

async fn serve(config: Config) -> Result<(), Box<dyn Error>> {
    let store = build_store(&config)?;
    let router = app(AppState::new(store, config.api.require_anio));

    let addr = SocketAddr::new(config.server.host, config.server.port);
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, backend = ?config.store.backend, "listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let signal = wait_for_shutdown().await;
            tracing::info!(signal, "draining connections before exit");
        })
        .await?;

    Ok(())
}

/// Resolves with the name of the first termination signal received. A
/// listener that cannot be installed never fires.
async fn wait_for_shutdown() -> &'static str {
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "SIGINT listener unavailable");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "SIGTERM listener unavailable");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = interrupt => "SIGINT",
        () = terminate => "SIGTERM",
    }
}
