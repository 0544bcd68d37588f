//! flatcms server
//!
//! Serves the document index, viewer, editor, and account pages.
//!
//! # Configuration
//!
//! Environment variables:
//! - `FLATCMS_PORT`: Port to listen on (default: 4567)
//! - `FLATCMS_DATA_DIR`: Directory holding documents (default: ~/.local/share/flatcms/data)
//! - `FLATCMS_CREDENTIALS`: Credential file (default: ~/.local/share/flatcms/users.yml)
//! - `FLATCMS_SESSION_MINUTES`: Idle minutes before sign-out (default: 1440)
//!
//! # Config File Format
//!
//! ```yaml
//! data_dir: /srv/flatcms/data
//! credentials_path: /srv/flatcms/users.yml
//! port: 4567
//! session_minutes: 1440
//! ```

use clap::Parser;
use flatcms::cms::{CredentialStore, DocumentRepository};
use flatcms::server::{router, AppState, SessionStore};
use flatcms::Config;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// How often expired sessions are swept.
const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Parser)]
#[command(name = "flatcms-server")]
#[command(version)]
#[command(about = "Flat-file content manager", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Port to listen on (overrides config)
    #[arg(long, short)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "flatcms=info,flatcms_server=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = run().await {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = Config::load(cli.config)?;
    if let Some(port) = cli.port {
        config.port = port;
    }

    let repo = DocumentRepository::new(&config.data_dir);
    repo.ensure_dir()?;

    let credentials = CredentialStore::new(&config.credentials_path);
    credentials.ensure_exists()?;

    tracing::info!("Data directory: {}", config.data_dir.display());
    tracing::info!("Credential store: {}", config.credentials_path.display());

    let sessions = Arc::new(SessionStore::new(config.session_minutes));

    // Sweep expired sessions in the background
    let sweeper = Arc::clone(&sessions);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SESSION_SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            let removed = sweeper.cleanup_expired();
            if removed > 0 {
                tracing::debug!("Removed {} expired session(s)", removed);
            }
        }
    });

    let state = AppState {
        repo,
        credentials,
        sessions,
    };

    let app = router(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
