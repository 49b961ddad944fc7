//! Ingest FTP daemon - Entry Point

use log::{error, info, warn};
use std::sync::Arc;

use ingest_ftpd::auth::CredentialStore;
use ingest_ftpd::error::ServerError;
use ingest_ftpd::hooks::{CommandHook, NoopHook, PostProcessHook};
use ingest_ftpd::{Server, ServerConfig};

#[tokio::main]
async fn main() {
    // Initialize the logger (env_logger picks up RUST_LOG environment variable)
    env_logger::init();

    info!("Launching ingest FTP daemon...");

    if let Err(e) = run().await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), ServerError> {
    let config = ServerConfig::load()?;

    let auth = Arc::new(CredentialStore::from_entries(&config.users));
    if auth.is_empty() {
        warn!("No users configured; every login will be refused");
    } else {
        info!("Loaded {} user(s)", auth.len());
    }

    let hook: Arc<dyn PostProcessHook> = match &config.post_process_command {
        Some(program) => {
            info!("Post-process hook: {} {:?}", program, config.post_process_args);
            Arc::new(CommandHook::new(program.clone()).with_args(config.post_process_args.clone()))
        }
        None => Arc::new(NoopHook),
    };

    let server = Server::bind(config, auth, hook).await?;
    let coordinator = server.coordinator();
    let acceptor = server.start()?;

    tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                warn!("Failed to listen for interrupt: {}", e);
            }
            info!("Interrupt received, shutting down");
        }
        _ = acceptor.join => warn!("Acceptor stopped, shutting down"),
    }

    if coordinator.shutdown().await {
        info!("All connections closed");
    } else {
        warn!("Some connections were still live when shutdown gave up");
    }

    Ok(())
}
