use log::{error, info, warn};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

use crate::auth::AuthGateway;
use crate::client::{SessionContext, run_session};
use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::hooks::PostProcessHook;
use crate::shutdown::{CancelSignal, ShutdownCoordinator, Worker, WorkerKind};

/// The control listener plus everything sessions need.
pub struct Server {
    listener: TcpListener,
    local_addr: SocketAddr,
    context: Arc<SessionContext>,
    coordinator: ShutdownCoordinator,
}

impl Server {
    /// Validates the configuration, prepares the upload root and binds the
    /// control port.
    pub async fn bind(
        config: ServerConfig,
        auth: Arc<dyn AuthGateway>,
        hook: Arc<dyn PostProcessHook>,
    ) -> Result<Self, ServerError> {
        config.validate()?;

        tokio::fs::create_dir_all(config.upload_root_path())
            .await
            .map_err(ServerError::UploadRoot)?;
        info!("Upload root directory: {}", config.upload_root);

        let control_socket = config.control_socket();
        let listener = TcpListener::bind(&control_socket)
            .await
            .map_err(|e| ServerError::Bind(control_socket.clone(), e))?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| ServerError::Bind(control_socket.clone(), e))?;
        info!("Server bound to {}", local_addr);

        let coordinator = ShutdownCoordinator::from_config(&config);

        Ok(Self {
            listener,
            local_addr,
            context: Arc::new(SessionContext { config, auth, hook }),
            coordinator,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn coordinator(&self) -> ShutdownCoordinator {
        self.coordinator.clone()
    }

    /// Starts the acceptor as a supervised worker.
    pub fn start(self) -> Result<Worker, ServerError> {
        let coordinator = self.coordinator.clone();
        coordinator.spawn(WorkerKind::Acceptor, move |cancel| accept_loop(self, cancel))
    }
}

/// Accepts connections until cancelled or until accept fails; each
/// connection becomes a registered session worker. The listening socket is
/// released when the loop returns.
async fn accept_loop(server: Server, mut cancel: CancelSignal) {
    info!("Starting ingest FTP server on {}", server.local_addr);

    loop {
        let accepted = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!("Acceptor cancelled");
                break;
            }
            accepted = server.listener.accept() => accepted,
        };

        match accepted {
            Ok((stream, peer)) => {
                info!("Client connected: {}", peer);
                let context = Arc::clone(&server.context);
                let spawned = server
                    .coordinator
                    .spawn(WorkerKind::Session(peer), move |cancel| {
                        run_session(stream, context, cancel)
                    });
                if let Err(e) = spawned {
                    warn!("Refusing connection from {}: {}", peer, e);
                }
            }
            Err(e) => {
                error!("Error accepting connection: {}", e);
                break;
            }
        }
    }

    info!("Acceptor on {} stopped", server.local_addr);
}
