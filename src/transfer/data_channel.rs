//! Module `data_channel`
//!
//! Opens the one data connection used by a single STOR, LIST or NLST.
//! Passive mode accepts the first inbound connection on the PASV listener;
//! active mode dials the address recorded by PORT. Every wait is bounded by
//! the session's inactivity timeout.

use log::{debug, info, warn};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::error::TransferError;
use crate::transfer::DataMode;

/// Produces exactly one data socket for the current mode.
///
/// The caller owns the returned stream and must close it with
/// [`close_data_channel`] before sending the transfer's final reply.
pub async fn open_data_channel(
    mode: &DataMode,
    idle_timeout: Duration,
) -> Result<TcpStream, TransferError> {
    match mode {
        DataMode::None => Err(TransferError::NoDataConnection),
        DataMode::Passive(listener) => {
            debug!("Waiting for passive data connection ({})", mode.describe());
            let (stream, peer) = timeout(idle_timeout, listener.accept())
                .await
                .map_err(|_| TransferError::AcceptTimeout)??;
            info!("Passive data connection accepted from {}", peer);
            Ok(stream)
        }
        DataMode::Active(target) => {
            debug!("Dialing active data connection to {}", target);
            let stream = timeout(idle_timeout, TcpStream::connect(*target))
                .await
                .map_err(|_| TransferError::ConnectTimeout(*target))?
                .map_err(|e| TransferError::ConnectFailed(*target, e))?;
            info!("Active data connection established to {}", target);
            Ok(stream)
        }
    }
}

/// Closes a data socket. The peer sees end-of-data once this returns.
pub async fn close_data_channel(mut stream: TcpStream) {
    if let Err(e) = stream.shutdown().await {
        warn!("Error shutting down data connection: {}", e);
    }
    drop(stream);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    use crate::transfer::setup_passive_mode;

    #[tokio::test]
    async fn no_mode_means_no_data_channel() {
        let result = open_data_channel(&DataMode::None, Duration::from_secs(1)).await;
        assert!(matches!(result, Err(TransferError::NoDataConnection)));
    }

    #[tokio::test]
    async fn passive_accept_times_out() {
        let mut mode = DataMode::None;
        setup_passive_mode(&mut mode, IpAddr::V4(Ipv4Addr::LOCALHOST))
            .await
            .unwrap();
        let result = open_data_channel(&mode, Duration::from_millis(50)).await;
        assert!(matches!(result, Err(TransferError::AcceptTimeout)));
    }

    #[tokio::test]
    async fn active_mode_dials_and_close_signals_eof() {
        let client = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let mode = DataMode::Active(client.local_addr().unwrap());

        let (server_side, accepted) = tokio::join!(
            open_data_channel(&mode, Duration::from_secs(2)),
            client.accept()
        );
        let (mut client_side, _) = accepted.unwrap();

        close_data_channel(server_side.unwrap()).await;

        let mut buf = Vec::new();
        let n = client_side.read_to_end(&mut buf).await.unwrap();
        assert_eq!(n, 0);
    }
}
