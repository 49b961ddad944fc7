//! Module `file_ops`
//!
//! Moves bytes across an open data connection: uploads land in a `.part`
//! file that is renamed into place once the client closes its side.

use log::{debug, error, info, warn};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs::{self, File};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::error::TransferError;

const BUFFER_SIZE: usize = 8192;

fn part_path(target: &Path) -> PathBuf {
    let mut name = target.as_os_str().to_os_string();
    name.push(".part");
    PathBuf::from(name)
}

/// Removes the partial upload unless it was renamed into place, including
/// when the transfer future is dropped mid-stream.
struct PartFile {
    path: PathBuf,
    keep: bool,
}

impl PartFile {
    fn new(target: &Path) -> Self {
        Self {
            path: part_path(target),
            keep: false,
        }
    }
}

impl Drop for PartFile {
    fn drop(&mut self) {
        if self.keep {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("Removed partial upload {}", self.path.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!("Cannot remove partial upload {}: {}", self.path.display(), e),
        }
    }
}

/// Streams everything the client sends on `data` into `target`.
///
/// Returns the number of bytes stored. The partial file never outlives a
/// failed or abandoned upload.
pub async fn receive_upload(
    data: &mut TcpStream,
    target: &Path,
    max_bytes: u64,
    idle_timeout: Duration,
) -> Result<u64, TransferError> {
    let mut part = PartFile::new(target);
    info!("Starting upload: {} -> {}", part.path.display(), target.display());

    let total = match copy_to_file(data, &part.path, max_bytes, idle_timeout).await {
        Ok(total) => total,
        Err(e) => {
            error!("Upload to {} failed: {}", target.display(), e);
            return Err(e);
        }
    };

    if let Err(e) = fs::rename(&part.path, target).await {
        error!("Failed to rename {} to {}: {}", part.path.display(), target.display(), e);
        return Err(TransferError::Io(e));
    }
    part.keep = true;

    info!("Upload completed: {} ({} bytes)", target.display(), total);
    Ok(total)
}

async fn copy_to_file(
    data: &mut TcpStream,
    temp: &Path,
    max_bytes: u64,
    idle_timeout: Duration,
) -> Result<u64, TransferError> {
    let mut file = File::create(temp).await?;
    let mut buffer = vec![0u8; BUFFER_SIZE];
    let mut total = 0u64;

    loop {
        let n = timeout(idle_timeout, data.read(&mut buffer))
            .await
            .map_err(|_| TransferError::ReadTimeout)??;
        if n == 0 {
            break;
        }

        total += n as u64;
        if total > max_bytes {
            return Err(TransferError::FileTooLarge(max_bytes));
        }

        file.write_all(&buffer[..n]).await?;
    }

    file.flush().await?;
    file.sync_all().await?;
    Ok(total)
}

/// Writes listing lines to the data connection, one `\n`-terminated line each.
pub async fn send_listing(
    data: &mut TcpStream,
    lines: &[&str],
    idle_timeout: Duration,
) -> Result<(), TransferError> {
    let mut payload = Vec::new();
    for line in lines {
        payload.extend_from_slice(line.as_bytes());
        payload.push(b'\n');
    }

    timeout(idle_timeout, data.write_all(&payload))
        .await
        .map_err(|_| TransferError::WriteTimeout)??;
    timeout(idle_timeout, data.flush())
        .await
        .map_err(|_| TransferError::WriteTimeout)??;
    Ok(())
}
