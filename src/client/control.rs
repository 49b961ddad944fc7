//! Module `control`
//!
//! The control connection: line reads and reply writes, each bounded by the
//! inactivity timeout. A timeout or I/O error here ends the session.

use log::debug;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::time::timeout;

use crate::error::SessionError;
use crate::protocol::{Reply, decode_line};

/// What the next read from the control connection produced.
#[derive(Debug, PartialEq, Eq)]
pub enum Inbound {
    Line(String),
    /// The line exceeded the configured limit and was discarded
    TooLong,
    Eof,
}

pub struct ControlChannel {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    peer: SocketAddr,
    idle_timeout: Duration,
    max_line: usize,
    closed: bool,
}

impl ControlChannel {
    pub fn new(stream: TcpStream, idle_timeout: Duration, max_line: usize) -> std::io::Result<Self> {
        let peer = stream.peer_addr()?;
        let (read_half, write_half) = stream.into_split();
        Ok(Self {
            reader: BufReader::new(read_half),
            writer: write_half,
            peer,
            idle_timeout,
            max_line,
            closed: false,
        })
    }

    /// Reads the next command line.
    pub async fn read_command_line(&mut self) -> Result<Inbound, SessionError> {
        // room for the line terminator
        let limit = self.max_line as u64 + 2;
        let mut buf = Vec::new();

        if self.read_limited(&mut buf, limit).await? == 0 {
            return Ok(Inbound::Eof);
        }

        if buf.last() == Some(&b'\n') || (buf.len() as u64) < limit {
            return Ok(Inbound::Line(decode_line(&buf)));
        }

        loop {
            buf.clear();
            let n = self.read_limited(&mut buf, limit).await?;
            if n == 0 || buf.last() == Some(&b'\n') {
                break;
            }
        }
        debug!("Discarded overlong command line from {}", self.peer);
        Ok(Inbound::TooLong)
    }

    async fn read_limited(&mut self, buf: &mut Vec<u8>, limit: u64) -> Result<usize, SessionError> {
        let mut limited = (&mut self.reader).take(limit);
        timeout(self.idle_timeout, limited.read_until(b'\n', buf))
            .await
            .map_err(|_| SessionError::Timeout)?
            .map_err(SessionError::Io)
    }

    /// Writes one reply line.
    pub async fn send(&mut self, reply: &Reply) -> Result<(), SessionError> {
        let bytes = reply.encode();
        timeout(self.idle_timeout, self.writer.write_all(&bytes))
            .await
            .map_err(|_| SessionError::Timeout)??;
        Ok(())
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Shuts down the write side so the client sees the connection end.
    /// Errors are ignored and later calls do nothing.
    pub async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        let _ = timeout(self.idle_timeout, self.writer.shutdown()).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    async fn channel(max_line: usize, idle: Duration) -> (ControlChannel, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (client, accepted) = tokio::join!(TcpStream::connect(addr), listener.accept());
        let control = ControlChannel::new(accepted.unwrap().0, idle, max_line).unwrap();
        (control, client.unwrap())
    }

    #[tokio::test]
    async fn reads_lines_then_eof() {
        let (mut control, mut client) = channel(64, Duration::from_secs(2)).await;
        client.write_all(b"USER alice\r\nNOOP\n").await.unwrap();
        client.shutdown().await.unwrap();

        assert_eq!(control.read_command_line().await.unwrap(), Inbound::Line("USER alice".into()));
        assert_eq!(control.read_command_line().await.unwrap(), Inbound::Line("NOOP".into()));
        assert_eq!(control.read_command_line().await.unwrap(), Inbound::Eof);
    }

    #[tokio::test]
    async fn overlong_line_is_discarded() {
        let (mut control, mut client) = channel(16, Duration::from_secs(2)).await;
        let mut long = vec![b'A'; 100];
        long.extend_from_slice(b"\r\nNOOP\r\n");
        client.write_all(&long).await.unwrap();

        assert_eq!(control.read_command_line().await.unwrap(), Inbound::TooLong);
        assert_eq!(control.read_command_line().await.unwrap(), Inbound::Line("NOOP".into()));
    }

    #[tokio::test]
    async fn idle_read_times_out() {
        let (mut control, _client) = channel(64, Duration::from_millis(50)).await;
        let result = control.read_command_line().await;
        assert!(matches!(result, Err(SessionError::Timeout)));
    }
}
