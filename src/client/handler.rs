//! Session worker
//!
//! Runs the command loop for one control connection until QUIT, EOF, an
//! inactivity timeout, a control-channel error, or a shutdown signal.

use log::{info, warn};
use std::sync::Arc;
use tokio::net::TcpStream;

use crate::client::{ControlChannel, Inbound, Session, SessionContext};
use crate::error::{CommandError, SessionError, fault_reply};
use crate::protocol::responses::{LINE_TOO_LONG, READY};
use crate::protocol::{CommandResult, CommandStatus, Reply, dispatch, parse_command};
use crate::shutdown::CancelSignal;

/// Serves one accepted connection; everything it owns is released on return.
pub async fn run_session(stream: TcpStream, context: Arc<SessionContext>, mut cancel: CancelSignal) {
    let (peer, local) = match (stream.peer_addr(), stream.local_addr()) {
        (Ok(peer), Ok(local)) => (peer, local),
        (Err(e), _) | (_, Err(e)) => {
            warn!("Dropping connection with unknown address: {}", e);
            return;
        }
    };

    let idle = context.idle_timeout();
    let max_line = context.config.max_command_length;
    let mut control = match ControlChannel::new(stream, idle, max_line) {
        Ok(control) => control,
        Err(e) => {
            warn!("Failed to set up control channel for {}: {}", peer, e);
            return;
        }
    };
    let mut session = Session::new(peer, local, context);

    match serve(&mut session, &mut control, &mut cancel).await {
        Ok(()) => info!("Connection closed by client {}", peer),
        Err(SessionError::Shutdown) => info!("Session {} stopped by shutdown", peer),
        Err(SessionError::Timeout) => info!("Session {} timed out", peer),
        Err(e) => warn!("Forced session exit for {}: {}", peer, e),
    }

    session.release();
    control.close().await;
    info!("Client {} disconnected", peer);
}

async fn serve(
    session: &mut Session,
    control: &mut ControlChannel,
    cancel: &mut CancelSignal,
) -> Result<(), SessionError> {
    let greeting = Reply::new(READY, session.context().config.greeting.clone());
    control.send(&greeting).await?;
    info!("{} {}", session.peer(), greeting);

    loop {
        let inbound = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(SessionError::Shutdown),
            inbound = control.read_command_line() => inbound?,
        };

        let line = match inbound {
            Inbound::Line(line) => line,
            Inbound::Eof => return Ok(()),
            Inbound::TooLong => {
                control.send(&Reply::new(LINE_TOO_LONG, "Command line too long")).await?;
                continue;
            }
        };

        let command = parse_command(&line);
        info!("{}@{} {}", session.user_label(), session.peer(), command.log_line());

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(SessionError::Shutdown),
            outcome = dispatch(session, control, &command) => outcome,
        };

        let result = match outcome {
            Ok(result) => result,
            Err(CommandError::Session(e)) => return Err(e),
            Err(e) => CommandResult::reply(fault_reply(session.peer(), &e)),
        };

        control.send(&result.reply).await?;
        info!("\t{}", result.reply);

        if result.status == CommandStatus::CloseConnection {
            return Ok(());
        }
    }
}
