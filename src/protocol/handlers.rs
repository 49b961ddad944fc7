//! Command handlers
//!
//! `dispatch` maps each verb to its handler. Handlers return the single
//! final reply for the command; only STOR/LIST/NLST also write a
//! preliminary 150 line. Login is enforced here, before any handler runs.

use log::{info, warn};

use crate::auth::credential_digest;
use crate::client::{ControlChannel, Session};
use crate::error::CommandError;
use crate::protocol::responses::*;
use crate::protocol::{Command, CommandResult, Reply, Verb};
use crate::storage::upload_target;
use crate::transfer::operations::passive_reply_text;
use crate::transfer::{
    close_data_channel, open_data_channel, receive_upload, send_listing, setup_active_mode,
    setup_passive_mode,
};

const NAME_LISTING: &[&str] = &[".", ".."];
const LONG_LISTING: &[&str] = &[
    "total 8.0k",
    "dr--r--r-- 1 owner group           213 Aug 26 16:31 .",
    "dr--r--r-- 1 owner group           213 Aug 26 16:31 ..",
];

/// Runs one command against the session.
///
/// An `Err` that is not `CommandError::Session` is turned into a 550 reply
/// by the caller; the session keeps going.
pub async fn dispatch(
    session: &mut Session,
    control: &mut ControlChannel,
    command: &Command,
) -> Result<CommandResult, CommandError> {
    if !command.verb.allowed_before_login() && !session.is_authenticated() {
        return Ok(CommandResult::reply(Reply::new(NOT_LOGGED_IN, "Not logged in")));
    }

    let arg = command.arg.as_str();
    let reply = match &command.verb {
        Verb::User => handle_cmd_user(session, arg),
        Verb::Pass => handle_cmd_pass(session, arg),
        Verb::Stor => handle_cmd_stor(session, control, arg).await?,
        Verb::Retr => Reply::new(DOWNLOAD_REFUSED, "Not likely"),
        Verb::List => handle_cmd_listing(session, control, LONG_LISTING).await?,
        Verb::Nlst => handle_cmd_listing(session, control, NAME_LISTING).await?,
        Verb::Pasv => handle_cmd_pasv(session).await?,
        Verb::Port => handle_cmd_port(session, arg)?,
        Verb::Type => accept_only(arg, "I", "Only binary transfers are supported"),
        Verb::Mode => accept_only(arg, "S", "Only stream mode is supported"),
        Verb::Stru => accept_only(arg, "F", "Only file structure is supported"),
        Verb::Syst => Reply::new(SYSTEM_TYPE, "UNIX"),
        Verb::Noop => Reply::ok(),
        Verb::Pwd => Reply::new(PATHNAME_CREATED, "\"/\" is current directory"),
        Verb::Quit => return Ok(CommandResult::close(Reply::new(OK, "Command okay GOOD BYE"))),
        Verb::Rest => Reply::new(NOT_IMPLEMENTED, "Sorry, no resuming"),
        Verb::Refused(_) => Reply::new(NOT_IMPLEMENTED, "File management is not supported"),
        Verb::Unknown(name) => Reply::new(NOT_IMPLEMENTED, format!("unimplemented {}", name)),
    };

    Ok(CommandResult::reply(reply))
}

/// USER: remember the name; any earlier login is dropped.
fn handle_cmd_user(session: &mut Session, username: &str) -> Reply {
    session.begin_login(username);
    Reply::new(PASSWORD_REQUIRED, "Password")
}

/// PASS: verify the pending username with the password digest.
fn handle_cmd_pass(session: &mut Session, password: &str) -> Reply {
    let Some(username) = session.take_pending_user() else {
        session.logout();
        warn!("PASS without USER from {}", session.peer());
        return Reply::new(NOT_LOGGED_IN, "Login Incorrect");
    };

    let digest = credential_digest(password);
    match session.context().auth.verify(&username, &digest) {
        Ok(identity) => {
            info!("{} logged in as {} from {}", username, identity, session.peer());
            session.login(identity);
            Reply::new(LOGIN_SUCCESS, "User logged in")
        }
        Err(e) => {
            session.logout();
            warn!("Login failed from {}: {}", session.peer(), e);
            Reply::new(NOT_LOGGED_IN, "Login Incorrect")
        }
    }
}

/// STOR: receive the upload over a fresh data connection.
async fn handle_cmd_stor(
    session: &mut Session,
    control: &mut ControlChannel,
    path: &str,
) -> Result<Reply, CommandError> {
    control
        .send(&Reply::new(TRANSFER_STARTING, "Binary data connection"))
        .await?;

    let Some(identity) = session.identity().cloned() else {
        return Ok(Reply::new(NOT_LOGGED_IN, "Not logged in"));
    };

    let context = session.context();
    let idle = context.idle_timeout();

    // the connection is consumed even when the name is refused, so it cannot
    // feed a later STOR on the same passive listener
    let mut data = open_data_channel(session.data_mode(), idle).await?;
    let target = match upload_target(&context.upload_root(), &identity, path) {
        Ok(target) => target,
        Err(e) => {
            close_data_channel(data).await;
            return Err(e.into());
        }
    };

    let received = receive_upload(
        &mut data,
        &target.path,
        context.config.max_file_size_bytes(),
        idle,
    )
    .await;
    close_data_channel(data).await;

    let bytes = received?;
    info!("{} stored {} ({} bytes)", identity, target.file_name, bytes);
    context.hook.notify(&identity, &target.file_name);

    Ok(Reply::new(TRANSFER_COMPLETE, "transfer complete"))
}

/// LIST / NLST: send a canned listing.
async fn handle_cmd_listing(
    session: &mut Session,
    control: &mut ControlChannel,
    lines: &[&str],
) -> Result<Reply, CommandError> {
    control
        .send(&Reply::new(TRANSFER_STARTING, "ASCII data"))
        .await?;

    let idle = session.context().idle_timeout();
    let mut data = open_data_channel(session.data_mode(), idle).await?;
    let sent = send_listing(&mut data, lines, idle).await;
    // the client treats the data socket closing as end of listing
    close_data_channel(data).await;
    sent?;

    Ok(Reply::new(TRANSFER_COMPLETE, "transfer complete"))
}

async fn handle_cmd_pasv(session: &mut Session) -> Result<Reply, CommandError> {
    let local_ip = session.local().ip();
    let addr = setup_passive_mode(session.data_mode_mut(), local_ip).await?;
    info!("Client {} entering passive mode on {}", session.peer(), addr);
    Ok(Reply::new(ENTERING_PASSIVE, passive_reply_text(addr)))
}

fn handle_cmd_port(session: &mut Session, arg: &str) -> Result<Reply, CommandError> {
    let peer_ip = session.peer().ip();
    let target = setup_active_mode(session.data_mode_mut(), peer_ip, arg)?;
    info!("Client {} switched to active mode, data to {}", session.peer(), target);
    Ok(Reply::new(OK, format!("Command okay, data port {}", target.port())))
}

/// TYPE / MODE / STRU: only one variant of each is supported.
fn accept_only(arg: &str, wanted: &str, refusal: &'static str) -> Reply {
    let matches = arg
        .split_whitespace()
        .next()
        .is_some_and(|first| first.eq_ignore_ascii_case(wanted));

    if matches {
        Reply::ok()
    } else {
        Reply::new(PARAMETER_NOT_IMPLEMENTED, refusal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_accepts_binary_only() {
        assert_eq!(accept_only("I", "I", "no").code(), OK);
        assert_eq!(accept_only("i", "I", "no").code(), OK);
        assert_eq!(accept_only("L 8", "I", "no").code(), PARAMETER_NOT_IMPLEMENTED);
        assert_eq!(accept_only("A N", "I", "no").code(), PARAMETER_NOT_IMPLEMENTED);
        assert_eq!(accept_only("", "I", "no").code(), PARAMETER_NOT_IMPLEMENTED);
    }
}
