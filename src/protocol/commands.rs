//! FTP commands understood by the daemon
//!
//! A control line is parsed into a `Verb` and a single trailing argument.

use crate::protocol::Reply;

/// Command verbs. Everything not listed explicitly is `Unknown`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verb {
    User,
    Pass,
    Stor,
    Retr,
    List,
    Nlst,
    Pasv,
    Port,
    Type,
    Mode,
    Stru,
    Syst,
    Noop,
    /// PWD and XPWD
    Pwd,
    Quit,
    Rest,
    /// File management verbs the daemon refuses outright (DELE, MKD, CWD, ...)
    Refused(String),
    Unknown(String),
}

const REFUSED_VERBS: &[&str] = &[
    "DELE", "RMD", "XRMD", "MKD", "XMKD", "RNFR", "RNTO", "CDUP", "XCDUP", "CWD", "SIZE", "MDTM",
];

impl Verb {
    /// Maps an already upper-cased verb token.
    pub fn from_token(token: &str) -> Self {
        match token {
            "USER" => Verb::User,
            "PASS" => Verb::Pass,
            "STOR" => Verb::Stor,
            "RETR" => Verb::Retr,
            "LIST" => Verb::List,
            "NLST" => Verb::Nlst,
            "PASV" => Verb::Pasv,
            "PORT" => Verb::Port,
            "TYPE" => Verb::Type,
            "MODE" => Verb::Mode,
            "STRU" => Verb::Stru,
            "SYST" => Verb::Syst,
            "NOOP" => Verb::Noop,
            "PWD" | "XPWD" => Verb::Pwd,
            "QUIT" => Verb::Quit,
            "REST" => Verb::Rest,
            t if REFUSED_VERBS.contains(&t) => Verb::Refused(t.to_string()),
            t => Verb::Unknown(t.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Verb::User => "USER",
            Verb::Pass => "PASS",
            Verb::Stor => "STOR",
            Verb::Retr => "RETR",
            Verb::List => "LIST",
            Verb::Nlst => "NLST",
            Verb::Pasv => "PASV",
            Verb::Port => "PORT",
            Verb::Type => "TYPE",
            Verb::Mode => "MODE",
            Verb::Stru => "STRU",
            Verb::Syst => "SYST",
            Verb::Noop => "NOOP",
            Verb::Pwd => "PWD",
            Verb::Quit => "QUIT",
            Verb::Rest => "REST",
            Verb::Refused(name) | Verb::Unknown(name) => name,
        }
    }

    /// USER and PASS are the only verbs accepted before login.
    pub fn allowed_before_login(&self) -> bool {
        matches!(self, Verb::User | Verb::Pass)
    }
}

/// A parsed control line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub verb: Verb,
    pub arg: String,
}

impl Command {
    /// Rendering for logs; PASS arguments are masked.
    pub fn log_line(&self) -> String {
        match &self.verb {
            Verb::Pass => "PASS ***".to_string(),
            verb if self.arg.is_empty() => verb.name().to_string(),
            verb => format!("{} {}", verb.name(), self.arg),
        }
    }
}

/// Whether the session keeps reading commands after a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandStatus {
    Continue,
    CloseConnection,
}

/// Full result of a handled command: the single reply line and what happens next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    pub reply: Reply,
    pub status: CommandStatus,
}

impl CommandResult {
    pub fn reply(reply: Reply) -> Self {
        Self {
            reply,
            status: CommandStatus::Continue,
        }
    }

    pub fn close(reply: Reply) -> Self {
        Self {
            reply,
            status: CommandStatus::CloseConnection,
        }
    }
}
