//! FTP reply values
//!
//! A handler produces exactly one immutable `Reply`; the session writes it once.

use std::borrow::Cow;
use std::fmt;

pub const TRANSFER_STARTING: u16 = 150;
pub const OK: u16 = 200;
pub const SYSTEM_TYPE: u16 = 215;
pub const READY: u16 = 220;
pub const TRANSFER_COMPLETE: u16 = 226;
pub const ENTERING_PASSIVE: u16 = 227;
pub const LOGIN_SUCCESS: u16 = 230;
pub const PATHNAME_CREATED: u16 = 257;
pub const PASSWORD_REQUIRED: u16 = 331;
pub const LINE_TOO_LONG: u16 = 500;
pub const NOT_IMPLEMENTED: u16 = 502;
pub const PARAMETER_NOT_IMPLEMENTED: u16 = 504;
pub const NOT_LOGGED_IN: u16 = 530;
pub const FILE_ACTION_FAILED: u16 = 550;
/// Non-standard code used to refuse downloads
pub const DOWNLOAD_REFUSED: u16 = 999;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    code: u16,
    message: Cow<'static, str>,
}

impl Reply {
    pub fn new(code: u16, message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// `550 <message>`
    pub fn fault(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(FILE_ACTION_FAILED, message)
    }

    pub fn ok() -> Self {
        Self::new(OK, "Command okay")
    }

    pub fn code(&self) -> u16 {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Encodes the reply as a single ISO-8859-1 line terminated by `\n`.
    /// Characters outside Latin-1 are sent as `?`.
    pub fn encode(&self) -> Vec<u8> {
        let line = self.to_string();
        let mut bytes: Vec<u8> = line
            .chars()
            .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
            .collect();
        bytes.push(b'\n');
        bytes
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_code_and_message_as_one_line() {
        let reply = Reply::new(TRANSFER_COMPLETE, "transfer complete");
        assert_eq!(reply.encode(), b"226 transfer complete\n".to_vec());
    }

    #[test]
    fn latin1_characters_survive_encoding() {
        let reply = Reply::fault("caf\u{e9} \u{2603}");
        assert_eq!(reply.encode(), b"550 caf\xe9 ?\n".to_vec());
    }
}
