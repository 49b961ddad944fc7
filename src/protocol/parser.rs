//! FTP command parsing
//!
//! The control channel carries ISO-8859-1 text, one byte per character.

use crate::protocol::{Command, Verb};

/// Decodes one raw control line, dropping the `\n` or `\r\n` terminator.
pub fn decode_line(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\n").unwrap_or(raw);
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    raw.iter().map(|&b| char::from(b)).collect()
}

/// Splits a line at the first space into an upper-cased verb and a trimmed argument.
pub fn parse_command(line: &str) -> Command {
    let (verb, arg) = match line.find(' ') {
        Some(i) => (&line[..i], &line[i..]),
        None => (line, ""),
    };

    Command {
        verb: Verb::from_token(&verb.to_ascii_uppercase()),
        arg: arg.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_verb_and_argument() {
        let cmd = parse_command("stor /photos/cat.jpg");
        assert_eq!(cmd.verb, Verb::Stor);
        assert_eq!(cmd.arg, "/photos/cat.jpg");
    }

    #[test]
    fn argument_keeps_inner_spaces() {
        let cmd = parse_command("STOR  my holiday.jpg ");
        assert_eq!(cmd.arg, "my holiday.jpg");
    }

    #[test]
    fn bare_verb_has_empty_argument() {
        let cmd = parse_command("PASV");
        assert_eq!(cmd.verb, Verb::Pasv);
        assert!(cmd.arg.is_empty());
    }

    #[test]
    fn xpwd_is_an_alias_for_pwd() {
        assert_eq!(parse_command("XPWD").verb, Verb::Pwd);
    }

    #[test]
    fn refused_and_unknown_verbs_keep_their_name() {
        assert_eq!(parse_command("MKD x").verb, Verb::Refused("MKD".into()));
        assert_eq!(parse_command("feat").verb, Verb::Unknown("FEAT".into()));
    }

    #[test]
    fn decodes_latin1_and_strips_terminators() {
        assert_eq!(decode_line(b"STOR caf\xe9.jpg\r\n"), "STOR caf\u{e9}.jpg");
        assert_eq!(decode_line(b"NOOP\n"), "NOOP");
        assert_eq!(decode_line(b"NOOP"), "NOOP");
    }

    #[test]
    fn pass_is_masked_in_logs() {
        assert_eq!(parse_command("PASS secret").log_line(), "PASS ***");
    }
}
