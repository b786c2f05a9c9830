//! SMTP reply parsing and representation.

use crate::error::{ClientError, Result};

/// A complete SMTP reply, possibly spanning several continuation lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// The three-digit status code.
    pub code: u16,
    /// The text of every line, in order, without codes or separators.
    pub lines: Vec<String>,
}

impl Response {
    #[must_use]
    pub const fn new(code: u16, lines: Vec<String>) -> Self {
        Self { code, lines }
    }

    /// The reply text with lines joined by newlines.
    #[must_use]
    pub fn message(&self) -> String {
        self.lines.join("\n")
    }

    /// `true` for a 2xx completion reply.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.code >= 200 && self.code < 300
    }

    /// `true` for a 3xx intermediate reply (DATA's 354, AUTH's 334).
    #[must_use]
    pub const fn is_intermediate(&self) -> bool {
        self.code >= 300 && self.code < 400
    }

    /// `true` for a 5xx permanent failure reply.
    #[must_use]
    pub const fn is_permanent_error(&self) -> bool {
        self.code >= 500 && self.code < 600
    }

    /// Tries to parse one complete reply from the front of `buffer`.
    ///
    /// Returns the reply and the number of bytes it occupied, or `None`
    /// when the buffer does not yet hold the reply's final line.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::ParseError` for malformed reply lines and
    /// `ClientError::Utf8Error` for non-UTF-8 bytes.
    pub fn parse_reply(buffer: &[u8]) -> Result<Option<(Self, usize)>> {
        let text = std::str::from_utf8(buffer)?;

        let mut consumed = 0;
        let mut code = None;
        let mut lines = Vec::new();
        let mut rest = text;

        while let Some(newline) = rest.find('\n') {
            let raw = &rest[..newline];
            consumed += newline + 1;
            rest = &rest[newline + 1..];

            let line = raw.strip_suffix('\r').unwrap_or(raw);
            let (line_code, is_final, body) = Self::split_line(line)?;

            match code {
                None => code = Some(line_code),
                Some(expected) if expected != line_code => {
                    return Err(ClientError::ParseError(format!(
                        "status code changed mid-reply: expected {expected}, got {line_code}"
                    )));
                }
                Some(_) => {}
            }

            lines.push(body.to_string());

            if is_final {
                return Ok(Some((Self::new(code.unwrap_or(line_code), lines), consumed)));
            }
        }

        Ok(None)
    }

    /// Splits a single reply line into (code, is-final, text).
    ///
    /// Works on bytes so adversarial wire data (a multi-byte character
    /// where the status code belongs) yields a parse error, never a
    /// slicing panic.
    fn split_line(line: &str) -> Result<(u16, bool, &str)> {
        let bytes = line.as_bytes();
        let Some(head) = bytes.get(..3) else {
            return Err(ClientError::ParseError(format!(
                "reply line too short: {line:?}"
            )));
        };
        if !head.iter().all(u8::is_ascii_digit) {
            return Err(ClientError::ParseError(format!(
                "invalid status code in {line:?}"
            )));
        }
        let code = u16::from(head[0] - b'0') * 100
            + u16::from(head[1] - b'0') * 10
            + u16::from(head[2] - b'0');

        // Byte 3 being ASCII makes index 4 a character boundary.
        match bytes.get(3).copied() {
            None => Ok((code, true, "")),
            Some(b' ') => Ok((code, true, &line[4..])),
            Some(b'-') => Ok((code, false, &line[4..])),
            Some(_) => Err(ClientError::ParseError(format!(
                "invalid separator after status code in {line:?}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_line_reply() {
        let (reply, used) = Response::parse_reply(b"220 mail.example.com ESMTP\r\n")
            .unwrap()
            .unwrap();
        assert_eq!(reply.code, 220);
        assert_eq!(reply.lines, vec!["mail.example.com ESMTP"]);
        assert_eq!(used, 28);
    }

    #[test]
    fn parses_multi_line_reply() {
        let data = b"250-mail.example.com\r\n250-STARTTLS\r\n250 AUTH LOGIN PLAIN\r\n";
        let (reply, used) = Response::parse_reply(data).unwrap().unwrap();
        assert_eq!(reply.code, 250);
        assert_eq!(
            reply.lines,
            vec!["mail.example.com", "STARTTLS", "AUTH LOGIN PLAIN"]
        );
        assert_eq!(used, data.len());
    }

    #[test]
    fn incomplete_reply_needs_more_data() {
        assert!(Response::parse_reply(b"250-mail.example.com\r\n250-SIZ")
            .unwrap()
            .is_none());
        assert!(Response::parse_reply(b"250 OK").unwrap().is_none());
    }

    #[test]
    fn leaves_trailing_bytes_unconsumed() {
        let data = b"334 VXNlcm5hbWU6\r\n235 accepted\r\n";
        let (reply, used) = Response::parse_reply(data).unwrap().unwrap();
        assert_eq!(reply.code, 334);
        assert_eq!(used, 18);
        let (next, _) = Response::parse_reply(&data[used..]).unwrap().unwrap();
        assert_eq!(next.code, 235);
    }

    #[test]
    fn bare_code_line_is_final() {
        let (reply, _) = Response::parse_reply(b"250\r\n").unwrap().unwrap();
        assert_eq!(reply.code, 250);
        assert_eq!(reply.lines, vec![""]);
    }

    #[test]
    fn rejects_malformed_lines() {
        assert!(Response::parse_reply(b"2X0 hello\r\n").is_err());
        assert!(Response::parse_reply(b"250_oops\r\n").is_err());
        assert!(Response::parse_reply(b"25\r\n").is_err());
    }

    #[test]
    fn multibyte_garbage_is_an_error_not_a_panic() {
        // Multi-byte characters straddling the status code or sitting
        // where the separator belongs.
        assert!(Response::parse_reply("ab\u{e9} hi\r\n".as_bytes()).is_err());
        assert!(Response::parse_reply("a\u{4e2d} hi\r\n".as_bytes()).is_err());
        assert!(Response::parse_reply("25\u{e9}0 hi\r\n".as_bytes()).is_err());
        assert!(Response::parse_reply("250\u{e9}hi\r\n".as_bytes()).is_err());
    }

    #[test]
    fn rejects_code_change_mid_reply() {
        assert!(Response::parse_reply(b"250-one\r\n550 two\r\n").is_err());
    }

    #[test]
    fn code_class_predicates() {
        assert!(Response::new(250, vec![]).is_success());
        assert!(!Response::new(550, vec![]).is_success());
        assert!(Response::new(354, vec![]).is_intermediate());
        assert!(Response::new(550, vec![]).is_permanent_error());
        assert!(!Response::new(421, vec![]).is_permanent_error());
        assert!(!Response::new(250, vec![]).is_permanent_error());
    }
}
