//! SMTP command sequencing for message submission.

use tokio::net::TcpStream;

use crate::connection::ClientConnection;
use crate::error::{ClientError, Result};
use crate::response::Response;

/// Initial read buffer size for server replies.
const BUFFER_SIZE: usize = 4096;

/// Ceiling on reply buffering; anything larger is a protocol violation.
const MAX_REPLY_SIZE: usize = 64 * 1024;

/// A client-side SMTP session.
///
/// The caller drives the session command by command and inspects each
/// [`Response`]; the client itself never interprets a reply beyond
/// framing it.
pub struct SmtpClient {
    connection: Option<ClientConnection>,
    buffer: Vec<u8>,
    filled: usize,
    server_name: String,
    accept_invalid_certs: bool,
}

impl SmtpClient {
    /// Opens a plain TCP connection to `host:port`.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established.
    pub async fn connect(host: &str, port: u16) -> Result<Self> {
        let stream = TcpStream::connect((host, port)).await?;

        Ok(Self {
            connection: Some(ClientConnection::Plain(stream)),
            buffer: vec![0u8; BUFFER_SIZE],
            filled: 0,
            server_name: host.to_string(),
            accept_invalid_certs: false,
        })
    }

    /// Opens a connection to `host:port` and secures it immediately
    /// (implicit TLS, the submissions-port model).
    ///
    /// # Errors
    ///
    /// Returns an error if the connection or the TLS handshake fails.
    pub async fn connect_tls(host: &str, port: u16, accept_invalid_certs: bool) -> Result<Self> {
        let mut client = Self::connect(host, port).await?;
        client.accept_invalid_certs = accept_invalid_certs;

        let Some(plain) = client.connection.take() else {
            return Err(ClientError::ConnectionClosed);
        };
        client.connection = Some(plain.secure(host, accept_invalid_certs).await?);

        Ok(client)
    }

    /// Sets whether to accept invalid TLS certificates on a later
    /// STARTTLS upgrade. Test servers only; defaults to `false`.
    #[must_use]
    pub const fn accept_invalid_certs(mut self, accept: bool) -> Self {
        self.accept_invalid_certs = accept;
        self
    }

    /// Reads the server's banner (the 220 greeting).
    ///
    /// # Errors
    ///
    /// Returns an error if reading or parsing fails.
    pub async fn read_greeting(&mut self) -> Result<Response> {
        self.read_reply().await
    }

    /// Sends one command line and reads the reply.
    ///
    /// # Errors
    ///
    /// Returns an error if sending or reading fails.
    pub async fn command(&mut self, command: &str) -> Result<Response> {
        let data = format!("{command}\r\n");
        self.connection_mut()?.send(data.as_bytes()).await?;
        self.read_reply().await
    }

    /// Sends EHLO with the given client hostname.
    ///
    /// # Errors
    ///
    /// Returns an error if the exchange fails.
    pub async fn ehlo(&mut self, domain: &str) -> Result<Response> {
        self.command(&format!("EHLO {domain}")).await
    }

    /// Sends STARTTLS and, if the server accepts, upgrades the
    /// connection to TLS.
    ///
    /// # Errors
    ///
    /// Returns an error if the command or the TLS handshake fails.
    pub async fn starttls(&mut self) -> Result<Response> {
        let response = self.command("STARTTLS").await?;

        if response.is_success() {
            let Some(plain) = self.connection.take() else {
                return Err(ClientError::ConnectionClosed);
            };
            let name = self.server_name.clone();
            self.connection = Some(plain.secure(&name, self.accept_invalid_certs).await?);
            // Any bytes buffered before the handshake belong to the
            // plaintext session and must not leak into the secured one.
            self.filled = 0;
        }

        Ok(response)
    }

    /// Authenticates with AUTH LOGIN (base64 username/password exchange).
    ///
    /// Returns the server's final reply: 235 on acceptance, an error code
    /// otherwise. If the server rejects a stage early, that reply is
    /// returned as-is for the caller to classify.
    ///
    /// # Errors
    ///
    /// Returns an error if the exchange itself fails.
    pub async fn auth_login(&mut self, username: &str, secret: &str) -> Result<Response> {
        let response = self.command("AUTH LOGIN").await?;
        if !response.is_intermediate() {
            return Ok(response);
        }

        let response = self.command(&base64(username.as_bytes())).await?;
        if !response.is_intermediate() {
            return Ok(response);
        }

        self.command(&base64(secret.as_bytes())).await
    }

    /// Sends MAIL FROM with the envelope sender.
    ///
    /// # Errors
    ///
    /// Returns an error if the exchange fails.
    pub async fn mail_from(&mut self, from: &str) -> Result<Response> {
        self.command(&format!("MAIL FROM:<{from}>")).await
    }

    /// Sends RCPT TO with the envelope recipient.
    ///
    /// # Errors
    ///
    /// Returns an error if the exchange fails.
    pub async fn rcpt_to(&mut self, to: &str) -> Result<Response> {
        self.command(&format!("RCPT TO:<{to}>")).await
    }

    /// Sends DATA; a 354 reply means the server awaits the payload.
    ///
    /// # Errors
    ///
    /// Returns an error if the exchange fails.
    pub async fn data(&mut self) -> Result<Response> {
        self.command("DATA").await
    }

    /// Transmits the message payload and the end-of-data marker.
    ///
    /// Leading dots are stuffed per RFC 5321 and the payload is closed
    /// with `CRLF.CRLF` regardless of its own line ending.
    ///
    /// # Errors
    ///
    /// Returns an error if sending or reading fails.
    pub async fn send_payload(&mut self, payload: &str) -> Result<Response> {
        let stuffed = dot_stuff(payload);
        let connection = self.connection_mut()?;

        connection.send(stuffed.as_bytes()).await?;
        if !stuffed.ends_with("\r\n") {
            connection.send(b"\r\n").await?;
        }
        connection.send(b".\r\n").await?;

        self.read_reply().await
    }

    /// Sends QUIT.
    ///
    /// # Errors
    ///
    /// Returns an error if the exchange fails.
    pub async fn quit(&mut self) -> Result<Response> {
        self.command("QUIT").await
    }

    fn connection_mut(&mut self) -> Result<&mut ClientConnection> {
        self.connection.as_mut().ok_or(ClientError::ConnectionClosed)
    }

    /// Reads until one complete reply is framed, growing the buffer as
    /// needed up to [`MAX_REPLY_SIZE`].
    async fn read_reply(&mut self) -> Result<Response> {
        loop {
            if let Some((response, used)) = Response::parse_reply(&self.buffer[..self.filled])? {
                self.buffer.copy_within(used..self.filled, 0);
                self.filled -= used;
                return Ok(response);
            }

            if self.filled == self.buffer.len() {
                if self.buffer.len() >= MAX_REPLY_SIZE {
                    return Err(ClientError::ParseError(format!(
                        "reply exceeds {MAX_REPLY_SIZE} bytes"
                    )));
                }
                let grown = (self.buffer.len() * 2).min(MAX_REPLY_SIZE);
                self.buffer.resize(grown, 0);
            }

            let connection = self
                .connection
                .as_mut()
                .ok_or(ClientError::ConnectionClosed)?;
            let n = connection.read(&mut self.buffer[self.filled..]).await?;
            self.filled += n;
        }
    }
}

/// Escapes payload lines that begin with a dot (RFC 5321 §4.5.2).
fn dot_stuff(payload: &str) -> String {
    let stuffed = payload.replace("\r\n.", "\r\n..");
    if let Some(rest) = stuffed.strip_prefix('.') {
        format!("..{rest}")
    } else {
        stuffed
    }
}

/// Base64 without line wrapping, as AUTH exchanges require.
fn base64(input: &[u8]) -> String {
    const TABLE: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

    let mut out = String::with_capacity(input.len().div_ceil(3) * 4);

    for chunk in input.chunks(3) {
        let b = [chunk[0], chunk.get(1).copied().unwrap_or(0), chunk.get(2).copied().unwrap_or(0)];

        out.push(TABLE[usize::from(b[0] >> 2)] as char);
        out.push(TABLE[usize::from((b[0] & 0x03) << 4 | b[1] >> 4)] as char);
        out.push(if chunk.len() > 1 {
            TABLE[usize::from((b[1] & 0x0f) << 2 | b[2] >> 6)] as char
        } else {
            '='
        });
        out.push(if chunk.len() > 2 {
            TABLE[usize::from(b[2] & 0x3f)] as char
        } else {
            '='
        });
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base64_known_vectors() {
        assert_eq!(base64(b""), "");
        assert_eq!(base64(b"f"), "Zg==");
        assert_eq!(base64(b"fo"), "Zm8=");
        assert_eq!(base64(b"foo"), "Zm9v");
        assert_eq!(base64(b"notifier@example.com"), "bm90aWZpZXJAZXhhbXBsZS5jb20=");
    }

    #[test]
    fn dot_stuffing_escapes_leading_dots() {
        assert_eq!(dot_stuff(".hidden"), "..hidden");
        assert_eq!(dot_stuff("line\r\n.dot\r\n"), "line\r\n..dot\r\n");
        assert_eq!(dot_stuff("no dots here"), "no dots here");
    }
}
