//! Scriptable mock SMTP server for wire-level delivery tests.
//!
//! Speaks enough server-side SMTP to exercise the executor end to end:
#![allow(dead_code)] // test utility - not every knob is used in every test
//! per-command reply scripting, a real STARTTLS upgrade (self-signed
//! test certificate), implicit-TLS mode, the AUTH LOGIN exchange, and
//! failure injection (silent drops, hangs, delayed replies).

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio::time::timeout;
use tokio_rustls::TlsAcceptor;
use tokio_rustls::rustls::ServerConfig;

/// One scripted reply.
#[derive(Debug, Clone)]
pub struct Reply {
    pub code: u16,
    pub text: String,
}

impl Reply {
    fn new(code: u16, text: impl Into<String>) -> Self {
        Self {
            code,
            text: text.into(),
        }
    }

    fn line(&self) -> String {
        format!("{} {}\r\n", self.code, self.text)
    }
}

#[derive(Debug, Clone)]
struct MockConfig {
    greeting: Reply,
    ehlo_code: u16,
    ehlo_capabilities: Vec<String>,
    starttls: Reply,
    auth: Reply,
    mail_from: Reply,
    rcpt_to: Reply,
    data: Reply,
    data_end: Reply,
    quit: Reply,
    implicit_tls: bool,
    hang_on_command: Option<usize>,
    drop_after_commands: Option<usize>,
    reply_delay: Option<Duration>,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            greeting: Reply::new(220, "mock.test ESMTP ready"),
            ehlo_code: 250,
            ehlo_capabilities: vec![
                "mock.test".to_string(),
                "STARTTLS".to_string(),
                "AUTH LOGIN PLAIN".to_string(),
            ],
            starttls: Reply::new(220, "Go ahead"),
            auth: Reply::new(235, "Authentication succeeded"),
            mail_from: Reply::new(250, "OK"),
            rcpt_to: Reply::new(250, "OK"),
            data: Reply::new(354, "End data with <CRLF>.<CRLF>"),
            data_end: Reply::new(250, "OK: queued"),
            quit: Reply::new(221, "Bye"),
            implicit_tls: false,
            hang_on_command: None,
            drop_after_commands: None,
            reply_delay: None,
        }
    }
}

struct SessionState {
    config: MockConfig,
    acceptor: TlsAcceptor,
    commands: Mutex<Vec<String>>,
    message: Mutex<Option<String>>,
    command_counter: AtomicUsize,
}

enum SessionEnd {
    Closed,
    UpgradeTls,
}

/// Scriptable mock SMTP server bound to an ephemeral localhost port.
pub struct MockSmtpServer {
    addr: SocketAddr,
    state: Arc<SessionState>,
    stop: Arc<AtomicBool>,
}

impl MockSmtpServer {
    #[must_use]
    pub fn builder() -> MockSmtpServerBuilder {
        MockSmtpServerBuilder {
            config: MockConfig::default(),
        }
    }

    #[must_use]
    pub const fn addr(&self) -> SocketAddr {
        self.addr
    }

    #[must_use]
    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Every command line received, in order, across STARTTLS upgrades.
    pub async fn commands(&self) -> Vec<String> {
        self.state.commands.lock().await.clone()
    }

    /// The message payload received after DATA, if any.
    pub async fn received_message(&self) -> Option<String> {
        self.state.message.lock().await.clone()
    }

    pub fn shutdown(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }
}

/// Builder configuring scripted replies and failure injection.
pub struct MockSmtpServerBuilder {
    config: MockConfig,
}

impl MockSmtpServerBuilder {
    #[must_use]
    pub fn greeting(mut self, code: u16, text: impl Into<String>) -> Self {
        self.config.greeting = Reply::new(code, text);
        self
    }

    #[must_use]
    pub fn ehlo_response(mut self, code: u16, capabilities: Vec<String>) -> Self {
        self.config.ehlo_code = code;
        self.config.ehlo_capabilities = capabilities;
        self
    }

    #[must_use]
    pub fn starttls_response(mut self, code: u16, text: impl Into<String>) -> Self {
        self.config.starttls = Reply::new(code, text);
        self
    }

    #[must_use]
    pub fn auth_response(mut self, code: u16, text: impl Into<String>) -> Self {
        self.config.auth = Reply::new(code, text);
        self
    }

    #[must_use]
    pub fn mail_from_response(mut self, code: u16, text: impl Into<String>) -> Self {
        self.config.mail_from = Reply::new(code, text);
        self
    }

    #[must_use]
    pub fn rcpt_to_response(mut self, code: u16, text: impl Into<String>) -> Self {
        self.config.rcpt_to = Reply::new(code, text);
        self
    }

    #[must_use]
    pub fn data_end_response(mut self, code: u16, text: impl Into<String>) -> Self {
        self.config.data_end = Reply::new(code, text);
        self
    }

    /// Serve TLS immediately on connect (the port-465 model).
    #[must_use]
    pub const fn implicit_tls(mut self) -> Self {
        self.config.implicit_tls = true;
        self
    }

    /// Never reply to the Nth command received (0-based).
    #[must_use]
    pub const fn hang_on_command(mut self, index: usize) -> Self {
        self.config.hang_on_command = Some(index);
        self
    }

    /// Silently close the connection once N commands were processed.
    #[must_use]
    pub const fn drop_after_commands(mut self, count: usize) -> Self {
        self.config.drop_after_commands = Some(count);
        self
    }

    /// Delay every reply.
    #[must_use]
    pub const fn reply_delay(mut self, delay: Duration) -> Self {
        self.config.reply_delay = Some(delay);
        self
    }

    /// Binds to an ephemeral port and starts serving.
    pub async fn start(self) -> io::Result<MockSmtpServer> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let state = Arc::new(SessionState {
            config: self.config,
            acceptor: test_acceptor(),
            commands: Mutex::new(Vec::new()),
            message: Mutex::new(None),
            command_counter: AtomicUsize::new(0),
        });
        let stop = Arc::new(AtomicBool::new(false));

        let accept_state = Arc::clone(&state);
        let accept_stop = Arc::clone(&stop);
        tokio::spawn(async move {
            loop {
                if accept_stop.load(Ordering::Relaxed) {
                    break;
                }
                if let Ok(Ok((stream, _peer))) =
                    timeout(Duration::from_millis(100), listener.accept()).await
                {
                    let state = Arc::clone(&accept_state);
                    tokio::spawn(async move {
                        if let Err(error) = handle_client(stream, state).await {
                            tracing::debug!(%error, "mock client session ended with error");
                        }
                    });
                }
            }
        });

        Ok(MockSmtpServer { addr, state, stop })
    }
}

/// TLS acceptor using the committed self-signed test certificate.
fn test_acceptor() -> TlsAcceptor {
    let certs = rustls_pemfile::certs(&mut &include_bytes!("testdata/cert.pem")[..])
        .collect::<Result<Vec<_>, _>>()
        .expect("test certificate must parse");
    let key = rustls_pemfile::private_key(&mut &include_bytes!("testdata/key.pem")[..])
        .expect("test key must parse")
        .expect("test key must be present");

    let config = ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .expect("test certificate must be usable");

    TlsAcceptor::from(Arc::new(config))
}

/// Writes and flushes one reply.
async fn send<W>(writer: &mut W, data: &[u8]) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(data).await?;
    writer.flush().await
}

async fn handle_client(stream: TcpStream, state: Arc<SessionState>) -> io::Result<()> {
    if state.config.implicit_tls {
        let mut tls = state.acceptor.accept(stream).await?;
        send(&mut tls, state.config.greeting.line().as_bytes()).await?;
        run_session(&mut tls, &state).await?;
        return Ok(());
    }

    let mut stream = stream;
    send(&mut stream, state.config.greeting.line().as_bytes()).await?;

    match run_session(&mut stream, &state).await? {
        SessionEnd::Closed => Ok(()),
        SessionEnd::UpgradeTls => {
            let mut tls = state.acceptor.accept(stream).await?;
            // No new greeting after STARTTLS; the client re-EHLOs.
            run_session(&mut tls, &state).await?;
            Ok(())
        }
    }
}

async fn run_session<S>(stream: &mut S, state: &SessionState) -> io::Result<SessionEnd>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let config = &state.config;
    let mut reader = BufReader::new(stream);
    let mut line = String::new();

    loop {
        line.clear();
        if reader.read_line(&mut line).await? == 0 {
            return Ok(SessionEnd::Closed);
        }

        let command = line.trim().to_string();
        let index = state.command_counter.fetch_add(1, Ordering::Relaxed);
        state.commands.lock().await.push(command.clone());

        if config.hang_on_command == Some(index) {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            return Ok(SessionEnd::Closed);
        }
        if let Some(limit) = config.drop_after_commands
            && index >= limit
        {
            return Ok(SessionEnd::Closed);
        }
        if let Some(delay) = config.reply_delay {
            tokio::time::sleep(delay).await;
        }

        let keyword = command
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_uppercase();
        let writer = reader.get_mut();

        match keyword.as_str() {
            "EHLO" | "HELO" => {
                let mut reply = String::new();
                let last = config.ehlo_capabilities.len().saturating_sub(1);
                for (i, capability) in config.ehlo_capabilities.iter().enumerate() {
                    let separator = if i == last { ' ' } else { '-' };
                    reply.push_str(&format!("{}{separator}{capability}\r\n", config.ehlo_code));
                }
                send(writer, reply.as_bytes()).await?;
            }
            "STARTTLS" => {
                send(writer, config.starttls.line().as_bytes()).await?;
                if config.starttls.code == 220 {
                    return Ok(SessionEnd::UpgradeTls);
                }
            }
            "AUTH" => {
                send(writer, b"334 VXNlcm5hbWU6\r\n").await?;
                line.clear();
                if reader.read_line(&mut line).await? == 0 {
                    return Ok(SessionEnd::Closed);
                }
                let writer = reader.get_mut();
                send(writer, b"334 UGFzc3dvcmQ6\r\n").await?;
                line.clear();
                if reader.read_line(&mut line).await? == 0 {
                    return Ok(SessionEnd::Closed);
                }
                let writer = reader.get_mut();
                send(writer, config.auth.line().as_bytes()).await?;
            }
            "MAIL" => {
                send(writer, config.mail_from.line().as_bytes()).await?;
            }
            "RCPT" => {
                send(writer, config.rcpt_to.line().as_bytes()).await?;
            }
            "DATA" => {
                send(writer, config.data.line().as_bytes()).await?;
                if config.data.code == 354 {
                    let mut body = String::new();
                    loop {
                        line.clear();
                        if reader.read_line(&mut line).await? == 0 {
                            return Ok(SessionEnd::Closed);
                        }
                        if line.trim_end() == "." {
                            break;
                        }
                        body.push_str(&line);
                    }
                    *state.message.lock().await = Some(body);
                    let writer = reader.get_mut();
                    send(writer, config.data_end.line().as_bytes()).await?;
                }
            }
            "QUIT" => {
                send(writer, config.quit.line().as_bytes()).await?;
                return Ok(SessionEnd::Closed);
            }
            _ => {
                send(writer, b"500 unknown command\r\n").await?;
            }
        }
    }
}
