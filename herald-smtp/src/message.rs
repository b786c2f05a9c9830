//! MIME message construction for notification mail.

/// Builder for the notification message as transmitted after DATA.
///
/// Produces a fully formed payload: addressing headers, `Subject`, and
/// an HTML body with its content-type headers. The body arrives
/// pre-rendered; the builder never touches its markup.
#[derive(Debug, Clone, Default)]
pub struct MessageBuilder {
    from: Option<String>,
    to: Option<String>,
    subject: Option<String>,
    body_html: Option<String>,
}

impl MessageBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the From header (also the envelope sender by convention).
    #[must_use]
    pub fn from(mut self, address: impl Into<String>) -> Self {
        self.from = Some(address.into());
        self
    }

    /// Sets the To header.
    #[must_use]
    pub fn to(mut self, address: impl Into<String>) -> Self {
        self.to = Some(address.into());
        self
    }

    /// Sets the Subject header.
    #[must_use]
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Sets the pre-rendered HTML body.
    #[must_use]
    pub fn body_html(mut self, body: impl Into<String>) -> Self {
        self.body_html = Some(body.into());
        self
    }

    /// Assembles the payload with CRLF line endings.
    #[must_use]
    pub fn build(self) -> String {
        let mut message = String::with_capacity(512);

        if let Some(from) = &self.from {
            message.push_str(&format!("From: {from}\r\n"));
        }
        if let Some(to) = &self.to {
            message.push_str(&format!("To: {to}\r\n"));
        }
        if let Some(subject) = &self.subject {
            message.push_str(&format!("Subject: {subject}\r\n"));
        }

        message.push_str("MIME-Version: 1.0\r\n");
        message.push_str("Content-Type: text/html; charset=utf-8\r\n");
        message.push_str("\r\n");

        if let Some(body) = &self.body_html {
            message.push_str(body);
        }

        message
    }
}
