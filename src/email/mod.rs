pub mod smtp;

/// A rendered message waiting for the relay.
#[derive(Debug, Clone)]
pub struct OutgoingMail {
    /// Display name for the From header. The configured name is used when unset.
    pub sender_name: Option<String>,
    pub to: String,
    pub subject: String,
    pub html: String,
}

impl OutgoingMail {
    pub fn new(to: &str, subject: impl Into<String>, html: impl Into<String>) -> Self {
        OutgoingMail {
            sender_name: None,
            to: to.to_string(),
            subject: subject.into(),
            html: html.into(),
        }
    }

    pub fn with_sender_name(mut self, name: impl Into<String>) -> Self {
        self.sender_name = Some(name.into());
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("Invalid recipient address: {0}")]
    Address(String),
    #[error("Failed to build email: {0}")]
    Build(String),
    /// Relay-side failure (auth, network, timeout). Carries the provider text as is.
    #[error("{0}")]
    Transport(String),
    #[error("SMTP server did not respond to the connection test")]
    Unreachable,
}

/// Outbound mail seam. `SmtpMailer` talks to a real relay; tests plug in a
/// recording double.
///
/// Each call is a single attempt. Retrying is left to the caller.
#[rocket::async_trait]
pub trait MailTransport: Send + Sync {
    /// Connect and authenticate without sending anything.
    async fn verify(&self) -> Result<(), MailError>;

    /// Submit one message and return the Message-ID it was sent with.
    async fn send(&self, mail: OutgoingMail) -> Result<String, MailError>;
}
