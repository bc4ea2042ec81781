use std::fmt::Display;

use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use uuid::Uuid;

use super::{MailError, MailTransport, OutgoingMail};
use crate::config::Config;

/// STARTTLS relay client. A fresh connection is opened for every call.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    sender: Address,
    sender_name: String,
}

impl SmtpMailer {
    pub fn new(config: &Config) -> Result<Self, MailError> {
        let creds = Credentials::new(config.user.to_string(), config.pass.clone());

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
            .map_err(|e| MailError::Transport(format!("SMTP relay error: {}", e)))?
            .port(config.smtp_port)
            .credentials(creds)
            .timeout(Some(config.timeout))
            .build();

        Ok(SmtpMailer {
            transport,
            sender: config.user.clone(),
            sender_name: config.from_name.clone(),
        })
    }

    fn build_message(&self, mail: OutgoingMail, message_id: &str) -> Result<Message, MailError> {
        let name = mail.sender_name.unwrap_or_else(|| self.sender_name.clone());
        let from = Mailbox::new(Some(name), self.sender.clone());
        let to: Mailbox = mail
            .to
            .parse()
            .map_err(|e| MailError::Address(format!("{}: {}", mail.to, e)))?;

        Message::builder()
            .message_id(Some(message_id.to_string()))
            .from(from)
            .to(to)
            .subject(mail.subject)
            .header(ContentType::TEXT_HTML)
            .body(mail.html)
            .map_err(|e| MailError::Build(e.to_string()))
    }
}

/// `test_connection` answers `Ok(false)` when the server accepted the
/// session but did not acknowledge the NOOP.
fn connection_outcome<E: Display>(result: Result<bool, E>) -> Result<(), MailError> {
    match result {
        Ok(true) => Ok(()),
        Ok(false) => Err(MailError::Unreachable),
        Err(e) => Err(MailError::Transport(e.to_string())),
    }
}

#[rocket::async_trait]
impl MailTransport for SmtpMailer {
    async fn verify(&self) -> Result<(), MailError> {
        connection_outcome(self.transport.test_connection().await)
    }

    async fn send(&self, mail: OutgoingMail) -> Result<String, MailError> {
        let message_id = format!("<{}@{}>", Uuid::new_v4(), self.sender.domain());
        let message = self.build_message(mail, &message_id)?;

        self.transport
            .send(message)
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;
        Ok(message_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rocket::figment::Figment;

    fn mailer_on(port: u16) -> SmtpMailer {
        let figment = Figment::new()
            .merge(("mail.user", "sender@example.com"))
            .merge(("mail.pass", "secret"))
            .merge(("mail.host", "127.0.0.1"))
            .merge(("mail.port", port))
            .merge(("mail.timeout_secs", 5));
        SmtpMailer::new(&Config::from_figment(&figment).unwrap()).unwrap()
    }

    fn mailer() -> SmtpMailer {
        mailer_on(587)
    }

    /// A local port with nothing listening on it.
    fn closed_port() -> u16 {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    }

    #[test]
    fn message_carries_the_stamped_id_and_html_body() {
        let mail = OutgoingMail::new("patient@example.org", "Subject line", "<p>hi</p>");
        let message = mailer().build_message(mail, "<abc@example.com>").unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();

        assert!(raw.contains("Message-ID: <abc@example.com>"));
        assert!(raw.contains("Derma Analyzer"));
        assert!(raw.contains("<sender@example.com>"));
        assert!(raw.contains("To: patient@example.org"));
        assert!(raw.contains("Content-Type: text/html"));
        assert!(raw.contains("<p>hi</p>"));
    }

    #[test]
    fn sender_name_can_be_overridden() {
        let mail = OutgoingMail::new("patient@example.org", "s", "b").with_sender_name("Tester");
        let message = mailer().build_message(mail, "<id@example.com>").unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains("From: Tester <sender@example.com>"));
        assert!(!raw.contains("Derma Analyzer"));
    }

    #[test]
    fn bad_recipient_is_an_address_error() {
        let mail = OutgoingMail::new("nope", "s", "b");
        let err = mailer().build_message(mail, "<id@example.com>").unwrap_err();
        assert!(matches!(err, MailError::Address(_)));
    }

    #[test]
    fn connection_test_results_map_to_mail_errors() {
        assert!(connection_outcome::<String>(Ok(true)).is_ok());
        assert!(matches!(
            connection_outcome::<String>(Ok(false)),
            Err(MailError::Unreachable)
        ));
        match connection_outcome(Err("Connection refused")) {
            Err(MailError::Transport(msg)) => assert_eq!(msg, "Connection refused"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[rocket::async_test]
    async fn verify_against_a_dead_relay_is_a_transport_error() {
        let err = mailer_on(closed_port()).verify().await.unwrap_err();
        assert!(matches!(err, MailError::Transport(_)), "{:?}", err);
    }

    #[rocket::async_test]
    async fn send_against_a_dead_relay_is_a_transport_error() {
        let mail = OutgoingMail::new("patient@example.org", "s", "b");
        let err = mailer_on(closed_port()).send(mail).await.unwrap_err();
        assert!(matches!(err, MailError::Transport(_)), "{:?}", err);
    }
}
