//! SMTP adapter behind the application mail seam.

use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, header::ContentType},
    transport::smtp::authentication::Credentials,
};

use crate::application::mail::{MailError, Mailer, OutgoingEmail};
use crate::config::MailSettings;

use super::error::InfraError;

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    /// Build the transport from settings. Credentials switch the transport to
    /// a TLS relay; without them a plain connection is used, which is only
    /// suitable for a local delivery agent.
    pub fn from_settings(settings: &MailSettings) -> Result<Self, InfraError> {
        let from = settings.from_address.parse::<Mailbox>().map_err(|err| {
            InfraError::configuration(format!(
                "invalid mail.from_address `{}`: {err}",
                settings.from_address
            ))
        })?;

        let transport = match (&settings.username, &settings.password) {
            (Some(username), Some(password)) => {
                AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.host)
                    .map_err(|err| {
                        InfraError::configuration(format!(
                            "invalid mail relay `{}`: {err}",
                            settings.host
                        ))
                    })?
                    .credentials(Credentials::new(username.clone(), password.clone()))
                    .port(settings.port)
                    .build()
            }
            _ => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&settings.host)
                .port(settings.port)
                .build(),
        };

        Ok(Self { transport, from })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<(), MailError> {
        let to = email
            .to
            .parse::<Mailbox>()
            .map_err(|_| MailError::invalid_address(&email.to))?;

        let mut builder = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(email.subject);

        if let Some(reply_to) = &email.reply_to {
            let mailbox = reply_to
                .parse::<Mailbox>()
                .map_err(|_| MailError::invalid_address(reply_to))?;
            builder = builder.reply_to(mailbox);
        }

        let message = builder
            .header(ContentType::TEXT_PLAIN)
            .body(email.body)
            .map_err(MailError::transport)?;

        self.transport
            .send(message)
            .await
            .map(|_| ())
            .map_err(MailError::transport)
    }
}
