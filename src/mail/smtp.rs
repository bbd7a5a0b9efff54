use anyhow::Context;
use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox, MultiPart, SinglePart},
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::{error, info};

use super::{templates, EmailKind, MailError, Mailer, TemplateParams};
use crate::config::MailConfig;

/// Delivers mail through an SMTP relay (Mailpit/Mailtrap in development).
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(cfg: &MailConfig) -> anyhow::Result<Self> {
        let from = Mailbox::new(
            Some(cfg.from_name.clone()),
            cfg.from_email.parse().context("parse FROM_EMAIL")?,
        );
        // Plain connection: the relay is local and unauthenticated.
        let transport = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&cfg.smtp_host)
            .port(cfg.smtp_port)
            .build();
        Ok(Self { transport, from })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(
        &self,
        kind: EmailKind,
        to: &str,
        params: &TemplateParams,
    ) -> Result<(), MailError> {
        let email = templates::compose(kind, to, params)?;
        let to_mailbox: Mailbox = email
            .to
            .parse()
            .map_err(|e| MailError::Address(format!("{}: {e}", email.to)))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(to_mailbox)
            .subject(&email.subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(email.text_body),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(email.html_body),
                    ),
            )
            .map_err(|e| MailError::SendFailed(format!("build message: {e}")))?;

        let response = self.transport.send(message).await.map_err(|e| {
            error!(error = %e, kind = ?kind, "smtp send failed");
            MailError::SendFailed(e.to_string())
        })?;
        info!(kind = ?kind, code = %response.code(), "email sent");
        Ok(())
    }
}
