use async_trait::async_trait;
use tracing::info;

use super::{templates, EmailKind, MailError, Mailer, TemplateParams};

/// Renders the email and logs it instead of sending.
#[derive(Debug, Clone, Default)]
pub struct NoopMailer;

#[async_trait]
impl Mailer for NoopMailer {
    async fn send(
        &self,
        kind: EmailKind,
        to: &str,
        params: &TemplateParams,
    ) -> Result<(), MailError> {
        let email = templates::compose(kind, to, params)?;
        info!(to = %email.to, subject = %email.subject, "noop mailer: skipping send");
        Ok(())
    }
}
