//! Notification emails sent during the credential lifecycle.
//!
//! Handlers talk to [`Mailer`]; the transport (SMTP or no-op) is picked at
//! startup from `MAIL_BACKEND`. Bodies come from [`templates::compose`].

mod noop;
mod smtp;
pub mod templates;

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Serialize;

pub use noop::NoopMailer;
pub use smtp::SmtpMailer;

/// Named values substituted into a template's `{placeholders}`.
pub type TemplateParams = BTreeMap<&'static str, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EmailKind {
    Verification,
    Welcome,
    ForgotPassword,
    ResetSuccess,
}

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("invalid address: {0}")]
    Address(String),
    #[error("template rendering failed: {0}")]
    TemplateFailed(String),
    #[error("send failed: {0}")]
    SendFailed(String),
}

/// A rendered message ready for a transport.
#[derive(Debug, Clone)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html_body: String,
    pub text_body: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(
        &self,
        kind: EmailKind,
        to: &str,
        params: &TemplateParams,
    ) -> Result<(), MailError>;
}

#[cfg(test)]
pub use recording::RecordingMailer;

#[cfg(test)]
mod recording {
    use std::sync::Mutex;

    use super::*;

    /// Keeps every sent email in memory; can be told to fail.
    #[derive(Default)]
    pub struct RecordingMailer {
        sent: Mutex<Vec<(EmailKind, String, TemplateParams)>>,
        fail: std::sync::atomic::AtomicBool,
    }

    impl RecordingMailer {
        pub fn sent(&self) -> Vec<(EmailKind, String, TemplateParams)> {
            self.sent.lock().unwrap().clone()
        }

        /// Most recent `param` of an email of `kind`.
        pub fn last_param(&self, kind: EmailKind, param: &str) -> Option<String> {
            self.sent()
                .into_iter()
                .rev()
                .find(|(k, _, _)| *k == kind)
                .and_then(|(_, _, p)| p.get(param).cloned())
        }

        pub fn fail_sends(&self, fail: bool) {
            self.fail.store(fail, std::sync::atomic::Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(
            &self,
            kind: EmailKind,
            to: &str,
            params: &TemplateParams,
        ) -> Result<(), MailError> {
            if self.fail.load(std::sync::atomic::Ordering::SeqCst) {
                return Err(MailError::SendFailed("relay unavailable".into()));
            }
            templates::compose(kind, to, params)?;
            self.sent
                .lock()
                .unwrap()
                .push((kind, to.to_string(), params.clone()));
            Ok(())
        }
    }
}
