use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

/// Default session lifetime: seven days.
const DEFAULT_JWT_TTL_MINUTES: i64 = 60 * 24 * 7;
/// Longest session lifetime accepted from the environment: one year.
const MAX_JWT_TTL_MINUTES: i64 = 60 * 24 * 366;

/// Parse `JWT_TTL_MINUTES`, rejecting values that are not a positive
/// number of minutes up to a year.
fn parse_ttl_minutes(raw: Option<&str>) -> anyhow::Result<i64> {
    let Some(raw) = raw else {
        return Ok(DEFAULT_JWT_TTL_MINUTES);
    };
    let minutes: i64 = raw
        .trim()
        .parse()
        .with_context(|| format!("JWT_TTL_MINUTES {raw:?} is not a number"))?;
    if !(1..=MAX_JWT_TTL_MINUTES).contains(&minutes) {
        anyhow::bail!("JWT_TTL_MINUTES must be between 1 and {MAX_JWT_TTL_MINUTES}, got {minutes}");
    }
    Ok(minutes)
}

/// Which credential store backs the service.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Postgres,
    Memory,
}

/// Which mail transport delivers notifications.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MailBackend {
    Smtp,
    Noop,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    pub backend: MailBackend,
    pub smtp_host: String,
    pub smtp_port: u16,
    pub from_email: String,
    pub from_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub store: StoreBackend,
    pub database_url: Option<String>,
    pub jwt: JwtConfig,
    pub mail: MailConfig,
    /// Front-end origin: reset links point here and CORS allows it.
    pub client_url: String,
    /// Mark the session cookie `Secure`.
    pub secure_cookies: bool,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let store = match std::env::var("USER_STORE").as_deref() {
            Ok("memory") => StoreBackend::Memory,
            Ok("postgres") | Err(_) => StoreBackend::Postgres,
            Ok(other) => anyhow::bail!("unknown USER_STORE {other:?}"),
        };
        let database_url = std::env::var("DATABASE_URL").ok();
        if store == StoreBackend::Postgres && database_url.is_none() {
            anyhow::bail!("DATABASE_URL must be set when USER_STORE=postgres");
        }

        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET").context("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "authgate".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "authgate-users".into()),
            ttl_minutes: parse_ttl_minutes(std::env::var("JWT_TTL_MINUTES").ok().as_deref())?,
        };

        let mail = MailConfig {
            backend: match std::env::var("MAIL_BACKEND").as_deref() {
                Ok("noop") => MailBackend::Noop,
                Ok("smtp") | Err(_) => MailBackend::Smtp,
                Ok(other) => anyhow::bail!("unknown MAIL_BACKEND {other:?}"),
            },
            smtp_host: std::env::var("SMTP_HOST").unwrap_or_else(|_| "localhost".into()),
            smtp_port: std::env::var("SMTP_PORT")
                .ok()
                .and_then(|v| v.parse::<u16>().ok())
                .unwrap_or(1025),
            from_email: std::env::var("FROM_EMAIL")
                .unwrap_or_else(|_| "no-reply@authgate.local".into()),
            from_name: std::env::var("FROM_NAME").unwrap_or_else(|_| "Authgate".into()),
        };

        let client_url = std::env::var("CLIENT_URL")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .trim_end_matches('/')
            .to_string();

        let secure_cookies = std::env::var("APP_ENV")
            .map(|v| v == "production")
            .unwrap_or(false);

        Ok(Self {
            store,
            database_url,
            jwt,
            mail,
            client_url,
            secure_cookies,
        })
    }

    /// Link the user follows to choose a new password.
    pub fn reset_url(&self, token: &str) -> String {
        format!("{}/reset-password/{}", self.client_url, token)
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> AppConfig {
    AppConfig {
        store: StoreBackend::Memory,
        database_url: None,
        jwt: JwtConfig {
            secret: "test-secret".into(),
            issuer: "test-issuer".into(),
            audience: "test-aud".into(),
            ttl_minutes: 60,
        },
        mail: MailConfig {
            backend: MailBackend::Noop,
            smtp_host: "localhost".into(),
            smtp_port: 1025,
            from_email: "no-reply@test.local".into(),
            from_name: "Test".into(),
        },
        client_url: "http://client.test".into(),
        secure_cookies: false,
    }
}
