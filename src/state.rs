use std::sync::Arc;

use anyhow::Context;

use crate::auth::memory::MemoryUserStore;
use crate::auth::repo::{PgUserStore, UserStore};
use crate::clock::{Clock, SystemClock};
use crate::config::{AppConfig, MailBackend, StoreBackend};
use crate::mail::{Mailer, NoopMailer, SmtpMailer};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserStore>,
    pub mailer: Arc<dyn Mailer>,
    pub clock: Arc<dyn Clock>,
}

/// Bring the schema up to date. A failure aborts startup.
async fn run_migrations(db: &sqlx::PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations")
        .run(db)
        .await
        .context("run migrations")?;
    tracing::info!("database migrations applied");
    Ok(())
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let users = match config.store {
            StoreBackend::Postgres => {
                let url = config
                    .database_url
                    .as_deref()
                    .context("DATABASE_URL missing")?;
                let db = sqlx::postgres::PgPoolOptions::new()
                    .max_connections(10)
                    .connect(url)
                    .await
                    .context("connect to database")?;

                run_migrations(&db).await?;
                Arc::new(PgUserStore::new(db)) as Arc<dyn UserStore>
            }
            StoreBackend::Memory => {
                tracing::warn!("using in-memory user store; data is lost on restart");
                Arc::new(MemoryUserStore::new()) as Arc<dyn UserStore>
            }
        };

        let mailer = match config.mail.backend {
            MailBackend::Smtp => Arc::new(SmtpMailer::new(&config.mail)?) as Arc<dyn Mailer>,
            MailBackend::Noop => Arc::new(NoopMailer) as Arc<dyn Mailer>,
        };

        Ok(Self::from_parts(config, users, mailer, Arc::new(SystemClock)))
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        users: Arc<dyn UserStore>,
        mailer: Arc<dyn Mailer>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            users,
            mailer,
            clock,
        }
    }
}

/// Handles onto the fakes inside a test [`AppState`].
#[cfg(test)]
pub struct Fakes {
    pub mailer: Arc<crate::mail::RecordingMailer>,
    pub clock: Arc<crate::clock::ManualClock>,
}

#[cfg(test)]
impl AppState {
    /// In-memory store, recording mailer and a clock that only moves on demand.
    pub fn fake() -> (Self, Fakes) {
        use crate::clock::ManualClock;
        use crate::mail::RecordingMailer;

        let mailer = Arc::new(RecordingMailer::default());
        let clock = Arc::new(ManualClock::new(time::OffsetDateTime::now_utc()));
        let state = Self::from_parts(
            Arc::new(crate::config::test_config()),
            Arc::new(MemoryUserStore::new()),
            mailer.clone(),
            clock.clone(),
        );
        (state, Fakes { mailer, clock })
    }
}
