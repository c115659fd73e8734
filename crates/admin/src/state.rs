//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::AdminConfig;
use crate::services::{EmailService, MediaStore};

/// Application state shared across all handlers.
///
/// Cheap to clone: everything lives behind one `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AdminConfig,
    pool: PgPool,
    email: Option<EmailService>,
    media: MediaStore,
}

impl AppState {
    /// Create the application state.
    ///
    /// Without SMTP settings the admin runs without customer e-mails.
    ///
    /// # Errors
    ///
    /// Returns an error if the SMTP relay host is invalid.
    pub fn new(
        config: AdminConfig,
        pool: PgPool,
    ) -> Result<Self, lettre::transport::smtp::Error> {
        let email = match &config.smtp {
            Some(smtp) => Some(EmailService::new(smtp)?),
            None => {
                tracing::warn!("SMTP not configured, order e-mails are disabled");
                None
            }
        };
        let media = MediaStore::new(config.media_dir.clone(), config.media_max_bytes);

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                email,
                media,
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &AdminConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// The mailer, when SMTP is configured.
    #[must_use]
    pub fn email(&self) -> Option<&EmailService> {
        self.inner.email.as_ref()
    }

    #[must_use]
    pub fn media(&self) -> &MediaStore {
        &self.inner.media
    }
}
