//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;
use url::Url;
use webauthn_rs::prelude::*;

use crate::config::StorefrontConfig;
use crate::search::SearchIndex;
use crate::services::content::ContentService;

/// Error creating `WebAuthn` configuration.
#[derive(Debug, thiserror::Error)]
pub enum WebauthnConfigError {
    #[error("invalid base_url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("base_url must have a host")]
    MissingHost,
    #[error("webauthn error: {0}")]
    WebAuthn(#[from] WebauthnError),
}

/// Application state shared across all handlers.
///
/// Cheap to clone: everything lives behind one `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: PgPool,
    webauthn: Webauthn,
    search: SearchIndex,
    content: ContentService,
}

impl AppState {
    /// Create the application state.
    ///
    /// The search index starts empty; `search::spawn_refresh` fills it.
    ///
    /// # Errors
    ///
    /// Returns an error if the `WebAuthn` configuration is invalid.
    pub fn new(config: StorefrontConfig, pool: PgPool) -> Result<Self, WebauthnConfigError> {
        let webauthn = create_webauthn(&config.base_url)?;
        let content = ContentService::new(pool.clone(), config.content_cache_ttl);

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                webauthn,
                search: SearchIndex::new(),
                content,
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    #[must_use]
    pub fn webauthn(&self) -> &Webauthn {
        &self.inner.webauthn
    }

    /// The in-memory catalog search index.
    #[must_use]
    pub fn search(&self) -> &SearchIndex {
        &self.inner.search
    }

    /// Cached site content and category menu.
    #[must_use]
    pub fn content(&self) -> &ContentService {
        &self.inner.content
    }
}

/// Relying party derived from the public base URL.
fn create_webauthn(base_url: &str) -> Result<Webauthn, WebauthnConfigError> {
    let url = Url::parse(base_url)?;

    let rp_id = url
        .host_str()
        .ok_or(WebauthnConfigError::MissingHost)?
        .to_owned();

    let builder = WebauthnBuilder::new(&rp_id, &url)?
        .rp_name("Jouwwinkel")
        .allow_subdomains(false);

    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_webauthn_from_base_url() {
        assert!(create_webauthn("http://localhost:3000").is_ok());
        assert!(create_webauthn("https://shop.jouwwinkel.nl").is_ok());
        assert!(matches!(
            create_webauthn("not a url"),
            Err(WebauthnConfigError::InvalidUrl(_))
        ));
    }
}
