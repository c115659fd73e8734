//! Layout data shared by every admin page, plus flash helpers.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};
use tower_sessions::Session;

use crate::db::page_count;
use crate::error::AppError;
use crate::middleware::RequireAdminAuth;
use crate::models::{CurrentAdmin, Flash, session_keys};
use crate::state::AppState;

/// Sidebar sections; `href` doubles as the prefix that marks it active.
pub const NAV: &[(&str, &str)] = &[
    ("/", "Dashboard"),
    ("/orders", "Orders"),
    ("/products", "Products"),
    ("/categories", "Categories"),
    ("/combos", "Combos"),
    ("/coupons", "Coupons"),
    ("/shipping", "Shipping"),
    ("/reviews", "Reviews"),
    ("/customers", "Customers"),
    ("/settings", "Settings"),
];

/// Everything `base.html` needs: the signed-in admin, the current path for
/// the sidebar and a pending flash message.
///
/// Requires a signed-in admin. Extracting it consumes the flash message.
pub struct PageContext {
    pub admin: CurrentAdmin,
    pub current_path: String,
    pub flash: Option<Flash>,
    pub storefront_url: String,
}

impl PageContext {
    /// Whether a sidebar entry belongs to the current page.
    #[must_use]
    pub fn is_active(&self, href: &str) -> bool {
        if href == "/" {
            return self.current_path == "/";
        }
        self.current_path == href
            || self
                .current_path
                .strip_prefix(href)
                .is_some_and(|rest| rest.starts_with('/'))
    }

    #[must_use]
    pub const fn can_write(&self) -> bool {
        self.admin.can_write()
    }

    #[must_use]
    pub const fn nav(&self) -> &'static [(&'static str, &'static str)] {
        NAV
    }
}

impl FromRequestParts<AppState> for PageContext {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let RequireAdminAuth(admin) = RequireAdminAuth::from_request_parts(parts, state)
            .await
            .map_err(IntoResponse::into_response)?;

        let session = parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or_else(|| AppError::Internal("session layer missing".to_owned()).into_response())?;
        let flash = take_flash(&session)
            .await
            .map_err(|e| AppError::from(e).into_response())?;

        Ok(Self {
            admin,
            current_path: parts.uri.path().to_owned(),
            flash,
            storefront_url: state.config().storefront_url(""),
        })
    }
}

/// Previous/next links under a paged table.
pub struct Pager {
    pub page: u32,
    pub pages: u32,
    pub total: i64,
    /// Filter parameters to carry along, already encoded, ending in `&`
    /// when not empty.
    pub query: String,
}

impl Pager {
    #[must_use]
    pub fn new(page: u32, total: i64, filters: &[(&str, &str)]) -> Self {
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        for (key, value) in filters.iter().filter(|(_, v)| !v.is_empty()) {
            serializer.append_pair(key, value);
        }
        let mut query = serializer.finish();
        if !query.is_empty() {
            query.push('&');
        }
        Self {
            page: page.max(1),
            pages: page_count(total),
            total,
            query,
        }
    }

    #[must_use]
    pub fn prev(&self) -> Option<u32> {
        (self.page > 1).then(|| self.page - 1)
    }

    #[must_use]
    pub fn next(&self) -> Option<u32> {
        (self.page < self.pages).then(|| self.page + 1)
    }
}

/// Queue a message for the next rendered page.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn set_flash(session: &Session, flash: Flash) -> Result<(), tower_sessions::session::Error> {
    session.insert(session_keys::FLASH, flash).await
}

/// Take the queued message, if any.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn take_flash(session: &Session) -> Result<Option<Flash>, tower_sessions::session::Error> {
    session.remove::<Flash>(session_keys::FLASH).await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use jouwwinkel_core::{AdminRole, AdminUserId, Email};
    use tower_sessions::MemoryStore;

    use super::*;

    fn ctx(path: &str) -> PageContext {
        PageContext {
            admin: CurrentAdmin {
                id: AdminUserId::new(1),
                email: Email::parse("beheer@jouwwinkel.nl").unwrap(),
                name: "Beheer".to_owned(),
                role: AdminRole::Viewer,
            },
            current_path: path.to_owned(),
            flash: None,
            storefront_url: "http://localhost:3000".to_owned(),
        }
    }

    #[test]
    fn test_active_nav_entry() {
        assert!(ctx("/").is_active("/"));
        assert!(!ctx("/orders").is_active("/"));
        assert!(ctx("/orders/12").is_active("/orders"));
        assert!(ctx("/products").is_active("/products"));
        assert!(!ctx("/products-archive").is_active("/products"));
        assert!(!ctx("/").can_write());
    }

    #[test]
    fn test_pager_links() {
        let pager = Pager::new(2, 60, &[("status", "pending"), ("q", "de vries"), ("x", "")]);
        assert_eq!(pager.pages, 3);
        assert_eq!(pager.prev(), Some(1));
        assert_eq!(pager.next(), Some(3));
        assert_eq!(pager.query, "status=pending&q=de+vries&");

        let single = Pager::new(1, 3, &[]);
        assert_eq!(single.prev(), None);
        assert_eq!(single.next(), None);
        assert_eq!(single.query, "");
    }

    #[tokio::test]
    async fn test_flash_is_shown_once() {
        let session = Session::new(None, Arc::new(MemoryStore::default()), None);
        set_flash(&session, Flash::error("Nope")).await.unwrap();
        assert_eq!(take_flash(&session).await.unwrap(), Some(Flash::error("Nope")));
        assert_eq!(take_flash(&session).await.unwrap(), None);
    }
}
