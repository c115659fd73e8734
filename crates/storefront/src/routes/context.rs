//! Layout data shared by every full page, plus session helpers for the cart
//! and flash messages.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use tower_sessions::Session;

use jouwwinkel_core::cart::Cart;
use jouwwinkel_core::models::{Category, UiConfig};

use crate::error::AppError;
use crate::middleware::CspNonce;
use crate::models::{CurrentCustomer, Flash, session_keys};
use crate::state::AppState;

/// Everything `base.html` needs: site texts, category menu, the signed-in
/// customer, cart badge, a pending flash message and the CSP nonce.
///
/// Extracting it consumes the flash message.
pub struct PageContext {
    pub site: Arc<UiConfig>,
    pub menu: Arc<Vec<Category>>,
    pub customer: Option<CurrentCustomer>,
    pub cart_count: u32,
    pub flash: Option<Flash>,
    pub nonce: String,
}

impl PageContext {
    #[must_use]
    pub const fn is_signed_in(&self) -> bool {
        self.customer.is_some()
    }
}

impl FromRequestParts<AppState> for PageContext {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let session = parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or_else(|| AppError::Internal("session layer missing".to_owned()))?;
        let nonce = parts
            .extensions
            .get::<CspNonce>()
            .map(|n| n.value().to_owned())
            .unwrap_or_default();

        let site = state.content().ui_config().await?;
        let menu = state.content().categories().await?;
        let customer = session
            .get::<CurrentCustomer>(session_keys::CURRENT_CUSTOMER)
            .await?;
        let cart_count = load_cart(&session).await?.item_count();
        let flash = take_flash(&session).await?;

        Ok(Self {
            site,
            menu,
            customer,
            cart_count,
            flash,
            nonce,
        })
    }
}

/// The session cart, empty when none was stored yet.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn load_cart(session: &Session) -> Result<Cart, tower_sessions::session::Error> {
    Ok(session.get::<Cart>(session_keys::CART).await?.unwrap_or_default())
}

/// Persist the cart in the session.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn save_cart(session: &Session, cart: &Cart) -> Result<(), tower_sessions::session::Error> {
    session.insert(session_keys::CART, cart).await
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

    use jouwwinkel_core::ProductId;
    use jouwwinkel_core::cart::CartItem;
    use tower_sessions::MemoryStore;

    use super::*;

    fn session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    #[tokio::test]
    async fn test_cart_round_trip_through_session() {
        let session = session();
        assert!(load_cart(&session).await.unwrap().is_empty());

        let mut cart = Cart::new();
        cart.add(CartItem::product(ProductId::new(4), None), 2);
        save_cart(&session, &cart).await.unwrap();

        assert_eq!(load_cart(&session).await.unwrap().item_count(), 2);
    }

    #[tokio::test]
    async fn test_flash_is_shown_once() {
        let session = session();
        set_flash(&session, Flash::success("Saved")).await.unwrap();
        assert_eq!(take_flash(&session).await.unwrap(), Some(Flash::success("Saved")));
        assert_eq!(take_flash(&session).await.unwrap(), None);
    }
}
