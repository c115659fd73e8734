//! Authentication extractors.
//!
//! Provides extractors for requiring a signed-in customer in route handlers.

use axum::{
    extract::FromRequestParts,
    http::{Method, StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use crate::models::{CurrentCustomer, session_keys};

/// Extractor that requires a signed-in customer.
///
/// Page requests are redirected to the login page, remembering where the
/// customer wanted to go; API requests get `401`.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAuth(customer): RequireAuth,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", customer.email)
/// }
/// ```
pub struct RequireAuth(pub CurrentCustomer);

/// Error returned when authentication is required but the customer is not logged in.
pub enum AuthRejection {
    /// Redirect to login page (for HTML requests).
    RedirectToLogin,
    /// Unauthorized response (for API and HTMX requests).
    Unauthorized,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin => Redirect::to("/auth/login").into_response(),
            Self::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
        }
    }
}

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session = parts
            .extensions
            .get::<Session>()
            .ok_or(AuthRejection::Unauthorized)?;

        if let Some(customer) = session
            .get::<CurrentCustomer>(session_keys::CURRENT_CUSTOMER)
            .await
            .ok()
            .flatten()
        {
            return Ok(Self(customer));
        }

        let is_api = parts.uri.path().starts_with("/api/") || parts.headers.contains_key("hx-request");
        if is_api {
            return Err(AuthRejection::Unauthorized);
        }

        if parts.method == Method::GET
            && let Some(path) = parts.uri.path_and_query().map(|p| p.as_str())
            && let Some(path) = safe_return_path(path)
        {
            // Best effort: losing the return path only means landing on /account
            let _ = session.insert(session_keys::RETURN_TO, path).await;
        }

        Err(AuthRejection::RedirectToLogin)
    }
}

/// Extractor that optionally gets the current customer.
///
/// Unlike `RequireAuth`, this does not reject the request if the customer is not logged in.
pub struct OptionalAuth(pub Option<CurrentCustomer>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let customer = match parts.extensions.get::<Session>() {
            Some(session) => session
                .get::<CurrentCustomer>(session_keys::CURRENT_CUSTOMER)
                .await
                .ok()
                .flatten(),
            None => None,
        };

        Ok(Self(customer))
    }
}

/// Only same-site absolute paths may be used as a post-login redirect.
#[must_use]
pub fn safe_return_path(path: &str) -> Option<&str> {
    let ok = path.starts_with('/')
        && !path.starts_with("//")
        && !path.starts_with("/\\")
        && !path.starts_with("/auth/");
    ok.then_some(path)
}

/// Store the signed-in customer in the session.
///
/// The session ID is cycled first so a pre-login session ID cannot be
/// reused (session fixation).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_customer(
    session: &Session,
    customer: &CurrentCustomer,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session
        .insert(session_keys::CURRENT_CUSTOMER, customer)
        .await
}

/// Take the remembered post-login path, defaulting to the account page.
///
/// # Errors
///
/// Returns an error if the session cannot be read.
pub async fn take_return_path(session: &Session) -> Result<String, tower_sessions::session::Error> {
    let path: Option<String> = session.remove(session_keys::RETURN_TO).await?;
    Ok(path
        .filter(|p| safe_return_path(p).is_some())
        .unwrap_or_else(|| "/account".to_owned()))
}

/// Clear the current customer from the session (logout).
///
/// The cart survives logout.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_customer(
    session: &Session,
) -> Result<(), tower_sessions::session::Error> {
    session
        .remove::<CurrentCustomer>(session_keys::CURRENT_CUSTOMER)
        .await?;
    session.cycle_id().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_return_path() {
        assert_eq!(safe_return_path("/checkout"), Some("/checkout"));
        assert_eq!(safe_return_path("/products?page=2"), Some("/products?page=2"));
        assert_eq!(safe_return_path("//evil.example"), None);
        assert_eq!(safe_return_path("/\\evil.example"), None);
        assert_eq!(safe_return_path("https://evil.example"), None);
        assert_eq!(safe_return_path("/auth/login"), None);
    }
}
