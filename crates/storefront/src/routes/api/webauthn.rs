//! `WebAuthn` API routes.
//!
//! JSON endpoints driven by `static/js/passkeys.js`. Registration requires a
//! signed-in customer; authentication starts from an e-mail address.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use webauthn_rs::prelude::*;

use jouwwinkel_core::CustomerId;

use crate::error::{add_breadcrumb, set_sentry_user};
use crate::middleware::auth::take_return_path;
use crate::middleware::{RequireAuth, set_current_customer};
use crate::models::{CurrentCustomer, session_keys};
use crate::services::auth::{AuthError, AuthService};
use crate::state::AppState;

/// Longest accepted passkey name.
const MAX_PASSKEY_NAME: usize = 60;

/// Error body for API endpoints.
#[derive(Debug, Serialize)]
pub struct ApiError {
    #[serde(skip)]
    status: StatusCode,
    pub error: String,
}

impl ApiError {
    fn new(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            error: msg.into(),
        }
    }

    fn internal() -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            error: "something went wrong, please try again".to_owned(),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::Repository(_) | AuthError::PasswordHash => {
                tracing::error!(error = %e, "Passkey request failed");
                Self::internal()
            }
            other => Self::new(other.user_message()),
        }
    }
}

impl From<tower_sessions::session::Error> for ApiError {
    fn from(e: tower_sessions::session::Error) -> Self {
        tracing::error!(error = %e, "Session store failed");
        Self::internal()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

// ============================================================================
// Registration
// ============================================================================

#[derive(Debug, Serialize)]
pub struct StartRegistrationResponse {
    pub options: CreationChallengeResponse,
}

/// POST /api/auth/webauthn/register/start
///
/// # Errors
///
/// Returns `ApiError` if the challenge cannot be created.
pub async fn start_registration(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(customer): RequireAuth,
) -> Result<Json<StartRegistrationResponse>, ApiError> {
    let auth = AuthService::new(state.pool(), state.webauthn());

    let (options, reg_state) = auth
        .start_passkey_registration(customer.id, &customer.email, customer.greeting_name())
        .await?;

    session.insert(session_keys::WEBAUTHN_REG, reg_state).await?;

    Ok(Json(StartRegistrationResponse { options }))
}

#[derive(Debug, Deserialize)]
pub struct FinishRegistrationRequest {
    pub credential: RegisterPublicKeyCredential,
    /// Friendly name for the passkey, e.g. "iPhone".
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct FinishRegistrationResponse {
    pub success: bool,
    pub credential_id: i32,
}

/// POST /api/auth/webauthn/register/finish
///
/// # Errors
///
/// Returns `ApiError` if no registration is in progress or verification fails.
pub async fn finish_registration(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(customer): RequireAuth,
    Json(req): Json<FinishRegistrationRequest>,
) -> Result<Json<FinishRegistrationResponse>, ApiError> {
    let reg_state: PasskeyRegistration = session
        .remove(session_keys::WEBAUTHN_REG)
        .await?
        .ok_or_else(|| ApiError::new("no registration in progress"))?;

    let name = passkey_name(&req.name);
    let auth = AuthService::new(state.pool(), state.webauthn());
    let credential = auth
        .finish_passkey_registration(customer.id, &reg_state, &req.credential, &name)
        .await?;

    add_breadcrumb("auth", "Registered passkey", None);
    Ok(Json(FinishRegistrationResponse {
        success: true,
        credential_id: credential.id.as_i32(),
    }))
}

/// Trimmed passkey name, "Passkey" when blank, cut at a char boundary.
fn passkey_name(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return "Passkey".to_owned();
    }
    trimmed.chars().take(MAX_PASSKEY_NAME).collect()
}

// ============================================================================
// Authentication
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct StartAuthenticationRequest {
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct StartAuthenticationResponse {
    pub options: RequestChallengeResponse,
}

/// POST /api/auth/webauthn/authenticate/start
///
/// # Errors
///
/// Returns `ApiError` if the account is unknown or has no passkeys.
pub async fn start_authentication(
    State(state): State<AppState>,
    session: Session,
    Json(req): Json<StartAuthenticationRequest>,
) -> Result<Json<StartAuthenticationResponse>, ApiError> {
    let auth = AuthService::new(state.pool(), state.webauthn());

    let (options, auth_state, customer_id) = auth
        .start_passkey_authentication(&req.email)
        .await
        .map_err(|e| match e {
            // Same answer for both so the endpoint does not reveal accounts
            AuthError::CustomerNotFound | AuthError::NoCredentials => {
                ApiError::new("no passkeys registered for this account")
            }
            other => other.into(),
        })?;

    session
        .insert(session_keys::WEBAUTHN_AUTH, (auth_state, customer_id))
        .await?;

    Ok(Json(StartAuthenticationResponse { options }))
}

#[derive(Debug, Deserialize)]
pub struct FinishAuthenticationRequest {
    pub credential: PublicKeyCredential,
}

#[derive(Debug, Serialize)]
pub struct FinishAuthenticationResponse {
    pub success: bool,
    pub redirect: String,
}

/// POST /api/auth/webauthn/authenticate/finish
///
/// # Errors
///
/// Returns `ApiError` if no authentication is in progress or verification fails.
pub async fn finish_authentication(
    State(state): State<AppState>,
    session: Session,
    Json(req): Json<FinishAuthenticationRequest>,
) -> Result<Json<FinishAuthenticationResponse>, ApiError> {
    let (auth_state, customer_id): (PasskeyAuthentication, CustomerId) = session
        .remove(session_keys::WEBAUTHN_AUTH)
        .await?
        .ok_or_else(|| ApiError::new("no authentication in progress"))?;

    let auth = AuthService::new(state.pool(), state.webauthn());
    let customer = auth
        .finish_passkey_authentication(&auth_state, &req.credential, customer_id)
        .await?;

    let redirect = take_return_path(&session).await?;
    set_current_customer(&session, &CurrentCustomer::from(&customer)).await?;
    set_sentry_user(&customer.id, Some(customer.email.as_str()));
    add_breadcrumb("auth", "Signed in with passkey", None);

    Ok(Json(FinishAuthenticationResponse {
        success: true,
        redirect,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_passkey_name() {
        assert_eq!(passkey_name("  MacBook "), "MacBook");
        assert_eq!(passkey_name(""), "Passkey");
        assert_eq!(passkey_name(&"é".repeat(80)).chars().count(), MAX_PASSKEY_NAME);
    }

    #[test]
    fn test_storage_errors_are_not_leaked() {
        let err = ApiError::from(AuthError::PasswordHash);
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        let err = ApiError::from(AuthError::InvalidSessionState);
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.error, "Session expired, please try again");
    }
}
