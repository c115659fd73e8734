//! Sign-in and sign-out for the back-office.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{AppError, clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::middleware::{clear_current_admin, set_current_admin};
use crate::models::{CurrentAdmin, session_keys};
use crate::services::{AdminAuthError, AdminAuthService};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// Login page template. Rendered without the signed-in layout.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub email: String,
    pub error: Option<String>,
}

/// Render the login page; signed-in admins go straight to the dashboard.
///
/// GET /auth/login
pub async fn login_page(session: Session) -> Result<Response, AppError> {
    if session
        .get::<CurrentAdmin>(session_keys::CURRENT_ADMIN)
        .await?
        .is_some()
    {
        return Ok(Redirect::to("/").into_response());
    }
    Ok(LoginTemplate {
        email: String::new(),
        error: None,
    }
    .into_response())
}

/// Check the credentials and start a session.
///
/// POST /auth/login
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    match AdminAuthService::new(state.pool())
        .login(&form.email, &form.password)
        .await
    {
        Ok(user) => {
            let current = CurrentAdmin::from(&user);
            set_current_admin(&session, &current).await?;
            set_sentry_user(&current.id, Some(current.email.as_str()));
            Ok(Redirect::to("/").into_response())
        }
        Err(AdminAuthError::InvalidCredentials) => {
            tracing::warn!("Admin login rejected");
            let page = LoginTemplate {
                email: form.email,
                error: Some("Invalid email or password".to_owned()),
            };
            Ok((StatusCode::UNAUTHORIZED, page).into_response())
        }
        Err(e) => Err(e.into()),
    }
}

/// Logout and clear session.
///
/// POST /auth/logout
pub async fn logout(session: Session) -> Result<Redirect, AppError> {
    clear_current_admin(&session).await?;
    clear_sentry_user();
    Ok(Redirect::to("/auth/login"))
}
