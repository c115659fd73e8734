//! Sign-in, registration and sign-out.
//!
//! Passwords are the primary credential; passkeys are added from the
//! account page and used through the `WebAuthn` API routes.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use jouwwinkel_core::models::Customer;

use crate::error::{AppError, add_breadcrumb, clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::middleware::auth::take_return_path;
use crate::middleware::{clear_current_customer, set_current_customer};
use crate::models::{CurrentCustomer, Flash};
use crate::routes::context::{PageContext, set_flash};
use crate::services::auth::{AuthError, AuthService, MIN_PASSWORD_LENGTH};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub email: String,
    #[serde(default)]
    pub full_name: String,
    pub password: String,
    pub password_confirm: String,
}

#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub ctx: PageContext,
    pub email: String,
    pub error: Option<String>,
}

#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub ctx: PageContext,
    pub email: String,
    pub full_name: String,
    pub min_password_length: usize,
    pub error: Option<String>,
}

/// Sign the customer in and send them where they were headed.
async fn sign_in(session: &Session, customer: &Customer) -> Result<Response, AppError> {
    let return_to = take_return_path(session).await?;
    set_current_customer(session, &CurrentCustomer::from(customer)).await?;
    set_sentry_user(&customer.id, Some(customer.email.as_str()));
    Ok(Redirect::to(&return_to).into_response())
}

/// Display the login page.
pub async fn login_page(ctx: PageContext) -> Response {
    if ctx.is_signed_in() {
        return Redirect::to("/account").into_response();
    }
    LoginTemplate {
        ctx,
        email: String::new(),
        error: None,
    }
    .into_response()
}

/// Handle the login form.
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    ctx: PageContext,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let auth = AuthService::new(state.pool(), state.webauthn());

    match auth.login_with_password(&form.email, &form.password).await {
        Ok(customer) => {
            add_breadcrumb("auth", "Signed in with password", None);
            sign_in(&session, &customer).await
        }
        Err(
            e @ (AuthError::InvalidCredentials
            | AuthError::CustomerNotFound
            | AuthError::InvalidEmail(_)),
        ) => {
            tracing::info!("Login rejected");
            Ok(LoginTemplate {
                ctx,
                email: form.email,
                error: Some(e.user_message()),
            }
            .into_response())
        }
        Err(e) => Err(e.into()),
    }
}

/// Display the registration page.
pub async fn register_page(ctx: PageContext) -> Response {
    if ctx.is_signed_in() {
        return Redirect::to("/account").into_response();
    }
    RegisterTemplate {
        ctx,
        email: String::new(),
        full_name: String::new(),
        min_password_length: MIN_PASSWORD_LENGTH,
        error: None,
    }
    .into_response()
}

/// Handle the registration form. A new account is signed in right away.
#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    ctx: PageContext,
    Form(form): Form<RegisterForm>,
) -> Result<Response, AppError> {
    let rerender = |ctx: PageContext, form: RegisterForm, error: String| {
        RegisterTemplate {
            ctx,
            email: form.email,
            full_name: form.full_name,
            min_password_length: MIN_PASSWORD_LENGTH,
            error: Some(error),
        }
        .into_response()
    };

    if form.password != form.password_confirm {
        return Ok(rerender(ctx, form, "Passwords do not match".to_owned()));
    }

    let auth = AuthService::new(state.pool(), state.webauthn());
    match auth
        .register_with_password(&form.email, &form.full_name, &form.password)
        .await
    {
        Ok(customer) => {
            tracing::info!(customer_id = %customer.id, "Customer registered");
            set_flash(&session, Flash::success("Welcome! Your account is ready.")).await?;
            sign_in(&session, &customer).await
        }
        Err(
            e @ (AuthError::InvalidEmail(_)
            | AuthError::WeakPassword(_)
            | AuthError::InvalidName(_)
            | AuthError::CustomerAlreadyExists),
        ) => Ok(rerender(ctx, form, e.user_message())),
        Err(e) => Err(e.into()),
    }
}

/// Sign out. The cart stays in the session.
pub async fn logout(session: Session) -> Result<Redirect, AppError> {
    clear_current_customer(&session).await?;
    clear_sentry_user();
    set_flash(&session, Flash::success("You have been signed out.")).await?;
    Ok(Redirect::to("/"))
}
