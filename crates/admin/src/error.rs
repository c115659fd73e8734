//! Unified error handling for admin.

use askama::Template;
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;

use jouwwinkel_core::validation::ValidationErrors;

use crate::db::RepositoryError;
use crate::services::{AdminAuthError, InventoryError, MediaError, OrderActionError};

/// Application-level error type for the admin panel.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Sign-in or account creation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AdminAuthError),

    /// Upload rejected or disk failure.
    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    /// Order workflow refused a change.
    #[error("Order error: {0}")]
    OrderAction(#[from] OrderActionError),

    /// Variant generation failed.
    #[error("Inventory error: {0}")]
    Inventory(#[from] InventoryError),

    /// Session store failed.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Form input failed validation.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationErrors),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User lacks permission.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Request conflicts with current state.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Template)]
#[template(path = "error.html")]
struct ErrorTemplate {
    status: u16,
    title: &'static str,
    message: String,
}

const INTERNAL_MESSAGE: &str = "Something went wrong. The error has been reported.";

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Database(RepositoryError::NotFound) | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Database(RepositoryError::Conflict(_)) | Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Database(_) | Self::Session(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::Auth(err) => match err {
                AdminAuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
                AdminAuthError::InvalidEmail(_) | AdminAuthError::WeakPassword(_) => {
                    StatusCode::BAD_REQUEST
                }
                AdminAuthError::UserAlreadyExists => StatusCode::CONFLICT,
                AdminAuthError::PasswordHash | AdminAuthError::Repository(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Media(err) => match err {
                MediaError::Empty | MediaError::UnsupportedType => StatusCode::BAD_REQUEST,
                MediaError::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
                MediaError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::OrderAction(err) => match err {
                OrderActionError::NotFound => StatusCode::NOT_FOUND,
                OrderActionError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
                OrderActionError::Transition(_)
                | OrderActionError::Payment { .. }
                | OrderActionError::NotShippable => StatusCode::CONFLICT,
                OrderActionError::UnknownPartner | OrderActionError::InvalidTracking => {
                    StatusCode::BAD_REQUEST
                }
            },
            Self::Inventory(err) => match err {
                InventoryError::Variants(_) => StatusCode::BAD_REQUEST,
                InventoryError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
                InventoryError::Repository(RepositoryError::Conflict(_)) => StatusCode::CONFLICT,
                InventoryError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Message safe to show; internal details never leak.
    #[must_use]
    pub fn public_message(&self) -> String {
        if self.status().is_server_error() {
            return INTERNAL_MESSAGE.to_owned();
        }
        match self {
            Self::Database(RepositoryError::NotFound) => "Not found".to_owned(),
            Self::Database(RepositoryError::Conflict(what))
            | Self::Inventory(InventoryError::Repository(RepositoryError::Conflict(what))) => {
                what.clone()
            }
            Self::Auth(AdminAuthError::InvalidCredentials) => {
                "Invalid email or password".to_owned()
            }
            Self::Auth(err) => err.to_string(),
            Self::Media(err) => err.to_string(),
            Self::OrderAction(err) => err.to_string(),
            Self::Inventory(err) => err.to_string(),
            Self::Validation(errors) => errors.messages().join(" "),
            Self::NotFound(what) => format!("{what} not found"),
            Self::Forbidden(msg) | Self::BadRequest(msg) | Self::Conflict(msg) => msg.clone(),
            _ => INTERNAL_MESSAGE.to_owned(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Log server errors with Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Admin request error"
            );
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "Request rejected");
        }

        let page = ErrorTemplate {
            status: status.as_u16(),
            title: status.canonical_reason().unwrap_or("Error"),
            message: self.public_message(),
        };

        match page.render() {
            Ok(html) => (status, Html(html)).into_response(),
            Err(_) => (status, page.message).into_response(),
        }
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Associate subsequent Sentry events with the signed-in admin.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context on logout.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

#[cfg(test)]
mod tests {
    use jouwwinkel_core::variants::VariantError;
    use jouwwinkel_core::{OrderStatus, TransitionError};

    use super::*;

    fn status_of(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("Product".to_string());
        assert_eq!(err.to_string(), "Not found: Product");
        assert_eq!(err.public_message(), "Product not found");
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(status_of(AppError::NotFound("x".into())), StatusCode::NOT_FOUND);
        assert_eq!(status_of(AppError::Forbidden("x".into())), StatusCode::FORBIDDEN);
        assert_eq!(status_of(AppError::BadRequest("x".into())), StatusCode::BAD_REQUEST);
        assert_eq!(status_of(AppError::Conflict("x".into())), StatusCode::CONFLICT);
        assert_eq!(
            status_of(AppError::Internal("x".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_of(AppError::Database(RepositoryError::Conflict("slug taken".into()))),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(AppError::Media(MediaError::TooLarge { max_bytes: 10 })),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            status_of(AppError::Auth(AdminAuthError::InvalidCredentials)),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_of(AppError::Inventory(InventoryError::Variants(
                VariantError::TooManyCombinations { count: 300 }
            ))),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_order_errors_explain_themselves() {
        let err = AppError::OrderAction(OrderActionError::Transition(TransitionError {
            from: OrderStatus::Delivered,
            to: OrderStatus::Pending,
        }));
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert_eq!(err.public_message(), "an order cannot move from delivered to pending");
    }

    #[test]
    fn test_internal_details_are_hidden() {
        let err = AppError::Internal("pool exhausted at 10.0.0.3".into());
        assert!(!err.public_message().contains("10.0.0.3"));
        let err = AppError::Database(RepositoryError::DataCorruption("bad email".into()));
        assert_eq!(err.public_message(), INTERNAL_MESSAGE);
    }
}
