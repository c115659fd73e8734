//! Review moderation queue.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, Query, State},
    response::Redirect,
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use jouwwinkel_core::{ReviewId, ReviewStatus};

use crate::db::{ReviewRepository, ReviewRow};
use crate::error::AppError;
use crate::filters::{self, short_datetime};
use crate::middleware::RequireWriter;
use crate::models::Flash;
use crate::routes::context::{PageContext, set_flash};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ReviewsQuery {
    #[serde(default)]
    pub status: String,
}

pub struct ReviewView {
    pub id: i32,
    pub product_id: i32,
    pub product_name: String,
    pub author_name: String,
    pub rating: i16,
    pub stars: String,
    pub title: String,
    pub body: String,
    pub verified_purchase: bool,
    pub submitted_at: String,
}

impl From<&ReviewRow> for ReviewView {
    fn from(row: &ReviewRow) -> Self {
        let filled = usize::try_from(row.rating.clamp(0, 5)).unwrap_or(0);
        Self {
            id: row.id.as_i32(),
            product_id: row.product_id.as_i32(),
            product_name: row.product_name.clone(),
            author_name: row.author_name.clone(),
            rating: row.rating,
            stars: format!("{}{}", "★".repeat(filled), "☆".repeat(5 - filled)),
            title: row.title.clone(),
            body: row.body.clone(),
            verified_purchase: row.verified_purchase,
            submitted_at: short_datetime(&row.created_at),
        }
    }
}

pub struct StatusTab {
    pub value: &'static str,
    pub label: &'static str,
    pub active: bool,
}

fn status_tabs(current: ReviewStatus) -> Vec<StatusTab> {
    ReviewStatus::ALL
        .iter()
        .map(|&s| StatusTab {
            value: s.as_str(),
            label: match s {
                ReviewStatus::Pending => "Pending",
                ReviewStatus::Approved => "Approved",
                ReviewStatus::Rejected => "Rejected",
            },
            active: s == current,
        })
        .collect()
}

#[derive(Template, WebTemplate)]
#[template(path = "reviews/index.html")]
pub struct ReviewsTemplate {
    pub ctx: PageContext,
    pub status: &'static str,
    pub tabs: Vec<StatusTab>,
    pub reviews: Vec<ReviewView>,
}

/// GET /reviews?status=pending
#[instrument(skip(state, ctx))]
pub async fn index(
    State(state): State<AppState>,
    ctx: PageContext,
    Query(query): Query<ReviewsQuery>,
) -> Result<ReviewsTemplate, AppError> {
    let status = query.status.parse().unwrap_or(ReviewStatus::Pending);
    let rows = ReviewRepository::new(state.pool()).list(status).await?;
    Ok(ReviewsTemplate {
        ctx,
        status: status.as_str(),
        tabs: status_tabs(status),
        reviews: rows.iter().map(ReviewView::from).collect(),
    })
}

async fn moderate(
    state: &AppState,
    session: &Session,
    id: i32,
    status: ReviewStatus,
    message: &str,
) -> Result<Redirect, AppError> {
    ReviewRepository::new(state.pool())
        .set_status(ReviewId::new(id), status)
        .await?;
    tracing::info!(review_id = id, status = %status, "Review moderated");
    set_flash(session, Flash::success(message)).await?;
    Ok(Redirect::to("/reviews"))
}

/// POST /reviews/{id}/approve
#[instrument(skip(state, session, admin), fields(admin_id = %admin.id))]
pub async fn approve(
    State(state): State<AppState>,
    session: Session,
    RequireWriter(admin): RequireWriter,
    Path(id): Path<i32>,
) -> Result<Redirect, AppError> {
    moderate(&state, &session, id, ReviewStatus::Approved, "Review published").await
}

/// POST /reviews/{id}/reject
#[instrument(skip(state, session, admin), fields(admin_id = %admin.id))]
pub async fn reject(
    State(state): State<AppState>,
    session: Session,
    RequireWriter(admin): RequireWriter,
    Path(id): Path<i32>,
) -> Result<Redirect, AppError> {
    moderate(&state, &session, id, ReviewStatus::Rejected, "Review rejected").await
}

/// POST /reviews/{id}/delete
#[instrument(skip(state, session, admin), fields(admin_id = %admin.id))]
pub async fn delete(
    State(state): State<AppState>,
    session: Session,
    RequireWriter(admin): RequireWriter,
    Path(id): Path<i32>,
) -> Result<Redirect, AppError> {
    ReviewRepository::new(state.pool()).delete(ReviewId::new(id)).await?;
    tracing::info!(review_id = id, "Review deleted");
    set_flash(&session, Flash::success("Review deleted")).await?;
    Ok(Redirect::to("/reviews"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tabs_mark_current_status() {
        let tabs = status_tabs(ReviewStatus::Approved);
        assert_eq!(tabs.len(), 3);
        assert!(tabs.iter().filter(|t| t.active).all(|t| t.value == "approved"));
        assert_eq!(tabs.iter().filter(|t| t.active).count(), 1);
    }
}
