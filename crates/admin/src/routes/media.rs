//! Image upload and delivery.
//!
//! `POST /media` takes a multipart `file` field and answers with the public
//! URL as JSON, for pasting into any image field. Product pages upload
//! through their own route, which also attaches the image.

use axum::{
    Json,
    body::Body,
    extract::{Multipart, Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::instrument;

use crate::db::ProductRepository;
use crate::error::AppError;
use crate::middleware::RequireWriter;
use crate::state::AppState;

/// Multipart field names accepted for the image.
const FILE_FIELDS: [&str; 2] = ["file", "image"];

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub url: String,
}

/// Read the first image field of a multipart body.
///
/// # Errors
///
/// Returns `AppError::BadRequest` for a malformed body or a missing field.
pub async fn read_upload(multipart: &mut Multipart) -> Result<Vec<u8>, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("invalid upload: {e}")))?
    {
        if field.name().is_some_and(|name| FILE_FIELDS.contains(&name)) {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(format!("invalid upload: {e}")))?;
            return Ok(bytes.to_vec());
        }
    }
    Err(AppError::BadRequest("choose an image to upload".to_owned()))
}

/// Delete an uploaded file once nothing shows it any more.
///
/// # Errors
///
/// Returns an error if the lookup or the removal fails.
pub async fn release_image(state: &AppState, url: &str) -> Result<(), AppError> {
    if ProductRepository::new(state.pool()).image_in_use(url).await? {
        return Ok(());
    }
    state.media().delete(url).await?;
    Ok(())
}

/// Store an uploaded image.
///
/// POST /media
#[instrument(skip_all, fields(admin_id = %admin.id))]
pub async fn upload(
    State(state): State<AppState>,
    RequireWriter(admin): RequireWriter,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResponse>), AppError> {
    let bytes = read_upload(&mut multipart).await?;
    let url = state.media().save(&bytes).await?;
    Ok((StatusCode::CREATED, Json(UploadResponse { url })))
}

/// Serve a stored image. Names are random, so the file never changes.
///
/// GET /media/{name}
pub async fn serve(State(state): State<AppState>, Path(name): Path<String>) -> Result<Response, AppError> {
    let (format, bytes) = state
        .media()
        .read(&name)
        .await?
        .ok_or_else(|| AppError::NotFound("Image".to_owned()))?;

    Ok((
        [
            (header::CONTENT_TYPE, format.content_type()),
            (header::CACHE_CONTROL, "public, max-age=31536000, immutable"),
        ],
        Body::from(bytes),
    )
        .into_response())
}
