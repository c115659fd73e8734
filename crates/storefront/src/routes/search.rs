//! Search pages.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Query, State},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::instrument;

use crate::error::AppError;
use crate::filters;
use crate::routes::context::PageContext;
use crate::search::{SearchFilters, SearchResults, SearchSort};
use crate::state::AppState;

const PAGE_LIMIT: usize = 60;
const SUGGEST_LIMIT: usize = 5;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SuggestQuery {
    pub q: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SearchPageQuery {
    pub q: String,
    pub sort_by: String,
    /// `in_stock`, `out_of_stock` or empty.
    pub availability: String,
    /// Price bounds in euros, as typed.
    pub min: String,
    pub max: String,
}

/// Suggestions dropdown (HTMX fragment).
#[derive(Template, WebTemplate)]
#[template(path = "partials/search_suggest.html")]
pub struct SuggestTemplate {
    pub results: SearchResults,
    pub is_ready: bool,
}

#[derive(Template, WebTemplate)]
#[template(path = "pages/search.html")]
pub struct SearchPageTemplate {
    pub ctx: PageContext,
    pub query: String,
    pub results: SearchResults,
    pub sort_by: &'static str,
    pub availability: String,
    pub min: String,
    pub max: String,
    pub is_ready: bool,
}

/// GET /search/suggest?q=
#[instrument(skip(state))]
pub async fn suggest(
    State(state): State<AppState>,
    Query(query): Query<SuggestQuery>,
) -> Result<Response, AppError> {
    let q = query.q.trim();
    let results = if q.is_empty() {
        SearchResults::default()
    } else {
        state.search().suggest(q, SUGGEST_LIMIT)?
    };

    Ok(SuggestTemplate {
        results,
        is_ready: state.search().is_ready(),
    }
    .into_response())
}

/// GET /search
#[instrument(skip(state, ctx))]
pub async fn search_page(
    State(state): State<AppState>,
    ctx: PageContext,
    Query(query): Query<SearchPageQuery>,
) -> Result<Response, AppError> {
    let sort = SearchSort::parse(&query.sort_by);
    let filters = SearchFilters::from_params(
        Some(query.availability.as_str()),
        Some(query.min.as_str()),
        Some(query.max.as_str()),
    );

    let results = state
        .search()
        .search_filtered(query.q.trim(), &filters, sort, PAGE_LIMIT)?;

    Ok(SearchPageTemplate {
        ctx,
        results,
        sort_by: sort.as_str(),
        is_ready: state.search().is_ready(),
        query: query.q,
        availability: query.availability,
        min: query.min,
        max: query.max,
    }
    .into_response())
}
