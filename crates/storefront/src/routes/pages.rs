//! Content pages edited from the back-office.

use askama::Template;
use askama_web::WebTemplate;
use axum::response::IntoResponse;

use crate::filters;
use crate::routes::context::PageContext;
use crate::services::content::render_markdown;

#[derive(Template, WebTemplate)]
#[template(path = "pages/content.html")]
pub struct ContentPageTemplate {
    pub ctx: PageContext,
    pub title: String,
    pub content_html: String,
}

/// GET /about
///
/// Markdown from the site settings; raw HTML in it is not rendered.
pub async fn about(ctx: PageContext) -> impl IntoResponse {
    let content_html = render_markdown(&ctx.site.about_markdown);
    ContentPageTemplate {
        title: format!("About {}", ctx.site.store_name),
        content_html,
        ctx,
    }
}
