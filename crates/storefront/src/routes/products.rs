//! Product listing, detail pages and review submission.

use std::collections::{HashMap, HashSet};

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use jouwwinkel_core::models::{Category, Product, RatingSummary, Review, Variant, VariantOption};
use jouwwinkel_core::validation::ValidationErrors;
use jouwwinkel_core::{Price, ProductId};

use crate::db::{
    CatalogRepository, NewReview, OrderRepository, ProductQuery, ProductSort, RepositoryError,
    ReviewRepository, WishlistRepository,
};
use crate::error::AppError;
use crate::filters;
use crate::middleware::RequireAuth;
use crate::models::{CurrentCustomer, Flash};
use crate::routes::context::{PageContext, set_flash};
use crate::services::content::render_markdown;
use crate::state::AppState;

const RELATED_LIMIT: i64 = 4;
const MAX_REVIEW_TITLE: usize = 120;
const MAX_REVIEW_BODY: usize = 2000;

// =============================================================================
// View types
// =============================================================================

/// A product tile on listings, the home page and the wishlist.
#[derive(Clone)]
pub struct ProductCard {
    pub id: ProductId,
    pub slug: String,
    pub name: String,
    pub price: String,
    pub compare_at_price: Option<String>,
    pub discount_percent: Option<u32>,
    pub image_url: Option<String>,
    pub in_stock: bool,
    pub saved: bool,
}

impl ProductCard {
    /// `variant_stock` holds totals for products sold through variants.
    #[must_use]
    pub fn new(product: &Product, variant_stock: &HashMap<ProductId, i64>, saved: bool) -> Self {
        let in_stock = variant_stock
            .get(&product.id)
            .map_or(product.stock > 0, |total| *total > 0);
        Self {
            id: product.id,
            slug: product.slug.clone(),
            name: product.name.clone(),
            price: Price::eur(product.price).to_string(),
            compare_at_price: product
                .discount_percent()
                .and(product.compare_at_price)
                .map(|p| Price::eur(p).to_string()),
            discount_percent: product.discount_percent(),
            image_url: product.primary_image().map(str::to_owned),
            in_stock,
            saved,
        }
    }
}

/// Build cards for a set of products, looking up variant stock and the
/// customer's wishlist in one query each.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if a query fails.
pub async fn product_cards(
    state: &AppState,
    customer: Option<&CurrentCustomer>,
    products: &[Product],
) -> Result<Vec<ProductCard>, RepositoryError> {
    let ids: Vec<ProductId> = products.iter().map(|p| p.id).collect();
    let variant_stock = CatalogRepository::new(state.pool())
        .variant_stock_for(&ids)
        .await?;
    let saved = match customer {
        Some(customer) => {
            WishlistRepository::new(state.pool())
                .product_ids(customer.id)
                .await?
        }
        None => HashSet::new(),
    };

    Ok(products
        .iter()
        .map(|p| ProductCard::new(p, &variant_stock, saved.contains(&p.id)))
        .collect())
}

/// One purchasable variant in the detail page's picker.
pub struct VariantChoice {
    pub id: i32,
    pub label: String,
    pub price: String,
    pub in_stock: bool,
}

impl VariantChoice {
    fn new(variant: &Variant, product: &Product) -> Self {
        Self {
            id: variant.id.as_i32(),
            label: variant.label(),
            price: Price::eur(variant.unit_price(product)).to_string(),
            in_stock: variant.stock > 0,
        }
    }
}

pub struct ReviewView {
    pub author_name: String,
    pub rating: i16,
    pub title: String,
    pub body: String,
    pub verified_purchase: bool,
    pub date: String,
}

impl From<&Review> for ReviewView {
    fn from(review: &Review) -> Self {
        Self {
            author_name: review.author_name.clone(),
            rating: review.rating,
            title: review.title.clone(),
            body: review.body.clone(),
            verified_purchase: review.verified_purchase,
            date: review.created_at.format("%d-%m-%Y").to_string(),
        }
    }
}

/// Page links for listings.
pub struct Pager {
    pub page: u32,
    pub total_pages: u32,
    /// Query string without `page`, e.g. `category=keuken&sort=name&`.
    pub base_query: String,
}

impl Pager {
    #[must_use]
    pub const fn has_prev(&self) -> bool {
        self.page > 1
    }

    #[must_use]
    pub const fn has_next(&self) -> bool {
        self.page < self.total_pages
    }

    #[must_use]
    pub const fn prev(&self) -> u32 {
        self.page.saturating_sub(1)
    }

    #[must_use]
    pub const fn next(&self) -> u32 {
        self.page + 1
    }
}

// =============================================================================
// Listing
// =============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub category: Option<String>,
    pub sort: Option<String>,
    pub page: Option<u32>,
}

#[derive(Template, WebTemplate)]
#[template(path = "products/index.html")]
pub struct ProductsIndexTemplate {
    pub ctx: PageContext,
    pub heading: String,
    pub category: Option<Category>,
    pub products: Vec<ProductCard>,
    pub total: i64,
    pub sort: &'static str,
    pub pager: Pager,
}

/// GET /products
#[instrument(skip(state, ctx))]
pub async fn index(
    State(state): State<AppState>,
    ctx: PageContext,
    Query(query): Query<ListQuery>,
) -> Result<Response, AppError> {
    let catalog = CatalogRepository::new(state.pool());

    let category = match query.category.as_deref().filter(|s| !s.is_empty()) {
        Some(slug) => Some(
            catalog
                .category_by_slug(slug)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("category {slug}")))?,
        ),
        None => None,
    };

    let sort = ProductSort::parse(query.sort.as_deref().unwrap_or_default());
    let page = catalog
        .list_products(ProductQuery {
            category_id: category.as_ref().map(|c| c.id),
            sort,
            page: query.page.unwrap_or(1),
        })
        .await?;

    let products = product_cards(&state, ctx.customer.as_ref(), &page.products).await?;
    let base_query = listing_query(category.as_ref().map(|c| c.slug.as_str()), sort);

    Ok(ProductsIndexTemplate {
        heading: category
            .as_ref()
            .map_or_else(|| "All products".to_owned(), |c| c.name.clone()),
        category,
        products,
        total: page.total,
        sort: sort.as_str(),
        pager: Pager {
            page: page.page,
            total_pages: page.total_pages(),
            base_query,
        },
        ctx,
    }
    .into_response())
}

/// Query string shared by every page link of a listing.
fn listing_query(category: Option<&str>, sort: ProductSort) -> String {
    let mut query = String::new();
    if let Some(slug) = category {
        query.push_str("category=");
        query.push_str(&urlencoding::encode(slug));
        query.push('&');
    }
    if sort != ProductSort::Newest {
        query.push_str("sort=");
        query.push_str(sort.as_str());
        query.push('&');
    }
    query
}

// =============================================================================
// Detail
// =============================================================================

#[derive(Template, WebTemplate)]
#[template(path = "products/show.html")]
pub struct ProductShowTemplate {
    pub ctx: PageContext,
    pub card: ProductCard,
    pub category: Option<Category>,
    pub description_html: String,
    pub images: Vec<String>,
    pub options: Vec<VariantOption>,
    pub variants: Vec<VariantChoice>,
    pub stock: i32,
    pub rating: RatingSummary,
    pub reviews: Vec<ReviewView>,
    pub can_review: bool,
    pub related: Vec<ProductCard>,
}

impl ProductShowTemplate {
    /// Whether the product must be bought as a specific variant.
    #[must_use]
    pub fn has_variants(&self) -> bool {
        !self.variants.is_empty()
    }
}

/// GET /products/{slug}
#[instrument(skip(state, ctx))]
pub async fn show(
    State(state): State<AppState>,
    ctx: PageContext,
    Path(slug): Path<String>,
) -> Result<Response, AppError> {
    let catalog = CatalogRepository::new(state.pool());
    let product = catalog
        .product_by_slug(&slug)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {slug}")))?;

    let category = match product.category_id {
        Some(id) => catalog.category_by_id(id).await?.filter(|c| c.is_active),
        None => None,
    };
    let options = catalog.variant_options(product.id).await?;
    let variants = catalog.variants(product.id).await?;

    let reviews_repo = ReviewRepository::new(state.pool());
    let reviews = reviews_repo.approved_for_product(product.id).await?;
    let rating = reviews_repo.summary(product.id).await?;
    let can_review = match &ctx.customer {
        Some(customer) => !reviews_repo.exists_for_customer(product.id, customer.id).await?,
        None => false,
    };

    let mut cards = product_cards(&state, ctx.customer.as_ref(), std::slice::from_ref(&product)).await?;
    let card = cards
        .pop()
        .ok_or_else(|| AppError::Internal("product card missing".to_owned()))?;
    let related = catalog.related_products(&product, RELATED_LIMIT).await?;
    let related = product_cards(&state, ctx.customer.as_ref(), &related).await?;

    Ok(ProductShowTemplate {
        ctx,
        card,
        category,
        description_html: render_markdown(&product.description),
        images: product.image_urls.clone(),
        options,
        variants: variants
            .iter()
            .map(|v| VariantChoice::new(v, &product))
            .collect(),
        stock: product.stock,
        rating,
        reviews: reviews.iter().map(ReviewView::from).collect(),
        can_review,
        related,
    }
    .into_response())
}

// =============================================================================
// Reviews
// =============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ReviewForm {
    pub rating: String,
    pub title: String,
    pub body: String,
}

/// Validated review fields: rating, title, body.
fn validate_review(form: &ReviewForm) -> Result<(i16, String, String), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    let rating = errors.rating("rating", &form.rating);
    let title = errors.text("title", &form.title, MAX_REVIEW_TITLE, false);
    let body = errors.text("body", &form.body, MAX_REVIEW_BODY, true);
    errors.into_result((rating, title, body))
}

/// POST /products/{slug}/reviews
///
/// Reviews wait for moderation; `verified_purchase` is set when the customer
/// received the product in a delivered order.
#[instrument(skip(state, session, customer, form))]
pub async fn create_review(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(customer): RequireAuth,
    Path(slug): Path<String>,
    Form(form): Form<ReviewForm>,
) -> Result<Response, AppError> {
    let product = CatalogRepository::new(state.pool())
        .product_by_slug(&slug)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {slug}")))?;
    let back = format!("/products/{}#reviews", product.slug);

    let (rating, title, body) = match validate_review(&form) {
        Ok(fields) => fields,
        Err(errors) => {
            set_flash(&session, Flash::error(errors.to_string())).await?;
            return Ok(Redirect::to(&back).into_response());
        }
    };

    let verified_purchase = OrderRepository::new(state.pool())
        .has_delivered_purchase(customer.id, product.id)
        .await?;

    let review = NewReview {
        product_id: product.id,
        customer_id: customer.id,
        author_name: customer.greeting_name().to_owned(),
        rating,
        title,
        body,
        verified_purchase,
    };

    let flash = match ReviewRepository::new(state.pool()).create(&review).await {
        Ok(_) => {
            tracing::info!(product_id = %product.id, "Review submitted");
            Flash::success("Thank you! Your review will appear once it has been approved.")
        }
        Err(RepositoryError::Conflict(_)) => Flash::error("You have already reviewed this product."),
        Err(e) => return Err(e.into()),
    };
    set_flash(&session, flash).await?;
    Ok(Redirect::to(&back).into_response())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use super::*;

    fn product(stock: i32) -> Product {
        Product {
            id: ProductId::new(7),
            category_id: None,
            name: "Linnen schort".to_owned(),
            slug: "linnen-schort".to_owned(),
            description: String::new(),
            price: Decimal::new(2495, 2),
            compare_at_price: Some(Decimal::new(2995, 2)),
            stock,
            image_urls: vec!["/media/a.jpg".to_owned()],
            is_featured: false,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_card_uses_variant_stock_when_present() {
        let mut totals = HashMap::new();
        assert!(!ProductCard::new(&product(0), &totals, false).in_stock);

        totals.insert(ProductId::new(7), 3);
        let card = ProductCard::new(&product(0), &totals, true);
        assert!(card.in_stock);
        assert!(card.saved);
        assert_eq!(card.price, "€24.95");
        assert_eq!(card.compare_at_price.as_deref(), Some("€29.95"));
        assert_eq!(card.image_url.as_deref(), Some("/media/a.jpg"));
    }

    #[test]
    fn test_listing_query() {
        assert_eq!(listing_query(None, ProductSort::Newest), "");
        assert_eq!(
            listing_query(Some("keuken"), ProductSort::PriceAsc),
            "category=keuken&sort=price_asc&"
        );
    }

    #[test]
    fn test_pager() {
        let pager = Pager {
            page: 1,
            total_pages: 3,
            base_query: String::new(),
        };
        assert!(!pager.has_prev());
        assert!(pager.has_next());
        assert_eq!(pager.next(), 2);
    }

    #[test]
    fn test_validate_review() {
        let form = ReviewForm {
            rating: "4".to_owned(),
            title: " Fijn ".to_owned(),
            body: "Goede kwaliteit".to_owned(),
        };
        let (rating, title, body) = validate_review(&form).unwrap();
        assert_eq!(rating, 4);
        assert_eq!(title, "Fijn");
        assert_eq!(body, "Goede kwaliteit");

        let form = ReviewForm {
            rating: "6".to_owned(),
            ..ReviewForm::default()
        };
        let errors = validate_review(&form).unwrap_err();
        assert!(errors.get("rating").is_some());
        assert!(errors.get("body").is_some());
    }
}
