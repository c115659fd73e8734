//! HTTP route handlers for the back-office.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                  - Liveness check
//! GET  /health/ready            - Readiness check (database)
//!
//! # Auth
//! GET  /auth/login              - Sign-in form
//! POST /auth/login              - Sign in (rate limited)
//! POST /auth/logout             - Sign out
//!
//! # Dashboard
//! GET  /                        - Order counts, revenue, low stock, recent orders
//!
//! # Orders
//! GET  /orders                  - Order list (?status=&q=&page=)
//! GET  /orders/{id}             - Order detail
//! POST /orders/{id}/status      - Move to the next status
//! POST /orders/{id}/ship        - Ship with carrier and tracking number
//! POST /orders/{id}/payment     - Mark paid or refunded
//!
//! # Catalog
//! GET  /products                - Product list (?q=&category=&page=)
//! GET  /products/new            - New product form
//! POST /products                - Create product
//! GET  /products/{id}           - Edit product, images, options and variants
//! POST /products/{id}           - Save product
//! POST /products/{id}/delete    - Delete product
//! POST /products/{id}/images    - Upload an image (multipart)
//! POST /products/{id}/images/remove - Remove an image
//! POST /products/{id}/options   - Add an option with its values
//! POST /products/{id}/options/{option_id}/delete - Remove an option
//! POST /products/{id}/variants/generate - Sync variants with the options
//! POST /products/{id}/variants  - Save SKU, price and stock per variant
//! GET  /categories[/new|/{id}]  - Category list and forms
//! POST /categories[/{id}[/delete]]
//! GET  /combos[/new|/{id}]      - Combo list and forms
//! POST /combos[/{id}[/delete]]
//! POST /combos/{id}/items       - Add a product or change its quantity
//! POST /combos/{id}/items/{product_id}/delete
//!
//! # Promotions and fulfilment
//! GET  /coupons[/new|/{id}]     - Coupon list and forms
//! POST /coupons[/{id}[/toggle|/delete]]
//! GET  /shipping[/new|/{id}]    - Shipping partners
//! POST /shipping[/{id}[/toggle|/delete]]
//!
//! # Customers and reviews
//! GET  /customers               - Customer list (?q=&page=)
//! GET  /customers/{id}          - Customer detail with orders
//! GET  /reviews                 - Moderation queue (?status=)
//! POST /reviews/{id}/approve|reject|delete
//!
//! # Settings and media
//! GET  /settings                - Store texts and shipping rule
//! POST /settings                - Save settings
//! POST /media                   - Upload an image, returns `{"url": ...}`
//! GET  /media/{name}            - Serve an uploaded image
//! ```
//!
//! Pages require a signed-in admin; every POST except sign-in also requires
//! a role that may write.

pub mod auth;
pub mod categories;
pub mod combos;
pub mod context;
pub mod coupons;
pub mod customers;
pub mod dashboard;
pub mod forms;
pub mod media;
pub mod orders;
pub mod products;
pub mod reviews;
pub mod settings;
pub mod shipping;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};

use crate::middleware::login_rate_limiter;
use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/login",
            post(auth::login)
                .layer(login_rate_limiter())
                .get(auth::login_page),
        )
        .route("/logout", post(auth::logout))
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::index))
        .route("/{id}", get(orders::show))
        .route("/{id}/status", post(orders::transition))
        .route("/{id}/ship", post(orders::ship))
        .route("/{id}/payment", post(orders::payment))
}

/// Create the product routes router.
pub fn product_routes(max_upload: usize) -> Router<AppState> {
    Router::new()
        .route("/", get(products::index).post(products::create))
        .route("/new", get(products::new_product))
        .route("/{id}", get(products::edit).post(products::update))
        .route("/{id}/delete", post(products::delete))
        .route(
            "/{id}/images",
            post(products::upload_image).layer(DefaultBodyLimit::max(max_upload)),
        )
        .route("/{id}/images/remove", post(products::remove_image))
        .route("/{id}/options", post(products::add_option))
        .route(
            "/{id}/options/{option_id}/delete",
            post(products::delete_option),
        )
        .route("/{id}/variants/generate", post(products::generate))
        .route("/{id}/variants", post(products::save_variants))
}

/// Create the category routes router.
pub fn category_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(categories::index).post(categories::create))
        .route("/new", get(categories::new_category))
        .route("/{id}", get(categories::edit).post(categories::update))
        .route("/{id}/delete", post(categories::delete))
}

/// Create the combo routes router.
pub fn combo_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(combos::index).post(combos::create))
        .route("/new", get(combos::new_combo))
        .route("/{id}", get(combos::edit).post(combos::update))
        .route("/{id}/delete", post(combos::delete))
        .route("/{id}/items", post(combos::set_item))
        .route(
            "/{id}/items/{product_id}/delete",
            post(combos::remove_item),
        )
}

/// Create the coupon routes router.
pub fn coupon_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(coupons::index).post(coupons::create))
        .route("/new", get(coupons::new_coupon))
        .route("/{id}", get(coupons::edit).post(coupons::update))
        .route("/{id}/toggle", post(coupons::toggle))
        .route("/{id}/delete", post(coupons::delete))
}

/// Create the shipping partner routes router.
pub fn shipping_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(shipping::index).post(shipping::create))
        .route("/new", get(shipping::new_partner))
        .route("/{id}", get(shipping::edit).post(shipping::update))
        .route("/{id}/toggle", post(shipping::toggle))
        .route("/{id}/delete", post(shipping::delete))
}

/// Create the review moderation routes router.
pub fn review_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(reviews::index))
        .route("/{id}/approve", post(reviews::approve))
        .route("/{id}/reject", post(reviews::reject))
        .route("/{id}/delete", post(reviews::delete))
}

/// Create the customer routes router.
pub fn customer_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(customers::index))
        .route("/{id}", get(customers::show))
}

/// Create all routes for the back-office.
///
/// `max_upload` caps multipart image uploads; other bodies keep axum's
/// default limit.
pub fn routes(max_upload: usize) -> Router<AppState> {
    Router::new()
        .route("/", get(dashboard::index))
        .nest("/auth", auth_routes())
        .nest("/orders", order_routes())
        .nest("/products", product_routes(max_upload))
        .nest("/categories", category_routes())
        .nest("/combos", combo_routes())
        .nest("/coupons", coupon_routes())
        .nest("/shipping", shipping_routes())
        .nest("/reviews", review_routes())
        .nest("/customers", customer_routes())
        .route("/settings", get(settings::show).post(settings::update))
        .route(
            "/media",
            post(media::upload).layer(DefaultBodyLimit::max(max_upload)),
        )
        .route("/media/{name}", get(media::serve))
}
