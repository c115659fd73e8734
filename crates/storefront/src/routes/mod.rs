//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                       - Home page
//! GET  /health                 - Health check
//! GET  /about                  - About page (Markdown from site settings)
//!
//! # Catalog
//! GET  /products               - Product listing (?category=&sort=&page=)
//! GET  /products/{slug}        - Product detail
//! POST /products/{slug}/reviews - Submit a review (requires auth)
//! GET  /categories             - Category listing
//! GET  /categories/{slug}      - Products in a category
//! GET  /combos                 - Combo listing
//! GET  /combos/{slug}          - Combo detail
//!
//! # Search
//! GET  /search                 - Search results page
//! GET  /search/suggest         - Search-as-you-type fragment (HTMX)
//!
//! # Cart (HTMX fragments)
//! GET  /cart                   - Cart page
//! POST /cart/add               - Add to cart (returns count badge, triggers cart-updated)
//! POST /cart/update            - Update quantity (returns cart_items fragment)
//! POST /cart/remove            - Remove item (returns cart_items fragment)
//! POST /cart/coupon            - Apply a coupon code
//! POST /cart/coupon/remove     - Remove the coupon
//! GET  /cart/count             - Cart count badge (fragment)
//!
//! # Checkout (requires auth)
//! GET  /checkout               - Address, payment method and totals
//! POST /checkout               - Place the order
//! GET  /checkout/complete/{id} - Order confirmation
//!
//! # Auth
//! GET  /auth/login             - Login page
//! POST /auth/login             - Login action
//! GET  /auth/register          - Register page
//! POST /auth/register          - Register action
//! POST /auth/logout            - Logout action
//!
//! # `WebAuthn` API
//! POST /api/auth/webauthn/register/start      - Start passkey registration
//! POST /api/auth/webauthn/register/finish     - Finish passkey registration
//! POST /api/auth/webauthn/authenticate/start  - Start passkey authentication
//! POST /api/auth/webauthn/authenticate/finish - Finish passkey authentication
//!
//! # Account (requires auth)
//! GET  /account                - Account overview and profile form
//! POST /account/profile        - Save profile
//! GET  /account/orders         - Order history
//! GET  /account/orders/{id}    - Order detail
//! POST /account/orders/{id}/cancel - Cancel a pending order
//! GET  /account/passkeys       - Passkey management
//! POST /account/passkeys/{id}/delete - Remove a passkey
//! GET  /account/wishlist       - Saved products
//! POST /wishlist/toggle        - Save or unsave a product (HTMX)
//! ```

pub mod account;
pub mod api;
pub mod auth;
pub mod cart;
pub mod categories;
pub mod checkout;
pub mod combos;
pub mod context;
pub mod home;
pub mod pages;
pub mod products;
pub mod search;
pub mod wishlist;

use axum::{
    Router,
    routing::{get, post},
};

use crate::middleware::{api_rate_limiter, auth_rate_limiter};
use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/register", get(auth::register_page).post(auth::register))
        .route("/logout", post(auth::logout))
        .layer(auth_rate_limiter())
}

/// Create the `WebAuthn` API routes router.
pub fn webauthn_api_routes() -> Router<AppState> {
    Router::new()
        .route("/register/start", post(api::webauthn::start_registration))
        .route("/register/finish", post(api::webauthn::finish_registration))
        .route(
            "/authenticate/start",
            post(api::webauthn::start_authentication),
        )
        .route(
            "/authenticate/finish",
            post(api::webauthn::finish_authentication),
        )
        .layer(auth_rate_limiter())
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/{slug}", get(products::show))
        .route("/{slug}/reviews", post(products::create_review))
}

/// Create the category routes router.
pub fn category_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(categories::index))
        .route("/{slug}", get(categories::show))
}

/// Create the combo routes router.
pub fn combo_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(combos::index))
        .route("/{slug}", get(combos::show))
}

/// Create the search routes router.
pub fn search_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(search::search_page))
        .route("/suggest", get(search::suggest).layer(api_rate_limiter()))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .route("/coupon", post(cart::apply_coupon))
        .route("/coupon/remove", post(cart::remove_coupon))
        .route("/count", get(cart::count))
        .layer(api_rate_limiter())
}

/// Create the checkout routes router.
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(checkout::show).post(checkout::place))
        .route("/complete/{id}", get(checkout::complete))
}

/// Create the account routes router.
///
/// Every handler takes `RequireAuth`, so signed-out visitors are sent to
/// the login page.
pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(account::index))
        .route("/profile", post(account::update_profile))
        .route("/orders", get(account::orders))
        .route("/orders/{id}", get(account::order))
        .route("/orders/{id}/cancel", post(account::cancel))
        .route("/passkeys", get(account::passkeys))
        .route("/passkeys/{id}/delete", post(account::delete_passkey))
        .route("/wishlist", get(account::wishlist))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        // Home page
        .route("/", get(home::home))
        .route("/about", get(pages::about))
        // Catalog
        .nest("/products", product_routes())
        .nest("/categories", category_routes())
        .nest("/combos", combo_routes())
        .nest("/search", search_routes())
        // Cart and checkout
        .nest("/cart", cart_routes())
        .nest("/checkout", checkout_routes())
        // Account routes
        .nest("/account", account_routes())
        .route(
            "/wishlist/toggle",
            post(wishlist::toggle).layer(api_rate_limiter()),
        )
        // Auth routes
        .nest("/auth", auth_routes())
        // `WebAuthn` API
        .nest("/api/auth/webauthn", webauthn_api_routes())
}
