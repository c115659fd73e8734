//! Account route handlers.
//!
//! Every route here requires a signed-in customer.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;
use tracing::instrument;

use jouwwinkel_core::models::{Order, OrderLine, ShippingPartner};
use jouwwinkel_core::validation::ValidationErrors;
use jouwwinkel_core::{CredentialId, OrderId, OrderStatus, PaymentMethod, Price};

use crate::db::{
    CredentialRepository, CustomerRepository, OrderRepository, ProfileUpdate, RepositoryError,
    WishlistRepository,
};
use crate::error::AppError;
use crate::filters;
use crate::middleware::auth::RequireAuth;
use crate::models::{CurrentCustomer, Flash, session_keys};
use crate::routes::context::{PageContext, set_flash};
use crate::routes::products::{ProductCard, product_cards};
use crate::services::checkout::AddressForm;
use crate::services::orders::{OrderError, cancel_order};
use crate::state::AppState;

const RECENT_ORDERS: usize = 3;

/// Order row for history tables.
#[derive(Clone)]
pub struct OrderSummaryView {
    pub id: i32,
    pub number: String,
    pub date: String,
    pub status: &'static str,
    pub status_label: &'static str,
    pub total: String,
}

impl From<&Order> for OrderSummaryView {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id.as_i32(),
            number: order.order_number(),
            date: order.created_at.format("%d-%m-%Y").to_string(),
            status: order.status.as_str(),
            status_label: order.status.label(),
            total: Price::eur(order.total).to_string(),
        }
    }
}

#[derive(Clone)]
pub struct OrderLineView {
    pub title: String,
    pub variant_label: Option<String>,
    pub quantity: i32,
    pub unit_price: String,
    pub line_total: String,
}

impl From<&OrderLine> for OrderLineView {
    fn from(line: &OrderLine) -> Self {
        Self {
            title: line.title.clone(),
            variant_label: line.variant_label.clone(),
            quantity: line.quantity,
            unit_price: Price::eur(line.unit_price).to_string(),
            line_total: Price::eur(line.line_total).to_string(),
        }
    }
}

/// Everything shown about one order.
#[derive(Clone)]
pub struct OrderDetailView {
    pub summary: OrderSummaryView,
    pub payment_method: &'static str,
    /// Show bank details for payment.
    pub bank_transfer: bool,
    pub payment_status: &'static str,
    pub address_lines: Vec<String>,
    pub phone: String,
    pub lines: Vec<OrderLineView>,
    pub subtotal: String,
    pub discount: Option<String>,
    pub coupon_code: Option<String>,
    pub shipping: String,
    pub total: String,
    pub notes: String,
    pub carrier: Option<String>,
    pub tracking_number: Option<String>,
    pub tracking_url: Option<String>,
    pub can_cancel: bool,
}

impl OrderDetailView {
    #[must_use]
    pub fn new(order: &Order, lines: &[OrderLine], partner: Option<&ShippingPartner>) -> Self {
        let tracking_url = partner
            .zip(order.tracking_number.as_deref())
            .and_then(|(p, code)| p.tracking_url(code));
        Self {
            summary: OrderSummaryView::from(order),
            payment_method: order.payment_method.label(),
            bank_transfer: order.payment_method == PaymentMethod::BankTransfer,
            payment_status: order.payment_status.as_str(),
            address_lines: order.address.lines(),
            phone: order.address.phone.clone(),
            lines: lines.iter().map(OrderLineView::from).collect(),
            subtotal: Price::eur(order.subtotal).to_string(),
            discount: (!order.discount_total.is_zero())
                .then(|| Price::eur(order.discount_total).to_string()),
            coupon_code: order.coupon_code.clone(),
            shipping: Price::eur(order.shipping_fee).to_string(),
            total: Price::eur(order.total).to_string(),
            notes: order.notes.clone(),
            carrier: partner.map(|p| p.name.clone()),
            tracking_number: order.tracking_number.clone(),
            tracking_url,
            can_cancel: order.status.customer_cancellable(),
        }
    }
}

#[derive(Clone)]
pub struct PasskeyView {
    pub id: i32,
    pub name: String,
    pub created: String,
    pub last_used: Option<String>,
}

/// Account overview page template.
#[derive(Template, WebTemplate)]
#[template(path = "account/index.html")]
pub struct AccountIndexTemplate {
    pub ctx: PageContext,
    pub email: String,
    pub address: AddressForm,
    pub errors: ValidationErrors,
    pub recent_orders: Vec<OrderSummaryView>,
    pub passkey_count: usize,
    pub wishlist_count: usize,
}

#[derive(Template, WebTemplate)]
#[template(path = "account/orders.html")]
pub struct OrdersTemplate {
    pub ctx: PageContext,
    pub orders: Vec<OrderSummaryView>,
}

#[derive(Template, WebTemplate)]
#[template(path = "account/order.html")]
pub struct OrderTemplate {
    pub ctx: PageContext,
    pub order: OrderDetailView,
}

#[derive(Template, WebTemplate)]
#[template(path = "account/passkeys.html")]
pub struct PasskeysTemplate {
    pub ctx: PageContext,
    pub passkeys: Vec<PasskeyView>,
}

#[derive(Template, WebTemplate)]
#[template(path = "account/wishlist.html")]
pub struct WishlistTemplate {
    pub ctx: PageContext,
    pub products: Vec<ProductCard>,
}

async fn overview(
    state: &AppState,
    ctx: PageContext,
    current: &CurrentCustomer,
    profile: AddressForm,
    errors: ValidationErrors,
) -> Result<AccountIndexTemplate, AppError> {
    let pool = state.pool();
    let orders = OrderRepository::new(pool).list_for_customer(current.id).await?;
    let passkey_count = CredentialRepository::new(pool)
        .list_for_customer(current.id)
        .await?
        .len();
    let wishlist_count = WishlistRepository::new(pool).product_ids(current.id).await?.len();

    Ok(AccountIndexTemplate {
        ctx,
        email: current.email.to_string(),
        address: profile,
        errors,
        recent_orders: orders.iter().take(RECENT_ORDERS).map(OrderSummaryView::from).collect(),
        passkey_count,
        wishlist_count,
    })
}

/// Display account overview page with the profile form.
#[instrument(skip_all, fields(customer_id = %current.id))]
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
    ctx: PageContext,
) -> Result<AccountIndexTemplate, AppError> {
    let customer = CustomerRepository::new(state.pool())
        .get_by_id(current.id)
        .await?
        .ok_or(RepositoryError::NotFound)?;
    let profile = AddressForm::from(&customer.default_address());
    overview(&state, ctx, &current, profile, ValidationErrors::new()).await
}

/// Save name, phone and default address.
#[instrument(skip_all, fields(customer_id = %current.id))]
pub async fn update_profile(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(current): RequireAuth,
    ctx: PageContext,
    Form(form): Form<AddressForm>,
) -> Result<Response, AppError> {
    let address = match form.validate(false) {
        Ok(address) => address,
        Err(errors) => {
            let page = overview(&state, ctx, &current, form, errors).await?;
            return Ok((StatusCode::UNPROCESSABLE_ENTITY, page).into_response());
        }
    };

    let customer = CustomerRepository::new(state.pool())
        .update_profile(current.id, &ProfileUpdate::from(&address))
        .await?;

    // keep the header greeting in step with the new name
    session
        .insert(session_keys::CURRENT_CUSTOMER, CurrentCustomer::from(&customer))
        .await?;
    set_flash(&session, Flash::success("Your details were saved")).await?;
    tracing::info!("Profile updated");
    Ok(Redirect::to("/account").into_response())
}

/// Full order history.
#[instrument(skip_all, fields(customer_id = %current.id))]
pub async fn orders(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
    ctx: PageContext,
) -> Result<OrdersTemplate, AppError> {
    let orders = OrderRepository::new(state.pool())
        .list_for_customer(current.id)
        .await?;
    Ok(OrdersTemplate {
        ctx,
        orders: orders.iter().map(OrderSummaryView::from).collect(),
    })
}

/// Load one of the customer's orders with lines and carrier.
///
/// # Errors
///
/// Returns `AppError::NotFound` when the order is not the customer's.
pub async fn order_detail(
    state: &AppState,
    order_id: OrderId,
    current: &CurrentCustomer,
) -> Result<OrderDetailView, AppError> {
    let repo = OrderRepository::new(state.pool());
    let order = repo
        .get_for_customer(order_id, current.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Order not found".to_owned()))?;
    let lines = repo.lines(order.id).await?;
    let partner = match order.shipping_partner_id {
        Some(id) => repo.shipping_partner(id).await?,
        None => None,
    };
    Ok(OrderDetailView::new(&order, &lines, partner.as_ref()))
}

#[instrument(skip(state, current, ctx), fields(customer_id = %current.id))]
pub async fn order(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
    ctx: PageContext,
    Path(id): Path<i32>,
) -> Result<OrderTemplate, AppError> {
    let order = order_detail(&state, OrderId::new(id), &current).await?;
    Ok(OrderTemplate { ctx, order })
}

/// Cancel a pending order.
#[instrument(skip(state, session, current), fields(customer_id = %current.id))]
pub async fn cancel(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(current): RequireAuth,
    Path(id): Path<i32>,
) -> Result<Redirect, AppError> {
    let order_id = OrderId::new(id);
    let flash = match cancel_order(state.pool(), order_id, current.id).await {
        Ok(()) => Flash::success("Your order was cancelled"),
        Err(OrderError::NotCancellable(status)) => Flash::error(not_cancellable_message(status)),
        Err(e) => return Err(e.into()),
    };
    set_flash(&session, flash).await?;
    Ok(Redirect::to(&format!("/account/orders/{id}")))
}

fn not_cancellable_message(status: OrderStatus) -> String {
    format!(
        "This order is {} and can no longer be cancelled. Please contact us.",
        status.label().to_lowercase()
    )
}

/// Registered passkeys.
#[instrument(skip_all, fields(customer_id = %current.id))]
pub async fn passkeys(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
    ctx: PageContext,
) -> Result<PasskeysTemplate, AppError> {
    let passkeys = CredentialRepository::new(state.pool())
        .list_for_customer(current.id)
        .await?
        .into_iter()
        .map(|c| PasskeyView {
            id: c.id.as_i32(),
            name: c.name,
            created: c.created_at.format("%d-%m-%Y").to_string(),
            last_used: c.last_used_at.map(|t| t.format("%d-%m-%Y").to_string()),
        })
        .collect();
    Ok(PasskeysTemplate { ctx, passkeys })
}

#[instrument(skip(state, session, current), fields(customer_id = %current.id))]
pub async fn delete_passkey(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(current): RequireAuth,
    Path(id): Path<i32>,
) -> Result<Redirect, AppError> {
    CredentialRepository::new(state.pool())
        .delete(CredentialId::new(id), current.id)
        .await?;
    set_flash(&session, Flash::success("Passkey removed")).await?;
    Ok(Redirect::to("/account/passkeys"))
}

/// Saved products.
#[instrument(skip_all, fields(customer_id = %current.id))]
pub async fn wishlist(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
    ctx: PageContext,
) -> Result<WishlistTemplate, AppError> {
    let saved = WishlistRepository::new(state.pool())
        .products(current.id)
        .await?;
    let products = product_cards(&state, Some(&current), &saved).await?;
    Ok(WishlistTemplate { ctx, products })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{TimeZone, Utc};
    use jouwwinkel_core::models::ShippingAddress;
    use jouwwinkel_core::{Email, PaymentStatus, ShippingPartnerId};
    use rust_decimal::Decimal;

    use super::*;

    fn order(status: OrderStatus) -> Order {
        let at = Utc.with_ymd_and_hms(2026, 3, 14, 10, 0, 0).unwrap();
        Order {
            id: OrderId::new(42),
            customer_id: None,
            email: Email::parse("sanne@example.nl").unwrap(),
            status,
            payment_method: PaymentMethod::BankTransfer,
            payment_status: PaymentStatus::Unpaid,
            address: ShippingAddress {
                full_name: "Sanne de Vries".to_owned(),
                phone: String::new(),
                street: "Keizersgracht 1".to_owned(),
                postal_code: "1015 AA".to_owned(),
                city: "Amsterdam".to_owned(),
                country: "Netherlands".to_owned(),
            },
            subtotal: Decimal::new(3000, 2),
            discount_total: Decimal::ZERO,
            shipping_fee: Decimal::new(495, 2),
            total: Decimal::new(3495, 2),
            coupon_code: None,
            shipping_partner_id: Some(ShippingPartnerId::new(1)),
            tracking_number: Some("3SABC123".to_owned()),
            notes: String::new(),
            created_at: at,
            updated_at: at,
            shipped_at: None,
            delivered_at: None,
        }
    }

    fn partner() -> ShippingPartner {
        ShippingPartner {
            id: ShippingPartnerId::new(1),
            name: "PostNL".to_owned(),
            tracking_url_template: Some("https://track.example/{tracking}".to_owned()),
            contact_email: None,
            contact_phone: None,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_order_detail_view() {
        let view = OrderDetailView::new(&order(OrderStatus::Shipped), &[], Some(&partner()));
        assert_eq!(view.summary.date, "14-03-2026");
        assert_eq!(view.summary.status, "shipped");
        assert_eq!(view.total, "€34.95");
        assert!(view.discount.is_none());
        assert_eq!(view.carrier.as_deref(), Some("PostNL"));
        assert_eq!(
            view.tracking_url.as_deref(),
            Some("https://track.example/3SABC123")
        );
        assert!(!view.can_cancel);
    }

    #[test]
    fn test_only_pending_orders_offer_cancel() {
        assert!(OrderDetailView::new(&order(OrderStatus::Pending), &[], None).can_cancel);
        assert!(!OrderDetailView::new(&order(OrderStatus::Confirmed), &[], None).can_cancel);
    }

    #[test]
    fn test_not_cancellable_message() {
        assert!(not_cancellable_message(OrderStatus::Shipped).contains("is shipped"));
    }
}
