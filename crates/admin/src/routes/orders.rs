//! Order list, detail and workflow actions.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::Redirect,
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use jouwwinkel_core::models::{Order, OrderLine, ShippingPartner, format_order_number};
use jouwwinkel_core::{OrderId, OrderStatus, PaymentStatus, Price, ShippingPartnerId};

use crate::db::{OrderFilter, OrderRepository, OrderRow, SettingsRepository, ShippingPartnerRepository};
use crate::error::AppError;
use crate::filters::{self, short_datetime};
use crate::middleware::RequireWriter;
use crate::models::Flash;
use crate::routes::context::{PageContext, Pager, set_flash};
use crate::services::email::{OrderMail, Shipment};
use crate::services::orders::{self, MAX_TRACKING_LENGTH, OrderActionError};
use crate::state::AppState;

/// One row of an order table.
#[derive(Clone)]
pub struct OrderRowView {
    pub id: i32,
    pub number: String,
    pub customer: String,
    pub email: String,
    pub status: &'static str,
    pub status_label: &'static str,
    pub payment_status: &'static str,
    pub payment_method: &'static str,
    pub item_count: i64,
    pub total: String,
    pub placed_at: String,
}

impl From<&OrderRow> for OrderRowView {
    fn from(row: &OrderRow) -> Self {
        Self {
            id: row.id.as_i32(),
            number: format_order_number(row.id),
            customer: row.full_name.clone(),
            email: row.email.to_string(),
            status: row.status.as_str(),
            status_label: row.status.label(),
            payment_status: row.payment_status.as_str(),
            payment_method: row.payment_method.label(),
            item_count: row.item_count,
            total: Price::eur(row.total).to_string(),
            placed_at: short_datetime(&row.created_at),
        }
    }
}

pub struct StatusOption {
    pub value: &'static str,
    pub label: &'static str,
    pub selected: bool,
}

pub struct OrderLineView {
    pub title: String,
    pub variant_label: Option<String>,
    pub kind: &'static str,
    pub quantity: i32,
    pub unit_price: String,
    pub line_total: String,
}

impl From<&OrderLine> for OrderLineView {
    fn from(line: &OrderLine) -> Self {
        let kind = if line.combo_id.is_some() {
            "Combo"
        } else if line.variant_id.is_some() {
            "Variant"
        } else {
            "Product"
        };
        Self {
            title: line.title.clone(),
            variant_label: line.variant_label.clone(),
            kind,
            quantity: line.quantity,
            unit_price: Price::eur(line.unit_price).to_string(),
            line_total: Price::eur(line.line_total).to_string(),
        }
    }
}

/// A status the order may move to next, as a button.
pub struct NextStatus {
    pub value: &'static str,
    pub label: &'static str,
    pub danger: bool,
}

#[derive(Debug, Deserialize)]
pub struct OrdersQuery {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub q: String,
    pub page: Option<u32>,
}

#[derive(Template, WebTemplate)]
#[template(path = "orders/index.html")]
pub struct OrdersIndexTemplate {
    pub ctx: PageContext,
    pub orders: Vec<OrderRowView>,
    pub statuses: Vec<StatusOption>,
    pub search: String,
    pub pager: Pager,
}

#[derive(Template, WebTemplate)]
#[template(path = "orders/show.html")]
pub struct OrderShowTemplate {
    pub ctx: PageContext,
    pub id: i32,
    pub number: String,
    pub placed_at: String,
    pub status: &'static str,
    pub status_label: &'static str,
    pub customer_id: Option<i32>,
    pub email: String,
    pub address_lines: Vec<String>,
    pub phone: String,
    pub payment_method: &'static str,
    pub payment_status: &'static str,
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
    pub shipped_at: Option<String>,
    pub delivered_at: Option<String>,
    pub next_statuses: Vec<NextStatus>,
    pub can_ship: bool,
    pub partners: Vec<ShippingPartner>,
    pub can_mark_paid: bool,
    pub can_refund: bool,
    pub max_tracking_length: usize,
}

/// Order list page handler.
///
/// GET /orders
#[instrument(skip(state, ctx))]
pub async fn index(
    State(state): State<AppState>,
    ctx: PageContext,
    Query(query): Query<OrdersQuery>,
) -> Result<OrdersIndexTemplate, AppError> {
    let status = query.status.parse::<OrderStatus>().ok();
    let page = query.page.unwrap_or(1);
    let search = query.q.trim().to_owned();

    let filter = OrderFilter {
        status,
        search: (!search.is_empty()).then(|| search.clone()),
        page,
    };
    let (rows, total) = OrderRepository::new(state.pool()).list(&filter).await?;

    let statuses = OrderStatus::ALL
        .iter()
        .map(|&s| StatusOption {
            value: s.as_str(),
            label: s.label(),
            selected: status == Some(s),
        })
        .collect();
    let status_param = status.map_or("", OrderStatus::as_str);

    Ok(OrdersIndexTemplate {
        ctx,
        orders: rows.iter().map(OrderRowView::from).collect(),
        statuses,
        pager: Pager::new(page, total, &[("status", status_param), ("q", &search)]),
        search,
    })
}

/// Buttons for the status edges, except `shipped` which needs the ship form.
fn next_statuses(status: OrderStatus) -> Vec<NextStatus> {
    status
        .next_statuses()
        .into_iter()
        .filter(|s| *s != OrderStatus::Shipped)
        .map(|s| NextStatus {
            value: s.as_str(),
            label: s.label(),
            danger: s == OrderStatus::Cancelled,
        })
        .collect()
}

/// Order detail page handler.
///
/// GET /orders/{id}
#[instrument(skip(state, ctx))]
pub async fn show(
    State(state): State<AppState>,
    ctx: PageContext,
    Path(id): Path<i32>,
) -> Result<OrderShowTemplate, AppError> {
    let pool = state.pool();
    let repo = OrderRepository::new(pool);
    let order = repo
        .get(OrderId::new(id))
        .await?
        .ok_or_else(|| AppError::NotFound("Order".to_owned()))?;
    let lines = repo.lines(order.id).await?;

    let partners_repo = ShippingPartnerRepository::new(pool);
    let partner = match order.shipping_partner_id {
        Some(partner_id) => partners_repo.get(partner_id).await?,
        None => None,
    };
    let can_ship = order.status == OrderStatus::Processing;
    let partners = if can_ship {
        partners_repo.list_active().await?
    } else {
        Vec::new()
    };

    let tracking_url = partner
        .as_ref()
        .zip(order.tracking_number.as_deref())
        .and_then(|(p, code)| p.tracking_url(code));

    Ok(OrderShowTemplate {
        ctx,
        id: order.id.as_i32(),
        number: order.order_number(),
        placed_at: short_datetime(&order.created_at),
        status: order.status.as_str(),
        status_label: order.status.label(),
        customer_id: order.customer_id.map(|c| c.as_i32()),
        email: order.email.to_string(),
        address_lines: order.address.lines(),
        phone: order.address.phone.clone(),
        payment_method: order.payment_method.label(),
        payment_status: order.payment_status.as_str(),
        lines: lines.iter().map(OrderLineView::from).collect(),
        subtotal: Price::eur(order.subtotal).to_string(),
        discount: (!order.discount_total.is_zero())
            .then(|| Price::eur(order.discount_total).to_string()),
        coupon_code: order.coupon_code.clone(),
        shipping: Price::eur(order.shipping_fee).to_string(),
        total: Price::eur(order.total).to_string(),
        notes: order.notes.clone(),
        carrier: partner.as_ref().map(|p| p.name.clone()),
        tracking_number: order.tracking_number.clone(),
        tracking_url,
        shipped_at: order.shipped_at.as_ref().map(short_datetime),
        delivered_at: order.delivered_at.as_ref().map(short_datetime),
        next_statuses: next_statuses(order.status),
        can_ship,
        partners,
        can_mark_paid: orders::payment_change_allowed(order.payment_status, PaymentStatus::Paid),
        can_refund: orders::payment_change_allowed(order.payment_status, PaymentStatus::Refunded),
        max_tracking_length: MAX_TRACKING_LENGTH,
    })
}

#[derive(Debug, Deserialize)]
pub struct TransitionForm {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct ShipForm {
    pub partner_id: i32,
    pub tracking_number: String,
}

#[derive(Debug, Deserialize)]
pub struct PaymentForm {
    pub payment_status: String,
}

/// Refusals become a flash on the detail page; anything else is an error.
fn refusal(err: OrderActionError) -> Result<Flash, AppError> {
    match err {
        OrderActionError::Repository(_) | OrderActionError::NotFound => Err(err.into()),
        other => Ok(Flash::error(other.to_string())),
    }
}

/// Build the e-mail data and send it when SMTP is configured.
async fn send_order_mail(state: &AppState, order: &Order, shipment: Option<Shipment>) -> Result<(), AppError> {
    let Some(mailer) = state.email() else {
        return Ok(());
    };
    let settings = SettingsRepository::new(state.pool()).load().await?;
    let order_url = state
        .config()
        .storefront_url(&format!("/account/orders/{}", order.id));
    let mail = OrderMail::new(order, &settings.store_name, order_url);
    orders::notify_customer(mailer, order, &mail, shipment.as_ref()).await;
    Ok(())
}

/// Move an order along its lifecycle.
///
/// POST /orders/{id}/status
#[instrument(skip(state, session, admin), fields(admin_id = %admin.id))]
pub async fn transition(
    State(state): State<AppState>,
    session: Session,
    RequireWriter(admin): RequireWriter,
    Path(id): Path<i32>,
    Form(form): Form<TransitionForm>,
) -> Result<Redirect, AppError> {
    let to = form
        .status
        .parse::<OrderStatus>()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let flash = match orders::transition(state.pool(), OrderId::new(id), to).await {
        Ok(order) => {
            send_order_mail(&state, &order, None).await?;
            Flash::success(format!("Order is now {}", order.status.label().to_lowercase()))
        }
        Err(e) => refusal(e)?,
    };
    set_flash(&session, flash).await?;
    Ok(Redirect::to(&format!("/orders/{id}")))
}

/// Record the carrier and mark the order shipped.
///
/// POST /orders/{id}/ship
#[instrument(skip(state, session, admin), fields(admin_id = %admin.id))]
pub async fn ship(
    State(state): State<AppState>,
    session: Session,
    RequireWriter(admin): RequireWriter,
    Path(id): Path<i32>,
    Form(form): Form<ShipForm>,
) -> Result<Redirect, AppError> {
    let result = orders::ship(
        state.pool(),
        OrderId::new(id),
        ShippingPartnerId::new(form.partner_id),
        &form.tracking_number,
    )
    .await;

    let flash = match result {
        Ok((order, partner)) => {
            let tracking_number = order.tracking_number.clone().unwrap_or_default();
            let shipment = Shipment {
                carrier: partner.name.clone(),
                tracking_url: partner.tracking_url(&tracking_number),
                tracking_number,
            };
            send_order_mail(&state, &order, Some(shipment)).await?;
            Flash::success(format!("Order shipped with {}", partner.name))
        }
        Err(e) => refusal(e)?,
    };
    set_flash(&session, flash).await?;
    Ok(Redirect::to(&format!("/orders/{id}")))
}

/// Mark an order paid or refunded.
///
/// POST /orders/{id}/payment
#[instrument(skip(state, session, admin), fields(admin_id = %admin.id))]
pub async fn payment(
    State(state): State<AppState>,
    session: Session,
    RequireWriter(admin): RequireWriter,
    Path(id): Path<i32>,
    Form(form): Form<PaymentForm>,
) -> Result<Redirect, AppError> {
    let to = form
        .payment_status
        .parse::<PaymentStatus>()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let flash = match orders::set_payment(state.pool(), OrderId::new(id), to).await {
        Ok(()) => Flash::success(format!("Payment marked {to}")),
        Err(e) => refusal(e)?,
    };
    set_flash(&session, flash).await?;
    Ok(Redirect::to(&format!("/orders/{id}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_status_buttons_skip_shipping() {
        let buttons = next_statuses(OrderStatus::Processing);
        let values: Vec<_> = buttons.iter().map(|b| b.value).collect();
        assert_eq!(values, vec!["cancelled"]);
        assert!(buttons.iter().all(|b| b.danger));

        let buttons = next_statuses(OrderStatus::Pending);
        assert!(buttons.iter().any(|b| b.value == "confirmed" && !b.danger));
        assert!(next_statuses(OrderStatus::Delivered).is_empty());
    }

    #[test]
    fn test_refusals_become_flash_messages() {
        let flash = refusal(OrderActionError::NotShippable).unwrap_or_else(|_| Flash::success("x"));
        assert_eq!(flash, Flash::error("only orders that are being processed can be shipped"));
        assert!(refusal(OrderActionError::NotFound).is_err());
    }
}
