//! Customer list and detail (read-only).

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::{Path, Query, State};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::instrument;

use jouwwinkel_core::models::{Customer, Order};
use jouwwinkel_core::{CustomerId, OrderStatus, Price};

use crate::db::{CustomerRepository, CustomerRow, OrderRepository};
use crate::error::AppError;
use crate::filters::{self, short_datetime};
use crate::routes::context::{PageContext, Pager};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CustomersQuery {
    #[serde(default)]
    pub q: String,
    pub page: Option<u32>,
}

pub struct CustomerRowView {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub city: String,
    pub joined: String,
    pub order_count: i64,
    pub total_spent: String,
}

impl From<&CustomerRow> for CustomerRowView {
    fn from(row: &CustomerRow) -> Self {
        Self {
            id: row.id.as_i32(),
            name: row.full_name.clone(),
            email: row.email.to_string(),
            city: row.city.clone(),
            joined: short_datetime(&row.created_at),
            order_count: row.order_count,
            total_spent: Price::eur(row.total_spent).to_string(),
        }
    }
}

pub struct CustomerOrderView {
    pub id: i32,
    pub number: String,
    pub placed_at: String,
    pub status: &'static str,
    pub status_label: &'static str,
    pub total: String,
}

impl From<&Order> for CustomerOrderView {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id.as_i32(),
            number: order.order_number(),
            placed_at: short_datetime(&order.created_at),
            status: order.status.as_str(),
            status_label: order.status.label(),
            total: Price::eur(order.total).to_string(),
        }
    }
}

#[derive(Template, WebTemplate)]
#[template(path = "customers/index.html")]
pub struct CustomersIndexTemplate {
    pub ctx: PageContext,
    pub customers: Vec<CustomerRowView>,
    pub search: String,
    pub pager: Pager,
}

#[derive(Template, WebTemplate)]
#[template(path = "customers/show.html")]
pub struct CustomerShowTemplate {
    pub ctx: PageContext,
    pub customer: Customer,
    pub email: String,
    pub joined: String,
    pub address_lines: Vec<String>,
    pub orders: Vec<CustomerOrderView>,
    pub total_spent: String,
}

/// Total of the orders that were not cancelled.
fn total_spent(orders: &[Order]) -> Decimal {
    orders
        .iter()
        .filter(|o| o.status != OrderStatus::Cancelled)
        .map(|o| o.total)
        .sum()
}

/// GET /customers
#[instrument(skip(state, ctx))]
pub async fn index(
    State(state): State<AppState>,
    ctx: PageContext,
    Query(query): Query<CustomersQuery>,
) -> Result<CustomersIndexTemplate, AppError> {
    let page = query.page.unwrap_or(1);
    let search = query.q.trim().to_owned();
    let (rows, total) = CustomerRepository::new(state.pool())
        .list((!search.is_empty()).then_some(search.as_str()), page)
        .await?;

    Ok(CustomersIndexTemplate {
        ctx,
        customers: rows.iter().map(CustomerRowView::from).collect(),
        pager: Pager::new(page, total, &[("q", &search)]),
        search,
    })
}

/// GET /customers/{id}
#[instrument(skip(state, ctx))]
pub async fn show(
    State(state): State<AppState>,
    ctx: PageContext,
    Path(id): Path<i32>,
) -> Result<CustomerShowTemplate, AppError> {
    let pool = state.pool();
    let customer_id = CustomerId::new(id);
    let customer = CustomerRepository::new(pool)
        .get(customer_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Customer".to_owned()))?;
    let orders = OrderRepository::new(pool).list_for_customer(customer_id).await?;

    Ok(CustomerShowTemplate {
        email: customer.email.to_string(),
        joined: short_datetime(&customer.created_at),
        address_lines: customer.default_address().lines(),
        total_spent: Price::eur(total_spent(&orders)).to_string(),
        orders: orders.iter().map(CustomerOrderView::from).collect(),
        customer,
        ctx,
    })
}
