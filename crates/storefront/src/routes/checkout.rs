//! Checkout route handlers.
//!
//! Checkout needs a signed-in customer. The order itself is placed by
//! [`crate::services::checkout::place_order`]; these handlers only collect the
//! form and show the outcome.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use chrono::Utc;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use jouwwinkel_core::validation::ValidationErrors;
use jouwwinkel_core::{OrderId, PaymentMethod};

use crate::db::CustomerRepository;
use crate::error::AppError;
use crate::filters;
use crate::middleware::auth::RequireAuth;
use crate::models::CurrentCustomer;
use crate::routes::account::{OrderDetailView, order_detail};
use crate::routes::cart::{CartView, capitalize, reprice};
use crate::routes::context::{PageContext, load_cart, save_cart};
use crate::services::checkout::{
    AddressForm, CheckoutError, CheckoutRequest, place_order, validate_notes,
};
use crate::state::AppState;

/// A payment method radio button.
#[derive(Clone)]
pub struct PaymentChoice {
    pub value: &'static str,
    pub label: &'static str,
    pub checked: bool,
}

fn payment_choices(selected: PaymentMethod) -> Vec<PaymentChoice> {
    [PaymentMethod::BankTransfer, PaymentMethod::CashOnDelivery]
        .into_iter()
        .map(|m| PaymentChoice {
            value: m.as_str(),
            label: m.label(),
            checked: m == selected,
        })
        .collect()
}

/// Checkout form data.
#[derive(Debug, Deserialize)]
pub struct CheckoutForm {
    #[serde(flatten)]
    pub address: AddressForm,
    #[serde(default)]
    pub payment_method: String,
    #[serde(default)]
    pub notes: String,
}

/// Checkout page template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/show.html")]
pub struct CheckoutTemplate {
    pub ctx: PageContext,
    pub cart: CartView,
    pub address: AddressForm,
    pub payments: Vec<PaymentChoice>,
    pub notes: String,
    pub errors: ValidationErrors,
    /// Why the order could not be placed, such as a stock shortfall.
    pub error: Option<String>,
}

#[derive(Template, WebTemplate)]
#[template(path = "checkout/complete.html")]
pub struct CheckoutCompleteTemplate {
    pub ctx: PageContext,
    pub order: OrderDetailView,
}

/// What the checkout page should show besides the live cart.
struct CheckoutInput {
    address: AddressForm,
    payment_method: PaymentMethod,
    notes: String,
    errors: ValidationErrors,
    error: Option<String>,
}

/// Render the checkout page over a freshly priced cart, or send the
/// customer back to `/cart` when nothing is left to buy.
async fn render(
    state: &AppState,
    session: &Session,
    ctx: PageContext,
    input: CheckoutInput,
    status: StatusCode,
) -> Result<Response, AppError> {
    let mut cart = load_cart(session).await?;
    let priced = reprice(state, session, &mut cart).await?;
    if priced.is_empty() {
        return Ok(Redirect::to("/cart").into_response());
    }
    let page = CheckoutTemplate {
        ctx,
        cart: CartView::new(&cart, &priced),
        address: input.address,
        payments: payment_choices(input.payment_method),
        notes: input.notes,
        errors: input.errors,
        error: input.error,
    };
    Ok((status, page).into_response())
}

/// Display the checkout page, prefilled from the profile.
#[instrument(skip_all, fields(customer_id = %current.id))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(current): RequireAuth,
    ctx: PageContext,
) -> Result<Response, AppError> {
    let address = CustomerRepository::new(state.pool())
        .get_by_id(current.id)
        .await?
        .map(|c| AddressForm::from(&c.default_address()))
        .unwrap_or_default();

    let input = CheckoutInput {
        address,
        payment_method: PaymentMethod::default(),
        notes: String::new(),
        errors: ValidationErrors::new(),
        error: None,
    };
    render(&state, &session, ctx, input, StatusCode::OK).await
}

/// Place the order.
#[instrument(skip_all, fields(customer_id = %current.id))]
pub async fn place(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(current): RequireAuth,
    ctx: PageContext,
    Form(form): Form<CheckoutForm>,
) -> Result<Response, AppError> {
    let mut input = CheckoutInput {
        address: form.address,
        payment_method: PaymentMethod::default(),
        notes: form.notes,
        errors: ValidationErrors::new(),
        error: None,
    };

    let request = match checkout_request(&current, &mut input, &form.payment_method) {
        Ok(request) => request,
        Err(CheckoutError::Invalid(errors)) => {
            input.errors = errors;
            return render(&state, &session, ctx, input, StatusCode::UNPROCESSABLE_ENTITY).await;
        }
        Err(e) => return Err(AppError::BadRequest(e.to_string())),
    };

    let mut cart = load_cart(&session).await?;
    let rule = state.content().ui_config().await?.shipping_rule();

    match place_order(state.pool(), &cart, &rule, request, Utc::now()).await {
        Ok(order) => {
            cart.clear();
            save_cart(&session, &cart).await?;
            Ok(Redirect::to(&format!("/checkout/complete/{}", order.id)).into_response())
        }
        Err(CheckoutError::Repository(e)) => Err(e.into()),
        Err(CheckoutError::EmptyCart) => Ok(Redirect::to("/cart").into_response()),
        Err(CheckoutError::Invalid(errors)) => {
            input.errors = errors;
            render(&state, &session, ctx, input, StatusCode::UNPROCESSABLE_ENTITY).await
        }
        Err(e) => {
            tracing::info!(reason = %e, "Checkout refused");
            input.error = Some(capitalize(&e.to_string()));
            render(&state, &session, ctx, input, StatusCode::CONFLICT).await
        }
    }
}

/// Validate the posted form into a request, recording the chosen payment
/// method on `input` so a re-rendered form keeps it.
fn checkout_request(
    current: &CurrentCustomer,
    input: &mut CheckoutInput,
    payment_method: &str,
) -> Result<CheckoutRequest, CheckoutError> {
    let mut errors = ValidationErrors::new();
    input.payment_method = errors.choice("payment_method", payment_method);
    let address = match input.address.validate(true) {
        Ok(address) if errors.is_empty() => address,
        Ok(_) => return Err(CheckoutError::Invalid(errors)),
        Err(mut address_errors) => {
            if let Some(message) = errors.get("payment_method") {
                address_errors.add("payment_method", message);
            }
            return Err(CheckoutError::Invalid(address_errors));
        }
    };
    let notes = validate_notes(&input.notes)?;

    Ok(CheckoutRequest {
        customer_id: current.id,
        email: current.email.clone(),
        address,
        payment_method: input.payment_method,
        notes,
    })
}

/// Order confirmation.
#[instrument(skip(state, current, ctx), fields(customer_id = %current.id))]
pub async fn complete(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
    ctx: PageContext,
    Path(id): Path<i32>,
) -> Result<CheckoutCompleteTemplate, AppError> {
    let order = order_detail(&state, OrderId::new(id), &current).await?;
    Ok(CheckoutCompleteTemplate { ctx, order })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use jouwwinkel_core::{CustomerId, Email};

    use super::*;

    fn customer() -> CurrentCustomer {
        CurrentCustomer {
            id: CustomerId::new(7),
            email: Email::parse("sanne@example.nl").unwrap(),
            name: "Sanne".to_owned(),
        }
    }

    fn input(street: &str) -> CheckoutInput {
        CheckoutInput {
            address: AddressForm {
                full_name: "Sanne de Vries".to_owned(),
                street: street.to_owned(),
                postal_code: "1015 aa".to_owned(),
                city: "Amsterdam".to_owned(),
                ..AddressForm::default()
            },
            payment_method: PaymentMethod::default(),
            notes: "Ring twice".to_owned(),
            errors: ValidationErrors::new(),
            error: None,
        }
    }

    #[test]
    fn test_checkout_request_from_valid_form() {
        let mut input = input("Keizersgracht 1");
        let request = checkout_request(&customer(), &mut input, "cash_on_delivery").unwrap();
        assert_eq!(request.payment_method, PaymentMethod::CashOnDelivery);
        assert_eq!(request.address.postal_code, "1015 AA");
        assert_eq!(request.notes, "Ring twice");
        assert_eq!(input.payment_method, PaymentMethod::CashOnDelivery);
    }

    #[test]
    fn test_checkout_request_collects_all_errors() {
        let mut input = input("");
        let Err(CheckoutError::Invalid(errors)) =
            checkout_request(&customer(), &mut input, "bitcoin")
        else {
            panic!("expected validation errors");
        };
        assert!(errors.get("street").is_some());
        assert!(errors.get("payment_method").is_some());
    }

    #[test]
    fn test_payment_choices_mark_selection() {
        let choices = payment_choices(PaymentMethod::CashOnDelivery);
        assert_eq!(choices.len(), 2);
        assert!(!choices[0].checked);
        assert!(choices[1].checked);
        assert_eq!(choices[1].value, "cash_on_delivery");
    }
}
