//! Combo (bundle) pages.

use std::collections::HashMap;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use tracing::instrument;

use jouwwinkel_core::models::{Combo, ComboItem, Product, combo_savings};
use jouwwinkel_core::{ComboId, Price, ProductId};

use crate::db::{ComboRepository, RepositoryError, catalog, combos};
use crate::error::AppError;
use crate::filters;
use crate::routes::context::PageContext;
use crate::services::content::render_markdown;
use crate::state::AppState;

/// A combo tile with its price, saving and availability.
pub struct ComboCard {
    pub id: ComboId,
    pub slug: String,
    pub name: String,
    pub image_url: Option<String>,
    pub price: String,
    pub savings: Option<String>,
    pub available: bool,
}

/// One product inside a combo.
pub struct ComponentView {
    pub name: String,
    pub slug: String,
    pub quantity: i32,
    pub unit_price: String,
}

/// Build a card from a combo, its component rows and the component products.
///
/// A combo is available only when it has components and every component is
/// active with enough stock for one bundle.
fn combo_card(combo: &Combo, items: &[ComboItem], products: &HashMap<ProductId, Product>) -> ComboCard {
    let components: Vec<&ComboItem> = items.iter().filter(|i| i.combo_id == combo.id).collect();
    let available = !components.is_empty()
        && components.iter().all(|item| {
            products
                .get(&item.product_id)
                .is_some_and(|p| p.is_active && p.stock >= item.quantity)
        });
    let savings = combo_savings(
        combo.price,
        components.iter().filter_map(|item| {
            products
                .get(&item.product_id)
                .map(|p| (p.price, item.quantity))
        }),
    );

    ComboCard {
        id: combo.id,
        slug: combo.slug.clone(),
        name: combo.name.clone(),
        image_url: combo.image_url.clone(),
        price: Price::eur(combo.price).to_string(),
        savings: (!savings.is_zero()).then(|| Price::eur(savings).to_string()),
        available,
    }
}

/// Cards for a set of combos, with two queries for all their components.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if a query fails.
pub async fn combo_cards(state: &AppState, rows: &[Combo]) -> Result<Vec<ComboCard>, RepositoryError> {
    let ids: Vec<ComboId> = rows.iter().map(|c| c.id).collect();
    let items = combos::items_for(state.pool(), &ids).await?;
    let products = component_products(state, &items).await?;
    Ok(rows
        .iter()
        .map(|combo| combo_card(combo, &items, &products))
        .collect())
}

async fn component_products(
    state: &AppState,
    items: &[ComboItem],
) -> Result<HashMap<ProductId, Product>, RepositoryError> {
    let ids: Vec<ProductId> = items.iter().map(|i| i.product_id).collect();
    let products = catalog::products_by_ids(state.pool(), &ids).await?;
    Ok(products.into_iter().map(|p| (p.id, p)).collect())
}

#[derive(Template, WebTemplate)]
#[template(path = "combos/index.html")]
pub struct CombosIndexTemplate {
    pub ctx: PageContext,
    pub combos: Vec<ComboCard>,
}

#[derive(Template, WebTemplate)]
#[template(path = "combos/show.html")]
pub struct ComboShowTemplate {
    pub ctx: PageContext,
    pub card: ComboCard,
    pub description_html: String,
    pub components: Vec<ComponentView>,
}

/// GET /combos
pub async fn index(State(state): State<AppState>, ctx: PageContext) -> Result<Response, AppError> {
    let rows = ComboRepository::new(state.pool()).list_active().await?;
    let combos = combo_cards(&state, &rows).await?;
    Ok(CombosIndexTemplate { ctx, combos }.into_response())
}

/// GET /combos/{slug}
#[instrument(skip(state, ctx))]
pub async fn show(
    State(state): State<AppState>,
    ctx: PageContext,
    Path(slug): Path<String>,
) -> Result<Response, AppError> {
    let repo = ComboRepository::new(state.pool());
    let combo = repo
        .by_slug(&slug)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("combo {slug}")))?;
    let items = repo.items(combo.id).await?;
    let products = component_products(&state, &items).await?;

    let components = items
        .iter()
        .filter_map(|item| {
            products.get(&item.product_id).map(|p| ComponentView {
                name: p.name.clone(),
                slug: p.slug.clone(),
                quantity: item.quantity,
                unit_price: Price::eur(p.price).to_string(),
            })
        })
        .collect();

    Ok(ComboShowTemplate {
        card: combo_card(&combo, &items, &products),
        description_html: render_markdown(&combo.description),
        components,
        ctx,
    }
    .into_response())
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use super::*;

    fn product(id: i32, price: i64, stock: i32) -> Product {
        Product {
            id: ProductId::new(id),
            category_id: None,
            name: format!("Product {id}"),
            slug: format!("product-{id}"),
            description: String::new(),
            price: Decimal::new(price, 2),
            compare_at_price: None,
            stock,
            image_urls: Vec::new(),
            is_featured: false,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn combo(price: i64) -> Combo {
        Combo {
            id: ComboId::new(1),
            name: "Ontbijtset".to_owned(),
            slug: "ontbijtset".to_owned(),
            description: String::new(),
            image_url: None,
            price: Decimal::new(price, 2),
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn item(product_id: i32, quantity: i32) -> ComboItem {
        ComboItem {
            combo_id: ComboId::new(1),
            product_id: ProductId::new(product_id),
            quantity,
        }
    }

    #[test]
    fn test_combo_card_savings_and_availability() {
        let products: HashMap<ProductId, Product> = [product(1, 1000, 5), product(2, 450, 2)]
            .into_iter()
            .map(|p| (p.id, p))
            .collect();
        let items = [item(1, 1), item(2, 2)];

        let card = combo_card(&combo(1500), &items, &products);
        assert_eq!(card.price, "€15.00");
        assert_eq!(card.savings.as_deref(), Some("€4.00"));
        assert!(card.available);

        let items = [item(1, 1), item(2, 3)];
        assert!(!combo_card(&combo(1500), &items, &products).available);
    }

    #[test]
    fn test_empty_combo_is_unavailable() {
        let card = combo_card(&combo(1000), &[], &HashMap::new());
        assert!(!card.available);
        assert_eq!(card.savings, None);
    }
}
