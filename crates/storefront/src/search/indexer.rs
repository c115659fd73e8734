//! Search index builder.
//!
//! Reads the active catalog from the database and rebuilds the index in a
//! background task.

use std::collections::HashMap;
use std::time::Duration;

use sqlx::PgPool;
use tracing::{error, info, instrument};

use jouwwinkel_core::models::{Category, Combo, ComboItem, Product};
use jouwwinkel_core::{CategoryId, ComboId, ProductId};

use crate::db::{CatalogRepository, ComboRepository, RepositoryError, combos};

use super::{SearchDocument, SearchIndex};

/// Spawn a background task that builds the index now and again every
/// `interval`.
///
/// Until the first build completes, searches return empty results.
pub fn spawn_refresh(search_index: SearchIndex, pool: PgPool, interval: Duration) {
    info!(interval_secs = interval.as_secs(), "Spawning search index refresh task");
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            rebuild(&search_index, &pool).await;
        }
    });
}

/// Rebuild the index once, logging instead of failing.
#[instrument(skip_all)]
pub async fn rebuild(search_index: &SearchIndex, pool: &PgPool) {
    let documents = match load_documents(pool).await {
        Ok(documents) => documents,
        Err(e) => {
            error!(error = %e, "Failed to load catalog for search index");
            return;
        }
    };

    // Tantivy indexing is CPU-bound
    let index = search_index.clone();
    match tokio::task::spawn_blocking(move || index.replace(&documents)).await {
        Ok(Ok(count)) => info!(docs = count, "Search index rebuilt"),
        Ok(Err(e)) => error!(error = %e, "Failed to build search index"),
        Err(e) => error!(error = %e, "Search index build task panicked"),
    }
}

async fn load_documents(pool: &PgPool) -> Result<Vec<SearchDocument>, RepositoryError> {
    let catalog = CatalogRepository::new(pool);
    let categories = catalog.active_categories().await?;
    let products = catalog.all_active_products().await?;
    let variant_totals = catalog.variant_stock_totals().await?;

    let combo_rows = ComboRepository::new(pool).list_active().await?;
    let combo_ids: Vec<ComboId> = combo_rows.iter().map(|c| c.id).collect();
    let items = combos::items_for(pool, &combo_ids).await?;

    Ok(documents(
        &categories,
        &products,
        &variant_totals,
        &combo_rows,
        &items,
    ))
}

/// Turn catalog rows into index documents.
///
/// A product is available when it (or any of its variants) has stock; a
/// combo when every component can fill at least one bundle.
fn documents(
    categories: &[Category],
    products: &[Product],
    variant_totals: &HashMap<ProductId, i64>,
    combo_rows: &[Combo],
    items: &[ComboItem],
) -> Vec<SearchDocument> {
    let category_names: HashMap<CategoryId, &str> =
        categories.iter().map(|c| (c.id, c.name.as_str())).collect();
    let active: HashMap<ProductId, &Product> = products.iter().map(|p| (p.id, p)).collect();

    let mut docs = Vec::with_capacity(categories.len() + products.len() + combo_rows.len());

    docs.extend(categories.iter().map(SearchDocument::category));

    for product in products {
        let available = variant_totals
            .get(&product.id)
            .map_or(product.stock > 0, |total| *total > 0);
        let category = product
            .category_id
            .and_then(|id| category_names.get(&id).copied());
        docs.push(SearchDocument::product(product, category, available));
    }

    for combo in combo_rows {
        let mut components = items.iter().filter(|i| i.combo_id == combo.id).peekable();
        let has_components = components.peek().is_some();
        let fillable = components.all(|item| {
            active
                .get(&item.product_id)
                .is_some_and(|p| p.stock >= item.quantity)
        });
        docs.push(SearchDocument::combo(combo, has_components && fillable));
    }

    docs
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use super::super::DocType;
    use super::*;

    fn product(id: i32, stock: i32) -> Product {
        Product {
            id: ProductId::new(id),
            category_id: Some(CategoryId::new(1)),
            name: format!("Product {id}"),
            slug: format!("product-{id}"),
            description: String::new(),
            price: Decimal::new(1000, 2),
            compare_at_price: None,
            stock,
            image_urls: Vec::new(),
            is_featured: false,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn category() -> Category {
        Category {
            id: CategoryId::new(1),
            name: "Keuken".to_owned(),
            slug: "keuken".to_owned(),
            description: None,
            image_url: None,
            sort_order: 0,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn combo(id: i32) -> Combo {
        Combo {
            id: ComboId::new(id),
            name: format!("Combo {id}"),
            slug: format!("combo-{id}"),
            description: String::new(),
            image_url: None,
            price: Decimal::new(2500, 2),
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_documents_availability() {
        let products = [product(1, 0), product(2, 3), product(3, 0)];
        let mut variant_totals = HashMap::new();
        variant_totals.insert(ProductId::new(3), 4_i64);
        let combos = [combo(1), combo(2)];
        let items = [
            ComboItem {
                combo_id: ComboId::new(1),
                product_id: ProductId::new(2),
                quantity: 2,
            },
            ComboItem {
                combo_id: ComboId::new(2),
                product_id: ProductId::new(2),
                quantity: 4,
            },
        ];

        let docs = documents(&[category()], &products, &variant_totals, &combos, &items);
        assert_eq!(docs.len(), 6);

        let find = |slug: &str| docs.iter().find(|d| d.slug == slug).unwrap();
        assert!(!find("product-1").available);
        assert!(find("product-2").available);
        // sold through variants: the variant total counts, not product stock
        assert!(find("product-3").available);
        assert!(find("combo-1").available);
        assert!(!find("combo-2").available);
        assert_eq!(find("product-2").tags, "Keuken");
        assert_eq!(find("keuken").doc_type, DocType::Category);
    }

    #[test]
    fn test_combo_without_components_is_unavailable() {
        let docs = documents(&[], &[], &HashMap::new(), &[combo(9)], &[]);
        assert!(!docs[0].available);
    }
}
