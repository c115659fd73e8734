//! Stock and coupon bookkeeping across checkout and cancellation.
//!
//! These tests require a `PostgreSQL` database migrated with
//! `jw-cli migrate all` and reachable through `DATABASE_URL`. They create
//! their own products, so a seeded catalog is not needed.

#![allow(clippy::unwrap_used)]

use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use jouwwinkel_admin::db::RepositoryError;
use jouwwinkel_admin::services::InventoryError;
use jouwwinkel_admin::services::inventory::generate_inventory;
use jouwwinkel_core::cart::{Cart, CartItem, ShippingRule};
use jouwwinkel_core::models::{Order, ShippingAddress};
use jouwwinkel_core::{
    ComboId, CustomerId, Email, OrderStatus, PaymentMethod, ProductId, VariantId,
};
use jouwwinkel_integration_tests::database;
use jouwwinkel_storefront::services::checkout::{CheckoutRequest, place_order};
use jouwwinkel_storefront::services::orders::cancel_order;

fn unique(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::new_v4().simple())
}

async fn product(pool: &PgPool, stock: i32) -> ProductId {
    let slug = unique("stock-test");
    sqlx::query_scalar("INSERT INTO shop.product (name, slug, price, stock) VALUES ($1, $1, 5.00, $2) RETURNING id")
        .bind(&slug)
        .bind(stock)
        .fetch_one(pool)
        .await
        .unwrap()
}

async fn variant(pool: &PgPool, product_id: ProductId, stock: i32) -> VariantId {
    sqlx::query_scalar(
        "INSERT INTO shop.variant (product_id, option_values, stock) VALUES ($1, ARRAY['M'], $2) RETURNING id",
    )
    .bind(product_id)
    .bind(stock)
    .fetch_one(pool)
    .await
    .unwrap()
}

async fn combo(pool: &PgPool, items: &[(ProductId, i32)]) -> ComboId {
    let slug = unique("stock-combo");
    let id: ComboId =
        sqlx::query_scalar("INSERT INTO shop.combo (name, slug, price) VALUES ($1, $1, 12.00) RETURNING id")
            .bind(&slug)
            .fetch_one(pool)
            .await
            .unwrap();
    for (product_id, quantity) in items {
        sqlx::query("INSERT INTO shop.combo_item (combo_id, product_id, quantity) VALUES ($1, $2, $3)")
            .bind(id)
            .bind(product_id)
            .bind(quantity)
            .execute(pool)
            .await
            .unwrap();
    }
    id
}

async fn coupon(pool: &PgPool) -> String {
    let code = unique("STOCK").to_uppercase();
    sqlx::query("INSERT INTO shop.coupon (code, discount_type, value) VALUES ($1, 'percentage', 10)")
        .bind(&code)
        .execute(pool)
        .await
        .unwrap();
    code
}

async fn product_stock(pool: &PgPool, id: ProductId) -> i32 {
    sqlx::query_scalar("SELECT stock FROM shop.product WHERE id = $1")
        .bind(id)
        .fetch_one(pool)
        .await
        .unwrap()
}

async fn variant_stock(pool: &PgPool, id: VariantId) -> i32 {
    sqlx::query_scalar("SELECT stock FROM shop.variant WHERE id = $1")
        .bind(id)
        .fetch_one(pool)
        .await
        .unwrap()
}

async fn times_used(pool: &PgPool, code: &str) -> i32 {
    sqlx::query_scalar("SELECT times_used FROM shop.coupon WHERE code = $1")
        .bind(code)
        .fetch_one(pool)
        .await
        .unwrap()
}

async fn order_status(pool: &PgPool, order: &Order) -> OrderStatus {
    sqlx::query_scalar("SELECT status FROM shop.customer_order WHERE id = $1")
        .bind(order.id)
        .fetch_one(pool)
        .await
        .unwrap()
}

/// Place an order for `cart` as a fresh customer.
async fn checkout(pool: &PgPool, cart: &Cart) -> (CustomerId, Order) {
    let email = format!("{}@example.nl", unique("koper"));
    let customer_id: CustomerId =
        sqlx::query_scalar("INSERT INTO shop.customer (email) VALUES ($1) RETURNING id")
            .bind(&email)
            .fetch_one(pool)
            .await
            .unwrap();

    let request = CheckoutRequest {
        customer_id,
        email: Email::parse(&email).unwrap(),
        address: ShippingAddress {
            full_name: "Sanne de Vries".to_owned(),
            phone: String::new(),
            street: "Keizersgracht 1".to_owned(),
            postal_code: "1015 CJ".to_owned(),
            city: "Amsterdam".to_owned(),
            country: ShippingAddress::DEFAULT_COUNTRY.to_owned(),
        },
        payment_method: PaymentMethod::BankTransfer,
        notes: String::new(),
    };
    let rule = ShippingRule {
        flat_fee: Decimal::new(495, 2),
        free_threshold: None,
    };

    let order = place_order(pool, cart, &rule, request, Utc::now()).await.unwrap();
    (customer_id, order)
}

#[tokio::test]
#[ignore = "Requires migrated database"]
async fn test_customer_cancel_restores_stock_and_coupon() {
    let pool = database().await;
    let plain = product(&pool, 10).await;
    let shirt = product(&pool, 0).await;
    let medium = variant(&pool, shirt, 5).await;
    let code = coupon(&pool).await;

    let mut cart = Cart::new();
    cart.add(CartItem::product(plain, None), 2);
    cart.add(CartItem::product(shirt, Some(medium)), 3);
    cart.set_coupon(Some(&code));

    let (customer_id, order) = checkout(&pool, &cart).await;
    assert_eq!(product_stock(&pool, plain).await, 8);
    assert_eq!(variant_stock(&pool, medium).await, 2);
    assert_eq!(times_used(&pool, &code).await, 1);
    assert_eq!(order.coupon_code.as_deref(), Some(code.as_str()));

    cancel_order(&pool, order.id, customer_id).await.unwrap();

    assert_eq!(order_status(&pool, &order).await, OrderStatus::Cancelled);
    assert_eq!(product_stock(&pool, plain).await, 10);
    assert_eq!(variant_stock(&pool, medium).await, 5);
    assert_eq!(product_stock(&pool, shirt).await, 0);
    assert_eq!(times_used(&pool, &code).await, 0);
}

#[tokio::test]
#[ignore = "Requires migrated database"]
async fn test_cancel_returns_what_a_recomposed_combo_took() {
    let pool = database().await;
    let filter = product(&pool, 10).await;
    let paper = product(&pool, 10).await;
    let bundle = combo(&pool, &[(filter, 2)]).await;

    let mut cart = Cart::new();
    cart.add(CartItem::combo(bundle), 1);
    let (_, order) = checkout(&pool, &cart).await;
    assert_eq!(product_stock(&pool, filter).await, 8);

    // The combo is re-composed after the sale.
    sqlx::query("DELETE FROM shop.combo_item WHERE combo_id = $1")
        .bind(bundle)
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query("INSERT INTO shop.combo_item (combo_id, product_id, quantity) VALUES ($1, $2, 2)")
        .bind(bundle)
        .bind(paper)
        .execute(&pool)
        .await
        .unwrap();

    jouwwinkel_admin::services::orders::transition(&pool, order.id, OrderStatus::Cancelled)
        .await
        .unwrap();

    assert_eq!(product_stock(&pool, filter).await, 10);
    assert_eq!(product_stock(&pool, paper).await, 10);
}

#[tokio::test]
#[ignore = "Requires migrated database"]
async fn test_cancel_returns_stock_of_a_deleted_combo() {
    let pool = database().await;
    let tea = product(&pool, 6).await;
    let bundle = combo(&pool, &[(tea, 3)]).await;

    let mut cart = Cart::new();
    cart.add(CartItem::combo(bundle), 2);
    let (customer_id, order) = checkout(&pool, &cart).await;
    assert_eq!(product_stock(&pool, tea).await, 0);

    sqlx::query("DELETE FROM shop.combo WHERE id = $1")
        .bind(bundle)
        .execute(&pool)
        .await
        .unwrap();

    cancel_order(&pool, order.id, customer_id).await.unwrap();
    assert_eq!(product_stock(&pool, tea).await, 6);
}

#[tokio::test]
#[ignore = "Requires migrated database"]
async fn test_cancel_after_variant_removed_leaves_parent_alone() {
    let pool = database().await;
    let shirt = product(&pool, 0).await;
    let small = variant(&pool, shirt, 5).await;

    let mut cart = Cart::new();
    cart.add(CartItem::product(shirt, Some(small)), 3);
    let (customer_id, order) = checkout(&pool, &cart).await;

    sqlx::query("DELETE FROM shop.variant WHERE id = $1")
        .bind(small)
        .execute(&pool)
        .await
        .unwrap();

    cancel_order(&pool, order.id, customer_id).await.unwrap();
    assert_eq!(product_stock(&pool, shirt).await, 0);
}

#[tokio::test]
#[ignore = "Requires migrated database"]
async fn test_generate_refuses_combo_component() {
    let pool = database().await;
    let mug = product(&pool, 4).await;
    combo(&pool, &[(mug, 1)]).await;
    sqlx::query("INSERT INTO shop.variant_option (product_id, name, \"values\") VALUES ($1, 'Kleur', ARRAY['Wit', 'Zwart'])")
        .bind(mug)
        .execute(&pool)
        .await
        .unwrap();

    let err = generate_inventory(&pool, mug).await.unwrap_err();
    assert!(
        matches!(
            &err,
            InventoryError::Repository(RepositoryError::Conflict(message))
                if message == "products with variants cannot be part of a combo"
        ),
        "unexpected error: {err}"
    );

    let variants: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM shop.variant WHERE product_id = $1")
        .bind(mug)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(variants, 0);
}
