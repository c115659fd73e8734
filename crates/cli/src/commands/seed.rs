//! Seed the catalog from a YAML file.
//!
//! The file is parsed and validated before any connection is made. Every
//! entry is then upserted by its natural key (slug, coupon code, partner
//! name), so running the same file twice changes nothing.
//!
//! ```yaml
//! categories:
//!   - name: Koffie
//! products:
//!   - name: Espresso bonen
//!     category: koffie
//!     price: "12.50"
//!     options:
//!       - name: Maling
//!         values: [Hele boon, Fijn]
//!     variant_stock: 20
//! ```
//!
//! See `crates/cli/seed/catalog.yaml` for a complete file.

use std::collections::HashSet;
use std::path::Path;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::PgPool;
use tracing::{error, info, warn};

use jouwwinkel_admin::db::{
    self, CategoryInput, CategoryRepository, ComboInput, ComboRepository, CouponInput,
    CouponRepository, ProductInput, ProductRepository, SettingsRepository, ShippingPartnerInput,
    ShippingPartnerRepository, VariantRepository, VariantUpdate,
};
use jouwwinkel_admin::services::inventory;
use jouwwinkel_core::coupon::{CouponTerms, normalize_code, validate_coupon_terms};
use jouwwinkel_core::models::{ShippingPartner, UiConfig};
use jouwwinkel_core::{
    CategoryId, ComboId, CouponId, DiscountType, Email, ProductId, ShippingPartnerId, Slug,
};

use super::migrate::database_url;

/// Top-level layout of a seed file. Every section is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CatalogFile {
    /// Replaces the stored site settings; omitted fields take their defaults.
    pub settings: Option<UiConfig>,
    pub categories: Vec<CategorySeed>,
    pub products: Vec<ProductSeed>,
    pub combos: Vec<ComboSeed>,
    pub coupons: Vec<CouponSeed>,
    pub shipping_partners: Vec<PartnerSeed>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CategorySeed {
    pub name: String,
    /// Derived from the name when omitted.
    pub slug: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    #[serde(default)]
    pub sort_order: i32,
    #[serde(default = "yes")]
    pub active: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProductSeed {
    pub name: String,
    pub slug: Option<String>,
    /// Category slug.
    pub category: Option<String>,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    pub compare_at_price: Option<Decimal>,
    /// Ignored for products with options; their variants carry the stock.
    #[serde(default)]
    pub stock: i32,
    #[serde(default)]
    pub featured: bool,
    #[serde(default = "yes")]
    pub active: bool,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub options: Vec<OptionSeed>,
    /// Stock given to variants created by this run.
    pub variant_stock: Option<i32>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OptionSeed {
    pub name: String,
    pub values: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ComboSeed {
    pub name: String,
    pub slug: Option<String>,
    #[serde(default)]
    pub description: String,
    pub image_url: Option<String>,
    pub price: Decimal,
    #[serde(default = "yes")]
    pub active: bool,
    pub items: Vec<ComboItemSeed>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ComboItemSeed {
    /// Product slug.
    pub product: String,
    #[serde(default = "one")]
    pub quantity: i32,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CouponSeed {
    pub code: String,
    pub discount_type: DiscountType,
    pub value: Decimal,
    pub min_order_amount: Option<Decimal>,
    pub max_discount: Option<Decimal>,
    pub usage_limit: Option<i32>,
    pub starts_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub description: String,
    #[serde(default = "yes")]
    pub active: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PartnerSeed {
    pub name: String,
    pub tracking_url_template: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    #[serde(default = "yes")]
    pub active: bool,
}

const fn yes() -> bool {
    true
}

const fn one() -> i32 {
    1
}

/// Counts reported after a run.
#[derive(Debug, Default)]
pub struct SeedResult {
    pub created: usize,
    pub updated: usize,
    /// Entry label and the reason it was skipped.
    pub errors: Vec<(String, String)>,
}

impl SeedResult {
    fn record(&mut self, existed: bool) {
        if existed {
            self.updated += 1;
        } else {
            self.created += 1;
        }
    }

    fn fail(&mut self, label: String, err: impl std::fmt::Display) {
        warn!(entry = %label, error = %err, "Seed entry skipped");
        self.errors.push((label, err.to_string()));
    }
}

/// Seed the catalog from a YAML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, fails validation,
/// or the database is unreachable. Individual entries that the database
/// refuses are reported and skipped.
pub async fn catalog(file_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let path = Path::new(file_path);
    if !path.exists() {
        return Err(format!("File not found: {file_path}").into());
    }

    info!(path = %file_path, "Loading catalog from file");

    let content = tokio::fs::read_to_string(path).await?;
    let file: CatalogFile = serde_yaml::from_str(&content)?;

    info!(
        categories = file.categories.len(),
        products = file.products.len(),
        combos = file.combos.len(),
        coupons = file.coupons.len(),
        shipping_partners = file.shipping_partners.len(),
        "Parsed catalog"
    );

    let errors = validate(&file);
    if !errors.is_empty() {
        error!("Catalog validation failed:");
        for err in &errors {
            error!("  - {err}");
        }
        return Err(format!("{} validation errors found", errors.len()).into());
    }

    let database_url = database_url("ADMIN_DATABASE_URL")?;
    let pool = db::create_pool(&database_url).await?;
    info!("Connected to database");

    let result = seed(&pool, &file).await?;

    info!("Seeding complete!");
    info!("  Created: {}", result.created);
    info!("  Updated: {}", result.updated);

    if !result.errors.is_empty() {
        error!("  Errors: {}", result.errors.len());
        for (entry, err) in &result.errors {
            error!("    - {entry}: {err}");
        }
    }

    Ok(())
}

/// Slug given in the file, or one derived from the name.
fn slug_for(slug: Option<&str>, name: &str) -> Result<String, String> {
    match slug {
        Some(s) => Slug::parse(s).map(String::from).map_err(|e| format!("slug '{s}': {e}")),
        None => Slug::from_title(name)
            .map(String::from)
            .map_err(|e| format!("name '{name}' gives no slug: {e}")),
    }
}

fn coupon_terms(seed: &CouponSeed) -> CouponTerms {
    CouponTerms {
        code: normalize_code(&seed.code),
        discount_type: seed.discount_type,
        value: seed.value,
        min_order_amount: seed.min_order_amount,
        max_discount: seed.max_discount,
        usage_limit: seed.usage_limit,
        starts_at: seed.starts_at,
        expires_at: seed.expires_at,
    }
}

/// Check everything that can be checked without a database.
///
/// References to categories and products may point at rows that already
/// exist; those are resolved while seeding.
pub fn validate(file: &CatalogFile) -> Vec<String> {
    let mut errors = Vec::new();

    let mut category_slugs = HashSet::new();
    for category in &file.categories {
        match slug_for(category.slug.as_deref(), &category.name) {
            Ok(slug) => {
                if !category_slugs.insert(slug.clone()) {
                    errors.push(format!("category '{slug}' appears twice"));
                }
            }
            Err(e) => errors.push(format!("category '{}': {e}", category.name)),
        }
    }

    let mut product_slugs = HashSet::new();
    for product in &file.products {
        let label = format!("product '{}'", product.name);
        match slug_for(product.slug.as_deref(), &product.name) {
            Ok(slug) => {
                if !product_slugs.insert(slug.clone()) {
                    errors.push(format!("product '{slug}' appears twice"));
                }
            }
            Err(e) => errors.push(format!("{label}: {e}")),
        }
        if product.price < Decimal::ZERO {
            errors.push(format!("{label}: price must not be negative"));
        }
        if product.compare_at_price.is_some_and(|c| c <= product.price) {
            errors.push(format!("{label}: compare_at_price must be higher than price"));
        }
        if product.stock < 0 || product.variant_stock.is_some_and(|s| s < 0) {
            errors.push(format!("{label}: stock must not be negative"));
        }
        let mut option_names = HashSet::new();
        for option in &product.options {
            if !option_names.insert(option.name.trim().to_lowercase()) {
                errors.push(format!("{label}: option '{}' appears twice", option.name));
            }
            if option.values.iter().all(|v| v.trim().is_empty()) {
                errors.push(format!("{label}: option '{}' has no values", option.name));
            }
        }
    }

    for combo in &file.combos {
        let label = format!("combo '{}'", combo.name);
        if let Err(e) = slug_for(combo.slug.as_deref(), &combo.name) {
            errors.push(format!("{label}: {e}"));
        }
        if combo.price <= Decimal::ZERO {
            errors.push(format!("{label}: price must be positive"));
        }
        if combo.items.is_empty() {
            errors.push(format!("{label}: needs at least one item"));
        }
        for item in &combo.items {
            if !(1..=99).contains(&item.quantity) {
                errors.push(format!("{label}: quantity of '{}' must be 1 to 99", item.product));
            }
        }
    }

    for coupon in &file.coupons {
        if let Err(e) = validate_coupon_terms(&coupon_terms(coupon)) {
            errors.push(format!("coupon '{}': {e}", coupon.code));
        }
    }

    for partner in &file.shipping_partners {
        let label = format!("shipping partner '{}'", partner.name);
        if partner.name.trim().is_empty() {
            errors.push("shipping partner without a name".to_owned());
        }
        if let Some(template) = &partner.tracking_url_template
            && (!template.contains(ShippingPartner::TRACKING_PLACEHOLDER)
                || !(template.starts_with("https://") || template.starts_with("http://")))
        {
            errors.push(format!(
                "{label}: tracking URL must be http(s) and contain {}",
                ShippingPartner::TRACKING_PLACEHOLDER
            ));
        }
        if let Some(email) = &partner.contact_email
            && Email::parse(email).is_err()
        {
            errors.push(format!("{label}: invalid contact email"));
        }
    }

    errors
}

/// Look up a row id by its natural key.
async fn find_id<T: From<i32>>(pool: &PgPool, sql: &str, key: &str) -> Result<Option<T>, sqlx::Error> {
    let id: Option<i32> = sqlx::query_scalar(sql).bind(key).fetch_optional(pool).await?;
    Ok(id.map(T::from))
}

/// Upsert the whole file. Settings first, then categories, products,
/// combos, coupons and shipping partners, so references resolve.
///
/// # Errors
///
/// Returns an error only for failed lookups; refused entries land in
/// [`SeedResult::errors`].
pub async fn seed(pool: &PgPool, file: &CatalogFile) -> Result<SeedResult, Box<dyn std::error::Error>> {
    let mut result = SeedResult::default();

    if let Some(settings) = &file.settings {
        match SettingsRepository::new(pool).save(settings).await {
            Ok(()) => result.updated += 1,
            Err(e) => result.fail("settings".to_owned(), e),
        }
    }

    seed_categories(pool, &file.categories, &mut result).await?;
    seed_products(pool, &file.products, &mut result).await?;
    seed_combos(pool, &file.combos, &mut result).await?;
    seed_coupons(pool, &file.coupons, &mut result).await?;
    seed_partners(pool, &file.shipping_partners, &mut result).await?;

    Ok(result)
}

async fn seed_categories(
    pool: &PgPool,
    categories: &[CategorySeed],
    result: &mut SeedResult,
) -> Result<(), Box<dyn std::error::Error>> {
    let repo = CategoryRepository::new(pool);
    for seed in categories {
        let slug = slug_for(seed.slug.as_deref(), &seed.name)?;
        let input = CategoryInput {
            name: seed.name.trim().to_owned(),
            slug: slug.clone(),
            description: seed.description.clone(),
            image_url: seed.image_url.clone(),
            sort_order: seed.sort_order,
            is_active: seed.active,
        };
        let existing: Option<CategoryId> =
            find_id(pool, "SELECT id FROM shop.category WHERE slug = $1", &slug).await?;
        let saved = match existing {
            Some(id) => repo.update(id, &input).await,
            None => repo.create(&input).await,
        };
        match saved {
            Ok(_) => result.record(existing.is_some()),
            Err(e) => result.fail(format!("category '{slug}'"), e),
        }
    }
    Ok(())
}

async fn seed_products(
    pool: &PgPool,
    products: &[ProductSeed],
    result: &mut SeedResult,
) -> Result<(), Box<dyn std::error::Error>> {
    let repo = ProductRepository::new(pool);
    for seed in products {
        let slug = slug_for(seed.slug.as_deref(), &seed.name)?;
        let label = format!("product '{slug}'");

        let category_id = match &seed.category {
            Some(category) => {
                let found: Option<CategoryId> =
                    find_id(pool, "SELECT id FROM shop.category WHERE slug = $1", category).await?;
                if found.is_none() {
                    result.fail(label, format!("unknown category '{category}'"));
                    continue;
                }
                found
            }
            None => None,
        };

        let input = ProductInput {
            category_id,
            name: seed.name.trim().to_owned(),
            slug: slug.clone(),
            description: seed.description.clone(),
            price: seed.price,
            compare_at_price: seed.compare_at_price,
            stock: if seed.options.is_empty() { seed.stock } else { 0 },
            is_featured: seed.featured,
            is_active: seed.active,
        };
        let existing: Option<ProductId> =
            find_id(pool, "SELECT id FROM shop.product WHERE slug = $1", &slug).await?;
        let saved = match existing {
            Some(id) => repo.update(id, &input).await,
            None => repo.create(&input).await,
        };
        let product = match saved {
            Ok(product) => product,
            Err(e) => {
                result.fail(label, e);
                continue;
            }
        };
        result.record(existing.is_some());

        for url in &seed.images {
            if !product.image_urls.contains(url)
                && let Err(e) = repo.add_image(product.id, url).await
            {
                result.fail(format!("{label} image {url}"), e);
            }
        }

        if !seed.options.is_empty()
            && let Err(e) = sync_variants(pool, product.id, seed).await
        {
            result.fail(format!("{label} variants"), e);
        }
    }
    Ok(())
}

/// Replace changed options, generate the missing variants and stock the
/// new ones.
async fn sync_variants(
    pool: &PgPool,
    product_id: ProductId,
    seed: &ProductSeed,
) -> Result<(), Box<dyn std::error::Error>> {
    let repo = VariantRepository::new(pool);
    let existing = repo.options(product_id).await?;

    for option in &seed.options {
        let name = option.name.trim();
        let values: Vec<String> = option
            .values
            .iter()
            .map(|v| v.trim().to_owned())
            .filter(|v| !v.is_empty())
            .collect();

        match existing.iter().find(|o| o.name.eq_ignore_ascii_case(name)) {
            Some(current) if current.values == values => continue,
            Some(current) => repo.delete_option(product_id, current.id).await?,
            None => {}
        }
        repo.add_option(product_id, name, &values).await?;
    }

    let plan = inventory::generate_inventory(pool, product_id).await?;

    if let Some(stock) = seed.variant_stock
        && !plan.create.is_empty()
    {
        let updates: Vec<VariantUpdate> = repo
            .variants(product_id)
            .await?
            .into_iter()
            .filter(|v| plan.create.contains(&v.option_values))
            .map(|v| VariantUpdate {
                id: v.id,
                sku: v.sku,
                price_override: v.price_override,
                stock,
            })
            .collect();
        inventory::save_variants(pool, product_id, &updates).await?;
    }
    Ok(())
}

async fn seed_combos(
    pool: &PgPool,
    combos: &[ComboSeed],
    result: &mut SeedResult,
) -> Result<(), Box<dyn std::error::Error>> {
    let repo = ComboRepository::new(pool);
    for seed in combos {
        let slug = slug_for(seed.slug.as_deref(), &seed.name)?;
        let label = format!("combo '{slug}'");
        let input = ComboInput {
            name: seed.name.trim().to_owned(),
            slug: slug.clone(),
            description: seed.description.clone(),
            image_url: seed.image_url.clone(),
            price: seed.price,
            is_active: seed.active,
        };
        let existing: Option<ComboId> =
            find_id(pool, "SELECT id FROM shop.combo WHERE slug = $1", &slug).await?;
        let saved = match existing {
            Some(id) => repo.update(id, &input).await,
            None => repo.create(&input).await,
        };
        let combo = match saved {
            Ok(combo) => combo,
            Err(e) => {
                result.fail(label, e);
                continue;
            }
        };
        result.record(existing.is_some());

        for item in &seed.items {
            let product: Option<ProductId> =
                find_id(pool, "SELECT id FROM shop.product WHERE slug = $1", &item.product).await?;
            let Some(product_id) = product else {
                result.fail(format!("{label} item"), format!("unknown product '{}'", item.product));
                continue;
            };
            if let Err(e) = repo.set_item(combo.id, product_id, item.quantity).await {
                result.fail(format!("{label} item '{}'", item.product), e);
            }
        }
    }
    Ok(())
}

async fn seed_coupons(
    pool: &PgPool,
    coupons: &[CouponSeed],
    result: &mut SeedResult,
) -> Result<(), Box<dyn std::error::Error>> {
    let repo = CouponRepository::new(pool);
    for seed in coupons {
        let terms = coupon_terms(seed);
        let code = terms.code.clone();
        let input = CouponInput {
            terms,
            description: seed.description.trim().to_owned(),
            is_active: seed.active,
        };
        let existing: Option<CouponId> =
            find_id(pool, "SELECT id FROM shop.coupon WHERE code = $1", &code).await?;
        let saved = match existing {
            Some(id) => repo.update(id, &input).await,
            None => repo.create(&input).await,
        };
        match saved {
            Ok(_) => result.record(existing.is_some()),
            Err(e) => result.fail(format!("coupon '{code}'"), e),
        }
    }
    Ok(())
}

async fn seed_partners(
    pool: &PgPool,
    partners: &[PartnerSeed],
    result: &mut SeedResult,
) -> Result<(), Box<dyn std::error::Error>> {
    let repo = ShippingPartnerRepository::new(pool);
    for seed in partners {
        let name = seed.name.trim().to_owned();
        let input = ShippingPartnerInput {
            name: name.clone(),
            tracking_url_template: seed.tracking_url_template.clone(),
            contact_email: seed.contact_email.clone(),
            contact_phone: seed.contact_phone.clone(),
            is_active: seed.active,
        };
        let existing: Option<ShippingPartnerId> =
            find_id(pool, "SELECT id FROM shop.shipping_partner WHERE name = $1", &name).await?;
        let saved = match existing {
            Some(id) => repo.update(id, &input).await,
            None => repo.create(&input).await,
        };
        match saved {
            Ok(_) => result.record(existing.is_some()),
            Err(e) => result.fail(format!("shipping partner '{name}'"), e),
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn parse(yaml: &str) -> CatalogFile {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_bundled_seed_file_is_valid() {
        let file = parse(include_str!("../../seed/catalog.yaml"));
        assert!(validate(&file).is_empty(), "{:?}", validate(&file));
        assert!(!file.products.is_empty());
        assert!(file.settings.is_some());
    }

    #[test]
    fn test_defaults_applied() {
        let file = parse(
            r#"
products:
  - name: Thee
    price: "4.95"
combos:
  - name: Proefpakket
    price: "9.00"
    items:
      - product: thee
"#,
        );
        let product = &file.products[0];
        assert!(product.active);
        assert!(!product.featured);
        assert_eq!(product.stock, 0);
        assert_eq!(file.combos[0].items[0].quantity, 1);
        assert!(file.categories.is_empty());
    }

    #[test]
    fn test_unknown_field_rejected() {
        let parsed: Result<CatalogFile, _> = serde_yaml::from_str("products:\n  - name: X\n    prise: 1\n");
        assert!(parsed.is_err());
    }

    #[test]
    fn test_slug_derived_from_name() {
        assert_eq!(slug_for(None, "Crème Brûlée").unwrap(), "creme-brulee");
        assert_eq!(slug_for(Some("thee"), "Anything").unwrap(), "thee");
        assert!(slug_for(Some("Not A Slug"), "x").is_err());
    }

    #[test]
    fn test_validate_reports_each_problem() {
        let file = parse(
            r#"
categories:
  - name: Koffie
  - name: Koffie
products:
  - name: Bonen
    price: "10.00"
    compare_at_price: "9.00"
    options:
      - name: Maat
        values: []
combos:
  - name: Leeg
    price: "0"
    items: []
shipping_partners:
  - name: PostNL
    tracking_url_template: "https://postnl.nl/track"
"#,
        );
        let errors = validate(&file);
        assert!(errors.iter().any(|e| e.contains("'koffie' appears twice")));
        assert!(errors.iter().any(|e| e.contains("compare_at_price")));
        assert!(errors.iter().any(|e| e.contains("has no values")));
        assert!(errors.iter().any(|e| e.contains("price must be positive")));
        assert!(errors.iter().any(|e| e.contains("at least one item")));
        assert!(errors.iter().any(|e| e.contains("tracking URL")));
    }

    #[test]
    fn test_coupon_rules_checked() {
        let file = parse(
            r#"
coupons:
  - code: te-veel
    discount_type: percentage
    value: "150"
"#,
        );
        assert_eq!(coupon_terms(&file.coupons[0]).code, "TE-VEEL");
        let errors = validate(&file);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("coupon 'te-veel'"));
    }

    #[test]
    fn test_partial_settings_keep_defaults() {
        let file = parse("settings:\n  store_name: Bakkerij Jansen\n");
        let settings = file.settings.unwrap();
        assert_eq!(settings.store_name, "Bakkerij Jansen");
        assert_eq!(settings.low_stock_threshold, UiConfig::default().low_stock_threshold);
    }
}
