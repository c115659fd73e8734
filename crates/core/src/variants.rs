//! Variant option combinations.
//!
//! A product with options `Size: S, M` and `Colour: Red, Blue` is sold as
//! four variants, one per combination, each with its own stock. The
//! back-office keeps the variant rows in step with the options through
//! [`plan_inventory_sync`].

use std::collections::HashSet;

use crate::models::{Variant, VariantOption};
use crate::types::VariantId;

/// Upper bound on generated combinations per product.
pub const MAX_COMBINATIONS: usize = 250;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum VariantError {
    #[error("these options produce {count} combinations; the limit is {MAX_COMBINATIONS}")]
    TooManyCombinations { count: usize },
}

/// Split a comma-separated value list, trimming and dropping blanks and
/// case-insensitive duplicates (first spelling wins).
#[must_use]
pub fn normalize_values(raw: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    raw.split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .filter(|v| seen.insert(v.to_lowercase()))
        .map(str::to_owned)
        .collect()
}

/// Every combination of option values, options taken in `position` order.
///
/// No options, or any option without values, yields no combinations.
///
/// # Errors
///
/// Returns [`VariantError::TooManyCombinations`] above [`MAX_COMBINATIONS`].
pub fn enumerate_combinations(options: &[VariantOption]) -> Result<Vec<Vec<String>>, VariantError> {
    if options.is_empty() || options.iter().any(|o| o.values.is_empty()) {
        return Ok(Vec::new());
    }

    let count = options
        .iter()
        .try_fold(1usize, |acc, o| acc.checked_mul(o.values.len()))
        .unwrap_or(usize::MAX);
    if count > MAX_COMBINATIONS {
        return Err(VariantError::TooManyCombinations { count });
    }

    let mut ordered: Vec<&VariantOption> = options.iter().collect();
    ordered.sort_by_key(|o| o.position);

    let mut combos: Vec<Vec<String>> = vec![Vec::new()];
    for option in ordered {
        combos = combos
            .into_iter()
            .flat_map(|prefix| {
                option.values.iter().map(move |value| {
                    let mut next = prefix.clone();
                    next.push(value.clone());
                    next
                })
            })
            .collect();
    }
    Ok(combos)
}

/// Display label such as `M / Red`.
#[must_use]
pub fn combination_label(values: &[String]) -> String {
    values.join(" / ")
}

/// What to change so the variant rows match the options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InventoryPlan {
    /// New combinations, to be created with zero stock.
    pub create: Vec<Vec<String>>,
    /// Existing rows that still match a combination; stock and price survive.
    pub keep: Vec<VariantId>,
    /// Rows whose combination no longer exists.
    pub remove: Vec<VariantId>,
}

impl InventoryPlan {
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.create.is_empty() && self.remove.is_empty()
    }

    /// Whether the product has variants once the plan is applied.
    #[must_use]
    pub fn leaves_variants(&self) -> bool {
        !self.create.is_empty() || !self.keep.is_empty()
    }
}

/// Diff the wanted combinations against existing variant rows.
///
/// Value matching is case-insensitive so renaming `red` to `Red` keeps
/// the stock. Duplicate rows for one combination keep the first.
///
/// # Errors
///
/// Propagates [`VariantError`] from [`enumerate_combinations`].
pub fn plan_inventory_sync(
    options: &[VariantOption],
    existing: &[Variant],
) -> Result<InventoryPlan, VariantError> {
    let wanted = enumerate_combinations(options)?;
    let key = |values: &[String]| -> Vec<String> { values.iter().map(|v| v.to_lowercase()).collect() };

    let wanted_keys: HashSet<Vec<String>> = wanted.iter().map(|w| key(w.as_slice())).collect();
    let mut plan = InventoryPlan::default();
    let mut covered = HashSet::new();

    for variant in existing {
        let k = key(variant.option_values.as_slice());
        if wanted_keys.contains(&k) && covered.insert(k) {
            plan.keep.push(variant.id);
        } else {
            plan.remove.push(variant.id);
        }
    }

    plan.create = wanted
        .into_iter()
        .filter(|w| !covered.contains(&key(w.as_slice())))
        .collect();

    Ok(plan)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::{ProductId, VariantOptionId};

    fn option(name: &str, values: &str, position: i32) -> VariantOption {
        VariantOption {
            id: VariantOptionId::new(position),
            product_id: ProductId::new(1),
            name: name.to_owned(),
            values: normalize_values(values),
            position,
        }
    }

    fn variant(id: i32, values: &[&str]) -> Variant {
        Variant {
            id: VariantId::new(id),
            product_id: ProductId::new(1),
            option_values: values.iter().map(|v| (*v).to_owned()).collect(),
            sku: None,
            price_override: None,
            stock: 5,
        }
    }

    #[test]
    fn test_normalize_values() {
        assert_eq!(
            normalize_values(" S, M ,, m, L ,"),
            vec!["S".to_owned(), "M".to_owned(), "L".to_owned()]
        );
        assert!(normalize_values(" , ").is_empty());
    }

    #[test]
    fn test_cartesian_product_in_position_order() {
        let options = [option("Colour", "Red, Blue", 2), option("Size", "S, M", 1)];
        let combos = enumerate_combinations(&options).unwrap();
        let labels: Vec<String> = combos.iter().map(|c| combination_label(c.as_slice())).collect();
        assert_eq!(labels, ["S / Red", "S / Blue", "M / Red", "M / Blue"]);
    }

    #[test]
    fn test_empty_inputs() {
        assert!(enumerate_combinations(&[]).unwrap().is_empty());
        let options = [option("Size", "S, M", 1), option("Colour", "", 2)];
        assert!(enumerate_combinations(&options).unwrap().is_empty());
    }

    #[test]
    fn test_combination_limit() {
        let many: Vec<String> = (0..16).map(|i| i.to_string()).collect();
        let options = [
            option("A", &many.join(","), 1),
            option("B", &many.join(","), 2),
        ];
        assert_eq!(
            enumerate_combinations(&options),
            Err(VariantError::TooManyCombinations { count: 256 })
        );
    }

    #[test]
    fn test_sync_keeps_creates_and_removes() {
        let options = [option("Size", "S, M, L", 1)];
        let existing = [variant(1, &["s"]), variant(2, &["XL"]), variant(3, &["M"])];
        let plan = plan_inventory_sync(&options, &existing).unwrap();
        assert_eq!(plan.keep, vec![VariantId::new(1), VariantId::new(3)]);
        assert_eq!(plan.remove, vec![VariantId::new(2)]);
        assert_eq!(plan.create, vec![vec!["L".to_owned()]]);
        assert!(!plan.is_noop());
    }

    #[test]
    fn test_sync_removes_duplicates_and_everything_without_options() {
        let existing = [variant(1, &["S"]), variant(2, &["S"])];
        let plan = plan_inventory_sync(&[option("Size", "S", 1)], &existing).unwrap();
        assert_eq!(plan.keep, vec![VariantId::new(1)]);
        assert_eq!(plan.remove, vec![VariantId::new(2)]);

        let cleared = plan_inventory_sync(&[], &existing).unwrap();
        assert!(cleared.keep.is_empty());
        assert_eq!(cleared.remove.len(), 2);
        assert!(!cleared.leaves_variants());
    }

    #[test]
    fn test_leaves_variants() {
        let fresh = plan_inventory_sync(&[option("Size", "S, M", 1)], &[]).unwrap();
        assert!(fresh.leaves_variants());

        let kept = plan_inventory_sync(&[option("Size", "S", 1)], &[variant(1, &["S"])]).unwrap();
        assert!(kept.is_noop());
        assert!(kept.leaves_variants());

        assert!(!plan_inventory_sync(&[], &[]).unwrap().leaves_variants());
    }

    #[test]
    fn test_sync_is_noop_when_in_step() {
        let options = [option("Size", "S, M", 1)];
        let existing = [variant(1, &["S"]), variant(2, &["M"])];
        assert!(plan_inventory_sync(&options, &existing).unwrap().is_noop());
    }
}
