//! Validation rules for the financial model.
//!
//! Pure predicate functions: each checks one data fragment and returns a
//! structured pass/fail with error and warning messages. The state container
//! treats `is_valid` as the only control-flow signal and joins messages for
//! display; it never inspects their content.

use crate::core::model::{Dataset, FixedCost, LaborEntry, MenuItem, SalesModel, Utility};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Outcome of one validation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub is_valid: bool,
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
}

impl ValidationOutcome {
    /// A passing outcome with no messages.
    #[must_use]
    pub fn pass() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    fn error(&mut self, message: impl Into<String>) {
        self.is_valid = false;
        self.errors.push(message.into());
    }

    fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    /// Folds another outcome into this one, prefixing its messages.
    pub fn absorb(&mut self, prefix: &str, other: Self) {
        if !other.is_valid {
            self.is_valid = false;
        }
        self.errors
            .extend(other.errors.into_iter().map(|m| format!("{prefix}: {m}")));
        self.warnings
            .extend(other.warnings.into_iter().map(|m| format!("{prefix}: {m}")));
    }
}

/// Validates one menu item and its bill of materials.
#[must_use]
pub fn validate_menu_item(item: &MenuItem) -> ValidationOutcome {
    let mut outcome = ValidationOutcome::pass();

    if item.id.trim().is_empty() {
        outcome.error("menu item id must not be empty");
    }
    if item.name.trim().is_empty() {
        outcome.error("menu item name must not be empty");
    }
    if item.price <= Decimal::ZERO {
        outcome.error("price must be greater than zero");
    }
    for (idx, ingredient) in item.ingredients.iter().enumerate() {
        if ingredient.name.trim().is_empty() {
            outcome.error(format!("ingredient #{} has no name", idx + 1));
        }
        if ingredient.quantity <= Decimal::ZERO {
            outcome.error(format!(
                "ingredient '{}' quantity must be greater than zero",
                ingredient.name
            ));
        }
        if ingredient.unit_cost < Decimal::ZERO {
            outcome.error(format!(
                "ingredient '{}' unit cost must not be negative",
                ingredient.name
            ));
        }
    }

    if item.ingredients.is_empty() {
        outcome.warn("no ingredients: item carries no food cost");
    } else if outcome.is_valid && item.ingredient_cost() >= item.price {
        outcome.warn("ingredient cost meets or exceeds price: negative contribution margin");
    }

    outcome
}

/// Validates the sales forecast.
#[must_use]
pub fn validate_sales_model(sales: &SalesModel) -> ValidationOutcome {
    let mut outcome = ValidationOutcome::pass();

    if sales.days_open_per_month == 0 || sales.days_open_per_month > 31 {
        outcome.error("days open per month must be between 1 and 31");
    }
    for row in &sales.daily_sales {
        if row.menu_id.trim().is_empty() {
            outcome.error("sales row references an empty menu id");
        }
        if row.units_per_day < Decimal::ZERO {
            outcome.error(format!(
                "units per day for '{}' must not be negative",
                row.menu_id
            ));
        }
    }
    if sales.daily_sales.is_empty() {
        outcome.warn("no sales rows: forecast revenue is zero");
    }

    outcome
}

/// Validates one utility cost line.
#[must_use]
pub fn validate_utility(utility: &Utility) -> ValidationOutcome {
    let mut outcome = ValidationOutcome::pass();

    if utility.name.trim().is_empty() {
        outcome.error("utility name must not be empty");
    }
    if utility.monthly_cost < Decimal::ZERO {
        outcome.error("monthly cost must not be negative");
    } else if utility.monthly_cost == Decimal::ZERO {
        outcome.warn("monthly cost is zero");
    }

    outcome
}

/// Validates one labor line.
#[must_use]
pub fn validate_labor_entry(entry: &LaborEntry) -> ValidationOutcome {
    let mut outcome = ValidationOutcome::pass();

    if entry.role.trim().is_empty() {
        outcome.error("role must not be empty");
    }
    if entry.hourly_wage <= Decimal::ZERO {
        outcome.error("hourly wage must be greater than zero");
    }
    if entry.hours_per_day <= Decimal::ZERO || entry.hours_per_day > Decimal::from(24) {
        outcome.error("hours per day must be within (0, 24]");
    } else if entry.hours_per_day > Decimal::from(12) {
        outcome.warn("shift longer than 12 hours");
    }
    if entry.headcount == 0 {
        outcome.error("headcount must be at least 1");
    }

    outcome
}

/// Validates one fixed cost line.
#[must_use]
pub fn validate_fixed_cost(cost: &FixedCost) -> ValidationOutcome {
    let mut outcome = ValidationOutcome::pass();

    if cost.name.trim().is_empty() {
        outcome.error("fixed cost name must not be empty");
    }
    if cost.monthly_cost < Decimal::ZERO {
        outcome.error("monthly cost must not be negative");
    } else if cost.monthly_cost == Decimal::ZERO {
        outcome.warn("monthly cost is zero");
    }

    outcome
}

/// Validates the whole dataset: every category rule over every element plus
/// cross-checks between the menu and the sales forecast.
#[must_use]
pub fn validate_dataset(dataset: &Dataset) -> ValidationOutcome {
    let mut outcome = ValidationOutcome::pass();

    for (idx, item) in dataset.menu.iter().enumerate() {
        outcome.absorb(
            &format!("menu #{} ({})", idx + 1, item.id),
            validate_menu_item(item),
        );
    }
    outcome.absorb("sales", validate_sales_model(&dataset.sales));
    for (idx, utility) in dataset.utilities.iter().enumerate() {
        outcome.absorb(
            &format!("utility #{} ({})", idx + 1, utility.name),
            validate_utility(utility),
        );
    }
    for (idx, entry) in dataset.labor.iter().enumerate() {
        outcome.absorb(
            &format!("labor #{} ({})", idx + 1, entry.role),
            validate_labor_entry(entry),
        );
    }
    for (idx, cost) in dataset.fixed_costs.iter().enumerate() {
        outcome.absorb(
            &format!("fixed #{} ({})", idx + 1, cost.name),
            validate_fixed_cost(cost),
        );
    }

    // Cross-checks.
    let mut seen = HashSet::new();
    for item in &dataset.menu {
        if !seen.insert(item.id.as_str()) {
            outcome.error(format!("duplicate menu id '{}'", item.id));
        }
    }
    for row in &dataset.sales.daily_sales {
        if dataset.menu_item(&row.menu_id).is_none() {
            outcome.error(format!(
                "sales row references unknown menu id '{}'",
                row.menu_id
            ));
        }
    }
    if dataset.menu.is_empty() {
        outcome.warn("menu is empty");
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::{DailySales, Ingredient};

    fn valid_item() -> MenuItem {
        MenuItem {
            id: "soup".to_string(),
            name: "Soup of the Day".to_string(),
            price: Decimal::new(650, 2),
            ingredients: vec![Ingredient::new(
                "stock",
                Decimal::new(300, 0),
                "ml",
                Decimal::new(1, 3),
            )],
        }
    }

    #[test]
    fn valid_menu_item_passes() {
        let outcome = validate_menu_item(&valid_item());
        assert!(outcome.is_valid);
        assert!(outcome.errors.is_empty());
    }

    #[test]
    fn menu_item_with_zero_price_fails() {
        let mut item = valid_item();
        item.price = Decimal::ZERO;
        let outcome = validate_menu_item(&item);
        assert!(!outcome.is_valid);
        assert!(outcome.errors.iter().any(|m| m.contains("price")));
    }

    #[test]
    fn negative_margin_is_a_warning_not_an_error() {
        let mut item = valid_item();
        item.price = Decimal::new(10, 2);
        let outcome = validate_menu_item(&item);
        assert!(outcome.is_valid);
        assert!(!outcome.warnings.is_empty());
    }

    #[test]
    fn sales_model_rejects_invalid_open_days() {
        let sales = SalesModel {
            days_open_per_month: 0,
            daily_sales: Vec::new(),
        };
        assert!(!validate_sales_model(&sales).is_valid);

        let sales = SalesModel {
            days_open_per_month: 32,
            daily_sales: Vec::new(),
        };
        assert!(!validate_sales_model(&sales).is_valid);
    }

    #[test]
    fn labor_entry_bounds() {
        let entry = LaborEntry {
            role: "server".to_string(),
            hourly_wage: Decimal::new(1500, 2),
            hours_per_day: Decimal::from(25),
            headcount: 1,
        };
        assert!(!validate_labor_entry(&entry).is_valid);

        let entry = LaborEntry {
            hours_per_day: Decimal::from(13),
            ..entry
        };
        let outcome = validate_labor_entry(&entry);
        assert!(outcome.is_valid);
        assert!(!outcome.warnings.is_empty());
    }

    #[test]
    fn dataset_cross_checks_catch_unknown_sales_reference() {
        let mut dataset = Dataset::default();
        dataset.menu.push(valid_item());
        dataset.sales.daily_sales.push(DailySales {
            menu_id: "ghost".to_string(),
            units_per_day: Decimal::from(10),
        });

        let outcome = validate_dataset(&dataset);
        assert!(!outcome.is_valid);
        assert!(outcome.errors.iter().any(|m| m.contains("ghost")));
    }

    #[test]
    fn dataset_cross_checks_catch_duplicate_menu_ids() {
        let mut dataset = Dataset::default();
        dataset.menu.push(valid_item());
        dataset.menu.push(valid_item());

        let outcome = validate_dataset(&dataset);
        assert!(!outcome.is_valid);
        assert!(outcome.errors.iter().any(|m| m.contains("duplicate")));
    }

    #[test]
    fn absorb_prefixes_messages() {
        let mut total = ValidationOutcome::pass();
        let mut inner = ValidationOutcome::pass();
        inner.error("boom");
        total.absorb("menu #1 (soup)", inner);

        assert!(!total.is_valid);
        assert_eq!(total.errors, vec!["menu #1 (soup): boom".to_string()]);
    }
}
