//! Financial dataset types.
//!
//! The dataset is the single source the engine computes from: the menu with
//! its bills of materials, the sales forecast, and the cost structure
//! (labor, utilities, fixed costs). Scenarios parameterize the forecast
//! without altering the base dataset.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Venue-level metadata carried alongside the financial model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub venue_name: String,
    /// ISO 4217 currency code; display-only, no conversion is performed.
    pub currency: String,
    #[serde(default)]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Metadata {
    #[must_use]
    pub fn new(venue_name: impl Into<String>, currency: impl Into<String>) -> Self {
        Self {
            venue_name: venue_name.into(),
            currency: currency.into(),
            notes: None,
            created_at: Utc::now(),
        }
    }
}

/// One ingredient line in a menu item's bill of materials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ingredient {
    pub name: String,
    pub quantity: Decimal,
    /// Unit of measure for the quantity (g, ml, pcs, ...).
    pub unit: String,
    /// Cost per unit of measure.
    pub unit_cost: Decimal,
}

impl Ingredient {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        quantity: Decimal,
        unit: impl Into<String>,
        unit_cost: Decimal,
    ) -> Self {
        Self {
            name: name.into(),
            quantity,
            unit: unit.into(),
            unit_cost,
        }
    }

    /// Cost contributed by this line: quantity × unit cost.
    #[must_use]
    pub fn line_cost(&self) -> Decimal {
        self.quantity * self.unit_cost
    }
}

/// A sellable menu item with its selling price and BOM.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItem {
    /// Caller-chosen identifier, unique within the menu.
    pub id: String,
    pub name: String,
    pub price: Decimal,
    #[serde(default)]
    pub ingredients: Vec<Ingredient>,
}

impl MenuItem {
    /// Total ingredient cost of one unit, before scenario adjustment.
    #[must_use]
    pub fn ingredient_cost(&self) -> Decimal {
        self.ingredients.iter().map(Ingredient::line_cost).sum()
    }

    /// Returns a copy with the patch fields applied over the current values.
    #[must_use]
    pub fn merged(&self, patch: &MenuItemUpdate) -> Self {
        let mut item = self.clone();
        if let Some(name) = &patch.name {
            item.name.clone_from(name);
        }
        if let Some(price) = patch.price {
            item.price = price;
        }
        if let Some(ingredients) = &patch.ingredients {
            item.ingredients.clone_from(ingredients);
        }
        item
    }
}

/// Partial update for a menu item; `None` fields keep the current value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItemUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub ingredients: Option<Vec<Ingredient>>,
}

/// Forecast units sold per day for one menu item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailySales {
    pub menu_id: String,
    pub units_per_day: Decimal,
}

/// Sales forecast: open days per month plus per-item daily volumes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesModel {
    pub days_open_per_month: u32,
    #[serde(default)]
    pub daily_sales: Vec<DailySales>,
}

impl Default for SalesModel {
    fn default() -> Self {
        Self {
            days_open_per_month: 26,
            daily_sales: Vec::new(),
        }
    }
}

impl SalesModel {
    /// Forecast daily units for one menu item (zero when absent).
    #[must_use]
    pub fn units_for(&self, menu_id: &str) -> Decimal {
        self.daily_sales
            .iter()
            .filter(|row| row.menu_id == menu_id)
            .map(|row| row.units_per_day)
            .sum()
    }

    /// Returns a copy with the patch fields applied over the current values.
    #[must_use]
    pub fn merged(&self, patch: &SalesModelUpdate) -> Self {
        let mut sales = self.clone();
        if let Some(days) = patch.days_open_per_month {
            sales.days_open_per_month = days;
        }
        if let Some(rows) = &patch.daily_sales {
            sales.daily_sales.clone_from(rows);
        }
        sales
    }
}

/// Partial update for the sales model; `None` fields keep the current value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesModelUpdate {
    #[serde(default)]
    pub days_open_per_month: Option<u32>,
    #[serde(default)]
    pub daily_sales: Option<Vec<DailySales>>,
}

/// A recurring utility cost (power, water, connectivity).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utility {
    pub name: String,
    pub monthly_cost: Decimal,
}

/// One staffing line: role, wage, and scheduled hours.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaborEntry {
    pub role: String,
    pub hourly_wage: Decimal,
    pub hours_per_day: Decimal,
    pub headcount: u32,
}

impl LaborEntry {
    /// Daily cost of this line: wage × hours × headcount.
    #[must_use]
    pub fn daily_cost(&self) -> Decimal {
        self.hourly_wage * self.hours_per_day * Decimal::from(self.headcount)
    }
}

/// A fixed monthly cost (rent, insurance, licenses).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixedCost {
    pub name: String,
    pub monthly_cost: Decimal,
}

/// The full financial model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dataset {
    pub metadata: Metadata,
    #[serde(default)]
    pub menu: Vec<MenuItem>,
    #[serde(default)]
    pub sales: SalesModel,
    #[serde(default)]
    pub utilities: Vec<Utility>,
    #[serde(default)]
    pub labor: Vec<LaborEntry>,
    #[serde(default)]
    pub fixed_costs: Vec<FixedCost>,
}

impl Default for Dataset {
    fn default() -> Self {
        Self {
            metadata: Metadata::new("", "USD"),
            menu: Vec::new(),
            sales: SalesModel::default(),
            utilities: Vec::new(),
            labor: Vec::new(),
            fixed_costs: Vec::new(),
        }
    }
}

impl Dataset {
    /// Looks up a menu item by id.
    #[must_use]
    pub fn menu_item(&self, id: &str) -> Option<&MenuItem> {
        self.menu.iter().find(|item| item.id == id)
    }

    /// Total daily labor cost across all staffing lines.
    #[must_use]
    pub fn daily_labor_cost(&self) -> Decimal {
        self.labor.iter().map(LaborEntry::daily_cost).sum()
    }

    /// Total monthly utility cost.
    #[must_use]
    pub fn monthly_utility_cost(&self) -> Decimal {
        self.utilities.iter().map(|u| u.monthly_cost).sum()
    }

    /// Total monthly fixed cost.
    #[must_use]
    pub fn monthly_fixed_cost(&self) -> Decimal {
        self.fixed_costs.iter().map(|f| f.monthly_cost).sum()
    }
}

/// A named alternate parameterization of the forecast.
///
/// Multipliers apply at computation time; the base dataset is never altered
/// by switching scenarios.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Scales forecast unit volumes.
    pub sales_multiplier: Decimal,
    /// Scales menu selling prices.
    pub price_multiplier: Decimal,
    /// Scales ingredient costs.
    pub cost_multiplier: Decimal,
}

impl Scenario {
    /// The neutral scenario every dataset starts from.
    #[must_use]
    pub fn base() -> Self {
        Self {
            id: "base".to_string(),
            name: "Base".to_string(),
            description: None,
            sales_multiplier: Decimal::ONE,
            price_multiplier: Decimal::ONE,
            cost_multiplier: Decimal::ONE,
        }
    }
}

/// Ordered scenario map keyed by scenario id.
pub type ScenarioMap = BTreeMap<String, Scenario>;

#[cfg(test)]
mod tests {
    use super::*;

    fn burger() -> MenuItem {
        MenuItem {
            id: "burger".to_string(),
            name: "Burger".to_string(),
            price: Decimal::new(1250, 2),
            ingredients: vec![
                Ingredient::new("bun", Decimal::ONE, "pcs", Decimal::new(80, 2)),
                Ingredient::new("patty", Decimal::new(180, 0), "g", Decimal::new(2, 2)),
            ],
        }
    }

    #[test]
    fn ingredient_cost_sums_line_costs() {
        // 1 * 0.80 + 180 * 0.02 = 4.40
        assert_eq!(burger().ingredient_cost(), Decimal::new(440, 2));
    }

    #[test]
    fn merged_patch_overrides_only_given_fields() {
        let item = burger();
        let patch = MenuItemUpdate {
            price: Some(Decimal::new(1390, 2)),
            ..Default::default()
        };
        let merged = item.merged(&patch);

        assert_eq!(merged.price, Decimal::new(1390, 2));
        assert_eq!(merged.name, item.name);
        assert_eq!(merged.ingredients, item.ingredients);
    }

    #[test]
    fn sales_units_for_missing_item_is_zero() {
        let sales = SalesModel::default();
        assert_eq!(sales.units_for("burger"), Decimal::ZERO);
    }

    #[test]
    fn labor_daily_cost() {
        let line = LaborEntry {
            role: "cook".to_string(),
            hourly_wage: Decimal::new(1800, 2),
            hours_per_day: Decimal::new(8, 0),
            headcount: 2,
        };
        assert_eq!(line.daily_cost(), Decimal::new(288, 0));
    }

    #[test]
    fn dataset_round_trips_through_json() {
        let mut dataset = Dataset::default();
        dataset.menu.push(burger());
        let json = serde_json::to_string(&dataset).expect("serialize");
        let restored: Dataset = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(restored, dataset);
    }
}
