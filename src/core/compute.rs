//! Profitability derivation.
//!
//! A pure function of the dataset and the active scenario: P&L statements
//! (daily and monthly), KPIs (food cost %, labor %, prime cost %,
//! break-even, safety margin), per-item contribution margins, and a
//! condensed projection per scenario. No side effects; zero-revenue
//! datasets yield zero ratios rather than division errors.

use crate::core::model::{Dataset, Scenario, ScenarioMap};
use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Revenue and cost lines over one period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PnlStatement {
    pub revenue: Decimal,
    pub ingredient_cost: Decimal,
    pub labor_cost: Decimal,
    /// Utilities plus fixed costs; prorated per open day in the daily view.
    pub overhead_cost: Decimal,
    pub operating_profit: Decimal,
}

/// Headline profitability indicators, in percent of revenue except the
/// break-even volume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Kpis {
    pub food_cost_pct: f64,
    pub labor_cost_pct: f64,
    pub prime_cost_pct: f64,
    /// Unit volume per day at which contribution covers the daily cost
    /// burden; `None` when the average contribution margin is not positive.
    pub break_even_units_per_day: Option<f64>,
    /// How far the forecast volume sits above break-even, in percent.
    pub safety_margin_pct: Option<f64>,
}

/// Contribution margin of one menu item under the active scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuMargin {
    pub menu_id: String,
    pub name: String,
    pub price: Decimal,
    pub ingredient_cost: Decimal,
    pub contribution_margin: Decimal,
    pub margin_pct: f64,
    pub units_per_day: Decimal,
}

/// Condensed outlook for one scenario, derived alongside the main result so
/// that switching scenarios needs no recomputation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioProjection {
    pub scenario_id: String,
    pub name: String,
    pub monthly_revenue: Decimal,
    pub monthly_profit: Decimal,
    pub prime_cost_pct: f64,
    pub break_even_units_per_day: Option<f64>,
}

/// The full derived result, attributed to the dataset and scenario it was
/// computed under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComputationResult {
    pub computed_at: DateTime<Utc>,
    pub scenario_id: String,
    pub daily: PnlStatement,
    pub monthly: PnlStatement,
    pub kpis: Kpis,
    pub menu_margins: Vec<MenuMargin>,
    pub projections: BTreeMap<String, ScenarioProjection>,
}

/// Daily aggregates for one scenario, the shared intermediate of statements,
/// KPIs, and projections.
struct Aggregates {
    daily_revenue: Decimal,
    daily_ingredient: Decimal,
    daily_labor: Decimal,
    monthly_overhead: Decimal,
    total_units_per_day: Decimal,
    days_open: Decimal,
}

impl Aggregates {
    fn daily_overhead(&self) -> Decimal {
        if self.days_open.is_zero() {
            Decimal::ZERO
        } else {
            self.monthly_overhead / self.days_open
        }
    }

    fn monthly_revenue(&self) -> Decimal {
        self.daily_revenue * self.days_open
    }

    fn monthly_profit(&self) -> Decimal {
        (self.daily_revenue - self.daily_ingredient - self.daily_labor) * self.days_open
            - self.monthly_overhead
    }

    fn prime_cost_pct(&self) -> f64 {
        percent_of(self.daily_ingredient + self.daily_labor, self.daily_revenue)
    }

    /// Daily burden (labor plus prorated overhead) over the average
    /// contribution margin per unit.
    fn break_even_units_per_day(&self) -> Option<f64> {
        if self.total_units_per_day.is_zero() {
            return None;
        }
        let margin_per_unit =
            (self.daily_revenue - self.daily_ingredient) / self.total_units_per_day;
        if margin_per_unit <= Decimal::ZERO {
            return None;
        }
        let burden = self.daily_labor + self.daily_overhead();
        (burden / margin_per_unit).to_f64()
    }
}

fn aggregates(dataset: &Dataset, scenario: &Scenario) -> Aggregates {
    let mut daily_revenue = Decimal::ZERO;
    let mut daily_ingredient = Decimal::ZERO;
    let mut total_units = Decimal::ZERO;

    for item in &dataset.menu {
        let units = dataset.sales.units_for(&item.id) * scenario.sales_multiplier;
        daily_revenue += units * item.price * scenario.price_multiplier;
        daily_ingredient += units * item.ingredient_cost() * scenario.cost_multiplier;
        total_units += units;
    }

    Aggregates {
        daily_revenue,
        daily_ingredient,
        daily_labor: dataset.daily_labor_cost(),
        monthly_overhead: dataset.monthly_utility_cost() + dataset.monthly_fixed_cost(),
        total_units_per_day: total_units,
        days_open: Decimal::from(dataset.sales.days_open_per_month),
    }
}

fn percent_of(part: Decimal, whole: Decimal) -> f64 {
    if whole.is_zero() {
        0.0
    } else {
        (part / whole * Decimal::ONE_HUNDRED)
            .to_f64()
            .unwrap_or(0.0)
    }
}

fn menu_margins(dataset: &Dataset, scenario: &Scenario) -> Vec<MenuMargin> {
    dataset
        .menu
        .iter()
        .map(|item| {
            let price = item.price * scenario.price_multiplier;
            let cost = item.ingredient_cost() * scenario.cost_multiplier;
            let margin = price - cost;
            MenuMargin {
                menu_id: item.id.clone(),
                name: item.name.clone(),
                price,
                ingredient_cost: cost,
                contribution_margin: margin,
                margin_pct: percent_of(margin, price),
                units_per_day: dataset.sales.units_for(&item.id) * scenario.sales_multiplier,
            }
        })
        .collect()
}

fn projection(dataset: &Dataset, scenario: &Scenario) -> ScenarioProjection {
    let agg = aggregates(dataset, scenario);
    ScenarioProjection {
        scenario_id: scenario.id.clone(),
        name: scenario.name.clone(),
        monthly_revenue: agg.monthly_revenue(),
        monthly_profit: agg.monthly_profit(),
        prime_cost_pct: agg.prime_cost_pct(),
        break_even_units_per_day: agg.break_even_units_per_day(),
    }
}

/// Derives the full computation result for the active scenario.
#[must_use]
pub fn derive(dataset: &Dataset, scenarios: &ScenarioMap, active: &Scenario) -> ComputationResult {
    let agg = aggregates(dataset, active);

    let daily_overhead = agg.daily_overhead();
    let daily = PnlStatement {
        revenue: agg.daily_revenue,
        ingredient_cost: agg.daily_ingredient,
        labor_cost: agg.daily_labor,
        overhead_cost: daily_overhead,
        operating_profit: agg.daily_revenue - agg.daily_ingredient - agg.daily_labor
            - daily_overhead,
    };
    let monthly = PnlStatement {
        revenue: agg.monthly_revenue(),
        ingredient_cost: agg.daily_ingredient * agg.days_open,
        labor_cost: agg.daily_labor * agg.days_open,
        overhead_cost: agg.monthly_overhead,
        operating_profit: agg.monthly_profit(),
    };

    let break_even = agg.break_even_units_per_day();
    let safety_margin_pct = break_even.and_then(|bep| {
        let units = agg.total_units_per_day.to_f64()?;
        if units <= 0.0 {
            return None;
        }
        Some((units - bep) / units * 100.0)
    });

    let kpis = Kpis {
        food_cost_pct: percent_of(agg.daily_ingredient, agg.daily_revenue),
        labor_cost_pct: percent_of(agg.daily_labor, agg.daily_revenue),
        prime_cost_pct: agg.prime_cost_pct(),
        break_even_units_per_day: break_even,
        safety_margin_pct,
    };

    ComputationResult {
        computed_at: Utc::now(),
        scenario_id: active.id.clone(),
        daily,
        monthly,
        kpis,
        menu_margins: menu_margins(dataset, active),
        projections: scenarios
            .values()
            .map(|s| (s.id.clone(), projection(dataset, s)))
            .collect(),
    }
}
