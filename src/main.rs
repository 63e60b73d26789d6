//! prixfixe CLI entrypoint.

use clap::Parser;
use prixfixe::cli::commands::{
    Cli, Commands, ExportArgs, ImportArgs, ListCommands, ListSetArgs, MenuCommands, MenuSetArgs,
    MenuShowArgs, ResetArgs, SalesCommands, SalesSetArgs, ScenarioCommands, ScenarioUseArgs,
};
use prixfixe::cli::output::{create_table, output, output_error, OutputFormat};
use prixfixe::core::compute::ComputationResult;
use prixfixe::core::error::{ExitCode, PlannerError, Result};
use prixfixe::core::manager::StateManager;
use prixfixe::core::model::{
    DailySales, Dataset, FixedCost, LaborEntry, MenuItemUpdate, SalesModelUpdate, Utility,
};
use prixfixe::storage::kv_store::FileKvStore;
use rust_decimal::Decimal;
use std::path::PathBuf;
use std::process;
use std::str::FromStr;
use std::sync::Arc;

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let data_dir = resolve_data_dir(cli.data_dir.clone());
    let store = match FileKvStore::open(data_dir) {
        Ok(store) => Arc::new(store),
        Err(err) => {
            let err = PlannerError::storage("open_failed", err.to_string(), "cli:main")
                .with_hint("Is another prixfixe process using the same data directory?");
            process::exit(i32::from(output_error(&err, cli.format)));
        }
    };

    let mut manager = StateManager::new(store);
    let exit = match run_command(&mut manager, cli.command, cli.format) {
        Ok(()) => ExitCode::Success,
        Err(err) => output_error(&err, cli.format),
    };
    process::exit(i32::from(exit));
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "prixfixe=debug" } else { "prixfixe=warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn resolve_data_dir(flag: Option<PathBuf>) -> PathBuf {
    if let Some(dir) = flag {
        return dir;
    }
    if let Ok(dir) = std::env::var("PRIXFIXE_DATA_DIR") {
        return PathBuf::from(dir);
    }
    dirs::home_dir().map_or_else(|| PathBuf::from(".prixfixe"), |home| home.join(".prixfixe"))
}

fn run_command(manager: &mut StateManager, command: Commands, format: OutputFormat) -> Result<()> {
    match command {
        Commands::Summary => summary(manager, format),
        Commands::Menu(cmd) => match cmd {
            MenuCommands::List => menu_list(manager, format),
            MenuCommands::Show(MenuShowArgs { id }) => menu_show(manager, &id, format),
            MenuCommands::Set(args) => menu_set(manager, args, format),
        },
        Commands::Sales(cmd) => match cmd {
            SalesCommands::Show => emit(&manager.data().sales, format),
            SalesCommands::Set(args) => sales_set(manager, args, format),
        },
        Commands::Utilities(cmd) => match cmd {
            ListCommands::List => emit(&manager.data().utilities, format),
            ListCommands::Set(ListSetArgs { file }) => {
                let items: Vec<Utility> = read_json_file(&file)?;
                manager.update_utilities(items);
                mutation_outcome(manager, "utilities")?;
                emit(&manager.data().utilities, format)
            }
        },
        Commands::Labor(cmd) => match cmd {
            ListCommands::List => emit(&manager.data().labor, format),
            ListCommands::Set(ListSetArgs { file }) => {
                let items: Vec<LaborEntry> = read_json_file(&file)?;
                manager.update_labor(items);
                mutation_outcome(manager, "labor")?;
                emit(&manager.data().labor, format)
            }
        },
        Commands::Fixed(cmd) => match cmd {
            ListCommands::List => emit(&manager.data().fixed_costs, format),
            ListCommands::Set(ListSetArgs { file }) => {
                let items: Vec<FixedCost> = read_json_file(&file)?;
                manager.update_fixed_costs(items);
                mutation_outcome(manager, "fixed")?;
                emit(&manager.data().fixed_costs, format)
            }
        },
        Commands::Scenario(cmd) => match cmd {
            ScenarioCommands::List => scenario_list(manager, format),
            ScenarioCommands::Use(ScenarioUseArgs { id }) => scenario_use(manager, &id, format),
        },
        Commands::Validate => emit(&manager.validation_results(), format),
        Commands::Import(ImportArgs { file }) => import(manager, &file, format),
        Commands::Export(args) => export(manager, args),
        Commands::Reset(args) => reset(manager, args, format),
    }
}

/// Converts a pipeline failure (observable only via the container's error
/// state) into a CLI error. Mutations clear the error on entry, so a set
/// error here belongs to this operation.
fn mutation_outcome(manager: &StateManager, op: &str) -> Result<()> {
    match manager.error() {
        Some(message) => Err(PlannerError::validation(
            "update_rejected",
            message,
            format!("cli:{op}"),
        )),
        None => Ok(()),
    }
}

fn read_json_file<T: serde::de::DeserializeOwned>(path: &PathBuf) -> Result<T> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        PlannerError::system(
            "read_failed",
            format!("cannot read {}: {e}", path.display()),
            "cli:read_json_file",
        )
    })?;
    serde_json::from_str(&text).map_err(|e| {
        PlannerError::user(
            "invalid_payload",
            format!("{}: {e}", path.display()),
            "cli:read_json_file",
        )
    })
}

fn emit<T: serde::Serialize>(data: &T, format: OutputFormat) -> Result<()> {
    output(data, format)
        .map_err(|e| PlannerError::system("output_failed", e.to_string(), "cli:emit"))
}

fn require_computation<'a>(manager: &'a StateManager) -> Result<&'a ComputationResult> {
    manager.computation_result().ok_or_else(|| {
        let reason = manager
            .error()
            .unwrap_or("no computation result available")
            .to_string();
        PlannerError::computation("no_result", reason, "cli:summary")
    })
}

fn money(amount: Decimal) -> String {
    format!("{}", amount.round_dp(2))
}

fn percent(value: f64) -> String {
    format!("{value:.1}%")
}

fn summary(manager: &StateManager, format: OutputFormat) -> Result<()> {
    let result = require_computation(manager)?;
    if format != OutputFormat::Table {
        return emit(result, format);
    }

    let dataset = manager.data();
    let scenario = manager
        .current_scenario()
        .map_or_else(|| result.scenario_id.clone(), |s| s.name.clone());
    println!(
        "{} ({}) - scenario: {scenario}",
        dataset.metadata.venue_name, dataset.metadata.currency
    );

    let mut pnl = create_table(&["", "Daily", "Monthly"]);
    for (label, daily, monthly) in [
        ("Revenue", result.daily.revenue, result.monthly.revenue),
        (
            "Ingredients",
            result.daily.ingredient_cost,
            result.monthly.ingredient_cost,
        ),
        ("Labor", result.daily.labor_cost, result.monthly.labor_cost),
        (
            "Overhead",
            result.daily.overhead_cost,
            result.monthly.overhead_cost,
        ),
        (
            "Operating profit",
            result.daily.operating_profit,
            result.monthly.operating_profit,
        ),
    ] {
        pnl.add_row(vec![label.to_string(), money(daily), money(monthly)]);
    }
    println!("{pnl}");

    let mut kpis = create_table(&["KPI", "Value"]);
    kpis.add_row(vec![
        "Food cost".to_string(),
        percent(result.kpis.food_cost_pct),
    ]);
    kpis.add_row(vec![
        "Labor cost".to_string(),
        percent(result.kpis.labor_cost_pct),
    ]);
    kpis.add_row(vec![
        "Prime cost".to_string(),
        percent(result.kpis.prime_cost_pct),
    ]);
    kpis.add_row(vec![
        "Break-even units/day".to_string(),
        result
            .kpis
            .break_even_units_per_day
            .map_or_else(|| "n/a".to_string(), |v| format!("{v:.1}")),
    ]);
    kpis.add_row(vec![
        "Safety margin".to_string(),
        result
            .kpis
            .safety_margin_pct
            .map_or_else(|| "n/a".to_string(), percent),
    ]);
    println!("{kpis}");

    let mut projections = create_table(&[
        "Scenario",
        "Monthly revenue",
        "Monthly profit",
        "Prime cost",
    ]);
    for projection in result.projections.values() {
        projections.add_row(vec![
            projection.name.clone(),
            money(projection.monthly_revenue),
            money(projection.monthly_profit),
            percent(projection.prime_cost_pct),
        ]);
    }
    println!("{projections}");
    Ok(())
}

fn menu_list(manager: &StateManager, format: OutputFormat) -> Result<()> {
    let result = require_computation(manager)?;
    if format != OutputFormat::Table {
        return emit(&result.menu_margins, format);
    }

    let mut table = create_table(&["Id", "Name", "Price", "Cost", "Margin", "Margin %", "Units/day"]);
    for margin in &result.menu_margins {
        table.add_row(vec![
            margin.menu_id.clone(),
            margin.name.clone(),
            money(margin.price),
            money(margin.ingredient_cost),
            money(margin.contribution_margin),
            percent(margin.margin_pct),
            format!("{}", margin.units_per_day.round_dp(1)),
        ]);
    }
    println!("{table}");
    Ok(())
}

fn menu_show(manager: &StateManager, id: &str, format: OutputFormat) -> Result<()> {
    let item = manager.data().menu_item(id).ok_or_else(|| {
        PlannerError::user(
            "menu_item_not_found",
            format!("menu item '{id}' not found"),
            "cli:menu_show",
        )
        .with_hint("Run `prixfixe menu list` to see known items")
    })?;
    if format != OutputFormat::Table {
        return emit(item, format);
    }

    println!("{} ({}) - price {}", item.name, item.id, money(item.price));
    let mut bom = create_table(&["Ingredient", "Quantity", "Unit", "Unit cost", "Line cost"]);
    for ingredient in &item.ingredients {
        bom.add_row(vec![
            ingredient.name.clone(),
            format!("{}", ingredient.quantity),
            ingredient.unit.clone(),
            format!("{}", ingredient.unit_cost),
            money(ingredient.line_cost()),
        ]);
    }
    println!("{bom}");
    println!("Total ingredient cost: {}", money(item.ingredient_cost()));
    Ok(())
}

fn menu_set(manager: &mut StateManager, args: MenuSetArgs, format: OutputFormat) -> Result<()> {
    let ingredients = match &args.ingredients {
        Some(path) => Some(read_json_file(path)?),
        None => None,
    };
    let updates = MenuItemUpdate {
        name: args.name,
        price: args.price,
        ingredients,
    };

    manager.update_menu(&args.id, &updates);
    mutation_outcome(manager, "menu")?;
    match manager.data().menu_item(&args.id) {
        Some(item) => emit(item, format),
        None => Ok(()),
    }
}

fn sales_set(manager: &mut StateManager, args: SalesSetArgs, format: OutputFormat) -> Result<()> {
    let daily_sales = if args.units.is_empty() {
        None
    } else {
        Some(parse_units(&args.units)?)
    };
    let updates = SalesModelUpdate {
        days_open_per_month: args.days_open,
        daily_sales,
    };

    manager.update_sales_model(&updates);
    mutation_outcome(manager, "sales")?;
    emit(&manager.data().sales, format)
}

fn parse_units(pairs: &[String]) -> Result<Vec<DailySales>> {
    pairs
        .iter()
        .map(|pair| {
            let (menu_id, units) = pair.split_once('=').ok_or_else(|| {
                PlannerError::user(
                    "invalid_units",
                    format!("expected MENU_ID=UNITS, got '{pair}'"),
                    "cli:sales_set",
                )
            })?;
            let units_per_day = Decimal::from_str(units).map_err(|e| {
                PlannerError::user(
                    "invalid_units",
                    format!("'{units}' is not a number: {e}"),
                    "cli:sales_set",
                )
            })?;
            Ok(DailySales {
                menu_id: menu_id.to_string(),
                units_per_day,
            })
        })
        .collect()
}

fn scenario_list(manager: &StateManager, format: OutputFormat) -> Result<()> {
    if format != OutputFormat::Table {
        return emit(manager.scenarios(), format);
    }

    let mut table = create_table(&["", "Id", "Name", "Sales ×", "Price ×", "Cost ×"]);
    for scenario in manager.scenarios().values() {
        let marker = if scenario.id == manager.current_scenario_id() {
            "*"
        } else {
            ""
        };
        table.add_row(vec![
            marker.to_string(),
            scenario.id.clone(),
            scenario.name.clone(),
            format!("{}", scenario.sales_multiplier),
            format!("{}", scenario.price_multiplier),
            format!("{}", scenario.cost_multiplier),
        ]);
    }
    println!("{table}");
    Ok(())
}

fn scenario_use(manager: &mut StateManager, id: &str, format: OutputFormat) -> Result<()> {
    manager.set_current_scenario(id);
    if let Some(message) = manager.error() {
        return Err(PlannerError::user(
            "scenario_not_found",
            message,
            "cli:scenario_use",
        )
        .with_hint("Run `prixfixe scenario list` to see known scenarios"));
    }

    // The last computation already carries a projection for every scenario.
    match manager
        .computation_result()
        .and_then(|result| result.projections.get(id))
    {
        Some(projection) => emit(projection, format),
        None => Ok(()),
    }
}

fn import(manager: &mut StateManager, file: &PathBuf, format: OutputFormat) -> Result<()> {
    let text = std::fs::read_to_string(file).map_err(|e| {
        PlannerError::system(
            "read_failed",
            format!("cannot read {}: {e}", file.display()),
            "cli:import",
        )
    })?;

    let result = manager.import_data(&text);
    if !result.success {
        let message = result.error.unwrap_or_else(|| "Import failed".to_string());
        return Err(PlannerError::import("import_rejected", message, "cli:import"));
    }
    emit(&result, format)
}

fn export(manager: &StateManager, args: ExportArgs) -> Result<()> {
    let text = manager.export_data()?;
    match args.output {
        Some(path) => std::fs::write(&path, text).map_err(|e| {
            PlannerError::system(
                "write_failed",
                format!("cannot write {}: {e}", path.display()),
                "cli:export",
            )
        }),
        None => {
            println!("{text}");
            Ok(())
        }
    }
}

fn reset(manager: &mut StateManager, args: ResetArgs, format: OutputFormat) -> Result<()> {
    if !args.yes {
        return Err(PlannerError::user(
            "confirmation_required",
            "reset wipes persisted data and restores the built-in defaults",
            "cli:reset",
        )
        .with_hint("Re-run with --yes to confirm"));
    }

    manager.reset();
    mutation_outcome(manager, "reset")?;
    emit(&summary_line(manager.data()), format)
}

fn summary_line(dataset: &Dataset) -> serde_json::Value {
    serde_json::json!({
        "venue": dataset.metadata.venue_name,
        "menu_items": dataset.menu.len(),
        "utilities": dataset.utilities.len(),
        "labor_entries": dataset.labor.len(),
        "fixed_costs": dataset.fixed_costs.len(),
    })
}
