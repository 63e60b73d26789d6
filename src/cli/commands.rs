//! CLI command definitions.
//!
//! Every planner feature is accessible via CLI; effects of mutations are
//! observable only through the container's state, so commands report by
//! reading it back after the pipeline runs.

use super::output::OutputFormat;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// prixfixe - financial planning for small restaurants.
#[derive(Parser)]
#[command(name = "prixfixe")]
#[command(
    version,
    about,
    long_about = "Menu BOM costing, sales forecasts, and profitability KPIs across scenarios."
)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "table")]
    pub format: OutputFormat,

    /// Data directory (defaults to $PRIXFIXE_DATA_DIR, then ~/.prixfixe)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Verbose output
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Show the P&L and KPI summary for the active scenario
    Summary,

    /// Menu item commands
    #[command(subcommand)]
    Menu(MenuCommands),

    /// Sales forecast commands
    #[command(subcommand)]
    Sales(SalesCommands),

    /// Utility cost commands
    #[command(subcommand)]
    Utilities(ListCommands),

    /// Labor cost commands
    #[command(subcommand)]
    Labor(ListCommands),

    /// Fixed cost commands
    #[command(subcommand)]
    Fixed(ListCommands),

    /// Scenario commands
    #[command(subcommand)]
    Scenario(ScenarioCommands),

    /// Show the latest validation outcome for the dataset
    Validate,

    /// Import a full model from an exported JSON file
    Import(ImportArgs),

    /// Export the full model as JSON
    Export(ExportArgs),

    /// Wipe persisted data and restore the built-in defaults
    Reset(ResetArgs),
}

/// Menu subcommands.
#[derive(Subcommand)]
pub enum MenuCommands {
    /// List menu items with contribution margins
    List,
    /// Show one menu item with its bill of materials
    Show(MenuShowArgs),
    /// Update one menu item
    Set(MenuSetArgs),
}

#[derive(Args)]
pub struct MenuShowArgs {
    /// Menu item id
    pub id: String,
}

#[derive(Args)]
pub struct MenuSetArgs {
    /// Menu item id
    pub id: String,

    /// New display name
    #[arg(long)]
    pub name: Option<String>,

    /// New selling price
    #[arg(long)]
    pub price: Option<rust_decimal::Decimal>,

    /// JSON file with the replacement ingredient list
    #[arg(long)]
    pub ingredients: Option<PathBuf>,
}

/// Sales subcommands.
#[derive(Subcommand)]
pub enum SalesCommands {
    /// Show the sales forecast
    Show,
    /// Update the sales forecast
    Set(SalesSetArgs),
}

#[derive(Args)]
pub struct SalesSetArgs {
    /// Open days per month
    #[arg(long)]
    pub days_open: Option<u32>,

    /// Daily unit forecasts as MENU_ID=UNITS (replaces all rows)
    #[arg(long = "units", value_name = "MENU_ID=UNITS")]
    pub units: Vec<String>,
}

/// Shared list/replace subcommands for utilities, labor, and fixed costs.
#[derive(Subcommand)]
pub enum ListCommands {
    /// List current entries
    List,
    /// Replace all entries from a JSON file
    Set(ListSetArgs),
}

#[derive(Args)]
pub struct ListSetArgs {
    /// JSON file holding the replacement list
    #[arg(long)]
    pub file: PathBuf,
}

/// Scenario subcommands.
#[derive(Subcommand)]
pub enum ScenarioCommands {
    /// List scenarios, marking the active one
    List,
    /// Switch the active scenario
    Use(ScenarioUseArgs),
}

#[derive(Args)]
pub struct ScenarioUseArgs {
    /// Scenario id
    pub id: String,
}

#[derive(Args)]
pub struct ImportArgs {
    /// JSON file produced by `prixfixe export`
    pub file: PathBuf,
}

#[derive(Args)]
pub struct ExportArgs {
    /// Write to a file instead of stdout
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}

#[derive(Args)]
pub struct ResetArgs {
    /// Confirm the wipe
    #[arg(long)]
    pub yes: bool,
}
