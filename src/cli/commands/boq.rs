//! `gk boq` command - Bill of quantities

use clap::{Args, Subcommand};
use console::style;
use miette::{bail, IntoDiagnostic, Result};
use std::fs::File;
use std::path::PathBuf;

use crate::cli::args::GlobalOpts;
use crate::cli::helpers::print_serialized;
use crate::cli::table::{CellValue, TableFormatter};
use crate::cli::Context;
use crate::entities::{BoqItemChanges, NewBoqItem};

#[derive(Debug, Subcommand)]
pub enum BoqCommands {
    /// Add one item
    New(NewArgs),
    /// List items ordered by code
    List,
    /// Load items from a CSV export of the tender spreadsheet
    Import(ImportArgs),
    /// Change an item's code while no sheet references it
    Rename(RenameArgs),
    /// Change an item's description, unit, quantity or price while no sheet references it
    Edit(EditArgs),
}

#[derive(Debug, Args)]
pub struct NewArgs {
    /// Position code, e.g. 1.2.3
    #[arg(long)]
    pub code: String,

    /// Description of the work
    #[arg(long)]
    pub title: String,

    /// Unit of measure (m3, kg, pcs, ...)
    #[arg(long)]
    pub uom: String,

    /// Contracted quantity
    #[arg(long, default_value = "0")]
    pub quantity: String,

    /// Unit price
    #[arg(long, default_value = "0")]
    pub price: String,
}

#[derive(Debug, Args)]
pub struct ImportArgs {
    /// CSV file (comma or semicolon separated, with a header row)
    pub file: PathBuf,

    /// Report what would change without saving
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Debug, Args)]
pub struct RenameArgs {
    pub code: String,
    pub new_code: String,
}

#[derive(Debug, Args)]
pub struct EditArgs {
    /// Position code of the item to change
    pub code: String,

    #[arg(long)]
    pub title: Option<String>,

    #[arg(long)]
    pub uom: Option<String>,

    /// New contracted quantity
    #[arg(long)]
    pub quantity: Option<String>,

    /// New unit price
    #[arg(long)]
    pub price: Option<String>,
}

impl BoqCommands {
    pub fn run(&self, global: &GlobalOpts) -> Result<()> {
        match self {
            BoqCommands::New(args) => run_new(args, global),
            BoqCommands::List => run_list(global),
            BoqCommands::Import(args) => run_import(args, global),
            BoqCommands::Rename(args) => run_rename(args, global),
            BoqCommands::Edit(args) => run_edit(args, global),
        }
    }
}

fn run_new(args: &NewArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = Context::open(global)?;
    let actor = ctx.actor(global)?;
    let project = ctx.project(global)?;

    let item = ctx.book.add_boq_item(
        &actor,
        &project,
        NewBoqItem {
            code: args.code.clone(),
            title: args.title.clone(),
            uom: args.uom.clone(),
            contracted_quantity: args.quantity.clone(),
            unit_price: args.price.clone(),
        },
    )?;

    if print_serialized(&item, ctx.format(global))? {
        return Ok(());
    }
    if !global.quiet {
        println!(
            "{} Added {} {}",
            style("✓").green(),
            style(&item.code).cyan(),
            item.title
        );
    }
    Ok(())
}

fn run_list(global: &GlobalOpts) -> Result<()> {
    let ctx = Context::open(global)?;
    let format = ctx.format(global);
    let project = ctx.project(global)?;
    let items = ctx.book.list_boq_items(&project)?;

    if print_serialized(&items, format)? {
        return Ok(());
    }
    if items.is_empty() {
        println!("No BoQ items found.");
        return Ok(());
    }

    let mut table = TableFormatter::new(
        vec!["CODE", "TITLE", "UOM", "QUANTITY", "PRICE", "VALUE"],
        "item",
    );
    for item in items {
        let value = item.contract_value().round_dp(2);
        table.push_row(vec![
            CellValue::Id(item.code),
            CellValue::Text(item.title),
            CellValue::Text(item.uom),
            CellValue::Decimal(item.contracted_quantity.to_string()),
            CellValue::Decimal(item.unit_price.to_string()),
            CellValue::Decimal(format!("{:.2}", value)),
        ]);
    }
    table.print(format, global.quiet);
    Ok(())
}

fn run_import(args: &ImportArgs, global: &GlobalOpts) -> Result<()> {
    let mut ctx = Context::open(global)?;
    let actor = ctx.actor(global)?;
    let project = ctx.project(global)?;
    let file = File::open(&args.file).into_diagnostic()?;

    let stats = ctx.book.import_boq(&actor, &project, file, args.dry_run)?;

    if print_serialized(&stats, ctx.format(global))? {
        return Ok(());
    }
    for warning in &stats.warnings {
        eprintln!("{} {}", style("!").yellow(), warning);
    }
    if !global.quiet {
        let verb = if args.dry_run { "Would import" } else { "Imported" };
        println!(
            "{} {} into {}: {} created, {} updated, {} unchanged, {} skipped",
            style("✓").green(),
            verb,
            style(&project.code).cyan(),
            stats.created,
            stats.updated,
            stats.unchanged,
            stats.skipped
        );
    }
    Ok(())
}

fn run_rename(args: &RenameArgs, global: &GlobalOpts) -> Result<()> {
    let mut ctx = Context::open(global)?;
    let actor = ctx.actor(global)?;
    let project = ctx.project(global)?;

    let item = ctx
        .book
        .rename_boq_item(&actor, &project, &args.code, &args.new_code)?;
    if !global.quiet {
        println!(
            "{} Renamed {} to {}",
            style("✓").green(),
            args.code,
            style(&item.code).cyan()
        );
    }
    Ok(())
}

fn run_edit(args: &EditArgs, global: &GlobalOpts) -> Result<()> {
    let changes = BoqItemChanges {
        title: args.title.clone(),
        uom: args.uom.clone(),
        contracted_quantity: args.quantity.clone(),
        unit_price: args.price.clone(),
    };
    if changes.is_empty() {
        bail!(
            help = "pass at least one of --title, --uom, --quantity or --price",
            "nothing to change for {}",
            args.code
        );
    }

    let mut ctx = Context::open(global)?;
    let actor = ctx.actor(global)?;
    let project = ctx.project(global)?;
    let item = ctx
        .book
        .update_boq_item(&actor, &project, &args.code, changes)?;

    if print_serialized(&item, ctx.format(global))? {
        return Ok(());
    }
    if !global.quiet {
        println!(
            "{} Updated {} {}",
            style("✓").green(),
            style(&item.code).cyan(),
            item.title
        );
    }
    Ok(())
}
