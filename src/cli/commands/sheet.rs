//! `gk sheet` command - Construction book sheets

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use clap::{Args, Subcommand};
use console::style;
use miette::{bail, miette, IntoDiagnostic, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::cli::args::GlobalOpts;
use crate::cli::helpers::{format_short_id, parse_assignment, print_serialized};
use crate::cli::table::{CellValue, TableFormatter};
use crate::cli::{Context, OutputFormat};
use crate::core::error::{GkError, ValidationError};
use crate::core::identity::{EntityId, EntityPrefix};
use crate::core::workflow::SheetStatus;
use crate::entities::{EntryInput, NewSheet, Project, SheetDetail, SheetFilter};

#[derive(Debug, Subcommand)]
pub enum SheetCommands {
    /// Start a new draft sheet (contractors only)
    New(NewArgs),
    /// List sheets, newest period first
    List(ListArgs),
    /// Show a sheet with its entries and total
    Show(ShowArgs),
    /// Replace a sheet's entries
    Edit(EditArgs),
}

#[derive(Debug, Args)]
pub struct NewArgs {
    /// Sequential sheet number within the project
    #[arg(long, short = 'n')]
    pub number: u32,

    /// First day of the period (YYYY-MM-DD)
    #[arg(long)]
    pub from: NaiveDate,

    /// Last day of the period (YYYY-MM-DD)
    #[arg(long)]
    pub to: NaiveDate,

    #[arg(long, default_value = "")]
    pub note: String,
}

#[derive(Debug, Args)]
pub struct ListArgs {
    /// Filter by status
    #[arg(long, short = 's')]
    pub status: Option<SheetStatus>,

    /// Only sheets with an entry for this BoQ code
    #[arg(long)]
    pub boq: Option<String>,
}

#[derive(Debug, Args)]
pub struct ShowArgs {
    /// Sheet number (`3` or `#3`) or sheet ID
    pub sheet: String,
}

#[derive(Debug, Args)]
pub struct EditArgs {
    /// Sheet number (`3` or `#3`) or sheet ID
    pub sheet: String,

    /// CSV file with `code,quantity[,note]` columns
    #[arg(long)]
    pub file: Option<PathBuf>,

    /// Entry as CODE=QUANTITY; overrides the same code from --file
    #[arg(long = "set", value_parser = parse_assignment)]
    pub set: Vec<(String, String)>,

    /// Allow an empty entry set, removing every entry
    #[arg(long)]
    pub clear: bool,
}

impl SheetCommands {
    pub fn run(&self, global: &GlobalOpts) -> Result<()> {
        match self {
            SheetCommands::New(args) => run_new(args, global),
            SheetCommands::List(args) => run_list(args, global),
            SheetCommands::Show(args) => run_show(args, global),
            SheetCommands::Edit(args) => run_edit(args, global),
        }
    }
}

/// Resolve `3`, `#3` or `SHT-...` to a sheet ID within `project`
fn resolve_sheet(ctx: &Context, project: &Project, reference: &str) -> Result<EntityId> {
    let trimmed = reference.trim();
    let number = trimmed.strip_prefix('#').unwrap_or(trimmed);
    if let Ok(number) = number.parse::<u32>() {
        return Ok(ctx.book.sheet_by_number(project, number)?.id);
    }
    EntityId::parse_as(trimmed, EntityPrefix::Sht)
        .map_err(|e| miette!("invalid sheet reference '{}': {}", reference, e))
}

fn run_new(args: &NewArgs, global: &GlobalOpts) -> Result<()> {
    let mut ctx = Context::open(global)?;
    let actor = ctx.actor(global)?;
    let project = ctx.project(global)?;

    let mut new = NewSheet::new(args.number, args.from, args.to);
    new.note = args.note.trim().to_string();
    let sheet = ctx.book.create_sheet(&actor, &project, new)?;

    match ctx.format(global) {
        OutputFormat::Id => println!("{}", sheet.id),
        format => {
            if print_serialized(&sheet, format)? {
                return Ok(());
            }
            if !global.quiet {
                println!(
                    "{} Created sheet {} ({}) for {} to {}",
                    style("✓").green(),
                    style(format!("#{}", sheet.number)).cyan(),
                    format_short_id(&sheet.id),
                    sheet.period_from,
                    sheet.period_to
                );
            }
        }
    }
    Ok(())
}

fn run_list(args: &ListArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = Context::open(global)?;
    let format = ctx.format(global);
    let project = ctx.project(global)?;

    let boq_item = match &args.boq {
        Some(code) => Some(ctx.book.boq_item_by_code(&project, code)?.id),
        None => None,
    };
    let filter = SheetFilter {
        status: args.status,
        boq_item,
    };
    let sheets = ctx.book.list_sheets(&project, &filter)?;

    if print_serialized(&sheets, format)? {
        return Ok(());
    }
    if sheets.is_empty() {
        println!("No sheets found.");
        return Ok(());
    }

    let mut table = TableFormatter::new(
        vec!["ID", "#", "FROM", "TO", "STATUS", "BY", "ENTRIES", "TOTAL"],
        "sheet",
    );
    for sheet in sheets {
        table.push_row(vec![
            CellValue::Id(sheet.id.to_string()),
            CellValue::Number(u64::from(sheet.number)),
            CellValue::Date(sheet.period_from),
            CellValue::Date(sheet.period_to),
            CellValue::Status(sheet.status),
            CellValue::Text(sheet.created_by),
            CellValue::Number(sheet.entry_count as u64),
            CellValue::Decimal(money(sheet.total)),
        ]);
    }
    table.print(format, global.quiet);
    Ok(())
}

#[derive(Serialize)]
struct ShowOutput<'a> {
    #[serde(flatten)]
    detail: &'a SheetDetail,
    total: Decimal,
}

fn run_show(args: &ShowArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = Context::open(global)?;
    let format = ctx.format(global);
    let actor = ctx.actor(global)?;
    let project = ctx.project(global)?;

    let sheet_id = resolve_sheet(&ctx, &project, &args.sheet)?;
    let detail = ctx.book.get_sheet_detail(&actor, &sheet_id)?;

    let output = ShowOutput {
        detail: &detail,
        total: detail.total(),
    };
    if print_serialized(&output, format)? {
        return Ok(());
    }

    let sheet = &detail.sheet;
    if format == OutputFormat::Auto && !global.quiet {
        println!(
            "{} {}  {} to {}  [{}]",
            style(format!("Sheet #{}", sheet.number)).bold(),
            style(&sheet.id).dim(),
            sheet.period_from,
            sheet.period_to,
            style(sheet.status).yellow()
        );
        if detail.can_edit {
            println!("  by {}  {}", sheet.created_by, style("(editable)").green());
        } else {
            println!("  by {}", sheet.created_by);
        }
        if !sheet.note.is_empty() {
            println!("  {}", sheet.note);
        }
        println!();
    }

    let mut table = TableFormatter::new(
        vec!["CODE", "TITLE", "UOM", "QUANTITY", "PRICE", "AMOUNT", "NOTE"],
        "entry",
    );
    for line in &detail.entries {
        table.push_row(vec![
            CellValue::Id(line.boq_code.clone()),
            CellValue::Text(line.boq_title.clone()),
            CellValue::Text(line.uom.clone()),
            CellValue::Decimal(line.quantity().to_string()),
            CellValue::Decimal(line.unit_price.to_string()),
            CellValue::Decimal(money(line.amount())),
            if line.entry.note.is_empty() {
                CellValue::Empty
            } else {
                CellValue::Text(line.entry.note.clone())
            },
        ]);
    }
    print!("{}", table.render(format));
    if format == OutputFormat::Auto && !global.quiet {
        println!("Total: {}", style(money(detail.total())).cyan());
    }
    Ok(())
}

/// One row of an entry CSV file
#[derive(Debug, Deserialize)]
struct EditRow {
    code: String,
    quantity: String,
    #[serde(default)]
    note: String,
}

fn read_rows(path: &Path) -> Result<Vec<EditRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(path)
        .into_diagnostic()?;
    let mut rows = Vec::new();
    for record in reader.deserialize() {
        let row: EditRow = record.map_err(GkError::from)?;
        rows.push(row);
    }
    Ok(rows)
}

/// Merge `--file` rows and `--set` assignments into `(code, quantity, note)`
///
/// File order is kept; a `--set` for a code already present replaces its
/// quantity in place.
fn desired_rows(
    file_rows: Vec<EditRow>,
    sets: &[(String, String)],
) -> Vec<(String, String, String)> {
    let mut rows: Vec<(String, String, String)> = file_rows
        .into_iter()
        .map(|r| (r.code, r.quantity, r.note))
        .collect();
    for (code, quantity) in sets {
        match rows.iter_mut().find(|(c, _, _)| c == code) {
            Some(row) => row.1 = quantity.clone(),
            None => rows.push((code.clone(), quantity.clone(), String::new())),
        }
    }
    rows
}

fn run_edit(args: &EditArgs, global: &GlobalOpts) -> Result<()> {
    let mut ctx = Context::open(global)?;
    let actor = ctx.actor(global)?;
    let project = ctx.project(global)?;
    let sheet_id = resolve_sheet(&ctx, &project, &args.sheet)?;

    let file_rows = match &args.file {
        Some(path) => read_rows(path)?,
        None => Vec::new(),
    };
    let rows = desired_rows(file_rows, &args.set);
    if rows.is_empty() && !args.clear {
        bail!(
            help = "pass --clear to remove every entry",
            "no entries given; use --file or --set"
        );
    }

    let codes: HashMap<String, EntityId> = ctx
        .book
        .list_boq_items(&project)?
        .into_iter()
        .map(|item| (item.code, item.id))
        .collect();

    let mut desired = Vec::with_capacity(rows.len());
    let mut unknown = Vec::new();
    for (code, quantity, note) in rows {
        match codes.get(&code) {
            Some(id) => desired.push(EntryInput::new(id, quantity).with_note(note)),
            None => unknown.push(ValidationError::InvalidField {
                field: "boq_item",
                message: format!("unknown BoQ code '{}' in project {}", code, project.code),
            }),
        }
    }
    if !unknown.is_empty() {
        return Err(GkError::Validation { errors: unknown }.into());
    }

    let lines = ctx.book.apply_batch(&actor, &sheet_id, &desired)?;

    if print_serialized(&lines, ctx.format(global))? {
        return Ok(());
    }
    if !global.quiet {
        let total: Decimal = lines.iter().map(|l| l.amount()).sum();
        println!(
            "{} Saved {} entr{} (total {})",
            style("✓").green(),
            lines.len(),
            if lines.len() == 1 { "y" } else { "ies" },
            style(money(total)).cyan()
        );
    }
    Ok(())
}

fn money(value: Decimal) -> String {
    format!("{:.2}", value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(code: &str, quantity: &str) -> EditRow {
        EditRow {
            code: code.to_string(),
            quantity: quantity.to_string(),
            note: String::new(),
        }
    }

    #[test]
    fn test_set_overrides_file_rows_in_place() {
        let rows = desired_rows(
            vec![row("A", "1"), row("B", "2")],
            &[
                ("A".to_string(), "5".to_string()),
                ("C".to_string(), "3".to_string()),
            ],
        );
        let codes: Vec<_> = rows.iter().map(|r| (r.0.as_str(), r.1.as_str())).collect();
        assert_eq!(codes, vec![("A", "5"), ("B", "2"), ("C", "3")]);
    }

    #[test]
    fn test_money_has_two_decimals() {
        assert_eq!(money(Decimal::new(2063, 2)), "20.63");
        assert_eq!(money(Decimal::ZERO), "0.00");
    }
}
