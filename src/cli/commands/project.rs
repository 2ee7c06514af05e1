//! `gk project` command - Project management

use clap::{Args, Subcommand};
use console::style;
use miette::Result;

use crate::cli::args::GlobalOpts;
use crate::cli::helpers::print_serialized;
use crate::cli::table::{CellValue, TableFormatter};
use crate::cli::Context;
use crate::entities::NewProject;

#[derive(Debug, Subcommand)]
pub enum ProjectCommands {
    /// Create a project (administrators only)
    New(NewArgs),
    /// List projects
    List,
}

#[derive(Debug, Args)]
pub struct NewArgs {
    /// Short unique code, e.g. BR-12
    #[arg(long)]
    pub code: String,

    #[arg(long)]
    pub name: String,

    #[arg(long, short = 'd', default_value = "")]
    pub description: String,
}

impl ProjectCommands {
    pub fn run(&self, global: &GlobalOpts) -> Result<()> {
        match self {
            ProjectCommands::New(args) => run_new(args, global),
            ProjectCommands::List => run_list(global),
        }
    }
}

fn run_new(args: &NewArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = Context::open(global)?;
    let actor = ctx.actor(global)?;

    let mut new = NewProject::new(&args.code, &args.name);
    new.description = args.description.clone();
    let project = ctx.book.create_project(&actor, new)?;

    if print_serialized(&project, ctx.format(global))? {
        return Ok(());
    }
    if !global.quiet {
        println!(
            "{} Created project {} {}",
            style("✓").green(),
            style(&project.code).cyan(),
            project.name
        );
    }
    Ok(())
}

fn run_list(global: &GlobalOpts) -> Result<()> {
    let ctx = Context::open(global)?;
    let format = ctx.format(global);
    let projects = ctx.book.list_projects()?;

    if print_serialized(&projects, format)? {
        return Ok(());
    }
    if projects.is_empty() {
        println!("No projects found.");
        return Ok(());
    }

    let mut table = TableFormatter::new(vec!["CODE", "NAME", "CREATED"], "project");
    for project in projects {
        table.push_row(vec![
            CellValue::Id(project.code),
            CellValue::Text(project.name),
            CellValue::Date(project.created.date_naive()),
        ]);
    }
    table.print(format, global.quiet);
    Ok(())
}
