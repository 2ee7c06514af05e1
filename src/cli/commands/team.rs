//! Team command - users and roles

use clap::{Args, Subcommand};
use console::style;
use miette::Result;

use crate::cli::args::GlobalOpts;
use crate::cli::helpers::print_serialized;
use crate::cli::table::{CellValue, TableFormatter};
use crate::cli::Context;
use crate::core::team::{Actor, Role};

/// Users and roles
#[derive(Debug, Subcommand)]
pub enum TeamCommands {
    /// List the workflow roles
    Roles,
    /// List users
    List(TeamListArgs),
    /// Show the acting user and role
    Whoami,
    /// Add a user (administrators only)
    Add(TeamAddArgs),
}

#[derive(Debug, Args)]
pub struct TeamListArgs {
    /// Filter by role
    #[arg(long, short = 'r')]
    pub role: Option<Role>,
}

#[derive(Debug, Args)]
pub struct TeamAddArgs {
    /// Login name
    #[arg(long)]
    pub username: String,

    /// Display name (default: the username)
    #[arg(long)]
    pub name: Option<String>,

    #[arg(long, default_value = "")]
    pub email: String,

    /// contractor, supervisor, investor or admin
    #[arg(long, short = 'r')]
    pub role: Role,
}

impl TeamCommands {
    pub fn run(&self, global: &GlobalOpts) -> Result<()> {
        match self {
            TeamCommands::Roles => run_roles(global),
            TeamCommands::List(args) => args.run(global),
            TeamCommands::Whoami => run_whoami(global),
            TeamCommands::Add(args) => args.run(global),
        }
    }
}

fn run_roles(global: &GlobalOpts) -> Result<()> {
    let ctx = Context::open(global)?;
    let format = ctx.format(global);
    let roles = ctx.book.list_roles()?;
    if print_serialized(&roles, format)? {
        return Ok(());
    }
    for role in roles {
        println!("{}", role);
    }
    Ok(())
}

impl TeamListArgs {
    pub fn run(&self, global: &GlobalOpts) -> Result<()> {
        let ctx = Context::open(global)?;
        let format = ctx.format(global);
        let users = ctx.book.list_users(self.role)?;

        if print_serialized(&users, format)? {
            return Ok(());
        }
        if users.is_empty() {
            println!("No users found.");
            return Ok(());
        }

        let mut table = TableFormatter::new(vec!["USERNAME", "NAME", "EMAIL", "ROLE"], "user");
        for user in users {
            table.push_row(vec![
                CellValue::Id(user.username),
                CellValue::Text(user.name),
                if user.email.is_empty() {
                    CellValue::Empty
                } else {
                    CellValue::Text(user.email)
                },
                CellValue::Text(user.role.to_string()),
            ]);
        }
        table.print(format, global.quiet);
        Ok(())
    }
}

fn run_whoami(global: &GlobalOpts) -> Result<()> {
    let ctx = Context::open(global)?;
    let actor = ctx.actor(global)?;
    if print_serialized(&actor, ctx.format(global))? {
        return Ok(());
    }
    println!(
        "{} ({})",
        style(&actor.username).cyan(),
        style(actor.role).yellow()
    );
    Ok(())
}

impl TeamAddArgs {
    pub fn run(&self, global: &GlobalOpts) -> Result<()> {
        let ctx = Context::open(global)?;
        let actor = ctx.actor(global)?;

        let mut user = Actor::new(&self.username, self.role);
        if let Some(name) = &self.name {
            user.name = name.trim().to_string();
        }
        user.email = self.email.trim().to_string();
        ctx.book.add_user(&actor, &user)?;

        if !global.quiet {
            println!(
                "{} Added {} as {}",
                style("✓").green(),
                style(&user.username).cyan(),
                user.role
            );
        }
        Ok(())
    }
}
