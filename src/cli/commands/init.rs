//! `gk init` command - Initialize a new construction book workspace

use console::style;
use miette::{miette, IntoDiagnostic, Result};

use crate::core::{Book, Config, Workspace, WorkspaceError};

#[derive(clap::Args, Debug)]
pub struct InitArgs {
    /// Directory to initialize (default: current directory)
    #[arg(default_value = ".")]
    pub path: std::path::PathBuf,

    /// Register the first administrator
    #[arg(long)]
    pub admin: Option<String>,

    /// Force initialization even if .gk/ already exists
    #[arg(long)]
    pub force: bool,
}

pub fn run(args: InitArgs) -> Result<()> {
    let path = if args.path.as_os_str() == "." {
        std::env::current_dir().into_diagnostic()?
    } else {
        args.path.clone()
    };

    if !path.exists() {
        std::fs::create_dir_all(&path).into_diagnostic()?;
        println!(
            "{} Created directory {}",
            style("✓").green(),
            style(path.display()).cyan()
        );
    }

    let workspace = match Workspace::init(&path, args.force) {
        Ok(workspace) => workspace,
        Err(WorkspaceError::AlreadyExists(path)) => {
            println!(
                "{} gk workspace already exists at {}",
                style("!").yellow(),
                style(path.display()).cyan()
            );
            println!();
            println!("Use {} to reinitialize", style("gk init --force").yellow());
            return Ok(());
        }
        Err(e) => return Err(miette!("{}", e)),
    };

    let config = Config::load_for(Some(&workspace));
    let db_path = workspace.database_path(config.database.as_deref());
    let mut book = Book::open(&db_path)?;
    let created = book.ensure_roles()?;

    println!(
        "{} Initialized gk workspace at {}",
        style("✓").green(),
        style(workspace.root().display()).cyan()
    );
    println!(
        "  {} {} ({} role(s) created)",
        style("database").dim(),
        db_path.display(),
        created
    );

    if let Some(username) = args.admin.as_deref() {
        let admin = book.bootstrap_admin(username)?;
        println!(
            "{} Registered administrator {}",
            style("✓").green(),
            style(&admin.username).cyan()
        );
    }

    println!();
    println!("Next steps:");
    println!(
        "  {} Create the project",
        style("gk project new --code P1 --name \"...\"").yellow()
    );
    println!(
        "  {} Add users",
        style("gk team add --username ... --role contractor").yellow()
    );
    println!(
        "  {} Load the bill of quantities",
        style("gk boq import boq.csv").yellow()
    );
    Ok(())
}
