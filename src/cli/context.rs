//! Per-invocation state shared by the commands: workspace, config, book

use miette::{miette, Result};

use crate::cli::args::{GlobalOpts, OutputFormat};
use crate::core::{Book, Config, Workspace};
use crate::core::team::Actor;
use crate::entities::Project;

pub struct Context {
    pub workspace: Workspace,
    pub config: Config,
    pub book: Book,
}

impl Context {
    /// Locate the workspace, layer the config and open the database
    pub fn open(global: &GlobalOpts) -> Result<Self> {
        let workspace = match &global.workspace {
            Some(path) => Workspace::discover_from(path),
            None => Workspace::discover(),
        }
        .map_err(|e| miette!("{}", e))?;

        let config = Config::load_for(Some(&workspace));
        let path = workspace.database_path(config.database.as_deref());
        tracing::debug!(database = %path.display(), "opening book");
        let book = Book::open(&path)?;

        Ok(Self {
            workspace,
            config,
            book,
        })
    }

    /// The acting user: `--user`, then GK_USER or the config file
    pub fn actor(&self, global: &GlobalOpts) -> Result<Actor> {
        let Some(username) = global.user.as_deref().or(self.config.user.as_deref()) else {
            return Err(miette!(
                help = "pass --user, set GK_USER, or add `user:` to .gk/config.yaml",
                "no acting user"
            ));
        };
        Ok(self.book.resolve_actor(username)?)
    }

    /// The project to act on: `--project`, then config, then the first one
    pub fn project(&self, global: &GlobalOpts) -> Result<Project> {
        let project = match global.project.as_deref().or(self.config.project.as_deref()) {
            Some(code) => self.book.project_by_code(code)?,
            None => self.book.first_project()?,
        };
        Ok(project)
    }

    /// Output format after applying `default_format` from config
    pub fn format(&self, global: &GlobalOpts) -> OutputFormat {
        resolve_format(global.format, self.config.default_format.as_deref())
    }
}

fn resolve_format(requested: OutputFormat, configured: Option<&str>) -> OutputFormat {
    if requested != OutputFormat::Auto {
        return requested;
    }
    configured
        .and_then(|name| <OutputFormat as clap::ValueEnum>::from_str(name, true).ok())
        .unwrap_or(OutputFormat::Auto)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_beats_configured_format() {
        assert_eq!(resolve_format(OutputFormat::Json, Some("csv")), OutputFormat::Json);
        assert_eq!(resolve_format(OutputFormat::Auto, Some("csv")), OutputFormat::Csv);
        assert_eq!(resolve_format(OutputFormat::Auto, Some("bogus")), OutputFormat::Auto);
        assert_eq!(resolve_format(OutputFormat::Auto, None), OutputFormat::Auto);
    }
}
