use clap::Parser;
use gk::cli::{Cli, Commands};
use miette::Result;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() -> Result<()> {
    // Reset SIGPIPE so piping into `head` exits quietly instead of panicking
    #[cfg(unix)]
    {
        unsafe {
            libc::signal(libc::SIGPIPE, libc::SIG_DFL);
        }
    }
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .tab_width(4)
                .build(),
        )
    }))?;

    let cli = Cli::parse();
    let global = cli.global;
    init_logging(global.verbose);

    match cli.command {
        Commands::Init(args) => gk::cli::commands::init::run(args),
        Commands::Team(cmd) => cmd.run(&global),
        Commands::Project(cmd) => cmd.run(&global),
        Commands::Boq(cmd) => cmd.run(&global),
        Commands::Sheet(cmd) => cmd.run(&global),
        Commands::Completions(args) => gk::cli::commands::completions::run(args),
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("gk=debug")
    } else {
        EnvFilter::try_from_env("GK_LOG").unwrap_or_else(|_| EnvFilter::new("gk=warn"))
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();
}
