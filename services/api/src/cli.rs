use crate::demo::{run_catalog_check, run_demo, CatalogCheckArgs, DemoArgs};
use crate::server;
use adoption_engine::error::AppError;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "Adoption Desk",
    about = "Serve and exercise the adoption workflow from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Inspect adoptable catalogs before loading them
    Catalog {
        #[command(subcommand)]
        command: CatalogCommand,
    },
    /// Run an in-process adoption from submission to completed status
    Demo(DemoArgs),
}

#[derive(Subcommand, Debug)]
enum CatalogCommand {
    /// Parse a CSV catalog and summarize its entries
    Check(CatalogCheckArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// CSV catalog to load at startup (overrides ADOPTION_CATALOG_PATH)
    #[arg(long)]
    pub(crate) catalog: Option<PathBuf>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Catalog {
            command: CatalogCommand::Check(args),
        } => run_catalog_check(args),
        Command::Demo(args) => run_demo(args).await,
    }
}
