use clap::{Parser, Subcommand};
use clearing_harness::config::{HarnessConfig, LoadConfig};
use miette::Result;

mod bootstrap;
mod derive;

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the program-derived vault and authority addresses
    Derive(derive::Args),
    /// Bring up a clearing house on the emulated cluster
    Bootstrap(bootstrap::Args),
}

#[derive(Debug, Parser)]
#[clap(name = "Clearing Harness")]
#[clap(bin_name = "clearing-harness")]
#[clap(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[arg(short, long)]
    config: Option<std::path::PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    let config = HarnessConfig::load(args.config.as_deref())?;

    match args.command {
        Command::Derive(x) => derive::run(&config, &x)?,
        Command::Bootstrap(x) => bootstrap::run(config, &x).await?,
    };

    Ok(())
}
