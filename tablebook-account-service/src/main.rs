use clap::{Parser, Subcommand};

use tablebook_account_service::app;

#[derive(Parser)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    Rpc,
    Producer,
}

#[tokio::main]
pub async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    match &cli.command {
        Commands::Rpc => app::rpc::main().await,
        Commands::Producer => {
            app::producer::main();
            Ok(())
        }
    }
}
