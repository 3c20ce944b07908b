use std::io;

use anyhow::Result;
use clap::Parser;
use veritas_cli::{Cli, Command, commands, setup};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    veritas_telemetry::init_telemetry(cli.global.log_format.into())?;

    let (retriever, report) = setup::load_retriever(&cli.global).await?;
    let mut stdout = io::stdout();

    match cli.command {
        Command::Index => commands::print_report(&report, &mut stdout)?,
        Command::Search { query, k } => {
            let k = k.unwrap_or(cli.global.top_k);
            commands::search(&retriever, &query, k, &mut stdout).await?;
        }
        Command::Ask { question } => {
            let generator = setup::generator(&cli.global)?;
            commands::answer(&retriever, generator.as_ref(), &question, &[], &mut stdout).await?;
        }
        Command::Chat => {
            let generator = setup::generator(&cli.global)?;
            commands::chat(&retriever, generator.as_ref()).await?;
        }
    }

    Ok(())
}
