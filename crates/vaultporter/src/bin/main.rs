//! VaultPorter CLI

use clap::Parser;
use vaultporter::{App, Cli, logging};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.log_format)?;

    log::debug!("VaultPorter v{}", env!("CARGO_PKG_VERSION"));

    let mut app = App::open(cli.config).await?;
    app.run(cli.command).await
}
