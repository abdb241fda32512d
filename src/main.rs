use anyhow::Context;
use clap::Parser;
use copytrail::adapter::inbound::cli::{self, command::Cli};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    // Both reqwest and tokio-tungstenite run on rustls; pin the ring provider.
    let _ = rustls::crypto::ring::default_provider().install_default();
    let cli = Cli::parse();
    let config = cli.config.display().to_string();

    cli::execute(cli)
        .await
        .with_context(|| format!("copytrail failed (config: {config})"))
}
