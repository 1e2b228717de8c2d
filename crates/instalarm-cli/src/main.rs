use std::io::{Read, Write};

use clap::Parser;
use tracing::debug;

#[derive(Parser)]
#[command(
    name = "instalarm-template",
    about = "Canonicalize alarm parameters read from stdin",
    version
)]
struct Cli {}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("instalarm=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    Cli::parse();

    let mut input = String::new();
    std::io::stdin().read_to_string(&mut input)?;
    let output = instalarm_cli::canonicalize(&input)?;
    debug!(bytes = output.len(), "canonical record written");

    std::io::stdout().write_all(output.as_bytes())?;
    Ok(())
}
