use anyhow::Result;
use clap::Parser;
use jdeps::cli::{self, Args};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let stdout = std::io::stdout();
    let found = cli::run(&args, &mut stdout.lock())?;
    if !found {
        std::process::exit(1);
    }
    Ok(())
}
