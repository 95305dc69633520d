mod args;
mod check;
mod output;
mod probe;
#[cfg(feature = "server")]
mod serve;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use args::{Cli, Commands};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = <Cli as clap::Parser>::parse();
    let passed = match cli.cmd {
        Commands::Check {
            email,
            format,
            pipeline,
        } => check::run(&email, format, &pipeline)?,
        Commands::Probe {
            email,
            format,
            pipeline,
        } => probe::run(&email, format, &pipeline)?,
        #[cfg(feature = "server")]
        Commands::Serve {
            addr,
            static_dir,
            pipeline,
        } => {
            serve::run(addr, static_dir, &pipeline)?;
            true
        }
    };

    // exit codes: 0 valid, 2 invalid, 1 fatal
    if !passed {
        std::process::exit(2);
    }
    Ok(())
}
