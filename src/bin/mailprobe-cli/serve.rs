use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use mailprobe_lib::SystemValidator;
use mailprobe_lib::server::{self, AppState};

use crate::args::PipelineArgs;

pub fn run(addr: SocketAddr, static_dir: PathBuf, args: &PipelineArgs) -> Result<()> {
    let blocklist = Arc::new(args.blocklist()?);
    tracing::info!(domains = blocklist.len(), "blocklist loaded");

    let config = args.config();
    let syntax_mode = config.syntax_mode;
    let validator = SystemValidator::new(config, blocklist).context("build SMTP connector")?;
    let state = AppState::new(Arc::new(validator))
        .with_syntax_mode(syntax_mode)
        .with_static_dir(static_dir);

    // The DNS resolver drives its own runtime, so the pipeline only ever
    // runs on blocking threads of this one.
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("start tokio runtime")?;
    runtime
        .block_on(server::run(addr, state))
        .with_context(|| format!("serve on {addr}"))
}
