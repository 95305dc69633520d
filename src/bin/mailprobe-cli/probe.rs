use anyhow::{Context, Result, bail};
use mailprobe_lib::{CancelFlag, EmailAddress, ProbeStatus, SystemResolver, probe_mailbox};

use crate::args::{Format, PipelineArgs};
use crate::output::human_probe;

/// Returns whether the mailbox was accepted.
pub fn run(email: &str, format: Format, args: &PipelineArgs) -> Result<bool> {
    let address = EmailAddress::parse(email).with_context(|| format!("parse '{email}'"))?;
    let config = args.config();
    let resolver = SystemResolver::from_system_conf(&config.dns).context("init resolver")?;
    let connector = config.probe.connector().context("build SMTP connector")?;

    let report = probe_mailbox(
        &address,
        &resolver,
        &connector,
        &config.probe,
        &CancelFlag::new(),
    );

    match format {
        Format::Human => println!("{}", human_probe(&report)),
        Format::Json => {
            #[cfg(feature = "with-serde")]
            {
                println!("{}", serde_json::to_string_pretty(&report)?);
            }
            #[cfg(not(feature = "with-serde"))]
            {
                bail!("--format json requires the 'with-serde' feature");
            }
        }
    }

    match &report.status {
        ProbeStatus::Deliverable { .. } => Ok(true),
        ProbeStatus::ResolverUnavailable { message } => bail!("DNS lookup failed: {message}"),
        _ => Ok(false),
    }
}
