use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use mailprobe_lib::{
    Blocklist, CatchAllPolicy, DnsOptions, PipelineConfig, ProbeOptions, TlsPolicy,
    ValidationMode,
};

#[derive(Parser)]
#[command(name = "mailprobe-cli", version, about = "E-mail deliverability checks")]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the validation pipeline on one address
    Check {
        email: String,
        /// output: human|json
        #[arg(long, value_enum, default_value_t = Format::Human)]
        format: Format,
        #[command(flatten)]
        pipeline: PipelineArgs,
    },
    /// Probe the mailbox over SMTP and print every server attempt
    Probe {
        email: String,
        /// output: human|json
        #[arg(long, value_enum, default_value_t = Format::Human)]
        format: Format,
        #[command(flatten)]
        pipeline: PipelineArgs,
    },
    /// Serve the HTTP API
    #[cfg(feature = "server")]
    Serve {
        /// listen address
        #[arg(long, env = "MAILPROBE_ADDR", default_value = "127.0.0.1:8000")]
        addr: std::net::SocketAddr,
        /// directory holding favicon.ico
        #[arg(long, env = "MAILPROBE_STATIC_DIR", default_value = "static")]
        static_dir: PathBuf,
        #[command(flatten)]
        pipeline: PipelineArgs,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Human,
    Json,
}

/// Flags shared by every subcommand that builds a pipeline.
#[derive(Args, Debug, Clone)]
pub struct PipelineArgs {
    /// append the SMTP mailbox probe to the pipeline
    #[arg(long, env = "MAILPROBE_DELIVERABILITY")]
    pub deliverability: bool,

    /// preference-zero|null-mx|off
    #[arg(long, env = "MAILPROBE_CATCH_ALL_POLICY", default_value = "preference-zero")]
    pub catch_all_policy: CatchAllPolicy,

    /// DNS query timeout (ms)
    #[arg(long, env = "MAILPROBE_DNS_TIMEOUT_MS", default_value_t = 3_000)]
    pub dns_timeout_ms: u64,

    /// SMTP connect and per-command timeout (ms)
    #[arg(long, env = "MAILPROBE_SMTP_TIMEOUT_MS", default_value_t = 3_000)]
    pub smtp_timeout_ms: u64,

    /// name sent with EHLO/HELO
    #[arg(long, env = "MAILPROBE_HELO")]
    pub helo: Option<String>,

    /// MAIL FROM address (null reverse-path when unset)
    #[arg(long, env = "MAILPROBE_MAIL_FROM")]
    pub mail_from: Option<String>,

    /// opportunistic|required|disabled
    #[arg(long, env = "MAILPROBE_TLS", default_value = "opportunistic")]
    pub tls: TlsPolicy,

    /// maximum number of MX hosts contacted (all when unset)
    #[arg(long, env = "MAILPROBE_MAX_MX")]
    pub max_mx: Option<usize>,

    /// SMTP port
    #[arg(long, env = "MAILPROBE_SMTP_PORT", default_value_t = 25)]
    pub smtp_port: u16,

    /// local-part rules: strict|relaxed
    #[arg(long, env = "MAILPROBE_SYNTAX", default_value = "strict", value_parser = ["strict", "relaxed"])]
    pub syntax: String,

    /// extra blocklisted domains, one per line
    #[arg(long, env = "MAILPROBE_BLOCKLIST_FILE")]
    pub blocklist_file: Option<PathBuf>,
}

impl PipelineArgs {
    pub fn syntax_mode(&self) -> ValidationMode {
        mode_from_str(&self.syntax)
    }

    pub fn config(&self) -> PipelineConfig {
        let smtp_timeout = Duration::from_millis(self.smtp_timeout_ms);
        PipelineConfig {
            deliverability: self.deliverability,
            catch_all_policy: self.catch_all_policy,
            dns: DnsOptions {
                timeout: Duration::from_millis(self.dns_timeout_ms),
                ..DnsOptions::default()
            },
            probe: ProbeOptions {
                port: self.smtp_port,
                helo_domain: self.helo.clone(),
                envelope_sender: self.mail_from.clone(),
                connect_timeout: smtp_timeout,
                command_timeout: smtp_timeout,
                max_servers: self.max_mx,
                tls: self.tls,
            },
            syntax_mode: self.syntax_mode(),
            ..PipelineConfig::default()
        }
    }

    pub fn blocklist(&self) -> Result<Blocklist> {
        let blocklist = Blocklist::builtin();
        match &self.blocklist_file {
            Some(path) => blocklist
                .with_file(path)
                .with_context(|| format!("load blocklist {}", path.display())),
            None => Ok(blocklist),
        }
    }
}

pub fn mode_from_str(s: &str) -> ValidationMode {
    match s {
        "relaxed" => ValidationMode::Relaxed,
        _ => ValidationMode::Strict,
    }
}
