use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::smtp::{SmtpError, TcpConnector};

/// When to upgrade the SMTP session with `STARTTLS`.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "with-serde", serde(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TlsPolicy {
    /// Upgrade when advertised, continue in clear text otherwise. The
    /// server certificate is not verified.
    #[default]
    Opportunistic,
    /// Skip servers that do not offer or refuse `STARTTLS`; certificates
    /// and host names are verified.
    Required,
    Disabled,
}

impl fmt::Display for TlsPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Opportunistic => "opportunistic",
            Self::Required => "required",
            Self::Disabled => "disabled",
        })
    }
}

impl FromStr for TlsPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "opportunistic" => Ok(Self::Opportunistic),
            "required" => Ok(Self::Required),
            "disabled" => Ok(Self::Disabled),
            other => Err(format!(
                "unknown TLS policy '{other}', use: opportunistic|required|disabled"
            )),
        }
    }
}

/// Controls how the prober talks to mail exchangers.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOptions {
    pub port: u16,
    pub helo_domain: Option<String>,
    /// `MAIL FROM` address; `None` or empty sends the null reverse-path.
    pub envelope_sender: Option<String>,
    pub connect_timeout: Duration,
    pub command_timeout: Duration,
    /// Cap on exchangers contacted; `None` tries every one.
    pub max_servers: Option<usize>,
    pub tls: TlsPolicy,
}

impl Default for ProbeOptions {
    fn default() -> Self {
        Self {
            port: 25,
            helo_domain: None,
            envelope_sender: None,
            connect_timeout: Duration::from_secs(3),
            command_timeout: Duration::from_secs(3),
            max_servers: None,
            tls: TlsPolicy::Opportunistic,
        }
    }
}

impl ProbeOptions {
    /// Name announced in `EHLO`/`HELO`, `localhost` when unset.
    pub fn helo_domain(&self) -> &str {
        self.helo_domain
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or("localhost")
    }

    pub fn envelope_sender(&self) -> &str {
        self.envelope_sender.as_deref().map(str::trim).unwrap_or_default()
    }

    /// How many exchangers the prober may contact, at least one.
    pub fn server_limit(&self) -> usize {
        self.max_servers.unwrap_or(usize::MAX).max(1)
    }

    /// TCP connector matching these options.
    pub fn connector(&self) -> Result<TcpConnector, SmtpError> {
        TcpConnector::new(
            self.port,
            self.connect_timeout,
            self.command_timeout,
            self.tls == TlsPolicy::Required,
        )
    }
}
