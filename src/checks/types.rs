use std::fmt;

/// Why an address was judged undeliverable. `Display` is the reason shown to
/// the caller.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    MalformedAddress,
    Blocklisted,
    DomainNotFound,
    ResolverUnavailable,
    NoMailExchanger,
    CatchAllDetected,
    NullMx,
    NotDeliverable,
    ServersUnreachable,
    Cancelled,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::MalformedAddress => "malformed email address",
            Self::Blocklisted => "domain is disposable/blocklisted",
            Self::DomainNotFound => "no DNS entry",
            Self::ResolverUnavailable => "DNS lookup failed",
            Self::NoMailExchanger => "no MX record",
            Self::CatchAllDetected => "catch-all detected",
            Self::NullMx => "domain does not accept mail (null MX)",
            Self::NotDeliverable => "not deliverable",
            Self::ServersUnreachable => "could not connect to any mail server",
            Self::Cancelled => "validation cancelled",
        })
    }
}

/// Result of one stage.
///
/// A passing result carries an empty or purely informational reason; a
/// failing one always carries a non-empty reason and, when it maps onto the
/// known taxonomy, the [`Rejection`] kind.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckResult {
    valid: bool,
    reason: String,
    rejection: Option<Rejection>,
}

impl CheckResult {
    pub fn pass() -> Self {
        Self {
            valid: true,
            reason: String::new(),
            rejection: None,
        }
    }

    pub fn pass_with(info: impl Into<String>) -> Self {
        Self {
            valid: true,
            reason: info.into(),
            rejection: None,
        }
    }

    /// A failure outside the built-in taxonomy, e.g. from a custom risk
    /// check. An empty reason is replaced by a generic one.
    pub fn fail(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        let reason = if reason.trim().is_empty() {
            "rejected".to_string()
        } else {
            reason
        };
        Self {
            valid: false,
            reason,
            rejection: None,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn rejection(&self) -> Option<Rejection> {
        self.rejection
    }
}

impl From<Rejection> for CheckResult {
    fn from(rejection: Rejection) -> Self {
        Self {
            valid: false,
            reason: rejection.to_string(),
            rejection: Some(rejection),
        }
    }
}
