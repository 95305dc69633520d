use thiserror::Error;

#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "with-serde", serde(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidationMode {
    #[default]
    Strict,
    Relaxed,
}

/// Outcome of the RFC-subset syntax check run at the service boundary.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxReport {
    pub ok: bool,
    pub reasons: Vec<String>,
}

/// An address split into its local part and domain.
///
/// `domain` keeps the caller's spelling (lower-cased); `ascii_domain` is the
/// IDNA form used for every DNS and SMTP interaction.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailAddress {
    pub original: String,
    pub local: String,
    pub domain: String,
    pub ascii_domain: String,
}

impl EmailAddress {
    /// `local@ascii_domain`, the form sent in `RCPT TO`.
    pub fn mailbox(&self) -> String {
        format!("{}@{}", self.local, self.ascii_domain)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("malformed address: {reason}")]
    Malformed { reason: String },
}

impl AddressError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Self::Malformed {
            reason: reason.into(),
        }
    }
}
