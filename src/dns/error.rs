use thiserror::Error;

/// Resolver outcome other than "records found".
///
/// `NotFound` is a definitive negative answer (NXDOMAIN or an empty answer
/// section); `Unavailable` means the question could not be answered
/// (timeout, SERVFAIL, refused, I/O), so nothing is known about the domain.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DnsError {
    #[error("no records found for {name}")]
    NotFound { name: String },
    #[error("lookup for {name} failed: {message}")]
    Unavailable { name: String, message: String },
    #[error("resolver initialization failed: {message}")]
    ResolverInit { message: String },
}

impl DnsError {
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound { name: name.into() }
    }

    pub fn unavailable(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Unavailable {
            name: name.into(),
            message: message.into(),
        }
    }

    pub(crate) fn resolver_init<T: std::fmt::Display>(err: T) -> Self {
        Self::ResolverInit {
            message: err.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
