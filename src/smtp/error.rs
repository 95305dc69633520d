use thiserror::Error;

#[derive(Debug, Error)]
pub enum SmtpError {
    #[error("no socket address resolved for {host}")]
    NoAddress { host: String },
    #[error("connection to {host} failed: {source}")]
    Connect {
        host: String,
        #[source]
        source: std::io::Error,
    },
    #[error("I/O error: {source}")]
    Io {
        #[source]
        source: std::io::Error,
    },
    #[error("TLS setup failed: {source}")]
    Tls {
        #[source]
        source: native_tls::Error,
    },
    #[error("TLS handshake with {host} failed: {message}")]
    Handshake { host: String, message: String },
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl SmtpError {
    pub(crate) fn io(source: std::io::Error) -> Self {
        Self::Io { source }
    }

    pub(crate) fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }
}
