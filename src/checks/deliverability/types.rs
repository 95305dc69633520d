use std::fmt;

use crate::mx::MxRecord;
use crate::smtp::SmtpReply;

/// Position in the per-server conversation.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptStage {
    Connect,
    Greeting,
    Ehlo,
    StartTls,
    MailFrom,
    RcptTo,
    Quit,
}

impl fmt::Display for AttemptStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Self::Connect => "connect",
            Self::Greeting => "greeting",
            Self::Ehlo => "ehlo",
            Self::StartTls => "starttls",
            Self::MailFrom => "mail-from",
            Self::RcptTo => "rcpt-to",
            Self::Quit => "quit",
        })
    }
}

/// A recorded transcript event used for diagnostics.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SmtpEvent {
    Reply {
        stage: AttemptStage,
        reply: SmtpReply,
    },
    Error {
        stage: AttemptStage,
        message: String,
    },
}

/// Outcome of the conversation with a single mail exchanger.
///
/// `Accepted` and `Rejected` end the probe; `Unreachable` and
/// `ProtocolError` move on to the next exchanger.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    NotAttempted,
    Accepted {
        reply: SmtpReply,
    },
    Rejected {
        stage: AttemptStage,
        reply: SmtpReply,
    },
    Unreachable {
        stage: AttemptStage,
        message: String,
    },
    ProtocolError {
        stage: AttemptStage,
        message: String,
    },
    Cancelled,
}

impl fmt::Display for AttemptOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAttempted => f.write_str("not attempted"),
            Self::Accepted { reply } => write!(f, "accepted ({} {})", reply.code, reply.message()),
            Self::Rejected { stage, reply } => {
                write!(f, "rejected at {stage} ({} {})", reply.code, reply.message())
            }
            Self::Unreachable { stage, message } => write!(f, "unreachable at {stage}: {message}"),
            Self::ProtocolError { stage, message } => {
                write!(f, "protocol error at {stage}: {message}")
            }
            Self::Cancelled => f.write_str("cancelled"),
        }
    }
}

/// Report for one mail exchanger.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerAttempt {
    pub exchange: String,
    pub preference: u16,
    pub address: Option<String>,
    pub events: Vec<SmtpEvent>,
    pub outcome: AttemptOutcome,
}

impl ServerAttempt {
    pub fn new(record: &MxRecord) -> Self {
        Self {
            exchange: record.exchange.clone(),
            preference: record.preference,
            address: None,
            events: Vec::new(),
            outcome: AttemptOutcome::NotAttempted,
        }
    }
}

/// Overall result of probing a mailbox.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeStatus {
    Deliverable { exchange: String, reply: SmtpReply },
    NotDeliverable {
        exchange: String,
        stage: AttemptStage,
        reply: SmtpReply,
    },
    NoMailServer,
    ResolverUnavailable { message: String },
    Unreachable,
    Cancelled,
}

impl fmt::Display for ProbeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Deliverable { exchange, .. } => write!(f, "deliverable (accepted by {exchange})"),
            Self::NotDeliverable {
                exchange, reply, ..
            } => write!(
                f,
                "not deliverable ({exchange} answered {} {})",
                reply.code,
                reply.message()
            ),
            Self::NoMailServer => f.write_str("no MX record"),
            Self::ResolverUnavailable { message } => write!(f, "DNS lookup failed: {message}"),
            Self::Unreachable => f.write_str("could not connect to any mail server"),
            Self::Cancelled => f.write_str("cancelled"),
        }
    }
}

/// Result of [`probe_mailbox`](super::probe_mailbox).
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeReport {
    pub mailbox: String,
    pub status: ProbeStatus,
    pub attempts: Vec<ServerAttempt>,
}
