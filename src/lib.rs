#![forbid(unsafe_code)]
//! mailprobe_lib: e-mail deliverability pipeline (blocklist, DNS, MX policy,
//! SMTP probe), plus the HTTP front end behind the `server` feature.

pub mod address;
pub mod cancel;
pub mod checks;
pub mod dns;
pub mod mx;
pub mod pipeline;
pub mod smtp;

#[cfg(feature = "server")]
pub mod server;

pub use address::{AddressError, EmailAddress, SyntaxReport, ValidationMode, check_syntax};
pub use cancel::{CancelFlag, CancelOnDrop};
pub use checks::deliverability::{
    AttemptOutcome, AttemptStage, ProbeOptions, ProbeReport, ProbeStatus, ServerAttempt,
    SmtpEvent, TlsPolicy, probe_mailbox,
};
pub use checks::{Blocklist, BlocklistError, CatchAllPolicy, Check, CheckResult, Rejection};
pub use dns::{DnsError, DnsOptions, LookupRecords, SystemResolver};
pub use mx::{MxRecord, sort_by_preference};
pub use pipeline::{
    EmailValidator, Pipeline, PipelineConfig, StageKind, SystemValidator, Verdict,
};
pub use smtp::{Connector, SmtpClient, SmtpError, SmtpReply, TcpConnector};
