//! Mailbox probing over SMTP.
//!
//! [`probe_mailbox`] walks the domain's mail exchangers in preference order
//! and asks each one whether it would accept mail for the address, without
//! ever sending `DATA`. The first exchanger that answers `RCPT TO`
//! conclusively decides; address lookup, connection and protocol failures
//! move on to the next candidate. Exchanger addresses come from the same
//! [`LookupRecords`] resolver as the MX records, so every DNS question is
//! bounded by its timeouts.

mod options;
mod types;

pub use options::{ProbeOptions, TlsPolicy};
pub use types::{
    AttemptOutcome, AttemptStage, ProbeReport, ProbeStatus, ServerAttempt, SmtpEvent,
};

use std::net::IpAddr;

use tracing::{debug, info, warn};

use super::{Check, CheckResult, Rejection};
use crate::address::EmailAddress;
use crate::cancel::CancelFlag;
use crate::dns::{DnsError, LookupRecords};
use crate::mx::{MxRecord, sort_by_preference};
use crate::smtp::{Connector, SmtpClient, SmtpError, SmtpReply};

use self::types::AttemptOutcome::{Accepted, ProtocolError, Rejected, Unreachable};
use self::types::AttemptStage as Stage;

/// Service-not-available reply; the server is closing the channel.
const SERVICE_CLOSING: u16 = 421;

/// Probes the mailbox of `address` against its mail exchangers.
pub fn probe_mailbox<R, C>(
    address: &EmailAddress,
    resolver: &R,
    connector: &C,
    options: &ProbeOptions,
    cancel: &CancelFlag,
) -> ProbeReport
where
    R: LookupRecords + ?Sized,
    C: Connector + ?Sized,
{
    let mailbox = address.mailbox();
    let report = |status, attempts| ProbeReport {
        mailbox: mailbox.clone(),
        status,
        attempts,
    };

    let mut records = match resolver.lookup_mx(&address.ascii_domain) {
        Ok(records) if !records.is_empty() => records,
        Ok(_) | Err(DnsError::NotFound { .. }) => {
            return report(ProbeStatus::NoMailServer, Vec::new());
        }
        Err(err) => {
            return report(
                ProbeStatus::ResolverUnavailable {
                    message: err.to_string(),
                },
                Vec::new(),
            );
        }
    };
    sort_by_preference(&mut records);

    let mut attempts = Vec::new();
    for record in records.iter().take(options.server_limit()) {
        if cancel.is_cancelled() {
            return report(ProbeStatus::Cancelled, attempts);
        }
        let attempt = probe_server(resolver, connector, record, &mailbox, options, cancel);
        debug!(
            exchange = %attempt.exchange,
            preference = attempt.preference,
            outcome = %attempt.outcome,
            "probe attempt finished"
        );
        let status = match &attempt.outcome {
            Accepted { reply } => Some(ProbeStatus::Deliverable {
                exchange: attempt.exchange.clone(),
                reply: reply.clone(),
            }),
            Rejected { stage, reply } => Some(ProbeStatus::NotDeliverable {
                exchange: attempt.exchange.clone(),
                stage: *stage,
                reply: reply.clone(),
            }),
            AttemptOutcome::Cancelled => Some(ProbeStatus::Cancelled),
            _ => None,
        };
        attempts.push(attempt);
        if let Some(status) = status {
            return report(status, attempts);
        }
    }

    report(ProbeStatus::Unreachable, attempts)
}

impl ProbeReport {
    /// Folds the report into a pipeline result.
    pub fn to_check_result(&self) -> CheckResult {
        match &self.status {
            ProbeStatus::Deliverable { .. } => CheckResult::pass_with("deliverable"),
            ProbeStatus::NotDeliverable { .. } => CheckResult::from(Rejection::NotDeliverable),
            ProbeStatus::NoMailServer => CheckResult::from(Rejection::NoMailExchanger),
            ProbeStatus::ResolverUnavailable { message } => {
                warn!(stage = "deliverability", error = %message, "DNS lookup failed");
                CheckResult::from(Rejection::ResolverUnavailable)
            }
            ProbeStatus::Unreachable => CheckResult::from(Rejection::ServersUnreachable),
            ProbeStatus::Cancelled => CheckResult::from(Rejection::Cancelled),
        }
    }
}

fn probe_server<R, C>(
    resolver: &R,
    connector: &C,
    record: &MxRecord,
    recipient: &str,
    options: &ProbeOptions,
    cancel: &CancelFlag,
) -> ServerAttempt
where
    R: LookupRecords + ?Sized,
    C: Connector + ?Sized,
{
    let mut attempt = ServerAttempt::new(record);
    if record.exchange.is_empty() {
        attempt.outcome = Unreachable {
            stage: Stage::Connect,
            message: "null MX target".to_string(),
        };
        return attempt;
    }

    let connected = exchange_addresses(resolver, &record.exchange).and_then(|addrs| {
        connector
            .connect(&record.exchange, &addrs)
            .map_err(|err| err.to_string())
    });
    let mut client = match connected {
        Ok(client) => client,
        Err(message) => {
            attempt.events.push(SmtpEvent::Error {
                stage: Stage::Connect,
                message: message.clone(),
            });
            attempt.outcome = Unreachable {
                stage: Stage::Connect,
                message,
            };
            return attempt;
        }
    };
    attempt.address = client.peer();

    attempt.outcome = match converse(&mut client, recipient, options, cancel, &mut attempt.events)
    {
        Ok(outcome) => {
            close(&mut client, &mut attempt.events);
            outcome
        }
        Err(outcome) => outcome,
    };
    attempt
}

/// IPv4 addresses of an exchanger; address literals skip the lookup.
fn exchange_addresses<R: LookupRecords + ?Sized>(
    resolver: &R,
    exchange: &str,
) -> Result<Vec<IpAddr>, String> {
    if let Ok(ip) = exchange.parse::<IpAddr>() {
        return Ok(vec![ip]);
    }
    match resolver.lookup_a(exchange) {
        Ok(addrs) if !addrs.is_empty() => Ok(addrs),
        Ok(_) => Err(DnsError::not_found(exchange).to_string()),
        Err(err) => Err(err.to_string()),
    }
}

/// Runs the conversation up to `RCPT TO`.
///
/// `Ok` means the session is still in step and may be closed politely with
/// `QUIT`; `Err` means the transport failed or the probe was cancelled.
fn converse<S: SmtpClient>(
    client: &mut S,
    recipient: &str,
    options: &ProbeOptions,
    cancel: &CancelFlag,
    events: &mut Vec<SmtpEvent>,
) -> Result<AttemptOutcome, AttemptOutcome> {
    let helo = options.helo_domain();

    let greeting = step(events, Stage::Greeting, cancel, || client.read_greeting())?;
    if !greeting.is_positive_completion() {
        return Ok(unexpected(Stage::Greeting, &greeting));
    }

    let ehlo = step(events, Stage::Ehlo, cancel, || client.ehlo(helo))?;
    let advertises_tls = if ehlo.is_positive_completion() {
        ehlo.has_capability("STARTTLS")
    } else {
        if ehlo.code == SERVICE_CLOSING {
            return Ok(unexpected(Stage::Ehlo, &ehlo));
        }
        let helo_reply = step(events, Stage::Ehlo, cancel, || client.helo(helo))?;
        if !helo_reply.is_positive_completion() {
            return Ok(unexpected(Stage::Ehlo, &helo_reply));
        }
        false
    };

    let upgrade = match options.tls {
        TlsPolicy::Disabled => false,
        TlsPolicy::Opportunistic => advertises_tls,
        TlsPolicy::Required if advertises_tls => true,
        TlsPolicy::Required => {
            return Ok(ProtocolError {
                stage: Stage::StartTls,
                message: "STARTTLS required but not offered".to_string(),
            });
        }
    };
    if upgrade {
        let reply = step(events, Stage::StartTls, cancel, || client.starttls())?;
        if reply.code == 220 {
            let again = step(events, Stage::Ehlo, cancel, || client.ehlo(helo))?;
            if !again.is_positive_completion() {
                return Ok(unexpected(Stage::Ehlo, &again));
            }
        } else if options.tls == TlsPolicy::Required {
            return Ok(unexpected(Stage::StartTls, &reply));
        }
    }

    let sender = options.envelope_sender();
    let mail = step(events, Stage::MailFrom, cancel, || client.mail_from(sender))?;
    if mail.code == SERVICE_CLOSING {
        return Ok(unexpected(Stage::MailFrom, &mail));
    }
    if !mail.is_positive_completion() {
        return Ok(Rejected {
            stage: Stage::MailFrom,
            reply: mail,
        });
    }

    let rcpt = step(events, Stage::RcptTo, cancel, || client.rcpt_to(recipient))?;
    if rcpt.is_positive_completion() {
        Ok(Accepted { reply: rcpt })
    } else if rcpt.code == SERVICE_CLOSING {
        Ok(unexpected(Stage::RcptTo, &rcpt))
    } else {
        Ok(Rejected {
            stage: Stage::RcptTo,
            reply: rcpt,
        })
    }
}

fn step<F>(
    events: &mut Vec<SmtpEvent>,
    stage: AttemptStage,
    cancel: &CancelFlag,
    op: F,
) -> Result<SmtpReply, AttemptOutcome>
where
    F: FnOnce() -> Result<SmtpReply, SmtpError>,
{
    if cancel.is_cancelled() {
        return Err(AttemptOutcome::Cancelled);
    }
    match op() {
        Ok(reply) => {
            events.push(SmtpEvent::Reply {
                stage,
                reply: reply.clone(),
            });
            Ok(reply)
        }
        Err(err) => {
            let message = err.to_string();
            events.push(SmtpEvent::Error {
                stage,
                message: message.clone(),
            });
            Err(match err {
                SmtpError::Protocol(_) => ProtocolError { stage, message },
                _ => Unreachable { stage, message },
            })
        }
    }
}

fn unexpected(stage: AttemptStage, reply: &SmtpReply) -> AttemptOutcome {
    ProtocolError {
        stage,
        message: format!("unexpected reply {} {}", reply.code, reply.message()),
    }
}

fn close<S: SmtpClient>(client: &mut S, events: &mut Vec<SmtpEvent>) {
    let event = match client.quit() {
        Ok(reply) => SmtpEvent::Reply {
            stage: Stage::Quit,
            reply,
        },
        Err(err) => SmtpEvent::Error {
            stage: Stage::Quit,
            message: err.to_string(),
        },
    };
    events.push(event);
}

/// Pipeline stage wrapping [`probe_mailbox`].
pub struct DeliverabilityCheck<R, C> {
    resolver: R,
    connector: C,
    options: ProbeOptions,
    cancel: CancelFlag,
}

impl<R: LookupRecords, C: Connector> DeliverabilityCheck<R, C> {
    pub fn new(resolver: R, connector: C, options: ProbeOptions, cancel: CancelFlag) -> Self {
        Self {
            resolver,
            connector,
            options,
            cancel,
        }
    }
}

impl<R: LookupRecords, C: Connector> Check for DeliverabilityCheck<R, C> {
    fn name(&self) -> &'static str {
        "deliverability"
    }

    fn evaluate(&self, address: &EmailAddress) -> CheckResult {
        let report = probe_mailbox(
            address,
            &self.resolver,
            &self.connector,
            &self.options,
            &self.cancel,
        );
        info!(
            mailbox = %report.mailbox,
            status = %report.status,
            servers = report.attempts.len(),
            "mailbox probe finished"
        );
        report.to_check_result()
    }
}

#[cfg(test)]
mod tests;
