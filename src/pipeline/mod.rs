//! Ordered, short-circuiting validation.
//!
//! A [`Pipeline`] owns a list of [`Check`]s and runs them in order; the
//! first failing check decides the [`Verdict`] and later checks never run.
//! [`Pipeline::from_config`] builds the list from a [`PipelineConfig`], so
//! stages can be reordered or dropped without touching this code.

mod config;

pub use config::{PipelineConfig, StageKind};

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::address::EmailAddress;
use crate::cancel::CancelFlag;
use crate::checks::{
    Blocklist, BlocklistCheck, Check, CheckResult, DeliverabilityCheck, DnsExistenceCheck,
    MxPolicyCheck, NoRiskSignal, Rejection,
};
use crate::dns::{LookupRecords, SystemResolver};
use crate::smtp::{Connector, SmtpError, TcpConnector};

/// Final answer for one address. `message` is empty when valid.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub is_valid: bool,
    pub message: String,
    /// Stage that rejected the address.
    pub stage: Option<&'static str>,
    pub rejection: Option<Rejection>,
}

impl Verdict {
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            message: String::new(),
            stage: None,
            rejection: None,
        }
    }

    pub fn rejected(stage: &'static str, result: &CheckResult) -> Self {
        Self {
            is_valid: false,
            message: result.reason().to_string(),
            stage: Some(stage),
            rejection: result.rejection(),
        }
    }

    pub fn malformed() -> Self {
        Self {
            is_valid: false,
            message: Rejection::MalformedAddress.to_string(),
            stage: None,
            rejection: Some(Rejection::MalformedAddress),
        }
    }
}

pub struct Pipeline<'a> {
    checks: Vec<Box<dyn Check + 'a>>,
    cancel: CancelFlag,
}

impl<'a> Pipeline<'a> {
    pub fn new(checks: Vec<Box<dyn Check + 'a>>) -> Self {
        Self {
            checks,
            cancel: CancelFlag::new(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Builds the stage list described by `config` over the given resolver
    /// and connector.
    pub fn from_config<R, C>(
        config: &PipelineConfig,
        blocklist: &'a Blocklist,
        resolver: &'a R,
        connector: &'a C,
        cancel: CancelFlag,
    ) -> Self
    where
        R: LookupRecords + ?Sized,
        C: Connector + ?Sized,
    {
        let checks = config
            .effective_stages()
            .into_iter()
            .map(|kind| -> Box<dyn Check + 'a> {
                match kind {
                    StageKind::Blocklist => Box::new(BlocklistCheck::new(blocklist)),
                    StageKind::DnsExistence => Box::new(DnsExistenceCheck::new(resolver)),
                    StageKind::Risk => Box::new(NoRiskSignal),
                    StageKind::MxPolicy => {
                        Box::new(MxPolicyCheck::new(resolver, config.catch_all_policy))
                    }
                    StageKind::Deliverability => Box::new(DeliverabilityCheck::new(
                        resolver,
                        connector,
                        config.probe.clone(),
                        cancel.clone(),
                    )),
                }
            })
            .collect();
        Self::new(checks).with_cancel(cancel)
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.checks.iter().map(|check| check.name()).collect()
    }

    /// Runs every stage in order and stops at the first rejection.
    pub fn run(&self, address: &EmailAddress) -> Verdict {
        for check in &self.checks {
            let stage = check.name();
            if self.cancel.is_cancelled() {
                info!(email = %address.original, stage, "validation cancelled");
                return Verdict::rejected(stage, &CheckResult::from(Rejection::Cancelled));
            }
            let result = check.evaluate(address);
            debug!(stage, valid = result.is_valid(), reason = result.reason(), "stage finished");
            if !result.is_valid() {
                info!(
                    email = %address.original,
                    stage,
                    reason = result.reason(),
                    "address rejected"
                );
                return Verdict::rejected(stage, &result);
            }
        }
        info!(email = %address.original, "address accepted");
        Verdict::valid()
    }

    /// Parses `input` and runs the pipeline. No stage runs for a malformed
    /// address.
    pub fn verify(&self, input: &str) -> Verdict {
        match EmailAddress::parse(input) {
            Ok(address) => self.run(&address),
            Err(err) => {
                debug!(input, error = %err, "malformed address");
                Verdict::malformed()
            }
        }
    }
}

/// Something that can judge an address; the HTTP layer holds one of these.
pub trait EmailValidator: Send + Sync {
    fn validate(&self, input: &str, cancel: &CancelFlag) -> Verdict;
}

impl<F> EmailValidator for F
where
    F: Fn(&str, &CancelFlag) -> Verdict + Send + Sync,
{
    fn validate(&self, input: &str, cancel: &CancelFlag) -> Verdict {
        self(input, cancel)
    }
}

/// Production validator: system DNS configuration and real SMTP sockets.
///
/// A fresh resolver (and so a fresh DNS cache) is built for every call; the
/// blocklist and TLS connector are shared.
pub struct SystemValidator {
    config: PipelineConfig,
    blocklist: Arc<Blocklist>,
    connector: TcpConnector,
}

impl SystemValidator {
    pub fn new(config: PipelineConfig, blocklist: Arc<Blocklist>) -> Result<Self, SmtpError> {
        let connector = config.probe.connector()?;
        Ok(Self {
            config,
            blocklist,
            connector,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }
}

impl EmailValidator for SystemValidator {
    fn validate(&self, input: &str, cancel: &CancelFlag) -> Verdict {
        let address = match EmailAddress::parse(input) {
            Ok(address) => address,
            Err(err) => {
                debug!(input, error = %err, "malformed address");
                return Verdict::malformed();
            }
        };
        // A failed resolver still runs the pipeline so the blocklist gets
        // its turn; the first DNS stage reports the failure.
        let resolver = SystemResolver::from_system_conf(&self.config.dns)
            .inspect_err(|err| warn!(error = %err, "resolver unavailable"));
        Pipeline::from_config(
            &self.config,
            &self.blocklist,
            &resolver,
            &self.connector,
            cancel.clone(),
        )
        .run(&address)
    }
}
