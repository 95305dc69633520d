//! The pipeline stages.
//!
//! Every stage implements [`Check`] and resolves its own failures (DNS
//! errors, SMTP errors, policy hits) into a [`CheckResult`]; nothing else
//! crosses a stage boundary.

mod blocklist;
pub mod deliverability;
mod dns_existence;
mod mx_policy;
mod risk;
mod types;

pub use blocklist::{Blocklist, BlocklistCheck, BlocklistError};
pub use deliverability::DeliverabilityCheck;
pub use dns_existence::DnsExistenceCheck;
pub use mx_policy::{CatchAllPolicy, MxPolicyCheck};
pub use risk::NoRiskSignal;
pub use types::{CheckResult, Rejection};

use crate::address::EmailAddress;
use crate::dns::DnsError;

/// One stage of the validation pipeline.
pub trait Check {
    /// Stable identifier used in logs and verdicts.
    fn name(&self) -> &'static str;

    fn evaluate(&self, address: &EmailAddress) -> CheckResult;
}

impl<T: Check + ?Sized> Check for &T {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn evaluate(&self, address: &EmailAddress) -> CheckResult {
        (**self).evaluate(address)
    }
}

/// Resolver failures that are not a definitive "absent" answer.
pub(crate) fn resolver_failure(stage: &'static str, err: &DnsError) -> CheckResult {
    tracing::warn!(stage, error = %err, "DNS lookup failed");
    CheckResult::from(Rejection::ResolverUnavailable)
}
