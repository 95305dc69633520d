use super::{Check, CheckResult};
use crate::address::EmailAddress;

/// Placeholder for an external risk-scoring integration: every address
/// passes. Swap in any other [`Check`] to plug a real signal in.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRiskSignal;

impl Check for NoRiskSignal {
    fn name(&self) -> &'static str {
        "risk"
    }

    fn evaluate(&self, _address: &EmailAddress) -> CheckResult {
        CheckResult::pass()
    }
}
