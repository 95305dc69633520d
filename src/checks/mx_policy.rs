use std::fmt;
use std::str::FromStr;

use tracing::debug;

use super::{Check, CheckResult, Rejection, resolver_failure};
use crate::address::EmailAddress;
use crate::dns::{DnsError, LookupRecords};
use crate::mx::{MxRecord, sort_by_preference};

/// How a preference-0 MX record is interpreted.
///
/// `PreferenceZero` treats any record with preference 0 as a catch-all
/// marker. It also fires on ordinary domains whose primary exchanger uses
/// preference 0, which is legal. `NullMx` only refuses the RFC 7505 "no
/// service" record (a single `0 .`).
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "with-serde", serde(rename_all = "kebab-case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CatchAllPolicy {
    #[default]
    PreferenceZero,
    NullMx,
    Off,
}

impl fmt::Display for CatchAllPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::PreferenceZero => "preference-zero",
            Self::NullMx => "null-mx",
            Self::Off => "off",
        })
    }
}

impl FromStr for CatchAllPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "preference-zero" => Ok(Self::PreferenceZero),
            "null-mx" => Ok(Self::NullMx),
            "off" => Ok(Self::Off),
            other => Err(format!(
                "unknown catch-all policy '{other}', use: preference-zero|null-mx|off"
            )),
        }
    }
}

impl CatchAllPolicy {
    /// Applies the policy to records already sorted by preference.
    pub fn inspect(&self, records: &[MxRecord]) -> Option<Rejection> {
        match self {
            Self::PreferenceZero => records
                .first()
                .filter(|primary| primary.preference == 0)
                .map(|_| Rejection::CatchAllDetected),
            Self::NullMx => match records {
                [only] if only.is_null() => Some(Rejection::NullMx),
                _ => None,
            },
            Self::Off => None,
        }
    }
}

/// Requires MX records and screens them with a [`CatchAllPolicy`].
pub struct MxPolicyCheck<R> {
    resolver: R,
    policy: CatchAllPolicy,
}

impl<R: LookupRecords> MxPolicyCheck<R> {
    pub fn new(resolver: R, policy: CatchAllPolicy) -> Self {
        Self { resolver, policy }
    }
}

impl<R: LookupRecords> Check for MxPolicyCheck<R> {
    fn name(&self) -> &'static str {
        "mx_policy"
    }

    fn evaluate(&self, address: &EmailAddress) -> CheckResult {
        let mut records = match self.resolver.lookup_mx(&address.ascii_domain) {
            Ok(records) => records,
            Err(DnsError::NotFound { .. }) => {
                return CheckResult::from(Rejection::NoMailExchanger);
            }
            Err(err) => return resolver_failure(self.name(), &err),
        };
        if records.is_empty() {
            return CheckResult::from(Rejection::NoMailExchanger);
        }

        sort_by_preference(&mut records);
        debug!(domain = %address.ascii_domain, ?records, "MX records");

        match self.policy.inspect(&records) {
            Some(rejection) => CheckResult::from(rejection),
            None => CheckResult::pass(),
        }
    }
}
