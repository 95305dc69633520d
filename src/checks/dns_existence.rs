use tracing::debug;

use super::{Check, CheckResult, Rejection, resolver_failure};
use crate::address::EmailAddress;
use crate::dns::{DnsError, LookupRecords};

/// Requires the domain to resolve to at least one IPv4 address.
pub struct DnsExistenceCheck<R> {
    resolver: R,
}

impl<R: LookupRecords> DnsExistenceCheck<R> {
    pub fn new(resolver: R) -> Self {
        Self { resolver }
    }
}

impl<R: LookupRecords> Check for DnsExistenceCheck<R> {
    fn name(&self) -> &'static str {
        "dns_existence"
    }

    fn evaluate(&self, address: &EmailAddress) -> CheckResult {
        match self.resolver.lookup_a(&address.ascii_domain) {
            Ok(addrs) if !addrs.is_empty() => {
                debug!(domain = %address.ascii_domain, count = addrs.len(), "A records found");
                CheckResult::pass()
            }
            Ok(_) | Err(DnsError::NotFound { .. }) => CheckResult::from(Rejection::DomainNotFound),
            Err(err) => resolver_failure(self.name(), &err),
        }
    }
}
