use std::cell::Cell;
use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr};

use super::{DnsError, LookupRecords};
use crate::mx::MxRecord;

/// Scripted resolver for tests. Unknown names answer `NotFound`; every call
/// is counted so short-circuit behaviour can be asserted.
#[derive(Default)]
pub(crate) struct StubResolver {
    a_records: HashMap<String, Result<Vec<IpAddr>, DnsError>>,
    mx_records: HashMap<String, Result<Vec<MxRecord>, DnsError>>,
    pub a_calls: Cell<usize>,
    pub mx_calls: Cell<usize>,
}

impl StubResolver {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// A domain with one A record and the given MX records.
    pub(crate) fn with_domain(mut self, domain: &str, mx: Vec<MxRecord>) -> Self {
        self.a_records.insert(
            domain.to_string(),
            Ok(vec![IpAddr::V4(Ipv4Addr::new(192, 0, 2, 10))]),
        );
        self.mx_records.insert(domain.to_string(), Ok(mx));
        self
    }

    /// Like [`StubResolver::with_domain`], and every named exchanger gets an
    /// address of its own (`192.0.2.1`, `192.0.2.2`, ...).
    pub(crate) fn with_exchangers(mut self, domain: &str, mx: Vec<MxRecord>) -> Self {
        for (n, record) in mx.iter().filter(|r| !r.exchange.is_empty()).enumerate() {
            let host = u8::try_from(n + 1).unwrap_or(u8::MAX);
            self.a_records.insert(
                record.exchange.clone(),
                Ok(vec![IpAddr::V4(Ipv4Addr::new(192, 0, 2, host))]),
            );
        }
        self.with_domain(domain, mx)
    }

    pub(crate) fn with_a(mut self, domain: &str, answer: Result<Vec<IpAddr>, DnsError>) -> Self {
        self.a_records.insert(domain.to_string(), answer);
        self
    }

    pub(crate) fn with_mx(mut self, domain: &str, answer: Result<Vec<MxRecord>, DnsError>) -> Self {
        self.mx_records.insert(domain.to_string(), answer);
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.a_calls.get() + self.mx_calls.get()
    }
}

impl LookupRecords for StubResolver {
    fn lookup_a(&self, domain: &str) -> Result<Vec<IpAddr>, DnsError> {
        self.a_calls.set(self.a_calls.get() + 1);
        self.a_records
            .get(domain)
            .cloned()
            .unwrap_or_else(|| Err(DnsError::not_found(domain)))
    }

    fn lookup_mx(&self, domain: &str) -> Result<Vec<MxRecord>, DnsError> {
        self.mx_calls.set(self.mx_calls.get() + 1);
        self.mx_records
            .get(domain)
            .cloned()
            .unwrap_or_else(|| Err(DnsError::not_found(domain)))
    }
}
