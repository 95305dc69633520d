use std::net::IpAddr;
use std::time::Duration;

use trust_dns_resolver::{
    Resolver,
    config::{LookupIpStrategy, ResolverOpts},
    error::{ResolveError, ResolveErrorKind},
    system_conf::read_system_conf,
};

use super::DnsError;
use crate::mx::{MxRecord, normalize_exchange};

/// The two questions the checks ask DNS.
///
/// Implementations must map a definitive negative answer to
/// [`DnsError::NotFound`] and every other failure to
/// [`DnsError::Unavailable`].
pub trait LookupRecords {
    fn lookup_a(&self, domain: &str) -> Result<Vec<IpAddr>, DnsError>;
    fn lookup_mx(&self, domain: &str) -> Result<Vec<MxRecord>, DnsError>;
}

impl<T: LookupRecords + ?Sized> LookupRecords for &T {
    fn lookup_a(&self, domain: &str) -> Result<Vec<IpAddr>, DnsError> {
        (**self).lookup_a(domain)
    }

    fn lookup_mx(&self, domain: &str) -> Result<Vec<MxRecord>, DnsError> {
        (**self).lookup_mx(domain)
    }
}

/// A resolver that could not be built answers every question with the
/// construction error.
impl<T: LookupRecords> LookupRecords for Result<T, DnsError> {
    fn lookup_a(&self, domain: &str) -> Result<Vec<IpAddr>, DnsError> {
        match self {
            Ok(resolver) => resolver.lookup_a(domain),
            Err(err) => Err(err.clone()),
        }
    }

    fn lookup_mx(&self, domain: &str) -> Result<Vec<MxRecord>, DnsError> {
        match self {
            Ok(resolver) => resolver.lookup_mx(domain),
            Err(err) => Err(err.clone()),
        }
    }
}

/// Timeout knobs applied on top of the system resolver configuration.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsOptions {
    pub timeout: Duration,
    pub attempts: usize,
}

impl Default for DnsOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(3),
            attempts: 2,
        }
    }
}

/// Synchronous resolver built from `/etc/resolv.conf` (or the platform
/// equivalent). Each instance owns its own cache, so one is built per
/// validation.
pub struct SystemResolver {
    inner: Resolver,
}

impl SystemResolver {
    pub fn from_system_conf(options: &DnsOptions) -> Result<Self, DnsError> {
        let (config, mut opts): (_, ResolverOpts) =
            read_system_conf().map_err(DnsError::resolver_init)?;
        opts.timeout = options.timeout;
        opts.attempts = options.attempts.max(1);
        opts.ip_strategy = LookupIpStrategy::Ipv4Only;
        let inner = Resolver::new(config, opts).map_err(DnsError::resolver_init)?;
        Ok(Self { inner })
    }
}

impl LookupRecords for SystemResolver {
    fn lookup_a(&self, domain: &str) -> Result<Vec<IpAddr>, DnsError> {
        let lookup = self
            .inner
            .lookup_ip(fqdn(domain))
            .map_err(|err| classify(domain, err))?;
        Ok(lookup.iter().filter(IpAddr::is_ipv4).collect())
    }

    fn lookup_mx(&self, domain: &str) -> Result<Vec<MxRecord>, DnsError> {
        let lookup = self
            .inner
            .mx_lookup(fqdn(domain))
            .map_err(|err| classify(domain, err))?;
        let mut records = Vec::new();
        for mx in lookup.iter() {
            let exchange = normalize_exchange(&mx.exchange().to_utf8());
            records.push(MxRecord::new(mx.preference(), exchange));
        }
        Ok(records)
    }
}

/// Absolute name, so resolv.conf search domains are never appended.
pub(crate) fn fqdn(domain: &str) -> String {
    let trimmed = domain.trim().trim_end_matches('.');
    format!("{trimmed}.")
}

fn classify(domain: &str, err: ResolveError) -> DnsError {
    match err.kind() {
        ResolveErrorKind::NoRecordsFound { .. } => DnsError::not_found(domain),
        _ => DnsError::unavailable(domain, err.to_string()),
    }
}
