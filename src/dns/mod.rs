//! Resolver seam used by the DNS-backed checks.
//!
//! [`LookupRecords`] is the only way the pipeline talks to DNS, so every
//! check can be exercised against a scripted resolver. [`SystemResolver`] is
//! the production implementation on `trust-dns-resolver`.

mod error;
mod resolver;

pub use error::DnsError;
pub use resolver::{DnsOptions, LookupRecords, SystemResolver};

#[cfg(test)]
pub(crate) mod stub;
