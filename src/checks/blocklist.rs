use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use super::{Check, CheckResult, Rejection};
use crate::address::{EmailAddress, ascii_domain};

include!(concat!(env!("OUT_DIR"), "/disposable_domains.rs"));

#[derive(Debug, Error)]
pub enum BlocklistError {
    #[error("failed to read blocklist {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Set of domains whose addresses are refused outright.
///
/// Built once at startup and only read afterwards; share it behind an `Arc`
/// and never mutate it once validations are running.
#[derive(Debug, Clone, Default)]
pub struct Blocklist {
    builtin: bool,
    extra: HashSet<String>,
}

impl Blocklist {
    /// The compiled-in disposable-provider list.
    pub fn builtin() -> Self {
        Self {
            builtin: true,
            extra: HashSet::new(),
        }
    }

    /// No domain is blocked.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_domains<I, S>(mut self, domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for domain in domains {
            if let Some(normalized) = normalize(domain.as_ref()) {
                self.extra.insert(normalized);
            }
        }
        self
    }

    /// Adds the domains listed in `path`: one per line, blank lines and
    /// `#` comments ignored.
    pub fn with_file(self, path: &Path) -> Result<Self, BlocklistError> {
        let content = fs::read_to_string(path).map_err(|source| BlocklistError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let before = self.extra.len();
        let list = self.with_domains(
            content
                .lines()
                .map(|line| line.split('#').next().unwrap_or_default().trim())
                .filter(|line| !line.is_empty()),
        );
        info!(
            path = %path.display(),
            added = list.extra.len() - before,
            "blocklist file loaded"
        );
        Ok(list)
    }

    pub fn contains(&self, domain: &str) -> bool {
        let Some(normalized) = normalize(domain) else {
            return false;
        };
        (self.builtin && BUILTIN.contains(normalized.as_str())) || self.extra.contains(&normalized)
    }

    pub fn len(&self) -> usize {
        let builtin = if self.builtin { BUILTIN.len() } else { 0 };
        builtin + self.extra.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn normalize(domain: &str) -> Option<String> {
    ascii_domain(domain)
}

/// Refuses addresses whose domain is on the [`Blocklist`]. No I/O.
pub struct BlocklistCheck<'a> {
    blocklist: &'a Blocklist,
}

impl<'a> BlocklistCheck<'a> {
    pub fn new(blocklist: &'a Blocklist) -> Self {
        Self { blocklist }
    }
}

impl Check for BlocklistCheck<'_> {
    fn name(&self) -> &'static str {
        "blocklist"
    }

    fn evaluate(&self, address: &EmailAddress) -> CheckResult {
        if self.blocklist.contains(&address.ascii_domain) {
            CheckResult::from(Rejection::Blocklisted)
        } else {
            CheckResult::pass()
        }
    }
}
