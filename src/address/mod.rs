//! Address splitting and the boundary syntax check.

mod domain;
mod local;
mod types;

pub use types::{AddressError, EmailAddress, SyntaxReport, ValidationMode};

pub(crate) use domain::to_ascii as ascii_domain;
use domain::check_domain;
use local::{is_local_relaxed, is_local_strict};

impl EmailAddress {
    /// Splits `input` on its first `@`.
    ///
    /// This is the defensive contract of the pipeline: callers are expected
    /// to run [`check_syntax`] first, but anything that cannot be split into
    /// a non-empty local part and a resolvable-looking domain is rejected
    /// here rather than sent to DNS.
    pub fn parse(input: &str) -> Result<Self, AddressError> {
        let trimmed = input.trim();
        let Some((local, domain)) = trimmed.split_once('@') else {
            return Err(AddressError::malformed("missing '@'"));
        };
        if local.is_empty() {
            return Err(AddressError::malformed("empty local part"));
        }
        if domain.is_empty() {
            return Err(AddressError::malformed("empty domain"));
        }
        if domain.contains('@') {
            return Err(AddressError::malformed("domain contains '@'"));
        }
        let ascii_domain = domain::to_ascii(domain)
            .ok_or_else(|| AddressError::malformed("domain punycode conversion failed"))?;

        Ok(Self {
            original: input.to_string(),
            local: local.to_string(),
            domain: domain.to_lowercase(),
            ascii_domain,
        })
    }
}

/// RFC 5321/5322 subset check: lengths, a single `@`, local part rules per
/// `mode`, and DNS label rules on the domain.
pub fn check_syntax(email: &str, mode: ValidationMode) -> SyntaxReport {
    let input = email.trim();

    let mut reasons = Vec::new();

    if input.len() > 254 {
        reasons.push(format!("total length {} > 254", input.len()));
    }

    let parts: Vec<&str> = input.split('@').collect();
    let (local, domain) = match parts.as_slice() {
        [local, domain] => (*local, *domain),
        // a quoted local part may legitimately carry '@'
        _ if mode == ValidationMode::Relaxed && input.starts_with('"') => {
            match input.rsplit_once('@') {
                Some(split) => split,
                None => ("", ""),
            }
        }
        _ => {
            reasons.push("must contain exactly one '@'".to_string());
            return SyntaxReport { ok: false, reasons };
        }
    };

    if local.is_empty() || local.len() > 64 {
        reasons.push(format!(
            "local part length {} invalid (1..=64)",
            local.len()
        ));
    }

    check_domain(domain, &mut reasons);

    let local_ok = match mode {
        ValidationMode::Strict => is_local_strict(local),
        ValidationMode::Relaxed => is_local_relaxed(local),
    };
    if !local_ok {
        reasons.push(match mode {
            ValidationMode::Strict => "invalid local part (strict rules)".into(),
            ValidationMode::Relaxed => "invalid local part (relaxed rules)".into(),
        });
    }

    SyntaxReport {
        ok: reasons.is_empty(),
        reasons,
    }
}
