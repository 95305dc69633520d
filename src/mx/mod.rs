//! MX record model and mail-routing order.

mod types;

pub use types::MxRecord;

/// Orders records by ascending preference. The sort is stable: records with
/// equal preference keep the order the resolver returned them in.
pub fn sort_by_preference(records: &mut [MxRecord]) {
    records.sort_by_key(|record| record.preference);
}

pub(crate) fn normalize_exchange(exchange: &str) -> String {
    let trimmed = exchange.trim_end_matches('.');
    trimmed.to_ascii_lowercase()
}
