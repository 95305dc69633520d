/// A mail exchanger as returned by the resolver.
///
/// `exchange` is lower-cased without the trailing root dot, so the RFC 7505
/// null target `.` is stored as the empty string.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MxRecord {
    pub preference: u16,
    pub exchange: String,
}

impl MxRecord {
    pub fn new(preference: u16, exchange: impl Into<String>) -> Self {
        Self {
            preference,
            exchange: exchange.into(),
        }
    }

    /// `true` for the RFC 7505 "no service" record (`0 .`).
    pub fn is_null(&self) -> bool {
        self.preference == 0 && self.exchange.is_empty()
    }
}
