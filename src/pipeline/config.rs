use std::fmt;
use std::str::FromStr;

use crate::address::ValidationMode;
use crate::checks::CatchAllPolicy;
use crate::checks::deliverability::ProbeOptions;
use crate::dns::DnsOptions;

/// A pipeline stage, in the order it should run.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "with-serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageKind {
    Blocklist,
    DnsExistence,
    Risk,
    MxPolicy,
    Deliverability,
}

impl StageKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Blocklist => "blocklist",
            Self::DnsExistence => "dns_existence",
            Self::Risk => "risk",
            Self::MxPolicy => "mx_policy",
            Self::Deliverability => "deliverability",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StageKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().replace('-', "_").as_str() {
            "blocklist" => Ok(Self::Blocklist),
            "dns_existence" | "dns" => Ok(Self::DnsExistence),
            "risk" => Ok(Self::Risk),
            "mx_policy" | "mx" => Ok(Self::MxPolicy),
            "deliverability" | "smtp" => Ok(Self::Deliverability),
            other => Err(format!("unknown stage '{other}'")),
        }
    }
}

/// Everything that shapes one validation.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    pub stages: Vec<StageKind>,
    /// Appends the SMTP probe after the configured stages.
    pub deliverability: bool,
    pub catch_all_policy: CatchAllPolicy,
    pub dns: DnsOptions,
    pub probe: ProbeOptions,
    /// Local-part rules applied at the service boundary.
    pub syntax_mode: ValidationMode,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            stages: vec![
                StageKind::Blocklist,
                StageKind::DnsExistence,
                StageKind::Risk,
                StageKind::MxPolicy,
            ],
            deliverability: false,
            catch_all_policy: CatchAllPolicy::default(),
            dns: DnsOptions::default(),
            probe: ProbeOptions::default(),
            syntax_mode: ValidationMode::default(),
        }
    }
}

impl PipelineConfig {
    /// Stage order actually run: `stages`, plus deliverability at the end
    /// when enabled and not already listed.
    pub fn effective_stages(&self) -> Vec<StageKind> {
        let mut stages = self.stages.clone();
        if self.deliverability && !stages.contains(&StageKind::Deliverability) {
            stages.push(StageKind::Deliverability);
        }
        stages
    }
}
