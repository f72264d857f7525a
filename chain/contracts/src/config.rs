//! Contract configuration
//!
//! Loaded from JSON or from environment variables. Unset values fall back
//! to the defaults below; values that are set but unparseable are errors.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::info;

use crate::errors::ConfigError;
use crate::security::GuardScope;

/// Environment variable selecting the overfunding policy.
pub const ENV_OVERFUNDING_POLICY: &str = "CUSTODY_OVERFUNDING_POLICY";
/// Environment variable selecting the guard scope.
pub const ENV_GUARD_SCOPE: &str = "CUSTODY_GUARD_SCOPE";

/// What happens to a contribution that would push a project past its goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverfundingPolicy {
    /// Accept the full amount, even past the goal.
    #[default]
    AcceptAll,
    /// Accept up to the goal and hand the remainder back to the contributor.
    CapAtGoal,
    /// Refuse any contribution that would exceed the goal.
    RejectExcess,
}

impl FromStr for OverfundingPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "accept_all" => Ok(OverfundingPolicy::AcceptAll),
            "cap_at_goal" => Ok(OverfundingPolicy::CapAtGoal),
            "reject_excess" => Ok(OverfundingPolicy::RejectExcess),
            _ => Err(ConfigError::Env {
                key: ENV_OVERFUNDING_POLICY.to_string(),
                value: s.to_string(),
            }),
        }
    }
}

impl FromStr for GuardScope {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "per_entity" => Ok(GuardScope::PerEntity),
            "global" => Ok(GuardScope::Global),
            _ => Err(ConfigError::Env {
                key: ENV_GUARD_SCOPE.to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// Settings shared by the custody contracts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CustodyConfig {
    pub overfunding: OverfundingPolicy,
    pub guard_scope: GuardScope,
}

impl CustodyConfig {
    /// Parse a JSON document; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: CustodyConfig = serde_json::from_str(json)?;
        info!(
            overfunding = ?config.overfunding,
            guard_scope = ?config.guard_scope,
            "Loaded custody config from JSON"
        );
        Ok(config)
    }

    /// Read `CUSTODY_OVERFUNDING_POLICY` and `CUSTODY_GUARD_SCOPE`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let config = Self {
            overfunding: match lookup(ENV_OVERFUNDING_POLICY) {
                Some(raw) => raw.parse()?,
                None => defaults.overfunding,
            },
            guard_scope: match lookup(ENV_GUARD_SCOPE) {
                Some(raw) => raw.parse()?,
                None => defaults.guard_scope,
            },
        };
        info!(
            overfunding = ?config.overfunding,
            guard_scope = ?config.guard_scope,
            "Loaded custody config from environment"
        );
        Ok(config)
    }
}
