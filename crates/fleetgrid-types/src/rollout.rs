//! Rollout strategy configuration and rollout state.
//!
//! Strategy parameters are opaque to the state machine; they are consumed
//! by the external rollout executor. Only the number of steps is derived
//! from them here.

use serde::{Deserialize, Serialize};

/// A count or a percentage string such as `"25%"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IntOrPercent {
    Int(i32),
    Percent(String),
}

impl IntOrPercent {
    /// The percentage value, if this is a well-formed `"N%"` string.
    pub fn percent(&self) -> Option<i32> {
        match self {
            IntOrPercent::Int(_) => None,
            IntOrPercent::Percent(s) => s.trim().strip_suffix('%')?.trim().parse().ok(),
        }
    }

    /// Resolve against `total`, rounding percentages up or down.
    ///
    /// Returns `None` for negative counts or malformed percentages.
    pub fn resolve(&self, total: u32, round_up: bool) -> Option<u32> {
        match self {
            IntOrPercent::Int(n) => u32::try_from(*n).ok(),
            IntOrPercent::Percent(_) => {
                let pct = u64::try_from(self.percent()?).ok()?;
                let scaled = u64::from(total) * pct;
                let value = if round_up { scaled.div_ceil(100) } else { scaled / 100 };
                u32::try_from(value).ok()
            }
        }
    }
}

/// One canary step: shift `weight` percent of traffic, then optionally pause.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanaryStep {
    pub weight: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pause: Option<String>,
}

/// How a placement's configuration moves from one version to the next.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum RolloutStrategy {
    RollingUpdate {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_unavailable: Option<IntOrPercent>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_surge: Option<IntOrPercent>,
    },
    BlueGreen {
        #[serde(default)]
        auto_promotion: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        scale_down_delay: Option<String>,
    },
    Canary {
        #[serde(default)]
        steps: Vec<CanaryStep>,
    },
}

impl Default for RolloutStrategy {
    fn default() -> Self {
        Self::RollingUpdate {
            max_unavailable: None,
            max_surge: None,
        }
    }
}

/// Phase of a rollout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RolloutPhase {
    #[default]
    Pending,
    InProgress,
    Paused,
    Completed,
    Failed,
    Aborted,
}

impl RolloutPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Aborted)
    }
}

impl std::fmt::Display for RolloutPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "Pending",
            Self::InProgress => "InProgress",
            Self::Paused => "Paused",
            Self::Completed => "Completed",
            Self::Failed => "Failed",
            Self::Aborted => "Aborted",
        };
        f.write_str(s)
    }
}

/// Observed progress of a rollout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RolloutState {
    pub phase: RolloutPhase,
    pub current_step: u32,
    pub total_steps: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_resolves_with_rounding() {
        let quarter = IntOrPercent::Percent("25%".to_string());
        assert_eq!(quarter.resolve(10, true), Some(3));
        assert_eq!(quarter.resolve(10, false), Some(2));
        assert_eq!(IntOrPercent::Int(4).resolve(10, true), Some(4));
    }

    #[test]
    fn malformed_values_do_not_resolve() {
        assert_eq!(IntOrPercent::Percent("lots".to_string()).resolve(10, true), None);
        assert_eq!(IntOrPercent::Int(-1).resolve(10, true), None);
    }

    #[test]
    fn strategy_is_tagged_on_the_wire() {
        let strategy = RolloutStrategy::RollingUpdate {
            max_unavailable: Some(IntOrPercent::Int(1)),
            max_surge: Some(IntOrPercent::Percent("25%".to_string())),
        };
        let json = serde_json::to_string(&strategy).unwrap();
        assert_eq!(
            json,
            r#"{"type":"RollingUpdate","maxUnavailable":1,"maxSurge":"25%"}"#
        );
    }

    #[test]
    fn phases_serialize_as_bare_names() {
        assert_eq!(
            serde_json::to_string(&RolloutPhase::InProgress).unwrap(),
            r#""InProgress""#
        );
        assert!(RolloutPhase::Aborted.is_terminal());
        assert!(!RolloutPhase::Paused.is_terminal());
    }
}
