//! Sticky bindings and session-binding constraints.

use serde::{Deserialize, Serialize};

use crate::meta::Object;
use crate::selector::LabelSelector;
use crate::session::StickinessType;

/// Bounds for [`StickyBindingSpec::weight`].
pub const BINDING_WEIGHT_MIN: i32 = 0;
pub const BINDING_WEIGHT_MAX: i32 = 100;
/// Bounds for [`SessionBindingConstraintSpec::max_violations`].
pub const MAX_VIOLATIONS_MIN: i32 = 0;
pub const MAX_VIOLATIONS_MAX: i32 = 100;

// ── Sticky binding ────────────────────────────────────────────────

/// When and how often a binding extends itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoRenewalPolicy {
    #[serde(default)]
    pub enabled: bool,
    /// Renew once the remaining lifetime drops to this percent. `0` renews any time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub renewal_threshold_percent: Option<i32>,
    /// Renewal cap; `0` means unlimited.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_renewals: Option<i32>,
}

/// Which binding survives when two bindings claim the same session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConflictResolutionStrategy {
    #[default]
    FirstWins,
    LastWins,
    HighestWeight,
    /// Neither binding is superseded; an operator decides.
    Manual,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictResolutionPolicy {
    #[serde(default)]
    pub strategy: ConflictResolutionStrategy,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StickyBindingSpec {
    pub session_identifier: String,
    pub target_cluster: String,
    #[serde(default)]
    pub binding_type: StickinessType,
    /// Weight in `[0, 100]`; unset and zero are equivalent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<i32>,
    /// Unix seconds when the session was first observed.
    #[serde(default)]
    pub created_at: u64,
    /// Unix seconds after which the binding is inert.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_renewal: Option<AutoRenewalPolicy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conflict_resolution: Option<ConflictResolutionPolicy>,
}

/// Lifecycle phase of a binding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BindingPhase {
    #[default]
    Active,
    Expired,
    Superseded,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StickyBindingStatus {
    #[serde(default)]
    pub phase: BindingPhase,
    #[serde(default)]
    pub renewals: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_renewed_at: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub superseded_by: Option<String>,
}

pub type StickyBinding = Object<StickyBindingSpec, StickyBindingStatus>;

// ── Session binding constraint ────────────────────────────────────

/// What a [`SessionBindingConstraintSpec`] limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConstraintType {
    /// Caps active bindings landing on the target.
    MaxBindings,
    /// Caps active bindings held by one session within the target.
    MaxBindingsPerSession,
    /// A session may be bound to at most one cluster within the target.
    ExclusiveBinding,
}

/// What kind of entity a [`ConstraintTarget`] names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetType {
    Cluster,
    Session,
    Workload,
}

/// The entities a constraint or exemption applies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstraintTarget {
    #[serde(rename = "type")]
    pub target_type: TargetType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<LabelSelector>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub names: Vec<String>,
}

impl ConstraintTarget {
    pub fn named<S: Into<String>>(target_type: TargetType, names: impl IntoIterator<Item = S>) -> Self {
        Self {
            target_type,
            selector: None,
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// True iff neither a selector nor any name is given.
    pub fn is_empty(&self) -> bool {
        self.selector.as_ref().is_none_or(LabelSelector::is_empty) && self.names.is_empty()
    }
}

/// Condition that must currently hold for an exemption to apply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum ExemptionCondition {
    /// Target cluster health score is strictly below `score`.
    HealthBelow { score: i32 },
    /// Target cluster load percent is strictly above `percent`.
    LoadAbove { percent: i32 },
    /// Target cluster is under maintenance.
    Maintenance,
    /// Check time lies in `[start, end)` (unix seconds).
    TimeWindow { start: u64, end: u64 },
}

/// A named, justified exception to a constraint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstraintExemption {
    pub name: String,
    pub reason: String,
    /// Narrows the exemption; `None` inherits the constraint target.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<ConstraintTarget>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<u64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<ExemptionCondition>,
}

/// What happens when a binding violates the constraint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnforcementAction {
    #[default]
    Deny,
    Warn,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionBindingConstraintSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraint_type: Option<ConstraintType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<ConstraintTarget>,
    /// Active-binding cap for the target; `0` means no cap.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_bindings: Option<i32>,
    /// Active-binding cap per session; `0` means no cap.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_bindings_per_session: Option<i32>,
    /// Violations tolerated before enforcement kicks in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_violations: Option<i32>,
    #[serde(default)]
    pub enforcement: EnforcementAction,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exemptions: Vec<ConstraintExemption>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionBindingConstraintStatus {
    #[serde(default)]
    pub observed_generation: u64,
    /// Violations recorded so far, tolerated or not.
    #[serde(default)]
    pub violation_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_violation_at: Option<u64>,
}

pub type SessionBindingConstraint = Object<SessionBindingConstraintSpec, SessionBindingConstraintStatus>;
