//! fleetgrid-validate — admission validators for FleetGrid policies.
//!
//! Each validator inspects one object and returns every violation it
//! finds as a [`FieldError`] (field path + message). Nothing short-circuits
//! on the first error, so callers can show every problem in one pass.
//! [`aggregate`] folds a list into a single [`ValidationError`].
//!
//! Validators are read-only. Bounds are inclusive, and a zero on an
//! optional bounded field always means "unset".

pub mod affinity;
pub mod binding;
pub mod common;
pub mod field;
pub mod health;
pub mod placement;
pub mod session;

use tracing::debug;

use fleetgrid_types::{
    SessionAffinityPolicy, SessionBindingConstraint, StickyBinding, WorkloadHealthPolicy,
    WorkloadPlacementAdvanced,
};

pub use affinity::{validate_affinity, validate_affinity_rule, validate_affinity_rules};
pub use binding::{
    validate_constraint_target, validate_exemption, validate_session_binding_constraint,
    validate_sticky_binding,
};
pub use field::{ErrorList, FieldError, FieldErrorKind, FieldPath, ValidationError, aggregate};
pub use health::{validate_health_check, validate_workload_health_policy};
pub use placement::{
    validate_rollout_state, validate_rollout_strategy, validate_traffic_splitting,
    validate_workload_placement_advanced,
};
pub use session::{validate_session_affinity_policy, validate_stickiness_policy};

/// An object that can be checked before admission.
pub trait Validate {
    /// Kind name used in aggregated error messages.
    const KIND: &'static str;

    fn name(&self) -> &str;

    /// Every violation in this object.
    fn validate(&self) -> ErrorList;

    /// `Ok(())` when valid, otherwise one error listing every violation.
    fn admit(&self) -> Result<(), ValidationError> {
        let errors = self.validate();
        if !errors.is_empty() {
            debug!(kind = Self::KIND, name = self.name(), count = errors.len(), "object rejected");
        }
        aggregate(Self::KIND, self.name(), errors)
    }
}

macro_rules! impl_validate {
    ($ty:ty, $kind:literal, $func:path) => {
        impl Validate for $ty {
            const KIND: &'static str = $kind;

            fn name(&self) -> &str {
                &self.metadata.name
            }

            fn validate(&self) -> ErrorList {
                $func(self)
            }
        }
    };
}

impl_validate!(SessionAffinityPolicy, "SessionAffinityPolicy", validate_session_affinity_policy);
impl_validate!(StickyBinding, "StickyBinding", validate_sticky_binding);
impl_validate!(
    SessionBindingConstraint,
    "SessionBindingConstraint",
    validate_session_binding_constraint
);
impl_validate!(
    WorkloadPlacementAdvanced,
    "WorkloadPlacementAdvanced",
    validate_workload_placement_advanced
);
impl_validate!(WorkloadHealthPolicy, "WorkloadHealthPolicy", validate_workload_health_policy);
