//! FleetGrid affinity engine — selector matching, affinity scoring, binding admission.
//!
//! This crate turns validated policies plus a discovery snapshot into
//! placement plans and binding verdicts. It never talks to clusters
//! itself: candidates, health scores, and load figures are supplied by
//! the caller, and so is the evaluation time.
//!
//! # Components
//!
//! - **`matcher`** — Selector evaluation against clusters and workloads
//! - **`engine`** — Affinity/anti-affinity terms and weighted affinity rules
//! - **`placer`** — Placement plans (selector filter, ranking, cluster cap)
//! - **`session`** — Admission of sticky bindings against binding constraints
//! - **`binding`** — Binding lifecycle (expiry, renewal, conflict resolution)

pub mod binding;
pub mod engine;
pub mod matcher;
pub mod placer;
pub mod session;

pub use binding::{BindingResolution, RenewOutcome, expire, is_expired, renew, resolve_binding_conflict};
pub use engine::{
    AffinityError, AffinityEvaluation, AffinityResult, ClusterScore, Exclusion, evaluate_affinity,
    evaluate_rules,
};
pub use matcher::{ClusterMatcher, LabelMatcher, label_selector_matches};
pub use placer::{PlacementOptions, PlacementPlan, compute_placement};
pub use session::{
    BindingVerdict, ConstraintViolation, Disposition, EvaluationContext, admit_binding,
    record_violations,
};
