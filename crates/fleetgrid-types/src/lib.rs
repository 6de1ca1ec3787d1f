//! fleetgrid-types — the FleetGrid placement data model.
//!
//! Plain value types describing selectors, placement policies,
//! affinity rules, rollout and traffic configuration, session bindings,
//! health policies, and the status records a controller writes back.
//!
//! # Conventions
//!
//! - Every admitted entity is an [`Object`]: metadata (name, optional
//!   namespace, generation), spec, and status.
//! - Fields serialize in `camelCase`; enums serialize as bare variant
//!   names, so the wire format stays string-compatible.
//! - Bounded optional scalars are `Option<i32>`. `None` and `Some(0)`
//!   both mean "unset" and always pass range checks.
//! - Timestamps are unix seconds supplied by the caller.

pub mod affinity;
pub mod binding;
pub mod duration;
pub mod health;
pub mod meta;
pub mod placement;
pub mod rollout;
pub mod selector;
pub mod session;
pub mod snapshot;
pub mod traffic;

pub use affinity::*;
pub use binding::*;
pub use duration::parse_duration;
pub use health::*;
pub use meta::{Object, ObjectMeta, spec_fingerprint};
pub use placement::*;
pub use rollout::*;
pub use selector::*;
pub use session::*;
pub use snapshot::*;
pub use traffic::*;
