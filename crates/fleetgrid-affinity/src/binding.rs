//! Sticky-binding lifecycle: expiry, renewal, and conflict resolution.

use std::time::Duration;

use tracing::{debug, info};

use fleetgrid_types::{BindingPhase, ConflictResolutionStrategy, StickyBinding};

/// Whether the binding is past its expiry at `now`, or already marked expired.
pub fn is_expired(binding: &StickyBinding, now: u64) -> bool {
    binding.status.phase == BindingPhase::Expired
        || binding.spec.expires_at.is_some_and(|at| now >= at)
}

/// Move an active binding to `Expired` once its expiry has passed.
///
/// Returns `true` when the phase changed.
pub fn expire(binding: &mut StickyBinding, now: u64) -> bool {
    if binding.status.phase == BindingPhase::Active && is_expired(binding, now) {
        binding.status.phase = BindingPhase::Expired;
        debug!(binding = %binding.metadata.name, "binding expired");
        return true;
    }
    false
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenewOutcome {
    Renewed { expires_at: u64 },
    /// Remaining lifetime is still above the renewal threshold.
    NotDue,
    Disabled,
    LimitReached,
    /// Expired or superseded bindings are never renewed.
    Inactive,
}

/// Extend the binding by `duration` from `now` if its auto-renewal policy allows.
///
/// A binding with no expiry has nothing to renew and reports `NotDue`.
/// Renewal rewrites `spec.expiresAt`, which bumps the generation.
pub fn renew(binding: &mut StickyBinding, now: u64, duration: Duration) -> RenewOutcome {
    if binding.status.phase != BindingPhase::Active || is_expired(binding, now) {
        return RenewOutcome::Inactive;
    }
    let Some(policy) = binding.spec.auto_renewal.as_ref().filter(|p| p.enabled) else {
        return RenewOutcome::Disabled;
    };
    if let Some(max) = policy.max_renewals.filter(|&n| n > 0) {
        if binding.status.renewals >= max as u32 {
            return RenewOutcome::LimitReached;
        }
    }
    let Some(expires_at) = binding.spec.expires_at else {
        return RenewOutcome::NotDue;
    };

    let threshold = policy.renewal_threshold_percent.unwrap_or(0);
    if threshold > 0 {
        let started = binding.status.last_renewed_at.unwrap_or(binding.spec.created_at);
        let lifetime = expires_at.saturating_sub(started);
        let remaining = expires_at.saturating_sub(now);
        if remaining.saturating_mul(100) > lifetime.saturating_mul(threshold as u64) {
            return RenewOutcome::NotDue;
        }
    }

    let new_expiry = now.saturating_add(duration.as_secs());
    let mut spec = binding.spec.clone();
    spec.expires_at = Some(new_expiry);
    binding.update_spec(spec);
    binding.status.renewals += 1;
    binding.status.last_renewed_at = Some(now);
    info!(
        binding = %binding.metadata.name,
        renewals = binding.status.renewals,
        expires_at = new_expiry,
        "binding renewed"
    );
    RenewOutcome::Renewed {
        expires_at: new_expiry,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingResolution {
    /// The bindings do not compete for the same session.
    NoConflict,
    KeptExisting,
    KeptIncoming,
    /// `Manual` strategy: both stay active until an operator decides.
    Unresolved,
}

fn supersede(loser: &mut StickyBinding, winner: &StickyBinding) {
    loser.status.phase = BindingPhase::Superseded;
    loser.status.superseded_by = Some(winner.metadata.name.clone());
}

/// Settle two active bindings for the same session.
///
/// The existing binding's conflict-resolution policy decides (default
/// `FirstWins`). `HighestWeight` keeps the existing binding on a tie.
/// The loser is marked `Superseded`.
pub fn resolve_binding_conflict(
    existing: &mut StickyBinding,
    incoming: &mut StickyBinding,
) -> BindingResolution {
    let competing = existing.spec.session_identifier == incoming.spec.session_identifier
        && existing.metadata.name != incoming.metadata.name
        && existing.status.phase == BindingPhase::Active
        && incoming.status.phase == BindingPhase::Active;
    if !competing {
        return BindingResolution::NoConflict;
    }

    let strategy = existing
        .spec
        .conflict_resolution
        .as_ref()
        .map(|p| p.strategy)
        .unwrap_or_default();
    let keep_existing = match strategy {
        ConflictResolutionStrategy::FirstWins => true,
        ConflictResolutionStrategy::LastWins => false,
        ConflictResolutionStrategy::HighestWeight => {
            existing.spec.weight.unwrap_or(0) >= incoming.spec.weight.unwrap_or(0)
        }
        ConflictResolutionStrategy::Manual => {
            info!(
                session = %existing.spec.session_identifier,
                existing = %existing.metadata.name,
                incoming = %incoming.metadata.name,
                "binding conflict left for manual resolution"
            );
            return BindingResolution::Unresolved;
        }
    };

    if keep_existing {
        supersede(incoming, existing);
        debug!(winner = %existing.metadata.name, loser = %incoming.metadata.name, ?strategy, "binding conflict resolved");
        BindingResolution::KeptExisting
    } else {
        supersede(existing, incoming);
        debug!(winner = %incoming.metadata.name, loser = %existing.metadata.name, ?strategy, "binding conflict resolved");
        BindingResolution::KeptIncoming
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetgrid_types::{
        AutoRenewalPolicy, ConflictResolutionPolicy, ObjectMeta, StickyBindingSpec,
    };

    fn binding(name: &str, created_at: u64, expires_at: Option<u64>) -> StickyBinding {
        StickyBinding::new(
            ObjectMeta::named(name),
            StickyBindingSpec {
                session_identifier: "s1".to_string(),
                target_cluster: "c1".to_string(),
                created_at,
                expires_at,
                ..Default::default()
            },
        )
    }

    fn renewing(threshold: Option<i32>, max_renewals: Option<i32>) -> StickyBinding {
        let mut b = binding("b1", 0, Some(100));
        b.spec.auto_renewal = Some(AutoRenewalPolicy {
            enabled: true,
            renewal_threshold_percent: threshold,
            max_renewals,
        });
        b
    }

    #[test]
    fn expiry_is_evaluated_against_supplied_time() {
        let mut b = binding("b1", 0, Some(100));
        assert!(!is_expired(&b, 99));
        assert!(is_expired(&b, 100));
        assert!(!expire(&mut b, 50));
        assert!(expire(&mut b, 100));
        assert_eq!(b.status.phase, BindingPhase::Expired);
        assert!(is_expired(&b, 0));
    }

    #[test]
    fn binding_without_expiry_never_expires() {
        assert!(!is_expired(&binding("b1", 0, None), u64::MAX));
    }

    #[test]
    fn renewal_waits_for_threshold() {
        let mut b = renewing(Some(20), None);
        assert_eq!(renew(&mut b, 50, Duration::from_secs(100)), RenewOutcome::NotDue);

        let generation = b.metadata.generation;
        assert_eq!(
            renew(&mut b, 85, Duration::from_secs(100)),
            RenewOutcome::Renewed { expires_at: 185 }
        );
        assert_eq!(b.spec.expires_at, Some(185));
        assert_eq!(b.status.renewals, 1);
        assert_eq!(b.status.last_renewed_at, Some(85));
        assert_eq!(b.metadata.generation, generation + 1);

        // The next window is measured from the last renewal.
        assert_eq!(renew(&mut b, 150, Duration::from_secs(100)), RenewOutcome::NotDue);
    }

    #[test]
    fn renewal_limits() {
        let mut b = renewing(None, Some(1));
        assert!(matches!(renew(&mut b, 10, Duration::from_secs(60)), RenewOutcome::Renewed { .. }));
        assert_eq!(renew(&mut b, 20, Duration::from_secs(60)), RenewOutcome::LimitReached);

        let mut disabled = binding("b2", 0, Some(100));
        assert_eq!(renew(&mut disabled, 10, Duration::from_secs(60)), RenewOutcome::Disabled);

        let mut expired = renewing(None, None);
        assert_eq!(renew(&mut expired, 100, Duration::from_secs(60)), RenewOutcome::Inactive);
    }

    fn with_strategy(mut b: StickyBinding, strategy: ConflictResolutionStrategy) -> StickyBinding {
        b.spec.conflict_resolution = Some(ConflictResolutionPolicy { strategy });
        b
    }

    #[test]
    fn first_wins_by_default() {
        let mut existing = binding("old", 0, None);
        let mut incoming = binding("new", 10, None);
        assert_eq!(
            resolve_binding_conflict(&mut existing, &mut incoming),
            BindingResolution::KeptExisting
        );
        assert_eq!(incoming.status.phase, BindingPhase::Superseded);
        assert_eq!(incoming.status.superseded_by.as_deref(), Some("old"));
        assert_eq!(existing.status.phase, BindingPhase::Active);
    }

    #[test]
    fn last_wins_and_highest_weight() {
        let mut existing = with_strategy(binding("old", 0, None), ConflictResolutionStrategy::LastWins);
        let mut incoming = binding("new", 10, None);
        assert_eq!(
            resolve_binding_conflict(&mut existing, &mut incoming),
            BindingResolution::KeptIncoming
        );
        assert_eq!(existing.status.superseded_by.as_deref(), Some("new"));

        let mut existing = with_strategy(binding("old", 0, None), ConflictResolutionStrategy::HighestWeight);
        existing.spec.weight = Some(30);
        let mut incoming = binding("new", 10, None);
        incoming.spec.weight = Some(60);
        assert_eq!(
            resolve_binding_conflict(&mut existing, &mut incoming),
            BindingResolution::KeptIncoming
        );
    }

    #[test]
    fn manual_and_unrelated_bindings_are_left_alone() {
        let mut existing = with_strategy(binding("old", 0, None), ConflictResolutionStrategy::Manual);
        let mut incoming = binding("new", 10, None);
        assert_eq!(
            resolve_binding_conflict(&mut existing, &mut incoming),
            BindingResolution::Unresolved
        );
        assert_eq!(incoming.status.phase, BindingPhase::Active);

        let mut other = binding("other", 0, None);
        other.spec.session_identifier = "s2".to_string();
        let mut incoming = binding("new", 10, None);
        assert_eq!(
            resolve_binding_conflict(&mut other, &mut incoming),
            BindingResolution::NoConflict
        );
    }
}
