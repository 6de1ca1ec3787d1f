//! Affinity evaluation over a candidate cluster set.
//!
//! Two kinds of input narrow and score the candidates:
//!
//! - **Affinity terms** ([`AffinityRules`]): required affinity terms must
//!   all hold, required anti-affinity terms exclude, preferred terms add
//!   (affinity) or subtract (anti-affinity) their weight.
//! - **Affinity rules** ([`AffinityRule`]): `Requirement` rules must be
//!   satisfiable by some candidate and prune the rest, `Constraint` rules
//!   prune violators, `Preference` rules add their weight.
//!
//! Evaluation fails closed: a requirement nothing satisfies, or an empty
//! surviving set, is an [`AffinityError`] rather than an empty plan.

use std::cmp::Ordering;

use thiserror::Error;
use tracing::debug;

use fleetgrid_types::{
    AffinityRule, AffinityRuleType, AffinityRules, ClusterInfo, PREFERRED_WEIGHT_MAX,
    PREFERRED_WEIGHT_MIN, RULE_WEIGHT_MAX, RULE_WEIGHT_MIN,
};

use crate::matcher::ClusterMatcher;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AffinityError {
    #[error("required affinity term {index} matches no candidate cluster")]
    RequiredTermUnsatisfied { index: usize },

    #[error("requirement {rule:?} is not satisfied by any candidate cluster")]
    RequirementUnsatisfied { rule: String },

    #[error("no eligible clusters remain after filtering")]
    NoEligibleClusters,

    #[error("workload {workload} is not selected by the placement")]
    WorkloadNotSelected { workload: String },
}

pub type AffinityResult<T> = Result<T, AffinityError>;

/// An eligible cluster and how it earned its score.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterScore {
    pub cluster_name: String,
    pub score: i64,
    /// Terms and rules that contributed, for decision reasons.
    pub matched: Vec<String>,
}

impl ClusterScore {
    fn new(cluster_name: &str) -> Self {
        Self {
            cluster_name: cluster_name.to_string(),
            score: 0,
            matched: Vec::new(),
        }
    }
}

/// A cluster dropped during evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exclusion {
    pub cluster_name: String,
    pub reason: String,
}

/// Result of an evaluation: eligible clusters in candidate order, plus exclusions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AffinityEvaluation {
    pub eligible: Vec<ClusterScore>,
    pub excluded: Vec<Exclusion>,
}

impl AffinityEvaluation {
    fn start(candidates: &[ClusterInfo]) -> Self {
        Self {
            eligible: candidates.iter().map(|c| ClusterScore::new(&c.name)).collect(),
            excluded: Vec::new(),
        }
    }

    fn exclude_where(&mut self, mut drop: impl FnMut(&ClusterScore) -> bool, reason: &str) {
        let mut kept = Vec::with_capacity(self.eligible.len());
        for score in self.eligible.drain(..) {
            if drop(&score) {
                self.excluded.push(Exclusion {
                    cluster_name: score.cluster_name,
                    reason: reason.to_string(),
                });
            } else {
                kept.push(score);
            }
        }
        self.eligible = kept;
    }

    fn finish(self) -> AffinityResult<Self> {
        if self.eligible.is_empty() {
            return Err(AffinityError::NoEligibleClusters);
        }
        Ok(self)
    }

    pub fn score_of(&self, cluster: &str) -> Option<i64> {
        self.eligible
            .iter()
            .find(|s| s.cluster_name == cluster)
            .map(|s| s.score)
    }

    pub fn is_eligible(&self, cluster: &str) -> bool {
        self.score_of(cluster).is_some()
    }

    /// Eligible clusters ordered by score (descending), then name.
    pub fn ranked(&self) -> Vec<ClusterScore> {
        let mut ranked = self.eligible.clone();
        ranked.sort_by(compare_scores);
        ranked
    }

    /// Fold a later evaluation over the survivors of this one.
    ///
    /// Clusters absent from `later` are dropped; scores and matches add up.
    pub fn merge(mut self, later: AffinityEvaluation) -> Self {
        let mut merged = Vec::with_capacity(later.eligible.len());
        for next in later.eligible {
            if let Some(prev) = self
                .eligible
                .iter()
                .find(|s| s.cluster_name == next.cluster_name)
            {
                let mut matched = prev.matched.clone();
                matched.extend(next.matched);
                merged.push(ClusterScore {
                    cluster_name: next.cluster_name,
                    score: prev.score + next.score,
                    matched,
                });
            }
        }
        self.eligible = merged;
        self.excluded.extend(later.excluded);
        self
    }
}

pub(crate) fn compare_scores(a: &ClusterScore, b: &ClusterScore) -> Ordering {
    b.score
        .cmp(&a.score)
        .then_with(|| a.cluster_name.cmp(&b.cluster_name))
}

/// Evaluate affinity and anti-affinity terms against `candidates`.
///
/// # Errors
///
/// [`AffinityError::RequiredTermUnsatisfied`] when a required affinity
/// term matches no candidate, [`AffinityError::NoEligibleClusters`] when
/// nothing survives.
///
/// # Panics
///
/// Panics if a preferred term weight lies outside `[1, 100]`. Policies
/// must be validated before they reach the engine.
pub fn evaluate_affinity(
    rules: &AffinityRules,
    candidates: &[ClusterInfo],
    matcher: &impl ClusterMatcher,
) -> AffinityResult<AffinityEvaluation> {
    let mut eval = AffinityEvaluation::start(candidates);
    let lookup = |name: &str| candidates.iter().find(|c| c.name == name);

    if let Some(affinity) = &rules.cluster_affinity {
        for (index, term) in affinity.required.iter().enumerate() {
            if !candidates.iter().any(|c| matcher.matches_cluster(term, c)) {
                debug!(term = index, "required affinity term unsatisfiable");
                return Err(AffinityError::RequiredTermUnsatisfied { index });
            }
            let reason = format!("required affinity term {index} not matched");
            eval.exclude_where(
                |s| lookup(&s.cluster_name).is_none_or(|c| !matcher.matches_cluster(term, c)),
                &reason,
            );
        }
    }

    if let Some(anti) = &rules.cluster_anti_affinity {
        for (index, term) in anti.required.iter().enumerate() {
            let reason = format!("required anti-affinity term {index} matched");
            eval.exclude_where(
                |s| lookup(&s.cluster_name).is_some_and(|c| matcher.matches_cluster(term, c)),
                &reason,
            );
        }
    }

    let preferred = rules
        .cluster_affinity
        .iter()
        .flat_map(|a| a.preferred.iter().enumerate().map(|(i, t)| (i, t, 1)))
        .chain(
            rules
                .cluster_anti_affinity
                .iter()
                .flat_map(|a| a.preferred.iter().enumerate().map(|(i, t)| (i, t, -1))),
        );
    for (index, term, sign) in preferred {
        assert!(
            (PREFERRED_WEIGHT_MIN..=PREFERRED_WEIGHT_MAX).contains(&term.weight),
            "preferred term weight {} outside [{PREFERRED_WEIGHT_MIN}, {PREFERRED_WEIGHT_MAX}]",
            term.weight
        );
        let label = if sign > 0 { "preferred affinity" } else { "preferred anti-affinity" };
        for score in &mut eval.eligible {
            if lookup(&score.cluster_name).is_some_and(|c| matcher.matches_cluster(&term.term, c)) {
                score.score += sign * i64::from(term.weight);
                score.matched.push(format!("{label} term {index}"));
            }
        }
    }

    eval.finish()
}

/// Whether `cluster` satisfies the rule's constraint. A rule without one always holds.
fn rule_satisfied(rule: &AffinityRule, cluster: &ClusterInfo) -> bool {
    let Some(constraint) = &rule.constraint else {
        return true;
    };
    let labels_ok = constraint
        .required_labels
        .iter()
        .all(|(k, v)| cluster.labels.get(k).is_some_and(|cv| cv == v));
    let latency_ok = match constraint.max_latency_ms {
        Some(max) if max > 0 => cluster
            .latency_ms
            .is_some_and(|observed| i64::from(observed) <= i64::from(max)),
        _ => true,
    };
    labels_ok && latency_ok
}

/// Evaluate a list of [`AffinityRule`]s against `candidates`.
///
/// # Errors
///
/// [`AffinityError::RequirementUnsatisfied`] when no candidate satisfies a
/// `Requirement` rule, [`AffinityError::NoEligibleClusters`] when
/// `Constraint` rules prune every candidate.
///
/// # Panics
///
/// Panics if a rule weight lies outside `[0, 100]`.
pub fn evaluate_rules(
    rules: &[AffinityRule],
    candidates: &[ClusterInfo],
) -> AffinityResult<AffinityEvaluation> {
    let mut eval = AffinityEvaluation::start(candidates);
    let lookup = |name: &str| candidates.iter().find(|c| c.name == name);

    for rule in rules {
        let weight = rule.effective_weight();
        assert!(
            (RULE_WEIGHT_MIN..=RULE_WEIGHT_MAX).contains(&weight),
            "affinity rule {:?} weight {weight} outside [{RULE_WEIGHT_MIN}, {RULE_WEIGHT_MAX}]",
            rule.name
        );

        match rule.rule_type {
            AffinityRuleType::Requirement => {
                if !candidates.iter().any(|c| rule_satisfied(rule, c)) {
                    debug!(rule = %rule.name, "requirement unsatisfiable");
                    return Err(AffinityError::RequirementUnsatisfied {
                        rule: rule.name.clone(),
                    });
                }
                let reason = format!("requirement {} not satisfied", rule.name);
                eval.exclude_where(
                    |s| lookup(&s.cluster_name).is_none_or(|c| !rule_satisfied(rule, c)),
                    &reason,
                );
            }
            AffinityRuleType::Constraint => {
                let reason = format!("constraint {} violated", rule.name);
                eval.exclude_where(
                    |s| lookup(&s.cluster_name).is_none_or(|c| !rule_satisfied(rule, c)),
                    &reason,
                );
            }
            AffinityRuleType::Preference => {
                for score in &mut eval.eligible {
                    if lookup(&score.cluster_name).is_some_and(|c| rule_satisfied(rule, c)) {
                        score.score += i64::from(weight);
                        score.matched.push(format!("preference {}", rule.name));
                    }
                }
            }
        }
    }

    eval.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::LabelMatcher;
    use fleetgrid_types::{AffinityConstraint, ClusterAffinity, ClusterSelector, WeightedClusterTerm};
    use std::collections::BTreeMap;

    fn fleet() -> Vec<ClusterInfo> {
        vec![
            ClusterInfo::new("c1").with_location("eu-west").with_label("tier", "gold").with_latency(20),
            ClusterInfo::new("c2").with_location("eu-west").with_label("tier", "silver").with_latency(80),
            ClusterInfo::new("c3").with_location("us-east").with_label("tier", "gold"),
        ]
    }

    fn names(eval: &AffinityEvaluation) -> Vec<&str> {
        eval.eligible.iter().map(|s| s.cluster_name.as_str()).collect()
    }

    fn preferred(weight: i32, term: ClusterSelector) -> WeightedClusterTerm {
        WeightedClusterTerm { weight, term }
    }

    #[test]
    fn no_rules_keeps_every_candidate() {
        let eval = evaluate_affinity(&AffinityRules::default(), &fleet(), &LabelMatcher).unwrap();
        assert_eq!(names(&eval), vec!["c1", "c2", "c3"]);
        assert!(eval.eligible.iter().all(|s| s.score == 0));
    }

    #[test]
    fn required_terms_are_anded() {
        let rules = AffinityRules {
            cluster_affinity: Some(ClusterAffinity {
                required: vec![
                    ClusterSelector::by_locations(["eu-west"]),
                    ClusterSelector::by_labels(
                        fleetgrid_types::LabelSelector::from_labels([("tier", "gold")]),
                    ),
                ],
                preferred: vec![],
            }),
            cluster_anti_affinity: None,
        };
        let eval = evaluate_affinity(&rules, &fleet(), &LabelMatcher).unwrap();
        assert_eq!(names(&eval), vec!["c1"]);
        assert_eq!(eval.excluded.len(), 2);
    }

    #[test]
    fn required_term_matching_nothing_fails_closed() {
        let rules = AffinityRules {
            cluster_affinity: Some(ClusterAffinity {
                required: vec![ClusterSelector::by_locations(["ap-south"])],
                preferred: vec![],
            }),
            cluster_anti_affinity: None,
        };
        let err = evaluate_affinity(&rules, &fleet(), &LabelMatcher).unwrap_err();
        assert_eq!(err, AffinityError::RequiredTermUnsatisfied { index: 0 });
    }

    #[test]
    fn disjoint_required_terms_leave_nothing() {
        let rules = AffinityRules {
            cluster_affinity: Some(ClusterAffinity {
                required: vec![
                    ClusterSelector::by_names(["c1"]),
                    ClusterSelector::by_names(["c3"]),
                ],
                preferred: vec![],
            }),
            cluster_anti_affinity: None,
        };
        let err = evaluate_affinity(&rules, &fleet(), &LabelMatcher).unwrap_err();
        assert_eq!(err, AffinityError::NoEligibleClusters);
    }

    #[test]
    fn anti_affinity_excludes_and_penalizes() {
        let rules = AffinityRules {
            cluster_affinity: Some(ClusterAffinity {
                required: vec![],
                preferred: vec![preferred(30, ClusterSelector::by_locations(["eu-west"]))],
            }),
            cluster_anti_affinity: Some(ClusterAffinity {
                required: vec![ClusterSelector::by_names(["c3"])],
                preferred: vec![preferred(
                    10,
                    ClusterSelector::by_labels(fleetgrid_types::LabelSelector::from_labels([(
                        "tier", "silver",
                    )])),
                )],
            }),
        };
        let eval = evaluate_affinity(&rules, &fleet(), &LabelMatcher).unwrap();
        assert_eq!(names(&eval), vec!["c1", "c2"]);
        assert_eq!(eval.score_of("c1"), Some(30));
        assert_eq!(eval.score_of("c2"), Some(20));
        assert!(!eval.is_eligible("c3"));
    }

    #[test]
    #[should_panic(expected = "preferred term weight 0")]
    fn unvalidated_preferred_weight_panics() {
        let rules = AffinityRules {
            cluster_affinity: Some(ClusterAffinity {
                required: vec![],
                preferred: vec![preferred(0, ClusterSelector::by_names(["c1"]))],
            }),
            cluster_anti_affinity: None,
        };
        let _ = evaluate_affinity(&rules, &fleet(), &LabelMatcher);
    }

    fn latency_under(ms: i32) -> AffinityConstraint {
        AffinityConstraint {
            required_labels: BTreeMap::new(),
            max_latency_ms: Some(ms),
        }
    }

    #[test]
    fn requirement_prunes_and_preference_scores() {
        let rules = vec![
            AffinityRule::new("low-latency", AffinityRuleType::Requirement)
                .with_constraint(latency_under(100)),
            AffinityRule::new("fast", AffinityRuleType::Preference)
                .with_weight(40)
                .with_constraint(latency_under(50)),
        ];
        let eval = evaluate_rules(&rules, &fleet()).unwrap();
        // c3 has no latency measurement, so it cannot prove the requirement.
        assert_eq!(names(&eval), vec!["c1", "c2"]);
        assert_eq!(eval.score_of("c1"), Some(40));
        assert_eq!(eval.score_of("c2"), Some(0));
    }

    #[test]
    fn unsatisfiable_requirement_fails_closed() {
        let rules = vec![
            AffinityRule::new("ultra-low", AffinityRuleType::Requirement)
                .with_constraint(latency_under(5)),
        ];
        let err = evaluate_rules(&rules, &fleet()).unwrap_err();
        assert_eq!(
            err,
            AffinityError::RequirementUnsatisfied {
                rule: "ultra-low".to_string()
            }
        );
    }

    #[test]
    fn constraint_pruning_everything_is_no_eligible_clusters() {
        let mut labels = BTreeMap::new();
        labels.insert("tier".to_string(), "platinum".to_string());
        let rules = vec![AffinityRule::new("platinum", AffinityRuleType::Constraint).with_constraint(
            AffinityConstraint {
                required_labels: labels,
                max_latency_ms: None,
            },
        )];
        assert_eq!(evaluate_rules(&rules, &fleet()), Err(AffinityError::NoEligibleClusters));
    }

    #[test]
    #[should_panic(expected = "weight 101")]
    fn unvalidated_rule_weight_panics() {
        let rules = vec![AffinityRule::new("r", AffinityRuleType::Preference).with_weight(101)];
        let _ = evaluate_rules(&rules, &fleet());
    }

    #[test]
    fn ranking_breaks_ties_by_name() {
        let eval = AffinityEvaluation {
            eligible: vec![
                ClusterScore { cluster_name: "b".into(), score: 10, matched: vec![] },
                ClusterScore { cluster_name: "c".into(), score: 20, matched: vec![] },
                ClusterScore { cluster_name: "a".into(), score: 10, matched: vec![] },
            ],
            excluded: vec![],
        };
        let order: Vec<String> = eval.ranked().into_iter().map(|s| s.cluster_name).collect();
        assert_eq!(order, vec!["c", "a", "b"]);
    }

    #[test]
    fn merge_keeps_only_later_survivors() {
        let first = evaluate_affinity(&AffinityRules::default(), &fleet(), &LabelMatcher).unwrap();
        let rules = vec![
            AffinityRule::new("gold", AffinityRuleType::Constraint).with_constraint(AffinityConstraint {
                required_labels: [("tier".to_string(), "gold".to_string())].into(),
                max_latency_ms: None,
            }),
        ];
        let second = evaluate_rules(&rules, &fleet()).unwrap();
        let merged = first.merge(second);
        assert_eq!(names(&merged), vec!["c1", "c3"]);
        assert_eq!(merged.excluded.len(), 1);
    }
}
