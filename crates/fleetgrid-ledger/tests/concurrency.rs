//! Many workers appending to a shared ledger.

use std::thread;

use fleetgrid_ledger::{ConflictRules, DecisionLedger};
use fleetgrid_types::{DecisionStatus, PlacementDecision, WorkloadReference};

fn workload(i: usize) -> WorkloadReference {
    WorkloadReference::new("apps/v1", "Deployment", &format!("svc-{i}"), Some("shop"))
}

fn decision(workload: WorkloadReference, cluster: String, at: u64) -> PlacementDecision {
    PlacementDecision {
        workload,
        cluster_name: cluster,
        score: 1,
        reason: "worker".to_string(),
        decision_time: at,
        status: DecisionStatus::Executed,
    }
}

#[test]
fn parallel_appends_are_all_recorded() {
    let ledger = DecisionLedger::new();
    let rules = ConflictRules::default();
    let workers = 8;
    let per_worker = 50;

    thread::scope(|s| {
        for worker in 0..workers {
            let ledger = &ledger;
            let rules = &rules;
            s.spawn(move || {
                for n in 0..per_worker {
                    // Every worker writes to every workload, so appends contend.
                    let target = workload(n % 4);
                    let cluster = format!("c{worker}");
                    ledger.record_decision(decision(target, cluster, n as u64), rules);
                }
            });
        }
    });

    assert_eq!(ledger.workloads().len(), 4);
    let total: u64 = (0..4)
        .map(|i| ledger.statistics(&workload(i)).unwrap().total)
        .sum();
    assert_eq!(total, (workers * per_worker) as u64);

    for i in 0..4 {
        let snap = ledger.snapshot(&workload(i)).unwrap();
        assert_eq!(snap.decisions.len() as u64, snap.statistics.total);
        // Each worker's cluster executes once per workload, however often it repeats.
        assert_eq!(snap.statistics.successful, workers as u64);
    }
}

#[test]
fn exclusive_conflicts_get_unique_ids_under_contention() {
    let ledger = DecisionLedger::new();
    let rules = ConflictRules {
        exclusive: true,
        ..Default::default()
    };

    thread::scope(|s| {
        for worker in 0..6 {
            let ledger = &ledger;
            let rules = &rules;
            s.spawn(move || {
                ledger.record_decision(decision(workload(0), format!("c{worker}"), 1), rules);
            });
        }
    });

    let snap = ledger.snapshot(&workload(0)).unwrap();
    // The first append has nothing to clash with; every later one does.
    assert_eq!(snap.conflicts.len(), 5);
    let mut ids: Vec<u64> = snap.conflicts.iter().map(|c| c.id).collect();
    ids.sort_unstable();
    assert_eq!(ids, vec![1, 2, 3, 4, 5]);
}
