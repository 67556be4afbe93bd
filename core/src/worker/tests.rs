//! Integration tests for the Worker module

use super::*;
use crate::config::{CycleMode, ReadinessConfig};
use crate::outcome::{CycleOutcome, ErrorKind, Stage};
use crate::testing::{FakeExecutor, FakeLifecycle};
use crate::unit::UnitPhase;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

// ============================================================================
// Helper functions
// ============================================================================

fn fast_readiness() -> ReadinessConfig {
    ReadinessConfig {
        poll_interval: Duration::from_millis(2),
        timeout: Some(Duration::from_millis(50)),
    }
}

fn create_test_worker(
    id: usize,
    lifecycle: Arc<FakeLifecycle>,
    executor: Arc<FakeExecutor>,
    mode: CycleMode,
) -> (Worker, mpsc::Receiver<CycleOutcome>) {
    let (outcome_tx, outcome_rx) = mpsc::channel(100);

    let worker = WorkerBuilder::new(id)
        .lifecycle(lifecycle)
        .executor(executor)
        .outcome_tx(outcome_tx)
        .mode(mode)
        .readiness(fast_readiness())
        .name_prefix("test")
        .build()
        .expect("Failed to build worker");

    (worker, outcome_rx)
}

fn drain(rx: &mut mpsc::Receiver<CycleOutcome>) -> Vec<CycleOutcome> {
    let mut outcomes = Vec::new();
    while let Ok(outcome) = rx.try_recv() {
        outcomes.push(outcome);
    }
    outcomes
}

fn stages(outcomes: &[CycleOutcome]) -> Vec<(Stage, bool)> {
    outcomes.iter().map(|o| (o.stage(), o.is_success())).collect()
}

// ============================================================================
// Single cycle
// ============================================================================

#[tokio::test]
async fn test_single_cycle_happy_path() {
    let lifecycle = Arc::new(FakeLifecycle::new().with_pending_polls(2));
    let executor = Arc::new(FakeExecutor::new());
    let (worker, mut rx) =
        create_test_worker(0, lifecycle.clone(), executor.clone(), CycleMode::Single);

    let stats = worker
        .run(CancellationToken::new())
        .await
        .expect("Worker failed");

    assert_eq!(stats.cycles, 1);
    assert_eq!(stats.units_created, 1);
    assert_eq!(stats.failures(), 0);

    let outcomes = drain(&mut rx);
    assert_eq!(
        stages(&outcomes),
        vec![
            (Stage::Create, true),
            (Stage::Ready, true),
            (Stage::Exec, true),
            (Stage::Delete, true),
        ]
    );
    let phases: Vec<UnitPhase> = outcomes.iter().map(|o| o.phase()).collect();
    assert_eq!(
        phases,
        vec![
            UnitPhase::Pending,
            UnitPhase::Running,
            UnitPhase::Running,
            UnitPhase::Deleted,
        ]
    );
    assert!(outcomes.iter().all(|o| o.unit() == "test-0-0"));

    assert_eq!(executor.not_running_targets(), 0);
    assert_eq!(lifecycle.delete_requests(), vec!["test-0-0".to_string()]);
    assert!(lifecycle.live_units().is_empty());
}

#[tokio::test]
async fn test_create_failure_gates_exec_and_delete() {
    let lifecycle = Arc::new(FakeLifecycle::new().with_failing_create());
    let executor = Arc::new(FakeExecutor::new());
    let (worker, mut rx) =
        create_test_worker(0, lifecycle.clone(), executor.clone(), CycleMode::Single);

    let stats = worker.run(CancellationToken::new()).await.unwrap();

    assert_eq!(stats.create_failures, 1);
    assert_eq!(stats.units_created, 0);

    let outcomes = drain(&mut rx);
    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].kind(), ErrorKind::Create);
    assert_eq!(outcomes[0].phase(), UnitPhase::Failed);

    assert_eq!(executor.calls(), 0);
    assert!(lifecycle.delete_requests().is_empty());
}

#[tokio::test]
async fn test_readiness_timeout_still_deletes() {
    let lifecycle = Arc::new(FakeLifecycle::new().with_pending_polls(u32::MAX));
    let executor = Arc::new(FakeExecutor::new());
    let (worker, mut rx) =
        create_test_worker(3, lifecycle.clone(), executor.clone(), CycleMode::Single);

    let stats = worker.run(CancellationToken::new()).await.unwrap();
    assert_eq!(stats.readiness_failures, 1);

    let outcomes = drain(&mut rx);
    assert_eq!(
        stages(&outcomes),
        vec![
            (Stage::Create, true),
            (Stage::Ready, false),
            (Stage::Delete, true),
        ]
    );
    assert_eq!(outcomes[1].kind(), ErrorKind::Readiness);
    // The unit already failed; cleanup succeeding does not revive it.
    assert_eq!(outcomes[2].phase(), UnitPhase::Failed);

    assert_eq!(executor.calls(), 0);
    assert_eq!(lifecycle.delete_requests(), vec!["test-3-0".to_string()]);
}

#[tokio::test]
async fn test_get_error_counts_as_readiness_failure() {
    let lifecycle = Arc::new(FakeLifecycle::new().with_failing_get());
    let executor = Arc::new(FakeExecutor::new());
    let (worker, mut rx) =
        create_test_worker(0, lifecycle.clone(), executor.clone(), CycleMode::Single);

    worker.run(CancellationToken::new()).await.unwrap();

    let outcomes = drain(&mut rx);
    assert_eq!(outcomes[1].kind(), ErrorKind::Readiness);
    assert!(outcomes[1].error().unwrap().contains("connection reset"));
    assert_eq!(lifecycle.delete_requests().len(), 1);
}

#[tokio::test]
async fn test_unit_not_running_is_never_exec_targeted() {
    let lifecycle = Arc::new(FakeLifecycle::new().with_created_failed());
    let executor = Arc::new(FakeExecutor::new());
    let (worker, mut rx) =
        create_test_worker(0, lifecycle.clone(), executor.clone(), CycleMode::Single);

    let stats = worker.run(CancellationToken::new()).await.unwrap();
    assert_eq!(stats.readiness_failures, 1);
    assert_eq!(stats.exec_failures, 0);

    let outcomes = drain(&mut rx);
    assert_eq!(
        stages(&outcomes),
        vec![
            (Stage::Create, true),
            (Stage::Ready, false),
            (Stage::Delete, true),
        ]
    );
    assert_eq!(outcomes[1].kind(), ErrorKind::Readiness);
    assert_eq!(outcomes[1].phase(), UnitPhase::Failed);
    assert!(outcomes[1].error().unwrap().contains("tracked as failed"));

    assert_eq!(executor.calls(), 0);
    assert_eq!(executor.not_running_targets(), 0);
    assert_eq!(lifecycle.delete_requests(), vec!["test-0-0".to_string()]);
}

#[tokio::test]
async fn test_exec_failure_emits_exactly_one_delete() {
    let lifecycle = Arc::new(FakeLifecycle::new());
    let executor = Arc::new(FakeExecutor::new().with_failing_unit("test-0-0"));
    let (worker, mut rx) =
        create_test_worker(0, lifecycle.clone(), executor.clone(), CycleMode::Single);

    let stats = worker.run(CancellationToken::new()).await.unwrap();
    assert_eq!(stats.exec_failures, 1);

    let outcomes = drain(&mut rx);
    let deletes: Vec<_> = outcomes
        .iter()
        .filter(|o| o.stage() == Stage::Delete)
        .collect();
    assert_eq!(deletes.len(), 1);
    assert!(deletes[0].is_success());
    assert_eq!(deletes[0].phase(), UnitPhase::Deleted);

    let exec = outcomes.iter().find(|o| o.stage() == Stage::Exec).unwrap();
    assert_eq!(exec.kind(), ErrorKind::Exec);
    assert_eq!(exec.phase(), UnitPhase::Running);
}

#[tokio::test]
async fn test_delete_failure_recorded_once() {
    let lifecycle = Arc::new(FakeLifecycle::new().with_failing_delete());
    let executor = Arc::new(FakeExecutor::new());
    let (worker, mut rx) =
        create_test_worker(0, lifecycle.clone(), executor.clone(), CycleMode::Single);

    let stats = worker.run(CancellationToken::new()).await.unwrap();
    assert_eq!(stats.delete_failures, 1);
    assert_eq!(stats.exec_failures, 0);

    let outcomes = drain(&mut rx);
    let last = outcomes.last().unwrap();
    assert_eq!(last.kind(), ErrorKind::Delete);
    assert_eq!(last.phase(), UnitPhase::Failed);
    assert_eq!(lifecycle.delete_requests().len(), 1);
    assert_eq!(lifecycle.live_units().len(), 1);
}

// ============================================================================
// Cancellation and repeat mode
// ============================================================================

#[tokio::test]
async fn test_cancelled_before_start_runs_nothing() {
    let lifecycle = Arc::new(FakeLifecycle::new());
    let executor = Arc::new(FakeExecutor::new());
    let (worker, mut rx) =
        create_test_worker(0, lifecycle.clone(), executor.clone(), CycleMode::Repeat);

    let cancel = CancellationToken::new();
    cancel.cancel();
    let stats = worker.run(cancel).await.unwrap();

    assert_eq!(stats.cycles, 0);
    assert_eq!(lifecycle.create_calls(), 0);
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test]
async fn test_repeat_mode_uses_fresh_identities() {
    let lifecycle = Arc::new(FakeLifecycle::new().with_delay(Duration::from_millis(2)));
    let executor = Arc::new(FakeExecutor::new());
    let (worker, mut rx) =
        create_test_worker(1, lifecycle.clone(), executor.clone(), CycleMode::Repeat);

    let collector = tokio::spawn(async move {
        let mut outcomes = Vec::new();
        while let Some(outcome) = rx.recv().await {
            outcomes.push(outcome);
        }
        outcomes
    });

    let cancel = CancellationToken::new();
    let handle = tokio::spawn(worker.run(cancel.clone()));
    tokio::time::sleep(Duration::from_millis(60)).await;
    cancel.cancel();

    let stats = handle.await.expect("Worker panicked").unwrap();
    let outcomes = collector.await.unwrap();

    assert!(stats.cycles >= 2, "expected several cycles, got {}", stats.cycles);

    let created: Vec<&str> = outcomes
        .iter()
        .filter(|o| o.stage() == Stage::Create)
        .map(|o| o.unit())
        .collect();
    let unique: HashSet<&str> = created.iter().copied().collect();
    assert_eq!(created.len(), unique.len());
    assert_eq!(created.len() as u64, stats.cycles);

    // Every created unit was deleted exactly once, including the one in
    // flight when cancellation arrived.
    let mut deletes = lifecycle.delete_requests();
    deletes.sort();
    let mut expected: Vec<String> = created.iter().map(|s| s.to_string()).collect();
    expected.sort();
    assert_eq!(deletes, expected);
    assert!(lifecycle.live_units().is_empty());
}

#[tokio::test]
async fn test_in_flight_cycle_completes_after_cancel() {
    let lifecycle = Arc::new(FakeLifecycle::new().with_delay(Duration::from_millis(30)));
    let executor = Arc::new(FakeExecutor::new());
    let (worker, mut rx) =
        create_test_worker(0, lifecycle.clone(), executor.clone(), CycleMode::Repeat);

    let cancel = CancellationToken::new();
    let handle = tokio::spawn(worker.run(cancel.clone()));

    // Cancel while the first create is still in flight.
    tokio::time::sleep(Duration::from_millis(10)).await;
    cancel.cancel();

    let stats = handle.await.unwrap().unwrap();
    assert_eq!(stats.cycles, 1);

    let outcomes = drain(&mut rx);
    assert_eq!(outcomes.len(), 4);
    assert_eq!(outcomes.last().unwrap().stage(), Stage::Delete);
}

#[tokio::test]
async fn test_closed_channel_still_cleans_up() {
    let lifecycle = Arc::new(FakeLifecycle::new());
    let executor = Arc::new(FakeExecutor::new());
    let (worker, rx) =
        create_test_worker(0, lifecycle.clone(), executor.clone(), CycleMode::Repeat);
    drop(rx);

    let stats = worker.run(CancellationToken::new()).await.unwrap();

    assert_eq!(stats.cycles, 1);
    assert_eq!(lifecycle.delete_requests().len(), 1);
    assert!(lifecycle.live_units().is_empty());
}
