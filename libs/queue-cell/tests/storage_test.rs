use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use async_trait::async_trait;
use uuid::Uuid;

use queue_cell::{
    Appointment, BroadcastNotifier, DayQueue, InMemoryStore, QueueError, QueueKey, QueueRegistry,
    QueueStore,
};
use shared_config::AppConfig;

mod common;
use common::walk_in_request;

/// Delegates to an in-memory store but stalls every call while `stalled` is
/// set, to exercise the bounded-timeout path.
struct StallingStore {
    inner: InMemoryStore,
    stalled: AtomicBool,
}

impl StallingStore {
    fn new() -> Self {
        Self {
            inner: InMemoryStore::new(),
            stalled: AtomicBool::new(false),
        }
    }

    fn stall(&self) {
        self.stalled.store(true, Ordering::SeqCst);
    }

    async fn maybe_stall(&self) {
        if self.stalled.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_millis(500)).await;
        }
    }
}

#[async_trait]
impl QueueStore for StallingStore {
    async fn load_appointment(&self, id: Uuid) -> Result<Option<Appointment>, QueueError> {
        self.maybe_stall().await;
        self.inner.load_appointment(id).await
    }

    async fn save_appointment(&self, appointment: &Appointment) -> Result<(), QueueError> {
        self.maybe_stall().await;
        self.inner.save_appointment(appointment).await
    }

    async fn save_appointments(&self, batch: &[Appointment]) -> Result<(), QueueError> {
        self.maybe_stall().await;
        self.inner.save_appointments(batch).await
    }

    async fn list_appointments(&self, key: QueueKey) -> Result<Vec<Appointment>, QueueError> {
        self.maybe_stall().await;
        self.inner.list_appointments(key).await
    }

    async fn load_queue(&self, key: QueueKey) -> Result<Option<DayQueue>, QueueError> {
        self.maybe_stall().await;
        self.inner.load_queue(key).await
    }

    async fn save_queue(&self, queue: &DayQueue) -> Result<(), QueueError> {
        self.maybe_stall().await;
        self.inner.save_queue(queue).await
    }
}

fn tight_timeout_config() -> AppConfig {
    AppConfig {
        store_timeout_ms: 50,
        ..AppConfig::default()
    }
}

#[tokio::test]
async fn test_stalled_store_surfaces_storage_unavailable() {
    let store = Arc::new(StallingStore::new());
    let registry = QueueRegistry::new(
        store.clone(),
        Arc::new(BroadcastNotifier::new()),
        &tight_timeout_config(),
    );

    let doctor_id = Uuid::new_v4();
    let date = chrono::NaiveDate::from_ymd_opt(2026, 3, 2).expect("valid date");
    registry.start(doctor_id, date).await.expect("Failed to start queue");

    store.stall();
    let result = registry.call_next(doctor_id, date).await;
    assert_matches!(result.unwrap_err(), QueueError::StorageUnavailable(_));
}

#[tokio::test]
async fn test_retry_after_storage_recovery_is_safe() {
    let store = Arc::new(StallingStore::new());
    let registry = QueueRegistry::new(
        store.clone(),
        Arc::new(BroadcastNotifier::new()),
        &tight_timeout_config(),
    );

    let doctor_id = Uuid::new_v4();
    let date = chrono::NaiveDate::from_ymd_opt(2026, 3, 2).expect("valid date");
    registry.start(doctor_id, date).await.expect("Failed to start queue");

    store.stall();
    let result = registry
        .add_walk_in(doctor_id, date, walk_in_request("Ana"))
        .await;
    assert_matches!(result.unwrap_err(), QueueError::StorageUnavailable(_));

    // Store recovers; the caller retries the whole operation. Preconditions
    // are re-checked against committed state, so the retry is clean.
    store.stalled.store(false, Ordering::SeqCst);
    let appointment = registry
        .add_walk_in(doctor_id, date, walk_in_request("Ana"))
        .await
        .expect("Retry should succeed after recovery");
    assert_eq!(appointment.queue_number, 1);
}
