#![allow(dead_code)]

use std::sync::Arc;

use chrono::{Duration, NaiveDate, Utc};
use uuid::Uuid;

use queue_cell::{
    Appointment, AppointmentStatus, BroadcastNotifier, InMemoryStore, OrderingPolicy,
    QueueRegistry, QueueStore,
};
use shared_config::AppConfig;

/// Shared harness: a registry over an in-memory store with a subscribable
/// notifier, plus seeding helpers for booked appointments (booking itself is
/// an external collaborator, so tests write records straight to the store).
pub struct TestContext {
    pub registry: Arc<QueueRegistry>,
    pub store: Arc<InMemoryStore>,
    pub notifier: Arc<BroadcastNotifier>,
    pub doctor_id: Uuid,
    pub date: NaiveDate,
}

impl TestContext {
    pub fn new() -> Self {
        let store = Arc::new(InMemoryStore::new());
        let notifier = Arc::new(BroadcastNotifier::new());
        let config = AppConfig::default();
        let registry = Arc::new(QueueRegistry::new(
            store.clone() as Arc<dyn QueueStore>,
            notifier.clone(),
            &config,
        ));
        Self {
            registry,
            store,
            notifier,
            doctor_id: Uuid::new_v4(),
            date: NaiveDate::from_ymd_opt(2026, 3, 2).expect("valid date"),
        }
    }

    /// Same harness but with a registry configured to use `policy` for rule
    /// application instead of the default tiered FIFO.
    pub fn with_policy(policy: Arc<dyn OrderingPolicy>) -> Self {
        let store = Arc::new(InMemoryStore::new());
        let notifier = Arc::new(BroadcastNotifier::new());
        let config = AppConfig::default();
        let registry = Arc::new(
            QueueRegistry::new(
                store.clone() as Arc<dyn QueueStore>,
                notifier.clone(),
                &config,
            )
            .with_policy(policy),
        );
        Self {
            registry,
            store,
            notifier,
            doctor_id: Uuid::new_v4(),
            date: NaiveDate::from_ymd_opt(2026, 3, 2).expect("valid date"),
        }
    }

    /// Seed a booked (non-walk-in) waiting appointment with an explicit queue
    /// number. `created_offset_minutes` staggers creation times for policy
    /// and analytics tests.
    pub async fn seed_booked(
        &self,
        queue_number: u32,
        name: &str,
        created_offset_minutes: i64,
    ) -> Appointment {
        let appointment = Appointment {
            id: Uuid::new_v4(),
            doctor_id: self.doctor_id,
            patient_id: Uuid::new_v4(),
            date: self.date,
            time: Some("10:00".to_string()),
            queue_number,
            status: AppointmentStatus::Waiting,
            is_walk_in: false,
            patient_name: name.to_string(),
            patient_contact: None,
            patient_address: None,
            notes: None,
            created_at: Utc::now() - Duration::hours(2) + Duration::minutes(created_offset_minutes),
            called_at: None,
            started_at: None,
            completed_at: None,
        };
        self.store
            .save_appointment(&appointment)
            .await
            .expect("Failed to seed appointment");
        appointment
    }

    /// Seed a finished session with a known wait (created -> called) and a
    /// known service duration (started -> completed), for analytics tests.
    pub async fn seed_completed(
        &self,
        queue_number: u32,
        name: &str,
        wait_minutes: i64,
        service_minutes: i64,
    ) -> Appointment {
        let created_at = Utc::now() - Duration::hours(3);
        let called_at = created_at + Duration::minutes(wait_minutes);
        let started_at = called_at + Duration::minutes(1);
        let appointment = Appointment {
            id: Uuid::new_v4(),
            doctor_id: self.doctor_id,
            patient_id: Uuid::new_v4(),
            date: self.date,
            time: None,
            queue_number,
            status: AppointmentStatus::Completed,
            is_walk_in: false,
            patient_name: name.to_string(),
            patient_contact: None,
            patient_address: None,
            notes: None,
            created_at,
            called_at: Some(called_at),
            started_at: Some(started_at),
            completed_at: Some(started_at + Duration::minutes(service_minutes)),
        };
        self.store
            .save_appointment(&appointment)
            .await
            .expect("Failed to seed completed appointment");
        appointment
    }

    pub async fn start_queue(&self) {
        self.registry
            .start(self.doctor_id, self.date)
            .await
            .expect("Failed to start queue");
    }

    pub async fn reload(&self, id: Uuid) -> Appointment {
        self.store
            .load_appointment(id)
            .await
            .expect("Failed to load appointment")
            .expect("Appointment should exist")
    }
}

pub fn walk_in_request(name: &str) -> queue_cell::WalkInRequest {
    queue_cell::WalkInRequest {
        patient_id: Uuid::new_v4(),
        patient_name: name.to_string(),
        patient_contact: Some("555-0100".to_string()),
        patient_address: None,
        notes: None,
    }
}
