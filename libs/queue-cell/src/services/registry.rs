use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};
use uuid::Uuid;

use shared_config::AppConfig;

use crate::error::QueueError;
use crate::models::{
    Appointment, AppointmentStatus, DayQueue, PatientQueueInfo, QueueAnalytics, QueueKey,
    QueueStatus, QueueStatusView, WalkInRequest,
};
use crate::notifier::{Notifier, QueueEvent};
use crate::services::analytics::AnalyticsCalculator;
use crate::services::sequencing::{OrderingPolicy, SequencingEngine, TieredFifoPolicy};
use crate::services::status::StatusReporter;
use crate::store::QueueStore;

/// Owns queue lifecycle and serializes all mutating operations per
/// (doctor, date) key. One instance per process, injected into the router
/// state; never a global.
///
/// Commit protocol for every mutation: take the key's lock, load the
/// committed snapshot, compute the change on clones, persist, and only then
/// publish a notification. A persistence failure therefore never leaves
/// partially-updated observable state.
pub struct QueueRegistry {
    store: Arc<dyn QueueStore>,
    notifier: Arc<dyn Notifier>,
    engine: SequencingEngine,
    reporter: StatusReporter,
    analytics: AnalyticsCalculator,
    default_policy: Arc<dyn OrderingPolicy>,
    store_timeout: Duration,
    default_service_minutes: f64,
    // Lazily populated; entries are never removed while the process serves
    // requests, so a held Arc stays valid.
    locks: RwLock<HashMap<QueueKey, Arc<Mutex<()>>>>,
}

impl QueueRegistry {
    pub fn new(store: Arc<dyn QueueStore>, notifier: Arc<dyn Notifier>, config: &AppConfig) -> Self {
        Self {
            store,
            notifier,
            engine: SequencingEngine::new(),
            reporter: StatusReporter::new(),
            analytics: AnalyticsCalculator::new(),
            default_policy: Arc::new(TieredFifoPolicy),
            store_timeout: Duration::from_millis(config.store_timeout_ms),
            default_service_minutes: config.default_service_duration_minutes as f64,
            locks: RwLock::new(HashMap::new()),
        }
    }

    /// Swap the ordering policy used by `apply_queue_rules`.
    pub fn with_policy(mut self, policy: Arc<dyn OrderingPolicy>) -> Self {
        self.default_policy = policy;
        self
    }

    // ---- queue lifecycle ----

    pub async fn start(&self, doctor_id: Uuid, date: NaiveDate) -> Result<DayQueue, QueueError> {
        let key = QueueKey::new(doctor_id, date);
        let lock = self.lock_for(key).await;
        let _guard = lock.lock().await;

        match self.bounded(self.store.load_queue(key)).await? {
            None => {
                let queue = DayQueue::open(doctor_id, date, Utc::now());
                self.bounded(self.store.save_queue(&queue)).await?;
                info!("Queue {} started", key);
                self.notify_queue(&queue);
                Ok(queue)
            }
            Some(queue) => match queue.status {
                // Starting an already-running queue is a no-op.
                QueueStatus::Active => Ok(queue),
                QueueStatus::Paused => Err(QueueError::InvalidStateTransition {
                    from: QueueStatus::Paused.to_string(),
                    to: QueueStatus::Active.to_string(),
                }),
                QueueStatus::Stopped => Err(QueueError::InvalidStateTransition {
                    from: QueueStatus::Stopped.to_string(),
                    to: QueueStatus::Active.to_string(),
                }),
            },
        }
    }

    pub async fn pause(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        reason: Option<String>,
    ) -> Result<DayQueue, QueueError> {
        let key = QueueKey::new(doctor_id, date);
        let lock = self.lock_for(key).await;
        let _guard = lock.lock().await;

        let mut queue = self.require_queue(key).await?;
        match queue.status {
            QueueStatus::Stopped => return Err(QueueError::QueueStopped),
            QueueStatus::Paused => {
                return Err(QueueError::InvalidStateTransition {
                    from: QueueStatus::Paused.to_string(),
                    to: QueueStatus::Paused.to_string(),
                })
            }
            QueueStatus::Active => {}
        }

        queue.status = QueueStatus::Paused;
        queue.paused_at = Some(Utc::now());
        queue.pause_reason = reason;
        self.bounded(self.store.save_queue(&queue)).await?;
        info!("Queue {} paused ({:?})", key, queue.pause_reason);
        self.notify_queue(&queue);
        Ok(queue)
    }

    pub async fn resume(&self, doctor_id: Uuid, date: NaiveDate) -> Result<DayQueue, QueueError> {
        let key = QueueKey::new(doctor_id, date);
        let lock = self.lock_for(key).await;
        let _guard = lock.lock().await;

        let mut queue = self.require_queue(key).await?;
        match queue.status {
            QueueStatus::Stopped => return Err(QueueError::QueueStopped),
            QueueStatus::Active => {
                return Err(QueueError::InvalidStateTransition {
                    from: QueueStatus::Active.to_string(),
                    to: QueueStatus::Active.to_string(),
                })
            }
            QueueStatus::Paused => {}
        }

        let now = Utc::now();
        if let Some(paused_at) = queue.paused_at.take() {
            queue.total_paused_seconds += (now - paused_at).num_seconds().max(0);
        }
        queue.status = QueueStatus::Active;
        queue.resumed_at = Some(now);
        queue.pause_reason = None;
        self.bounded(self.store.save_queue(&queue)).await?;
        info!("Queue {} resumed", key);
        self.notify_queue(&queue);
        Ok(queue)
    }

    pub async fn stop(&self, doctor_id: Uuid, date: NaiveDate) -> Result<DayQueue, QueueError> {
        let key = QueueKey::new(doctor_id, date);
        let lock = self.lock_for(key).await;
        let _guard = lock.lock().await;

        let mut queue = self.require_queue(key).await?;
        if queue.status == QueueStatus::Stopped {
            return Err(QueueError::QueueStopped);
        }

        let now = Utc::now();
        if let Some(paused_at) = queue.paused_at.take() {
            queue.total_paused_seconds += (now - paused_at).num_seconds().max(0);
        }
        queue.status = QueueStatus::Stopped;
        self.bounded(self.store.save_queue(&queue)).await?;
        info!("Queue {} stopped for the day", key);
        self.notify_queue(&queue);
        Ok(queue)
    }

    /// Snapshot read; does not contend with the mutation lock.
    pub async fn get_status(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
    ) -> Result<QueueStatusView, QueueError> {
        let key = QueueKey::new(doctor_id, date);
        let queue = self.require_queue(key).await?;
        let appointments = self.bounded(self.store.list_appointments(key)).await?;
        Ok(self.reporter.queue_status(&queue, &appointments))
    }

    // ---- sequencing operations ----

    pub async fn call_next(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
    ) -> Result<Appointment, QueueError> {
        let key = QueueKey::new(doctor_id, date);
        let lock = self.lock_for(key).await;
        let _guard = lock.lock().await;

        let queue = self.require_queue(key).await?;
        match queue.status {
            QueueStatus::Stopped => return Err(QueueError::QueueStopped),
            QueueStatus::Paused => return Err(QueueError::QueuePaused),
            QueueStatus::Active => {}
        }

        let appointments = self.bounded(self.store.list_appointments(key)).await?;
        if let Some(current) = self.engine.current_patient(&appointments) {
            warn!(
                "call_next on {} rejected: number {} already being served",
                key, current.queue_number
            );
            return Err(QueueError::PatientAlreadyInProgress(current.queue_number));
        }

        let mut next = self
            .engine
            .select_next(&appointments)
            .cloned()
            .ok_or(QueueError::NoPatientsWaiting)?;
        self.engine
            .transition(&mut next, AppointmentStatus::Called, Utc::now())?;
        self.bounded(self.store.save_appointment(&next)).await?;
        info!("Queue {}: called number {}", key, next.queue_number);
        self.notify_appointment(&next);
        Ok(next)
    }

    pub async fn start_session(&self, appointment_id: Uuid) -> Result<Appointment, QueueError> {
        self.transition_by_id(appointment_id, AppointmentStatus::InProgress)
            .await
    }

    pub async fn complete_session(&self, appointment_id: Uuid) -> Result<Appointment, QueueError> {
        self.transition_by_id(appointment_id, AppointmentStatus::Completed)
            .await
    }

    pub async fn skip_patient(&self, appointment_id: Uuid) -> Result<Appointment, QueueError> {
        self.transition_by_id(appointment_id, AppointmentStatus::Skipped)
            .await
    }

    pub async fn cancel_appointment(&self, appointment_id: Uuid) -> Result<Appointment, QueueError> {
        self.transition_by_id(appointment_id, AppointmentStatus::Cancelled)
            .await
    }

    /// Return a parked (skipped) appointment to the waiting set at the back
    /// of the line: fresh queue number = current max waiting number + 1.
    pub async fn requeue_skipped(&self, appointment_id: Uuid) -> Result<Appointment, QueueError> {
        let key = self.locate(appointment_id).await?;
        let lock = self.lock_for(key).await;
        let _guard = lock.lock().await;

        let queue = self.require_queue(key).await?;
        if queue.status == QueueStatus::Stopped {
            return Err(QueueError::QueueStopped);
        }

        let appointments = self.bounded(self.store.list_appointments(key)).await?;
        let mut appointment = appointments
            .iter()
            .find(|a| a.id == appointment_id)
            .cloned()
            .ok_or_else(|| QueueError::NotFound(format!("appointment {}", appointment_id)))?;

        self.engine
            .transition(&mut appointment, AppointmentStatus::Waiting, Utc::now())?;
        appointment.queue_number = self.engine.requeue_number(&appointments);
        self.bounded(self.store.save_appointment(&appointment)).await?;
        info!(
            "Queue {}: requeued appointment {} as number {}",
            key, appointment.id, appointment.queue_number
        );
        self.notify_appointment(&appointment);
        Ok(appointment)
    }

    pub async fn reorder_queue(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        ordered_ids: &[Uuid],
    ) -> Result<Vec<Appointment>, QueueError> {
        let key = QueueKey::new(doctor_id, date);
        let lock = self.lock_for(key).await;
        let _guard = lock.lock().await;

        let queue = self.require_queue(key).await?;
        if queue.status == QueueStatus::Stopped {
            return Err(QueueError::QueueStopped);
        }

        let appointments = self.bounded(self.store.list_appointments(key)).await?;
        let reordered = self.engine.reorder_waiting(&appointments, ordered_ids)?;
        self.bounded(self.store.save_appointments(&reordered)).await?;
        info!("Queue {}: reordered {} waiting patients", key, reordered.len());
        self.notify_queue(&queue);
        Ok(reordered)
    }

    pub async fn add_walk_in(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        request: WalkInRequest,
    ) -> Result<Appointment, QueueError> {
        if request.patient_name.trim().is_empty() {
            return Err(QueueError::Validation("patient_name must not be empty".into()));
        }

        let key = QueueKey::new(doctor_id, date);
        let lock = self.lock_for(key).await;
        let _guard = lock.lock().await;

        let now = Utc::now();
        // First booking of the day opens the queue implicitly.
        let queue = match self.bounded(self.store.load_queue(key)).await? {
            Some(queue) if queue.status == QueueStatus::Stopped => {
                return Err(QueueError::QueueStopped)
            }
            Some(queue) => queue,
            None => {
                let queue = DayQueue::open(doctor_id, date, now);
                self.bounded(self.store.save_queue(&queue)).await?;
                info!("Queue {} opened by first walk-in", key);
                self.notify_queue(&queue);
                queue
            }
        };

        let appointments = self.bounded(self.store.list_appointments(key)).await?;
        let appointment = Appointment {
            id: Uuid::new_v4(),
            doctor_id,
            patient_id: request.patient_id,
            date,
            time: None,
            queue_number: self.engine.next_queue_number(&appointments),
            status: AppointmentStatus::Waiting,
            is_walk_in: true,
            patient_name: request.patient_name,
            patient_contact: request.patient_contact,
            patient_address: request.patient_address,
            notes: request.notes,
            created_at: now,
            called_at: None,
            started_at: None,
            completed_at: None,
        };
        self.bounded(self.store.save_appointment(&appointment)).await?;
        info!(
            "Queue {}: walk-in {} assigned number {}",
            queue.key(),
            appointment.id,
            appointment.queue_number
        );
        self.notify_appointment(&appointment);
        Ok(appointment)
    }

    /// Re-sort the waiting set with the registry's configured policy.
    pub async fn apply_queue_rules(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<Appointment>, QueueError> {
        let policy = Arc::clone(&self.default_policy);
        self.apply_queue_rules_with(doctor_id, date, policy.as_ref())
            .await
    }

    pub async fn apply_queue_rules_with(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        policy: &dyn OrderingPolicy,
    ) -> Result<Vec<Appointment>, QueueError> {
        let key = QueueKey::new(doctor_id, date);
        let lock = self.lock_for(key).await;
        let _guard = lock.lock().await;

        let queue = self.require_queue(key).await?;
        if queue.status == QueueStatus::Stopped {
            return Err(QueueError::QueueStopped);
        }

        let appointments = self.bounded(self.store.list_appointments(key)).await?;
        let resorted = self.engine.apply_policy(&appointments, policy);
        self.bounded(self.store.save_appointments(&resorted)).await?;
        info!("Queue {}: rules applied over {} waiting patients", key, resorted.len());
        self.notify_queue(&queue);
        Ok(resorted)
    }

    // ---- read-only projections ----

    pub async fn patient_queue_info(
        &self,
        appointment_id: Uuid,
    ) -> Result<PatientQueueInfo, QueueError> {
        let appointment = self
            .bounded(self.store.load_appointment(appointment_id))
            .await?
            .ok_or_else(|| QueueError::NotFound(format!("appointment {}", appointment_id)))?;
        let appointments = self
            .bounded(self.store.list_appointments(appointment.key()))
            .await?;
        let average = self
            .analytics
            .average_service_minutes_or(&appointments, self.default_service_minutes);
        Ok(self
            .reporter
            .patient_queue_info(&appointment, &appointments, average))
    }

    pub async fn queue_analytics(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
    ) -> Result<QueueAnalytics, QueueError> {
        let key = QueueKey::new(doctor_id, date);
        let queue = self.bounded(self.store.load_queue(key)).await?;
        let appointments = self.bounded(self.store.list_appointments(key)).await?;
        Ok(self
            .analytics
            .queue_analytics(key, queue.as_ref(), &appointments, Utc::now()))
    }

    // ---- internals ----

    /// Shared path for the by-id session transitions. Resolves the key from
    /// the appointment, then re-reads state under the key's lock.
    async fn transition_by_id(
        &self,
        appointment_id: Uuid,
        to: AppointmentStatus,
    ) -> Result<Appointment, QueueError> {
        let key = self.locate(appointment_id).await?;
        let lock = self.lock_for(key).await;
        let _guard = lock.lock().await;

        let queue = self.require_queue(key).await?;
        if queue.status == QueueStatus::Stopped {
            return Err(QueueError::QueueStopped);
        }

        let mut appointment = self
            .bounded(self.store.load_appointment(appointment_id))
            .await?
            .ok_or_else(|| QueueError::NotFound(format!("appointment {}", appointment_id)))?;
        self.engine.transition(&mut appointment, to, Utc::now())?;
        self.bounded(self.store.save_appointment(&appointment)).await?;
        info!(
            "Queue {}: appointment {} is now {}",
            key, appointment.id, appointment.status
        );
        self.notify_appointment(&appointment);
        Ok(appointment)
    }

    /// Resolve an appointment's queue key without holding any lock.
    async fn locate(&self, appointment_id: Uuid) -> Result<QueueKey, QueueError> {
        let appointment = self
            .bounded(self.store.load_appointment(appointment_id))
            .await?
            .ok_or_else(|| QueueError::NotFound(format!("appointment {}", appointment_id)))?;
        Ok(appointment.key())
    }

    async fn require_queue(&self, key: QueueKey) -> Result<DayQueue, QueueError> {
        self.bounded(self.store.load_queue(key))
            .await?
            .ok_or_else(|| QueueError::NotFound(format!("queue {}", key)))
    }

    async fn lock_for(&self, key: QueueKey) -> Arc<Mutex<()>> {
        {
            let locks = self.locks.read().await;
            if let Some(lock) = locks.get(&key) {
                return Arc::clone(lock);
            }
        }
        let mut locks = self.locks.write().await;
        Arc::clone(locks.entry(key).or_default())
    }

    /// Bound every store call so a stalled backend surfaces as
    /// `StorageUnavailable` instead of a hung request.
    async fn bounded<T>(
        &self,
        op: impl Future<Output = Result<T, QueueError>>,
    ) -> Result<T, QueueError> {
        match tokio::time::timeout(self.store_timeout, op).await {
            Ok(result) => result,
            Err(_) => Err(QueueError::StorageUnavailable(format!(
                "store call exceeded {}ms",
                self.store_timeout.as_millis()
            ))),
        }
    }

    fn notify_queue(&self, queue: &DayQueue) {
        self.notifier.publish(QueueEvent::QueueStatusChanged {
            doctor_id: queue.doctor_id,
            date: queue.date,
            status: queue.status,
            reason: queue.pause_reason.clone(),
        });
    }

    fn notify_appointment(&self, appointment: &Appointment) {
        self.notifier.publish(QueueEvent::AppointmentStateChanged {
            appointment_id: appointment.id,
            doctor_id: appointment.doctor_id,
            patient_id: appointment.patient_id,
            date: appointment.date,
            new_status: appointment.status,
            queue_number: appointment
                .status
                .holds_queue_number()
                .then_some(appointment.queue_number),
        });
    }
}
