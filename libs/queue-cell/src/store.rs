use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::error::QueueError;
use crate::models::{Appointment, DayQueue, QueueKey};

/// Persistence port for appointments and day queues. Implementations are
/// expected to provide read-your-writes consistency within a process; any
/// backend failure surfaces as `StorageUnavailable`.
#[async_trait]
pub trait QueueStore: Send + Sync {
    async fn load_appointment(&self, id: Uuid) -> Result<Option<Appointment>, QueueError>;

    async fn save_appointment(&self, appointment: &Appointment) -> Result<(), QueueError>;

    /// Persist a batch of appointments belonging to one key. Used by reorder
    /// and rule application so a renumbering commits as one write.
    async fn save_appointments(&self, appointments: &[Appointment]) -> Result<(), QueueError>;

    async fn list_appointments(&self, key: QueueKey) -> Result<Vec<Appointment>, QueueError>;

    async fn load_queue(&self, key: QueueKey) -> Result<Option<DayQueue>, QueueError>;

    async fn save_queue(&self, queue: &DayQueue) -> Result<(), QueueError>;
}

/// In-process store keeping everything in two maps. The default backend for
/// the API binary and the one all tests run against.
#[derive(Default)]
pub struct InMemoryStore {
    appointments: Arc<RwLock<HashMap<Uuid, Appointment>>>,
    queues: Arc<RwLock<HashMap<QueueKey, DayQueue>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl QueueStore for InMemoryStore {
    async fn load_appointment(&self, id: Uuid) -> Result<Option<Appointment>, QueueError> {
        let appointments = self.appointments.read().await;
        Ok(appointments.get(&id).cloned())
    }

    async fn save_appointment(&self, appointment: &Appointment) -> Result<(), QueueError> {
        let mut appointments = self.appointments.write().await;
        appointments.insert(appointment.id, appointment.clone());
        debug!("Saved appointment {} ({})", appointment.id, appointment.status);
        Ok(())
    }

    async fn save_appointments(&self, batch: &[Appointment]) -> Result<(), QueueError> {
        let mut appointments = self.appointments.write().await;
        for appointment in batch {
            appointments.insert(appointment.id, appointment.clone());
        }
        debug!("Saved batch of {} appointments", batch.len());
        Ok(())
    }

    async fn list_appointments(&self, key: QueueKey) -> Result<Vec<Appointment>, QueueError> {
        let appointments = self.appointments.read().await;
        let mut list: Vec<Appointment> = appointments
            .values()
            .filter(|a| a.key() == key)
            .cloned()
            .collect();
        list.sort_by_key(|a| a.queue_number);
        Ok(list)
    }

    async fn load_queue(&self, key: QueueKey) -> Result<Option<DayQueue>, QueueError> {
        let queues = self.queues.read().await;
        Ok(queues.get(&key).cloned())
    }

    async fn save_queue(&self, queue: &DayQueue) -> Result<(), QueueError> {
        let mut queues = self.queues.write().await;
        queues.insert(queue.key(), queue.clone());
        debug!("Saved queue {} ({})", queue.key(), queue.status);
        Ok(())
    }
}
