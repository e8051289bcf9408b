use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

use crate::models::{AppointmentStatus, QueueStatus};

/// Outbound events published after a committed mutation. Delivery is
/// fire-and-forget; the engine never observes the outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QueueEvent {
    QueueStatusChanged {
        doctor_id: Uuid,
        date: NaiveDate,
        status: QueueStatus,
        reason: Option<String>,
    },
    AppointmentStateChanged {
        appointment_id: Uuid,
        doctor_id: Uuid,
        patient_id: Uuid,
        date: NaiveDate,
        new_status: AppointmentStatus,
        queue_number: Option<u32>,
    },
}

/// One-way notification port. `publish` must not block and must not fail the
/// mutation that triggered it.
pub trait Notifier: Send + Sync {
    fn publish(&self, event: QueueEvent);
}

pub type EventReceiver = broadcast::Receiver<QueueEvent>;

/// Broadcast-channel notifier. Real-time transports (WebSocket handlers and
/// the like) subscribe; with no subscribers the send is dropped on the floor.
pub struct BroadcastNotifier {
    sender: broadcast::Sender<QueueEvent>,
}

impl BroadcastNotifier {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(1000);
        Self { sender }
    }

    pub fn subscribe(&self) -> EventReceiver {
        self.sender.subscribe()
    }
}

impl Default for BroadcastNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier for BroadcastNotifier {
    fn publish(&self, event: QueueEvent) {
        if let Err(e) = self.sender.send(event) {
            // No active subscribers; nothing to deliver to.
            debug!("Queue event dropped: {}", e);
        }
    }
}
