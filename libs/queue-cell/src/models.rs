use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity of one day's queue for one doctor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueueKey {
    pub doctor_id: Uuid,
    pub date: NaiveDate,
}

impl QueueKey {
    pub fn new(doctor_id: Uuid, date: NaiveDate) -> Self {
        Self { doctor_id, date }
    }
}

impl std::fmt::Display for QueueKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.doctor_id, self.date.format("%Y-%m-%d"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Waiting,
    Called,
    InProgress,
    Completed,
    Skipped,
    Cancelled,
}

impl AppointmentStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, AppointmentStatus::Completed | AppointmentStatus::Cancelled)
    }

    /// Non-terminal statuses contend for queue numbers; terminal ones keep
    /// their last number for audit only.
    pub fn holds_queue_number(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Waiting | AppointmentStatus::Called | AppointmentStatus::InProgress
        )
    }

    /// The "current patient" slot: at most one appointment per queue key may
    /// be in one of these states at a time.
    pub fn is_serving(&self) -> bool {
        matches!(self, AppointmentStatus::Called | AppointmentStatus::InProgress)
    }
}

impl std::fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AppointmentStatus::Waiting => "waiting",
            AppointmentStatus::Called => "called",
            AppointmentStatus::InProgress => "in_progress",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Skipped => "skipped",
            AppointmentStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub patient_id: Uuid,
    pub date: NaiveDate,
    /// Booked slot, informational only for booked entries.
    pub time: Option<String>,
    pub queue_number: u32,
    pub status: AppointmentStatus,
    pub is_walk_in: bool,
    pub patient_name: String,
    pub patient_contact: Option<String>,
    pub patient_address: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub called_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Appointment {
    pub fn key(&self) -> QueueKey {
        QueueKey::new(self.doctor_id, self.date)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueStatus {
    Active,
    Paused,
    Stopped,
}

impl std::fmt::Display for QueueStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            QueueStatus::Active => "active",
            QueueStatus::Paused => "paused",
            QueueStatus::Stopped => "stopped",
        };
        f.write_str(s)
    }
}

/// One doctor's queue for one calendar day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayQueue {
    pub doctor_id: Uuid,
    pub date: NaiveDate,
    pub status: QueueStatus,
    pub opened_at: DateTime<Utc>,
    pub paused_at: Option<DateTime<Utc>>,
    pub resumed_at: Option<DateTime<Utc>>,
    pub pause_reason: Option<String>,
    /// Cumulative time spent paused, in seconds. Maintained on resume/stop so
    /// analytics can compute queue-active elapsed time.
    pub total_paused_seconds: i64,
}

impl DayQueue {
    pub fn open(doctor_id: Uuid, date: NaiveDate, now: DateTime<Utc>) -> Self {
        Self {
            doctor_id,
            date,
            status: QueueStatus::Active,
            opened_at: now,
            paused_at: None,
            resumed_at: None,
            pause_reason: None,
            total_paused_seconds: 0,
        }
    }

    pub fn key(&self) -> QueueKey {
        QueueKey::new(self.doctor_id, self.date)
    }

    /// Seconds the queue has been active (not paused) between `opened_at`
    /// and `now`.
    pub fn active_elapsed_seconds(&self, now: DateTime<Utc>) -> i64 {
        let mut elapsed = (now - self.opened_at).num_seconds() - self.total_paused_seconds;
        if self.status == QueueStatus::Paused {
            if let Some(paused_at) = self.paused_at {
                elapsed -= (now - paused_at).num_seconds();
            }
        }
        elapsed.max(0)
    }
}

/// Patient details supplied when inserting a walk-in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalkInRequest {
    pub patient_id: Uuid,
    pub patient_name: String,
    pub patient_contact: Option<String>,
    pub patient_address: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PauseRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReorderRequest {
    pub ordered_ids: Vec<Uuid>,
}

/// Per-status appointment counts for one queue key. Called and in-progress
/// are reported together as "serving".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub waiting: u32,
    pub serving: u32,
    pub completed: u32,
    pub skipped: u32,
    pub cancelled: u32,
}

/// Doctor/admin-facing projection of one queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueStatusView {
    pub doctor_id: Uuid,
    pub date: NaiveDate,
    pub status: QueueStatus,
    pub pause_reason: Option<String>,
    pub current_appointment: Option<Appointment>,
    pub counts: StatusCounts,
}

/// Patient-facing projection of one appointment's place in the queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientQueueInfo {
    pub appointment_id: Uuid,
    pub queue_number: u32,
    pub status: AppointmentStatus,
    /// Number of patients ahead, including the one currently being served.
    pub position: u32,
    pub currently_serving_number: Option<u32>,
    pub estimated_wait_minutes: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueAnalytics {
    pub doctor_id: Uuid,
    pub date: NaiveDate,
    pub completed: u32,
    pub skipped: u32,
    pub cancelled: u32,
    pub average_wait_minutes: Option<f64>,
    pub average_service_minutes: Option<f64>,
    /// Completed sessions per queue-active hour.
    pub throughput_per_hour: Option<f64>,
}
