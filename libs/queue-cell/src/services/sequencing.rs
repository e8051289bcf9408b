use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::QueueError;
use crate::models::{Appointment, AppointmentStatus};

/// Comparator over the waiting set used by rule application. Implementations
/// see walk-in flag, creation time and booked slot; nothing else.
pub trait OrderingPolicy: Send + Sync {
    fn compare(&self, a: &Appointment, b: &Appointment) -> Ordering;
}

/// Default policy: booked patients ahead of walk-ins, FIFO by creation time
/// within each tier.
pub struct TieredFifoPolicy;

impl OrderingPolicy for TieredFifoPolicy {
    fn compare(&self, a: &Appointment, b: &Appointment) -> Ordering {
        a.is_walk_in
            .cmp(&b.is_walk_in)
            .then_with(|| a.created_at.cmp(&b.created_at))
    }
}

/// Ordering and status-transition core for one queue key's appointments.
/// Pure in-memory logic; persistence and locking live in the registry.
pub struct SequencingEngine;

impl SequencingEngine {
    pub fn new() -> Self {
        Self
    }

    /// Closed transition table. Anything not listed here is rejected before
    /// any state is touched.
    pub fn can_transition(&self, from: AppointmentStatus, to: AppointmentStatus) -> bool {
        use AppointmentStatus::*;
        matches!(
            (from, to),
            (Waiting, Called)
                | (Called, InProgress)
                | (InProgress, Completed)
                | (Waiting, Skipped)
                | (Called, Skipped)
                | (Waiting, Cancelled)
                | (Called, Cancelled)
                | (InProgress, Cancelled)
                | (Skipped, Waiting)
        )
    }

    /// Apply a checked transition, stamping the timestamp the target status
    /// owns.
    pub fn transition(
        &self,
        appointment: &mut Appointment,
        to: AppointmentStatus,
        now: DateTime<Utc>,
    ) -> Result<(), QueueError> {
        if !self.can_transition(appointment.status, to) {
            warn!(
                "Rejected transition {} -> {} for appointment {}",
                appointment.status, to, appointment.id
            );
            return Err(QueueError::InvalidStateTransition {
                from: appointment.status.to_string(),
                to: to.to_string(),
            });
        }

        match to {
            AppointmentStatus::Called => appointment.called_at = Some(now),
            AppointmentStatus::InProgress => appointment.started_at = Some(now),
            AppointmentStatus::Completed => appointment.completed_at = Some(now),
            _ => {}
        }
        debug!(
            "Appointment {} transitioned {} -> {}",
            appointment.id, appointment.status, to
        );
        appointment.status = to;
        Ok(())
    }

    /// The appointment currently holding the serving slot, if any.
    pub fn current_patient<'a>(&self, appointments: &'a [Appointment]) -> Option<&'a Appointment> {
        appointments.iter().find(|a| a.status.is_serving())
    }

    /// The waiting appointment that `call_next` would pick: smallest queue
    /// number. Uniqueness of numbers among non-terminal appointments means
    /// ties cannot occur.
    pub fn select_next<'a>(&self, appointments: &'a [Appointment]) -> Option<&'a Appointment> {
        appointments
            .iter()
            .filter(|a| a.status == AppointmentStatus::Waiting)
            .min_by_key(|a| a.queue_number)
    }

    /// Queue number for a new entry: one past the highest number still held
    /// by a non-terminal appointment, or 1 on an empty queue.
    pub fn next_queue_number(&self, appointments: &[Appointment]) -> u32 {
        appointments
            .iter()
            .filter(|a| a.status.holds_queue_number())
            .map(|a| a.queue_number)
            .max()
            .unwrap_or(0)
            + 1
    }

    /// Queue number for a requeued skip: one past the highest number among
    /// currently waiting appointments.
    pub fn requeue_number(&self, appointments: &[Appointment]) -> u32 {
        appointments
            .iter()
            .filter(|a| a.status == AppointmentStatus::Waiting)
            .map(|a| a.queue_number)
            .max()
            .unwrap_or(0)
            + 1
    }

    /// Validate that `ordered_ids` is exactly the waiting set and return the
    /// waiting appointments renumbered 1..N in that order. Called/in-progress
    /// entries are not touched. The input list is rejected whole on any
    /// missing, duplicate, extra or non-waiting id.
    pub fn reorder_waiting(
        &self,
        appointments: &[Appointment],
        ordered_ids: &[Uuid],
    ) -> Result<Vec<Appointment>, QueueError> {
        let waiting: Vec<&Appointment> = appointments
            .iter()
            .filter(|a| a.status == AppointmentStatus::Waiting)
            .collect();

        if ordered_ids.len() != waiting.len() {
            return Err(QueueError::InvalidReorder(format!(
                "expected {} waiting appointments, got {} ids",
                waiting.len(),
                ordered_ids.len()
            )));
        }

        let mut reordered = Vec::with_capacity(ordered_ids.len());
        for (index, id) in ordered_ids.iter().enumerate() {
            let found = waiting.iter().find(|a| a.id == *id).ok_or_else(|| {
                QueueError::InvalidReorder(format!("appointment {} is not in the waiting set", id))
            })?;
            if reordered.iter().any(|a: &Appointment| a.id == *id) {
                return Err(QueueError::InvalidReorder(format!(
                    "appointment {} appears more than once",
                    id
                )));
            }
            let mut updated = (*found).clone();
            updated.queue_number = (index + 1) as u32;
            reordered.push(updated);
        }

        Ok(reordered)
    }

    /// Re-sort the waiting set by `policy` and renumber 1..N. Returns the
    /// renumbered waiting appointments.
    pub fn apply_policy(
        &self,
        appointments: &[Appointment],
        policy: &dyn OrderingPolicy,
    ) -> Vec<Appointment> {
        let mut waiting: Vec<Appointment> = appointments
            .iter()
            .filter(|a| a.status == AppointmentStatus::Waiting)
            .cloned()
            .collect();
        waiting.sort_by(|a, b| policy.compare(a, b));
        for (index, appointment) in waiting.iter_mut().enumerate() {
            appointment.queue_number = (index + 1) as u32;
        }
        waiting
    }
}

impl Default for SequencingEngine {
    fn default() -> Self {
        Self::new()
    }
}
