use crate::models::{
    Appointment, AppointmentStatus, DayQueue, PatientQueueInfo, QueueStatusView, StatusCounts,
};

/// Derives doctor- and patient-facing projections from the committed state of
/// one queue key. Read-only; never mutates.
pub struct StatusReporter;

impl StatusReporter {
    pub fn new() -> Self {
        Self
    }

    pub fn counts(&self, appointments: &[Appointment]) -> StatusCounts {
        let mut counts = StatusCounts::default();
        for appointment in appointments {
            match appointment.status {
                AppointmentStatus::Waiting => counts.waiting += 1,
                AppointmentStatus::Called | AppointmentStatus::InProgress => counts.serving += 1,
                AppointmentStatus::Completed => counts.completed += 1,
                AppointmentStatus::Skipped => counts.skipped += 1,
                AppointmentStatus::Cancelled => counts.cancelled += 1,
            }
        }
        counts
    }

    pub fn queue_status(&self, queue: &DayQueue, appointments: &[Appointment]) -> QueueStatusView {
        let current = appointments.iter().find(|a| a.status.is_serving()).cloned();
        QueueStatusView {
            doctor_id: queue.doctor_id,
            date: queue.date,
            status: queue.status,
            pause_reason: queue.pause_reason.clone(),
            current_appointment: current,
            counts: self.counts(appointments),
        }
    }

    /// Position and wait estimate for one patient. `position` counts the
    /// waiting appointments ahead of this one plus the patient currently
    /// being served, if any.
    pub fn patient_queue_info(
        &self,
        appointment: &Appointment,
        appointments: &[Appointment],
        average_service_minutes: f64,
    ) -> PatientQueueInfo {
        let current = appointments.iter().find(|a| a.status.is_serving());

        let ahead = appointments
            .iter()
            .filter(|a| {
                a.status == AppointmentStatus::Waiting && a.queue_number < appointment.queue_number
            })
            .count() as u32;
        let position = ahead + if current.is_some() { 1 } else { 0 };

        let estimated_wait_minutes = if appointment.status == AppointmentStatus::Waiting {
            Some((position as f64 * average_service_minutes).round() as u32)
        } else {
            None
        };

        PatientQueueInfo {
            appointment_id: appointment.id,
            queue_number: appointment.queue_number,
            status: appointment.status,
            position,
            currently_serving_number: current.map(|a| a.queue_number),
            estimated_wait_minutes,
        }
    }
}

impl Default for StatusReporter {
    fn default() -> Self {
        Self::new()
    }
}
