use chrono::{DateTime, Utc};

use crate::models::{Appointment, AppointmentStatus, DayQueue, QueueAnalytics, QueueKey};

/// Aggregates completed-session timing for one queue key. Tolerates empty
/// data: every figure degrades to zero/None rather than an error.
pub struct AnalyticsCalculator;

impl AnalyticsCalculator {
    pub fn new() -> Self {
        Self
    }

    pub fn queue_analytics(
        &self,
        key: QueueKey,
        queue: Option<&DayQueue>,
        appointments: &[Appointment],
        now: DateTime<Utc>,
    ) -> QueueAnalytics {
        let completed: Vec<&Appointment> = appointments
            .iter()
            .filter(|a| a.status == AppointmentStatus::Completed)
            .collect();
        let skipped = appointments
            .iter()
            .filter(|a| a.status == AppointmentStatus::Skipped)
            .count() as u32;
        let cancelled = appointments
            .iter()
            .filter(|a| a.status == AppointmentStatus::Cancelled)
            .count() as u32;

        let average_wait_minutes = Self::average_minutes(
            completed
                .iter()
                .filter_map(|a| a.called_at.map(|called| called - a.created_at)),
        );
        let average_service_minutes = Self::average_minutes(
            completed.iter().filter_map(|a| {
                match (a.started_at, a.completed_at) {
                    (Some(started), Some(done)) => Some(done - started),
                    _ => None,
                }
            }),
        );

        let throughput_per_hour = queue.and_then(|q| {
            let active_hours = q.active_elapsed_seconds(now) as f64 / 3600.0;
            if completed.is_empty() || active_hours <= 0.0 {
                None
            } else {
                Some(completed.len() as f64 / active_hours)
            }
        });

        QueueAnalytics {
            doctor_id: key.doctor_id,
            date: key.date,
            completed: completed.len() as u32,
            skipped,
            cancelled,
            average_wait_minutes,
            average_service_minutes,
            throughput_per_hour,
        }
    }

    /// Average service duration in minutes over completed sessions, or
    /// `default` when no usable history exists. Feeds wait estimates.
    pub fn average_service_minutes_or(
        &self,
        appointments: &[Appointment],
        default: f64,
    ) -> f64 {
        Self::average_minutes(appointments.iter().filter_map(|a| {
            if a.status != AppointmentStatus::Completed {
                return None;
            }
            match (a.started_at, a.completed_at) {
                (Some(started), Some(done)) => Some(done - started),
                _ => None,
            }
        }))
        .unwrap_or(default)
    }

    fn average_minutes(durations: impl Iterator<Item = chrono::Duration>) -> Option<f64> {
        let seconds: Vec<i64> = durations.map(|d| d.num_seconds()).collect();
        if seconds.is_empty() {
            return None;
        }
        let total: i64 = seconds.iter().sum();
        Some(total as f64 / seconds.len() as f64 / 60.0)
    }
}

impl Default for AnalyticsCalculator {
    fn default() -> Self {
        Self::new()
    }
}
