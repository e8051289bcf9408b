use std::cmp::Ordering;
use std::sync::Arc;

use assert_matches::assert_matches;
use uuid::Uuid;

use queue_cell::{Appointment, AppointmentStatus, OrderingPolicy, QueueError};

mod common;
use common::{walk_in_request, TestContext};

/// Most recent arrival first; the opposite of the default tiered FIFO.
struct NewestFirstPolicy;

impl OrderingPolicy for NewestFirstPolicy {
    fn compare(&self, a: &Appointment, b: &Appointment) -> Ordering {
        b.created_at.cmp(&a.created_at)
    }
}

#[tokio::test]
async fn test_reorder_swaps_two_waiting_patients() {
    let ctx = TestContext::new();
    ctx.start_queue().await;
    let a = ctx.seed_booked(1, "Ana", 0).await;
    let b = ctx.seed_booked(2, "Berta", 5).await;

    let reordered = ctx
        .registry
        .reorder_queue(ctx.doctor_id, ctx.date, &[b.id, a.id])
        .await
        .expect("Failed to reorder");

    assert_eq!(reordered.len(), 2);
    assert_eq!(ctx.reload(b.id).await.queue_number, 1);
    assert_eq!(ctx.reload(a.id).await.queue_number, 2);
}

#[tokio::test]
async fn test_reorder_renumbers_in_list_order() {
    let ctx = TestContext::new();
    ctx.start_queue().await;
    let a = ctx.seed_booked(1, "Ana", 0).await;
    let b = ctx.seed_booked(2, "Berta", 5).await;
    let c = ctx.seed_booked(3, "Carla", 10).await;

    ctx.registry
        .reorder_queue(ctx.doctor_id, ctx.date, &[c.id, a.id, b.id])
        .await
        .expect("Failed to reorder");

    assert_eq!(ctx.reload(c.id).await.queue_number, 1);
    assert_eq!(ctx.reload(a.id).await.queue_number, 2);
    assert_eq!(ctx.reload(b.id).await.queue_number, 3);
}

#[tokio::test]
async fn test_reorder_rejects_missing_id() {
    let ctx = TestContext::new();
    ctx.start_queue().await;
    let a = ctx.seed_booked(1, "Ana", 0).await;
    let b = ctx.seed_booked(2, "Berta", 5).await;

    let result = ctx
        .registry
        .reorder_queue(ctx.doctor_id, ctx.date, &[b.id])
        .await;
    assert_matches!(result.unwrap_err(), QueueError::InvalidReorder(_));

    // State unchanged.
    assert_eq!(ctx.reload(a.id).await.queue_number, 1);
    assert_eq!(ctx.reload(b.id).await.queue_number, 2);
}

#[tokio::test]
async fn test_reorder_rejects_extra_id() {
    let ctx = TestContext::new();
    ctx.start_queue().await;
    let a = ctx.seed_booked(1, "Ana", 0).await;
    let b = ctx.seed_booked(2, "Berta", 5).await;

    let result = ctx
        .registry
        .reorder_queue(ctx.doctor_id, ctx.date, &[b.id, a.id, Uuid::new_v4()])
        .await;
    assert_matches!(result.unwrap_err(), QueueError::InvalidReorder(_));
}

#[tokio::test]
async fn test_reorder_rejects_duplicate_id() {
    let ctx = TestContext::new();
    ctx.start_queue().await;
    let a = ctx.seed_booked(1, "Ana", 0).await;
    ctx.seed_booked(2, "Berta", 5).await;

    let result = ctx
        .registry
        .reorder_queue(ctx.doctor_id, ctx.date, &[a.id, a.id])
        .await;
    assert_matches!(result.unwrap_err(), QueueError::InvalidReorder(_));
}

#[tokio::test]
async fn test_reorder_rejects_non_waiting_id() {
    let ctx = TestContext::new();
    ctx.start_queue().await;
    let called = ctx.seed_booked(1, "Ana", 0).await;
    let waiting = ctx.seed_booked(2, "Berta", 5).await;
    ctx.registry
        .call_next(ctx.doctor_id, ctx.date)
        .await
        .expect("Failed to call next");

    let result = ctx
        .registry
        .reorder_queue(ctx.doctor_id, ctx.date, &[called.id, waiting.id])
        .await;
    assert_matches!(result.unwrap_err(), QueueError::InvalidReorder(_));
}

#[tokio::test]
async fn test_reorder_leaves_current_patient_untouched() {
    let ctx = TestContext::new();
    ctx.start_queue().await;
    let serving = ctx.seed_booked(1, "Ana", 0).await;
    let b = ctx.seed_booked(2, "Berta", 5).await;
    let c = ctx.seed_booked(3, "Carla", 10).await;
    ctx.registry
        .call_next(ctx.doctor_id, ctx.date)
        .await
        .expect("Failed to call next");

    ctx.registry
        .reorder_queue(ctx.doctor_id, ctx.date, &[c.id, b.id])
        .await
        .expect("Failed to reorder waiting set");

    let current = ctx.reload(serving.id).await;
    assert_eq!(current.status, AppointmentStatus::Called);
    assert_eq!(current.queue_number, 1);
    assert_eq!(ctx.reload(c.id).await.queue_number, 1);
    assert_eq!(ctx.reload(b.id).await.queue_number, 2);
}

#[tokio::test]
async fn test_walk_in_number_follows_non_terminal_max() {
    let ctx = TestContext::new();
    ctx.start_queue().await;
    let first = ctx.seed_booked(1, "Ana", 0).await;
    ctx.seed_booked(2, "Berta", 5).await;

    // Complete number 1; its number is no longer contended.
    ctx.registry.call_next(ctx.doctor_id, ctx.date).await.expect("call");
    ctx.registry.start_session(first.id).await.expect("start");
    ctx.registry.complete_session(first.id).await.expect("complete");

    let walk_in = ctx
        .registry
        .add_walk_in(ctx.doctor_id, ctx.date, walk_in_request("Carla"))
        .await
        .expect("Failed to add walk-in");
    // Max among waiting/called/in-progress is 2, not the completed 1.
    assert_eq!(walk_in.queue_number, 3);
}

#[tokio::test]
async fn test_apply_rules_puts_booked_before_walk_ins() {
    let ctx = TestContext::new();
    ctx.start_queue().await;

    let early_walk_in = ctx
        .registry
        .add_walk_in(ctx.doctor_id, ctx.date, walk_in_request("Walky"))
        .await
        .expect("Failed to add walk-in");
    assert_eq!(early_walk_in.queue_number, 1);

    // Booked patients arrive in the store afterwards with later numbers but
    // earlier creation times.
    let booked_late = ctx.seed_booked(2, "Berta", 30).await;
    let booked_early = ctx.seed_booked(3, "Ana", 0).await;

    let resorted = ctx
        .registry
        .apply_queue_rules(ctx.doctor_id, ctx.date)
        .await
        .expect("Failed to apply rules");
    assert_eq!(resorted.len(), 3);

    // Booked tier first, FIFO by creation inside the tier, walk-in last.
    assert_eq!(ctx.reload(booked_early.id).await.queue_number, 1);
    assert_eq!(ctx.reload(booked_late.id).await.queue_number, 2);
    assert_eq!(ctx.reload(early_walk_in.id).await.queue_number, 3);
}

#[tokio::test]
async fn test_apply_rules_with_supplied_policy() {
    let ctx = TestContext::new();
    ctx.start_queue().await;
    let oldest = ctx.seed_booked(1, "Ana", 0).await;
    let middle = ctx.seed_booked(2, "Berta", 5).await;
    let newest = ctx.seed_booked(3, "Carla", 10).await;

    let resorted = ctx
        .registry
        .apply_queue_rules_with(ctx.doctor_id, ctx.date, &NewestFirstPolicy)
        .await
        .expect("Failed to apply supplied policy");
    assert_eq!(resorted.len(), 3);

    // The caller's comparator drives the renumbering, not the default.
    assert_eq!(ctx.reload(newest.id).await.queue_number, 1);
    assert_eq!(ctx.reload(middle.id).await.queue_number, 2);
    assert_eq!(ctx.reload(oldest.id).await.queue_number, 3);
}

#[tokio::test]
async fn test_configured_policy_drives_apply_rules() {
    let ctx = TestContext::with_policy(Arc::new(NewestFirstPolicy));
    ctx.start_queue().await;
    let oldest = ctx.seed_booked(1, "Ana", 0).await;
    let newest = ctx.seed_booked(2, "Berta", 5).await;

    ctx.registry
        .apply_queue_rules(ctx.doctor_id, ctx.date)
        .await
        .expect("Failed to apply configured policy");

    assert_eq!(ctx.reload(newest.id).await.queue_number, 1);
    assert_eq!(ctx.reload(oldest.id).await.queue_number, 2);
}
