mod common;

use common::{batch, config, Confirm, Harness};
use metric_delivery::{cancellation, ConfirmAck, CorrelationId, DeliveryError};
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn test_full_success_takes_one_round_without_backoff() {
    let harness = Harness::new(config(100, 50, 3, 10_000));

    let outcome = harness
        .orchestrator
        .deliver(batch(&["q-1", "q-2", "q-3"]))
        .await
        .unwrap();

    assert!(outcome.success);
    assert_eq!(outcome.attempts, 1);
    assert!(outcome.outstanding.is_empty());
    assert!(outcome.elapsed < Duration::from_millis(50), "no backoff sleep expected");
    assert_eq!(harness.transport.sends().len(), 3);
    assert_eq!(harness.registry.pending_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_disabled_confirm_acks_succeed_on_send_acceptance() {
    let mut config = config(100, 50, 3, 10_000);
    config.confirm_ack_enabled = false;
    let harness = Harness::new(config);
    harness.transport.set_default_confirm(Confirm::Never);

    let outcome = harness
        .orchestrator
        .deliver(batch(&["q-1", "q-2"]))
        .await
        .unwrap();

    assert!(outcome.success);
    assert_eq!(outcome.attempts, 1);
    assert!(outcome.elapsed < Duration::from_millis(100), "ack wait must be skipped");
    assert_eq!(harness.registry.pending_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_unconfirmed_item_is_resent_under_new_id() {
    let harness = Harness::new(config(100, 50, 5, 10_000));
    harness
        .transport
        .script_confirms("q-a", &[Confirm::Never, Confirm::Immediately]);

    let outcome = harness
        .orchestrator
        .deliver(batch(&["q-a", "q-b"]))
        .await
        .unwrap();

    assert!(outcome.success);
    assert_eq!(outcome.attempts, 2);

    let a_sends = harness.transport.sends_for("q-a");
    assert_eq!(a_sends.len(), 2);
    assert_ne!(a_sends[0].correlation_id, a_sends[1].correlation_id);
    assert!(!harness.registry.is_pending(&a_sends[0].correlation_id));

    // Confirmed in round one, so never re-enters the working set
    assert_eq!(harness.transport.sends_for("q-b").len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_never_confirming_transport_exhausts_attempts() {
    let harness = Harness::new(config(100, 50, 3, 10_000));
    harness.transport.set_default_confirm(Confirm::Never);

    let outcome = harness
        .orchestrator
        .deliver(batch(&["q-1", "q-2", "q-3"]))
        .await
        .unwrap();

    assert!(!outcome.success);
    assert!(!outcome.cancelled);
    assert_eq!(outcome.attempts, 3);
    assert_eq!(outcome.outstanding.len(), 3);
    // 3 ack rounds of 100ms plus 2 backoffs of 50ms
    assert!(outcome.elapsed >= Duration::from_millis(400));
    assert!(outcome.elapsed < Duration::from_millis(450));
    assert_eq!(harness.transport.sends().len(), 9);
    assert_eq!(harness.registry.pending_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_rejected_send_is_retried_alone() {
    let harness = Harness::new(config(100, 50, 5, 10_000));
    harness.transport.script_accepts("q-a", &[false, true]);

    let outcome = harness
        .orchestrator
        .deliver(batch(&["q-a", "q-b"]))
        .await
        .unwrap();

    assert!(outcome.success);
    assert_eq!(outcome.attempts, 2);

    let a_sends = harness.transport.sends_for("q-a");
    assert_eq!(a_sends.len(), 2);
    assert!(!a_sends[0].accepted);
    assert!(a_sends[1].accepted);
    assert_eq!(harness.transport.sends_for("q-b").len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_zero_accepted_sends_still_retry() {
    let harness = Harness::new(config(100, 50, 5, 10_000));
    harness.transport.script_accepts("q-1", &[false]);
    harness.transport.script_accepts("q-2", &[false]);

    let outcome = harness
        .orchestrator
        .deliver(batch(&["q-1", "q-2"]))
        .await
        .unwrap();

    assert!(outcome.success);
    assert_eq!(outcome.attempts, 2);
    assert_eq!(harness.transport.sends().len(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_fail_timeout_bounds_the_loop() {
    let harness = Harness::new(config(100, 200, 1_000, 1_000));
    harness.transport.set_default_confirm(Confirm::Never);

    let outcome = harness
        .orchestrator
        .deliver(batch(&["q-1"]))
        .await
        .unwrap();

    assert!(!outcome.success);
    assert!(outcome.attempts < 1_000);
    assert!(outcome.elapsed >= Duration::from_millis(1_000));
    assert!(outcome.elapsed <= Duration::from_millis(1_000 + 200 + 100));
    assert_eq!(outcome.outstanding.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_late_ack_after_timeout_is_ignored() {
    let harness = Harness::new(config(100, 50, 3, 10_000));
    harness
        .transport
        .script_confirms("q-1", &[Confirm::After(Duration::from_millis(120))]);

    let outcome = harness
        .orchestrator
        .deliver(batch(&["q-1"]))
        .await
        .unwrap();

    assert!(outcome.success);
    assert_eq!(outcome.attempts, 2);
    assert_eq!(harness.registry.pending_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_delayed_ack_within_timeout_confirms() {
    let harness = Harness::new(config(100, 50, 3, 10_000));
    harness
        .transport
        .set_default_confirm(Confirm::After(Duration::from_millis(60)));

    let outcome = harness
        .orchestrator
        .deliver(batch(&["q-1", "q-2"]))
        .await
        .unwrap();

    assert!(outcome.success);
    assert_eq!(outcome.attempts, 1);
}

#[tokio::test(start_paused = true)]
async fn test_unknown_acks_do_not_disturb_pending_waits() {
    let harness = Harness::new(config(100, 50, 3, 10_000));
    harness
        .transport
        .set_default_confirm(Confirm::After(Duration::from_millis(30)));

    for _ in 0..5 {
        harness
            .acks
            .send(ConfirmAck::new(CorrelationId::generate()))
            .await
            .unwrap();
    }
    harness
        .acks
        .send(ConfirmAck { correlation_id: None })
        .await
        .unwrap();

    let outcome = harness
        .orchestrator
        .deliver(batch(&["q-1", "q-2"]))
        .await
        .unwrap();

    assert!(outcome.success);
    assert_eq!(outcome.attempts, 1);
}

#[tokio::test]
async fn test_empty_batch_is_rejected() {
    let harness = Harness::new(config(100, 50, 3, 10_000));

    let result = harness.orchestrator.deliver(Vec::new()).await;

    assert!(matches!(result, Err(DeliveryError::EmptyBatch)));
    assert!(harness.transport.sends().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_cancel_during_backoff_stops_delivery() {
    let harness = Harness::new(config(100, 60_000, 10, 600_000));
    harness.transport.set_default_confirm(Confirm::Never);
    let (handle, signal) = cancellation();

    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(500)).await;
        handle.cancel();
    });

    let outcome = harness
        .orchestrator
        .deliver_with_cancel(batch(&["q-1", "q-2"]), signal)
        .await
        .unwrap();
    canceller.await.unwrap();

    assert!(!outcome.success);
    assert!(outcome.cancelled);
    assert_eq!(outcome.attempts, 1);
    assert_eq!(outcome.outstanding.len(), 2);
    assert!(outcome.elapsed < Duration::from_secs(1));
    assert_eq!(harness.registry.pending_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_before_first_round_sends_nothing() {
    let harness = Harness::new(config(100, 50, 3, 10_000));
    let (handle, signal) = cancellation();
    handle.cancel();

    let outcome = harness
        .orchestrator
        .deliver_with_cancel(batch(&["q-1", "q-2"]), signal)
        .await
        .unwrap();

    assert!(!outcome.success);
    assert!(outcome.cancelled);
    assert_eq!(outcome.attempts, 0);
    assert_eq!(outcome.outstanding.len(), 2);
    assert!(harness.transport.sends().is_empty());
    assert_eq!(harness.registry.pending_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_batches_share_one_registry() {
    let harness = Harness::new(config(100, 50, 3, 10_000));
    harness
        .transport
        .script_confirms("q-1", &[Confirm::Never, Confirm::Immediately]);

    let (first, second) = tokio::join!(
        harness.orchestrator.deliver(batch(&["q-1", "q-2"])),
        harness.orchestrator.deliver(batch(&["q-3", "q-4", "q-5"])),
    );

    let first = first.unwrap();
    let second = second.unwrap();
    assert!(first.success);
    assert_eq!(first.attempts, 2);
    assert!(second.success);
    assert_eq!(second.attempts, 1);
    assert_eq!(harness.registry.pending_count(), 0);
}
