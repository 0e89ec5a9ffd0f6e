use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use async_trait::async_trait;
use qcvisor::{
    Config, ConnectionId, DetectionEvent, Event, EventKind, Hub, HubError, MemoryPersistence,
    ObserverMessage, ObserverStream, PersistOp, SessionStatus, StatusEvent, Subscribe,
};
use tokio::sync::Mutex;

fn id(s: &str) -> ConnectionId {
    ConnectionId::from(s)
}

async fn next(stream: &mut ObserverStream) -> Arc<ObserverMessage> {
    tokio::time::timeout(Duration::from_secs(1), stream.recv())
        .await
        .expect("observer message in time")
        .expect("stream open")
}

#[derive(Default)]
struct Recorder {
    kinds: Mutex<Vec<EventKind>>,
}

#[async_trait]
impl Subscribe for Recorder {
    async fn on_event(&self, ev: &Event) {
        self.kinds.lock().await.push(ev.kind);
    }

    fn name(&self) -> &'static str {
        "recorder"
    }
}

#[tokio::test]
async fn test_reference_scenario() {
    let hub = Hub::builder(Config::default()).build();
    let h = hub.handle();

    h.start_session().await.unwrap();
    let r1 = h.submit_detection(DetectionEvent::new(3, 1)).await.unwrap();
    let r2 = h.submit_detection(DetectionEvent::new(0, 2)).await.unwrap();
    assert_eq!((r1.total_baik, r1.total_cacat), (3, 1));
    assert_eq!((r2.total_baik, r2.total_cacat), (3, 3));
    assert_eq!((r1.sequence, r2.sequence), (1, 2));

    let live = h.current().await.unwrap().unwrap();
    assert_eq!((live.total_baik, live.total_cacat), (3, 3));

    let stopped = h.stop_session().await.unwrap().unwrap();
    assert_eq!(stopped.status, SessionStatus::Stopped);

    let err = h.submit_detection(DetectionEvent::new(1, 0)).await.unwrap_err();
    assert_eq!(err, HubError::NoActiveSession);

    hub.shutdown().await;
}

#[tokio::test]
async fn test_start_is_idempotent_and_stop_without_session_is_noop() {
    let hub = Hub::builder(Config::default()).build();
    let h = hub.handle();

    assert_eq!(h.stop_session().await.unwrap(), None);

    let first = h.start_session().await.unwrap();
    h.submit_detection(DetectionEvent::new(5, 5)).await.unwrap();
    let second = h.start_session().await.unwrap();

    assert!(first.created);
    assert!(!second.created);
    assert_eq!(second.session.session_id, first.session.session_id);
    assert_eq!(second.session.total_baik, 5);

    hub.shutdown().await;
}

#[tokio::test]
async fn test_negative_counts_are_rejected_without_mutation() {
    let hub = Hub::builder(Config::default()).build();
    let h = hub.handle();
    h.start_session().await.unwrap();
    h.submit_detection(DetectionEvent::new(2, 0)).await.unwrap();

    let err = h.submit_detection(DetectionEvent::new(-1, 4)).await.unwrap_err();
    assert_matches!(err, HubError::InvalidDetection { field: "baik", .. });

    let live = h.current().await.unwrap().unwrap();
    assert_eq!((live.total_baik, live.total_cacat, live.detection_count), (2, 0, 1));

    hub.shutdown().await;
}

#[tokio::test]
async fn test_only_one_producer_and_unauthorized_detections_change_nothing() {
    let hub = Hub::builder(Config::default()).build();
    let h = hub.handle();

    h.register_producer(&id("raspi-1")).await.unwrap();
    let err = h.register_producer(&id("raspi-2")).await.unwrap_err();
    assert_matches!(err, HubError::AlreadyRegistered { incumbent } if incumbent == id("raspi-1"));
    assert!(h.is_producer(&id("raspi-1")).await.unwrap());
    assert!(!h.is_producer(&id("raspi-2")).await.unwrap());

    let err = h
        .submit_detection_from(&id("raspi-2"), DetectionEvent::new(9, 9))
        .await
        .unwrap_err();
    assert_matches!(err, HubError::Unauthorized { .. });
    let live = h.current().await.unwrap().unwrap();
    assert_eq!((live.total_baik, live.total_cacat), (0, 0));

    h.submit_detection_from(&id("raspi-1"), DetectionEvent::new(1, 1))
        .await
        .unwrap();
    let live = h.current().await.unwrap().unwrap();
    assert_eq!((live.total_baik, live.total_cacat), (1, 1));

    hub.shutdown().await;
}

#[tokio::test]
async fn test_producer_loss_stops_once_and_notifies_every_observer() {
    let hub = Hub::builder(Config::default()).build();
    let h = hub.handle();

    h.register_producer(&id("raspi")).await.unwrap();
    let mut a = h.register_observer(&id("dash-a")).await.unwrap();
    let mut b = h.register_observer(&id("dash-b")).await.unwrap();
    for s in [&mut a, &mut b] {
        assert_eq!(next(s).await.name(), "session_stats");
        assert_eq!(next(s).await.name(), "detector_status");
    }

    let departure = h.disconnect(&id("raspi")).await.unwrap();
    assert!(departure.was_producer);
    assert!(departure.stopped.is_some());
    // Second report of the same loss changes nothing.
    let again = h.disconnect(&id("raspi")).await.unwrap();
    assert!(again.stopped.is_none());

    let status = h.status().await.unwrap();
    assert!(!status.detector_connected);
    assert_eq!(status.producer, None);

    for s in [&mut a, &mut b] {
        assert_matches!(
            next(s).await.as_ref(),
            ObserverMessage::DetectorStatus(StatusEvent { connected: false, .. })
        );
        assert!(s.try_recv().is_none());
    }

    // The slot is free again.
    let start = h.register_producer(&id("raspi-new")).await.unwrap();
    assert!(start.created);

    hub.shutdown().await;
}

#[tokio::test]
async fn test_observer_sees_baseline_before_concurrent_detections() {
    let hub = Hub::builder(Config::default()).build();
    let h = hub.handle();
    h.register_producer(&id("raspi")).await.unwrap();

    let producer = {
        let h = h.clone();
        tokio::spawn(async move {
            for _ in 0..200 {
                h.submit_detection_from(&id("raspi"), DetectionEvent::new(1, 0))
                    .await
                    .unwrap();
            }
        })
    };
    let mut obs = h.register_observer(&id("dash")).await.unwrap();
    producer.await.unwrap();

    let first = next(&mut obs).await;
    let ObserverMessage::SessionStats(Some(baseline)) = first.as_ref() else {
        panic!("first message must be the session baseline, got {first:?}");
    };
    assert_eq!(next(&mut obs).await.name(), "detector_status");

    // Every live record continues exactly where the baseline left off.
    let mut expected = baseline.total_baik;
    while let Some(msg) = obs.try_recv() {
        let ObserverMessage::Detection(record) = msg.as_ref() else {
            panic!("unexpected {msg:?}");
        };
        expected += 1;
        assert_eq!(record.total_baik, expected);
    }
    assert_eq!(expected, 200);

    hub.shutdown().await;
}

#[tokio::test]
async fn test_slow_observer_is_evicted_without_affecting_others() {
    let cfg = Config {
        observer_queue_capacity: 2,
        max_observer_drops: 3,
        ..Config::default()
    };
    let hub = Hub::builder(cfg).build();
    let h = hub.handle();
    h.start_session().await.unwrap();

    let mut slow = h.register_observer(&id("slow")).await.unwrap();
    let mut fast = h.register_observer(&id("fast")).await.unwrap();
    fast.drain();

    for _ in 0..5 {
        h.submit_detection(DetectionEvent::new(1, 0)).await.unwrap();
        assert_eq!(next(&mut fast).await.name(), "detection");
    }

    let status = h.status().await.unwrap();
    assert_eq!(status.observers, 1);

    // Baseline is still there, then the stream ends.
    assert_eq!(slow.drain().len(), 2);
    assert!(slow.recv().await.is_none());

    hub.shutdown().await;
}

#[tokio::test]
async fn test_persistence_receives_committed_transitions_in_order() {
    let store = Arc::new(MemoryPersistence::new());
    let hub = Hub::builder(Config::default())
        .with_persistence(store.clone())
        .build();
    let h = hub.handle();

    h.start_session().await.unwrap();
    h.submit_detection(DetectionEvent::new(1, 0)).await.unwrap();
    let _ = h.submit_detection(DetectionEvent::new(-1, 0)).await;
    h.submit_detection(DetectionEvent::new(0, 1)).await.unwrap();
    h.stop_session().await.unwrap();
    hub.shutdown().await;

    let ops = store.ops();
    let labels: Vec<_> = ops.iter().map(PersistOp::as_label).collect();
    assert_eq!(
        labels,
        [
            "persist_session_start",
            "persist_detection",
            "persist_detection",
            "persist_session_stop"
        ]
    );
    assert_matches!(&ops[3], PersistOp::SessionStopped(s) if s.total_baik == 1 && s.total_cacat == 1);
}

#[tokio::test]
async fn test_failing_persistence_never_affects_the_core() {
    let store = Arc::new(MemoryPersistence::failing());
    let recorder = Arc::new(Recorder::default());
    let hub = Hub::builder(Config::default())
        .with_persistence(store.clone())
        .with_subscribers(vec![recorder.clone() as Arc<dyn Subscribe>])
        .build();
    let h = hub.handle();

    h.start_session().await.unwrap();
    let record = h.submit_detection(DetectionEvent::new(4, 1)).await.unwrap();
    assert_eq!(record.total_baik, 4);
    assert!(h.stop_session().await.unwrap().is_some());
    hub.shutdown().await;

    assert_eq!(store.ops().len(), 3);
    let kinds = recorder.kinds.lock().await;
    let failures = kinds
        .iter()
        .filter(|k| **k == EventKind::PersistenceFailed)
        .count();
    assert_eq!(failures, 3);
    assert!(kinds.contains(&EventKind::SessionStarted));
    assert!(kinds.contains(&EventKind::SessionStopped));
}

#[tokio::test]
async fn test_handles_fail_with_closed_after_shutdown() {
    let hub = Hub::builder(Config::default()).build();
    let h = hub.handle();
    let mut obs = h.register_observer(&id("dash")).await.unwrap();
    hub.shutdown().await;

    assert_eq!(h.start_session().await.unwrap_err(), HubError::Closed);
    obs.drain();
    assert!(obs.recv().await.is_none());
}

fn baseline_connected(msgs: &[Arc<ObserverMessage>]) -> Option<bool> {
    msgs.iter().find_map(|m| match m.as_ref() {
        ObserverMessage::DetectorStatus(StatusEvent { connected, .. }) => Some(*connected),
        _ => None,
    })
}

#[tokio::test]
async fn test_presence_follows_the_producer_not_the_session() {
    let hub = Hub::builder(Config::default()).build();
    let h = hub.handle();

    // Session without a producer.
    h.start_session().await.unwrap();
    let mut early = h.register_observer(&id("dash-a")).await.unwrap();
    assert_eq!(h.status().await.unwrap().producer, None);
    assert_eq!(baseline_connected(&early.drain()), Some(false));

    // Producer joins the running session: announced once.
    h.register_producer(&id("raspi")).await.unwrap();
    assert_matches!(
        next(&mut early).await.as_ref(),
        ObserverMessage::DetectorStatus(StatusEvent { connected: true, .. })
    );

    // Manual stop keeps the producer registered.
    h.stop_session().await.unwrap();
    assert_matches!(
        next(&mut early).await.as_ref(),
        ObserverMessage::DetectorStatus(StatusEvent { connected: false, .. })
    );
    let mut late = h.register_observer(&id("dash-b")).await.unwrap();
    assert!(h.is_producer(&id("raspi")).await.unwrap());
    assert_eq!(baseline_connected(&late.drain()), Some(true));

    // Loss without an active session is still announced, once.
    let departure = h.disconnect(&id("raspi")).await.unwrap();
    assert!(departure.was_producer);
    assert!(departure.stopped.is_none());
    for s in [&mut early, &mut late] {
        assert_matches!(
            next(s).await.as_ref(),
            ObserverMessage::DetectorStatus(StatusEvent { connected: false, .. })
        );
        assert!(s.try_recv().is_none());
    }

    hub.shutdown().await;
}
