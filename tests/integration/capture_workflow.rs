//! Integration tests for the capture workflow

use crate::common::{
    create_mock_node, create_mock_node_with, create_started_node, expected_qcif_crop,
    test_utils::MockNode, MockClassifier, MockDelay, Operation,
};
use still_capture::detector::DetectorConfig;
use still_capture::{
    Characteristic, Error, NodeConfig, PixelFormat, TickEvent, TriggerConfig, TriggerState,
    LOCAL_NAME,
};

/// Tick every 10 ms over `[from, to)`, returning the non-settling events
fn run_ticks(
    node: &mut MockNode,
    delay: &mut MockDelay,
    from: u64,
    to: u64,
) -> Vec<(u64, TickEvent)> {
    (from..to)
        .step_by(10)
        .map(|now| (now, node.tick(now, delay)))
        .filter(|(_, event)| !matches!(event, TickEvent::Settling | TickEvent::Idle))
        .collect()
}

#[test]
fn test_begin_sequence() {
    let (mut node, transport, sensor, _camera) = create_mock_node();
    let geometry = node.begin().unwrap();
    assert_eq!((geometry.width, geometry.height), (176, 144));

    let ops = transport.operations();
    assert_eq!(
        ops[0],
        Operation::Begin {
            local_name: LOCAL_NAME.to_string(),
            characteristics: 4,
        }
    );
    assert_eq!(transport.labels(Characteristic::MotionStatus), ["STILL"]);
    assert_eq!(transport.labels(Characteristic::RotationStatus), ["STILL"]);
    assert_eq!(ops.last(), Some(&Operation::Advertise));
    assert_eq!(sensor.begin_count(), 1);
}

#[test]
fn test_begin_failures_are_fatal() {
    let (mut node, transport, _, _) = create_mock_node();
    transport.fail_begin();
    assert_eq!(node.begin(), Err(Error::TransportInit));

    let (mut node, _, sensor, _) = create_mock_node();
    sensor.fail_begin();
    assert_eq!(node.begin(), Err(Error::SensorInit));

    let (mut node, _, _, camera) = create_mock_node();
    camera.fail_begin();
    assert_eq!(node.begin(), Err(Error::CameraInit));

    let (mut node, transport, _, _) = create_mock_node();
    transport.fail_advertise();
    assert_eq!(node.begin(), Err(Error::TransportInit));

    let mut config = NodeConfig::default();
    config.camera.format = PixelFormat::Yuv422;
    let (mut node, _, _, _) = create_mock_node_with(config);
    assert_eq!(node.begin(), Err(Error::UnsupportedPixelFormat));
}

#[test]
fn test_capture_after_rest_threshold() {
    let (mut node, transport, _sensor, _camera) = create_started_node();
    let mut delay = MockDelay::default();

    assert_eq!(node.tick(0, &mut delay), TickEvent::Settling);
    assert!(run_ticks(&mut node, &mut delay, 10, 3000).is_empty());
    assert!(transport.writes_to(Characteristic::Image).is_empty());

    let TickEvent::Captured(progress) = node.tick(3000, &mut delay) else {
        panic!("expected a capture at 3000 ms");
    };
    assert_eq!(progress.total(), 9216);
    assert_eq!(progress.chunk_count(), 72);
    assert_eq!(transport.image_bytes(), expected_qcif_crop());
    assert_eq!(node.captures(), 1);
    assert_eq!(node.trigger().state(), TriggerState::Captured);
}

#[test]
fn test_one_capture_per_rest_period() {
    let (mut node, transport, _sensor, camera) = create_started_node();
    let mut delay = MockDelay::default();

    let events = run_ticks(&mut node, &mut delay, 0, 20_000);
    assert_eq!(events.len(), 1);
    assert!(matches!(events[0], (3000, TickEvent::Captured(_))));
    assert_eq!(camera.read_count(), 1);
    assert_eq!(transport.writes_to(Characteristic::Image).len(), 72);
}

#[test]
fn test_motion_resets_rest_clock_and_publishes_on_change() {
    let (mut node, transport, sensor, _camera) = create_started_node();
    let mut delay = MockDelay::default();

    node.tick(0, &mut delay);
    run_ticks(&mut node, &mut delay, 10, 1000);

    sensor.set_accel(0.0, 0.0, 1.5);
    assert_eq!(node.tick(1000, &mut delay), TickEvent::Reset);
    assert_eq!(transport.labels(Characteristic::MotionStatus), ["MOVING"]);

    // Still samples from 1100 on; the detector holds until 1500
    sensor.set_still();
    let events = run_ticks(&mut node, &mut delay, 1010, 4100);
    assert!(events.iter().all(|(now, event)| *now < 1500 && *event == TickEvent::Active));
    assert_eq!(transport.labels(Characteristic::MotionStatus), ["MOVING", "STILL"]);
    assert!(transport.labels(Characteristic::RotationStatus).is_empty());

    // Rest counts from the last active tick (1490)
    assert!(matches!(node.tick(4490, &mut delay), TickEvent::Captured(_)));
}

#[test]
fn test_rotation_alone_blocks_capture() {
    let (mut node, transport, sensor, _camera) = create_started_node();
    let mut delay = MockDelay::default();

    sensor.set_gyro(0.0, 0.0, 90.0);
    let events = run_ticks(&mut node, &mut delay, 0, 10_000);
    assert!(events.iter().all(|(_, event)| *event == TickEvent::Active));
    assert_eq!(transport.labels(Characteristic::RotationStatus), ["ROTATING"]);
    assert!(transport.labels(Characteristic::MotionStatus).is_empty());
    assert!(node.rotation().is_active());
}

#[test]
fn test_status_written_only_on_change() {
    let (mut node, transport, sensor, _camera) = create_started_node();
    let mut delay = MockDelay::default();

    for (start, moving) in [(0, true), (2000, false), (4000, true), (6000, false)] {
        if moving {
            sensor.set_accel(0.3, 0.0, 1.0);
        } else {
            sensor.set_still();
        }
        run_ticks(&mut node, &mut delay, start, start + 2000);
    }

    assert_eq!(
        transport.labels(Characteristic::MotionStatus),
        ["MOVING", "STILL", "MOVING", "STILL"]
    );
}

#[test]
fn test_capture_failures_retry_indefinitely() {
    let (mut node, _transport, _sensor, camera) = create_started_node();
    let mut delay = MockDelay::default();
    camera.fail_next_frames(5);

    let events = run_ticks(&mut node, &mut delay, 0, 20_000);
    let expected: Vec<(u64, TickEvent)> = (1..=5)
        .map(|i| (i * 3000, TickEvent::CaptureFailed))
        .collect();
    assert_eq!(&events[..5], expected.as_slice());
    assert!(matches!(events[5], (18_000, TickEvent::Captured(_))));
    assert_eq!(events.len(), 6);
    assert_eq!(camera.read_count(), 6);
}

#[test]
fn test_no_peer_defers_capture() {
    let (mut node, transport, _sensor, camera) = create_started_node();
    let mut delay = MockDelay::default();
    transport.set_connected(false);

    let events = run_ticks(&mut node, &mut delay, 0, 6500);
    assert_eq!(
        events,
        [(3000, TickEvent::Deferred), (6000, TickEvent::Deferred)]
    );
    assert_eq!(camera.read_count(), 0);

    transport.set_connected(true);
    let events = run_ticks(&mut node, &mut delay, 6500, 9500);
    assert!(matches!(events[..], [(9000, TickEvent::Captured(_))]));
}

#[test]
fn test_peer_drop_cancels_transfer_and_readvertises() {
    let (mut node, transport, _sensor, _camera) = create_started_node();
    let mut delay = MockDelay::default();

    run_ticks(&mut node, &mut delay, 0, 3000);
    transport.disconnect_after_writes(20);
    assert_eq!(
        node.tick(3000, &mut delay),
        TickEvent::TransferCancelled { sent: 20 * 128 }
    );
    assert_eq!(node.trigger().state(), TriggerState::Waiting);
    assert_eq!(node.captures(), 0);

    // The next tick notices the drop and advertises again
    assert_eq!(transport.advertise_count(), 0);
    node.tick(3010, &mut delay);
    assert_eq!(transport.advertise_count(), 1);
    assert!(!node.is_peer_connected());

    // Peer returns; the image is sent after another full rest period
    transport.set_connected(true);
    transport.clear_operations();
    let events = run_ticks(&mut node, &mut delay, 3020, 7000);
    assert!(matches!(events[..], [(6000, TickEvent::Captured(_))]));
    assert_eq!(transport.image_bytes(), expected_qcif_crop());
}

#[test]
fn test_write_failure_retries() {
    let (mut node, transport, _sensor, _camera) = create_started_node();
    let mut delay = MockDelay::default();

    run_ticks(&mut node, &mut delay, 0, 3000);
    transport.fail_next_write();
    assert_eq!(node.tick(3000, &mut delay), TickEvent::TransferFailed);
    assert!(matches!(node.tick(6000, &mut delay), TickEvent::Captured(_)));
}

#[test]
fn test_sensor_errors_do_not_stop_loop() {
    let (mut node, _transport, sensor, _camera) = create_started_node();
    let mut delay = MockDelay::default();

    sensor.fail_next_read();
    assert_eq!(node.tick(0, &mut delay), TickEvent::Settling);
    sensor.set_available(false);
    let events = run_ticks(&mut node, &mut delay, 10, 3010);
    assert!(matches!(events[..], [(3000, TickEvent::Captured(_))]));
}

#[test]
fn test_transfer_pacing() {
    let (mut node, transport, _sensor, _camera) = create_started_node();
    let mut delay = MockDelay::default();

    run_ticks(&mut node, &mut delay, 0, 3000);
    transport.clear_operations();
    node.tick(3000, &mut delay);

    // One poll to service the link, then one per chunk
    assert_eq!(transport.poll_count(), 73);
    assert_eq!(delay.total_ms(), 72 * 25);
}

#[test]
fn test_custom_rest_threshold() {
    let config = NodeConfig {
        trigger: TriggerConfig {
            rest_threshold_ms: 500,
        },
        motion: DetectorConfig::motion().with_decay_ms(100),
        ..NodeConfig::default()
    };
    let (mut node, _transport, _sensor, _camera) = create_mock_node_with(config);
    node.begin().unwrap();
    let mut delay = MockDelay::default();

    let events = run_ticks(&mut node, &mut delay, 0, 1000);
    assert!(matches!(events[..], [(500, TickEvent::Captured(_))]));
}

#[test]
fn test_classify_publishes_top_class() {
    let (mut node, transport, _sensor, _camera) = create_started_node();
    let mut delay = MockDelay::default();
    let mut classifier = MockClassifier::with_scores(&[0.13, 0.87]);
    let mut scores = [0.0f32; 2];

    assert_eq!(
        node.classify(&mut classifier, &["No person", "Person"], &mut scores),
        Err(Error::FrameUnavailable)
    );

    run_ticks(&mut node, &mut delay, 0, 3010);
    let class = node
        .classify(&mut classifier, &["No person", "Person"], &mut scores)
        .unwrap();

    assert_eq!(class, 1);
    assert_eq!(classifier.last_input_len, Some(9216));
    assert_eq!(transport.labels(Characteristic::Inference), ["Person: 0.87"]);
}

#[test]
fn test_classify_errors() {
    let (mut node, _transport, _sensor, _camera) = create_started_node();
    let mut delay = MockDelay::default();
    run_ticks(&mut node, &mut delay, 0, 3010);
    let mut scores = [0.0f32; 2];

    let mut failing = MockClassifier {
        fail: true,
        ..MockClassifier::default()
    };
    assert_eq!(
        node.classify(&mut failing, &["a", "b"], &mut scores),
        Err(Error::Inference)
    );

    let mut classifier = MockClassifier::with_scores(&[0.1, 0.9]);
    assert_eq!(
        node.classify(&mut classifier, &["only one"], &mut scores),
        Err(Error::InvalidConfig)
    );
}

#[test]
fn test_dump_image() {
    let (mut node, transport, _sensor, _camera) = create_started_node();
    let mut delay = MockDelay::default();
    let mut out = String::new();

    assert_eq!(node.dump_image(&mut out, &mut delay), Err(Error::FrameUnavailable));

    run_ticks(&mut node, &mut delay, 0, 3010);
    transport.clear_operations();
    let rows = node.dump_image(&mut out, &mut delay).unwrap();

    assert_eq!(rows, 96);
    assert_eq!(transport.poll_count(), 96);
    let first: Vec<&str> = out.lines().next().unwrap().split(',').collect();
    assert_eq!(first.len(), 96);
    assert_eq!(first[0], format!("{:02X}", expected_qcif_crop()[0]));
}

#[test]
fn test_release_returns_collaborators() {
    let (node, _transport, _sensor, _camera) = create_mock_node();
    let (_transport, _sensor, _camera) = node.release();
}
