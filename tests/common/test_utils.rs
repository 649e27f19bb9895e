//! Test utilities and helper functions

use crate::common::mock_interface::{MockCamera, MockSensor, MockTransport};
use still_capture::camera::remap_byte;
use still_capture::{NodeConfig, SensingNode, TARGET_HEIGHT, TARGET_WIDTH};

/// Mock delay implementation for testing
///
/// Returns immediately, but records every millisecond pause so tests can
/// check the pacing.
#[derive(Debug, Clone, Default)]
pub struct MockDelay {
    /// Millisecond pauses in call order
    pub pauses: Vec<u32>,
}

impl MockDelay {
    /// Sum of all recorded pauses (ms)
    pub fn total_ms(&self) -> u64 {
        self.pauses.iter().map(|&ms| u64::from(ms)).sum()
    }
}

impl embedded_hal::delay::DelayNs for MockDelay {
    fn delay_ns(&mut self, _ns: u32) {
        // No-op for testing
    }

    fn delay_ms(&mut self, ms: u32) {
        self.pauses.push(ms);
    }
}

#[cfg(feature = "async")]
impl embedded_hal_async::delay::DelayNs for MockDelay {
    async fn delay_ns(&mut self, _ns: u32) {
        // No-op for testing
    }

    async fn delay_ms(&mut self, ms: u32) {
        self.pauses.push(ms);
    }
}

/// Mock node with the reference sizes
pub type MockNode = SensingNode<MockTransport, MockSensor, MockCamera>;

/// Create a mock node, not yet started
/// Returns (node, transport, sensor, camera) where the mocks share state with the node
pub fn create_mock_node() -> (MockNode, MockTransport, MockSensor, MockCamera) {
    create_mock_node_with(NodeConfig::default())
}

/// Create a mock node with a custom configuration
pub fn create_mock_node_with(
    config: NodeConfig,
) -> (MockNode, MockTransport, MockSensor, MockCamera) {
    let transport = MockTransport::new();
    let sensor = MockSensor::new();
    let camera = MockCamera::new();
    let node = MockNode::new(transport.clone(), sensor.clone(), camera.clone(), config)
        .expect("Failed to create mock node");
    (node, transport, sensor, camera)
}

/// Create a started mock node with an empty operation log
pub fn create_started_node() -> (MockNode, MockTransport, MockSensor, MockCamera) {
    let (mut node, transport, sensor, camera) = create_mock_node();
    node.begin().expect("Failed to start mock node");
    transport.clear_operations();
    (node, transport, sensor, camera)
}

/// The 96x96 crop of the mock camera's QCIF gradient, remapped
pub fn expected_qcif_crop() -> Vec<u8> {
    let mut out = Vec::with_capacity(TARGET_WIDTH * TARGET_HEIGHT);
    for y in 0..TARGET_HEIGHT {
        for x in 0..TARGET_WIDTH {
            out.push(remap_byte(MockCamera::gradient(40 + x, 24 + y)));
        }
    }
    out
}

/// Assert that two floating point values are approximately equal
pub fn assert_float_eq(a: f32, b: f32, epsilon: f32) {
    let diff = (a - b).abs();
    assert!(
        diff < epsilon,
        "Values not equal within epsilon: {} vs {} (diff: {}, epsilon: {})",
        a,
        b,
        diff,
        epsilon
    );
}
