//! Common test utilities and mock implementations

pub mod test_utils;

pub use mock_interface::{
    MockCamera, MockClassifier, MockError, MockSensor, MockTransport, Operation,
};
pub use test_utils::{
    assert_float_eq, create_mock_node, create_mock_node_with, create_started_node,
    expected_qcif_crop, MockDelay,
};
