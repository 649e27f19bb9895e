#![no_std]
#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

pub mod camera;
pub mod detector;
pub mod gatt;
pub mod inference;
pub mod interface;
pub mod node;
pub mod transfer;
pub mod trigger;

// Re-export main types
pub use camera::{CameraConfig, CroppedImage, FrameAcquirer, FrameGeometry, PixelFormat, Resolution};
pub use detector::{Detector, DetectorConfig, DetectorKind, DetectorUpdate, Edge, Sample3D, Status};
pub use gatt::{Characteristic, LOCAL_NAME};
pub use interface::{Camera, Classifier, InertialSensor, Source, Transport};
pub use node::{Node, NodeConfig, TickEvent};
pub use transfer::{ChunkEmitter, TransferConfig, TransferProgress, YieldPoint};
pub use trigger::{CaptureTrigger, TriggerAction, TriggerConfig, TriggerState};

/// Monotonic timestamp in milliseconds
///
/// Supplied by the caller on every tick, e.g. `embassy_time::Instant::now().as_millis()`.
pub type Millis = u64;

/// Width of the model input image cropped from each frame
pub const TARGET_WIDTH: usize = 96;

/// Height of the model input image cropped from each frame
pub const TARGET_HEIGHT: usize = 96;

/// Number of pixels in one cropped model input image (96 x 96)
pub const TARGET_PIXELS: usize = TARGET_WIDTH * TARGET_HEIGHT;

/// Bytes in one raw QCIF grayscale frame (176 x 144, 1 byte per pixel)
pub const QCIF_FRAME_LEN: usize = 176 * 144;

/// Node sized for the reference board: QCIF grayscale frames cropped to 96x96
pub type SensingNode<T, S, C> = Node<T, S, C, QCIF_FRAME_LEN, TARGET_PIXELS>;

/// Pipeline errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// The wireless transport failed to start or advertise
    TransportInit,
    /// The inertial sensor failed to start
    SensorInit,
    /// The camera failed to start, or was used before `begin`
    CameraInit,
    /// Invalid configuration parameter
    InvalidConfig,
    /// A pre-allocated buffer cannot hold the requested data
    BufferTooSmall,
    /// The camera pixel format is not one byte per pixel
    UnsupportedPixelFormat,
    /// The camera reported no frame available
    FrameUnavailable,
    /// A write to the transport failed
    Transport,
    /// The peer disconnected before the transfer completed
    Cancelled {
        /// Bytes handed to the transport before the transfer was abandoned
        sent: usize,
    },
    /// The downstream classifier failed
    Inference,
    /// Writing diagnostic output failed
    Diagnostics,
}
