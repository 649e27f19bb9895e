//! Collaborator interfaces for the capture pipeline
//!
//! The radio stack, the inertial sensor, the camera and the inference engine
//! are driven by their own drivers. This module defines the narrow contracts
//! the pipeline needs from each of them; board support code implements these
//! traits on top of the concrete drivers (for example an LSM9DS1 on I2C and an
//! OV7675 on the parallel camera bus).
//!
//! Every trait carries its own `Error` type. The pipeline logs these errors
//! (with the `defmt` feature) and maps them onto [`crate::Error`].

use core::fmt::Debug;

use crate::camera::{PixelFormat, Resolution};
use crate::detector::Sample3D;
use crate::gatt::Characteristic;

/// Short-range wireless transport (a BLE peripheral exposing GATT characteristics)
pub trait Transport {
    /// Transport error
    type Error: Debug;

    /// Start the radio, register `characteristics` and set the advertised name
    ///
    /// # Errors
    ///
    /// Returns an error if the radio stack cannot be brought up.
    fn begin(
        &mut self,
        local_name: &str,
        characteristics: &[Characteristic],
    ) -> Result<(), Self::Error>;

    /// Service the stack's internal state machine
    ///
    /// Must be called regularly, including during long operations, or the
    /// link is silently dropped.
    fn poll(&mut self);

    /// Whether a central is currently connected
    fn is_peer_connected(&mut self) -> bool;

    /// Set the value of a characteristic and notify subscribers
    ///
    /// `value` never exceeds [`Characteristic::max_payload`].
    ///
    /// # Errors
    ///
    /// Returns an error if the stack rejects the write.
    fn write_value(
        &mut self,
        characteristic: Characteristic,
        value: &[u8],
    ) -> Result<(), Self::Error>;

    /// Start (or restart) advertising
    ///
    /// # Errors
    ///
    /// Returns an error if advertising cannot be started.
    fn advertise(&mut self) -> Result<(), Self::Error>;
}

/// Inertial measurement channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Source {
    /// Linear acceleration in g
    Accelerometer,
    /// Angular velocity in degrees per second
    Gyroscope,
}

/// Inertial sensor with independent accelerometer and gyroscope channels
pub trait InertialSensor {
    /// Sensor error
    type Error: Debug;

    /// Start the sensor
    ///
    /// Must be idempotent: several consumers may call it.
    ///
    /// # Errors
    ///
    /// Returns an error if the sensor does not respond.
    fn begin(&mut self) -> Result<(), Self::Error>;

    /// Whether a new sample is ready on `source`
    fn sample_available(&mut self, source: Source) -> bool;

    /// Read the latest sample from `source`
    ///
    /// # Errors
    ///
    /// Returns an error if the bus transaction fails.
    fn read_sample(&mut self, source: Source) -> Result<Sample3D, Self::Error>;
}

/// Camera sensor delivering raw frames at its native resolution
pub trait Camera {
    /// Camera error
    type Error: Debug;

    /// Start the camera
    ///
    /// # Errors
    ///
    /// Returns an error if the sensor does not respond or rejects the mode.
    fn begin(
        &mut self,
        resolution: Resolution,
        format: PixelFormat,
        frame_rate_divisor: u8,
    ) -> Result<(), Self::Error>;

    /// Native frame width in pixels
    fn width(&self) -> usize;

    /// Native frame height in pixels
    fn height(&self) -> usize;

    /// Bytes per pixel of the configured format
    fn bytes_per_pixel(&self) -> usize;

    /// Read one frame, row-major, into `buffer`
    ///
    /// `buffer` is exactly `width * height * bytes_per_pixel` bytes long.
    ///
    /// # Errors
    ///
    /// Returns an error if no frame is available.
    fn read_frame(&mut self, buffer: &mut [u8]) -> Result<(), Self::Error>;
}

/// Opaque downstream scorer (e.g. a quantized person-detection model)
pub trait Classifier {
    /// Inference error
    type Error: Debug;

    /// Run inference over `input` and write one score per class to `scores`
    ///
    /// `input` holds the cropped image as int8 tensor bytes (two's complement).
    ///
    /// # Errors
    ///
    /// Returns an error if the model cannot be evaluated.
    fn infer(&mut self, input: &[u8], scores: &mut [f32]) -> Result<(), Self::Error>;
}
