//! Debounced motion and rotation detectors
//!
//! Two instances of [`Detector`] watch the inertial sensor:
//! - [`DetectorKind::Motion`] looks at the accelerometer and measures how far
//!   the acceleration norm deviates from the 1 g gravity baseline
//! - [`DetectorKind::Rotation`] looks at the gyroscope and measures the norm of
//!   the angular velocity vector
//!
//! A magnitude above the threshold marks the detector active; it stays active
//! for a decay window after the last such sample (see [`debounce`]). Sensor
//! reads are rate limited to a fixed cadence by the detector itself, so
//! [`Detector::poll`] can be called from a faster loop.

pub mod debounce;

pub use debounce::{Debouncer, DetectorState, Edge};

use crate::gatt::Characteristic;
use crate::interface::{InertialSensor, Source};
use crate::{Error, Millis};

/// Decay window shared by both detectors (ms)
pub const DEFAULT_DECAY_MS: Millis = 500;

/// Sensor polling period (10 Hz)
pub const DEFAULT_SAMPLE_PERIOD_MS: Millis = 100;

/// Default linear motion threshold (deviation from 1 g, in g)
pub const DEFAULT_MOTION_THRESHOLD_G: f32 = 0.04;

/// Default rotation threshold (degrees per second)
pub const DEFAULT_ROTATION_THRESHOLD_DPS: f32 = 20.0;

/// Label published when a detector is inactive
pub const STILL_LABEL: &str = "STILL";

/// One 3-axis reading
#[derive(Debug, Default, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Sample3D {
    /// X axis
    pub x: f32,
    /// Y axis
    pub y: f32,
    /// Z axis
    pub z: f32,
}

impl Sample3D {
    /// Create a sample from its three axes
    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Euclidean norm of the vector
    #[must_use]
    pub fn norm(&self) -> f32 {
        libm::sqrtf(self.x * self.x + self.y * self.y + self.z * self.z)
    }
}

/// What a detector measures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DetectorKind {
    /// Linear motion from the accelerometer
    Motion,
    /// Rotation from the gyroscope
    Rotation,
}

impl DetectorKind {
    /// Sensor channel feeding this detector
    #[must_use]
    pub const fn source(self) -> Source {
        match self {
            Self::Motion => Source::Accelerometer,
            Self::Rotation => Source::Gyroscope,
        }
    }

    /// Magnitude compared against the threshold
    ///
    /// Motion: `|norm - 1 g|`. Rotation: `norm`.
    #[must_use]
    pub fn magnitude(self, sample: Sample3D) -> f32 {
        match self {
            Self::Motion => libm::fabsf(sample.norm() - 1.0),
            Self::Rotation => sample.norm(),
        }
    }

    /// Label published while the detector is active
    #[must_use]
    pub const fn active_label(self) -> &'static str {
        match self {
            Self::Motion => "MOVING",
            Self::Rotation => "ROTATING",
        }
    }

    /// Characteristic carrying this detector's label
    #[must_use]
    pub const fn characteristic(self) -> Characteristic {
        match self {
            Self::Motion => Characteristic::MotionStatus,
            Self::Rotation => Characteristic::RotationStatus,
        }
    }
}

/// Debounced detector output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Status {
    /// Above threshold within the decay window
    Active,
    /// Quiet for at least the decay window
    Inactive,
}

/// Detector configuration
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DetectorConfig {
    /// Magnitude above which a sample counts as activity
    pub threshold: f32,
    /// How long the output stays active after the last active sample (ms)
    pub decay_ms: Millis,
    /// Minimum time between sensor polls (ms)
    pub sample_period_ms: Millis,
}

impl DetectorConfig {
    /// Reference configuration for linear motion (0.04 g, 500 ms decay)
    #[must_use]
    pub const fn motion() -> Self {
        Self {
            threshold: DEFAULT_MOTION_THRESHOLD_G,
            decay_ms: DEFAULT_DECAY_MS,
            sample_period_ms: DEFAULT_SAMPLE_PERIOD_MS,
        }
    }

    /// Reference configuration for rotation (20 °/s, 500 ms decay)
    #[must_use]
    pub const fn rotation() -> Self {
        Self {
            threshold: DEFAULT_ROTATION_THRESHOLD_DPS,
            decay_ms: DEFAULT_DECAY_MS,
            sample_period_ms: DEFAULT_SAMPLE_PERIOD_MS,
        }
    }

    /// Reference configuration for `kind`
    #[must_use]
    pub const fn for_kind(kind: DetectorKind) -> Self {
        match kind {
            DetectorKind::Motion => Self::motion(),
            DetectorKind::Rotation => Self::rotation(),
        }
    }

    /// Replace the decay window
    #[must_use]
    pub const fn with_decay_ms(mut self, decay_ms: Millis) -> Self {
        self.decay_ms = decay_ms;
        self
    }

    /// Check the configuration
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` if the threshold is negative or not
    /// finite, or if the decay window or sample period is zero.
    pub fn validate(&self) -> Result<(), Error> {
        if !self.threshold.is_finite() || self.threshold < 0.0 {
            return Err(Error::InvalidConfig);
        }
        if self.decay_ms == 0 || self.sample_period_ms == 0 {
            return Err(Error::InvalidConfig);
        }
        Ok(())
    }
}

/// Result of feeding one sample to a detector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DetectorUpdate {
    /// Debounced output after the sample
    pub active: bool,
    /// Set once per transition of the debounced output
    pub edge: Option<Edge>,
}

/// Threshold + decay detector for one inertial channel
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Detector {
    kind: DetectorKind,
    config: DetectorConfig,
    debouncer: Debouncer,
    last_poll: Option<Millis>,
}

impl Detector {
    /// Create a detector
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` if `config` does not validate.
    pub fn new(kind: DetectorKind, config: DetectorConfig) -> Result<Self, Error> {
        config.validate()?;
        Ok(Self {
            kind,
            config,
            debouncer: Debouncer::new(config.decay_ms),
            last_poll: None,
        })
    }

    /// Linear motion detector with the reference configuration
    #[must_use]
    pub const fn motion() -> Self {
        Self::with_defaults(DetectorKind::Motion)
    }

    /// Rotation detector with the reference configuration
    #[must_use]
    pub const fn rotation() -> Self {
        Self::with_defaults(DetectorKind::Rotation)
    }

    const fn with_defaults(kind: DetectorKind) -> Self {
        let config = DetectorConfig::for_kind(kind);
        Self {
            kind,
            config,
            debouncer: Debouncer::new(config.decay_ms),
            last_poll: None,
        }
    }

    /// Feed one sample taken at `now`
    pub fn update(&mut self, sample: Sample3D, now: Millis) -> DetectorUpdate {
        let triggered = self.kind.magnitude(sample) > self.config.threshold;
        let edge = self.debouncer.update(triggered, now);

        #[cfg(feature = "defmt")]
        {
            if let Some(edge) = edge {
                defmt::info!("{} state: {} ({})", self.kind, self.label(), edge);
            }
        }

        DetectorUpdate {
            active: self.debouncer.is_active(),
            edge,
        }
    }

    /// Whether the sampling period has elapsed since the last poll
    #[must_use]
    pub fn is_due(&self, now: Millis) -> bool {
        self.last_poll
            .map_or(true, |last| now.saturating_sub(last) >= self.config.sample_period_ms)
    }

    /// Read the sensor if the sampling period has elapsed and feed the sample
    ///
    /// Returns `None` when the poll is not due yet, when no sample is
    /// available, or when the read fails; the debounced state is left
    /// untouched in those cases.
    pub fn poll<S>(&mut self, sensor: &mut S, now: Millis) -> Option<DetectorUpdate>
    where
        S: InertialSensor,
    {
        if !self.is_due(now) {
            return None;
        }
        self.last_poll = Some(now);

        let source = self.kind.source();
        if !sensor.sample_available(source) {
            return None;
        }

        match sensor.read_sample(source) {
            Ok(sample) => Some(self.update(sample, now)),
            Err(_e) => {
                #[cfg(feature = "defmt")]
                defmt::warn!(
                    "{} read failed: {}",
                    source,
                    defmt::Debug2Format(&_e)
                );
                None
            }
        }
    }

    /// Current debounced output
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.debouncer.is_active()
    }

    /// Snapshot of the debounced output
    #[must_use]
    pub const fn status(&self) -> Status {
        if self.debouncer.is_active() {
            Status::Active
        } else {
            Status::Inactive
        }
    }

    /// Label for the current output (`MOVING`, `ROTATING` or `STILL`)
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self.status() {
            Status::Active => self.kind.active_label(),
            Status::Inactive => STILL_LABEL,
        }
    }

    /// What this detector measures
    #[must_use]
    pub const fn kind(&self) -> DetectorKind {
        self.kind
    }

    /// Active configuration
    #[must_use]
    pub const fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Debounce state snapshot
    #[must_use]
    pub const fn state(&self) -> DetectorState {
        self.debouncer.state()
    }
}
