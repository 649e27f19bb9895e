//! Orchestration loop
//!
//! [`Node`] owns every collaborator and all pipeline state. Each call to
//! [`Node::tick`] performs one pass of the loop:
//!
//! 1. service the transport and re-advertise if the peer dropped,
//! 2. poll both detectors and publish status labels that changed,
//! 3. evaluate the capture trigger,
//! 4. on `Capture`, acquire a frame and stream the cropped image.
//!
//! A failed capture, a failed transfer and a cancelled transfer all return
//! the trigger to `Waiting`, so the capture is retried after the next full
//! rest period.
//!
//! # Example
//!
//! ```ignore
//! use still_capture::{NodeConfig, SensingNode};
//!
//! let mut node: SensingNode<_, _, _> = SensingNode::new(ble, imu, camera, NodeConfig::default())?;
//! node.begin()?;
//! node.run(|| Instant::now().as_millis(), &mut Delay);
//! ```

use core::fmt::Write;

use crate::camera::{CameraConfig, FrameAcquirer, FrameGeometry};
use crate::detector::{Detector, DetectorConfig, DetectorKind};
use crate::gatt::{Characteristic, LOCAL_NAME};
use crate::inference::{format_result, top_class};
use crate::interface::{Camera, Classifier, InertialSensor, Transport};
use crate::transfer::hexdump::HexDump;
use crate::transfer::{ChunkEmitter, TransferConfig, TransferProgress};
use crate::trigger::{CaptureTrigger, TriggerAction, TriggerConfig, TriggerState};
use crate::{Error, Millis, TARGET_HEIGHT, TARGET_WIDTH};

/// Default loop cadence (ms)
pub const DEFAULT_TICK_MS: u32 = 10;

/// Node configuration
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct NodeConfig {
    /// Linear motion detector
    pub motion: DetectorConfig,
    /// Rotation detector
    pub rotation: DetectorConfig,
    /// Capture trigger
    pub trigger: TriggerConfig,
    /// Camera mode
    pub camera: CameraConfig,
    /// Image transfer
    pub transfer: TransferConfig,
    /// Width of the cropped image
    pub target_width: usize,
    /// Height of the cropped image
    pub target_height: usize,
    /// Pause between loop passes in [`Node::run`] (ms)
    pub tick_ms: u32,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            motion: DetectorConfig::motion(),
            rotation: DetectorConfig::rotation(),
            trigger: TriggerConfig::default(),
            camera: CameraConfig::default(),
            transfer: TransferConfig::default(),
            target_width: TARGET_WIDTH,
            target_height: TARGET_HEIGHT,
            tick_ms: DEFAULT_TICK_MS,
        }
    }
}

impl NodeConfig {
    /// Validate against a node able to hold `pixels` cropped pixels
    ///
    /// # Errors
    ///
    /// - `Error::InvalidConfig` if a detector or transfer parameter is invalid,
    ///   the target is empty, or `tick_ms` is zero
    /// - `Error::BufferTooSmall` if the target exceeds `pixels`
    pub fn validate(&self, pixels: usize) -> Result<(), Error> {
        self.motion.validate()?;
        self.rotation.validate()?;
        self.transfer.validate(Characteristic::Image)?;
        if self.target_width == 0 || self.target_height == 0 || self.tick_ms == 0 {
            return Err(Error::InvalidConfig);
        }
        if self.target_width * self.target_height > pixels {
            return Err(Error::BufferTooSmall);
        }
        Ok(())
    }
}

/// What one loop pass did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TickEvent {
    /// Nothing to do
    Idle,
    /// A detector is active; the trigger is held in reset
    Active,
    /// Activity just restarted the rest clock
    Reset,
    /// Still, waiting for the rest threshold
    Settling,
    /// The trigger fired with no peer connected; retried after the next rest period
    Deferred,
    /// An image was captured and streamed
    Captured(TransferProgress),
    /// The camera produced no frame
    CaptureFailed,
    /// The peer dropped during the transfer
    TransferCancelled {
        /// Bytes sent before the transfer was abandoned
        sent: usize,
    },
    /// A chunk write failed
    TransferFailed,
}

/// Motion-gated capture node
///
/// `RAW` is the raw frame capacity in bytes, `PIXELS` the cropped image
/// capacity. See [`SensingNode`](crate::SensingNode) for the reference sizes.
pub struct Node<T, S, C, const RAW: usize, const PIXELS: usize> {
    transport: T,
    sensor: S,
    acquirer: FrameAcquirer<C, RAW, PIXELS>,
    motion: Detector,
    rotation: Detector,
    trigger: CaptureTrigger,
    emitter: ChunkEmitter,
    config: NodeConfig,
    peer_connected: bool,
    captures: u32,
}

impl<T, S, C, const RAW: usize, const PIXELS: usize> Node<T, S, C, RAW, PIXELS>
where
    T: Transport,
    S: InertialSensor,
    C: Camera,
{
    /// Assemble a node; call [`begin`](Self::begin) before ticking
    ///
    /// # Errors
    ///
    /// Returns the error from [`NodeConfig::validate`].
    pub fn new(transport: T, sensor: S, camera: C, config: NodeConfig) -> Result<Self, Error> {
        config.validate(PIXELS)?;
        Ok(Self {
            transport,
            sensor,
            acquirer: FrameAcquirer::new(camera),
            motion: Detector::new(DetectorKind::Motion, config.motion)?,
            rotation: Detector::new(DetectorKind::Rotation, config.rotation)?,
            trigger: CaptureTrigger::new(config.trigger),
            emitter: ChunkEmitter::new(config.transfer)?,
            config,
            peer_connected: false,
            captures: 0,
        })
    }

    /// Start every collaborator, publish the initial labels and advertise
    ///
    /// Any error is fatal: firmware is expected to halt.
    ///
    /// # Errors
    ///
    /// - `Error::TransportInit` if the radio, the initial writes or
    ///   advertising fail
    /// - `Error::SensorInit` if the inertial sensor fails to start
    /// - the camera errors of [`FrameAcquirer::begin`]
    pub fn begin(&mut self) -> Result<FrameGeometry, Error> {
        self.transport
            .begin(LOCAL_NAME, &Characteristic::ALL)
            .map_err(|_e| {
                #[cfg(feature = "defmt")]
                defmt::error!("Transport begin failed: {}", defmt::Debug2Format(&_e));
                Error::TransportInit
            })?;

        self.sensor.begin().map_err(|_e| {
            #[cfg(feature = "defmt")]
            defmt::error!("IMU begin failed: {}", defmt::Debug2Format(&_e));
            Error::SensorInit
        })?;

        let geometry = self.acquirer.begin(&self.config.camera)?;

        for detector in [&self.motion, &self.rotation] {
            self.transport
                .write_value(detector.kind().characteristic(), detector.label().as_bytes())
                .map_err(|_| Error::TransportInit)?;
        }

        self.transport.advertise().map_err(|_e| {
            #[cfg(feature = "defmt")]
            defmt::error!("Advertising failed: {}", defmt::Debug2Format(&_e));
            Error::TransportInit
        })?;

        #[cfg(feature = "defmt")]
        defmt::info!("{} advertising", LOCAL_NAME);

        Ok(geometry)
    }

    /// Service the transport and track the peer connection
    ///
    /// Restarts advertising when a previously connected peer has gone.
    pub fn service_link(&mut self) {
        self.transport.poll();
        let connected = self.transport.is_peer_connected();

        if self.peer_connected && !connected {
            #[cfg(feature = "defmt")]
            defmt::info!("Peer disconnected, advertising");
            if let Err(_e) = self.transport.advertise() {
                #[cfg(feature = "defmt")]
                defmt::warn!("Re-advertising failed: {}", defmt::Debug2Format(&_e));
            }
        } else if connected && !self.peer_connected {
            #[cfg(feature = "defmt")]
            defmt::info!("Peer connected");
        }

        self.peer_connected = connected;
    }

    /// Poll both detectors and publish labels that changed
    ///
    /// Returns whether either detector is active.
    pub fn sense(&mut self, now: Millis) -> bool {
        for detector in [&mut self.motion, &mut self.rotation] {
            let changed = detector
                .poll(&mut self.sensor, now)
                .is_some_and(|update| update.edge.is_some());
            if changed {
                Self::publish_status(&mut self.transport, detector);
            }
        }
        self.motion.is_active() || self.rotation.is_active()
    }

    fn publish_status(transport: &mut T, detector: &Detector) {
        if let Err(_e) =
            transport.write_value(detector.kind().characteristic(), detector.label().as_bytes())
        {
            #[cfg(feature = "defmt")]
            defmt::warn!(
                "Status write failed for {}: {}",
                detector.kind(),
                defmt::Debug2Format(&_e)
            );
        }
    }

    /// Everything up to the capture decision; `None` means capture now
    fn step(&mut self, now: Millis) -> Option<TickEvent> {
        self.service_link();
        let any_active = self.sense(now);

        match self.trigger.evaluate(any_active, now) {
            TriggerAction::Capture => None,
            TriggerAction::Reset => Some(TickEvent::Reset),
            TriggerAction::EnsureStillness => Some(TickEvent::Settling),
            TriggerAction::None if any_active => Some(TickEvent::Active),
            TriggerAction::None => match self.trigger.state() {
                TriggerState::Waiting => Some(TickEvent::Settling),
                TriggerState::Idle | TriggerState::Captured => Some(TickEvent::Idle),
            },
        }
    }

    /// Grab and crop a frame, or report why the capture is being retried
    fn acquire(&mut self, now: Millis) -> Result<(), TickEvent> {
        if !self.peer_connected {
            #[cfg(feature = "defmt")]
            defmt::info!("No peer connected, capture deferred");
            self.trigger.capture_failed(now);
            return Err(TickEvent::Deferred);
        }

        let (width, height) = (self.config.target_width, self.config.target_height);
        if let Err(_e) = self.acquirer.capture(width, height) {
            #[cfg(feature = "defmt")]
            defmt::warn!("Capture failed: {}", _e);
            self.trigger.capture_failed(now);
            return Err(TickEvent::CaptureFailed);
        }
        Ok(())
    }

    fn finish(&mut self, now: Millis, result: Result<TransferProgress, Error>) -> TickEvent {
        match result {
            Ok(progress) => {
                self.captures = self.captures.wrapping_add(1);
                #[cfg(feature = "defmt")]
                defmt::info!("Image {} sent ({} bytes)", self.captures, progress.total());
                TickEvent::Captured(progress)
            }
            Err(Error::Cancelled { sent }) => {
                self.trigger.capture_failed(now);
                TickEvent::TransferCancelled { sent }
            }
            Err(_e) => {
                #[cfg(feature = "defmt")]
                defmt::warn!("Transfer failed: {}", _e);
                self.trigger.capture_failed(now);
                TickEvent::TransferFailed
            }
        }
    }

    /// Run the classifier on the last image and publish the top class
    ///
    /// `labels[i]` names class `i`; `scores` receives one score per class.
    /// Returns the index of the winning class.
    ///
    /// # Errors
    ///
    /// - `Error::FrameUnavailable` if nothing has been captured yet
    /// - `Error::Inference` if the classifier fails or produces no score
    /// - `Error::InvalidConfig` if the winning class has no label
    /// - `Error::BufferTooSmall` if the message exceeds the characteristic
    /// - `Error::Transport` if the write fails
    pub fn classify<K>(
        &mut self,
        classifier: &mut K,
        labels: &[&str],
        scores: &mut [f32],
    ) -> Result<usize, Error>
    where
        K: Classifier,
    {
        let image = self.acquirer.image().ok_or(Error::FrameUnavailable)?;
        classifier.infer(image.as_bytes(), scores).map_err(|_e| {
            #[cfg(feature = "defmt")]
            defmt::warn!("Inference failed: {}", defmt::Debug2Format(&_e));
            Error::Inference
        })?;

        let (class, score) = top_class(scores).ok_or(Error::Inference)?;
        let label = labels.get(class).ok_or(Error::InvalidConfig)?;
        let message = format_result(label, score)?;

        #[cfg(feature = "defmt")]
        defmt::info!("{}", message.as_str());

        self.transport
            .write_value(Characteristic::Inference, message.as_bytes())
            .map_err(|_| Error::Transport)?;
        Ok(class)
    }

    fn hex_dump(&self) -> Result<HexDump, Error> {
        let width = self
            .acquirer
            .image()
            .ok_or(Error::FrameUnavailable)?
            .width();
        HexDump::new(width, self.config.transfer.pause_ms)
    }

    /// Whether a peer was connected at the last transport poll
    #[must_use]
    pub const fn is_peer_connected(&self) -> bool {
        self.peer_connected
    }

    /// Images streamed successfully since start-up
    #[must_use]
    pub const fn captures(&self) -> u32 {
        self.captures
    }

    /// Linear motion detector
    #[must_use]
    pub const fn motion(&self) -> &Detector {
        &self.motion
    }

    /// Rotation detector
    #[must_use]
    pub const fn rotation(&self) -> &Detector {
        &self.rotation
    }

    /// Capture trigger
    #[must_use]
    pub const fn trigger(&self) -> &CaptureTrigger {
        &self.trigger
    }

    /// Frame acquirer (holds the last cropped image)
    #[must_use]
    pub const fn acquirer(&self) -> &FrameAcquirer<C, RAW, PIXELS> {
        &self.acquirer
    }

    /// Active configuration
    #[must_use]
    pub const fn config(&self) -> &NodeConfig {
        &self.config
    }

    /// Borrow the transport
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Borrow the inertial sensor
    pub fn sensor_mut(&mut self) -> &mut S {
        &mut self.sensor
    }

    /// Consume the node and return its collaborators
    pub fn release(self) -> (T, S, C) {
        (self.transport, self.sensor, self.acquirer.release())
    }
}

#[cfg(not(feature = "async"))]
impl<T, S, C, const RAW: usize, const PIXELS: usize> Node<T, S, C, RAW, PIXELS>
where
    T: Transport,
    S: InertialSensor,
    C: Camera,
{
    /// Run one pass of the loop at `now`
    pub fn tick<D>(&mut self, now: Millis, delay: &mut D) -> TickEvent
    where
        D: embedded_hal::delay::DelayNs,
    {
        if let Some(event) = self.step(now) {
            return event;
        }
        if let Err(event) = self.acquire(now) {
            return event;
        }

        let result = match self.acquirer.image() {
            Some(image) => self.emitter.send(
                &mut self.transport,
                Characteristic::Image,
                image.as_bytes(),
                image.len(),
                delay,
            ),
            None => Err(Error::FrameUnavailable),
        };
        self.finish(now, result)
    }

    /// Tick forever, pausing `tick_ms` between passes
    ///
    /// `clock` returns the current monotonic time in milliseconds.
    pub fn run<F, D>(&mut self, mut clock: F, delay: &mut D) -> !
    where
        F: FnMut() -> Millis,
        D: embedded_hal::delay::DelayNs,
    {
        loop {
            let _event = self.tick(clock(), delay);
            delay.delay_ms(self.config.tick_ms);
        }
    }

    /// Write the last image as hex rows (one image row per line) to `out`
    ///
    /// The transport is serviced after every row. Returns the number of rows.
    ///
    /// # Errors
    ///
    /// - `Error::FrameUnavailable` if nothing has been captured yet
    /// - `Error::Diagnostics` if `out` fails
    pub fn dump_image<W, D>(&mut self, out: &mut W, delay: &mut D) -> Result<usize, Error>
    where
        W: Write,
        D: embedded_hal::delay::DelayNs,
    {
        let dump = self.hex_dump()?;
        let bytes = self.acquirer.image().map_or(&[][..], |image| image.as_bytes());
        dump.dump(out, &mut self.transport, bytes, delay)
    }
}

#[cfg(feature = "async")]
impl<T, S, C, const RAW: usize, const PIXELS: usize> Node<T, S, C, RAW, PIXELS>
where
    T: Transport,
    S: InertialSensor,
    C: Camera,
{
    /// Run one pass of the loop at `now`
    pub async fn tick<D>(&mut self, now: Millis, delay: &mut D) -> TickEvent
    where
        D: embedded_hal_async::delay::DelayNs,
    {
        if let Some(event) = self.step(now) {
            return event;
        }
        if let Err(event) = self.acquire(now) {
            return event;
        }

        let result = match self.acquirer.image() {
            Some(image) => {
                self.emitter
                    .send(
                        &mut self.transport,
                        Characteristic::Image,
                        image.as_bytes(),
                        image.len(),
                        delay,
                    )
                    .await
            }
            None => Err(Error::FrameUnavailable),
        };
        self.finish(now, result)
    }

    /// Tick forever, pausing `tick_ms` between passes; never returns
    ///
    /// `clock` returns the current monotonic time in milliseconds.
    pub async fn run<F, D>(&mut self, mut clock: F, delay: &mut D)
    where
        F: FnMut() -> Millis,
        D: embedded_hal_async::delay::DelayNs,
    {
        loop {
            let _event = self.tick(clock(), delay).await;
            delay.delay_ms(self.config.tick_ms).await;
        }
    }

    /// Write the last image as hex rows (one image row per line) to `out`
    ///
    /// The transport is serviced after every row. Returns the number of rows.
    ///
    /// # Errors
    ///
    /// - `Error::FrameUnavailable` if nothing has been captured yet
    /// - `Error::Diagnostics` if `out` fails
    pub async fn dump_image<W, D>(&mut self, out: &mut W, delay: &mut D) -> Result<usize, Error>
    where
        W: Write,
        D: embedded_hal_async::delay::DelayNs,
    {
        let dump = self.hex_dump()?;
        let bytes = self.acquirer.image().map_or(&[][..], |image| image.as_bytes());
        dump.dump(out, &mut self.transport, bytes, delay).await
    }
}
