//! Frame acquisition
//!
//! [`FrameAcquirer`] owns the camera, a raw frame buffer sized for the native
//! resolution and the cropped output image. Both buffers are allocated once
//! (as const generic arrays) and reused for every capture.
//!
//! # Example
//!
//! ```ignore
//! # use still_capture::{CameraConfig, FrameAcquirer, QCIF_FRAME_LEN, TARGET_PIXELS};
//! let mut acquirer: FrameAcquirer<_, QCIF_FRAME_LEN, TARGET_PIXELS> = FrameAcquirer::new(camera);
//! acquirer.begin(&CameraConfig::default())?;
//! let image = acquirer.capture(96, 96)?;
//! assert_eq!(image.len(), 96 * 96);
//! ```

pub mod crop;

pub use crop::{remap, remap_byte, CropWindow, CroppedImage};

use crate::interface::Camera;
use crate::Error;

/// Camera resolutions (OV767x naming)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Resolution {
    /// 640 x 480
    Vga,
    /// 352 x 240
    Cif,
    /// 320 x 240
    Qvga,
    /// 176 x 144
    Qcif,
    /// 160 x 120
    Qqvga,
}

impl Resolution {
    /// Nominal `(width, height)` in pixels
    #[must_use]
    pub const fn dimensions(self) -> (usize, usize) {
        match self {
            Self::Vga => (640, 480),
            Self::Cif => (352, 240),
            Self::Qvga => (320, 240),
            Self::Qcif => (176, 144),
            Self::Qqvga => (160, 120),
        }
    }
}

/// Camera pixel formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PixelFormat {
    /// 8-bit luminance
    Grayscale,
    /// 16-bit RGB 5-6-5
    Rgb565,
    /// 16-bit RGB 4-4-4
    Rgb444,
    /// 16-bit YUV 4:2:2
    Yuv422,
    /// Raw Bayer pattern
    Bayer,
}

impl PixelFormat {
    /// Bytes per pixel delivered by the sensor
    #[must_use]
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Grayscale => 1,
            Self::Rgb565 | Self::Rgb444 | Self::Yuv422 | Self::Bayer => 2,
        }
    }
}

/// Camera start-up configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CameraConfig {
    /// Native resolution
    pub resolution: Resolution,
    /// Pixel format (must be one byte per pixel)
    pub format: PixelFormat,
    /// Frame rate divisor passed to the sensor
    pub frame_rate_divisor: u8,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            resolution: Resolution::Qcif,
            format: PixelFormat::Grayscale,
            frame_rate_divisor: 1,
        }
    }
}

/// Native frame geometry reported by the camera after `begin`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FrameGeometry {
    /// Width in pixels
    pub width: usize,
    /// Height in pixels
    pub height: usize,
    /// Bytes per pixel
    pub bytes_per_pixel: usize,
}

impl FrameGeometry {
    /// Bytes in one raw frame
    #[must_use]
    pub const fn frame_len(&self) -> usize {
        self.width * self.height * self.bytes_per_pixel
    }
}

/// Camera plus pre-allocated raw (`RAW` bytes) and cropped (`PIXELS`) buffers
pub struct FrameAcquirer<C, const RAW: usize, const PIXELS: usize> {
    camera: C,
    geometry: Option<FrameGeometry>,
    raw: [u8; RAW],
    image: CroppedImage<PIXELS>,
    captured: bool,
}

impl<C, const RAW: usize, const PIXELS: usize> FrameAcquirer<C, RAW, PIXELS>
where
    C: Camera,
{
    /// Wrap a camera; call [`begin`](Self::begin) before capturing
    pub fn new(camera: C) -> Self {
        Self {
            camera,
            geometry: None,
            raw: [0; RAW],
            image: CroppedImage::new(),
            captured: false,
        }
    }

    /// Start the camera and cache its native geometry
    ///
    /// # Errors
    ///
    /// - `Error::UnsupportedPixelFormat` if the format is not one byte per pixel
    /// - `Error::CameraInit` if the camera fails to start
    /// - `Error::BufferTooSmall` if a native frame does not fit in `RAW` bytes
    pub fn begin(&mut self, config: &CameraConfig) -> Result<FrameGeometry, Error> {
        if config.format.bytes_per_pixel() != 1 {
            return Err(Error::UnsupportedPixelFormat);
        }

        self.camera
            .begin(config.resolution, config.format, config.frame_rate_divisor)
            .map_err(|_e| {
                #[cfg(feature = "defmt")]
                defmt::error!("Camera begin failed: {}", defmt::Debug2Format(&_e));
                Error::CameraInit
            })?;

        let geometry = FrameGeometry {
            width: self.camera.width(),
            height: self.camera.height(),
            bytes_per_pixel: self.camera.bytes_per_pixel(),
        };
        if geometry.bytes_per_pixel != 1 {
            return Err(Error::UnsupportedPixelFormat);
        }
        if geometry.frame_len() > RAW {
            return Err(Error::BufferTooSmall);
        }

        #[cfg(feature = "defmt")]
        defmt::info!(
            "Camera: {}x{} @ {} B/px",
            geometry.width,
            geometry.height,
            geometry.bytes_per_pixel
        );

        self.geometry = Some(geometry);
        Ok(geometry)
    }

    /// Capture one frame and crop its center to `width x height`
    ///
    /// On failure the previously captured image is left intact.
    ///
    /// # Errors
    ///
    /// - `Error::CameraInit` if called before a successful `begin`
    /// - `Error::InvalidConfig` if the target is empty or exceeds the native size
    /// - `Error::BufferTooSmall` if the target exceeds `PIXELS`
    /// - `Error::FrameUnavailable` if the camera reports no frame
    pub fn capture(&mut self, width: usize, height: usize) -> Result<&CroppedImage<PIXELS>, Error> {
        let geometry = self.geometry.ok_or(Error::CameraInit)?;
        let window = CropWindow::centered(geometry.width, geometry.height, width, height)?;
        if window.len() > PIXELS {
            return Err(Error::BufferTooSmall);
        }

        let frame = &mut self.raw[..geometry.frame_len()];
        self.camera.read_frame(frame).map_err(|_e| {
            #[cfg(feature = "defmt")]
            defmt::warn!("Frame read failed: {}", defmt::Debug2Format(&_e));
            Error::FrameUnavailable
        })?;

        self.image.fill(&window, frame, geometry.width)?;
        self.captured = true;
        Ok(&self.image)
    }

    /// Most recent successful capture
    #[must_use]
    pub fn image(&self) -> Option<&CroppedImage<PIXELS>> {
        self.captured.then_some(&self.image)
    }

    /// Native geometry, once started
    #[must_use]
    pub const fn geometry(&self) -> Option<FrameGeometry> {
        self.geometry
    }

    /// Borrow the camera
    pub fn camera_mut(&mut self) -> &mut C {
        &mut self.camera
    }

    /// Consume the acquirer and return the camera
    pub fn release(self) -> C {
        self.camera
    }
}
