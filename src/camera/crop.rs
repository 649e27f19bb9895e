//! Center crop and pixel remap
//!
//! The model consumes a signed 8-bit image, so every unsigned camera pixel is
//! shifted down by 128 while it is copied out of the raw frame.

use crate::Error;

/// Map an unsigned pixel onto the signed range: `0 -> -128`, `128 -> 0`, `255 -> 127`
#[must_use]
#[allow(clippy::cast_possible_wrap)]
pub const fn remap(pixel: u8) -> i8 {
    pixel.wrapping_sub(128) as i8
}

/// Two's-complement byte of [`remap`]`(pixel)`
#[must_use]
pub const fn remap_byte(pixel: u8) -> u8 {
    pixel.wrapping_sub(128)
}

/// Sub-rectangle of a native frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CropWindow {
    /// First source column
    pub start_x: usize,
    /// First source row
    pub start_y: usize,
    /// Output width
    pub width: usize,
    /// Output height
    pub height: usize,
}

impl CropWindow {
    /// Window of `width x height` centered in a `native_width x native_height` frame
    ///
    /// Odd margins are truncated toward the top-left corner.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` if the target is empty or larger than the
    /// native frame in either dimension.
    pub fn centered(
        native_width: usize,
        native_height: usize,
        width: usize,
        height: usize,
    ) -> Result<Self, Error> {
        if width == 0 || height == 0 || width > native_width || height > native_height {
            return Err(Error::InvalidConfig);
        }
        Ok(Self {
            start_x: (native_width - width) / 2,
            start_y: (native_height - height) / 2,
            width,
            height,
        })
    }

    /// Number of output pixels
    #[must_use]
    pub const fn len(&self) -> usize {
        self.width * self.height
    }

    /// Whether the window covers no pixels
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Row-major index into the native frame for output pixel `(x, y)`
    #[must_use]
    pub const fn source_index(&self, x: usize, y: usize, native_width: usize) -> usize {
        (self.start_y + y) * native_width + self.start_x + x
    }

    /// Copy the window out of `raw`, remapping each pixel into `out`
    ///
    /// `raw` is a row-major one-byte-per-pixel frame `native_width` wide.
    ///
    /// # Errors
    ///
    /// Returns `Error::BufferTooSmall` if `raw` does not cover the window or
    /// `out` is shorter than the window.
    pub fn crop_into(&self, raw: &[u8], native_width: usize, out: &mut [u8]) -> Result<(), Error> {
        if self.is_empty() {
            return Ok(());
        }
        if out.len() < self.len() {
            return Err(Error::BufferTooSmall);
        }

        for (y, out_row) in out.chunks_exact_mut(self.width).take(self.height).enumerate() {
            let start = self.source_index(0, y, native_width);
            let src_row = raw
                .get(start..start + self.width)
                .ok_or(Error::BufferTooSmall)?;
            for (dst, &pixel) in out_row.iter_mut().zip(src_row) {
                *dst = remap_byte(pixel);
            }
        }
        Ok(())
    }
}

/// Cropped, remapped image ready for inference or transfer
///
/// Pixels are stored as their two's-complement bytes so the buffer can be
/// handed to the transport without a copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CroppedImage<const N: usize> {
    width: usize,
    height: usize,
    data: [u8; N],
}

impl<const N: usize> Default for CroppedImage<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> CroppedImage<N> {
    /// Empty image with capacity for `N` pixels
    #[must_use]
    pub const fn new() -> Self {
        Self {
            width: 0,
            height: 0,
            data: [0; N],
        }
    }

    /// Width in pixels
    #[must_use]
    pub const fn width(&self) -> usize {
        self.width
    }

    /// Height in pixels
    #[must_use]
    pub const fn height(&self) -> usize {
        self.height
    }

    /// Number of pixels
    #[must_use]
    pub const fn len(&self) -> usize {
        self.width * self.height
    }

    /// Whether no image has been stored
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Pixel buffer as int8 tensor bytes, row-major
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data[..self.len()]
    }

    /// Signed pixel at `(x, y)`
    #[must_use]
    #[allow(clippy::cast_possible_wrap)]
    pub fn pixel(&self, x: usize, y: usize) -> Option<i8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.data.get(y * self.width + x).map(|&b| b as i8)
    }

    /// Signed pixels in row-major order
    #[allow(clippy::cast_possible_wrap)]
    pub fn signed_pixels(&self) -> impl Iterator<Item = i8> + '_ {
        self.as_bytes().iter().map(|&b| b as i8)
    }

    /// Crop `raw` through `window` into this image
    pub(crate) fn fill(
        &mut self,
        window: &CropWindow,
        raw: &[u8],
        native_width: usize,
    ) -> Result<(), Error> {
        if window.len() > N {
            return Err(Error::BufferTooSmall);
        }
        window.crop_into(raw, native_width, &mut self.data[..window.len()])?;
        self.width = window.width;
        self.height = window.height;
        Ok(())
    }
}
