//! Human-readable hex dump of a captured image
//!
//! Bytes are written as uppercase two-digit hex separated by commas, one
//! image row per line:
//!
//! ```text
//! 80,81,7F,...
//! 90,8A,85,...
//! ```
//!
//! Writing a full image to a slow serial port takes long enough to starve the
//! radio, so the dump passes a [`YieldPoint`] after every row. The peer
//! connection state does not affect the dump.

use core::fmt::Write;

use super::YieldPoint;
use crate::interface::Transport;
use crate::Error;

/// Row-by-row hex writer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HexDump {
    row_len: usize,
    yield_point: YieldPoint,
}

impl HexDump {
    /// Dump `row_len` bytes per line, pausing `pause_ms` after each line
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` if `row_len` is zero.
    pub const fn new(row_len: usize, pause_ms: u32) -> Result<Self, Error> {
        if row_len == 0 {
            return Err(Error::InvalidConfig);
        }
        Ok(Self {
            row_len,
            yield_point: YieldPoint::new(pause_ms),
        })
    }

    /// Bytes per line
    #[must_use]
    pub const fn row_len(&self) -> usize {
        self.row_len
    }

    /// Write one row (`XX,XX,...,XX`) followed by a newline
    ///
    /// # Errors
    ///
    /// Returns the sink's formatting error.
    pub fn write_row<W: Write>(out: &mut W, row: &[u8]) -> core::fmt::Result {
        for (i, byte) in row.iter().enumerate() {
            if i > 0 {
                out.write_char(',')?;
            }
            write!(out, "{byte:02X}")?;
        }
        out.write_char('\n')
    }

    /// Dump `bytes` to `out`, yielding to the transport after every row
    ///
    /// Returns the number of rows written.
    ///
    /// # Errors
    ///
    /// Returns `Error::Diagnostics` if the sink fails.
    #[cfg(not(feature = "async"))]
    pub fn dump<W, T, D>(
        &self,
        out: &mut W,
        transport: &mut T,
        bytes: &[u8],
        delay: &mut D,
    ) -> Result<usize, Error>
    where
        W: Write,
        T: Transport,
        D: embedded_hal::delay::DelayNs,
    {
        let mut rows = 0;
        for row in bytes.chunks(self.row_len) {
            Self::write_row(out, row).map_err(|_| Error::Diagnostics)?;
            let _ = self.yield_point.pass(transport, delay);
            rows += 1;
        }
        Ok(rows)
    }

    /// Dump `bytes` to `out`, yielding to the transport after every row
    ///
    /// Returns the number of rows written.
    ///
    /// # Errors
    ///
    /// Returns `Error::Diagnostics` if the sink fails.
    #[cfg(feature = "async")]
    pub async fn dump<W, T, D>(
        &self,
        out: &mut W,
        transport: &mut T,
        bytes: &[u8],
        delay: &mut D,
    ) -> Result<usize, Error>
    where
        W: Write,
        T: Transport,
        D: embedded_hal_async::delay::DelayNs,
    {
        let mut rows = 0;
        for row in bytes.chunks(self.row_len) {
            Self::write_row(out, row).map_err(|_| Error::Diagnostics)?;
            let _ = self.yield_point.pass(transport, delay).await;
            rows += 1;
        }
        Ok(rows)
    }
}
