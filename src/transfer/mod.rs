//! Chunked, flow-controlled transfer over a small-payload transport
//!
//! A buffer is written to one characteristic as consecutive chunks of
//! `chunk_size` bytes; the last chunk carries the exact remainder. There are
//! no sequence numbers: the host appends notifications in arrival order until
//! it holds the known total (see [`reassembly`]).
//!
//! After every chunk the emitter passes a [`YieldPoint`]: it services the
//! transport, pauses so the radio can drain its queue, and checks that the
//! peer is still connected. A dropped peer ends the transfer early with
//! [`Error::Cancelled`].
//!
//! With the `async` feature the pause uses `embedded_hal_async::delay::DelayNs`;
//! otherwise `embedded_hal::delay::DelayNs`.

pub mod hexdump;
pub mod reassembly;

use core::ops::Range;

use crate::gatt::Characteristic;
use crate::interface::Transport;
use crate::Error;

/// Default chunk size (bytes)
pub const DEFAULT_CHUNK_SIZE: usize = 128;

/// Default pause after each chunk (ms)
pub const DEFAULT_PAUSE_MS: u32 = 25;

/// Transfer configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TransferConfig {
    /// Bytes per chunk
    pub chunk_size: usize,
    /// Pause after each chunk (ms)
    pub pause_ms: u32,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            pause_ms: DEFAULT_PAUSE_MS,
        }
    }
}

impl TransferConfig {
    /// Check the configuration against the characteristic it will write to
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` if the chunk size is zero or larger than
    /// the characteristic's maximum payload.
    pub const fn validate(&self, characteristic: Characteristic) -> Result<(), Error> {
        if self.chunk_size == 0 || self.chunk_size > characteristic.max_payload() {
            return Err(Error::InvalidConfig);
        }
        Ok(())
    }
}

/// Progress of one transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TransferProgress {
    sent: usize,
    total: usize,
    chunk_size: usize,
}

impl TransferProgress {
    /// Start a transfer of `total` bytes in chunks of `chunk_size`
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` if `chunk_size` is zero.
    pub const fn new(total: usize, chunk_size: usize) -> Result<Self, Error> {
        if chunk_size == 0 {
            return Err(Error::InvalidConfig);
        }
        Ok(Self {
            sent: 0,
            total,
            chunk_size,
        })
    }

    /// Byte range of the next chunk, or `None` once everything is sent
    #[must_use]
    pub fn next_chunk(&self) -> Option<Range<usize>> {
        if self.is_complete() {
            return None;
        }
        let end = self.total.min(self.sent + self.chunk_size);
        Some(self.sent..end)
    }

    /// Record `len` more bytes as sent
    pub fn advance(&mut self, len: usize) {
        self.sent = self.total.min(self.sent + len);
    }

    /// Bytes sent so far
    #[must_use]
    pub const fn sent(&self) -> usize {
        self.sent
    }

    /// Bytes in the whole transfer
    #[must_use]
    pub const fn total(&self) -> usize {
        self.total
    }

    /// Bytes per chunk
    #[must_use]
    pub const fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Bytes still to send
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.total - self.sent
    }

    /// Whether every byte has been sent
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.sent >= self.total
    }

    /// Number of chunks the whole transfer takes
    #[must_use]
    pub const fn chunk_count(&self) -> usize {
        self.total.div_ceil(self.chunk_size)
    }

    /// Length of the final chunk (0 for an empty transfer)
    #[must_use]
    pub const fn last_chunk_len(&self) -> usize {
        if self.total == 0 {
            0
        } else if self.total % self.chunk_size == 0 {
            self.chunk_size
        } else {
            self.total % self.chunk_size
        }
    }
}

/// Explicit cooperative yield point for long operations
///
/// Services the transport, pauses for `pause_ms`, then reports whether the
/// peer is still connected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct YieldPoint {
    pause_ms: u32,
}

impl YieldPoint {
    /// Yield point pausing `pause_ms` after each poll
    #[must_use]
    pub const fn new(pause_ms: u32) -> Self {
        Self { pause_ms }
    }

    /// Pause length (ms)
    #[must_use]
    pub const fn pause_ms(&self) -> u32 {
        self.pause_ms
    }

    /// Poll the transport, pause, and return whether the peer is still connected
    #[cfg(not(feature = "async"))]
    #[must_use]
    pub fn pass<T, D>(&self, transport: &mut T, delay: &mut D) -> bool
    where
        T: Transport,
        D: embedded_hal::delay::DelayNs,
    {
        transport.poll();
        if self.pause_ms > 0 {
            delay.delay_ms(self.pause_ms);
        }
        transport.is_peer_connected()
    }

    /// Poll the transport, pause, and return whether the peer is still connected
    #[cfg(feature = "async")]
    pub async fn pass<T, D>(&self, transport: &mut T, delay: &mut D) -> bool
    where
        T: Transport,
        D: embedded_hal_async::delay::DelayNs,
    {
        transport.poll();
        if self.pause_ms > 0 {
            delay.delay_ms(self.pause_ms).await;
        }
        transport.is_peer_connected()
    }
}

/// Splits buffers into chunks and writes them through a [`Transport`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChunkEmitter {
    config: TransferConfig,
}

impl Default for ChunkEmitter {
    fn default() -> Self {
        Self {
            config: TransferConfig::default(),
        }
    }
}

impl ChunkEmitter {
    /// Create an emitter
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` if the chunk size is zero.
    pub const fn new(config: TransferConfig) -> Result<Self, Error> {
        if config.chunk_size == 0 {
            return Err(Error::InvalidConfig);
        }
        Ok(Self { config })
    }

    /// Active configuration
    #[must_use]
    pub const fn config(&self) -> &TransferConfig {
        &self.config
    }

    fn prepare(
        &self,
        characteristic: Characteristic,
        buffer: &[u8],
        total: usize,
    ) -> Result<TransferProgress, Error> {
        self.config.validate(characteristic)?;
        if total > buffer.len() {
            return Err(Error::InvalidConfig);
        }
        TransferProgress::new(total, self.config.chunk_size)
    }

    fn write_chunk<T>(
        transport: &mut T,
        characteristic: Characteristic,
        buffer: &[u8],
        progress: &mut TransferProgress,
        range: Range<usize>,
    ) -> Result<(), Error>
    where
        T: Transport,
    {
        let chunk = buffer.get(range).ok_or(Error::BufferTooSmall)?;
        transport.write_value(characteristic, chunk).map_err(|_e| {
            #[cfg(feature = "defmt")]
            defmt::warn!(
                "Chunk write failed at {}/{}: {}",
                progress.sent(),
                progress.total(),
                defmt::Debug2Format(&_e)
            );
            Error::Transport
        })?;
        progress.advance(chunk.len());
        Ok(())
    }

    fn cancelled(progress: &TransferProgress) -> Error {
        #[cfg(feature = "defmt")]
        defmt::warn!(
            "Peer dropped, transfer cancelled at {}/{}",
            progress.sent(),
            progress.total()
        );
        Error::Cancelled {
            sent: progress.sent(),
        }
    }

    /// Send the first `total` bytes of `buffer` to `characteristic`
    ///
    /// # Errors
    ///
    /// - `Error::InvalidConfig` if `total > buffer.len()` or the chunk size
    ///   does not fit the characteristic
    /// - `Error::Transport` if a write fails
    /// - `Error::Cancelled` if the peer disconnects before the last chunk
    #[cfg(not(feature = "async"))]
    pub fn send<T, D>(
        &self,
        transport: &mut T,
        characteristic: Characteristic,
        buffer: &[u8],
        total: usize,
        delay: &mut D,
    ) -> Result<TransferProgress, Error>
    where
        T: Transport,
        D: embedded_hal::delay::DelayNs,
    {
        let mut progress = self.prepare(characteristic, buffer, total)?;
        let yield_point = YieldPoint::new(self.config.pause_ms);

        while let Some(range) = progress.next_chunk() {
            Self::write_chunk(transport, characteristic, buffer, &mut progress, range)?;
            if !yield_point.pass(transport, delay) && !progress.is_complete() {
                return Err(Self::cancelled(&progress));
            }
        }

        #[cfg(feature = "defmt")]
        defmt::info!(
            "Sent {} bytes in {} chunks",
            progress.sent(),
            progress.chunk_count()
        );
        Ok(progress)
    }

    /// Send the first `total` bytes of `buffer` to `characteristic`
    ///
    /// # Errors
    ///
    /// - `Error::InvalidConfig` if `total > buffer.len()` or the chunk size
    ///   does not fit the characteristic
    /// - `Error::Transport` if a write fails
    /// - `Error::Cancelled` if the peer disconnects before the last chunk
    #[cfg(feature = "async")]
    pub async fn send<T, D>(
        &self,
        transport: &mut T,
        characteristic: Characteristic,
        buffer: &[u8],
        total: usize,
        delay: &mut D,
    ) -> Result<TransferProgress, Error>
    where
        T: Transport,
        D: embedded_hal_async::delay::DelayNs,
    {
        let mut progress = self.prepare(characteristic, buffer, total)?;
        let yield_point = YieldPoint::new(self.config.pause_ms);

        while let Some(range) = progress.next_chunk() {
            Self::write_chunk(transport, characteristic, buffer, &mut progress, range)?;
            if !yield_point.pass(transport, delay).await && !progress.is_complete() {
                return Err(Self::cancelled(&progress));
            }
        }

        #[cfg(feature = "defmt")]
        defmt::info!(
            "Sent {} bytes in {} chunks",
            progress.sent(),
            progress.chunk_count()
        );
        Ok(progress)
    }
}
