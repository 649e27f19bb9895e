//! GATT layout exposed to the paired host
//!
//! Each characteristic lives in its own primary service. UUIDs share the
//! `12345678-1234-5678-1234-56789abcdeXX` base; the host subscribes to the
//! odd-numbered characteristic UUIDs.

/// Name advertised by the node
pub const LOCAL_NAME: &str = "Nano33BLE-Sensing";

/// Characteristics published by the node (read + notify)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Characteristic {
    /// Linear motion state label (`MOVING` / `STILL`)
    MotionStatus,
    /// Rotation state label (`ROTATING` / `STILL`)
    RotationStatus,
    /// Captured image, delivered as consecutive chunks
    Image,
    /// Latest inference result (`<label>: <score>`)
    Inference,
}

impl Characteristic {
    /// Every characteristic, in registration order
    pub const ALL: [Self; 4] = [
        Self::MotionStatus,
        Self::RotationStatus,
        Self::Image,
        Self::Inference,
    ];

    /// Characteristic UUID
    #[must_use]
    pub const fn uuid(self) -> &'static str {
        match self {
            Self::MotionStatus => "12345678-1234-5678-1234-56789abcdef1",
            Self::RotationStatus => "12345678-1234-5678-1234-56789abcdef3",
            Self::Image => "12345678-1234-5678-1234-56789abcdef5",
            Self::Inference => "12345678-1234-5678-1234-56789abcdef7",
        }
    }

    /// UUID of the service that owns this characteristic
    #[must_use]
    pub const fn service_uuid(self) -> &'static str {
        match self {
            Self::MotionStatus => "12345678-1234-5678-1234-56789abcdef0",
            Self::RotationStatus => "12345678-1234-5678-1234-56789abcdef2",
            Self::Image => "12345678-1234-5678-1234-56789abcdef4",
            Self::Inference => "12345678-1234-5678-1234-56789abcdefa",
        }
    }

    /// Maximum value length in bytes for a single write
    #[must_use]
    pub const fn max_payload(self) -> usize {
        match self {
            Self::MotionStatus | Self::RotationStatus => 16,
            Self::Image => 128,
            Self::Inference => 20,
        }
    }
}
