//! Stillness-gated capture trigger
//!
//! The trigger consumes "is any detector active" once per tick and decides
//! when the device has been still long enough to spend power on an image:
//!
//! ```text
//!            any active (from any state): rest clock restarts
//!        +--------------------------------------------+
//!        v                                            |
//!      Idle --still--> Waiting --rest elapsed--> Captured
//!                        ^                            |
//!                        +------ capture failed ------+
//! ```
//!
//! `Captured` is sticky: one image per period of stillness.

use crate::Millis;

/// Default time the device must stay still before a capture (ms)
pub const DEFAULT_REST_THRESHOLD_MS: Millis = 3000;

/// Trigger state
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TriggerState {
    /// Activity seen on the last tick; rest clock restarted
    #[default]
    Idle,
    /// Still, waiting for the rest threshold
    Waiting,
    /// Image captured for the current period of stillness
    Captured,
}

/// What the caller must do after a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TriggerAction {
    /// Nothing to do
    None,
    /// Activity interrupted a wait or ended a captured period
    Reset,
    /// Stillness just began; the rest clock is running
    EnsureStillness,
    /// Perform exactly one capture-and-transfer cycle
    Capture,
}

/// Trigger configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TriggerConfig {
    /// Continuous stillness required before capturing (ms)
    pub rest_threshold_ms: Millis,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            rest_threshold_ms: DEFAULT_REST_THRESHOLD_MS,
        }
    }
}

/// Capture trigger state machine
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CaptureTrigger {
    config: TriggerConfig,
    state: TriggerState,
    rest_started_at: Option<Millis>,
}

impl CaptureTrigger {
    /// Create an idle trigger
    #[must_use]
    pub const fn new(config: TriggerConfig) -> Self {
        Self {
            config,
            state: TriggerState::Idle,
            rest_started_at: None,
        }
    }

    /// Advance the state machine by one tick
    pub fn evaluate(&mut self, any_active: bool, now: Millis) -> TriggerAction {
        if any_active {
            self.rest_started_at = Some(now);
        } else if self.state == TriggerState::Idle && self.rest_started_at.is_none() {
            // Still since boot
            self.rest_started_at = Some(now);
        }

        let (next, action) = transition(self.state, any_active, self.rest_reached(now));

        #[cfg(feature = "defmt")]
        {
            match action {
                TriggerAction::EnsureStillness => defmt::info!("Ensuring stillness..."),
                TriggerAction::Capture => {
                    defmt::info!("Still for {} ms, capturing", self.rest_elapsed(now));
                }
                TriggerAction::Reset => defmt::debug!("Activity, rest clock restarted"),
                TriggerAction::None => {}
            }
        }

        self.state = next;
        action
    }

    /// Report that the capture (or its transfer) failed at `now`
    ///
    /// The rest clock restarts and the trigger returns to `Waiting`, so the
    /// capture is retried once the rest threshold elapses again.
    pub fn capture_failed(&mut self, now: Millis) {
        self.rest_started_at = Some(now);
        if self.state == TriggerState::Captured {
            self.state = TriggerState::Waiting;
        }
    }

    /// Current state
    #[must_use]
    pub const fn state(&self) -> TriggerState {
        self.state
    }

    /// Start of the current rest period, if any
    #[must_use]
    pub const fn rest_started_at(&self) -> Option<Millis> {
        self.rest_started_at
    }

    /// Time spent at rest as of `now`
    #[must_use]
    pub fn rest_elapsed(&self, now: Millis) -> Millis {
        self.rest_started_at
            .map_or(0, |start| now.saturating_sub(start))
    }

    /// Active configuration
    #[must_use]
    pub const fn config(&self) -> &TriggerConfig {
        &self.config
    }

    fn rest_reached(&self, now: Millis) -> bool {
        self.rest_started_at.is_some() && self.rest_elapsed(now) >= self.config.rest_threshold_ms
    }
}

fn transition(
    state: TriggerState,
    any_active: bool,
    rest_reached: bool,
) -> (TriggerState, TriggerAction) {
    if any_active {
        let action = match state {
            TriggerState::Idle => TriggerAction::None,
            TriggerState::Waiting | TriggerState::Captured => TriggerAction::Reset,
        };
        return (TriggerState::Idle, action);
    }

    match state {
        TriggerState::Idle => (TriggerState::Waiting, TriggerAction::EnsureStillness),
        TriggerState::Waiting if rest_reached => (TriggerState::Captured, TriggerAction::Capture),
        TriggerState::Waiting => (TriggerState::Waiting, TriggerAction::None),
        TriggerState::Captured => (TriggerState::Captured, TriggerAction::None),
    }
}
