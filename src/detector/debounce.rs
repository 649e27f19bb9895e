//! Decay-based debouncing with explicit edge events
//!
//! A [`Debouncer`] turns a stream of instantaneous "triggered" observations
//! into a steady boolean: the output stays active until `decay_ms` have passed
//! since the last triggered observation. Every change of the output is
//! reported once as an [`Edge`], so callers only act on transitions.

use crate::Millis;

/// Transition of a debounced signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Edge {
    /// Output went from inactive to active
    Rising,
    /// Output went from active to inactive
    Falling,
}

impl Edge {
    /// Output level after this edge
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Rising)
    }
}

/// Persistent state of one debounced signal
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DetectorState {
    /// Time of the most recent triggered observation
    pub last_active_at: Option<Millis>,
    /// Current debounced output
    pub active: bool,
}

/// Debounced boolean with hold-off decay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Debouncer {
    decay_ms: Millis,
    state: DetectorState,
}

impl Debouncer {
    /// Create an inactive debouncer holding the output for `decay_ms`
    #[must_use]
    pub const fn new(decay_ms: Millis) -> Self {
        Self {
            decay_ms,
            state: DetectorState {
                last_active_at: None,
                active: false,
            },
        }
    }

    /// Feed one observation taken at `now`
    ///
    /// Returns the edge if the debounced output changed.
    pub fn update(&mut self, triggered: bool, now: Millis) -> Option<Edge> {
        if triggered {
            self.state.last_active_at = Some(now);
        }

        let active = self
            .state
            .last_active_at
            .is_some_and(|at| now.saturating_sub(at) < self.decay_ms);

        let edge = match (self.state.active, active) {
            (false, true) => Some(Edge::Rising),
            (true, false) => Some(Edge::Falling),
            _ => None,
        };
        self.state.active = active;
        edge
    }

    /// Current debounced output
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.state.active
    }

    /// Hold-off period in milliseconds
    #[must_use]
    pub const fn decay_ms(&self) -> Millis {
        self.decay_ms
    }

    /// Snapshot of the internal state
    #[must_use]
    pub const fn state(&self) -> DetectorState {
        self.state
    }
}
