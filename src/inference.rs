//! Classifier result formatting
//!
//! The node publishes the winning class as `"<label>: <score>"` with two
//! decimals, e.g. `"Person: 0.87"`, on the inference characteristic.

use core::fmt::Write;

use heapless::String;

use crate::Error;

/// Longest result message the inference characteristic accepts
pub const MESSAGE_CAPACITY: usize = 20;

/// Result message buffer
pub type Message = String<MESSAGE_CAPACITY>;

/// Index and score of the highest-scoring class
///
/// Ties resolve to the lowest index. `NaN` scores never win.
#[must_use]
pub fn top_class(scores: &[f32]) -> Option<(usize, f32)> {
    scores
        .iter()
        .copied()
        .enumerate()
        .filter(|(_, score)| !score.is_nan())
        .fold(None, |best, (i, score)| match best {
            Some((_, best_score)) if best_score >= score => best,
            _ => Some((i, score)),
        })
}

/// Format `"<label>: <score:.2>"`
///
/// # Errors
///
/// Returns `Error::BufferTooSmall` if the message exceeds [`MESSAGE_CAPACITY`].
pub fn format_result(label: &str, score: f32) -> Result<Message, Error> {
    let mut message = Message::new();
    write!(message, "{label}: {score:.2}").map_err(|_| Error::BufferTooSmall)?;
    Ok(message)
}
