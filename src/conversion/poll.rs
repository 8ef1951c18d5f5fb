//! Bounded polling against an external predicate
//!
//! The conversion page only reports progress through text in the DOM, so completion is detected by
//! repeatedly probing it. The probe decides what a signal means; this module only owns the timing.

use crate::error::Result;
use std::time::{Duration, Instant};

/// What a single probe observed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal<T> {
    Pending,
    Success(T),
    Error(T),
}

/// How a poll ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome<T> {
    Success(T),
    Error(T),
    TimedOut,
}

/// Call `probe` every `interval` until it reports a terminal signal or `timeout` elapses
///
/// The probe always runs at least once. A probe error ends the poll immediately.
pub fn poll_until<T, F>(mut probe: F, interval: Duration, timeout: Duration) -> Result<PollOutcome<T>>
where
    F: FnMut() -> Result<Signal<T>>,
{
    let deadline = Instant::now() + timeout;

    loop {
        match probe()? {
            Signal::Success(value) => return Ok(PollOutcome::Success(value)),
            Signal::Error(value) => return Ok(PollOutcome::Error(value)),
            Signal::Pending => {}
        }

        let now = Instant::now();
        if now >= deadline {
            return Ok(PollOutcome::TimedOut);
        }

        std::thread::sleep(interval.min(deadline - now));
    }
}
