//! Helpers for the survey loop that drives the perception pipeline.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::classify::{AreaRecord, ItemInfo};
use crate::error::Result;

/// Bounded polling: at most `max_attempts` calls, `delay_ms` apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        // about ten seconds of polling
        Self {
            max_attempts: 100,
            delay_ms: 100,
        }
    }
}

impl RetryPolicy {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

pub trait Sleeper {
    fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Calls `attempt` until it yields `Some`, an error, or the budget runs out.
///
/// The attempt index starts at 0. Sleeps only between attempts.
pub fn retry<T, S, F>(policy: &RetryPolicy, sleeper: &S, mut attempt: F) -> Result<Option<T>>
where
    S: Sleeper + ?Sized,
    F: FnMut(u32) -> Result<Option<T>>,
{
    for i in 0..policy.max_attempts {
        if i > 0 {
            sleeper.sleep(policy.delay());
        }
        if let Some(v) = attempt(i)? {
            log::debug!("attempt {} succeeded", i);
            return Ok(Some(v));
        }
    }
    log::warn!("gave up after {} attempts", policy.max_attempts);
    Ok(None)
}

/// Index of the first area holding `target`, or `fallback` if none does.
pub fn select_target_area(areas: &[AreaRecord], target: &ItemInfo, fallback: usize) -> usize {
    match areas.iter().position(|a| a.holds_treasure(target)) {
        Some(i) => i,
        None => {
            log::info!(
                "no area holds {}, falling back to area {}",
                target.name(),
                fallback
            );
            fallback
        }
    }
}
