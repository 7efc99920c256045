//! Update rate control for pose streams

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Delivery rate requested by a pose subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum UpdateRate {
    /// Every update the headset sends (display rate).
    #[default]
    Native,

    /// At most this many updates per second, newest first.
    /// `Max(0)`, and rates too high to yield a non-zero period, are treated
    /// as [`UpdateRate::Native`].
    Max(u32),
}

impl UpdateRate {
    /// Throttle period, or `None` when no throttling applies.
    pub fn interval(self) -> Option<Duration> {
        match self {
            UpdateRate::Native | UpdateRate::Max(0) => None,
            UpdateRate::Max(hz) => {
                Some(Duration::from_secs_f64(1.0 / hz as f64)).filter(|period| !period.is_zero())
            }
        }
    }
}
