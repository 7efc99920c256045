//! Stream utilities for pose subscriptions.

mod throttle;
mod update_rate;

pub use throttle::{Throttle, ThrottleExt};
pub use update_rate::UpdateRate;
