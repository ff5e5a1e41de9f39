#![cfg_attr(not(target_os = "none"), allow(dead_code))]

//! Per-box provisioning. Edit and reflash for each new hunt.

use mystery_core::config::{BoxConfig, GeoTarget, RetryPolicy, UnlockSchedule};

/// Where the box opens: Domplein, Utrecht.
pub const TARGET: GeoTarget = GeoTarget::new(52.090_737, 5.121_420, 20.0);

/// Earliest receiver (UTC) date and hour at which the box may open.
pub const SCHEDULE: UnlockSchedule = UnlockSchedule::new(2022, 6, 4, 23);

pub const MAX_ATTEMPTS: u16 = 10;

pub const BOX_CONFIG: BoxConfig = BoxConfig::new(TARGET, SCHEDULE)
    .with_max_attempts(MAX_ATTEMPTS)
    .with_retry_policy(RetryPolicy::SingleCheck);

#[cfg(test)]
mod tests {
    use super::*;
    use mystery_core::config::DEFAULT_CONFIG;

    #[test]
    fn provisioned_box_matches_reference_hunt() {
        assert_eq!(BOX_CONFIG, DEFAULT_CONFIG);
    }
}
