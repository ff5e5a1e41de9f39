use core::convert::TryFrom;

use embassy_time::{Duration, Instant, block_for};
use mystery_core::session::Clock;

/// Blocking [`Clock`] on the embassy time driver.
#[derive(Copy, Clone, Debug, Default)]
pub struct EmbassyClock;

impl Clock for EmbassyClock {
    type Instant = Instant;

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn elapsed_since(&self, earlier: Instant) -> core::time::Duration {
        let elapsed = Instant::now().saturating_duration_since(earlier);
        core::time::Duration::from_micros(elapsed.as_micros())
    }

    fn delay(&mut self, duration: core::time::Duration) {
        block_for(core_duration_to_embassy(duration));
    }
}

pub fn core_duration_to_embassy(duration: core::time::Duration) -> Duration {
    let micros = duration.as_micros();
    let micros = u64::try_from(micros).unwrap_or(u64::MAX);
    Duration::from_micros(micros)
}
