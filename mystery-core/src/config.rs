//! Provisioned configuration for a single box.
//!
//! Everything here is fixed at build time. Firmware builds a [`BoxConfig`] in
//! its provisioning module; the emulator starts from [`DEFAULT_CONFIG`] and
//! applies command-line overrides.

use core::time::Duration;

use crate::fix::{day_hour_key, day_key};

/// Geographic target the holder has to reach.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GeoTarget {
    /// Decimal degrees, positive north.
    pub latitude: f64,
    /// Decimal degrees, positive east.
    pub longitude: f64,
    /// Unlock radius in meters.
    pub radius_m: f64,
}

impl GeoTarget {
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64, radius_m: f64) -> Self {
        Self {
            latitude,
            longitude,
            radius_m,
        }
    }
}

/// Earliest date and hour at which distance readings are given.
///
/// The hour is compared with the hour reported by the receiver, so a schedule
/// meant in box-local time has to be converted when provisioning.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct UnlockSchedule {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
}

impl UnlockSchedule {
    #[must_use]
    pub const fn new(year: u16, month: u8, day: u8, hour: u8) -> Self {
        Self {
            year,
            month,
            day,
            hour,
        }
    }

    /// Day comparison key, built the same way as [`crate::fix::PositionFix::day_key`].
    #[must_use]
    pub const fn day_key(&self) -> u32 {
        day_key(self.year, self.month, self.day)
    }

    /// Day-hour comparison key.
    #[must_use]
    pub const fn day_hour_key(&self) -> u64 {
        day_hour_key(self.year, self.month, self.day, self.hour)
    }
}

/// How the session reacts to an out-of-range reading.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RetryPolicy {
    /// One distance reading per power-on; the session ends after it.
    #[default]
    SingleCheck,
    /// Keep evaluating after an out-of-range reading until another terminal
    /// outcome or the session timeout. Every reading costs an attempt.
    UntilTimeout,
}

/// Default number of out-of-range readings before the box refuses to
/// compute distance.
pub const DEFAULT_MAX_ATTEMPTS: u16 = 10;
/// Upper bound for a single power-on session.
pub const MAX_TIME_POWER_ON: Duration = Duration::from_secs(120);
/// Time spent draining the positioning stream per loop iteration.
pub const FIX_DRAIN_WINDOW: Duration = Duration::from_millis(1_000);
/// First value shown by the opening countdown.
pub const COUNTDOWN_FROM: u8 = 3;
/// Time each countdown value stays on screen.
pub const COUNTDOWN_STEP: Duration = Duration::from_secs(1);

/// Complete provisioning for one box.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BoxConfig {
    pub target: GeoTarget,
    pub schedule: UnlockSchedule,
    pub max_attempts: u16,
    pub session_timeout: Duration,
    pub fix_drain_window: Duration,
    pub countdown_from: u8,
    pub countdown_step: Duration,
    pub retry_policy: RetryPolicy,
}

impl BoxConfig {
    /// Configuration with the default timings and attempt budget.
    #[must_use]
    pub const fn new(target: GeoTarget, schedule: UnlockSchedule) -> Self {
        Self {
            target,
            schedule,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            session_timeout: MAX_TIME_POWER_ON,
            fix_drain_window: FIX_DRAIN_WINDOW,
            countdown_from: COUNTDOWN_FROM,
            countdown_step: COUNTDOWN_STEP,
            retry_policy: RetryPolicy::SingleCheck,
        }
    }

    #[must_use]
    pub const fn with_max_attempts(mut self, max_attempts: u16) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    #[must_use]
    pub const fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    #[must_use]
    pub const fn with_session_timeout(mut self, session_timeout: Duration) -> Self {
        self.session_timeout = session_timeout;
        self
    }
}

/// Configuration used when nothing else is provisioned.
pub const DEFAULT_CONFIG: BoxConfig = BoxConfig::new(
    GeoTarget::new(52.090_737, 5.121_420, 20.0),
    UnlockSchedule::new(2022, 6, 4, 23),
);
