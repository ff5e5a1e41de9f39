//! Positioning fix model consumed by the unlock state machine.
//!
//! A fix carries independent validity flags for location, date and time, the
//! same way the receiver reports them. The decimal-weighted comparison keys
//! used by the schedule gates are derived here so both sides of a comparison
//! are built by the same code.

/// Receivers that have not synced yet tend to report an epoch date in or
/// before this year, so such dates are treated as "no fix".
pub const PLAUSIBLE_YEAR_AFTER: u16 = 2020;

/// Latest reading from the positioning module.
#[derive(Copy, Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PositionFix {
    pub location_valid: bool,
    pub lat: f64,
    pub lon: f64,
    pub date_valid: bool,
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub time_valid: bool,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl PositionFix {
    /// Fix with nothing valid, as reported right after power-on.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            location_valid: false,
            lat: 0.0,
            lon: 0.0,
            date_valid: false,
            year: 0,
            month: 0,
            day: 0,
            time_valid: false,
            hour: 0,
            minute: 0,
            second: 0,
        }
    }

    /// Returns `true` once both date and time are valid and the year is past
    /// the cold-start epoch.
    #[must_use]
    pub const fn has_plausible_clock(&self) -> bool {
        self.date_valid && self.time_valid && self.year > PLAUSIBLE_YEAR_AFTER
    }

    /// Returns `true` when the location can be used for a distance reading.
    ///
    /// A latitude of exactly zero is what the receiver reports before the
    /// first position solution, so it is rejected even with the valid flag set.
    #[allow(clippy::float_cmp)]
    #[must_use]
    pub fn has_location(&self) -> bool {
        self.location_valid && self.lat != 0.0
    }

    /// Day comparison key for this fix.
    #[must_use]
    pub const fn day_key(&self) -> u32 {
        day_key(self.year, self.month, self.day)
    }

    /// Day-hour comparison key for this fix.
    #[must_use]
    pub const fn day_hour_key(&self) -> u64 {
        day_hour_key(self.year, self.month, self.day, self.hour)
    }
}

/// `day + 100 * month + 10000 * year`.
///
/// Plain decimal weighting, not calendar arithmetic: ordering only holds for
/// fields below 100.
#[must_use]
pub const fn day_key(year: u16, month: u8, day: u8) -> u32 {
    day as u32 + 100 * month as u32 + 10_000 * year as u32
}

/// `hour + 100 * day + 10000 * month + 1000000 * year`.
#[must_use]
pub const fn day_hour_key(year: u16, month: u8, day: u8, hour: u8) -> u64 {
    hour as u64 + 100 * day as u64 + 10_000 * month as u64 + 1_000_000 * year as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn day_key_orders_dates_within_a_year() {
        assert!(day_key(2022, 6, 3) < day_key(2022, 6, 4));
        assert!(day_key(2022, 5, 31) < day_key(2022, 6, 1));
        assert!(day_key(2021, 12, 31) < day_key(2022, 1, 1));
        assert_eq!(day_key(2022, 6, 4), 20_220_604);
    }

    #[test]
    fn day_hour_key_places_hour_in_lowest_digits() {
        assert_eq!(day_hour_key(2022, 6, 4, 23), 2_022_060_423);
        assert!(day_hour_key(2022, 6, 4, 22) < day_hour_key(2022, 6, 4, 23));
        assert!(day_hour_key(2022, 6, 3, 23) < day_hour_key(2022, 6, 4, 0));
    }

    #[test]
    fn epoch_dates_are_not_plausible() {
        let mut fix = PositionFix {
            date_valid: true,
            time_valid: true,
            year: 2020,
            ..PositionFix::empty()
        };
        assert!(!fix.has_plausible_clock());
        fix.year = 2021;
        assert!(fix.has_plausible_clock());
        fix.time_valid = false;
        assert!(!fix.has_plausible_clock());
    }

    #[test]
    fn zero_latitude_is_not_a_location() {
        let fix = PositionFix {
            location_valid: true,
            lat: 0.0,
            lon: 5.1,
            ..PositionFix::empty()
        };
        assert!(!fix.has_location());
    }
}
