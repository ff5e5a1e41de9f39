//! Persisted attempt budget.
//!
//! The budget is the only state that survives a power cycle. It is stored as a
//! single integer under [`ATTEMPTS_KEY`] through whatever [`KeyValueStore`] the
//! target provides (flash page on the firmware, a text file in the emulator).

use core::fmt;

/// Key the remaining attempt count is stored under.
pub const ATTEMPTS_KEY: &str = "attempts";

/// Minimal persistent integer store.
pub trait KeyValueStore {
    /// Backend-specific failure.
    type Error;

    /// Returns the stored value for `key`, or `default` when it was never written.
    fn get_int(&mut self, key: &str, default: i32) -> Result<i32, Self::Error>;

    /// Writes `value` under `key`. The write must be durable when this returns.
    fn put_int(&mut self, key: &str, value: i32) -> Result<(), Self::Error>;
}

/// Failure reported by [`AttemptBudget`] operations.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum BudgetError<E> {
    /// Reading the stored count failed.
    Read(E),
    /// Persisting the new count failed.
    Write(E),
}

impl<E: fmt::Debug> fmt::Display for BudgetError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BudgetError::Read(err) => write!(f, "attempt budget read failed: {err:?}"),
            BudgetError::Write(err) => write!(f, "attempt budget write failed: {err:?}"),
        }
    }
}

/// Bounded attempt counter backed by a [`KeyValueStore`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct AttemptBudget {
    max_attempts: u16,
}

impl AttemptBudget {
    #[must_use]
    pub const fn new(max_attempts: u16) -> Self {
        Self { max_attempts }
    }

    /// Value the budget is reset to.
    #[must_use]
    pub const fn max_attempts(&self) -> u16 {
        self.max_attempts
    }

    /// Reads the remaining attempts, clamped to `0..=max_attempts`.
    pub fn get<S: KeyValueStore>(&self, store: &mut S) -> Result<u16, BudgetError<S::Error>> {
        let raw = store
            .get_int(ATTEMPTS_KEY, i32::from(self.max_attempts))
            .map_err(BudgetError::Read)?;
        Ok(self.clamp(raw))
    }

    /// Persists `value`, clamped to `0..=max_attempts`.
    pub fn set<S: KeyValueStore>(
        &self,
        store: &mut S,
        value: u16,
    ) -> Result<u16, BudgetError<S::Error>> {
        let value = value.min(self.max_attempts);
        store
            .put_int(ATTEMPTS_KEY, i32::from(value))
            .map_err(BudgetError::Write)?;
        Ok(value)
    }

    /// Restores the full budget.
    pub fn reset<S: KeyValueStore>(&self, store: &mut S) -> Result<u16, BudgetError<S::Error>> {
        self.set(store, self.max_attempts)
    }

    /// Restores the full budget when the reset button is held.
    ///
    /// Returns `Some(max_attempts)` when a reset happened.
    pub fn reset_if_requested<S: KeyValueStore>(
        &self,
        store: &mut S,
        button_pressed: bool,
    ) -> Result<Option<u16>, BudgetError<S::Error>> {
        if button_pressed {
            self.reset(store).map(Some)
        } else {
            Ok(None)
        }
    }

    /// Spends one attempt and returns the remaining count.
    ///
    /// An exhausted budget is left untouched and nothing is written.
    pub fn consume<S: KeyValueStore>(&self, store: &mut S) -> Result<u16, BudgetError<S::Error>> {
        let left = self.get(store)?;
        if left == 0 {
            return Ok(0);
        }
        self.set(store, left - 1)
    }

    fn clamp(&self, raw: i32) -> u16 {
        let clamped = raw.clamp(0, i32::from(self.max_attempts));
        u16::try_from(clamped).unwrap_or(self.max_attempts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct CellStore {
        value: Option<i32>,
        writes: usize,
        fail_writes: bool,
    }

    impl KeyValueStore for CellStore {
        type Error = ();

        fn get_int(&mut self, key: &str, default: i32) -> Result<i32, ()> {
            assert_eq!(key, ATTEMPTS_KEY);
            Ok(self.value.unwrap_or(default))
        }

        fn put_int(&mut self, key: &str, value: i32) -> Result<(), ()> {
            assert_eq!(key, ATTEMPTS_KEY);
            if self.fail_writes {
                return Err(());
            }
            self.writes += 1;
            self.value = Some(value);
            Ok(())
        }
    }

    #[test]
    fn unwritten_store_reports_full_budget() {
        let budget = AttemptBudget::new(10);
        let mut store = CellStore::default();
        assert_eq!(budget.get(&mut store), Ok(10));
        assert_eq!(store.writes, 0);
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let budget = AttemptBudget::new(10);
        let mut store = CellStore {
            value: Some(-4),
            ..CellStore::default()
        };
        assert_eq!(budget.get(&mut store), Ok(0));
        store.value = Some(250);
        assert_eq!(budget.get(&mut store), Ok(10));
    }

    #[test]
    fn consume_stops_at_zero() {
        let budget = AttemptBudget::new(2);
        let mut store = CellStore::default();
        assert_eq!(budget.consume(&mut store), Ok(1));
        assert_eq!(budget.consume(&mut store), Ok(0));
        assert_eq!(budget.consume(&mut store), Ok(0));
        assert_eq!(store.writes, 2);
        assert_eq!(store.value, Some(0));
    }

    #[test]
    fn reset_only_when_button_held() {
        let budget = AttemptBudget::new(10);
        let mut store = CellStore {
            value: Some(1),
            ..CellStore::default()
        };
        assert_eq!(budget.reset_if_requested(&mut store, false), Ok(None));
        assert_eq!(store.value, Some(1));
        assert_eq!(budget.reset_if_requested(&mut store, true), Ok(Some(10)));
        assert_eq!(store.value, Some(10));
    }

    #[test]
    fn write_failures_surface_as_write_errors() {
        let budget = AttemptBudget::new(10);
        let mut store = CellStore {
            fail_writes: true,
            ..CellStore::default()
        };
        assert_eq!(budget.consume(&mut store), Err(BudgetError::Write(())));
    }
}
