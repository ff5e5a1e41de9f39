//! Session telemetry catalog and ring buffer.
//!
//! The session driver records every decision and hardware action it takes so
//! the firmware can log a compact trace and the emulator can write
//! transcripts. Records carry the offset since session start rather than a
//! target-specific instant, which keeps the ring `no_std` and clock agnostic.

use core::{fmt, time::Duration};

use heapless::{HistoryBuf, OldestOrdered};

use crate::unlock::SessionOutcome;

/// Total number of telemetry entries retained in memory.
pub const SESSION_LOG_CAPACITY: usize = 64;

/// Identifier assigned to each recorded event.
pub type EventId = u32;

/// Events emitted while a session runs.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SessionEventKind {
    SessionStarted,
    BudgetReset { attempts_left: u16 },
    Evaluated(SessionOutcome),
    AttemptConsumed { attempts_left: u16 },
    LatchOpened,
    SessionTimedOut,
    StorageFault,
    PowerCut,
}

impl SessionEventKind {
    const SESSION_STARTED_CODE: u16 = 0x0001;
    const BUDGET_RESET_CODE: u16 = 0x0002;
    const ATTEMPT_CONSUMED_CODE: u16 = 0x0003;
    const LATCH_OPENED_CODE: u16 = 0x0004;
    const SESSION_TIMED_OUT_CODE: u16 = 0x0005;
    const STORAGE_FAULT_CODE: u16 = 0x0006;
    const POWER_CUT_CODE: u16 = 0x0007;
    const EVALUATED_BASE: u16 = 0x0010;

    /// Encodes the event kind into a compact discriminant for log lines.
    #[must_use]
    pub const fn to_raw(self) -> u16 {
        match self {
            SessionEventKind::SessionStarted => Self::SESSION_STARTED_CODE,
            SessionEventKind::BudgetReset { .. } => Self::BUDGET_RESET_CODE,
            SessionEventKind::Evaluated(outcome) => Self::EVALUATED_BASE + outcome_index(outcome),
            SessionEventKind::AttemptConsumed { .. } => Self::ATTEMPT_CONSUMED_CODE,
            SessionEventKind::LatchOpened => Self::LATCH_OPENED_CODE,
            SessionEventKind::SessionTimedOut => Self::SESSION_TIMED_OUT_CODE,
            SessionEventKind::StorageFault => Self::STORAGE_FAULT_CODE,
            SessionEventKind::PowerCut => Self::POWER_CUT_CODE,
        }
    }
}

impl fmt::Display for SessionEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionEventKind::SessionStarted => f.write_str("session-started"),
            SessionEventKind::BudgetReset { attempts_left } => {
                write!(f, "budget-reset attempts={attempts_left}")
            }
            SessionEventKind::Evaluated(outcome) => write!(f, "evaluated {}", outcome.label()),
            SessionEventKind::AttemptConsumed { attempts_left } => {
                write!(f, "attempt-consumed attempts={attempts_left}")
            }
            SessionEventKind::LatchOpened => f.write_str("latch-opened"),
            SessionEventKind::SessionTimedOut => f.write_str("session-timed-out"),
            SessionEventKind::StorageFault => f.write_str("storage-fault"),
            SessionEventKind::PowerCut => f.write_str("power-cut"),
        }
    }
}

const fn outcome_index(outcome: SessionOutcome) -> u16 {
    match outcome {
        SessionOutcome::AwaitingFix => 0,
        SessionOutcome::TooEarlyDay => 1,
        SessionOutcome::TooEarlyHour => 2,
        SessionOutcome::AwaitingLocation => 3,
        SessionOutcome::InRangeAndOpened => 4,
        SessionOutcome::OutOfRangeAttemptConsumed => 5,
        SessionOutcome::NoAttemptsLeft => 6,
    }
}

/// Telemetry record stored in the ring buffer.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct SessionEvent {
    pub id: EventId,
    /// Offset from session start.
    pub at: Duration,
    pub kind: SessionEventKind,
}

/// Fixed-capacity history of session events.
pub struct SessionLog<const CAPACITY: usize = SESSION_LOG_CAPACITY> {
    ring: HistoryBuf<SessionEvent, CAPACITY>,
    next_event_id: EventId,
}

impl<const CAPACITY: usize> SessionLog<CAPACITY> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            ring: HistoryBuf::new(),
            next_event_id: 0,
        }
    }

    /// Appends an event, evicting the oldest one when full.
    pub fn record(&mut self, kind: SessionEventKind, at: Duration) -> EventId {
        let id = self.next_event_id;
        self.next_event_id = self.next_event_id.wrapping_add(1);
        self.ring.write(SessionEvent { id, at, kind });
        id
    }

    /// Returns an iterator over the recorded events in chronological order.
    pub fn oldest_first(&self) -> OldestOrdered<'_, SessionEvent> {
        self.ring.oldest_ordered()
    }

    /// Returns the most recent event, if any.
    pub fn latest(&self) -> Option<&SessionEvent> {
        self.ring.recent()
    }

    /// Returns the number of events currently stored.
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    /// Returns `true` when no events are stored.
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    /// Counts stored events matching `kind`.
    pub fn count(&self, kind: SessionEventKind) -> usize {
        self.oldest_first().filter(|event| event.kind == kind).count()
    }
}

impl<const CAPACITY: usize> Default for SessionLog<CAPACITY> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_codes_are_distinct() {
        let outcomes = [
            SessionOutcome::AwaitingFix,
            SessionOutcome::TooEarlyDay,
            SessionOutcome::TooEarlyHour,
            SessionOutcome::AwaitingLocation,
            SessionOutcome::InRangeAndOpened,
            SessionOutcome::OutOfRangeAttemptConsumed,
            SessionOutcome::NoAttemptsLeft,
        ];
        for (index, outcome) in outcomes.iter().enumerate() {
            let code = SessionEventKind::Evaluated(*outcome).to_raw();
            for other in &outcomes[index + 1..] {
                assert_ne!(code, SessionEventKind::Evaluated(*other).to_raw());
            }
        }
    }

    #[test]
    fn ring_keeps_newest_events() {
        let mut log: SessionLog<2> = SessionLog::new();
        log.record(SessionEventKind::SessionStarted, Duration::ZERO);
        log.record(SessionEventKind::LatchOpened, Duration::from_millis(5));
        let id = log.record(SessionEventKind::PowerCut, Duration::from_millis(9));

        assert_eq!(log.len(), 2);
        assert_eq!(id, 2);
        assert_eq!(log.count(SessionEventKind::SessionStarted), 0);
        assert_eq!(
            log.latest().map(|event| event.kind),
            Some(SessionEventKind::PowerCut)
        );
    }
}
