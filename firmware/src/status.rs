#![cfg_attr(not(target_os = "none"), allow(dead_code))]

//! Shared status storage for the firmware target.
//!
//! The session result is parked in atomics so a debugger (or the linger
//! loop) can read it after the relays have been released without touching
//! the driver.

use mystery_core::session::{SessionEnd, SessionReport};
use mystery_core::telemetry::SessionEventKind;
use portable_atomic::{AtomicBool, AtomicU8, AtomicU16, Ordering};

const UNKNOWN: u16 = u16::MAX;
const UNKNOWN_HOUR: u8 = u8::MAX;

/// Telemetry code of the last evaluation outcome.
static LAST_OUTCOME: AtomicU16 = AtomicU16::new(UNKNOWN);
/// Budget after the session.
static ATTEMPTS_LEFT: AtomicU16 = AtomicU16::new(UNKNOWN);
/// Set once the session driver has returned.
static SESSION_FINISHED: AtomicBool = AtomicBool::new(false);
/// Set when the session ended on a budget store failure.
static STORAGE_FAULT: AtomicBool = AtomicBool::new(false);
/// Receiver hour last shown by the linger loop.
static LAST_HOUR: AtomicU8 = AtomicU8::new(UNKNOWN_HOUR);

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct StatusSnapshot {
    pub session_finished: bool,
    pub storage_fault: bool,
    pub last_outcome_code: Option<u16>,
    pub attempts_left: Option<u16>,
    pub last_hour: Option<u8>,
}

/// Stores the summary of a finished session.
pub fn record_report<E>(report: &SessionReport<E>) {
    let outcome = report
        .last_outcome
        .map_or(UNKNOWN, |outcome| SessionEventKind::Evaluated(outcome).to_raw());
    LAST_OUTCOME.store(outcome, Ordering::Relaxed);
    ATTEMPTS_LEFT.store(report.attempts_left.unwrap_or(UNKNOWN), Ordering::Relaxed);
    STORAGE_FAULT.store(
        matches!(report.ended_by, SessionEnd::StorageFault(_)),
        Ordering::Relaxed,
    );
    SESSION_FINISHED.store(true, Ordering::Relaxed);
}

/// Stores the latest receiver hour; returns `true` when it changed.
pub fn record_hour(hour: u8) -> bool {
    LAST_HOUR.swap(hour, Ordering::Relaxed) != hour
}

pub fn snapshot() -> StatusSnapshot {
    StatusSnapshot {
        session_finished: SESSION_FINISHED.load(Ordering::Relaxed),
        storage_fault: STORAGE_FAULT.load(Ordering::Relaxed),
        last_outcome_code: known(LAST_OUTCOME.load(Ordering::Relaxed)),
        attempts_left: known(ATTEMPTS_LEFT.load(Ordering::Relaxed)),
        last_hour: match LAST_HOUR.load(Ordering::Relaxed) {
            UNKNOWN_HOUR => None,
            hour => Some(hour),
        },
    }
}

fn known(raw: u16) -> Option<u16> {
    if raw == UNKNOWN { None } else { Some(raw) }
}
