//! Logging helpers for the box firmware.
//!
//! Target builds log through `defmt` over RTT; host builds print to stdout so
//! the same call sites work under `cargo test`. Session events come from the
//! ring kept by `mystery-core` and are mirrored here once the session is over,
//! since RTT output during the blocking session loop would stretch its timing.

#![cfg_attr(not(target_os = "none"), allow(dead_code))]

use mystery_core::session::{LatchPosition, SessionEnd, SessionReport};
use mystery_core::telemetry::SessionEvent;

use crate::status::StatusSnapshot;

/// Logs every event of a finished session, oldest first.
pub fn log_session<'a>(events: impl Iterator<Item = &'a SessionEvent>) {
    for event in events {
        let at_ms = u64::try_from(event.at.as_millis()).unwrap_or(u64::MAX);
        emit_event(event, at_ms);
    }
}

/// Logs the session summary.
pub fn log_report<E: core::fmt::Debug>(report: &SessionReport<E>) {
    let outcome = report.last_outcome.map_or("none", |outcome| outcome.label());
    let attempts = report.attempts_left.map_or(-1, i32::from);
    match &report.ended_by {
        SessionEnd::Terminal => emit_report("terminal", outcome, report.evaluations, attempts),
        SessionEnd::Timeout => emit_report("timeout", outcome, report.evaluations, attempts),
        SessionEnd::StorageFault(err) => {
            emit_report("storage-fault", outcome, report.evaluations, attempts);
            emit_storage_fault(err);
        }
    }
}

/// Logs the parked status words a debugger would read.
pub fn log_status(snapshot: &StatusSnapshot) {
    let outcome = snapshot.last_outcome_code.unwrap_or(u16::MAX);
    let attempts = snapshot.attempts_left.unwrap_or(u16::MAX);
    emit_status(
        snapshot.session_finished,
        snapshot.storage_fault,
        outcome,
        attempts,
    );
}

pub fn log_reset_sampled(pressed: bool) {
    emit_line("session: reset button", if pressed { "held" } else { "released" });
}

pub fn log_display(text: &str) {
    emit_line("display", text);
}

pub fn log_latch(position: LatchPosition) {
    let label = match position {
        LatchPosition::Open => "open",
        LatchPosition::Closed => "closed",
    };
    emit_line("latch", label);
}

pub fn log_power_released() {
    emit_line("power", "relays released");
}

pub fn log_gps_read_error() {
    emit_warning("gps: UART read error");
}

pub fn log_gps_rejected(lines: u32) {
    emit_count("gps: rejected sentences", lines);
}

pub fn log_hour(hour: u8) {
    emit_count("linger: receiver hour", u32::from(hour));
}

#[cfg(target_os = "none")]
fn emit_event(event: &SessionEvent, at_ms: u64) {
    defmt::info!(
        "session:event #{} t={}ms code={=u16:#x} {}",
        event.id,
        at_ms,
        event.kind.to_raw(),
        event.kind
    );
}

#[cfg(not(target_os = "none"))]
fn emit_event(event: &SessionEvent, at_ms: u64) {
    println!(
        "session:event #{} t={}ms code={:#06x} {}",
        event.id,
        at_ms,
        event.kind.to_raw(),
        event.kind
    );
}

#[cfg(target_os = "none")]
fn emit_report(ended_by: &str, outcome: &str, evaluations: u32, attempts: i32) {
    defmt::info!(
        "session: ended={} outcome={} evaluations={} attempts={}",
        ended_by,
        outcome,
        evaluations,
        attempts
    );
}

#[cfg(not(target_os = "none"))]
fn emit_report(ended_by: &str, outcome: &str, evaluations: u32, attempts: i32) {
    println!("session: ended={ended_by} outcome={outcome} evaluations={evaluations} attempts={attempts}");
}

#[cfg(target_os = "none")]
fn emit_status(finished: bool, storage_fault: bool, outcome: u16, attempts: u16) {
    defmt::info!(
        "status: finished={} storage-fault={} outcome={=u16:#x} attempts={}",
        finished,
        storage_fault,
        outcome,
        attempts
    );
}

#[cfg(not(target_os = "none"))]
fn emit_status(finished: bool, storage_fault: bool, outcome: u16, attempts: u16) {
    println!(
        "status: finished={finished} storage-fault={storage_fault} outcome={outcome:#06x} attempts={attempts}"
    );
}

#[cfg(target_os = "none")]
fn emit_storage_fault<E: core::fmt::Debug>(err: &E) {
    defmt::error!("session: budget store failed: {}", defmt::Debug2Format(err));
}

#[cfg(not(target_os = "none"))]
fn emit_storage_fault<E: core::fmt::Debug>(err: &E) {
    println!("session: budget store failed: {err:?}");
}

#[cfg(target_os = "none")]
fn emit_line(topic: &str, text: &str) {
    defmt::info!("{}: {}", topic, text);
}

#[cfg(not(target_os = "none"))]
fn emit_line(topic: &str, text: &str) {
    println!("{topic}: {text}");
}

#[cfg(target_os = "none")]
fn emit_count(topic: &str, value: u32) {
    defmt::info!("{}={}", topic, value);
}

#[cfg(not(target_os = "none"))]
fn emit_count(topic: &str, value: u32) {
    println!("{topic}={value}");
}

#[cfg(target_os = "none")]
fn emit_warning(text: &str) {
    defmt::warn!("{}", text);
}

#[cfg(not(target_os = "none"))]
fn emit_warning(text: &str) {
    println!("warning: {text}");
}
