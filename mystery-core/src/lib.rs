#![no_std]

// Shared logic for the mystery box.
//
// Everything the box decides lives here so the STM32 firmware and the host
// emulator run the same state machine. The crate avoids the Rust standard
// library; hardware is reached only through the capability traits in
// `session`, `tunes` and `budget`.

pub mod budget;
pub mod config;
pub mod fix;
pub mod geo;
pub mod message;
pub mod nmea;
pub mod session;
pub mod telemetry;
pub mod tunes;
pub mod unlock;
