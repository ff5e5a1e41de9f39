//! Board drivers implementing the `mystery-core` capability traits.

#![cfg(target_os = "none")]

pub mod buzzer;
pub mod clock;
pub mod flash;
pub mod gps;
pub mod outputs;
