//! GPIO actuators: power-hold relays, lid latch, status LED, reset button,
//! and the log-backed text presenter.

use embassy_stm32::gpio::{Input, Output, OutputOpenDrain};
use embassy_time::block_for;
use mystery_core::session::{Latch, LatchPosition, PowerSwitch, StatusLed, TextPresenter};

use crate::hw::clock::core_duration_to_embassy;
use crate::telemetry;

/// Time the matrix needs to scroll one character across and off the panel.
const SCROLL_TIME_PER_CHAR: core::time::Duration = core::time::Duration::from_millis(60);

/// Both relays hold the supply while driven low. Releasing them opens the
/// supply loop and the board loses power.
pub struct RelayPowerSwitch<'d> {
    relays: [OutputOpenDrain<'d>; 2],
    released: bool,
}

impl<'d> RelayPowerSwitch<'d> {
    /// Takes over relays that were already driven low at init.
    pub fn hold(primary: OutputOpenDrain<'d>, secondary: OutputOpenDrain<'d>) -> Self {
        let mut switch = Self {
            relays: [primary, secondary],
            released: false,
        };
        for relay in &mut switch.relays {
            relay.set_low();
        }
        switch
    }
}

impl PowerSwitch for RelayPowerSwitch<'_> {
    fn cut_power(&mut self) {
        if self.released {
            return;
        }
        for relay in &mut self.relays {
            relay.set_high();
        }
        self.released = true;
        telemetry::log_power_released();
    }
}

/// Solenoid latch; energised (low) is open.
pub struct SolenoidLatch<'d> {
    pin: OutputOpenDrain<'d>,
}

impl<'d> SolenoidLatch<'d> {
    pub fn new(mut pin: OutputOpenDrain<'d>) -> Self {
        pin.set_high();
        Self { pin }
    }
}

impl Latch for SolenoidLatch<'_> {
    fn set_position(&mut self, position: LatchPosition) {
        match position {
            LatchPosition::Open => self.pin.set_low(),
            LatchPosition::Closed => self.pin.set_high(),
        }
        telemetry::log_latch(position);
    }
}

pub struct BoardLed<'d> {
    pin: Output<'d>,
}

impl<'d> BoardLed<'d> {
    pub fn new(pin: Output<'d>) -> Self {
        Self { pin }
    }
}

impl StatusLed for BoardLed<'_> {
    fn set(&mut self, on: bool) {
        if on {
            self.pin.set_high();
        } else {
            self.pin.set_low();
        }
    }
}

/// Active-low reset button with the internal pull-up.
pub struct ResetButton<'d> {
    pin: Input<'d>,
}

impl<'d> ResetButton<'d> {
    pub fn new(pin: Input<'d>) -> Self {
        Self { pin }
    }

    pub fn is_pressed(&self) -> bool {
        self.pin.is_low()
    }
}

/// Mirrors display text to the RTT log and blocks for the scroll time.
#[derive(Copy, Clone, Debug, Default)]
pub struct LogPresenter;

impl TextPresenter for LogPresenter {
    fn show_scrolling(&mut self, text: &str) {
        telemetry::log_display(text);
        let chars = u32::try_from(text.chars().count()).unwrap_or(u32::MAX);
        block_for(core_duration_to_embassy(
            SCROLL_TIME_PER_CHAR.saturating_mul(chars),
        ));
    }

    fn show_static(&mut self, text: &str) {
        telemetry::log_display(text);
    }
}
