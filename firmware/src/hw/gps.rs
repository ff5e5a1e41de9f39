//! GPS receiver on USART5.
//!
//! The receiver streams NMEA at 9600 baud. [`GpsReceiver::drain`] polls the
//! buffered UART for the whole drain window and feeds every byte into a
//! [`FixTracker`]; the interrupt-driven ring keeps collecting bytes between
//! drains, so sentences straddling two windows are still assembled.

use core::time::Duration;

use embassy_stm32 as hal;
use embassy_stm32::Peri;
use embassy_stm32::usart::{
    BufferedUart, Config as UartConfig, ConfigError, DataBits, Parity, StopBits,
};
use embedded_io::{Read, ReadReady};
use mystery_core::fix::PositionFix;
use mystery_core::nmea::FixTracker;
use mystery_core::session::{Clock, FixProvider};

use crate::telemetry;

const GPS_UART_BAUD: u32 = 9_600;
const GPS_UART_BUFFER_SIZE: usize = 256;
const GPS_READ_CHUNK: usize = 64;
/// Sleep between polls when the ring is empty; roughly five byte times.
const GPS_IDLE_POLL: Duration = Duration::from_millis(5);

static mut UART_TX_BUFFER: [u8; 16] = [0; 16];
static mut UART_RX_BUFFER: [u8; GPS_UART_BUFFER_SIZE] = [0; GPS_UART_BUFFER_SIZE];

embassy_stm32::bind_interrupts!(struct UartIrqs {
    USART3_4_5_6_LPUART1 => embassy_stm32::usart::BufferedInterruptHandler<hal::peripherals::USART5>;
});

pub struct GpsReceiver<'d> {
    uart: BufferedUart<'d>,
    tracker: FixTracker,
    reported_failures: u32,
}

impl GpsReceiver<'static> {
    /// Configures USART5 for the receiver. Must be called once.
    pub fn new(
        usart: Peri<'static, hal::peripherals::USART5>,
        tx_pin: Peri<'static, hal::peripherals::PB0>,
        rx_pin: Peri<'static, hal::peripherals::PB1>,
    ) -> Result<Self, ConfigError> {
        let mut config = UartConfig::default();
        config.baudrate = GPS_UART_BAUD;
        config.data_bits = DataBits::DataBits8;
        config.stop_bits = StopBits::STOP1;
        config.parity = Parity::ParityNone;

        // The buffers are handed out exactly once, here.
        let uart = unsafe {
            BufferedUart::new(
                usart,
                rx_pin,
                tx_pin,
                &mut UART_TX_BUFFER,
                &mut UART_RX_BUFFER,
                UartIrqs,
                config,
            )?
        };

        Ok(Self {
            uart,
            tracker: FixTracker::new(),
            reported_failures: 0,
        })
    }
}

impl GpsReceiver<'_> {
    fn pump(&mut self, chunk: &mut [u8]) -> bool {
        match self.uart.read_ready() {
            Ok(true) => match self.uart.read(chunk) {
                Ok(count) => {
                    self.tracker.feed(&chunk[..count]);
                    true
                }
                Err(_) => {
                    telemetry::log_gps_read_error();
                    false
                }
            },
            Ok(false) => false,
            Err(_) => {
                telemetry::log_gps_read_error();
                false
            }
        }
    }
}

impl FixProvider for GpsReceiver<'_> {
    fn drain<C: Clock>(&mut self, clock: &mut C, window: Duration) {
        let started = clock.now();
        let mut chunk = [0u8; GPS_READ_CHUNK];
        while clock.elapsed_since(started) < window {
            if !self.pump(&mut chunk) {
                clock.delay(GPS_IDLE_POLL);
            }
        }

        let failures = self.tracker.failures();
        if failures != self.reported_failures {
            telemetry::log_gps_rejected(failures - self.reported_failures);
            self.reported_failures = failures;
        }
    }

    fn current_fix(&self) -> PositionFix {
        self.tracker.fix()
    }
}
