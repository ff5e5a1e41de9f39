use cortex_m::interrupt;
use cortex_m::register::primask;
use critical_section::{self, RawRestoreState};
use defmt_rtt as _;
use embassy_executor::Spawner;
use embassy_stm32 as hal;
use embassy_stm32::gpio::{Input, Level, Output, OutputOpenDrain, OutputType, Pull, Speed};
use embassy_stm32::time::khz;
use embassy_stm32::timer::low_level::CountingMode;
use embassy_stm32::timer::simple_pwm::{PwmPin, SimplePwm};
use mystery_core::session::{BoxIo, SessionDriver};

use crate::hw::buzzer::PwmBuzzer;
use crate::hw::clock::EmbassyClock;
use crate::hw::flash::BudgetBank;
use crate::hw::gps::GpsReceiver;
use crate::hw::outputs::{BoardLed, LogPresenter, RelayPowerSwitch, ResetButton, SolenoidLatch};
use crate::provisioning::BOX_CONFIG;
use crate::status;
use crate::store::SlotStore;
use crate::telemetry;

critical_section::set_impl!(InterruptCriticalSection);

struct InterruptCriticalSection;

unsafe impl critical_section::Impl for InterruptCriticalSection {
    unsafe fn acquire() -> RawRestoreState {
        let primask = primask::read();
        interrupt::disable();
        primask.is_active()
    }

    unsafe fn release(restore_state: RawRestoreState) {
        if restore_state {
            unsafe {
                interrupt::enable();
            }
        }
    }
}

/// Parks the MCU after an unrecoverable init failure. Only a physical reset
/// (or the relays dropping out) gets the box going again.
pub fn fail_stop(reason: &'static str) -> ! {
    defmt::error!("fail-stop: {}", reason);
    loop {
        cortex_m::asm::nop();
    }
}

#[embassy_executor::main]
pub async fn main(_spawner: Spawner) {
    let hal::Peripherals {
        PA2,
        PA3,
        PA4,
        PA5,
        PA6,
        PA7,
        PB0,
        PB1,
        USART5,
        TIM3,
        FLASH,
        ..
    } = hal::init(hal::Config::default());

    // Grab the supply first; the holder may let go of the switch any time.
    let power = RelayPowerSwitch::hold(
        OutputOpenDrain::new(PA2, Level::Low, Speed::Low),
        OutputOpenDrain::new(PA3, Level::Low, Speed::Low),
    );

    let reset_pressed = ResetButton::new(Input::new(PA5, Pull::Up)).is_pressed();
    telemetry::log_reset_sampled(reset_pressed);

    let Ok(fix) = GpsReceiver::new(USART5, PB0, PB1) else {
        fail_stop("gps: UART configuration rejected");
    };

    let pwm = SimplePwm::new(
        TIM3,
        Some(PwmPin::new(PA6, OutputType::PushPull)),
        None,
        None,
        None,
        khz(1),
        CountingMode::EdgeAlignedUp,
    );

    let io = BoxIo {
        fix,
        presenter: LogPresenter,
        latch: SolenoidLatch::new(OutputOpenDrain::new(PA4, Level::High, Speed::Low)),
        power,
        buzzer: PwmBuzzer::new(pwm),
        led: BoardLed::new(Output::new(PA7, Level::Low, Speed::Low)),
    };
    let store = SlotStore::new(BudgetBank::new(FLASH));

    let mut driver = SessionDriver::new(BOX_CONFIG, io, store, EmbassyClock);
    let report = driver.run(reset_pressed);

    status::record_report(&report);
    telemetry::log_report(&report);
    telemetry::log_status(&status::snapshot());
    telemetry::log_session(driver.log().oldest_first());

    // Still running means the board is on a bench supply.
    loop {
        if let Some(hour) = driver.linger() {
            if status::record_hour(hour) {
                telemetry::log_hour(hour);
            }
        }
    }
}
