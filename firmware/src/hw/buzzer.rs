use embassy_stm32::peripherals::TIM3;
use embassy_stm32::time::Hertz;
use embassy_stm32::timer::simple_pwm::SimplePwm;
use mystery_core::tunes::Buzzer;

const DUTY_PERCENT: u8 = 50;

/// Piezo on TIM3 CH1, driven with a 50 % square wave.
pub struct PwmBuzzer<'d> {
    pwm: SimplePwm<'d, TIM3>,
}

impl<'d> PwmBuzzer<'d> {
    pub fn new(mut pwm: SimplePwm<'d, TIM3>) -> Self {
        pwm.ch1().disable();
        Self { pwm }
    }
}

impl Buzzer for PwmBuzzer<'_> {
    fn play_tone(&mut self, freq_hz: u32) {
        if freq_hz == 0 {
            self.silence();
            return;
        }
        self.pwm.set_frequency(Hertz(freq_hz));
        let mut channel = self.pwm.ch1();
        channel.set_duty_cycle_percent(DUTY_PERCENT);
        channel.enable();
    }

    fn silence(&mut self) {
        self.pwm.ch1().disable();
    }
}
