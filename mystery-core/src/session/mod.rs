//! Session driver and the hardware capabilities it consumes.
//!
//! One power-on runs one session: greet, optionally reset the budget, then
//! poll the positioning module and evaluate until a terminal outcome or the
//! session timeout. Every exit path ends with [`PowerSwitch::cut_power`].
//!
//! Hardware is injected through small traits so the same driver runs on the
//! STM32 firmware, in the host emulator, and against fakes in tests.

use core::time::Duration;

use crate::budget::{BudgetError, KeyValueStore};
use crate::config::BoxConfig;
use crate::fix::PositionFix;
use crate::message::Message;
use crate::telemetry::{SessionEventKind, SessionLog};
use crate::tunes::{Buzzer, MelodyKind, TuneSequencer, greeting_melody, melody_for};
use crate::unlock::{BudgetChange, Effect, Evaluation, SessionOutcome, UnlockStateMachine};

/// Half period of the status LED blink run once per loop iteration.
pub const LED_BLINK_HALF_PERIOD: Duration = Duration::from_millis(100);

/// Monotonic time source with blocking delays.
pub trait Clock {
    type Instant: Copy;

    fn now(&self) -> Self::Instant;

    /// Saturating time elapsed since `earlier`.
    fn elapsed_since(&self, earlier: Self::Instant) -> Duration;

    /// Blocks for `duration`.
    fn delay(&mut self, duration: Duration);
}

/// Source of positioning fixes.
pub trait FixProvider {
    /// Consumes stream data for up to `window`, updating the current fix.
    fn drain<C: Clock>(&mut self, clock: &mut C, window: Duration);

    /// Latest decoded fix; never blocks.
    fn current_fix(&self) -> PositionFix;
}

/// Text output for the holder.
pub trait TextPresenter {
    /// Scrolls `text` in and out; returns when the scroll is done.
    fn show_scrolling(&mut self, text: &str);

    /// Redraws the display with `text` immediately.
    fn show_static(&mut self, text: &str);
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LatchPosition {
    Closed,
    Open,
}

/// Lid latch actuator.
pub trait Latch {
    fn set_position(&mut self, position: LatchPosition);
}

/// Self-holding power relay.
pub trait PowerSwitch {
    /// Releases the holding relay. Calling it again has no further effect.
    fn cut_power(&mut self);
}

/// Operator feedback LED.
pub trait StatusLed {
    fn set(&mut self, on: bool);
}

/// Hardware handles owned by the driver for the lifetime of a session.
pub struct BoxIo<F, P, L, W, B, D> {
    pub fix: F,
    pub presenter: P,
    pub latch: L,
    pub power: W,
    pub buzzer: B,
    pub led: D,
}

/// Why a session loop stopped.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SessionEnd<E> {
    /// A terminal outcome was reached.
    Terminal,
    /// The session ran out of time.
    Timeout,
    /// The attempt budget could not be read or written.
    StorageFault(BudgetError<E>),
}

/// Summary returned once power has been cut.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SessionReport<E> {
    pub ended_by: SessionEnd<E>,
    pub last_outcome: Option<SessionOutcome>,
    pub evaluations: u32,
    /// Last known budget, if the session read or wrote it.
    pub attempts_left: Option<u16>,
    pub last_distance_m: Option<f64>,
}

impl<E> SessionReport<E> {
    const fn new() -> Self {
        Self {
            ended_by: SessionEnd::Timeout,
            last_outcome: None,
            evaluations: 0,
            attempts_left: None,
            last_distance_m: None,
        }
    }

    fn absorb(&mut self, evaluation: &Evaluation) {
        self.evaluations = self.evaluations.saturating_add(1);
        self.last_outcome = Some(evaluation.outcome);
        if evaluation.distance_m.is_some() {
            self.last_distance_m = evaluation.distance_m;
        }
        match evaluation.budget {
            BudgetChange::Untouched => {}
            BudgetChange::Reset { attempts_left } | BudgetChange::Consumed { attempts_left } => {
                self.attempts_left = Some(attempts_left);
            }
        }
    }
}

/// Runs the poll/evaluate/act loop for one power-on.
pub struct SessionDriver<F, P, L, W, B, D, K, C>
where
    C: Clock,
{
    io: BoxIo<F, P, L, W, B, D>,
    store: K,
    clock: C,
    config: BoxConfig,
    machine: UnlockStateMachine,
    log: SessionLog,
    started_at: Option<C::Instant>,
}

impl<F, P, L, W, B, D, K, C> SessionDriver<F, P, L, W, B, D, K, C>
where
    F: FixProvider,
    P: TextPresenter,
    L: Latch,
    W: PowerSwitch,
    B: Buzzer,
    D: StatusLed,
    K: KeyValueStore,
    C: Clock,
{
    #[must_use]
    pub fn new(config: BoxConfig, io: BoxIo<F, P, L, W, B, D>, store: K, clock: C) -> Self {
        Self {
            io,
            store,
            clock,
            machine: UnlockStateMachine::new(&config),
            config,
            log: SessionLog::new(),
            started_at: None,
        }
    }

    /// Events recorded so far.
    #[must_use]
    pub fn log(&self) -> &SessionLog {
        &self.log
    }

    #[must_use]
    pub fn io(&self) -> &BoxIo<F, P, L, W, B, D> {
        &self.io
    }

    #[must_use]
    pub fn store(&self) -> &K {
        &self.store
    }

    #[must_use]
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Releases the hardware handles.
    #[must_use]
    pub fn into_parts(self) -> (BoxIo<F, P, L, W, B, D>, K, C) {
        (self.io, self.store, self.clock)
    }

    /// Runs one full session and cuts power on the way out.
    ///
    /// `reset_pressed` is the reset button level sampled at power-on.
    pub fn run(&mut self, reset_pressed: bool) -> SessionReport<K::Error> {
        self.started_at = Some(self.clock.now());
        self.record(SessionEventKind::SessionStarted);

        let report = self.run_loop(reset_pressed);

        self.record(SessionEventKind::PowerCut);
        self.io.power.cut_power();
        report
    }

    /// One post-session iteration for boards that stay powered after the
    /// cutoff (bench supply, programmer). Shows the receiver hour when the
    /// clock is valid and returns it.
    pub fn linger(&mut self) -> Option<u8> {
        self.blink();
        self.io
            .fix
            .drain(&mut self.clock, self.config.fix_drain_window);
        let fix = self.io.fix.current_fix();
        if fix.date_valid && fix.time_valid {
            self.show(Message::Hour { hour: fix.hour });
            Some(fix.hour)
        } else {
            None
        }
    }

    fn run_loop(&mut self, reset_pressed: bool) -> SessionReport<K::Error> {
        let mut report = SessionReport::new();

        TuneSequencer::play(&mut self.io.buzzer, &mut self.clock, &greeting_melody());

        match self
            .machine
            .budget()
            .reset_if_requested(&mut self.store, reset_pressed)
        {
            Ok(Some(attempts_left)) => {
                report.attempts_left = Some(attempts_left);
                self.record(SessionEventKind::BudgetReset { attempts_left });
                self.show(Message::AttemptsReset {
                    count: attempts_left,
                });
            }
            Ok(None) => {}
            Err(err) => {
                self.record(SessionEventKind::StorageFault);
                report.ended_by = SessionEnd::StorageFault(err);
                return report;
            }
        }

        loop {
            if self.elapsed() >= self.config.session_timeout {
                self.record(SessionEventKind::SessionTimedOut);
                report.ended_by = SessionEnd::Timeout;
                return report;
            }

            self.blink();
            self.io
                .fix
                .drain(&mut self.clock, self.config.fix_drain_window);
            let fix = self.io.fix.current_fix();

            let evaluation = match self.machine.evaluate(&fix, &mut self.store) {
                Ok(evaluation) => evaluation,
                Err(err) => {
                    self.record(SessionEventKind::StorageFault);
                    report.ended_by = SessionEnd::StorageFault(err);
                    return report;
                }
            };

            report.absorb(&evaluation);
            self.record_evaluation(&evaluation);
            for effect in &evaluation.effects {
                self.apply(*effect);
            }

            if evaluation.is_terminal(self.config.retry_policy) {
                report.ended_by = SessionEnd::Terminal;
                return report;
            }
        }
    }

    fn apply(&mut self, effect: Effect) {
        match effect {
            Effect::Show(message) => self.show(message),
            Effect::Countdown { from } => {
                for value in (1..=from).rev() {
                    let text = Message::Countdown { value }.render();
                    self.io.presenter.show_static(text.as_str());
                    self.clock.delay(self.config.countdown_step);
                }
            }
            Effect::OpenLatch => {
                self.io.latch.set_position(LatchPosition::Open);
                self.record(SessionEventKind::LatchOpened);
            }
            Effect::PlayMelody { melody, repeats } => self.play(melody, repeats),
        }
    }

    fn play(&mut self, melody: MelodyKind, repeats: u8) {
        let melody = melody_for(melody);
        TuneSequencer::play_repeated(&mut self.io.buzzer, &mut self.clock, &melody, repeats);
    }

    fn show(&mut self, message: Message) {
        let text = message.render();
        self.io.presenter.show_scrolling(text.as_str());
    }

    fn blink(&mut self) {
        self.io.led.set(true);
        self.clock.delay(LED_BLINK_HALF_PERIOD);
        self.io.led.set(false);
        self.clock.delay(LED_BLINK_HALF_PERIOD);
    }

    fn record_evaluation(&mut self, evaluation: &Evaluation) {
        self.record(SessionEventKind::Evaluated(evaluation.outcome));
        if let BudgetChange::Consumed { attempts_left } = evaluation.budget {
            self.record(SessionEventKind::AttemptConsumed { attempts_left });
        }
    }

    fn elapsed(&self) -> Duration {
        self.started_at
            .map_or(Duration::ZERO, |started| self.clock.elapsed_since(started))
    }

    fn record(&mut self, kind: SessionEventKind) {
        let at = self.elapsed();
        self.log.record(kind, at);
    }
}
