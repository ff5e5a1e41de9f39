#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;
use std::time::Duration;

use mystery_core::budget::{ATTEMPTS_KEY, KeyValueStore};
use mystery_core::config::{BoxConfig, DEFAULT_CONFIG};
use mystery_core::fix::PositionFix;
use mystery_core::session::{
    BoxIo, Clock, FixProvider, Latch, LatchPosition, PowerSwitch, SessionDriver, SessionReport,
    StatusLed, TextPresenter,
};
use mystery_core::tunes::Buzzer;

/// Hardware action observed by the fakes, in call order.
#[derive(Clone, Debug, PartialEq)]
pub enum Hw {
    Scroll(String),
    Static(String),
    Latch(LatchPosition),
    Tone(u32),
    PowerCut,
}

pub type Journal = Rc<RefCell<Vec<Hw>>>;

#[derive(Clone)]
pub struct FakeClock {
    now: Rc<Cell<Duration>>,
}

impl FakeClock {
    pub fn new() -> Self {
        Self {
            now: Rc::new(Cell::new(Duration::ZERO)),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.now.get()
    }
}

impl Clock for FakeClock {
    type Instant = Duration;

    fn now(&self) -> Duration {
        self.now.get()
    }

    fn elapsed_since(&self, earlier: Duration) -> Duration {
        self.now.get().saturating_sub(earlier)
    }

    fn delay(&mut self, duration: Duration) {
        self.now.set(self.now.get() + duration);
    }
}

/// Hands out one scripted fix per drain and repeats the last one forever.
pub struct ScriptedFixes {
    pending: VecDeque<PositionFix>,
    current: PositionFix,
    pub drains: usize,
}

impl ScriptedFixes {
    pub fn new(fixes: impl IntoIterator<Item = PositionFix>) -> Self {
        Self {
            pending: fixes.into_iter().collect(),
            current: PositionFix::empty(),
            drains: 0,
        }
    }
}

impl FixProvider for ScriptedFixes {
    fn drain<C: Clock>(&mut self, clock: &mut C, window: Duration) {
        clock.delay(window);
        self.drains += 1;
        if let Some(next) = self.pending.pop_front() {
            self.current = next;
        }
    }

    fn current_fix(&self) -> PositionFix {
        self.current
    }
}

pub struct JournalPresenter(pub Journal);

impl TextPresenter for JournalPresenter {
    fn show_scrolling(&mut self, text: &str) {
        self.0.borrow_mut().push(Hw::Scroll(text.to_owned()));
    }

    fn show_static(&mut self, text: &str) {
        self.0.borrow_mut().push(Hw::Static(text.to_owned()));
    }
}

pub struct JournalLatch(pub Journal);

impl Latch for JournalLatch {
    fn set_position(&mut self, position: LatchPosition) {
        self.0.borrow_mut().push(Hw::Latch(position));
    }
}

/// Relay model: once released it stays released.
pub struct JournalRelay {
    journal: Journal,
    pub held: bool,
    pub releases: usize,
}

impl JournalRelay {
    pub fn new(journal: Journal) -> Self {
        Self {
            journal,
            held: true,
            releases: 0,
        }
    }
}

impl PowerSwitch for JournalRelay {
    fn cut_power(&mut self) {
        if self.held {
            self.held = false;
            self.releases += 1;
            self.journal.borrow_mut().push(Hw::PowerCut);
        }
    }
}

pub struct JournalBuzzer(pub Journal);

impl Buzzer for JournalBuzzer {
    fn play_tone(&mut self, frequency_hz: u32) {
        self.0.borrow_mut().push(Hw::Tone(frequency_hz));
    }

    fn silence(&mut self) {}
}

#[derive(Default)]
pub struct CountingLed {
    pub pulses: usize,
}

impl StatusLed for CountingLed {
    fn set(&mut self, on: bool) {
        if on {
            self.pulses += 1;
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct StoreFault;

#[derive(Default)]
pub struct MemoryStore {
    pub values: HashMap<String, i32>,
    pub writes: usize,
    pub fail_reads: bool,
    pub fail_writes: bool,
}

impl MemoryStore {
    pub fn with_attempts(attempts: i32) -> Self {
        let mut store = Self::default();
        store.values.insert(ATTEMPTS_KEY.to_owned(), attempts);
        store
    }

    pub fn attempts(&self) -> Option<i32> {
        self.values.get(ATTEMPTS_KEY).copied()
    }
}

impl KeyValueStore for MemoryStore {
    type Error = StoreFault;

    fn get_int(&mut self, key: &str, default: i32) -> Result<i32, StoreFault> {
        if self.fail_reads {
            return Err(StoreFault);
        }
        Ok(self.values.get(key).copied().unwrap_or(default))
    }

    fn put_int(&mut self, key: &str, value: i32) -> Result<(), StoreFault> {
        if self.fail_writes {
            return Err(StoreFault);
        }
        self.writes += 1;
        self.values.insert(key.to_owned(), value);
        Ok(())
    }
}

pub type TestDriver = SessionDriver<
    ScriptedFixes,
    JournalPresenter,
    JournalLatch,
    JournalRelay,
    JournalBuzzer,
    CountingLed,
    MemoryStore,
    FakeClock,
>;

pub struct Rig {
    pub driver: TestDriver,
    pub journal: Journal,
    pub clock: FakeClock,
}

impl Rig {
    pub fn new(
        config: BoxConfig,
        fixes: impl IntoIterator<Item = PositionFix>,
        store: MemoryStore,
    ) -> Self {
        let journal: Journal = Rc::default();
        let clock = FakeClock::new();
        let io = BoxIo {
            fix: ScriptedFixes::new(fixes),
            presenter: JournalPresenter(journal.clone()),
            latch: JournalLatch(journal.clone()),
            power: JournalRelay::new(journal.clone()),
            buzzer: JournalBuzzer(journal.clone()),
            led: CountingLed::default(),
        };
        Self {
            driver: SessionDriver::new(config, io, store, clock.clone()),
            journal,
            clock,
        }
    }

    pub fn run(&mut self, reset_pressed: bool) -> SessionReport<StoreFault> {
        self.driver.run(reset_pressed)
    }

    pub fn store(&self) -> &MemoryStore {
        self.driver.store()
    }

    /// Everything but the buzzer tones.
    pub fn visible(&self) -> Vec<Hw> {
        self.journal
            .borrow()
            .iter()
            .filter(|hw| !matches!(hw, Hw::Tone(_)))
            .cloned()
            .collect()
    }

    pub fn scrolled(&self) -> Vec<String> {
        self.journal
            .borrow()
            .iter()
            .filter_map(|hw| match hw {
                Hw::Scroll(text) => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn tones(&self) -> usize {
        self.journal
            .borrow()
            .iter()
            .filter(|hw| matches!(hw, Hw::Tone(_)))
            .count()
    }
}

/// Fix with a valid receiver clock at `year-month-day hour:00:00` UTC.
pub fn clock_fix(year: u16, month: u8, day: u8, hour: u8) -> PositionFix {
    PositionFix {
        date_valid: true,
        time_valid: true,
        year,
        month,
        day,
        hour,
        ..PositionFix::empty()
    }
}

/// Fix at the unlock hour of the default schedule.
pub fn unlocked_clock() -> PositionFix {
    let schedule = DEFAULT_CONFIG.schedule;
    clock_fix(schedule.year, schedule.month, schedule.day, schedule.hour)
}

/// `fix` moved `meters` due north of the default target.
pub fn north_of_target(fix: PositionFix, meters: f64) -> PositionFix {
    let target = DEFAULT_CONFIG.target;
    let degrees = meters / 111_194.93;
    PositionFix {
        location_valid: true,
        lat: target.latitude + degrees,
        lon: target.longitude,
        ..fix
    }
}
