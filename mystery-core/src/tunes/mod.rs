//! Melody data and the blocking tune sequencer.
//!
//! A melody is a string of note symbols plus a beat count per symbol. Symbols
//! map onto the closed [`Pitch`] set; a space is a rest and anything else is
//! skipped without a sound or a pause. Playback is synchronous: the box has
//! nothing else to do while it sings.

use core::time::Duration;

use crate::session::Clock;

pub mod celebration;
pub mod cue;
pub mod greeting;

pub use celebration::{CELEBRATION_MELODY, celebration_melody};
pub use cue::{POSITIVE_CUE_MELODY, positive_cue_melody};
pub use greeting::{GREETING_MELODY, greeting_melody};

/// Tones last `beats * tempo / QUICK_DIVISOR` so notes sound short and crisp.
pub const QUICK_DIVISOR: u32 = 2;

/// Symbol marking a silent beat.
pub const REST_SYMBOL: char = ' ';

/// Pitches the buzzer can play.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Pitch {
    C4,
    D4,
    E4,
    F4,
    G4,
    A4,
    B4,
    C5,
}

impl Pitch {
    /// Looks up the pitch written as `symbol`.
    #[must_use]
    pub const fn from_symbol(symbol: char) -> Option<Self> {
        match symbol {
            'c' => Some(Pitch::C4),
            'd' => Some(Pitch::D4),
            'e' => Some(Pitch::E4),
            'f' => Some(Pitch::F4),
            'g' => Some(Pitch::G4),
            'a' => Some(Pitch::A4),
            'b' => Some(Pitch::B4),
            'C' => Some(Pitch::C5),
            _ => None,
        }
    }

    /// Symbol used for this pitch in melody strings.
    #[must_use]
    pub const fn symbol(self) -> char {
        match self {
            Pitch::C4 => 'c',
            Pitch::D4 => 'd',
            Pitch::E4 => 'e',
            Pitch::F4 => 'f',
            Pitch::G4 => 'g',
            Pitch::A4 => 'a',
            Pitch::B4 => 'b',
            Pitch::C5 => 'C',
        }
    }

    /// Equal-tempered frequency rounded to whole hertz.
    #[must_use]
    pub const fn frequency_hz(self) -> u32 {
        match self {
            Pitch::C4 => 262,
            Pitch::D4 => 294,
            Pitch::E4 => 330,
            Pitch::F4 => 349,
            Pitch::G4 => 392,
            Pitch::A4 => 440,
            Pitch::B4 => 494,
            Pitch::C5 => 523,
        }
    }
}

/// Classification of one melody symbol.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum NoteSymbol {
    Rest,
    Pitch(Pitch),
    Unknown(char),
}

impl NoteSymbol {
    #[must_use]
    pub const fn classify(symbol: char) -> Self {
        if symbol == REST_SYMBOL {
            return NoteSymbol::Rest;
        }
        match Pitch::from_symbol(symbol) {
            Some(pitch) => NoteSymbol::Pitch(pitch),
            None => NoteSymbol::Unknown(symbol),
        }
    }
}

/// Named melodies shipped with the box.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MelodyKind {
    Greeting,
    PositiveCue,
    Celebration,
}

/// Immutable melody definition.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Melody {
    pub kind: MelodyKind,
    pub notes: &'static str,
    pub beats: &'static [u8],
    pub tempo: Duration,
}

impl Melody {
    #[must_use]
    pub const fn new(
        kind: MelodyKind,
        notes: &'static str,
        beats: &'static [u8],
        tempo: Duration,
    ) -> Self {
        Self {
            kind,
            notes,
            beats,
            tempo,
        }
    }

    /// Iterates the `(symbol, beats)` pairs in playback order.
    pub fn steps(&self) -> impl Iterator<Item = (NoteSymbol, u8)> + '_ {
        self.notes
            .chars()
            .map(NoteSymbol::classify)
            .zip(self.beats.iter().copied())
    }

    /// Wall-clock length of one playback.
    #[must_use]
    pub fn duration(&self) -> Duration {
        self.steps()
            .map(|(symbol, beats)| match symbol {
                NoteSymbol::Rest => self.tempo * u32::from(beats),
                NoteSymbol::Pitch(_) => self.tempo * u32::from(beats) / QUICK_DIVISOR + self.tempo,
                NoteSymbol::Unknown(_) => Duration::ZERO,
            })
            .sum()
    }
}

/// Returns the shipped melody for `kind`.
#[must_use]
pub const fn melody_for(kind: MelodyKind) -> Melody {
    match kind {
        MelodyKind::Greeting => GREETING_MELODY,
        MelodyKind::PositiveCue => POSITIVE_CUE_MELODY,
        MelodyKind::Celebration => CELEBRATION_MELODY,
    }
}

/// Square-wave output driving the piezo.
pub trait Buzzer {
    /// Starts a tone at `freq_hz` and keeps it going until the next call.
    fn play_tone(&mut self, freq_hz: u32);

    /// Stops any tone.
    fn silence(&mut self);
}

/// Buzzer that makes no sound.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoopBuzzer;

impl Buzzer for NoopBuzzer {
    fn play_tone(&mut self, _: u32) {}

    fn silence(&mut self) {}
}

/// Plays melodies on a [`Buzzer`], blocking on a [`Clock`].
pub struct TuneSequencer;

impl TuneSequencer {
    /// Plays `melody` once.
    pub fn play<B, C>(buzzer: &mut B, clock: &mut C, melody: &Melody)
    where
        B: Buzzer,
        C: Clock,
    {
        for (symbol, beats) in melody.steps() {
            let length = melody.tempo * u32::from(beats);
            match symbol {
                NoteSymbol::Rest => {
                    buzzer.silence();
                    clock.delay(length);
                }
                NoteSymbol::Pitch(pitch) => {
                    buzzer.play_tone(pitch.frequency_hz());
                    clock.delay(length / QUICK_DIVISOR);
                    buzzer.silence();
                    clock.delay(melody.tempo);
                }
                NoteSymbol::Unknown(_) => {}
            }
        }
        buzzer.silence();
    }

    /// Plays `melody` back to back `repeats` times.
    pub fn play_repeated<B, C>(buzzer: &mut B, clock: &mut C, melody: &Melody, repeats: u8)
    where
        B: Buzzer,
        C: Clock,
    {
        for _ in 0..repeats {
            Self::play(buzzer, clock, melody);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use heapless::Vec;

    #[derive(Copy, Clone, Debug, Eq, PartialEq)]
    enum Sound {
        Tone(u32),
        Silence,
        Wait(Duration),
    }

    #[derive(Default)]
    struct Recorder {
        sounds: Vec<Sound, 64>,
    }

    impl Recorder {
        fn push(&mut self, sound: Sound) {
            self.sounds.push(sound).expect("recorder full");
        }
    }

    impl Buzzer for Recorder {
        fn play_tone(&mut self, freq_hz: u32) {
            self.push(Sound::Tone(freq_hz));
        }

        fn silence(&mut self) {
            self.push(Sound::Silence);
        }
    }

    struct RecordingClock<'a> {
        now: Duration,
        log: &'a core::cell::RefCell<Recorder>,
    }

    impl Clock for RecordingClock<'_> {
        type Instant = Duration;

        fn now(&self) -> Duration {
            self.now
        }

        fn elapsed_since(&self, earlier: Duration) -> Duration {
            self.now.saturating_sub(earlier)
        }

        fn delay(&mut self, duration: Duration) {
            self.now += duration;
            self.log.borrow_mut().push(Sound::Wait(duration));
        }
    }

    struct SharedBuzzer<'a>(&'a core::cell::RefCell<Recorder>);

    impl Buzzer for SharedBuzzer<'_> {
        fn play_tone(&mut self, freq_hz: u32) {
            self.0.borrow_mut().play_tone(freq_hz);
        }

        fn silence(&mut self) {
            self.0.borrow_mut().silence();
        }
    }

    #[test]
    fn pitches_round_trip_through_symbols() {
        for symbol in "cdefgabC".chars() {
            let pitch = Pitch::from_symbol(symbol).expect("known symbol");
            assert_eq!(pitch.symbol(), symbol);
        }
        assert_eq!(Pitch::from_symbol('x'), None);
    }

    #[test]
    fn sequencer_emits_quick_tones_rests_and_final_silence() {
        const MELODY: Melody = Melody::new(
            MelodyKind::PositiveCue,
            "a x ",
            &[2, 1, 9, 1],
            Duration::from_millis(100),
        );
        let log = core::cell::RefCell::new(Recorder::default());
        let mut buzzer = SharedBuzzer(&log);
        let mut clock = RecordingClock {
            now: Duration::ZERO,
            log: &log,
        };

        TuneSequencer::play(&mut buzzer, &mut clock, &MELODY);

        let expected = [
            Sound::Tone(440),
            Sound::Wait(Duration::from_millis(100)),
            Sound::Silence,
            Sound::Wait(Duration::from_millis(100)),
            Sound::Silence,
            Sound::Wait(Duration::from_millis(100)),
            // 'x' is unknown and produces nothing.
            Sound::Silence,
            Sound::Wait(Duration::from_millis(100)),
            Sound::Silence,
        ];
        assert_eq!(log.borrow().sounds.as_slice(), &expected);
        assert_eq!(clock.now, MELODY.duration());
    }

    #[test]
    fn repeated_playback_multiplies_duration() {
        let log = core::cell::RefCell::new(Recorder::default());
        let mut buzzer = SharedBuzzer(&log);
        let mut clock = RecordingClock {
            now: Duration::ZERO,
            log: &log,
        };
        let cue = positive_cue_melody();

        TuneSequencer::play_repeated(&mut buzzer, &mut clock, &cue, 3);

        assert_eq!(clock.now, cue.duration() * 3);
    }

    #[test]
    fn shipped_melodies_have_one_beat_per_symbol() {
        for kind in [
            MelodyKind::Greeting,
            MelodyKind::PositiveCue,
            MelodyKind::Celebration,
        ] {
            let melody = melody_for(kind);
            assert_eq!(melody.kind, kind);
            assert_eq!(melody.notes.chars().count(), melody.beats.len());
            assert!(
                melody
                    .steps()
                    .all(|(symbol, _)| !matches!(symbol, NoteSymbol::Unknown(_)))
            );
        }
    }
}
