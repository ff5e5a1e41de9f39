//! NMEA 0183 decoding for the positioning receiver.
//!
//! Only the `RMC` sentence is decoded: it carries status, position, UTC time
//! and date in one line, which is everything the unlock gates need. Other
//! sentence types are recognised and ignored. [`FixTracker`] sits between the
//! UART and the session driver, buffering raw bytes into lines and keeping the
//! latest [`PositionFix`].

use core::fmt;

use heapless::Vec;
use winnow::ModalResult;
use winnow::combinator::{opt, preceded};
use winnow::prelude::*;
use winnow::token::{one_of, take, take_till, take_while};

use crate::fix::PositionFix;

/// Longest sentence accepted, including `$`, checksum and line ending.
pub const MAX_SENTENCE_LEN: usize = 96;

/// Decoding failures for a single line.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum NmeaError {
    /// Line does not start with `$`.
    MissingStart,
    /// No `*hh` checksum suffix.
    MissingChecksum,
    /// Checksum digits are not hexadecimal.
    InvalidChecksum,
    /// Checksum does not match the sentence body.
    ChecksumMismatch { expected: u8, computed: u8 },
    /// Well-formed sentence of a type this decoder ignores.
    Unsupported,
    /// `RMC` sentence with a field that could not be parsed.
    Malformed,
    /// Line is not valid UTF-8.
    NotText,
}

impl fmt::Display for NmeaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NmeaError::MissingStart => f.write_str("sentence does not start with `$`"),
            NmeaError::MissingChecksum => f.write_str("sentence has no checksum"),
            NmeaError::InvalidChecksum => f.write_str("checksum is not hexadecimal"),
            NmeaError::ChecksumMismatch { expected, computed } => {
                write!(f, "checksum mismatch: expected {expected:02X}, computed {computed:02X}")
            }
            NmeaError::Unsupported => f.write_str("unsupported sentence type"),
            NmeaError::Malformed => f.write_str("malformed RMC sentence"),
            NmeaError::NotText => f.write_str("sentence is not valid text"),
        }
    }
}

/// Decoded `RMC` fields. Empty fields decode to `None`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RmcSentence {
    pub time: Option<(u8, u8, u8)>,
    /// `true` for status `A`, `false` for `V`.
    pub active: bool,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// `(day, month, two-digit year)`.
    pub date: Option<(u8, u8, u8)>,
}

impl RmcSentence {
    /// Builds the fix this sentence describes.
    #[must_use]
    pub fn to_fix(&self) -> PositionFix {
        let mut fix = PositionFix::empty();

        if let Some((hour, minute, second)) = self.time {
            fix.time_valid = true;
            fix.hour = hour;
            fix.minute = minute;
            fix.second = second;
        }

        if let Some((day, month, year)) = self.date {
            fix.date_valid = true;
            fix.day = day;
            fix.month = month;
            fix.year = 2000 + u16::from(year);
        }

        if let (true, Some(lat), Some(lon)) = (self.active, self.latitude, self.longitude) {
            fix.location_valid = true;
            fix.lat = lat;
            fix.lon = lon;
        }

        fix
    }
}

/// XOR of every byte between `$` and `*`.
#[must_use]
pub fn checksum(body: &str) -> u8 {
    body.bytes().fold(0, |acc, byte| acc ^ byte)
}

/// Decodes one NMEA line. Trailing `\r`/`\n` are ignored.
pub fn parse_sentence(line: &str) -> Result<RmcSentence, NmeaError> {
    let line = line.trim_end_matches(['\r', '\n']);
    let body = line.strip_prefix('$').ok_or(NmeaError::MissingStart)?;
    let (body, digits) = body.split_once('*').ok_or(NmeaError::MissingChecksum)?;

    let expected = digits
        .get(..2)
        .and_then(|digits| u8::from_str_radix(digits, 16).ok())
        .ok_or(NmeaError::InvalidChecksum)?;
    let computed = checksum(body);
    if expected != computed {
        return Err(NmeaError::ChecksumMismatch { expected, computed });
    }

    if body.get(2..5) != Some("RMC") {
        return Err(NmeaError::Unsupported);
    }

    let mut input = body;
    rmc.parse_next(&mut input).map_err(|_| NmeaError::Malformed)
}

fn rmc(input: &mut &str) -> ModalResult<RmcSentence> {
    let _talker = take(2usize).parse_next(input)?;
    "RMC".parse_next(input)?;
    let time = preceded(',', opt(hms)).parse_next(input)?;
    let status = preceded(',', opt(one_of(['A', 'V']))).parse_next(input)?;
    let latitude = preceded(',', opt(coordinate(2))).parse_next(input)?;
    let north_south = preceded(',', opt(one_of(['N', 'S']))).parse_next(input)?;
    let longitude = preceded(',', opt(coordinate(3))).parse_next(input)?;
    let east_west = preceded(',', opt(one_of(['E', 'W']))).parse_next(input)?;
    let _speed = preceded(',', skip_field).parse_next(input)?;
    let _course = preceded(',', skip_field).parse_next(input)?;
    let date = preceded(',', opt(dmy)).parse_next(input)?;
    // Magnetic variation and mode indicator are not needed.

    Ok(RmcSentence {
        time,
        active: status == Some('A'),
        latitude: signed(latitude, north_south, 'S'),
        longitude: signed(longitude, east_west, 'W'),
        date,
    })
}

fn signed(value: Option<f64>, hemisphere: Option<char>, negative: char) -> Option<f64> {
    match (value, hemisphere) {
        (Some(value), Some(side)) if side == negative => Some(-value),
        (Some(value), Some(_)) => Some(value),
        _ => None,
    }
}

fn two_digits(input: &mut &str) -> ModalResult<u8> {
    take_while(2, '0'..='9').parse_to().parse_next(input)
}

fn hms(input: &mut &str) -> ModalResult<(u8, u8, u8)> {
    let time = (two_digits, two_digits, two_digits).parse_next(input)?;
    let _fraction = opt(('.', take_while(0.., '0'..='9'))).parse_next(input)?;
    Ok(time)
}

fn dmy(input: &mut &str) -> ModalResult<(u8, u8, u8)> {
    (two_digits, two_digits, two_digits).parse_next(input)
}

/// `ddmm.mmmm` (latitude) or `dddmm.mmmm` (longitude) to decimal degrees.
fn coordinate<'s>(degree_digits: usize) -> impl FnMut(&mut &'s str) -> ModalResult<f64> {
    move |input: &mut &'s str| {
        let degrees: u16 = take_while(degree_digits, '0'..='9')
            .parse_to()
            .parse_next(input)?;
        let minutes: f64 = take_while(1.., ('0'..='9', '.'))
            .parse_to()
            .parse_next(input)?;
        Ok(f64::from(degrees) + minutes / 60.0)
    }
}

fn skip_field<'s>(input: &mut &'s str) -> ModalResult<&'s str> {
    take_till(0.., ',').parse_next(input)
}

/// Line assembler and latest-fix holder fed from the receiver UART.
#[derive(Clone)]
pub struct FixTracker {
    line: Vec<u8, MAX_SENTENCE_LEN>,
    overflowed: bool,
    fix: PositionFix,
    sentences: u32,
    failures: u32,
}

impl FixTracker {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            line: Vec::new(),
            overflowed: false,
            fix: PositionFix::empty(),
            sentences: 0,
            failures: 0,
        }
    }

    /// Latest fix decoded from an `RMC` sentence.
    #[must_use]
    pub const fn fix(&self) -> PositionFix {
        self.fix
    }

    /// Number of `RMC` sentences applied.
    #[must_use]
    pub const fn sentences(&self) -> u32 {
        self.sentences
    }

    /// Number of lines rejected for checksum or format errors.
    #[must_use]
    pub const fn failures(&self) -> u32 {
        self.failures
    }

    /// Feeds raw receiver bytes.
    pub fn feed(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            // Per-line errors are already counted in `failures`.
            let _ = self.push_byte(byte);
        }
    }

    /// Feeds a single byte. Returns the decode result whenever a line ends.
    pub fn push_byte(&mut self, byte: u8) -> Option<Result<RmcSentence, NmeaError>> {
        match byte {
            b'$' => {
                self.line.clear();
                self.overflowed = false;
                // Capacity is at least one, so the start marker always fits.
                let _ = self.line.push(byte);
                None
            }
            b'\n' | b'\r' => {
                if self.line.is_empty() {
                    return None;
                }
                let result = if self.overflowed {
                    self.failures = self.failures.saturating_add(1);
                    Err(NmeaError::Malformed)
                } else {
                    self.decode_line()
                };
                self.line.clear();
                self.overflowed = false;
                Some(result)
            }
            _ => {
                if self.line.is_empty() || self.overflowed {
                    return None;
                }
                if self.line.push(byte).is_err() {
                    self.overflowed = true;
                }
                None
            }
        }
    }

    fn decode_line(&mut self) -> Result<RmcSentence, NmeaError> {
        let result = core::str::from_utf8(&self.line)
            .map_err(|_| NmeaError::NotText)
            .and_then(parse_sentence);
        match result {
            Ok(sentence) => {
                self.fix = sentence.to_fix();
                self.sentences = self.sentences.saturating_add(1);
            }
            Err(NmeaError::Unsupported) => {}
            Err(_) => self.failures = self.failures.saturating_add(1),
        }
        result
    }
}

impl Default for FixTracker {
    fn default() -> Self {
        Self::new()
    }
}
