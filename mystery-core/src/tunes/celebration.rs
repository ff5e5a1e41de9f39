//! Tune played after the latch opens.

use core::time::Duration;

use super::{Melody, MelodyKind};

pub const CELEBRATION_TEMPO: Duration = Duration::from_millis(300);

const CELEBRATION_BEATS: [u8; 15] = [1, 1, 1, 1, 1, 1, 2, 1, 1, 1, 1, 1, 1, 2, 4];

pub const CELEBRATION_MELODY: Melody = Melody::new(
    MelodyKind::Celebration,
    "ccggaag ffeeddc",
    &CELEBRATION_BEATS,
    CELEBRATION_TEMPO,
);

#[must_use]
pub const fn celebration_melody() -> Melody {
    CELEBRATION_MELODY
}
