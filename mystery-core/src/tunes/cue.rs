//! Short two-note cue for "today is the day".

use core::time::Duration;

use super::{Melody, MelodyKind};

pub const POSITIVE_CUE_TEMPO: Duration = Duration::from_millis(100);

/// Number of times the cue plays when the unlock hour has not arrived yet.
pub const POSITIVE_CUE_REPEATS: u8 = 3;

pub const POSITIVE_CUE_MELODY: Melody =
    Melody::new(MelodyKind::PositiveCue, "gC", &[1, 2], POSITIVE_CUE_TEMPO);

#[must_use]
pub const fn positive_cue_melody() -> Melody {
    POSITIVE_CUE_MELODY
}
