//! Rising arpeggio played when a session starts.

use core::time::Duration;

use super::{Melody, MelodyKind};

pub const GREETING_TEMPO: Duration = Duration::from_millis(150);

pub const GREETING_MELODY: Melody =
    Melody::new(MelodyKind::Greeting, "cegC", &[1, 1, 1, 2], GREETING_TEMPO);

#[must_use]
pub const fn greeting_melody() -> Melody {
    GREETING_MELODY
}
