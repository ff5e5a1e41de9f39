//! Holder-facing messages.
//!
//! The state machine only names a [`Message`]; rendering to text happens at
//! the presenter boundary so the wording can change without touching the
//! decision logic.

use core::fmt::{self, Write as _};

use heapless::String;

/// Size of the text buffer handed to presenters.
pub const MESSAGE_CAPACITY: usize = 80;

/// Rendered message text.
pub type MessageText = String<MESSAGE_CAPACITY>;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Message {
    /// No usable fix yet; the receiver needs open sky.
    TakeOutside,
    /// Unlock day has not arrived.
    TryTomorrow,
    /// Unlock day, but before the unlock hour.
    TodayIsTheDay,
    /// Budget exhausted.
    NoAttemptsLeft,
    /// Distance to the target in whole meters.
    Distance { meters: u32 },
    /// Attempts remaining after a reading.
    AttemptsLeft { count: u16 },
    /// The reset button restored the budget.
    AttemptsReset { count: u16 },
    /// Countdown digit shown before the latch opens.
    Countdown { value: u8 },
    /// Post-session clock readout.
    Hour { hour: u8 },
}

impl Message {
    /// Renders the message into a fixed-capacity buffer, truncating on overflow.
    #[must_use]
    pub fn render(&self) -> MessageText {
        let mut text = MessageText::new();
        // Overflow only truncates; every message fits the buffer.
        let _ = write!(text, "{self}");
        text
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Message::TakeOutside => f.write_str("Take the mystery box outside!"),
            Message::TryTomorrow => f.write_str("Not yet today, try again tomorrow!"),
            Message::TodayIsTheDay => f.write_str("Today is the day, take me with you!"),
            Message::NoAttemptsLeft => f.write_str("No attempts left, ask for help!"),
            Message::Distance { meters } => {
                write!(f, "The distance to the target is {meters} meters!")
            }
            Message::AttemptsLeft { count: 1 } => f.write_str("1 attempt left."),
            Message::AttemptsLeft { count } => write!(f, "{count} attempts left."),
            Message::AttemptsReset { count } => write!(f, "Attempts reset to {count}."),
            Message::Countdown { value } => write!(f, "{value}"),
            Message::Hour { hour } => write!(f, "hour: {hour}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_message_includes_meters() {
        let text = Message::Distance { meters: 12_345 }.render();
        assert_eq!(text.as_str(), "The distance to the target is 12345 meters!");
    }

    #[test]
    fn attempts_left_uses_singular_for_one() {
        assert_eq!(
            Message::AttemptsLeft { count: 1 }.render().as_str(),
            "1 attempt left."
        );
        assert_eq!(
            Message::AttemptsLeft { count: 4 }.render().as_str(),
            "4 attempts left."
        );
    }

    #[test]
    fn hour_readout_matches_diagnostic_format() {
        assert_eq!(Message::Hour { hour: 7 }.render().as_str(), "hour: 7");
    }
}
