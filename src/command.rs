//! Movement command table and argument helpers
//!
//! The set of commands is closed. Each entry records the argument shape the
//! command expects so the dispatcher knows how to read it:
//!
//! | Command    | Argument                   |
//! |------------|----------------------------|
//! | `WHEELS`   | `(fl,fr,rl,rr)` speeds     |
//! | `FORWARD`  | speed 0-255                |
//! | `BACKWARD` | speed 0-255                |
//! | `FULLSTOP` | none                       |
//! | `ROTATE`   | angle in degrees           |
//! | `LIGHTS`   | `(ON,OFF,ON,OFF)` pattern  |
//! | `DURATION` | milliseconds               |
//! | `DISTANCE` | centimetres                |
//!
//! Names are matched without regard to case.

use crate::wheel::NUM_WHEELS;

/// Shape of the argument a command takes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ArgumentKind {
    None,
    /// A single integer
    Scalar,
    /// A parenthesized, comma separated list of up to four values
    Tuple,
}

/// Movement commands understood by the dispatcher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CommandKind {
    Wheels,
    Forward,
    Backward,
    FullStop,
    Rotate,
    Lights,
    Duration,
    Distance,
}

/// Entry of the command table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandEntry {
    pub name: &'static str,
    pub kind: CommandKind,
    pub argument: ArgumentKind,
}

/// All commands, in the order they are documented
pub const COMMAND_TABLE: [CommandEntry; 8] = [
    CommandEntry::new("WHEELS", CommandKind::Wheels, ArgumentKind::Tuple),
    CommandEntry::new("FORWARD", CommandKind::Forward, ArgumentKind::Scalar),
    CommandEntry::new("BACKWARD", CommandKind::Backward, ArgumentKind::Scalar),
    CommandEntry::new("FULLSTOP", CommandKind::FullStop, ArgumentKind::None),
    CommandEntry::new("ROTATE", CommandKind::Rotate, ArgumentKind::Scalar),
    CommandEntry::new("LIGHTS", CommandKind::Lights, ArgumentKind::Tuple),
    CommandEntry::new("DURATION", CommandKind::Duration, ArgumentKind::Scalar),
    CommandEntry::new("DISTANCE", CommandKind::Distance, ArgumentKind::Scalar),
];

impl CommandEntry {
    const fn new(name: &'static str, kind: CommandKind, argument: ArgumentKind) -> Self {
        Self {
            name,
            kind,
            argument,
        }
    }
}

impl CommandKind {
    /// Looks up a command by name, ignoring case
    ///
    /// Only the name is checked; the argument is validated when the command runs.
    pub fn lookup(name: &str) -> Option<Self> {
        COMMAND_TABLE
            .iter()
            .find(|entry| entry.name.eq_ignore_ascii_case(name))
            .map(|entry| entry.kind)
    }

    pub fn entry(self) -> &'static CommandEntry {
        // The table holds the variants in declaration order
        &COMMAND_TABLE[self as usize]
    }

    pub fn name(self) -> &'static str {
        self.entry().name
    }

    pub fn argument(self) -> ArgumentKind {
        self.entry().argument
    }
}

/// Reads a leading integer the way the original controller firmware does
///
/// Leading whitespace and an optional sign are accepted, parsing stops at the
/// first non-digit, and text without digits reads as 0. Out of range values
/// saturate.
pub fn parse_int(text: &str) -> i32 {
    let text = text.trim_start();
    let (negative, digits) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };

    let mut value: i32 = 0;
    for digit in digits.bytes().take_while(u8::is_ascii_digit) {
        let digit = i32::from(digit - b'0');
        value = if negative {
            value.saturating_mul(10).saturating_sub(digit)
        } else {
            value.saturating_mul(10).saturating_add(digit)
        };
    }
    value
}

/// Items of a `(a,b,c,d)` argument
///
/// Returns `None` when the argument is not wrapped in parentheses. At most
/// [`NUM_WHEELS`] items are produced; `()` produces none.
pub fn tuple_items(argument: &str) -> Option<impl Iterator<Item = &str>> {
    let inner = argument.strip_prefix('(')?.strip_suffix(')')?;
    let count = if inner.is_empty() { 0 } else { NUM_WHEELS };
    Some(inner.split(',').take(count))
}
