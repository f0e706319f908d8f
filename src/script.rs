//! Movement script parsing
//!
//! A movement script is plain text where commands are grouped in blocks:
//!
//! ```text
//! <MOVEMENT>
//! WHEELS=(100,100,100,100)
//! DURATION=1000
//! FULLSTOP
//! </MOVEMENT>
//! ```
//!
//! Lines outside a block are ignored. Inside a block every line is one command,
//! either a bare name or `NAME=ARGUMENT`. A block holds at most
//! [`MAX_BLOCK_LINES`] commands; a longer block, or one cut off by the end of
//! the script, is dropped as a whole.

use heapless::{String, Vec};
use thiserror::Error;

/// Line opening a movement block
pub const START_MARKER: &str = "<MOVEMENT>";
/// Line closing a movement block
pub const END_MARKER: &str = "</MOVEMENT>";
/// Maximum number of command lines in one block
pub const MAX_BLOCK_LINES: usize = 10;
/// Maximum length of a command line once spaces are removed
pub const LINE_CAPACITY: usize = 64;

/// One command line with spaces removed
pub type CommandLine = String<LINE_CAPACITY>;

/// Command lines of one complete block, end marker excluded
pub type MovementBlock = Vec<CommandLine, MAX_BLOCK_LINES>;

/// Reasons a block is dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ScriptError {
    #[error("movement block longer than 10 lines")]
    BlockOverflow,
    #[error("command line longer than 64 characters")]
    LineTooLong,
    #[error("script ended inside a movement block")]
    UnterminatedBlock,
}

/// Parser state
#[derive(Debug)]
enum State {
    /// Waiting for a start marker
    Seeking,
    /// Collecting the lines of a block
    InBlock(MovementBlock),
}

/// Line-by-line block parser
///
/// Feed it the script one line at a time. It can be [`reset`](Self::reset) at
/// any point, which is how a replay restarts from a clean state.
#[derive(Debug)]
pub struct ScriptParser {
    state: State,
}

impl ScriptParser {
    pub const fn new() -> Self {
        Self {
            state: State::Seeking,
        }
    }

    /// Drops any partially collected block
    pub fn reset(&mut self) {
        self.state = State::Seeking;
    }

    pub fn is_seeking(&self) -> bool {
        matches!(self.state, State::Seeking)
    }

    /// Processes one script line
    ///
    /// Returns the finished block when `line` is the end marker. An error means
    /// the block being collected was discarded; the parser is back to seeking.
    pub fn feed(&mut self, line: &str) -> Result<Option<MovementBlock>, ScriptError> {
        let block = match &mut self.state {
            State::Seeking => {
                if line.trim() == START_MARKER {
                    self.state = State::InBlock(Vec::new());
                }
                return Ok(None);
            }
            State::InBlock(block) => block,
        };

        let compact = match compact(line) {
            Some(compact) => compact,
            None => {
                self.state = State::Seeking;
                return Err(ScriptError::LineTooLong);
            }
        };

        if compact == END_MARKER {
            let block = core::mem::take(block);
            self.state = State::Seeking;
            return Ok(Some(block));
        }

        if let Err(compact) = block.push(compact) {
            // The overflowing line is looked at again as if seeking
            self.state = if compact == START_MARKER {
                State::InBlock(Vec::new())
            } else {
                State::Seeking
            };
            return Err(ScriptError::BlockOverflow);
        }

        Ok(None)
    }

    /// Signals the end of the script
    ///
    /// A block still being collected is discarded.
    pub fn finish(&mut self) -> Result<(), ScriptError> {
        let unterminated = !self.is_seeking();
        self.reset();
        if unterminated {
            Err(ScriptError::UnterminatedBlock)
        } else {
            Ok(())
        }
    }
}

impl Default for ScriptParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Trims `line` and removes every space character
fn compact(line: &str) -> Option<CommandLine> {
    let mut compact = CommandLine::new();
    for c in line.trim().chars().filter(|&c| c != ' ') {
        compact.push(c).ok()?;
    }
    Some(compact)
}

/// Splits a command line into name and argument at the first `=`
///
/// Lines without `=` are bare commands with an empty argument. Further `=`
/// characters stay in the argument.
pub fn split_command(line: &str) -> (&str, &str) {
    line.split_once('=').unwrap_or((line, ""))
}
