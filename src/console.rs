//! Serial console commands
//!
//! Lines arriving on the serial link are either console commands or movement
//! commands. Spaces are removed, the line is upper-cased and split at the
//! first `=`:
//!
//! - `AUTO` / `MANUAL` switch the operation mode
//! - `LIGHTSSTATUS` answers with the light pattern, e.g. `1010`
//! - `SPEEDSTATUS` answers with the wheel speeds, e.g. `(100,100,0,0)`
//! - `LED` answers with a liveness reply
//! - anything else goes to the movement dispatcher
//!
//! Parsing ([`ConsoleRequest::parse`]) is separate from execution
//! ([`Console::handle`]) so the mode can be switched right where the line is
//! received, even while a script is being replayed elsewhere.

use embedded_hal_async::delay::DelayNs;
use heapless::String;
use thiserror::Error;

use crate::chassis::{Chassis, LightsStatus, SpeedStatus, WheelDrive};
use crate::command::CommandKind;
use crate::dispatch::{Actuator, CommandDispatcher, CommandError};
use crate::mode::{ModeFlag, OperationMode};
use crate::script::{split_command, LINE_CAPACITY};

/// Reply to the `LED` ping
pub const LIVENESS_REPLY: &str = "ALIVE";

/// Normalized console line
pub type ConsoleLine = String<LINE_CAPACITY>;

/// Actuator that can describe its state
pub trait StatusReport {
    fn wheel_speed_status(&self) -> SpeedStatus;
    fn lights_status(&self) -> LightsStatus;
}

impl<W, L> StatusReport for Chassis<W, L>
where
    W: WheelDrive,
    L: embedded_hal::digital::OutputPin,
{
    fn wheel_speed_status(&self) -> SpeedStatus {
        Chassis::wheel_speed_status(self)
    }

    fn lights_status(&self) -> LightsStatus {
        Chassis::lights_status(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConsoleError {
    #[error("console line longer than 64 characters")]
    LineTooLong,
}

/// One parsed console line
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConsoleRequest {
    SetMode(OperationMode),
    LightsStatus,
    SpeedStatus,
    Ping,
    /// A movement command as `NAME` or `NAME=ARGUMENT`
    Movement(ConsoleLine),
}

impl ConsoleRequest {
    /// Parses a received line, `None` for a blank line
    pub fn parse(line: &str) -> Result<Option<Self>, ConsoleError> {
        let mut normalized = ConsoleLine::new();
        for c in line.trim().chars().filter(|&c| c != ' ') {
            normalized
                .push(c.to_ascii_uppercase())
                .map_err(|_| ConsoleError::LineTooLong)?;
        }
        if normalized.is_empty() {
            return Ok(None);
        }

        let (name, _) = split_command(&normalized);
        let request = match name {
            "AUTO" => Self::SetMode(OperationMode::Automatic),
            "MANUAL" => Self::SetMode(OperationMode::Manual),
            "LIGHTSSTATUS" => Self::LightsStatus,
            "SPEEDSTATUS" => Self::SpeedStatus,
            "LED" => Self::Ping,
            _ => Self::Movement(normalized),
        };
        Ok(Some(request))
    }
}

/// Answer to a console request
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Reply {
    Speed(SpeedStatus),
    Lights(LightsStatus),
    Alive,
    Mode(OperationMode),
    Executed(CommandKind),
}

impl Reply {
    /// Text sent back over the link
    pub fn text(&self) -> &str {
        match self {
            Reply::Speed(status) => status.as_str(),
            Reply::Lights(status) => status.as_str(),
            Reply::Alive => LIVENESS_REPLY,
            Reply::Mode(OperationMode::Automatic) => "AUTO",
            Reply::Mode(OperationMode::Manual) => "MANUAL",
            Reply::Executed(kind) => kind.name(),
        }
    }
}

/// Executes console requests
pub struct Console<'m> {
    mode: &'m ModeFlag,
}

impl<'m> Console<'m> {
    pub const fn new(mode: &'m ModeFlag) -> Self {
        Self { mode }
    }

    /// Applies a mode change right away
    pub fn switch_mode(&self, mode: OperationMode) -> Reply {
        if self.mode.set(mode) != mode {
            info!("Switching to {:?} mode", mode);
        }
        Reply::Mode(mode)
    }

    pub async fn handle<A, D>(
        &self,
        request: ConsoleRequest,
        dispatcher: &mut CommandDispatcher<'_, A, D>,
    ) -> Result<Reply, CommandError<A::Error>>
    where
        A: Actuator + StatusReport,
        D: DelayNs,
    {
        match request {
            ConsoleRequest::SetMode(mode) => Ok(self.switch_mode(mode)),
            ConsoleRequest::LightsStatus => {
                Ok(Reply::Lights(dispatcher.actuator().lights_status()))
            }
            ConsoleRequest::SpeedStatus => {
                Ok(Reply::Speed(dispatcher.actuator().wheel_speed_status()))
            }
            ConsoleRequest::Ping => Ok(Reply::Alive),
            ConsoleRequest::Movement(line) => {
                let (name, argument) = split_command(&line);
                dispatcher.execute(name, argument).await.map(Reply::Executed)
            }
        }
    }
}
