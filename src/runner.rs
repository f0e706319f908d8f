//! Movement script replay
//!
//! [`ScriptRunner::run`] replays a script a configured number of times while
//! the chassis is in automatic mode. The mode is checked before every cycle
//! and before every script line; a block that has been read completely is
//! always executed to its end. Each cycle starts with a freshly reset parser
//! and a rewound script, so an interrupted cycle leaves nothing behind.

use embedded_hal_async::delay::DelayNs;

use crate::dispatch::{Actuator, CommandDispatcher};
use crate::fmt::Debug2Format;
use crate::mode::ModeSwitch;
use crate::script::{split_command, MovementBlock, ScriptParser};

/// Upper bound for the number of replays
pub const MAX_RUN_CYCLES: u32 = 1000;

/// Line-oriented script storage
pub trait ScriptSource {
    type Error: core::fmt::Debug;

    /// Goes back to the first line
    fn rewind(&mut self) -> Result<(), Self::Error>;

    /// Next line without its line ending, `None` at the end of the script
    fn next_line(&mut self) -> Result<Option<&str>, Self::Error>;
}

/// Script held in memory
#[derive(Debug, Clone)]
pub struct TextScript<'a> {
    text: &'a str,
    rest: &'a str,
}

impl<'a> TextScript<'a> {
    pub const fn new(text: &'a str) -> Self {
        Self { text, rest: text }
    }
}

impl ScriptSource for TextScript<'_> {
    type Error = core::convert::Infallible;

    fn rewind(&mut self) -> Result<(), Self::Error> {
        self.rest = self.text;
        Ok(())
    }

    fn next_line(&mut self) -> Result<Option<&str>, Self::Error> {
        if self.rest.is_empty() {
            return Ok(None);
        }
        let (line, rest) = self.rest.split_once('\n').unwrap_or((self.rest, ""));
        self.rest = rest;
        Ok(Some(line.strip_suffix('\r').unwrap_or(line)))
    }
}

/// What a call to [`ScriptRunner::run`] did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RunSummary {
    /// Cycles that reached the end of the script
    pub cycles_completed: u32,
    /// Complete blocks handed to the dispatcher
    pub blocks_executed: u32,
    pub commands_executed: u32,
    /// Unknown commands, malformed arguments and actuator failures
    pub commands_rejected: u32,
    /// Blocks dropped for being too long, having an overlong line or missing their end marker
    pub blocks_discarded: u32,
    /// A switch to manual mode stopped the replay early
    pub interrupted: bool,
}

/// Replays a movement script
#[derive(Debug)]
pub struct ScriptRunner {
    cycles: u32,
    parser: ScriptParser,
}

impl ScriptRunner {
    /// Creates a runner for `cycles` replays, capped at [`MAX_RUN_CYCLES`]
    pub fn new(cycles: u32) -> Self {
        Self {
            cycles: cycles.min(MAX_RUN_CYCLES),
            parser: ScriptParser::new(),
        }
    }

    pub fn cycles(&self) -> u32 {
        self.cycles
    }

    pub fn set_cycles(&mut self, cycles: u32) {
        self.cycles = cycles.min(MAX_RUN_CYCLES);
    }

    /// Replays `source` until all cycles are done or `mode` turns manual
    ///
    /// Errors never stop the replay: they are logged, counted in the summary
    /// and the next line, command or cycle is processed. A script that cannot
    /// be read yields no commands for that cycle.
    pub async fn run<S, M, A, D>(
        &mut self,
        source: &mut S,
        mode: &M,
        dispatcher: &mut CommandDispatcher<'_, A, D>,
    ) -> RunSummary
    where
        S: ScriptSource,
        M: ModeSwitch,
        A: Actuator,
        D: DelayNs,
    {
        let mut summary = RunSummary::default();

        while summary.cycles_completed < self.cycles {
            if mode.is_manual() {
                summary.interrupted = true;
                break;
            }
            info!("START CYCLE {}", summary.cycles_completed);

            if !self.run_cycle(source, mode, dispatcher, &mut summary).await {
                summary.interrupted = true;
                break;
            }

            info!("END CYCLE");
            summary.cycles_completed += 1;
        }

        self.parser.reset();
        debug!("Replay finished: {:?}", summary);
        summary
    }

    /// Runs one pass over the script, returning false when the mode turned manual
    async fn run_cycle<S, M, A, D>(
        &mut self,
        source: &mut S,
        mode: &M,
        dispatcher: &mut CommandDispatcher<'_, A, D>,
        summary: &mut RunSummary,
    ) -> bool
    where
        S: ScriptSource,
        M: ModeSwitch,
        A: Actuator,
        D: DelayNs,
    {
        self.parser.reset();
        if let Err(e) = source.rewind() {
            warn!("Cannot rewind movement script: {:?}", Debug2Format(&e));
            return true;
        }

        loop {
            if mode.is_manual() {
                info!("Manual mode requested, stopping replay");
                return false;
            }

            let block = match source.next_line() {
                Ok(Some(line)) => self.parser.feed(line),
                Ok(None) => break,
                Err(e) => {
                    warn!("Cannot read movement script: {:?}", Debug2Format(&e));
                    break;
                }
            };

            match block {
                Ok(Some(block)) => execute_block(&block, dispatcher, summary).await,
                Ok(None) => {}
                Err(e) => {
                    warn!("Movement block discarded: {}", e);
                    summary.blocks_discarded += 1;
                }
            }
        }

        if let Err(e) = self.parser.finish() {
            warn!("Movement block discarded: {}", e);
            summary.blocks_discarded += 1;
        }
        true
    }
}

async fn execute_block<A, D>(
    block: &MovementBlock,
    dispatcher: &mut CommandDispatcher<'_, A, D>,
    summary: &mut RunSummary,
) where
    A: Actuator,
    D: DelayNs,
{
    summary.blocks_executed += 1;
    for line in block {
        let (name, argument) = split_command(line);
        match dispatcher.execute(name, argument).await {
            Ok(_) => summary.commands_executed += 1,
            Err(e) => {
                warn!("Invalid command string {}: {:?}", line.as_str(), Debug2Format(&e));
                summary.commands_rejected += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::tests::{dispatcher, Call};
    use crate::mode::{ModeFlag, OperationMode};
    use crate::odometry::OdometryAccumulator;
    use core::cell::Cell;
    use embassy_futures::block_on;

    const SCRIPT: &str = "\
<MOVEMENT>
FORWARD=100
DURATION=20
</MOVEMENT>
";

    /// Turns manual after a number of checks
    struct CountdownMode(Cell<u32>);

    impl ModeSwitch for CountdownMode {
        fn is_manual(&self) -> bool {
            let left = self.0.get();
            if left == 0 {
                return true;
            }
            self.0.set(left - 1);
            false
        }
    }

    #[test]
    fn text_script_lines() {
        let mut script = TextScript::new("a\r\nb\n\nc");
        let mut lines = std::vec::Vec::new();
        while let Some(line) = script.next_line().unwrap() {
            lines.push(std::string::String::from(line));
        }
        assert_eq!(lines, ["a", "b", "", "c"]);

        script.rewind().unwrap();
        assert_eq!(script.next_line().unwrap(), Some("a"));
    }

    #[test]
    fn cycles_are_capped() {
        assert_eq!(ScriptRunner::new(5000).cycles(), MAX_RUN_CYCLES);
        assert_eq!(ScriptRunner::new(0).cycles(), 0);
    }

    #[test]
    fn replays_script_for_each_cycle() {
        let odometry = OdometryAccumulator::default();
        let (mut dispatcher, log) = dispatcher(&odometry, 0, false);
        let mode = ModeFlag::new(OperationMode::Automatic);
        let mut runner = ScriptRunner::new(3);

        let summary = block_on(runner.run(&mut TextScript::new(SCRIPT), &mode, &mut dispatcher));

        assert_eq!(summary.cycles_completed, 3);
        assert_eq!(summary.blocks_executed, 3);
        assert_eq!(summary.commands_executed, 6);
        assert!(!summary.interrupted);
        let moves = log
            .borrow()
            .iter()
            .filter(|c| **c == Call::Move([100; 4]))
            .count();
        assert_eq!(moves, 3);
    }

    #[test]
    fn manual_mode_prevents_replay() {
        let odometry = OdometryAccumulator::default();
        let (mut dispatcher, log) = dispatcher(&odometry, 0, false);
        let mode = ModeFlag::new(OperationMode::Manual);

        let summary = block_on(ScriptRunner::new(10).run(
            &mut TextScript::new(SCRIPT),
            &mode,
            &mut dispatcher,
        ));

        assert_eq!(summary.cycles_completed, 0);
        assert!(summary.interrupted);
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn manual_mode_mid_block_drops_partial_block() {
        let odometry = OdometryAccumulator::default();
        let (mut dispatcher, log) = dispatcher(&odometry, 0, false);
        // Cycle check, then the start marker and one command line
        let mode = CountdownMode(Cell::new(3));
        let mut runner = ScriptRunner::new(10);

        let summary = block_on(runner.run(&mut TextScript::new(SCRIPT), &mode, &mut dispatcher));

        assert!(summary.interrupted);
        assert_eq!(summary.cycles_completed, 0);
        assert_eq!(summary.blocks_executed, 0);
        assert!(log.borrow().is_empty());

        // A new replay starts from a clean parser
        let mode = ModeFlag::new(OperationMode::Automatic);
        runner.set_cycles(1);
        let summary = block_on(runner.run(&mut TextScript::new(SCRIPT), &mode, &mut dispatcher));
        assert_eq!(summary.blocks_executed, 1);
        assert_eq!(summary.commands_executed, 2);
    }

    #[test]
    fn invalid_commands_are_skipped() {
        let script = "<MOVEMENT>\nJUMP=3\nWHEELS=1,2,3,4\nforward=10\n</MOVEMENT>\n";
        let odometry = OdometryAccumulator::default();
        let (mut dispatcher, log) = dispatcher(&odometry, 0, false);
        let mode = ModeFlag::new(OperationMode::Automatic);

        let summary = block_on(ScriptRunner::new(1).run(
            &mut TextScript::new(script),
            &mode,
            &mut dispatcher,
        ));

        assert_eq!(summary.commands_rejected, 2);
        assert_eq!(summary.commands_executed, 1);
        assert_eq!(*log.borrow(), [Call::Move([10; 4])]);
    }

    #[test]
    fn broken_blocks_are_counted() {
        let mut script = std::string::String::from("<MOVEMENT>\n");
        for _ in 0..11 {
            script.push_str("FULLSTOP\n");
        }
        script.push_str("</MOVEMENT>\n<MOVEMENT>\nFORWARD=1\n");
        let odometry = OdometryAccumulator::default();
        let (mut dispatcher, log) = dispatcher(&odometry, 0, false);
        let mode = ModeFlag::new(OperationMode::Automatic);

        let summary = block_on(ScriptRunner::new(1).run(
            &mut TextScript::new(&script),
            &mode,
            &mut dispatcher,
        ));

        assert_eq!(summary.blocks_discarded, 2);
        assert_eq!(summary.blocks_executed, 0);
        assert!(log.borrow().is_empty());
    }

    struct BrokenSource;

    impl ScriptSource for BrokenSource {
        type Error = &'static str;

        fn rewind(&mut self) -> Result<(), Self::Error> {
            Err("no card")
        }

        fn next_line(&mut self) -> Result<Option<&str>, Self::Error> {
            Err("no card")
        }
    }

    #[test]
    fn unreadable_script_runs_empty_cycles() {
        let odometry = OdometryAccumulator::default();
        let (mut dispatcher, log) = dispatcher(&odometry, 0, false);
        let mode = ModeFlag::new(OperationMode::Automatic);

        let summary = block_on(ScriptRunner::new(2).run(&mut BrokenSource, &mode, &mut dispatcher));

        assert_eq!(summary.cycles_completed, 2);
        assert_eq!(summary.commands_executed, 0);
        assert!(log.borrow().is_empty());
    }
}
