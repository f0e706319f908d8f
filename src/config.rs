//! Chassis settings from a `KEY=VALUE;` text file
//!
//! The settings file (`CONF.TXT`) is a list of entries separated by `;`.
//! Spaces are ignored and keys are upper case:
//!
//! ```text
//! LIGHTS=ON;
//! LIGHTS_OVERRIDE=OFF;
//! LIGHT_PINS={42,43,44,45};
//! WHEEL_PINS={{4,31,32},{5,24,30},{6,38,39},{7,27,28}};
//! BLE_PINS={10,11,9};
//! CYCLE=3;
//! MOVEMENTS=COMMANDS/GUIDE.TXT;
//! ```
//!
//! A bad entry is reported and skipped; the remaining entries still apply.

use core::fmt::Write;

use heapless::String;
use thiserror::Error;

use crate::runner::MAX_RUN_CYCLES;
use crate::wheel::NUM_WHEELS;

/// Pins per wheel: speed, forward, backward
pub const NUM_WHEEL_PINS: usize = 3;
/// Serial link pins: rx, tx, key
pub const NUM_BLE_PINS: usize = 3;

pub const DEFAULT_CONFIG_FILE: &str = "CONF.TXT";
pub const DEFAULT_COMMAND_FILE: &str = "COMMANDS/GUIDE.TXT";

/// Longest accepted command file path
pub const PATH_CAPACITY: usize = 64;

pub type PathString = String<PATH_CAPACITY>;

/// One rendered line of [`Config::dump`]
pub type DumpLine = String<80>;

/// Shape of a setting's value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ValueKind {
    /// `ON` enables, anything else disables
    Switch,
    /// A plain integer
    Integer,
    /// `{a,b,...}` with this many integers, inner braces ignored
    Array(usize),
    /// A file path
    Path,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigKey {
    Lights,
    LightsOverride,
    LightPins,
    WheelPins,
    BlePins,
    Cycle,
    Movements,
}

const KEY_TABLE: [(&str, ConfigKey, ValueKind); 7] = [
    ("LIGHTS", ConfigKey::Lights, ValueKind::Switch),
    ("LIGHTS_OVERRIDE", ConfigKey::LightsOverride, ValueKind::Switch),
    ("LIGHT_PINS", ConfigKey::LightPins, ValueKind::Array(NUM_WHEELS)),
    (
        "WHEEL_PINS",
        ConfigKey::WheelPins,
        ValueKind::Array(NUM_WHEELS * NUM_WHEEL_PINS),
    ),
    ("BLE_PINS", ConfigKey::BlePins, ValueKind::Array(NUM_BLE_PINS)),
    ("CYCLE", ConfigKey::Cycle, ValueKind::Integer),
    ("MOVEMENTS", ConfigKey::Movements, ValueKind::Path),
];

impl ConfigKey {
    pub fn lookup(name: &str) -> Option<Self> {
        KEY_TABLE
            .iter()
            .find(|(key, _, _)| *key == name)
            .map(|&(_, key, _)| key)
    }

    pub fn name(self) -> &'static str {
        KEY_TABLE[self as usize].0
    }

    pub fn value_kind(self) -> ValueKind {
        KEY_TABLE[self as usize].2
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    #[error("config item not found in the conf items list")]
    UnknownKey,
    #[error("{0:?} value is not a valid array")]
    MalformedArray(ConfigKey),
    #[error("config entry is not KEY=VALUE")]
    MalformedEntry,
    #[error("{0:?} value is not a valid number")]
    InvalidNumber(ConfigKey),
    #[error("{0:?} value is too long")]
    ValueTooLong(ConfigKey),
}

/// Chassis settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub lights_enabled: bool,
    pub light_override: bool,
    /// Light outputs in wheel order
    pub light_pins: [u8; NUM_WHEELS],
    /// Speed, forward and backward pin of each wheel
    pub wheel_pins: [[u8; NUM_WHEEL_PINS]; NUM_WHEELS],
    pub ble_pins: [u8; NUM_BLE_PINS],
    /// Script replays, within `0..=MAX_RUN_CYCLES`
    pub run_cycles: u32,
    /// Movement script to replay
    pub movements: PathString,
}

impl Default for Config {
    fn default() -> Self {
        let mut movements = PathString::new();
        let _ = movements.push_str(DEFAULT_COMMAND_FILE);
        Self {
            lights_enabled: true,
            light_override: false,
            light_pins: [42, 43, 44, 45],
            wheel_pins: [[4, 31, 32], [5, 24, 30], [6, 38, 39], [7, 27, 28]],
            ble_pins: [10, 11, 9],
            run_cycles: MAX_RUN_CYCLES,
            movements,
        }
    }
}

impl Config {
    /// Reads a settings file over the defaults
    ///
    /// Returns the settings and the number of entries that were rejected.
    pub fn parse(text: &str) -> (Self, usize) {
        let mut config = Self::default();
        let rejected = config.apply(text);
        (config, rejected)
    }

    /// Applies every entry of `text`, returning how many were rejected
    pub fn apply(&mut self, text: &str) -> usize {
        let mut rejected = 0;
        for entry in text.split(';') {
            match self.apply_entry(entry) {
                Ok(Some(key)) => debug!("Config {} set", key.name()),
                Ok(None) => {}
                Err(e) => {
                    warn!("Config entry rejected: {}", e);
                    rejected += 1;
                }
            }
        }
        rejected
    }

    /// Applies a single `KEY=VALUE` entry
    ///
    /// Blank entries are skipped and yield `Ok(None)`. A rejected entry leaves
    /// the settings untouched.
    pub fn apply_entry(&mut self, entry: &str) -> Result<Option<ConfigKey>, ConfigError> {
        let mut compact = String::<128>::new();
        for c in entry.chars().filter(|c| !c.is_whitespace()) {
            compact.push(c).map_err(|_| ConfigError::MalformedEntry)?;
        }
        if compact.is_empty() {
            return Ok(None);
        }

        let (name, value) = compact.split_once('=').ok_or(ConfigError::MalformedEntry)?;
        let key = ConfigKey::lookup(name).ok_or(ConfigError::UnknownKey)?;

        match key {
            ConfigKey::Lights => self.lights_enabled = value == "ON",
            ConfigKey::LightsOverride => self.light_override = value == "ON",
            ConfigKey::LightPins => self.light_pins = parse_array(key, value)?,
            ConfigKey::WheelPins => {
                let flat: [u8; NUM_WHEELS * NUM_WHEEL_PINS] = parse_array(key, value)?;
                for (pins, chunk) in self.wheel_pins.iter_mut().zip(flat.chunks(NUM_WHEEL_PINS)) {
                    pins.copy_from_slice(chunk);
                }
            }
            ConfigKey::BlePins => self.ble_pins = parse_array(key, value)?,
            ConfigKey::Cycle => {
                let cycles: i64 = value.parse().map_err(|_| ConfigError::InvalidNumber(key))?;
                self.run_cycles = cycles.clamp(0, i64::from(MAX_RUN_CYCLES)) as u32;
            }
            ConfigKey::Movements => {
                let mut path = PathString::new();
                path.push_str(value)
                    .map_err(|_| ConfigError::ValueTooLong(key))?;
                self.movements = path;
            }
        }
        Ok(Some(key))
    }

    /// Human readable listing of the settings, one line at a time
    pub fn dump(&self, mut out: impl FnMut(&str)) {
        let mut line = DumpLine::new();

        out("Dumping current configured settings");
        out("Dumping wheel pin settings");
        for pins in &self.wheel_pins {
            line.clear();
            let _ = line.push_str("   ");
            push_array(&mut line, pins);
            out(&line);
        }

        out("Dumping light settings");
        line.clear();
        let _ = line.push_str("   Light pin settings ");
        push_array(&mut line, &self.light_pins);
        out(&line);
        out(if self.lights_enabled {
            "   Lights enabled YES"
        } else {
            "   Lights enabled NO"
        });
        out(if self.light_override {
            "   Lights override YES"
        } else {
            "   Lights override NO"
        });

        line.clear();
        let _ = line.push_str("Dumping BLE pin settings ");
        push_array(&mut line, &self.ble_pins);
        out(&line);

        out("Dumping generic settings");
        line.clear();
        let _ = write!(line, "   ConfigFile {}", DEFAULT_CONFIG_FILE);
        out(&line);
        line.clear();
        let _ = write!(line, "   CommandFile {}", self.movements);
        out(&line);
        line.clear();
        let _ = write!(line, "   Run cycles {}", self.run_cycles);
        out(&line);
    }
}

/// Reads `{a,b,...}` into exactly `N` values
fn parse_array<const N: usize>(key: ConfigKey, value: &str) -> Result<[u8; N], ConfigError> {
    let inner = value
        .strip_prefix('{')
        .and_then(|v| v.strip_suffix('}'))
        .ok_or(ConfigError::MalformedArray(key))?;

    let mut values = [0; N];
    let mut count = 0;
    for item in inner.split(',') {
        let item = item.trim_matches(|c| c == '{' || c == '}');
        let slot = values.get_mut(count).ok_or(ConfigError::MalformedArray(key))?;
        *slot = item.parse().map_err(|_| ConfigError::InvalidNumber(key))?;
        count += 1;
    }

    if count != N {
        return Err(ConfigError::MalformedArray(key));
    }
    Ok(values)
}

fn push_array(line: &mut DumpLine, values: &[u8]) {
    let _ = line.push('{');
    for (i, value) in values.iter().enumerate() {
        if i > 0 {
            let _ = line.push(',');
        }
        let _ = write!(line, "{}", value);
    }
    let _ = line.push('}');
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::vec::Vec;

    const CONF: &str = "LIGHTS=OFF; LIGHTS_OVERRIDE = ON;\n\
        LIGHT_PINS={1,2,3,4};\n\
        WHEEL_PINS={{10,11,12},{13,14,15},{16,17,18},{19,20,21}};\n\
        BLE_PINS={7,8,9};\n\
        CYCLE=3;\n\
        MOVEMENTS=COMMANDS/SQUARE.TXT;\n";

    #[test]
    fn defaults_match_stock_wiring() {
        let config = Config::default();
        assert!(config.lights_enabled);
        assert!(!config.light_override);
        assert_eq!(config.light_pins, [42, 43, 44, 45]);
        assert_eq!(config.wheel_pins[1], [5, 24, 30]);
        assert_eq!(config.run_cycles, MAX_RUN_CYCLES);
        assert_eq!(config.movements.as_str(), DEFAULT_COMMAND_FILE);
    }

    #[test]
    fn full_file_is_applied() {
        let (config, rejected) = Config::parse(CONF);
        assert_eq!(rejected, 0);
        assert!(!config.lights_enabled);
        assert!(config.light_override);
        assert_eq!(config.light_pins, [1, 2, 3, 4]);
        assert_eq!(
            config.wheel_pins,
            [[10, 11, 12], [13, 14, 15], [16, 17, 18], [19, 20, 21]]
        );
        assert_eq!(config.ble_pins, [7, 8, 9]);
        assert_eq!(config.run_cycles, 3);
        assert_eq!(config.movements.as_str(), "COMMANDS/SQUARE.TXT");
    }

    #[test]
    fn flat_wheel_pins_are_accepted() {
        let mut config = Config::default();
        let key = config
            .apply_entry("WHEEL_PINS={1,2,3,4,5,6,7,8,9,10,11,12}")
            .unwrap();
        assert_eq!(key, Some(ConfigKey::WheelPins));
        assert_eq!(config.wheel_pins[3], [10, 11, 12]);
    }

    #[test]
    fn bad_entries_are_skipped() {
        let text = "COLOUR=RED;LIGHT_PINS=1,2,3,4;BLE_PINS={1,2};CYCLE=many;NOEQUALS;CYCLE=5;";
        let (config, rejected) = Config::parse(text);
        assert_eq!(rejected, 5);
        assert_eq!(config.light_pins, Config::default().light_pins);
        assert_eq!(config.ble_pins, Config::default().ble_pins);
        assert_eq!(config.run_cycles, 5);
    }

    #[test]
    fn entry_errors() {
        let mut config = Config::default();
        assert_eq!(config.apply_entry("SPEED=3"), Err(ConfigError::UnknownKey));
        assert_eq!(config.apply_entry("LIGHTS"), Err(ConfigError::MalformedEntry));
        assert_eq!(
            config.apply_entry("LIGHT_PINS={1,2,3,4,5}"),
            Err(ConfigError::MalformedArray(ConfigKey::LightPins))
        );
        assert_eq!(
            config.apply_entry("BLE_PINS={1,x,3}"),
            Err(ConfigError::InvalidNumber(ConfigKey::BlePins))
        );
        assert_eq!(
            config.apply_entry("LIGHT_PINS={1,2,3,999}"),
            Err(ConfigError::InvalidNumber(ConfigKey::LightPins))
        );
        assert_eq!(config.apply_entry("  \n"), Ok(None));
    }

    #[test]
    fn cycles_are_clamped() {
        let mut config = Config::default();
        config.apply_entry("CYCLE=5000").unwrap();
        assert_eq!(config.run_cycles, MAX_RUN_CYCLES);
        config.apply_entry("CYCLE=-4").unwrap();
        assert_eq!(config.run_cycles, 0);
    }

    #[test]
    fn overlong_path_is_rejected() {
        let mut config = Config::default();
        let entry = std::format!("MOVEMENTS={}", "A".repeat(PATH_CAPACITY + 1));
        assert_eq!(
            config.apply_entry(&entry),
            Err(ConfigError::ValueTooLong(ConfigKey::Movements))
        );
        assert_eq!(config.movements.as_str(), DEFAULT_COMMAND_FILE);
    }

    #[test]
    fn key_table_matches_variants() {
        for (name, key, kind) in KEY_TABLE {
            assert_eq!(ConfigKey::lookup(name), Some(key));
            assert_eq!(key.name(), name);
            assert_eq!(key.value_kind(), kind);
        }
    }

    #[test]
    fn dump_lists_settings() {
        let mut lines: Vec<std::string::String> = Vec::new();
        Config::default().dump(|line| lines.push(line.into()));

        assert_eq!(lines[0], "Dumping current configured settings");
        assert!(lines.contains(&"   {4,31,32}".into()));
        assert!(lines.contains(&"   Light pin settings {42,43,44,45}".into()));
        assert!(lines.contains(&"   Lights enabled YES".into()));
        assert!(lines.contains(&"Dumping BLE pin settings {10,11,9}".into()));
        assert_eq!(lines.last().map(|l| l.as_str()), Some("   Run cycles 1000"));
    }
}
