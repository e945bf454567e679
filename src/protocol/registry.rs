//! Closed registries behind the query and exec opcodes.
//!
//! Argument text only ever selects one of the variants below; nothing in it
//! is evaluated.

use super::CommandContext;
use crate::error::CommandError;
use crate::satellite::PowerMode;
use crate::telemetry::{Reading, StateOfHealth};

/// Read-only telemetry accessors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Query {
    Uptime,
    BootCount,
    PowerMode,
    ErrorCount,
    Temperatures,
    Flags,
    Modulation,
    ChargeCurrent,
    BatteryVoltage,
    StateOfHealth,
}

impl Query {
    pub const ALL: [Query; 10] = [
        Query::Uptime,
        Query::BootCount,
        Query::PowerMode,
        Query::ErrorCount,
        Query::Temperatures,
        Query::Flags,
        Query::Modulation,
        Query::ChargeCurrent,
        Query::BatteryVoltage,
        Query::StateOfHealth,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Query::Uptime => "uptime",
            Query::BootCount => "boot_count",
            Query::PowerMode => "power_mode",
            Query::ErrorCount => "error_count",
            Query::Temperatures => "temperatures",
            Query::Flags => "flags",
            Query::Modulation => "modulation",
            Query::ChargeCurrent => "charge_current",
            Query::BatteryVoltage => "battery_voltage",
            Query::StateOfHealth => "soh",
        }
    }

    /// # Errors
    ///
    /// `UnknownQuery` for any name outside [`Query::ALL`].
    pub fn parse(text: &str) -> Result<Self, CommandError> {
        let name = text.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|q| q.name() == name)
            .ok_or_else(|| CommandError::UnknownQuery(name.to_string()))
    }

    pub fn evaluate(&self, ctx: &mut CommandContext<'_>) -> String {
        let soh = StateOfHealth::collect(ctx.satellite, ctx.sender, ctx.sensors, ctx.errors);
        match self {
            Query::Uptime => soh.uptime_s.to_string(),
            Query::BootCount => soh.boot_count.to_string(),
            Query::PowerMode => soh.power_mode.to_string(),
            Query::ErrorCount => soh.error_count.to_string(),
            Query::Temperatures => format!(
                "MT={},RT={},AT={}",
                Reading(soh.mcu_temperature),
                Reading(soh.radio_temperature),
                Reading(soh.imu_temperature)
            ),
            Query::Flags => {
                let sat = &*ctx.satellite;
                format!(
                    "softboot={},brownout={},shutdown={},burned={},use_fsk={}",
                    u8::from(sat.softboot()),
                    u8::from(sat.brownout()),
                    u8::from(sat.shutdown()),
                    u8::from(sat.burned()),
                    u8::from(sat.use_fsk())
                )
            }
            Query::Modulation => soh.modulation.to_string(),
            Query::ChargeCurrent => Reading(soh.charge_current).to_string(),
            Query::BatteryVoltage => Reading(ctx.satellite.battery_voltage).to_string(),
            Query::StateOfHealth => soh.to_string(),
        }
    }
}

/// Parameterized actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    PowerMode(PowerMode),
    ShortHibernate,
    LongHibernate,
    Beacon,
    StateOfHealth,
    Joke,
    ClearBrownout,
    /// Watchdog-safe sleep, in seconds.
    Sleep(u64),
}

impl Operation {
    pub const NAMES: [&'static str; 8] = [
        "power_mode",
        "short_hibernate",
        "long_hibernate",
        "beacon",
        "soh",
        "joke",
        "clear_brownout",
        "sleep",
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Operation::PowerMode(_) => "power_mode",
            Operation::ShortHibernate => "short_hibernate",
            Operation::LongHibernate => "long_hibernate",
            Operation::Beacon => "beacon",
            Operation::StateOfHealth => "soh",
            Operation::Joke => "joke",
            Operation::ClearBrownout => "clear_brownout",
            Operation::Sleep(_) => "sleep",
        }
    }

    /// Parse `name [argument]`.
    ///
    /// # Errors
    ///
    /// `UnknownOperation` for unlisted names, `MissingArgument` or
    /// `InvalidArgument` for a bad parameter.
    pub fn parse(text: &str) -> Result<Self, CommandError> {
        let mut words = text.split_whitespace();
        let name = words.next().unwrap_or_default();
        let argument = words.next();

        let operation = match name {
            "power_mode" => {
                let text = argument.ok_or(CommandError::MissingArgument)?;
                let mode =
                    PowerMode::from_text(text).ok_or_else(|| CommandError::InvalidArgument {
                        operation: "power_mode",
                        reason: format!("unrecognized mode {text}"),
                    })?;
                Operation::PowerMode(mode)
            }
            "short_hibernate" => Operation::ShortHibernate,
            "long_hibernate" => Operation::LongHibernate,
            "beacon" => Operation::Beacon,
            "soh" => Operation::StateOfHealth,
            "joke" => Operation::Joke,
            "clear_brownout" => Operation::ClearBrownout,
            "sleep" => {
                let text = argument.ok_or(CommandError::MissingArgument)?;
                let seconds = text.parse().map_err(|_| CommandError::InvalidArgument {
                    operation: "sleep",
                    reason: format!("{text} is not a whole number of seconds"),
                })?;
                Operation::Sleep(seconds)
            }
            other => return Err(CommandError::UnknownOperation(other.to_string())),
        };
        Ok(operation)
    }
}
