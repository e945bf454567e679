//! Battery health assessment
//!
//! [`PowerHealthMonitor`] averages a burst of bus voltage and current
//! readings and grades them against the thresholds in [`Config`]:
//!
//! - any channel without a reading: [`PowerHealth::Unknown`]
//! - bus voltage at or below `critical_battery_voltage`: [`PowerHealth::Critical`]
//! - current further than `normal_charge_current` from `normal_charge_current`,
//!   or bus voltage at or below `normal_battery_voltage`: [`PowerHealth::Degraded`]
//! - otherwise [`PowerHealth::Nominal`]

use crate::config::Config;
use crate::platform::PowerMonitor;
use core::fmt;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Readings averaged per channel in one check.
pub const READINGS_PER_CHECK: u32 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PowerHealth {
    Nominal,
    Degraded,
    Critical,
    Unknown,
}

impl PowerHealth {
    pub fn as_str(&self) -> &'static str {
        match self {
            PowerHealth::Nominal => "NOMINAL",
            PowerHealth::Degraded => "DEGRADED",
            PowerHealth::Critical => "CRITICAL",
            PowerHealth::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for PowerHealth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one check, with the averaged readings behind it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PowerReport {
    pub health: PowerHealth,
    pub bus_voltage: Option<f32>,
    pub current: Option<f32>,
}

/// Why a check came out degraded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Deviation {
    Current { current: f32, normal: f32 },
    LowVoltage { bus_voltage: f32, threshold: f32 },
}

pub struct PowerHealthMonitor {
    monitor: Box<dyn PowerMonitor>,
    readings: u32,
}

impl fmt::Debug for PowerHealthMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PowerHealthMonitor")
            .field("readings", &self.readings)
            .finish_non_exhaustive()
    }
}

impl PowerHealthMonitor {
    pub fn new(monitor: Box<dyn PowerMonitor>) -> Self {
        Self {
            monitor,
            readings: READINGS_PER_CHECK,
        }
    }

    /// Average over `readings` samples instead of [`READINGS_PER_CHECK`].
    pub fn with_readings(mut self, readings: u32) -> Self {
        self.readings = readings.max(1);
        self
    }

    /// Sample the monitor and grade the result against `config`.
    pub fn check(&mut self, config: &Config) -> PowerReport {
        let bus_voltage = self.average("bus_voltage", |m| m.bus_voltage());
        let Some(voltage) = bus_voltage else {
            warn!("power monitor failed to provide bus voltage reading");
            return PowerReport {
                health: PowerHealth::Unknown,
                bus_voltage: None,
                current: None,
            };
        };

        let current = self.average("current", |m| m.current());
        let Some(amps) = current else {
            warn!("power monitor failed to provide current reading");
            return PowerReport {
                health: PowerHealth::Unknown,
                bus_voltage,
                current: None,
            };
        };

        let health = grade(voltage, amps, config);
        PowerReport {
            health,
            bus_voltage,
            current,
        }
    }

    fn average(
        &mut self,
        channel: &'static str,
        mut read: impl FnMut(&mut dyn PowerMonitor) -> Option<f32>,
    ) -> Option<f32> {
        let mut total = 0.0_f32;
        for _ in 0..self.readings {
            let Some(reading) = read(self.monitor.as_mut()) else {
                warn!(channel, "couldn't get reading from power monitor");
                return None;
            };
            total += reading;
        }
        Some(total / self.readings as f32)
    }
}

/// Deviations from the configured operating point, in check order.
pub fn deviations(bus_voltage: f32, current: f32, config: &Config) -> heapless::Vec<Deviation, 2> {
    let mut found = heapless::Vec::new();
    let normal = config.normal_charge_current;
    if (current - normal).abs() > normal {
        let _ = found.push(Deviation::Current { current, normal });
    }
    if bus_voltage <= config.normal_battery_voltage {
        let _ = found.push(Deviation::LowVoltage {
            bus_voltage,
            threshold: config.normal_battery_voltage,
        });
    }
    found
}

fn grade(bus_voltage: f32, current: f32, config: &Config) -> PowerHealth {
    if bus_voltage <= config.critical_battery_voltage {
        warn!(
            bus_voltage,
            threshold = config.critical_battery_voltage,
            "battery voltage at or below critical threshold"
        );
        return PowerHealth::Critical;
    }

    let found = deviations(bus_voltage, current, config);
    if found.is_empty() {
        debug!(bus_voltage, current, "power health nominal");
        PowerHealth::Nominal
    } else {
        info!(bus_voltage, current, deviations = ?found, "power health degraded");
        PowerHealth::Degraded
    }
}
