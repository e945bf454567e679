//! Host (std) implementations used by the simulator binary.

use super::{AlarmSleep, Clock, Delay, OutputPin, PowerMonitor, SystemControl, TemperatureSensor};
use crate::error::HardwareError;
use core::time::Duration;
use std::time::Instant;
use tracing::{error, trace};

/// Exit status the simulator uses to signal "reset me" to its supervisor.
pub const RESET_EXIT_CODE: i32 = 75;
pub const DEEP_SLEEP_EXIT_CODE: i32 = 76;

#[derive(Debug, Clone, Copy)]
pub struct HostClock {
    epoch: Instant,
}

impl HostClock {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }
}

impl Default for HostClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for HostClock {
    fn now(&self) -> Duration {
        self.epoch.elapsed()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct HostDelay;

impl Delay for HostDelay {
    fn delay(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Alarm sleep on the host thread, optionally compressed by `speedup`.
#[derive(Debug, Clone, Copy)]
pub struct HostAlarm {
    speedup: u32,
}

impl HostAlarm {
    pub fn new(speedup: u32) -> Self {
        Self {
            speedup: speedup.max(1),
        }
    }
}

impl AlarmSleep for HostAlarm {
    fn light_sleep(&mut self, duration: Duration) {
        std::thread::sleep(duration / self.speedup);
    }
}

/// Output line that only traces its level.
#[derive(Debug, Clone, Copy)]
pub struct HostPin {
    name: &'static str,
    high: bool,
}

impl HostPin {
    pub fn new(name: &'static str) -> Self {
        Self { name, high: false }
    }

    pub fn is_high(&self) -> bool {
        self.high
    }
}

impl OutputPin for HostPin {
    fn set_high(&mut self) -> Result<(), HardwareError> {
        self.high = true;
        trace!(pin = self.name, "high");
        Ok(())
    }

    fn set_low(&mut self) -> Result<(), HardwareError> {
        self.high = false;
        trace!(pin = self.name, "low");
        Ok(())
    }
}

/// Temperature source with a fixed reading.
#[derive(Debug, Clone, Copy)]
pub struct FixedTemperature(pub Option<f32>);

impl TemperatureSensor for FixedTemperature {
    fn temperature(&mut self) -> Option<f32> {
        self.0
    }
}

/// Power monitor with fixed bus voltage and current readings.
#[derive(Debug, Clone, Copy)]
pub struct FixedPowerMonitor {
    pub bus_voltage: Option<f32>,
    pub current: Option<f32>,
    /// Shunt resistance in ohms.
    pub shunt_ohms: f32,
}

impl PowerMonitor for FixedPowerMonitor {
    fn bus_voltage(&mut self) -> Option<f32> {
        self.bus_voltage
    }

    fn shunt_voltage(&mut self) -> Option<f32> {
        self.current.map(|amps| amps * self.shunt_ohms)
    }

    fn current(&mut self) -> Option<f32> {
        self.current
    }
}

/// Maps device reset and deep sleep onto process exit.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostSystem;

impl SystemControl for HostSystem {
    fn reset(&mut self) -> ! {
        error!(critical = true, "device reset");
        std::process::exit(RESET_EXIT_CODE)
    }

    fn deep_sleep(&mut self) -> ! {
        error!(critical = true, "entering deep sleep with no wake source");
        std::process::exit(DEEP_SLEEP_EXIT_CODE)
    }
}
