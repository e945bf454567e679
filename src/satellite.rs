use crate::config::Config;
use crate::error::NvmError;
use crate::nvm::{NvmStore, SatelliteRegisters};
use crate::platform::{Clock, SystemControl};
use core::time::Duration;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PowerMode {
    Critical,
    Minimum,
    Normal,
    Maximum,
}

impl PowerMode {
    /// Substring match, first hit wins: "crit", "min", "norm", "max".
    pub fn from_text(text: &str) -> Option<Self> {
        if text.contains("crit") {
            Some(PowerMode::Critical)
        } else if text.contains("min") {
            Some(PowerMode::Minimum)
        } else if text.contains("norm") {
            Some(PowerMode::Normal)
        } else if text.contains("max") {
            Some(PowerMode::Maximum)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PowerMode::Critical => "critical",
            PowerMode::Minimum => "minimum",
            PowerMode::Normal => "normal",
            PowerMode::Maximum => "maximum",
        }
    }
}

impl core::fmt::Display for PowerMode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Power mode, uptime and the persistent boot state of the spacecraft.
pub struct Satellite {
    nvm: NvmStore,
    registers: SatelliteRegisters,
    clock: Box<dyn Clock>,

    power_mode: PowerMode,
    boot_time: Duration,
    current_time: Duration,
    reboot_time: Duration,
    booted_soft: bool,

    name: String,
    pub charge_current: Option<f32>,
    pub battery_voltage: Option<f32>,
}

impl core::fmt::Debug for Satellite {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Satellite")
            .field("name", &self.name)
            .field("power_mode", &self.power_mode)
            .field("boot_time", &self.boot_time)
            .field("nvm", &self.nvm)
            .finish_non_exhaustive()
    }
}

impl Satellite {
    /// Register the NVM table, anchor boot time and record this boot.
    ///
    /// A pending soft-boot flag is read and cleared here.
    ///
    /// # Errors
    ///
    /// Fails if the register table cannot be laid out on `nvm`.
    pub fn new(mut nvm: NvmStore, clock: Box<dyn Clock>, config: &Config) -> Result<Self, NvmError> {
        let registers = SatelliteRegisters::register(&nvm)?;

        let boot_time = clock.now();
        debug!(boot_time_s = boot_time.as_secs_f64(), "Booting up!");

        let booted_soft = registers.softboot.get(&nvm);
        if booted_soft {
            registers.softboot.toggle(&mut nvm, false);
        }

        registers.boot_count.increment(&mut nvm);
        info!(
            boot_count = registers.boot_count.get(&nvm),
            soft_boot = booted_soft,
            name = %config.cubesat_name,
            "satellite initialized"
        );

        Ok(Self {
            nvm,
            registers,
            clock,
            power_mode: PowerMode::Normal,
            boot_time,
            current_time: boot_time,
            reboot_time: Duration::from_secs(config.reboot_time),
            booted_soft,
            name: config.cubesat_name.clone(),
            charge_current: None,
            battery_voltage: None,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn power_mode(&self) -> PowerMode {
        self.power_mode
    }

    /// Select a power mode from free text.
    ///
    /// Unrecognized text leaves the mode unchanged; the returned value is the
    /// mode in effect afterwards.
    pub fn powermode(&mut self, mode: &str) -> PowerMode {
        match PowerMode::from_text(mode) {
            Some(selected) => {
                if selected != self.power_mode {
                    info!(from = %self.power_mode, to = %selected, "power mode changed");
                }
                self.power_mode = selected;
            }
            None => {
                warn!(mode, current = %self.power_mode, "unrecognized power mode request");
            }
        }
        self.power_mode
    }

    /// Time since boot; also records `now` as the last observed time.
    pub fn get_system_uptime(&mut self) -> Duration {
        self.current_time = self.clock.now();
        self.current_time.saturating_sub(self.boot_time)
    }

    pub fn last_observed_time(&self) -> Duration {
        self.current_time
    }

    pub fn boot_time(&self) -> Duration {
        self.boot_time
    }

    /// Hard reset once uptime exceeds the configured reboot time.
    pub fn check_reboot(&mut self, system: &mut dyn SystemControl) {
        let uptime = self.get_system_uptime();
        debug!(uptime_s = uptime.as_secs(), "Current up time stat");
        if uptime > self.reboot_time {
            error!(
                critical = true,
                uptime_s = uptime.as_secs(),
                reboot_time_s = self.reboot_time.as_secs(),
                "reboot time exceeded, resetting"
            );
            system.reset();
        }
    }

    pub fn set_reboot_time(&mut self, reboot_time: Duration) {
        self.reboot_time = reboot_time;
    }

    /// Whether this boot followed a hibernation.
    pub fn booted_soft(&self) -> bool {
        self.booted_soft
    }

    pub fn boot_count(&self) -> u8 {
        self.registers.boot_count.get(&self.nvm)
    }

    pub fn softboot(&self) -> bool {
        self.registers.softboot.get(&self.nvm)
    }

    pub fn set_softboot(&mut self, value: bool) {
        self.registers.softboot.toggle(&mut self.nvm, value);
    }

    pub fn brownout(&self) -> bool {
        self.registers.brownout.get(&self.nvm)
    }

    pub fn set_brownout(&mut self, value: bool) {
        self.registers.brownout.toggle(&mut self.nvm, value);
    }

    pub fn shutdown(&self) -> bool {
        self.registers.shutdown.get(&self.nvm)
    }

    pub fn set_shutdown(&mut self, value: bool) {
        self.registers.shutdown.toggle(&mut self.nvm, value);
    }

    pub fn burned(&self) -> bool {
        self.registers.burned.get(&self.nvm)
    }

    pub fn set_burned(&mut self, value: bool) {
        self.registers.burned.toggle(&mut self.nvm, value);
    }

    /// Radio comes up in FSK on the next bring-up when set.
    pub fn use_fsk(&self) -> bool {
        self.registers.use_fsk.get(&self.nvm)
    }

    pub fn set_use_fsk(&mut self, value: bool) {
        self.registers.use_fsk.toggle(&mut self.nvm, value);
    }

    pub fn nvm(&self) -> &NvmStore {
        &self.nvm
    }

    pub fn registers(&self) -> &SatelliteRegisters {
        &self.registers
    }

    /// Hand the store back, as a reset leaves it.
    pub fn into_nvm(self) -> NvmStore {
        self.nvm
    }
}
