//! Flight configuration
//!
//! Loaded once from JSON and validated against fixed ranges. Runtime changes
//! go through [`ConfigUpdate`]: a closed set of typed field updates resolved
//! from a key and a JSON value, range-checked by [`Config::apply`] before any
//! field is touched.

use crate::error::{ConfigError, ConfigUpdateError};
use crate::packet::MAX_PACKET_SIZE;
use crate::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use tracing::info;

pub const PASSCODE_LEN: usize = 4;
pub const CODE_LEN: usize = 2;

const NAME_LEN: (usize, usize) = (1, 10);
const REBOOT_TIME_S: (u64, u64) = (3600, 604_800);
const SLEEP_S: (u64, u64) = (1, 86_400);
const CHARGE_CURRENT: (f32, f32) = (0.0, 2000.0);
const BATTERY_VOLTAGE: (f32, f32) = (6.0, 8.4);
const CRITICAL_VOLTAGE: (f32, f32) = (5.4, 7.2);
const RETRY_ATTEMPTS: (u8, u8) = (1, 10);

fn default_send_delay_ms() -> u64 {
    200
}

fn default_max_packet_size() -> usize {
    MAX_PACKET_SIZE
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RadioConfig {
    pub license: String,
    pub transmit_frequency: f32,
    #[serde(default = "default_max_packet_size")]
    pub max_packet_size: usize,
    #[serde(default = "default_send_delay_ms")]
    pub send_delay_ms: u64,
    #[serde(default)]
    pub retry: RetryPolicy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub cubesat_name: String,
    pub super_secret_code: String,
    pub repeat_code: String,
    #[serde(default)]
    pub update_config_code: Option<String>,
    pub reboot_time: u64,
    pub longest_allowable_sleep_time: u64,
    pub sleep_duration: u64,
    pub jokes: Vec<String>,
    pub joke_reply: Vec<String>,
    /// Expected charge current; readings further than this from it are a deviation.
    pub normal_charge_current: f32,
    /// Bus voltage at or below this grades the battery degraded.
    pub normal_battery_voltage: f32,
    pub critical_battery_voltage: f32,
    /// Battery heater enabled. Cleared when the battery grades critical.
    #[serde(default)]
    pub heating: bool,
    #[serde(default)]
    pub debug: bool,
    pub radio: RadioConfig,
}

/// One typed configuration change.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigUpdate {
    CubesatName(String),
    RebootTime(u64),
    LongestAllowableSleepTime(u64),
    SleepDuration(u64),
    NormalChargeCurrent(f32),
    NormalBatteryVoltage(f32),
    CriticalBatteryVoltage(f32),
    Heating(bool),
    Debug(bool),
    License(String),
    TransmitFrequency(f32),
}

fn in_range<T: PartialOrd + Copy + core::fmt::Display>(
    key: &'static str,
    value: T,
    (min, max): (T, T),
) -> Result<(), ConfigUpdateError> {
    if !(min..=max).contains(&value) {
        return Err(ConfigUpdateError::RangeViolation {
            key,
            reason: format!("{value} not in {min}..={max}"),
        });
    }
    Ok(())
}

fn as_u64(key: &'static str, value: &Value) -> Result<u64, ConfigUpdateError> {
    value.as_u64().ok_or(ConfigUpdateError::TypeMismatch {
        key,
        expected: "unsigned integer",
    })
}

fn as_f32(key: &'static str, value: &Value) -> Result<f32, ConfigUpdateError> {
    value
        .as_f64()
        .map(|v| v as f32)
        .ok_or(ConfigUpdateError::TypeMismatch {
            key,
            expected: "number",
        })
}

fn as_bool(key: &'static str, value: &Value) -> Result<bool, ConfigUpdateError> {
    value.as_bool().ok_or(ConfigUpdateError::TypeMismatch {
        key,
        expected: "boolean",
    })
}

fn as_string(key: &'static str, value: &Value) -> Result<String, ConfigUpdateError> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or(ConfigUpdateError::TypeMismatch {
            key,
            expected: "string",
        })
}

impl ConfigUpdate {
    /// Resolve a key and JSON value into a typed update.
    ///
    /// # Errors
    ///
    /// `UnknownKey` for keys outside the updatable set, `TypeMismatch` when
    /// the value has the wrong JSON type.
    pub fn parse(key: &str, value: &Value) -> Result<Self, ConfigUpdateError> {
        let update = match key {
            "cubesat_name" => Self::CubesatName(as_string("cubesat_name", value)?),
            "reboot_time" => Self::RebootTime(as_u64("reboot_time", value)?),
            "longest_allowable_sleep_time" => Self::LongestAllowableSleepTime(as_u64(
                "longest_allowable_sleep_time",
                value,
            )?),
            "sleep_duration" => Self::SleepDuration(as_u64("sleep_duration", value)?),
            "normal_charge_current" => {
                Self::NormalChargeCurrent(as_f32("normal_charge_current", value)?)
            }
            "normal_battery_voltage" => {
                Self::NormalBatteryVoltage(as_f32("normal_battery_voltage", value)?)
            }
            "critical_battery_voltage" => {
                Self::CriticalBatteryVoltage(as_f32("critical_battery_voltage", value)?)
            }
            "heating" => Self::Heating(as_bool("heating", value)?),
            "debug" => Self::Debug(as_bool("debug", value)?),
            "license" => Self::License(as_string("license", value)?),
            "transmit_frequency" => Self::TransmitFrequency(as_f32("transmit_frequency", value)?),
            other => return Err(ConfigUpdateError::UnknownKey(other.to_string())),
        };
        Ok(update)
    }

    pub fn key(&self) -> &'static str {
        match self {
            Self::CubesatName(_) => "cubesat_name",
            Self::RebootTime(_) => "reboot_time",
            Self::LongestAllowableSleepTime(_) => "longest_allowable_sleep_time",
            Self::SleepDuration(_) => "sleep_duration",
            Self::NormalChargeCurrent(_) => "normal_charge_current",
            Self::NormalBatteryVoltage(_) => "normal_battery_voltage",
            Self::CriticalBatteryVoltage(_) => "critical_battery_voltage",
            Self::Heating(_) => "heating",
            Self::Debug(_) => "debug",
            Self::License(_) => "license",
            Self::TransmitFrequency(_) => "transmit_frequency",
        }
    }

    /// Range check without applying.
    ///
    /// # Errors
    ///
    /// `RangeViolation` when the value is outside the field's range.
    pub fn check(&self) -> Result<(), ConfigUpdateError> {
        let key = self.key();
        match self {
            Self::CubesatName(name) => in_range(key, name.chars().count(), NAME_LEN),
            Self::RebootTime(v) => in_range(key, *v, REBOOT_TIME_S),
            Self::LongestAllowableSleepTime(v) | Self::SleepDuration(v) => {
                in_range(key, *v, SLEEP_S)
            }
            Self::NormalChargeCurrent(v) => in_range(key, *v, CHARGE_CURRENT),
            Self::NormalBatteryVoltage(v) => in_range(key, *v, BATTERY_VOLTAGE),
            Self::CriticalBatteryVoltage(v) => in_range(key, *v, CRITICAL_VOLTAGE),
            Self::Heating(_) | Self::Debug(_) | Self::License(_) => Ok(()),
            Self::TransmitFrequency(v) => {
                let amateur_band = (435.0..=438.0).contains(v);
                let ism = (*v - 915.0).abs() < f32::EPSILON;
                if amateur_band || ism {
                    Ok(())
                } else {
                    Err(ConfigUpdateError::RangeViolation {
                        key,
                        reason: format!("{v} MHz is neither 435..=438 nor 915"),
                    })
                }
            }
        }
    }
}

impl Config {
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` for malformed JSON and
    /// `ConfigError::Invalid` for out-of-range fields.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    ///
    /// As [`Config::from_json`], plus `ConfigError::Io` if the file cannot be
    /// read.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_json(&json)?;
        info!(path = %path.as_ref().display(), name = %config.cubesat_name, "loaded config");
        Ok(config)
    }

    fn current_values(&self) -> [ConfigUpdate; 11] {
        [
            ConfigUpdate::CubesatName(self.cubesat_name.clone()),
            ConfigUpdate::RebootTime(self.reboot_time),
            ConfigUpdate::LongestAllowableSleepTime(self.longest_allowable_sleep_time),
            ConfigUpdate::SleepDuration(self.sleep_duration),
            ConfigUpdate::NormalChargeCurrent(self.normal_charge_current),
            ConfigUpdate::NormalBatteryVoltage(self.normal_battery_voltage),
            ConfigUpdate::CriticalBatteryVoltage(self.critical_battery_voltage),
            ConfigUpdate::Heating(self.heating),
            ConfigUpdate::Debug(self.debug),
            ConfigUpdate::License(self.radio.license.clone()),
            ConfigUpdate::TransmitFrequency(self.radio.transmit_frequency),
        ]
    }

    /// Check every field against its range.
    ///
    /// # Errors
    ///
    /// Returns the first invalid field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for value in self.current_values() {
            value.check().map_err(|e| ConfigError::Invalid {
                field: value.key(),
                reason: e.to_string(),
            })?;
        }

        let exact_len = |field: &'static str, text: &str, len: usize| {
            if text.len() == len {
                Ok(())
            } else {
                Err(ConfigError::Invalid {
                    field,
                    reason: format!("must be exactly {len} bytes, got {}", text.len()),
                })
            }
        };
        exact_len("super_secret_code", &self.super_secret_code, PASSCODE_LEN)?;
        exact_len("repeat_code", &self.repeat_code, CODE_LEN)?;
        if let Some(code) = &self.update_config_code {
            exact_len("update_config_code", code, CODE_LEN)?;
        }

        if self.radio.max_packet_size == 0 || self.radio.max_packet_size > MAX_PACKET_SIZE {
            return Err(ConfigError::Invalid {
                field: "max_packet_size",
                reason: format!("must be within 1..={MAX_PACKET_SIZE}"),
            });
        }

        in_range("retry", self.radio.retry.max_attempts, RETRY_ATTEMPTS).map_err(|e| {
            ConfigError::Invalid {
                field: "retry.max_attempts",
                reason: e.to_string(),
            }
        })?;

        Ok(())
    }

    /// Apply a typed update after range-checking it.
    ///
    /// # Errors
    ///
    /// `RangeViolation`; the configuration is unchanged on error.
    pub fn apply(&mut self, update: ConfigUpdate) -> Result<(), ConfigUpdateError> {
        update.check()?;
        info!(key = update.key(), "applying config update");
        match update {
            ConfigUpdate::CubesatName(v) => self.cubesat_name = v,
            ConfigUpdate::RebootTime(v) => self.reboot_time = v,
            ConfigUpdate::LongestAllowableSleepTime(v) => self.longest_allowable_sleep_time = v,
            ConfigUpdate::SleepDuration(v) => self.sleep_duration = v,
            ConfigUpdate::NormalChargeCurrent(v) => self.normal_charge_current = v,
            ConfigUpdate::NormalBatteryVoltage(v) => self.normal_battery_voltage = v,
            ConfigUpdate::CriticalBatteryVoltage(v) => self.critical_battery_voltage = v,
            ConfigUpdate::Heating(v) => self.heating = v,
            ConfigUpdate::Debug(v) => self.debug = v,
            ConfigUpdate::License(v) => self.radio.license = v,
            ConfigUpdate::TransmitFrequency(v) => self.radio.transmit_frequency = v,
        }
        Ok(())
    }

    /// Passcode bytes; `None` if the configuration was never validated.
    pub fn passcode(&self) -> Option<[u8; PASSCODE_LEN]> {
        self.super_secret_code.as_bytes().try_into().ok()
    }

    pub fn repeat_code_bytes(&self) -> Option<[u8; CODE_LEN]> {
        self.repeat_code.as_bytes().try_into().ok()
    }

    pub fn update_config_opcode(&self) -> Option<[u8; CODE_LEN]> {
        self.update_config_code
            .as_deref()
            .and_then(|code| code.as_bytes().try_into().ok())
    }
}
