//! Beacon and state-of-health strings.

use crate::logging::ErrorCounter;
use crate::packet::{PacketSender, MAX_PACKET_SIZE};
use crate::platform::{Modulation, TemperatureSensor};
use crate::satellite::{PowerMode, Satellite};
use core::fmt::{self, Display};
use core::time::Duration;
use arrayvec::ArrayString;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Placeholder for a reading that is not available.
pub const NOT_AVAILABLE: &str = "NA";

/// Temperature sensors outside the radio. Either may be absent.
#[derive(Default)]
pub struct Sensors {
    pub mcu: Option<Box<dyn TemperatureSensor>>,
    pub imu: Option<Box<dyn TemperatureSensor>>,
}

impl fmt::Debug for Sensors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sensors")
            .field("mcu", &self.mcu.is_some())
            .field("imu", &self.imu.is_some())
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StateOfHealth {
    pub power_mode: PowerMode,
    pub charge_current: Option<f32>,
    pub uptime_s: u64,
    pub boot_count: u8,
    pub mcu_temperature: Option<f32>,
    pub radio_temperature: Option<f32>,
    pub imu_temperature: Option<f32>,
    pub error_count: u32,
    pub burned: bool,
    pub brownout: bool,
    pub modulation: Modulation,
}

/// Optional sensor value rendered to two decimals or [`NOT_AVAILABLE`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading(pub Option<f32>);

impl Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(value) => write!(f, "{value:.2}"),
            None => f.write_str(NOT_AVAILABLE),
        }
    }
}

impl StateOfHealth {
    /// Sample every source once.
    pub fn collect(
        satellite: &mut Satellite,
        sender: &mut PacketSender,
        sensors: &mut Sensors,
        errors: &ErrorCounter,
    ) -> Self {
        Self {
            power_mode: satellite.power_mode(),
            charge_current: satellite.charge_current,
            uptime_s: satellite.get_system_uptime().as_secs(),
            boot_count: satellite.boot_count(),
            mcu_temperature: sensors.mcu.as_mut().and_then(|s| s.temperature()),
            radio_temperature: sender.radio_temperature(),
            imu_temperature: sensors.imu.as_mut().and_then(|s| s.temperature()),
            error_count: errors.get(),
            burned: satellite.burned(),
            brownout: satellite.brownout(),
            modulation: sender.modulation(),
        }
    }
}

impl Display for StateOfHealth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PM={},IC={},UT={},BN={},MT={},RT={},AT={},EC={},AB={},BO={},FK={}",
            self.power_mode,
            Reading(self.charge_current),
            self.uptime_s,
            self.boot_count,
            Reading(self.mcu_temperature),
            Reading(self.radio_temperature),
            Reading(self.imu_temperature),
            self.error_count,
            u8::from(self.burned),
            u8::from(self.brownout),
            self.modulation,
        )
    }
}

/// Beacon text; always fits a single radio packet.
pub type BeaconBuffer = ArrayString<MAX_PACKET_SIZE>;

/// Identification beacon, framed by the station license on both ends.
///
/// Text past [`MAX_PACKET_SIZE`] bytes is cut at the last char boundary that
/// fits.
pub fn beacon_text(
    license: &str,
    name: &str,
    mode: PowerMode,
    uptime: Duration,
    boot_count: u8,
    error_count: u32,
) -> BeaconBuffer {
    let mut full = format!(
        "{license} Hello I am {name}! I am: {mode} UT:{} BN:{boot_count} EC:{error_count} IHBPFJASTMNE! {license}",
        uptime.as_secs()
    );
    if full.len() > MAX_PACKET_SIZE {
        let mut cut = MAX_PACKET_SIZE;
        while !full.is_char_boundary(cut) {
            cut -= 1;
        }
        warn!(len = full.len(), kept = cut, "beacon truncated to one packet");
        full.truncate(cut);
    }

    let mut text = BeaconBuffer::new();
    text.push_str(&full);
    text
}
