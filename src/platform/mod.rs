//! Hardware collaborator interfaces
//!
//! Everything the flight core needs from the board is expressed as a small
//! trait here. Flight code only ever holds boxed trait objects, so the same
//! control loop runs against the deterministic [`mock`] doubles in tests and
//! against the [`host`] implementations in the simulator.
//!
//! # Invariants
//!
//! - Single control loop: none of these types are shared across threads.
//! - Every blocking call is bounded by its argument (no unbounded waits).

pub mod host;
pub mod mock;

use crate::error::{HardwareError, RadioError};
use core::time::Duration;
use serde::{Deserialize, Serialize};

/// Maximum inbound frame the radio layer hands to the protocol.
pub const MAX_FRAME_SIZE: usize = 256;

pub type FrameBuffer = heapless::Vec<u8, MAX_FRAME_SIZE>;

/// Monotonic time source.
pub trait Clock {
    /// Time elapsed since an arbitrary fixed epoch.
    fn now(&self) -> Duration;
}

/// Busy or blocking delay.
pub trait Delay {
    fn delay(&mut self, duration: Duration);

    fn delay_ms(&mut self, ms: u64) {
        self.delay(Duration::from_millis(ms));
    }
}

/// Low-power suspension until a timed wake event fires.
pub trait AlarmSleep {
    fn light_sleep(&mut self, duration: Duration);
}

/// Digital output line.
pub trait OutputPin {
    /// Drive the line high.
    ///
    /// # Errors
    ///
    /// Returns `HardwareError::Pin` if the line cannot be driven.
    fn set_high(&mut self) -> Result<(), HardwareError>;

    /// Drive the line low.
    ///
    /// # Errors
    ///
    /// Returns `HardwareError::Pin` if the line cannot be driven.
    fn set_low(&mut self) -> Result<(), HardwareError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Modulation {
    LoRa,
    Fsk,
}

impl core::fmt::Display for Modulation {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Modulation::LoRa => write!(f, "LoRa"),
            Modulation::Fsk => write!(f, "FSK"),
        }
    }
}

/// Application-level radio transport.
pub trait Radio {
    /// Transmit one packet.
    ///
    /// # Errors
    ///
    /// Returns a [`RadioError`] when the packet was not transmitted.
    fn send(&mut self, data: &[u8]) -> Result<(), RadioError>;

    /// Poll for one inbound frame, bounded by the radio's receive timeout.
    fn receive(&mut self) -> Option<FrameBuffer>;

    fn temperature(&mut self) -> Option<f32>;

    fn modulation(&self) -> Modulation;
}

pub trait TemperatureSensor {
    fn temperature(&mut self) -> Option<f32>;
}

/// Battery bus monitor. Each reading is `None` when the device does not answer.
pub trait PowerMonitor {
    /// Bus voltage in volts.
    fn bus_voltage(&mut self) -> Option<f32>;

    /// Shunt voltage in volts.
    fn shunt_voltage(&mut self) -> Option<f32>;

    /// Charge current in amps.
    fn current(&mut self) -> Option<f32>;
}

/// Irreversible whole-device actions.
pub trait SystemControl {
    /// Hard reset of the microcontroller.
    fn reset(&mut self) -> !;

    /// Enter deep sleep with no wake source.
    fn deep_sleep(&mut self) -> !;
}
