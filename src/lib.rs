//! # CubeSat Flight Software Core
//!
//! The onboard core of a CubeSat: authenticated ground command handling,
//! crash-safe persistent state, and a watchdog-safe power and sleep cycle.
//!
//! ## Features
//!
//! - **Command & Data Handling**: passcode-authenticated uplink frames
//!   dispatched through a fixed opcode table to a closed set of handlers
//! - **Packet pipeline**: radio-sized fragmentation with bounded
//!   exponential-backoff retry
//! - **NVM state**: byte counters and bit flags registered once at start-up,
//!   with overlapping claims rejected
//! - **Power/uptime state machine**: power modes, boot accounting and the
//!   reboot threshold
//! - **Power health**: averaged bus voltage and charge current graded
//!   nominal, degraded, critical or unknown
//! - **Sleep**: chunked sleep that pets the hardware watchdog at least every
//!   15 seconds and never exceeds the configured ceiling
//!
//! ## Quick Start
//!
//! ```rust
//! use cubesat_fsw::agent::{FlightAgent, Hardware};
//! use cubesat_fsw::config::Config;
//! use cubesat_fsw::logging::ErrorCounter;
//! use cubesat_fsw::nvm::NvmStore;
//! use cubesat_fsw::platform::mock::MockBoard;
//! use cubesat_fsw::telemetry::Sensors;
//!
//! let config = Config::from_json(include_str!("../config/flight.json")).unwrap();
//! let board = MockBoard::new();
//! let hardware = Hardware {
//!     nvm: NvmStore::in_memory(64).unwrap(),
//!     clock: Box::new(board.clock()),
//!     watchdog_pin: Box::new(board.pin()),
//!     watchdog_delay: Box::new(board.delay()),
//!     radio_delay: Box::new(board.delay()),
//!     alarm: Box::new(board.alarm()),
//!     radio: Box::new(board.radio()),
//!     system: Box::new(board.system()),
//!     sensors: Sensors::default(),
//!     power_monitor: Box::new(board.power_monitor()),
//! };
//!
//! let mut agent = FlightAgent::new(config, hardware, ErrorCounter::new()).unwrap();
//! let report = agent.step();
//! assert!(report.telemetry_sent);
//! assert_eq!(agent.satellite().boot_count(), 1);
//! ```
//!
//! ## Architecture
//!
//! - [`agent`] - control loop orchestrator
//! - [`protocol`] - uplink frames, opcode table and handlers
//! - [`packet`] - fragmentation and retrying sender
//! - [`satellite`] - power mode, uptime and persistent boot state
//! - [`power`] - battery health graded against the configured thresholds
//! - [`sleep`] - watchdog-safe sleep and hibernation
//! - [`nvm`] - persistent counters and flags
//! - [`platform`] - hardware traits with mock and host implementations
//! - [`link`] - length-prefixed framing between simulator and ground tools

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::must_use_candidate)]

extern crate alloc;

pub mod agent;
pub mod config;
pub mod error;
pub mod link;
pub mod logging;
pub mod nvm;
pub mod packet;
pub mod platform;
pub mod power;
pub mod protocol;
pub mod retry;
pub mod satellite;
pub mod sleep;
pub mod telemetry;
pub mod watchdog;

// Re-export main public types for convenience
pub use agent::FlightAgent;
pub use config::Config;
pub use error::FswError;
pub use protocol::CommandProtocol;
pub use satellite::{PowerMode, Satellite};
