#![allow(dead_code)]

use cubesat_fsw::agent::Hardware;
use cubesat_fsw::config::Config;
use cubesat_fsw::logging::ErrorCounter;
use cubesat_fsw::nvm::NvmStore;
use cubesat_fsw::packet::PacketSender;
use cubesat_fsw::platform::mock::{MockBoard, MockEvent, MockRadio, MockSystem};
use cubesat_fsw::protocol::{CommandContext, CommandProtocol, Outcome};
use cubesat_fsw::retry::RetryPolicy;
use cubesat_fsw::satellite::Satellite;
use cubesat_fsw::sleep::SleepHelper;
use cubesat_fsw::telemetry::Sensors;
use cubesat_fsw::watchdog::Watchdog;
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Duration;

pub const NVM_SIZE: usize = 64;
pub const PASSCODE: &[u8; 4] = b"p4ss";
pub const REPEAT_CODE: &[u8; 2] = b"RP";

pub fn flight_config() -> Config {
    Config::from_json(include_str!("../../config/flight.json")).unwrap()
}

pub fn hardware(board: &MockBoard, radio: &MockRadio, system: &MockSystem, nvm: NvmStore) -> Hardware {
    Hardware {
        nvm,
        clock: Box::new(board.clock()),
        watchdog_pin: Box::new(board.pin()),
        watchdog_delay: Box::new(board.delay()),
        radio_delay: Box::new(board.delay()),
        alarm: Box::new(board.alarm()),
        radio: Box::new(radio.clone()),
        system: Box::new(system.clone()),
        sensors: Sensors::default(),
        power_monitor: Box::new(board.power_monitor()),
    }
}

/// Runs `f` and returns the panic payload, if any.
pub fn unwind<F: FnOnce()>(f: F) -> Option<Box<dyn Any + Send>> {
    catch_unwind(AssertUnwindSafe(f)).err()
}

/// Simulated seconds between consecutive watchdog pulses.
pub fn pet_gaps(events: &[MockEvent]) -> Vec<Duration> {
    let mut now = Duration::ZERO;
    let mut last_pet: Option<Duration> = None;
    let mut gaps = Vec::new();
    for event in events {
        match event {
            MockEvent::Delay(d) | MockEvent::Sleep(d) => now += *d,
            MockEvent::PinHigh => {
                if let Some(last) = last_pet {
                    gaps.push(now - last);
                }
                last_pet = Some(now);
            }
            _ => {}
        }
    }
    gaps
}

/// Every collaborator of the command protocol wired to one mock board.
pub struct Rig {
    pub board: MockBoard,
    pub radio: MockRadio,
    pub system: MockSystem,
    pub config: Config,
    pub satellite: Satellite,
    pub sender: PacketSender,
    pub sleep: SleepHelper,
    pub sensors: Sensors,
    pub errors: ErrorCounter,
    pub protocol: CommandProtocol,
}

impl Rig {
    pub fn new() -> Self {
        Self::with_config(flight_config())
    }

    pub fn with_config(config: Config) -> Self {
        let board = MockBoard::new();
        let radio = board.radio();
        let system = board.system();

        let satellite = Satellite::new(
            NvmStore::in_memory(NVM_SIZE).unwrap(),
            Box::new(board.clock()),
            &config,
        )
        .unwrap();
        let watchdog = Watchdog::new(
            Box::new(board.pin()),
            Box::new(board.delay()),
            RetryPolicy::default(),
        )
        .unwrap();
        let sleep = SleepHelper::new(watchdog, Box::new(board.alarm()), &config);
        let sender = PacketSender::new(
            Box::new(radio.clone()),
            Box::new(board.delay()),
            &config.radio,
        );
        let protocol = CommandProtocol::new(&config).unwrap();
        board.clear_events();

        Self {
            board,
            radio,
            system,
            config,
            satellite,
            sender,
            sleep,
            sensors: Sensors::default(),
            errors: ErrorCounter::new(),
            protocol,
        }
    }

    pub fn handle(&mut self, frame: &[u8]) -> Outcome {
        let mut system = self.system.clone();
        let mut ctx = CommandContext {
            satellite: &mut self.satellite,
            sender: &mut self.sender,
            sleep: &mut self.sleep,
            system: &mut system,
            sensors: &mut self.sensors,
            errors: &self.errors,
        };
        self.protocol.handle(frame, &mut ctx)
    }

    pub fn sent_text(&self) -> Vec<String> {
        self.board
            .sent()
            .into_iter()
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
            .collect()
    }
}
