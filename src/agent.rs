use crate::config::Config;
use crate::error::FswError;
use crate::logging::ErrorCounter;
use crate::nvm::NvmStore;
use crate::packet::PacketSender;
use crate::platform::{AlarmSleep, Clock, Delay, OutputPin, PowerMonitor, Radio, SystemControl};
use crate::power::{PowerHealth, PowerHealthMonitor, PowerReport};
use crate::protocol::{CommandContext, CommandProtocol, Outcome};
use crate::retry::RetryPolicy;
use crate::satellite::{PowerMode, Satellite};
use crate::sleep::SleepHelper;
use crate::telemetry::{beacon_text, Sensors, StateOfHealth};
use crate::watchdog::Watchdog;
use core::time::Duration;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Minimum spacing between beacon and state-of-health downlinks.
pub const BEACON_INTERVAL: Duration = Duration::from_secs(60);

/// Board resources handed to the agent at boot.
pub struct Hardware {
    pub nvm: NvmStore,
    pub clock: Box<dyn Clock>,
    pub watchdog_pin: Box<dyn OutputPin>,
    /// Drives the watchdog pulse.
    pub watchdog_delay: Box<dyn Delay>,
    /// Drives radio backoff and inter-packet spacing.
    pub radio_delay: Box<dyn Delay>,
    pub alarm: Box<dyn AlarmSleep>,
    pub radio: Box<dyn Radio>,
    pub system: Box<dyn SystemControl>,
    pub sensors: Sensors,
    pub power_monitor: Box<dyn PowerMonitor>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentStats {
    pub iterations: u64,
    pub frames_received: u32,
    pub commands_executed: u32,
    pub commands_failed: u32,
    pub frames_rejected: u32,
    pub downlinks_sent: u32,
    pub downlinks_failed: u32,
}

/// Result of one control-loop iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepReport {
    pub outcome: Option<Outcome>,
    pub telemetry_sent: bool,
}

/// The single cooperative control loop.
pub struct FlightAgent {
    config: Config,
    satellite: Satellite,
    sender: PacketSender,
    sleep: SleepHelper,
    protocol: CommandProtocol,
    system: Box<dyn SystemControl>,
    sensors: Sensors,
    power: PowerHealthMonitor,
    errors: ErrorCounter,

    last_beacon: Option<Duration>,
    last_power: Option<PowerReport>,
    stats: AgentStats,
}

impl core::fmt::Debug for FlightAgent {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FlightAgent")
            .field("satellite", &self.satellite)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl FlightAgent {
    /// Bring the flight core up.
    ///
    /// The watchdog and command table are set up before the boot is recorded in
    /// NVM, so a failed bring-up leaves the boot counter and soft-boot flag
    /// untouched.
    ///
    /// # Errors
    ///
    /// Fails when the NVM layout cannot be registered, the watchdog line
    /// cannot be initialized, or the command configuration is unusable.
    pub fn new(config: Config, hardware: Hardware, errors: ErrorCounter) -> Result<Self, FswError> {
        let Hardware {
            nvm,
            clock,
            watchdog_pin,
            watchdog_delay,
            radio_delay,
            alarm,
            radio,
            system,
            sensors,
            power_monitor,
        } = hardware;

        let watchdog = Watchdog::new(watchdog_pin, watchdog_delay, RetryPolicy::default())?;
        let protocol = CommandProtocol::new(&config)?;
        let satellite = Satellite::new(nvm, clock, &config)?;
        let protocol = protocol.with_seed(u64::from(satellite.boot_count()));
        let sleep = SleepHelper::new(watchdog, alarm, &config);
        let sender = PacketSender::new(radio, radio_delay, &config.radio);

        info!(
            name = %config.cubesat_name,
            boot_count = satellite.boot_count(),
            soft_boot = satellite.booted_soft(),
            use_fsk = satellite.use_fsk(),
            "flight agent ready"
        );

        Ok(Self {
            config,
            satellite,
            sender,
            sleep,
            protocol,
            system,
            sensors,
            power: PowerHealthMonitor::new(power_monitor),
            errors,
            last_beacon: None,
            last_power: None,
            stats: AgentStats::default(),
        })
    }

    /// One iteration: reboot check, pet, listen, downlink, sleep.
    pub fn step(&mut self) -> StepReport {
        self.stats.iterations += 1;
        debug!(iteration = self.stats.iterations, "control loop iteration");

        self.satellite.check_reboot(self.system.as_mut());
        self.sleep.watchdog_mut().pet();

        let outcome = self.listen();
        let telemetry_sent = self.downlink_if_due();

        self.sleep
            .safe_sleep(Duration::from_secs(self.config.sleep_duration));

        StepReport {
            outcome,
            telemetry_sent,
        }
    }

    /// Run `iterations` steps.
    pub fn run_for(&mut self, iterations: u64) {
        for _ in 0..iterations {
            self.step();
        }
    }

    pub fn run(&mut self) -> ! {
        loop {
            self.step();
        }
    }

    fn listen(&mut self) -> Option<Outcome> {
        let frame = self.sender.receive()?;
        self.stats.frames_received += 1;

        let mut ctx = CommandContext {
            satellite: &mut self.satellite,
            sender: &mut self.sender,
            sleep: &mut self.sleep,
            system: self.system.as_mut(),
            sensors: &mut self.sensors,
            errors: &self.errors,
        };
        let outcome = self.protocol.handle(&frame, &mut ctx);

        match outcome {
            Outcome::Executed(_) | Outcome::Echoed => self.stats.commands_executed += 1,
            Outcome::Failed(_) | Outcome::EchoFailed => self.stats.commands_failed += 1,
            Outcome::Dropped | Outcome::Unauthenticated | Outcome::InvalidOpcode(_) => {
                self.stats.frames_rejected += 1;
            }
        }
        Some(outcome)
    }

    fn downlink_if_due(&mut self) -> bool {
        let now = self.satellite.get_system_uptime();
        let due = self
            .last_beacon
            .map_or(true, |last| now.saturating_sub(last) >= BEACON_INTERVAL);
        if !due {
            return false;
        }
        self.last_beacon = Some(now);
        self.check_power();

        let beacon = beacon_text(
            &self.config.radio.license,
            self.satellite.name(),
            self.satellite.power_mode(),
            now,
            self.satellite.boot_count(),
            self.errors.get(),
        );
        let beacon_sent = self.sender.send_text(&beacon);

        let soh = StateOfHealth::collect(
            &mut self.satellite,
            &mut self.sender,
            &mut self.sensors,
            &self.errors,
        );
        let soh_sent = self.sender.send_text(&soh.to_string());

        for sent in [beacon_sent, soh_sent] {
            if sent {
                self.stats.downlinks_sent += 1;
            } else {
                self.stats.downlinks_failed += 1;
            }
        }
        if !(beacon_sent && soh_sent) {
            warn!(beacon_sent, soh_sent, "telemetry downlink incomplete");
        }
        beacon_sent && soh_sent
    }

    /// Grade the battery and record the averaged readings on the satellite.
    ///
    /// A critical battery forces critical power mode and turns the heater off.
    pub fn check_power(&mut self) -> PowerReport {
        let report = self.power.check(&self.config);
        self.satellite.battery_voltage = report.bus_voltage;
        self.satellite.charge_current = report.current;

        if report.health == PowerHealth::Critical {
            if self.satellite.power_mode() != PowerMode::Critical {
                self.satellite.powermode(PowerMode::Critical.as_str());
            }
            if self.config.heating {
                warn!(bus_voltage = ?report.bus_voltage, "heater disabled on critical battery");
                self.config.heating = false;
            }
        }
        if self.last_power.map(|last| last.health) != Some(report.health) {
            info!(health = %report.health, "power health changed");
        }
        self.last_power = Some(report);
        report
    }

    /// Most recent power health check, if one has run.
    pub fn power_report(&self) -> Option<PowerReport> {
        self.last_power
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn satellite(&self) -> &Satellite {
        &self.satellite
    }

    pub fn satellite_mut(&mut self) -> &mut Satellite {
        &mut self.satellite
    }

    pub fn sender_mut(&mut self) -> &mut PacketSender {
        &mut self.sender
    }

    pub fn stats(&self) -> AgentStats {
        self.stats
    }

    pub fn errors(&self) -> &ErrorCounter {
        &self.errors
    }
}
