use clap::{App, Arg};
use cubesat_fsw::agent::{FlightAgent, Hardware};
use cubesat_fsw::config::Config;
use cubesat_fsw::error::{FswError, RadioError};
use cubesat_fsw::link;
use cubesat_fsw::logging;
use cubesat_fsw::nvm::{FileNvm, NvmStore, SatelliteRegisters};
use cubesat_fsw::platform::host::{
    FixedPowerMonitor, FixedTemperature, HostAlarm, HostClock, HostDelay, HostPin, HostSystem,
};
use cubesat_fsw::platform::{FrameBuffer, Modulation, Radio};
use cubesat_fsw::telemetry::Sensors;
use std::sync::mpsc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

const DEFAULT_CONFIG: &str = "config/flight.json";
const DEFAULT_NVM: &str = "cubesat.nvm";
const DEFAULT_PORT: &str = "8080";
const NVM_SIZE: usize = 64;
const DOWNLINK_BUFFER_SIZE: usize = 256;
const RECEIVE_TIMEOUT: Duration = Duration::from_millis(500);

/// Radio bridged onto the TCP link: uplink frames arrive on a channel,
/// downlink packets are broadcast to every connected ground client.
struct LinkRadio {
    uplink: mpsc::Receiver<Vec<u8>>,
    downlink: broadcast::Sender<Vec<u8>>,
    modulation: Modulation,
}

impl Radio for LinkRadio {
    fn send(&mut self, data: &[u8]) -> Result<(), RadioError> {
        // No listener is still a successful transmission.
        if self.downlink.send(data.to_vec()).is_err() {
            debug!(bytes = data.len(), "transmitted with no ground station listening");
        }
        Ok(())
    }

    fn receive(&mut self) -> Option<FrameBuffer> {
        let frame = self.uplink.recv_timeout(RECEIVE_TIMEOUT).ok()?;
        let mut buffer = FrameBuffer::new();
        if buffer.extend_from_slice(&frame).is_err() {
            warn!(bytes = frame.len(), "uplink frame exceeds radio buffer, dropped");
            return None;
        }
        Some(buffer)
    }

    fn temperature(&mut self) -> Option<f32> {
        Some(27.0)
    }

    fn modulation(&self) -> Modulation {
        self.modulation
    }
}

fn fly(
    config: Config,
    nvm_path: &str,
    speedup: u32,
    uplink: mpsc::Receiver<Vec<u8>>,
    downlink: broadcast::Sender<Vec<u8>>,
    errors: logging::ErrorCounter,
) -> Result<(), FswError> {
    let nvm = NvmStore::new(Box::new(FileNvm::open(nvm_path, NVM_SIZE)?))?;

    // Radio modulation is chosen at bring-up from the persisted flag.
    let registers = SatelliteRegisters::register(&nvm)?;
    let modulation = if registers.use_fsk.get(&nvm) {
        Modulation::Fsk
    } else {
        Modulation::LoRa
    };
    info!(%modulation, "radio bring-up");

    let hardware = Hardware {
        nvm,
        clock: Box::new(HostClock::new()),
        watchdog_pin: Box::new(HostPin::new("watchdog")),
        watchdog_delay: Box::new(HostDelay),
        radio_delay: Box::new(HostDelay),
        alarm: Box::new(HostAlarm::new(speedup)),
        radio: Box::new(LinkRadio {
            uplink,
            downlink,
            modulation,
        }),
        system: Box::new(HostSystem),
        sensors: Sensors {
            mcu: Some(Box::new(FixedTemperature(Some(31.5)))),
            imu: Some(Box::new(FixedTemperature(None))),
        },
        power_monitor: Box::new(FixedPowerMonitor {
            bus_voltage: Some(7.4),
            current: Some(0.5),
            shunt_ohms: 0.1,
        }),
    };

    let mut agent = FlightAgent::new(config, hardware, errors)?;
    agent.run()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let matches = App::new("cubesat-simulator")
        .version("0.1.0")
        .author("Space Systems Engineering Team")
        .about("Runs the flight software on the host with a TCP ground link")
        .arg(
            Arg::with_name("config")
                .short("c")
                .long("config")
                .value_name("FILE")
                .help("Flight configuration")
                .takes_value(true)
                .default_value(DEFAULT_CONFIG),
        )
        .arg(
            Arg::with_name("nvm")
                .long("nvm")
                .value_name("FILE")
                .help("File backing the persistent store")
                .takes_value(true)
                .default_value(DEFAULT_NVM),
        )
        .arg(
            Arg::with_name("port")
                .short("p")
                .long("port")
                .value_name("PORT")
                .help("Ground link port")
                .takes_value(true)
                .default_value(DEFAULT_PORT),
        )
        .arg(
            Arg::with_name("speedup")
                .long("speedup")
                .value_name("FACTOR")
                .help("Compress sleep time by this factor")
                .takes_value(true)
                .default_value("1"),
        )
        .get_matches();

    let config_path = matches.value_of("config").unwrap_or(DEFAULT_CONFIG);
    let nvm_path = matches.value_of("nvm").unwrap_or(DEFAULT_NVM).to_string();
    let port: u16 = matches.value_of("port").unwrap_or(DEFAULT_PORT).parse()?;
    let speedup: u32 = matches.value_of("speedup").unwrap_or("1").parse()?;

    let config = Config::load(config_path)?;
    let errors = logging::init(if config.debug { "debug" } else { "info" });

    let (uplink_tx, uplink_rx) = mpsc::channel();
    let (downlink_tx, _) = broadcast::channel(DOWNLINK_BUFFER_SIZE);

    let listener = TcpListener::bind(format!("127.0.0.1:{port}")).await?;
    info!(port, "ground link listening");

    let flight_downlink = downlink_tx.clone();
    let mut flight = tokio::task::spawn_blocking(move || {
        fly(config, &nvm_path, speedup, uplink_rx, flight_downlink, errors)
    });

    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, addr)) => {
                    info!(%addr, "ground station connected");
                    let uplink = uplink_tx.clone();
                    let downlink = downlink_tx.subscribe();
                    tokio::spawn(async move {
                        if let Err(e) = handle_ground(stream, uplink, downlink).await {
                            warn!(%addr, error = %e, "ground link error");
                        }
                        info!(%addr, "ground station disconnected");
                    });
                }
                Err(e) => error!(error = %e, "failed to accept connection"),
            },
            finished = &mut flight => {
                match finished {
                    Ok(Err(e)) => error!(critical = true, error = %e, "flight software failed to start"),
                    Ok(Ok(())) => info!("flight software stopped"),
                    Err(e) => error!(critical = true, error = %e, "flight loop aborted"),
                }
                break;
            }
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted, stopping simulator");
                break;
            }
        }
    }

    Ok(())
}

async fn handle_ground(
    stream: TcpStream,
    uplink: mpsc::Sender<Vec<u8>>,
    mut downlink: broadcast::Receiver<Vec<u8>>,
) -> std::io::Result<()> {
    let (mut reader, mut writer) = stream.into_split();

    let forward = tokio::spawn(async move {
        loop {
            match downlink.recv().await {
                Ok(packet) => {
                    if let Err(e) = link::write_frame(&mut writer, &packet).await {
                        warn!(error = %e, "downlink write failed");
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "ground client lagging, packets skipped");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    while let Some(frame) = link::read_frame(&mut reader).await? {
        debug!(bytes = frame.len(), "uplink frame");
        if uplink.send(frame).is_err() {
            warn!("flight loop is gone, dropping uplink");
            break;
        }
    }

    forward.abort();
    Ok(())
}
