use clap::{App, AppSettings, Arg, ArgMatches, SubCommand};
use colored::*;
use cubesat_fsw::config::Config;
use cubesat_fsw::link;
use cubesat_fsw::protocol::table::{
    EXEC, FSK, HARD_RESET, JOKE_REPLY, NO_OP, QUERY, SHUTDOWN, SHUTDOWN_MAGIC,
};
use cubesat_fsw::protocol::{encode_long, encode_short, Opcode, Operation, Query};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time;

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: &str = "8080";
const DEFAULT_CONFIG: &str = "config/flight.json";

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[tokio::main]
async fn main() -> CliResult<()> {
    let query_names: Vec<&str> = Query::ALL.iter().map(Query::name).collect();

    let matches = App::new("cubesat-ground")
        .version("0.1.0")
        .author("Space Systems Engineering Team")
        .about("Ground station for the CubeSat simulator")
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .arg(
            Arg::with_name("host")
                .long("host")
                .value_name("HOST")
                .help("Simulator host address")
                .takes_value(true)
                .default_value(DEFAULT_HOST)
                .global(true),
        )
        .arg(
            Arg::with_name("port")
                .short("p")
                .long("port")
                .value_name("PORT")
                .help("Simulator port")
                .takes_value(true)
                .default_value(DEFAULT_PORT)
                .global(true),
        )
        .arg(
            Arg::with_name("config")
                .short("c")
                .long("config")
                .value_name("FILE")
                .help("Flight configuration holding the passcode and repeat code")
                .takes_value(true)
                .default_value(DEFAULT_CONFIG)
                .global(true),
        )
        .arg(
            Arg::with_name("wait")
                .short("w")
                .long("wait")
                .value_name("SECONDS")
                .help("How long to listen for downlink after sending")
                .takes_value(true)
                .default_value("5")
                .global(true),
        )
        .arg(
            Arg::with_name("continue")
                .long("continue")
                .help("Set the multi-message continuation flag")
                .global(true),
        )
        .subcommand(SubCommand::with_name("noop").about("No-op, logged on board only"))
        .subcommand(
            SubCommand::with_name("reset")
                .about("Hard reset of the flight computer")
                .arg(
                    Arg::with_name("confirm")
                        .long("confirm")
                        .help("Confirm the reset")
                        .required(true),
                ),
        )
        .subcommand(
            SubCommand::with_name("shutdown")
                .about("Set the shutdown flag and enter deep sleep")
                .arg(
                    Arg::with_name("confirm")
                        .long("confirm")
                        .help("Confirm the shutdown")
                        .required(true),
                ),
        )
        .subcommand(
            SubCommand::with_name("query")
                .about("Read one telemetry value")
                .arg(
                    Arg::with_name("name")
                        .required(true)
                        .possible_values(&query_names),
                ),
        )
        .subcommand(
            SubCommand::with_name("exec")
                .about("Run an operation, e.g. `exec power_mode minimum`")
                .arg(
                    Arg::with_name("operation")
                        .required(true)
                        .possible_values(&Operation::NAMES),
                )
                .arg(Arg::with_name("argument")),
        )
        .subcommand(SubCommand::with_name("joke").about("Ask for a joke reply"))
        .subcommand(SubCommand::with_name("fsk").about("Switch to FSK on next radio bring-up"))
        .subcommand(
            SubCommand::with_name("repeat")
                .about("Ask the satellite to echo up to three bytes")
                .arg(Arg::with_name("text").required(true)),
        )
        .subcommand(
            SubCommand::with_name("raw")
                .about("Send an arbitrary opcode")
                .arg(
                    Arg::with_name("opcode")
                        .required(true)
                        .help("Four hex digits, e.g. 8E62"),
                )
                .arg(Arg::with_name("args").help("Argument text")),
        )
        .subcommand(SubCommand::with_name("listen").about("Print downlink only"))
        .get_matches();

    let host = matches.value_of("host").unwrap_or(DEFAULT_HOST);
    let port: u16 = matches.value_of("port").unwrap_or(DEFAULT_PORT).parse()?;
    let wait = Duration::from_secs(matches.value_of("wait").unwrap_or("5").parse()?);
    let config = Config::load(matches.value_of("config").unwrap_or(DEFAULT_CONFIG))?;

    let frame = build_frame(&matches, &config)?;

    let mut stream = TcpStream::connect((host, port)).await?;
    println!("{} {}:{}", "Connected to".dimmed(), host, port);

    if let Some(frame) = frame {
        link::write_frame(&mut stream, &frame).await?;
        println!("{} {}", "⬆ uplink".bright_blue().bold(), hex(&frame).dimmed());
    }

    listen(&mut stream, wait).await
}

fn build_frame(matches: &ArgMatches<'_>, config: &Config) -> CliResult<Option<Vec<u8>>> {
    let passcode = config.passcode().ok_or("passcode must be 4 bytes")?;
    let multi = matches.is_present("continue");
    let long = |opcode: Opcode, args: &[u8]| Some(encode_long(&passcode, opcode, args, multi));

    let frame = match matches.subcommand() {
        ("noop", _) => long(NO_OP, &[]),
        ("reset", _) => long(HARD_RESET, &[]),
        ("shutdown", _) => long(SHUTDOWN, &SHUTDOWN_MAGIC),
        ("query", Some(sub)) => long(QUERY, sub.value_of("name").unwrap_or_default().as_bytes()),
        ("exec", Some(sub)) => {
            let mut text = sub.value_of("operation").unwrap_or_default().to_string();
            if let Some(argument) = sub.value_of("argument") {
                text.push(' ');
                text.push_str(argument);
            }
            long(EXEC, text.as_bytes())
        }
        ("joke", _) => long(JOKE_REPLY, &[]),
        ("fsk", _) => long(FSK, &[]),
        ("repeat", Some(sub)) => {
            let code = config.repeat_code_bytes().ok_or("repeat code must be 2 bytes")?;
            let text = sub.value_of("text").unwrap_or_default();
            if text.len() > 3 {
                return Err("repeat payload is limited to three bytes".into());
            }
            Some(encode_short(&code, text.as_bytes()))
        }
        ("raw", Some(sub)) => {
            let opcode = parse_opcode(sub.value_of("opcode").unwrap_or_default())?;
            long(opcode, sub.value_of("args").unwrap_or_default().as_bytes())
        }
        _ => None,
    };
    Ok(frame)
}

fn parse_opcode(text: &str) -> CliResult<Opcode> {
    if text.len() != 4 || !text.is_ascii() {
        return Err(format!("opcode {text} is not four hex digits").into());
    }
    let hi = u8::from_str_radix(&text[..2], 16)?;
    let lo = u8::from_str_radix(&text[2..], 16)?;
    Ok(Opcode::new(hi, lo))
}

fn hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}

async fn listen(stream: &mut TcpStream, wait: Duration) -> CliResult<()> {
    let deadline = time::Instant::now() + wait;
    loop {
        let packet = match time::timeout_at(deadline, link::read_frame(stream)).await {
            Err(_) => break,
            Ok(Ok(Some(packet))) => packet,
            Ok(Ok(None)) => {
                println!("{}", "link closed by simulator".yellow());
                break;
            }
            Ok(Err(e)) => return Err(e.into()),
        };
        print_downlink(&packet);
    }
    Ok(())
}

fn print_downlink(packet: &[u8]) {
    let label = "⬇ downlink".bright_green().bold();
    match core::str::from_utf8(packet) {
        Ok(text) if text == "ACK" => println!("{} {}", label, "ACK".bright_green()),
        Ok(text) if text.starts_with("cmd failed") => println!("{} {}", label, text.bright_red()),
        Ok(text) if text.starts_with("invalid cmd") => {
            println!("{} {}", label, "invalid cmd".yellow());
        }
        Ok(text) => println!("{} {}", label, text),
        Err(_) => println!("{} {}", label, hex(packet).dimmed()),
    }
}
