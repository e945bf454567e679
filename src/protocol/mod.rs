//! Command & Data Handling
//!
//! One inbound buffer at a time is classified by length, authenticated
//! against the configured passcode and dispatched through a fixed
//! [`CommandTable`] to a closed set of [`Handler`]s. Nothing in a frame can
//! name code to run: query and exec arguments select entries of the
//! [`Query`] and [`Operation`] registries.
//!
//! Error policy:
//! - wrong passcode: dropped silently, logged at debug level
//! - too short, unknown repeat code: dropped, logged
//! - unknown opcode: `invalid cmd` plus the frame body is sent back
//! - handler failure: logged at error level, the fixed text `cmd failed` is
//!   sent back
//!
//! None of these stop the control loop.

pub mod frame;
pub mod registry;
pub mod table;

pub use frame::{encode_long, encode_short, CommandFrame, Frame, Opcode, RepeatFrame};
pub use registry::{Operation, Query};
pub use table::{CommandTable, Handler, SHUTDOWN_MAGIC};

use crate::config::{Config, CODE_LEN, PASSCODE_LEN};
use crate::error::{CommandError, ConfigError};
use crate::logging::ErrorCounter;
use crate::packet::{PacketSender, ACK};
use crate::platform::SystemControl;
use crate::satellite::Satellite;
use crate::sleep::SleepHelper;
use crate::telemetry::{beacon_text, Sensors, StateOfHealth};
use core::time::Duration;
use tracing::{debug, error, info, warn};

pub const INVALID_CMD: &[u8] = b"invalid cmd";
pub const CMD_FAILED: &[u8] = b"cmd failed";

/// Chained frames followed after one inbound message.
pub const MAX_CONTINUATIONS: usize = 8;

const RNG_SEED: u64 = 0x1234_5678_9ABC_DEF0;

/// Everything a handler may touch.
pub struct CommandContext<'a> {
    pub satellite: &'a mut Satellite,
    pub sender: &'a mut PacketSender,
    pub sleep: &'a mut SleepHelper,
    pub system: &'a mut dyn SystemControl,
    pub sensors: &'a mut Sensors,
    pub errors: &'a ErrorCounter,
}

/// What happened to the last frame of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Dropped,
    Unauthenticated,
    Executed(Handler),
    Failed(Handler),
    InvalidOpcode(Opcode),
    Echoed,
    EchoFailed,
}

pub struct CommandProtocol {
    table: CommandTable,
    passcode: [u8; PASSCODE_LEN],
    repeat_code: [u8; CODE_LEN],
    jokes: Vec<String>,
    joke_reply: Vec<String>,
    license: String,
    rng_state: u64,
}

impl core::fmt::Debug for CommandProtocol {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CommandProtocol")
            .field("table", &self.table)
            .field("jokes", &self.jokes.len())
            .field("joke_reply", &self.joke_reply.len())
            .finish_non_exhaustive()
    }
}

fn reply(sender: &mut PacketSender, bytes: &[u8]) -> Result<(), CommandError> {
    if sender.send(bytes) {
        Ok(())
    } else {
        Err(CommandError::ReplyFailed)
    }
}

fn argument_text(args: Option<&[u8]>) -> Result<&str, CommandError> {
    let bytes = args.ok_or(CommandError::MissingArgument)?;
    core::str::from_utf8(bytes).map_err(|_| CommandError::NotText)
}

impl CommandProtocol {
    /// # Errors
    ///
    /// `ConfigError::Invalid` if the passcode or repeat code has the wrong
    /// length, or the update-config opcode collides with a fixed one.
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        let passcode = config.passcode().ok_or(ConfigError::Invalid {
            field: "super_secret_code",
            reason: format!("must be exactly {PASSCODE_LEN} bytes"),
        })?;
        let repeat_code = config.repeat_code_bytes().ok_or(ConfigError::Invalid {
            field: "repeat_code",
            reason: format!("must be exactly {CODE_LEN} bytes"),
        })?;
        let update_config = config
            .update_config_opcode()
            .map(|[hi, lo]| Opcode::new(hi, lo));

        Ok(Self {
            table: CommandTable::new(update_config)?,
            passcode,
            repeat_code,
            jokes: config.jokes.clone(),
            joke_reply: config.joke_reply.clone(),
            license: config.radio.license.clone(),
            rng_state: RNG_SEED,
        })
    }

    /// Reseed the reply picker, e.g. from the boot count.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng_state = RNG_SEED ^ seed;
        self
    }

    pub fn table(&self) -> &CommandTable {
        &self.table
    }

    /// Process one inbound message, following continuation frames.
    pub fn handle(&mut self, frame: &[u8], ctx: &mut CommandContext<'_>) -> Outcome {
        let (mut outcome, mut more) = self.dispatch(frame, ctx);
        let mut chained = 0;

        while more {
            if chained == MAX_CONTINUATIONS {
                warn!(chained, "continuation limit reached, ignoring further frames");
                break;
            }
            chained += 1;

            let Some(next) = ctx.sender.receive() else {
                debug!(chained, "no continuation frame received");
                break;
            };
            (outcome, more) = self.dispatch(&next, ctx);
        }

        outcome
    }

    /// Returns the outcome and whether a continuation frame is expected.
    fn dispatch(&mut self, bytes: &[u8], ctx: &mut CommandContext<'_>) -> (Outcome, bool) {
        let frame = match Frame::classify(bytes) {
            Ok(frame) => frame,
            Err(e) => {
                info!(error = %e, "unrecognized frame dropped");
                return (Outcome::Dropped, false);
            }
        };

        match frame {
            Frame::Repeat(repeat) if repeat.code == self.repeat_code => {
                debug!(bytes = repeat.payload.len(), "repeat request");
                match ctx.sender.send_once(repeat.payload) {
                    Ok(()) => (Outcome::Echoed, false),
                    Err(e) => {
                        warn!(error = %e, "repeat echo failed");
                        (Outcome::EchoFailed, false)
                    }
                }
            }
            Frame::Repeat(_) => {
                info!(len = bytes.len(), "unrecognized short frame dropped");
                (Outcome::Dropped, false)
            }
            Frame::Command(command) => {
                if command.passcode != self.passcode {
                    debug!("passcode mismatch, frame dropped");
                    return (Outcome::Unauthenticated, false);
                }
                match self.table.lookup(command.opcode) {
                    Some(handler) => (self.run(handler, command.args, ctx), false),
                    None => {
                        warn!(opcode = %command.opcode, "invalid command");
                        let mut response = INVALID_CMD.to_vec();
                        response.extend_from_slice(command.body());
                        if !ctx.sender.send(&response) {
                            warn!("invalid command reply not sent");
                        }
                        (
                            Outcome::InvalidOpcode(command.opcode),
                            command.is_multi_message(),
                        )
                    }
                }
            }
        }
    }

    fn run(
        &mut self,
        handler: Handler,
        args: Option<&[u8]>,
        ctx: &mut CommandContext<'_>,
    ) -> Outcome {
        info!(%handler, args = args.map_or(0, <[u8]>::len), "executing command");
        match self.execute(handler, args, ctx) {
            Ok(()) => Outcome::Executed(handler),
            Err(e) => {
                error!(%handler, error = %e, "command failed");
                if !ctx.sender.send(CMD_FAILED) {
                    warn!("failure reply not sent");
                }
                Outcome::Failed(handler)
            }
        }
    }

    fn execute(
        &mut self,
        handler: Handler,
        args: Option<&[u8]>,
        ctx: &mut CommandContext<'_>,
    ) -> Result<(), CommandError> {
        match handler {
            Handler::NoOp => {
                info!("no-op");
                Ok(())
            }
            Handler::HardReset => {
                if !ctx.sender.send_ack() {
                    warn!("reset acknowledgement not sent");
                }
                error!(critical = true, "hard reset commanded");
                ctx.system.reset()
            }
            Handler::Shutdown => {
                let magic = args.ok_or(CommandError::MissingArgument)?;
                if magic != SHUTDOWN_MAGIC.as_slice() {
                    return Err(CommandError::BadMagic);
                }
                error!(critical = true, "shutdown commanded, entering deep sleep");
                ctx.satellite.set_shutdown(true);
                ctx.system.deep_sleep()
            }
            Handler::Query => {
                let query = Query::parse(argument_text(args)?)?;
                debug!(query = query.name(), "query");
                let result = query.evaluate(ctx);
                reply(ctx.sender, result.as_bytes())
            }
            Handler::Exec => {
                let operation = Operation::parse(argument_text(args)?)?;
                self.perform(operation, ctx)
            }
            Handler::JokeReply => {
                let index = self.pick(self.joke_reply.len())?;
                let joke = self.joke_reply[index].clone();
                reply(ctx.sender, joke.as_bytes())
            }
            Handler::Fsk => {
                ctx.satellite.set_use_fsk(true);
                info!("FSK modulation selected for next radio bring-up");
                reply(ctx.sender, ACK)
            }
            Handler::UpdateConfig => Err(CommandError::Unsupported),
        }
    }

    fn perform(
        &mut self,
        operation: Operation,
        ctx: &mut CommandContext<'_>,
    ) -> Result<(), CommandError> {
        info!(operation = operation.name(), "exec");
        match operation {
            Operation::PowerMode(mode) => {
                ctx.satellite.powermode(mode.as_str());
                reply(ctx.sender, ACK)
            }
            Operation::ShortHibernate => {
                reply(ctx.sender, ACK)?;
                ctx.sleep.short_hibernate(ctx.satellite);
                Ok(())
            }
            Operation::LongHibernate => {
                reply(ctx.sender, ACK)?;
                ctx.sleep.long_hibernate(ctx.satellite);
                Ok(())
            }
            Operation::Beacon => {
                let uptime = ctx.satellite.get_system_uptime();
                let text = beacon_text(
                    &self.license,
                    ctx.satellite.name(),
                    ctx.satellite.power_mode(),
                    uptime,
                    ctx.satellite.boot_count(),
                    ctx.errors.get(),
                );
                reply(ctx.sender, text.as_bytes())
            }
            Operation::StateOfHealth => {
                let soh =
                    StateOfHealth::collect(ctx.satellite, ctx.sender, ctx.sensors, ctx.errors);
                reply(ctx.sender, soh.to_string().as_bytes())
            }
            Operation::Joke => {
                let index = self.pick(self.jokes.len())?;
                let joke = self.jokes[index].clone();
                reply(ctx.sender, joke.as_bytes())
            }
            Operation::ClearBrownout => {
                ctx.satellite.set_brownout(false);
                reply(ctx.sender, ACK)
            }
            Operation::Sleep(seconds) => {
                reply(ctx.sender, ACK)?;
                ctx.sleep.safe_sleep(Duration::from_secs(seconds));
                Ok(())
            }
        }
    }

    fn next_random(&mut self) -> u64 {
        // Linear Congruential Generator, Numerical Recipes parameters
        self.rng_state = self
            .rng_state
            .wrapping_mul(1_664_525)
            .wrapping_add(1_013_904_223);
        self.rng_state
    }

    fn pick(&mut self, len: usize) -> Result<usize, CommandError> {
        if len == 0 {
            return Err(CommandError::EmptyReplyList);
        }
        Ok((self.next_random() >> 16) as usize % len)
    }
}
