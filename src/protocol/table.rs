use super::frame::Opcode;
use crate::error::ConfigError;
use heapless::Vec;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const NO_OP: Opcode = Opcode::new(0x8E, 0x62);
pub const HARD_RESET: Opcode = Opcode::new(0xD4, 0x9F);
pub const SHUTDOWN: Opcode = Opcode::new(0x12, 0x06);
pub const QUERY: Opcode = Opcode::new(0x38, 0x93);
pub const EXEC: Opcode = Opcode::new(0x96, 0x06);
pub const JOKE_REPLY: Opcode = Opcode::new(0xA5, 0xB4);
pub const FSK: Opcode = Opcode::new(0x56, 0xC4);

/// Argument the shutdown command must carry.
pub const SHUTDOWN_MAGIC: [u8; 4] = [0x0B, 0xFD, 0x49, 0xEC];

const MAX_ENTRIES: usize = 8;

/// Every command the satellite can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Handler {
    NoOp,
    HardReset,
    Shutdown,
    Query,
    Exec,
    JokeReply,
    Fsk,
    UpdateConfig,
}

impl Handler {
    pub fn name(&self) -> &'static str {
        match self {
            Handler::NoOp => "no-op",
            Handler::HardReset => "hard-reset",
            Handler::Shutdown => "shutdown",
            Handler::Query => "query",
            Handler::Exec => "exec",
            Handler::JokeReply => "joke-reply",
            Handler::Fsk => "fsk",
            Handler::UpdateConfig => "update-config",
        }
    }
}

impl core::fmt::Display for Handler {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

/// Fixed opcode to handler mapping, built once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTable {
    entries: Vec<(Opcode, Handler), MAX_ENTRIES>,
}

impl CommandTable {
    /// Static opcodes plus the configured update-config opcode, if any.
    ///
    /// # Errors
    ///
    /// `ConfigError::Invalid` when the configured opcode shadows a static one.
    pub fn new(update_config: Option<Opcode>) -> Result<Self, ConfigError> {
        let mut entries = Vec::new();
        for entry in [
            (NO_OP, Handler::NoOp),
            (HARD_RESET, Handler::HardReset),
            (SHUTDOWN, Handler::Shutdown),
            (QUERY, Handler::Query),
            (EXEC, Handler::Exec),
            (JOKE_REPLY, Handler::JokeReply),
            (FSK, Handler::Fsk),
        ] {
            // NASA Rule 5: the static table fits by construction
            let pushed = entries.push(entry);
            debug_assert!(pushed.is_ok(), "static command table overflow");
        }

        let mut table = Self { entries };
        if let Some(opcode) = update_config {
            if let Some(existing) = table.lookup(opcode) {
                return Err(ConfigError::Invalid {
                    field: "update_config_code",
                    reason: format!("opcode {opcode} already bound to {existing}"),
                });
            }
            table
                .entries
                .push((opcode, Handler::UpdateConfig))
                .map_err(|_| ConfigError::Invalid {
                    field: "update_config_code",
                    reason: "command table is full".to_string(),
                })?;
        }

        debug!(entries = table.entries.len(), "command table built");
        Ok(table)
    }

    pub fn lookup(&self, opcode: Opcode) -> Option<Handler> {
        self.entries
            .iter()
            .find(|(code, _)| *code == opcode)
            .map(|(_, handler)| *handler)
    }

    pub fn opcode_of(&self, handler: Handler) -> Option<Opcode> {
        self.entries
            .iter()
            .find(|(_, h)| *h == handler)
            .map(|(code, _)| *code)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
