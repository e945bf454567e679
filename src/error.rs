use thiserror::Error;

/// Failures of the non-volatile register store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NvmError {
    #[error("nvm is not available: {0}")]
    Unavailable(alloc::string::String),
    #[error("nvm index {index} outside store of {len} bytes")]
    OutOfRange { index: usize, len: usize },
    #[error("bit index {0} is not within a byte")]
    InvalidBit(u8),
    #[error("register {name} at byte {index} (mask {mask:#04x}) collides with {existing}")]
    Collision {
        name: &'static str,
        existing: &'static str,
        index: usize,
        mask: u8,
    },
}

/// Hardware bring-up failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HardwareError {
    #[error("{device} failed to initialize after {attempts} attempts")]
    InitFailed { device: &'static str, attempts: u8 },
    #[error("pin operation failed")]
    Pin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RadioError {
    #[error("radio send failed")]
    SendFailed,
    #[error("radio is not licensed to transmit")]
    NotLicensed,
    #[error("payload of {0} bytes exceeds radio packet size")]
    PayloadTooLarge(usize),
}

impl RadioError {
    /// Whether another attempt could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, RadioError::SendFailed)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("config io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config field {field}: {reason}")]
    Invalid {
        field: &'static str,
        reason: alloc::string::String,
    },
}

/// Outcome of a rejected typed configuration update.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigUpdateError {
    #[error("unknown config key {0}")]
    UnknownKey(alloc::string::String),
    #[error("config key {key} expects {expected}")]
    TypeMismatch {
        key: &'static str,
        expected: &'static str,
    },
    #[error("config key {key} out of range: {reason}")]
    RangeViolation {
        key: &'static str,
        reason: alloc::string::String,
    },
}

/// Inbound buffers that cannot hold any frame form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("frame of {len} bytes is shorter than the {min} byte minimum")]
    TooShort { len: usize, min: usize },
}

/// Failure of an individual command handler.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("command requires an argument")]
    MissingArgument,
    #[error("argument is not valid utf-8 text")]
    NotText,
    #[error("shutdown magic does not match")]
    BadMagic,
    #[error("unknown query {0}")]
    UnknownQuery(alloc::string::String),
    #[error("unknown operation {0}")]
    UnknownOperation(alloc::string::String),
    #[error("invalid argument for {operation}: {reason}")]
    InvalidArgument {
        operation: &'static str,
        reason: alloc::string::String,
    },
    #[error("no replies configured")]
    EmptyReplyList,
    #[error("command is not supported")]
    Unsupported,
    #[error("reply could not be transmitted")]
    ReplyFailed,
}

/// Construction-time failures surfaced to the boot code.
#[derive(Debug, Error)]
pub enum FswError {
    #[error(transparent)]
    Nvm(#[from] NvmError),
    #[error(transparent)]
    Hardware(#[from] HardwareError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}
