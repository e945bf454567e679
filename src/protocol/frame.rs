//! Uplink wire format.
//!
//! Long form:
//!
//! ```text
//! [0:4]   header, bit 0x08 of byte 3 marks a multi-message continuation
//! [4:8]   passcode
//! [8:10]  opcode
//! [10:..] arguments, optional
//! ```
//!
//! Short (repeat) form: `[4:6]` repeat code, `[6:..]` payload to echo.
//!
//! The two forms are told apart by length alone: ten bytes or more is a long
//! frame, six to nine bytes is a short frame.

use crate::config::{CODE_LEN, PASSCODE_LEN};
use crate::error::FrameError;
use core::fmt;
use serde::{Deserialize, Serialize};

pub const HEADER_LEN: usize = 4;
pub const OPCODE_LEN: usize = CODE_LEN;
pub const MIN_LONG_FRAME: usize = HEADER_LEN + PASSCODE_LEN + OPCODE_LEN;
pub const MIN_SHORT_FRAME: usize = HEADER_LEN + CODE_LEN;

/// Continuation bit in header byte 3.
pub const MULTI_MESSAGE_FLAG: u8 = 0x08;

const PASSCODE_AT: usize = HEADER_LEN;
const OPCODE_AT: usize = HEADER_LEN + PASSCODE_LEN;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Opcode(pub [u8; OPCODE_LEN]);

impl Opcode {
    pub const fn new(hi: u8, lo: u8) -> Self {
        Self([hi, lo])
    }

    pub fn as_bytes(&self) -> &[u8; OPCODE_LEN] {
        &self.0
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02X}{:02X}", self.0[0], self.0[1])
    }
}

/// Parsed view of a long frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandFrame<'a> {
    pub header: [u8; HEADER_LEN],
    pub passcode: [u8; PASSCODE_LEN],
    pub opcode: Opcode,
    pub args: Option<&'a [u8]>,
    body: &'a [u8],
}

impl<'a> CommandFrame<'a> {
    /// # Errors
    ///
    /// `FrameError::TooShort` below [`MIN_LONG_FRAME`] bytes.
    pub fn parse(bytes: &'a [u8]) -> Result<Self, FrameError> {
        if bytes.len() < MIN_LONG_FRAME {
            return Err(FrameError::TooShort {
                len: bytes.len(),
                min: MIN_LONG_FRAME,
            });
        }

        let mut header = [0; HEADER_LEN];
        header.copy_from_slice(&bytes[..HEADER_LEN]);
        let mut passcode = [0; PASSCODE_LEN];
        passcode.copy_from_slice(&bytes[PASSCODE_AT..OPCODE_AT]);
        let opcode = Opcode::new(bytes[OPCODE_AT], bytes[OPCODE_AT + 1]);

        let args = &bytes[MIN_LONG_FRAME..];
        Ok(Self {
            header,
            passcode,
            opcode,
            args: (!args.is_empty()).then_some(args),
            body: &bytes[OPCODE_AT..],
        })
    }

    pub fn is_multi_message(&self) -> bool {
        self.header[3] & MULTI_MESSAGE_FLAG != 0
    }

    /// Opcode and arguments, as echoed after `invalid cmd`.
    pub fn body(&self) -> &'a [u8] {
        self.body
    }
}

/// Parsed view of a short frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepeatFrame<'a> {
    pub code: [u8; CODE_LEN],
    pub payload: &'a [u8],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frame<'a> {
    Command(CommandFrame<'a>),
    Repeat(RepeatFrame<'a>),
}

impl<'a> Frame<'a> {
    /// Pick the frame form by length.
    ///
    /// # Errors
    ///
    /// `FrameError::TooShort` below [`MIN_SHORT_FRAME`] bytes.
    pub fn classify(bytes: &'a [u8]) -> Result<Self, FrameError> {
        if bytes.len() >= MIN_LONG_FRAME {
            return CommandFrame::parse(bytes).map(Frame::Command);
        }
        if bytes.len() < MIN_SHORT_FRAME {
            return Err(FrameError::TooShort {
                len: bytes.len(),
                min: MIN_SHORT_FRAME,
            });
        }
        let code = [bytes[HEADER_LEN], bytes[HEADER_LEN + 1]];
        Ok(Frame::Repeat(RepeatFrame {
            code,
            payload: &bytes[MIN_SHORT_FRAME..],
        }))
    }
}

/// Build a long frame with a zeroed header.
pub fn encode_long(
    passcode: &[u8; PASSCODE_LEN],
    opcode: Opcode,
    args: &[u8],
    multi_message: bool,
) -> Vec<u8> {
    let mut frame = Vec::with_capacity(MIN_LONG_FRAME + args.len());
    frame.extend_from_slice(&[0, 0, 0, 0]);
    if multi_message {
        frame[3] |= MULTI_MESSAGE_FLAG;
    }
    frame.extend_from_slice(passcode);
    frame.extend_from_slice(opcode.as_bytes());
    frame.extend_from_slice(args);
    frame
}

/// Build a short repeat frame. Payloads of four bytes or more make the frame
/// long enough to be read as a long frame instead.
pub fn encode_short(code: &[u8; CODE_LEN], payload: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(MIN_SHORT_FRAME + payload.len());
    frame.extend_from_slice(&[0, 0, 0, 0]);
    frame.extend_from_slice(code);
    frame.extend_from_slice(payload);
    frame
}
