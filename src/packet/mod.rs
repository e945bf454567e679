//! Outbound packet pipeline
//!
//! [`PacketManager`] splits a payload into radio-sized [`Packet`]s and
//! [`PacketSender`] pushes them through the radio, retrying each one under a
//! bounded backoff policy. A send either delivers every packet in order or
//! reports failure; it never raises past the caller.

pub mod manager;
pub mod sender;

pub use manager::{Fragments, Packet, PacketManager};
pub use sender::PacketSender;

/// Largest packet the radio accepts.
pub const MAX_PACKET_SIZE: usize = 245;

/// Acknowledgement payload.
pub const ACK: &[u8] = b"ACK";
