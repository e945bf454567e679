use super::MAX_PACKET_SIZE;
use core::slice::Chunks;

/// One radio-sized slice of a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Packet<'a> {
    /// Zero-based position within the payload.
    pub index: usize,
    pub total: usize,
    pub bytes: &'a [u8],
}

impl Packet<'_> {
    pub fn is_last(&self) -> bool {
        self.index + 1 == self.total
    }
}

/// Stateless fragmenter.
///
/// Fragmenting the same payload twice yields the same sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketManager {
    max_packet_size: usize,
}

impl Default for PacketManager {
    fn default() -> Self {
        Self::new(MAX_PACKET_SIZE)
    }
}

impl PacketManager {
    /// `max_packet_size` is clamped to `1..=MAX_PACKET_SIZE`.
    pub fn new(max_packet_size: usize) -> Self {
        Self {
            max_packet_size: max_packet_size.clamp(1, MAX_PACKET_SIZE),
        }
    }

    pub fn max_packet_size(&self) -> usize {
        self.max_packet_size
    }

    pub fn packet_count(&self, payload_len: usize) -> usize {
        payload_len.div_ceil(self.max_packet_size)
    }

    /// An empty payload produces no packets.
    pub fn fragment<'a>(&self, payload: &'a [u8]) -> Fragments<'a> {
        Fragments {
            chunks: payload.chunks(self.max_packet_size),
            index: 0,
            total: self.packet_count(payload.len()),
        }
    }
}

/// Ordered packets of one payload.
#[derive(Debug, Clone)]
pub struct Fragments<'a> {
    chunks: Chunks<'a, u8>,
    index: usize,
    total: usize,
}

impl<'a> Iterator for Fragments<'a> {
    type Item = Packet<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let bytes = self.chunks.next()?;
        let packet = Packet {
            index: self.index,
            total: self.total,
            bytes,
        };
        self.index += 1;
        Some(packet)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.chunks.size_hint()
    }
}

impl ExactSizeIterator for Fragments<'_> {}
