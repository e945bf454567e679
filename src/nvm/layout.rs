//! Build-time register table and the start-up registration step.
//!
//! The byte and bit assignments below are persisted across firmware upgrades
//! and must never be renumbered. New items take unused bytes or bits.

use super::{Counter, Flag, NvmStore};
use crate::error::NvmError;
use static_assertions::const_assert;
use tracing::debug;

pub const BOOT_COUNT_INDEX: usize = 0;
pub const FLAGS_INDEX: usize = 16;

pub const SOFTBOOT_BIT: u8 = 0;
pub const BROWNOUT_BIT: u8 = 3;
pub const USE_FSK_BIT: u8 = 4;
pub const SHUTDOWN_BIT: u8 = 5;
pub const BURNED_BIT: u8 = 6;

/// Smallest store that holds every register.
pub const MIN_NVM_SIZE: usize = FLAGS_INDEX + 1;

const_assert!(BOOT_COUNT_INDEX != FLAGS_INDEX);
const_assert!(BOOT_COUNT_INDEX < MIN_NVM_SIZE);
const_assert!(SOFTBOOT_BIT < 8 && BROWNOUT_BIT < 8 && USE_FSK_BIT < 8);
const_assert!(SHUTDOWN_BIT < 8 && BURNED_BIT < 8);
const_assert!(
    (1u8 << SOFTBOOT_BIT)
        ^ (1u8 << BROWNOUT_BIT)
        ^ (1u8 << USE_FSK_BIT)
        ^ (1u8 << SHUTDOWN_BIT)
        ^ (1u8 << BURNED_BIT)
        == (1u8 << SOFTBOOT_BIT)
            | (1u8 << BROWNOUT_BIT)
            | (1u8 << USE_FSK_BIT)
            | (1u8 << SHUTDOWN_BIT)
            | (1u8 << BURNED_BIT)
);

#[derive(Debug, Clone, Copy)]
struct Claim {
    name: &'static str,
    index: usize,
    mask: u8,
}

/// Hands out register descriptors and rejects overlapping claims.
#[derive(Debug)]
pub struct NvmRegistry {
    len: usize,
    claims: Vec<Claim>,
}

impl NvmRegistry {
    pub fn new(store: &NvmStore) -> Self {
        Self {
            len: store.len(),
            claims: Vec::new(),
        }
    }

    fn claim(&mut self, name: &'static str, index: usize, mask: u8) -> Result<(), NvmError> {
        if index >= self.len {
            return Err(NvmError::OutOfRange {
                index,
                len: self.len,
            });
        }
        if let Some(existing) = self
            .claims
            .iter()
            .find(|c| c.index == index && c.mask & mask != 0)
        {
            return Err(NvmError::Collision {
                name,
                existing: existing.name,
                index,
                mask,
            });
        }
        debug!(name, index, mask, "registered nvm item");
        self.claims.push(Claim { name, index, mask });
        Ok(())
    }

    /// # Errors
    ///
    /// Fails when the byte is out of range or any of its bits is claimed.
    pub fn counter(&mut self, name: &'static str, index: usize) -> Result<Counter, NvmError> {
        self.claim(name, index, 0xFF)?;
        Ok(Counter::new(index))
    }

    /// # Errors
    ///
    /// Fails when `bit` is not below 8, the byte is out of range, or the bit
    /// is already claimed.
    pub fn flag(&mut self, name: &'static str, index: usize, bit: u8) -> Result<Flag, NvmError> {
        if bit >= 8 {
            return Err(NvmError::InvalidBit(bit));
        }
        self.claim(name, index, 1 << bit)?;
        Ok(Flag::new(index, bit))
    }
}

/// Every persistent item the satellite owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SatelliteRegisters {
    pub boot_count: Counter,
    pub softboot: Flag,
    pub brownout: Flag,
    pub use_fsk: Flag,
    pub shutdown: Flag,
    pub burned: Flag,
}

impl SatelliteRegisters {
    /// Register the fixed table against `store`.
    ///
    /// # Errors
    ///
    /// Fails fast if the store is too small or the table overlaps itself.
    pub fn register(store: &NvmStore) -> Result<Self, NvmError> {
        let mut registry = NvmRegistry::new(store);
        Ok(Self {
            boot_count: registry.counter("boot_count", BOOT_COUNT_INDEX)?,
            softboot: registry.flag("softboot", FLAGS_INDEX, SOFTBOOT_BIT)?,
            brownout: registry.flag("brownout", FLAGS_INDEX, BROWNOUT_BIT)?,
            use_fsk: registry.flag("use_fsk", FLAGS_INDEX, USE_FSK_BIT)?,
            shutdown: registry.flag("shutdown", FLAGS_INDEX, SHUTDOWN_BIT)?,
            burned: registry.flag("burned", FLAGS_INDEX, BURNED_BIT)?,
        })
    }
}
