use super::NvmStore;

/// Single persistent bit within an NVM byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Flag {
    index: usize,
    bit: u8,
    mask: u8,
}

impl Flag {
    /// `bit` must be below 8; the registry checks this.
    pub(crate) fn new(index: usize, bit: u8) -> Self {
        Self {
            index,
            bit,
            mask: 1 << bit,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn bit(&self) -> u8 {
        self.bit
    }

    pub fn mask(&self) -> u8 {
        self.mask
    }

    pub fn get(&self, store: &NvmStore) -> bool {
        store.read(self.index) & self.mask != 0
    }

    /// Set or clear this bit; other bits of the byte are left untouched.
    pub fn toggle(&self, store: &mut NvmStore, value: bool) {
        let byte = store.read(self.index);
        let updated = if value {
            byte | self.mask
        } else {
            byte & !self.mask
        };
        store.write(self.index, updated);
    }

    pub fn name(&self) -> String {
        format!("Flag_index_{}_bit_{}", self.index, self.bit)
    }
}
