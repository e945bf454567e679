use super::NvmStore;

/// 8-bit counter occupying one whole NVM byte.
///
/// Incrementing past 255 wraps to 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Counter {
    index: usize,
}

impl Counter {
    pub(crate) fn new(index: usize) -> Self {
        Self { index }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn get(&self, store: &NvmStore) -> u8 {
        store.read(self.index)
    }

    pub fn increment(&self, store: &mut NvmStore) {
        let value = self.get(store).wrapping_add(1);
        store.write(self.index, value);
    }

    pub fn name(&self) -> String {
        format!("Counter_index_{}", self.index)
    }
}
