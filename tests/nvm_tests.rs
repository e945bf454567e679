use cubesat_fsw::error::NvmError;
use cubesat_fsw::nvm::layout::{
    BOOT_COUNT_INDEX, BROWNOUT_BIT, FLAGS_INDEX, MIN_NVM_SIZE, SOFTBOOT_BIT,
};
use cubesat_fsw::nvm::{FileNvm, MemoryNvm, NvmRegistry, NvmStore, SatelliteRegisters};
use proptest::prelude::*;

#[cfg(test)]
mod store_tests {
    use super::*;

    #[test]
    fn test_zero_capacity_medium_is_unavailable() {
        let result = NvmStore::in_memory(0);
        assert!(matches!(result, Err(NvmError::Unavailable(_))));
    }

    #[test]
    fn test_store_reports_medium_length() {
        let store = NvmStore::in_memory(32).unwrap();
        assert_eq!(store.len(), 32);
        assert!(!store.is_empty());
        assert_eq!(store.byte(31), 0);
    }

    #[test]
    fn test_file_nvm_survives_reopen() {
        let path = std::env::temp_dir().join(format!("cubesat-nvm-{}.bin", std::process::id()));
        let _ = std::fs::remove_file(&path);

        {
            let mut store = NvmStore::new(Box::new(FileNvm::open(&path, 32).unwrap())).unwrap();
            let mut registry = NvmRegistry::new(&store);
            let counter = registry.counter("reboots", 2).unwrap();
            counter.increment(&mut store);
            counter.increment(&mut store);
        }

        let store = NvmStore::new(Box::new(FileNvm::open(&path, 32).unwrap())).unwrap();
        assert_eq!(store.byte(2), 2);
        assert_eq!(store.len(), 32);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_file_nvm_rejects_size_mismatch() {
        let path = std::env::temp_dir().join(format!("cubesat-nvm-size-{}.bin", std::process::id()));
        let mut persisted = vec![0u8; 48];
        persisted[40] = 7;
        std::fs::write(&path, &persisted).unwrap();

        assert!(matches!(FileNvm::open(&path, 32), Err(NvmError::Unavailable(_))));
        assert!(matches!(FileNvm::open(&path, 64), Err(NvmError::Unavailable(_))));
        assert_eq!(std::fs::read(&path).unwrap(), persisted);

        let store = NvmStore::new(Box::new(FileNvm::open(&path, 48).unwrap())).unwrap();
        assert_eq!(store.byte(40), 7);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_file_nvm_sizes_empty_file() {
        let path = std::env::temp_dir().join(format!("cubesat-nvm-empty-{}.bin", std::process::id()));
        std::fs::write(&path, b"").unwrap();

        let store = NvmStore::new(Box::new(FileNvm::open(&path, 16).unwrap())).unwrap();
        assert_eq!(store.len(), 16);
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 16);

        let _ = std::fs::remove_file(&path);
    }
}

#[cfg(test)]
mod counter_tests {
    use super::*;

    #[test]
    fn test_counter_starts_at_stored_value() {
        let mut bytes = [0u8; 8];
        bytes[3] = 41;
        let store = NvmStore::new(Box::new(MemoryNvm::from_bytes(&bytes))).unwrap();
        let counter = NvmRegistry::new(&store).counter("c", 3).unwrap();

        assert_eq!(counter.get(&store), 41);
        assert_eq!(counter.index(), 3);
        assert_eq!(counter.name(), "Counter_index_3");
    }

    #[test]
    fn test_counter_wraps_at_256() {
        let mut bytes = [0u8; 8];
        bytes[0] = 255;
        let mut store = NvmStore::new(Box::new(MemoryNvm::from_bytes(&bytes))).unwrap();
        let counter = NvmRegistry::new(&store).counter("c", 0).unwrap();

        counter.increment(&mut store);
        assert_eq!(counter.get(&store), 0);
        counter.increment(&mut store);
        assert_eq!(counter.get(&store), 1);
    }

    #[test]
    fn test_counter_leaves_neighbours_alone() {
        let bytes = [0xAA; 4];
        let mut store = NvmStore::new(Box::new(MemoryNvm::from_bytes(&bytes))).unwrap();
        let counter = NvmRegistry::new(&store).counter("c", 1).unwrap();

        counter.increment(&mut store);
        assert_eq!(store.byte(0), 0xAA);
        assert_eq!(store.byte(1), 0xAB);
        assert_eq!(store.byte(2), 0xAA);
    }
}

#[cfg(test)]
mod flag_tests {
    use super::*;

    #[test]
    fn test_flag_set_and_clear() {
        let mut store = NvmStore::in_memory(4).unwrap();
        let flag = NvmRegistry::new(&store).flag("f", 2, 5).unwrap();

        assert!(!flag.get(&store));
        flag.toggle(&mut store, true);
        assert!(flag.get(&store));
        assert_eq!(store.byte(2), 0b0010_0000);

        flag.toggle(&mut store, false);
        assert!(!flag.get(&store));
        assert_eq!(store.byte(2), 0);
    }

    #[test]
    fn test_flag_toggle_is_idempotent() {
        let mut store = NvmStore::in_memory(4).unwrap();
        let flag = NvmRegistry::new(&store).flag("f", 0, 0).unwrap();

        flag.toggle(&mut store, true);
        flag.toggle(&mut store, true);
        assert_eq!(store.byte(0), 1);
    }

    #[test]
    fn test_flag_descriptor() {
        let store = NvmStore::in_memory(20).unwrap();
        let flag = NvmRegistry::new(&store).flag("f", 16, 6).unwrap();

        assert_eq!(flag.index(), 16);
        assert_eq!(flag.bit(), 6);
        assert_eq!(flag.mask(), 0x40);
        assert_eq!(flag.name(), "Flag_index_16_bit_6");
    }
}

#[cfg(test)]
mod registry_tests {
    use super::*;

    #[test]
    fn test_flags_share_a_byte_without_collision() {
        let store = NvmStore::in_memory(4).unwrap();
        let mut registry = NvmRegistry::new(&store);

        assert!(registry.flag("a", 1, 0).is_ok());
        assert!(registry.flag("b", 1, 1).is_ok());
        assert!(registry.flag("c", 1, 7).is_ok());
    }

    #[test]
    fn test_same_bit_twice_collides() {
        let store = NvmStore::in_memory(4).unwrap();
        let mut registry = NvmRegistry::new(&store);

        registry.flag("first", 1, 3).unwrap();
        let err = registry.flag("second", 1, 3).unwrap_err();
        assert_eq!(
            err,
            NvmError::Collision {
                name: "second",
                existing: "first",
                index: 1,
                mask: 0x08,
            }
        );
    }

    #[test]
    fn test_counter_over_flag_byte_collides() {
        let store = NvmStore::in_memory(4).unwrap();
        let mut registry = NvmRegistry::new(&store);

        registry.flag("flag", 2, 4).unwrap();
        assert!(matches!(
            registry.counter("counter", 2),
            Err(NvmError::Collision { existing: "flag", .. })
        ));
    }

    #[test]
    fn test_flag_over_counter_byte_collides() {
        let store = NvmStore::in_memory(4).unwrap();
        let mut registry = NvmRegistry::new(&store);

        registry.counter("counter", 0).unwrap();
        assert!(matches!(
            registry.flag("flag", 0, 0),
            Err(NvmError::Collision { existing: "counter", .. })
        ));
    }

    #[test]
    fn test_out_of_range_claims_fail() {
        let store = NvmStore::in_memory(4).unwrap();
        let mut registry = NvmRegistry::new(&store);

        assert_eq!(
            registry.counter("c", 4).unwrap_err(),
            NvmError::OutOfRange { index: 4, len: 4 }
        );
        assert_eq!(registry.flag("f", 0, 8).unwrap_err(), NvmError::InvalidBit(8));
    }

    #[test]
    fn test_satellite_layout_registers() {
        let store = NvmStore::in_memory(MIN_NVM_SIZE).unwrap();
        let registers = SatelliteRegisters::register(&store).unwrap();

        assert_eq!(registers.boot_count.index(), BOOT_COUNT_INDEX);
        assert_eq!(registers.softboot.index(), FLAGS_INDEX);
        assert_eq!(registers.softboot.bit(), SOFTBOOT_BIT);
        assert_eq!(registers.brownout.bit(), BROWNOUT_BIT);
    }

    #[test]
    fn test_satellite_layout_needs_flag_byte() {
        let store = NvmStore::in_memory(MIN_NVM_SIZE - 1).unwrap();
        assert!(matches!(
            SatelliteRegisters::register(&store),
            Err(NvmError::OutOfRange { index: FLAGS_INDEX, .. })
        ));
    }
}

proptest! {
    #[test]
    fn prop_counter_increments_modulo_256(n in 0usize..512) {
        let mut store = NvmStore::in_memory(4).unwrap();
        let counter = NvmRegistry::new(&store).counter("c", 1).unwrap();
        for _ in 0..n {
            counter.increment(&mut store);
        }
        prop_assert_eq!(usize::from(counter.get(&store)), n % 256);
    }

    #[test]
    fn prop_flag_touches_only_its_bit(initial in any::<u8>(), bit in 0u8..8) {
        let mut store = NvmStore::new(Box::new(MemoryNvm::from_bytes(&[initial, initial]))).unwrap();
        let flag = NvmRegistry::new(&store).flag("f", 1, bit).unwrap();
        let mask = 1u8 << bit;

        flag.toggle(&mut store, true);
        prop_assert_eq!(store.byte(1), initial | mask);
        prop_assert!(flag.get(&store));

        flag.toggle(&mut store, false);
        prop_assert_eq!(store.byte(1), initial & !mask);
        prop_assert!(!flag.get(&store));

        prop_assert_eq!(store.byte(0), initial);
    }
}
