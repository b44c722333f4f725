#[cfg(test)]
mod memory_store_tests {
    use crate::capture::memory::{MemoryAccess, MemoryRegionStore};

    #[test]
    fn test_copy_within_block() {
        let mut memory = MemoryRegionStore::new();
        memory.add_block(0, 0x1000, &[1, 2, 3, 4, 5, 6, 7, 8]);

        let mut bytes = [0u8; 4];
        assert!(memory.copy_memory(&mut bytes, 0, 0x1002));
        assert!(bytes == [3, 4, 5, 6]);
    }

    #[test]
    fn test_copy_fails_outside_and_across_blocks() {
        let mut memory = MemoryRegionStore::new();
        memory.add_block(0, 0x1000, &[0; 8]);
        memory.add_block(0, 0x1008, &[0; 8]);

        let mut bytes = [0u8; 4];
        assert!(!memory.copy_memory(&mut bytes, 0, 0x0500)); // unmapped
        assert!(!memory.copy_memory(&mut bytes, 1, 0x1000)); // wrong submit
        assert!(!memory.copy_memory(&mut bytes, 0, 0x1006)); // crosses blocks
    }

    #[test]
    fn test_max_contiguous_size() {
        let mut memory = MemoryRegionStore::new();
        memory.add_block(2, 0x4000, &[0; 64]);

        assert!(memory.max_contiguous_size(2, 0x4000) == 64);
        assert!(memory.max_contiguous_size(2, 0x4030) == 16);
        assert!(memory.max_contiguous_size(2, 0x5000) == 0);
        assert!(memory.is_valid(2, 0x4000, 64));
        assert!(!memory.is_valid(2, 0x4000, 65));
    }

    #[test]
    fn test_read_dword_is_little_endian() {
        let mut memory = MemoryRegionStore::new();
        memory.add_dwords(0, 0x2000, &[0xAABBCCDD, 0x11223344]);

        assert!(memory.read_dword(0, 0x2000) == Some(0xAABBCCDD));
        assert!(memory.read_dword(0, 0x2004) == Some(0x11223344));
        assert!(memory.read_dword(0, 0x2008).is_none());
    }
}

#[cfg(test)]
mod capture_data_tests {
    use crate::capture::types::{EngineType, IndirectBufferInfo, QueueType, SubmitInfo};
    use crate::capture::CaptureData;

    #[test]
    fn test_submit_and_present_accessors() {
        let mut capture = CaptureData::new(3);
        capture.add_submit(SubmitInfo::new(
            EngineType::Universal,
            QueueType::Universal,
            0,
            false,
            vec![IndirectBufferInfo {
                va_addr: 0x1000,
                size_in_dwords: 2,
                skip: false,
            }],
        ));
        capture.add_present(crate::capture::PresentInfo { submit_index: 0 });

        assert!(capture.metadata_version() == 3);
        assert!(capture.num_submits() == 1);
        assert!(capture.num_presents() == 1);
        assert!(capture.submit_info(0).indirect_buffers().len() == 1);
        assert!(capture.present_info(0).submit_index == 0);
    }

    #[test]
    fn test_engine_decode_set() {
        assert!(EngineType::Universal.decodes_packets());
        assert!(EngineType::Compute.decodes_packets());
        assert!(EngineType::Dma.decodes_packets());
        assert!(!EngineType::Timer.decodes_packets());
        assert!(!EngineType::Other.decodes_packets());
    }
}
