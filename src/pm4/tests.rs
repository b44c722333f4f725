#[cfg(test)]
mod header_tests {
    use crate::pm4::types::*;

    #[test]
    fn test_header_classification() {
        assert!(classify_header(Type7Header::pack(CP_NOP, 0)) == Pm4Type::Type7);
        assert!(classify_header(Type4Header::pack(0x8000, 1)) == Pm4Type::Type4);
        assert!(classify_header(0x00000000) == Pm4Type::Other);
        assert!(classify_header(0x80000000) == Pm4Type::Other); // type-2 padding
        assert!(classify_header(0xC0000000) == Pm4Type::Other); // legacy type-3
    }

    #[test]
    fn test_type7_roundtrip() {
        let header = Type7Header::pack(CP_DRAW_INDX_OFFSET, 3);
        let parsed = Type7Header::parse(header).unwrap();
        assert!(parsed.opcode == CP_DRAW_INDX_OFFSET);
        assert!(parsed.count == 3);
    }

    #[test]
    fn test_type4_roundtrip() {
        let header = Type4Header::pack(0x8090, 2);
        let parsed = Type4Header::parse(header).unwrap();
        assert!(parsed.reg_offset == 0x8090);
        assert!(parsed.count == 2);
    }

    #[test]
    fn test_parity_violation_is_rejected() {
        let header = Type7Header::pack(CP_NOP, 0);
        assert!(Type7Header::parse(header ^ 0x1).is_none()); // corrupt count
        assert!(Type7Header::parse(header ^ 0x8000).is_none()); // corrupt count parity

        let header = Type4Header::pack(0x8000, 1);
        assert!(Type4Header::parse(header ^ 0x100).is_none()); // corrupt offset
    }

    #[test]
    fn test_wrong_type_is_rejected() {
        assert!(Type7Header::parse(Type4Header::pack(0x8000, 1)).is_none());
        assert!(Type4Header::parse(Type7Header::pack(CP_NOP, 0)).is_none());
    }
}

#[cfg(test)]
mod emulator_tests {
    use crate::capture::memory::{MemoryAccess, MemoryRegionStore};
    use crate::capture::types::{EngineType, IndirectBufferInfo, QueueType, SubmitInfo};
    use crate::pm4::emulator::{EmulatorCallbacks, Pm4Emulator};
    use crate::pm4::types::*;

    /// Records every callback as one line, so walk order can be asserted on
    #[derive(Default)]
    struct CallbackLog {
        entries: Vec<String>,
    }

    impl EmulatorCallbacks for CallbackLog {
        fn on_submit_start(
            &mut self,
            submit_index: u32,
            _submit: &SubmitInfo,
        ) -> Result<(), DecodeError> {
            self.entries.push(format!("submit_start {}", submit_index));
            Ok(())
        }

        fn on_ib_start(
            &mut self,
            _submit_index: u32,
            ib_index: u8,
            ib: &IndirectBufferInfo,
            ib_type: IbType,
        ) -> Result<(), DecodeError> {
            self.entries.push(format!(
                "ib_start {} {:?} captured: {}",
                ib_index, ib_type, !ib.skip
            ));
            Ok(())
        }

        fn on_packet(
            &mut self,
            _mem: &dyn MemoryAccess,
            _submit_index: u32,
            ib_index: u8,
            _va_addr: u64,
            pm4_type: Pm4Type,
            header: u32,
        ) -> Result<(), DecodeError> {
            let label = match pm4_type {
                Pm4Type::Type7 => format!(
                    "packet {} opcode 0x{:02x}",
                    ib_index,
                    Type7Header::parse(header).unwrap().opcode
                ),
                Pm4Type::Type4 => format!("regwrite {}", ib_index),
                Pm4Type::Other => unreachable!(),
            };
            self.entries.push(label);
            Ok(())
        }

        fn on_ib_end(
            &mut self,
            _submit_index: u32,
            ib_index: u8,
            _ib: &IndirectBufferInfo,
        ) -> Result<(), DecodeError> {
            self.entries.push(format!("ib_end {}", ib_index));
            Ok(())
        }

        fn on_submit_end(
            &mut self,
            submit_index: u32,
            _submit: &SubmitInfo,
        ) -> Result<(), DecodeError> {
            self.entries.push(format!("submit_end {}", submit_index));
            Ok(())
        }
    }

    fn single_ib_submit(va_addr: u64, size_in_dwords: u32, skip: bool) -> SubmitInfo {
        SubmitInfo::new(
            EngineType::Universal,
            QueueType::Universal,
            0,
            false,
            vec![IndirectBufferInfo {
                va_addr,
                size_in_dwords,
                skip,
            }],
        )
    }

    fn run(memory: &MemoryRegionStore, submit: &SubmitInfo) -> Vec<String> {
        let mut log = CallbackLog::default();
        Pm4Emulator::new()
            .execute_submit(&mut log, memory, 0, submit)
            .ok()
            .unwrap();
        log.entries
    }

    #[test]
    fn test_linear_walk() {
        let mut memory = MemoryRegionStore::new();
        memory.add_dwords(
            0,
            0x1000,
            &[
                Type7Header::pack(CP_NOP, 1),
                0xDEAD,
                Type4Header::pack(0x8000, 1),
                0x1,
                Type7Header::pack(CP_DRAW_INDX_OFFSET, 0),
            ],
        );
        let entries = run(&memory, &single_ib_submit(0x1000, 5, false));
        assert!(
            entries
                == [
                    "submit_start 0",
                    "ib_start 0 Normal captured: true",
                    format!("packet 0 opcode 0x{:02x}", CP_NOP).as_str(),
                    "regwrite 0",
                    format!("packet 0 opcode 0x{:02x}", CP_DRAW_INDX_OFFSET).as_str(),
                    "ib_end 0",
                    "submit_end 0",
                ]
        );
    }

    #[test]
    fn test_other_headers_are_skipped_silently() {
        let mut memory = MemoryRegionStore::new();
        memory.add_dwords(
            0,
            0x1000,
            &[0x00000000, 0x80000000, Type7Header::pack(CP_NOP, 0)],
        );
        let entries = run(&memory, &single_ib_submit(0x1000, 3, false));
        assert!(entries.iter().filter(|e| e.starts_with("packet")).count() == 1);
    }

    #[test]
    fn test_call_recursion_returns_to_caller() {
        let mut memory = MemoryRegionStore::new();
        memory.add_dwords(
            0,
            0x2000,
            &[
                Type7Header::pack(CP_INDIRECT_BUFFER, 3),
                0x3000, // target lo
                0x0,    // target hi
                0x1,    // target size in dwords
                Type7Header::pack(CP_WAIT_FOR_IDLE, 0),
            ],
        );
        memory.add_dwords(0, 0x3000, &[Type7Header::pack(CP_NOP, 0)]);

        let entries = run(&memory, &single_ib_submit(0x2000, 5, false));
        assert!(
            entries
                == [
                    "submit_start 0",
                    "ib_start 0 Normal captured: true",
                    format!("packet 0 opcode 0x{:02x}", CP_INDIRECT_BUFFER).as_str(),
                    "ib_start 1 Call captured: true",
                    format!("packet 1 opcode 0x{:02x}", CP_NOP).as_str(),
                    "ib_end 1",
                    format!("packet 0 opcode 0x{:02x}", CP_WAIT_FOR_IDLE).as_str(),
                    "ib_end 0",
                    "submit_end 0",
                ]
        );
    }

    #[test]
    fn test_chain_run_shares_one_end_callback() {
        let mut memory = MemoryRegionStore::new();
        // 0x1000 chains to 0x2000 chains to 0x3000; dwords behind a chain
        // transfer are never executed
        memory.add_dwords(
            0,
            0x1000,
            &[
                Type7Header::pack(CP_INDIRECT_BUFFER_CHAIN, 3),
                0x2000,
                0x0,
                0x4,
                Type7Header::pack(CP_WAIT_FOR_IDLE, 0), // unreachable
            ],
        );
        memory.add_dwords(
            0,
            0x2000,
            &[Type7Header::pack(CP_INDIRECT_BUFFER_CHAIN, 3), 0x3000, 0x0, 0x1],
        );
        memory.add_dwords(0, 0x3000, &[Type7Header::pack(CP_NOP, 0)]);

        let entries = run(&memory, &single_ib_submit(0x1000, 5, false));
        assert!(
            entries
                == [
                    "submit_start 0",
                    "ib_start 0 Normal captured: true",
                    format!("packet 0 opcode 0x{:02x}", CP_INDIRECT_BUFFER_CHAIN).as_str(),
                    "ib_start 1 Chain captured: true",
                    format!("packet 1 opcode 0x{:02x}", CP_INDIRECT_BUFFER_CHAIN).as_str(),
                    "ib_start 2 Chain captured: true",
                    format!("packet 2 opcode 0x{:02x}", CP_NOP).as_str(),
                    "ib_end 0",
                    "submit_end 0",
                ]
        );
        // the whole chain run shares a single end callback
        assert!(entries.iter().filter(|e| e.starts_with("ib_end")).count() == 1);
    }

    #[test]
    fn test_skipped_ib_yields_no_packets() {
        let mut memory = MemoryRegionStore::new();
        memory.add_dwords(0, 0x1000, &[Type7Header::pack(CP_NOP, 0)]);
        let entries = run(&memory, &single_ib_submit(0x1000, 1, true));
        assert!(
            entries
                == [
                    "submit_start 0",
                    "ib_start 0 Normal captured: false",
                    "ib_end 0",
                    "submit_end 0",
                ]
        );
    }

    #[test]
    fn test_uncaptured_call_target_is_reported_not_walked() {
        let mut memory = MemoryRegionStore::new();
        memory.add_dwords(
            0,
            0x1000,
            &[Type7Header::pack(CP_INDIRECT_BUFFER, 3), 0x9000, 0x0, 0x10],
        );
        let entries = run(&memory, &single_ib_submit(0x1000, 4, false));
        assert!(entries.contains(&"ib_start 1 Call captured: false".to_string()));
        assert!(entries.iter().filter(|e| e.starts_with("packet 1")).count() == 0);
    }

    #[test]
    fn test_dummy_submit_walks_nothing() {
        let memory = MemoryRegionStore::new();
        let submit = SubmitInfo::new(
            EngineType::Universal,
            QueueType::Universal,
            0,
            true,
            vec![IndirectBufferInfo {
                va_addr: 0x1000,
                size_in_dwords: 1,
                skip: false,
            }],
        );
        let entries = run(&memory, &submit);
        assert!(entries == ["submit_start 0", "submit_end 0"]);
    }

    #[test]
    fn test_foreign_engine_submit_walks_nothing() {
        let memory = MemoryRegionStore::new();
        let submit = SubmitInfo::new(
            EngineType::Timer,
            QueueType::Other,
            0,
            false,
            vec![IndirectBufferInfo {
                va_addr: 0x1000,
                size_in_dwords: 1,
                skip: false,
            }],
        );
        let entries = run(&memory, &submit);
        assert!(entries == ["submit_start 0", "submit_end 0"]);
    }

    #[test]
    fn test_malformed_parity_aborts_the_walk() {
        let mut memory = MemoryRegionStore::new();
        memory.add_dwords(0, 0x1000, &[Type7Header::pack(CP_NOP, 0) ^ 0x1]);
        let mut log = CallbackLog::default();
        let result = Pm4Emulator::new().execute_submit(
            &mut log,
            &memory,
            0,
            &single_ib_submit(0x1000, 1, false),
        );
        assert!(matches!(
            result,
            Err(DecodeError::MalformedHeader { submit_index: 0, .. })
        ));
    }

    #[test]
    fn test_walk_is_clamped_to_captured_memory() {
        let mut memory = MemoryRegionStore::new();
        // the stream claims 8 dwords, the capture only has 1
        memory.add_dwords(0, 0x1000, &[Type7Header::pack(CP_NOP, 0)]);
        let entries = run(&memory, &single_ib_submit(0x1000, 8, false));
        assert!(entries.iter().filter(|e| e.starts_with("packet")).count() == 1);
    }
}
