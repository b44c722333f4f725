use log::trace;

use crate::capture::memory::MemoryAccess;
use crate::capture::types::{IndirectBufferInfo, SubmitInfo};
use crate::pm4::types::*;

/// Adreno executes at most ring -> IB1 -> IB2 -> draw state, anything deeper
/// is a malformed stream
pub const MAX_IB_DEPTH: u32 = 4;

/// Receiver of the emulator walk. Returning an error from any callback aborts
/// the walk of the whole capture.
pub trait EmulatorCallbacks {
    fn on_submit_start(&mut self, submit_index: u32, submit: &SubmitInfo)
        -> Result<(), DecodeError>;

    fn on_ib_start(
        &mut self,
        submit_index: u32,
        ib_index: u8,
        ib: &IndirectBufferInfo,
        ib_type: IbType,
    ) -> Result<(), DecodeError>;

    /// Called for every type-4 and type-7 header. Other header classes never
    /// reach the receiver.
    fn on_packet(
        &mut self,
        mem: &dyn MemoryAccess,
        submit_index: u32,
        ib_index: u8,
        va_addr: u64,
        pm4_type: Pm4Type,
        header: u32,
    ) -> Result<(), DecodeError>;

    /// Called once per non-chain indirect buffer. A daisy-chain of chain
    /// transfers shares the single end callback of its terminal buffer.
    fn on_ib_end(
        &mut self,
        submit_index: u32,
        ib_index: u8,
        ib: &IndirectBufferInfo,
    ) -> Result<(), DecodeError>;

    fn on_submit_end(&mut self, submit_index: u32, submit: &SubmitInfo) -> Result<(), DecodeError>;
}

///####################################################################################
/// Pm4Emulator
///####################################################################################

/// Walks the indirect buffers of one submit, classifying headers and
/// recursing into nested buffers. Create a fresh instance per submit, the
/// buffer index counter is not reused across submits.
#[derive(Debug, Default)]
pub struct Pm4Emulator {
    next_ib_index: u32,
}

impl Pm4Emulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drives the callbacks over one submit. Dummy submits and submits queued
    /// to engines which do not decode packets get their start/end callbacks
    /// but no buffer walk.
    pub fn execute_submit(
        &mut self,
        callbacks: &mut impl EmulatorCallbacks,
        mem: &dyn MemoryAccess,
        submit_index: u32,
        submit: &SubmitInfo,
    ) -> Result<(), DecodeError> {
        callbacks.on_submit_start(submit_index, submit)?;
        if !submit.is_dummy() && submit.engine_type().decodes_packets() {
            trace!(
                "submit {}: walking {} indirect buffer(s)",
                submit_index,
                submit.indirect_buffers().len()
            );
            for ib in submit.indirect_buffers() {
                let ib_index = self.alloc_ib_index();
                callbacks.on_ib_start(submit_index, ib_index, ib, IbType::Normal)?;
                if !ib.skip {
                    self.walk_ib(
                        callbacks,
                        mem,
                        submit_index,
                        ib_index,
                        ib.va_addr,
                        ib.size_in_dwords,
                        1,
                    )?;
                }
                callbacks.on_ib_end(submit_index, ib_index, ib)?;
            }
        }
        callbacks.on_submit_end(submit_index, submit)?;
        Ok(())
    }

    fn alloc_ib_index(&mut self) -> u8 {
        let ib_index = self.next_ib_index;
        assert!(
            ib_index <= u8::MAX as u32,
            "More indirect buffers within a submit than an ib-index can address!"
        );
        self.next_ib_index += 1;
        ib_index as u8
    }

    /// Walks one buffer, following chain transfers in place. The walk of a
    /// chained-to buffer continues under the chains own index, and the single
    /// end callback for the whole run is emitted by the caller.
    fn walk_ib(
        &mut self,
        callbacks: &mut impl EmulatorCallbacks,
        mem: &dyn MemoryAccess,
        submit_index: u32,
        ib_index: u8,
        va_addr: u64,
        size_in_dwords: u32,
        depth: u32,
    ) -> Result<(), DecodeError> {
        if MAX_IB_DEPTH < depth {
            return Err(DecodeError::IbNesting {
                submit_index,
                max_depth: MAX_IB_DEPTH,
            });
        }
        let mut cur_ib_index = ib_index;
        let mut va_addr = va_addr;
        // the capture may have recorded less than the stream references
        let mut dwords_left =
            size_in_dwords.min((mem.max_contiguous_size(submit_index, va_addr) / 4) as u32);
        while 0 < dwords_left {
            let header = mem
                .read_dword(submit_index, va_addr)
                .ok_or(DecodeError::MemoryRead {
                    submit_index,
                    va_addr,
                    size: 4,
                })?;
            match classify_header(header) {
                Pm4Type::Type7 => {
                    let parsed =
                        Type7Header::parse(header).ok_or(DecodeError::MalformedHeader {
                            submit_index,
                            va_addr,
                            header,
                        })?;
                    callbacks.on_packet(
                        mem,
                        submit_index,
                        cur_ib_index,
                        va_addr,
                        Pm4Type::Type7,
                        header,
                    )?;
                    if is_ib_transfer(parsed.opcode) {
                        if parsed.count < 3 {
                            return Err(DecodeError::MalformedHeader {
                                submit_index,
                                va_addr,
                                header,
                            });
                        }
                        let target = self.read_ib_target(mem, submit_index, va_addr)?;
                        if parsed.opcode == CP_INDIRECT_BUFFER {
                            let nested_index = self.alloc_ib_index();
                            callbacks.on_ib_start(
                                submit_index,
                                nested_index,
                                &target,
                                IbType::Call,
                            )?;
                            if !target.skip {
                                self.walk_ib(
                                    callbacks,
                                    mem,
                                    submit_index,
                                    nested_index,
                                    target.va_addr,
                                    target.size_in_dwords,
                                    depth + 1,
                                )?;
                            }
                            callbacks.on_ib_end(submit_index, nested_index, &target)?;
                        } else {
                            trace!(
                                "submit {}: chain transfer to 0x{:x}",
                                submit_index,
                                target.va_addr
                            );
                            let chain_index = self.alloc_ib_index();
                            callbacks.on_ib_start(
                                submit_index,
                                chain_index,
                                &target,
                                IbType::Chain,
                            )?;
                            if target.skip {
                                break;
                            }
                            // tail transfer: the rest of the current buffer
                            // is never executed
                            cur_ib_index = chain_index;
                            va_addr = target.va_addr;
                            dwords_left = target.size_in_dwords.min(
                                (mem.max_contiguous_size(submit_index, va_addr) / 4) as u32,
                            );
                            continue;
                        }
                    }
                    va_addr += (1 + parsed.count) as u64 * 4;
                    dwords_left = dwords_left.saturating_sub(1 + parsed.count);
                }
                Pm4Type::Type4 => {
                    let parsed =
                        Type4Header::parse(header).ok_or(DecodeError::MalformedHeader {
                            submit_index,
                            va_addr,
                            header,
                        })?;
                    callbacks.on_packet(
                        mem,
                        submit_index,
                        cur_ib_index,
                        va_addr,
                        Pm4Type::Type4,
                        header,
                    )?;
                    va_addr += (1 + parsed.count) as u64 * 4;
                    dwords_left = dwords_left.saturating_sub(1 + parsed.count);
                }
                Pm4Type::Other => {
                    // padding and legacy header classes are skipped silently
                    va_addr += 4;
                    dwords_left -= 1;
                }
            }
        }
        Ok(())
    }

    /// Reads the target buffer reference out of an IB transfer packet body
    fn read_ib_target(
        &self,
        mem: &dyn MemoryAccess,
        submit_index: u32,
        packet_va: u64,
    ) -> Result<IndirectBufferInfo, DecodeError> {
        let mut body = [0u32; 3];
        for (position, dword) in body.iter_mut().enumerate() {
            let va_addr = packet_va + 4 + position as u64 * 4;
            *dword = mem
                .read_dword(submit_index, va_addr)
                .ok_or(DecodeError::MemoryRead {
                    submit_index,
                    va_addr,
                    size: 4,
                })?;
        }
        let va_addr = body[0] as u64 | ((body[1] as u64) << 32);
        let size_in_dwords = body[2] & 0x000FFFFF;
        Ok(IndirectBufferInfo {
            va_addr,
            size_in_dwords,
            skip: !mem.is_valid(submit_index, va_addr, size_in_dwords as u64 * 4),
        })
    }
}
