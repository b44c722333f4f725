pub mod memory;
mod tests;
pub mod types;

pub use memory::{MemoryAccess, MemoryRegionStore};
pub use types::{EngineType, IndirectBufferInfo, PresentInfo, QueueType, SubmitInfo};

/// A captured GPU command stream: the submit list, the presentation events and
/// the simulated memory the indirect buffers live in. The hierarchy builder
/// only ever reads from it.
#[derive(Debug, Default, Clone)]
pub struct CaptureData {
    metadata_version: u32,
    submits: Vec<SubmitInfo>,
    presents: Vec<PresentInfo>,
    memory: MemoryRegionStore,
}

impl CaptureData {
    pub fn new(metadata_version: u32) -> Self {
        Self {
            metadata_version,
            ..Default::default()
        }
    }

    pub fn add_submit(&mut self, submit: SubmitInfo) {
        self.submits.push(submit);
    }

    pub fn add_present(&mut self, present: PresentInfo) {
        self.presents.push(present);
    }

    pub fn add_memory_block(&mut self, submit_index: u32, va_addr: u64, data: &[u8]) {
        self.memory.add_block(submit_index, va_addr, data);
    }

    pub fn add_memory_dwords(&mut self, submit_index: u32, va_addr: u64, dwords: &[u32]) {
        self.memory.add_dwords(submit_index, va_addr, dwords);
    }

    pub fn metadata_version(&self) -> u32 {
        self.metadata_version
    }

    pub fn num_submits(&self) -> usize {
        self.submits.len()
    }

    pub fn submit_info(&self, submit_index: usize) -> &SubmitInfo {
        &self.submits[submit_index]
    }

    pub fn num_presents(&self) -> usize {
        self.presents.len()
    }

    pub fn present_info(&self, present_index: usize) -> &PresentInfo {
        &self.presents[present_index]
    }

    pub fn presents(&self) -> &[PresentInfo] {
        &self.presents
    }

    pub fn memory(&self) -> &MemoryRegionStore {
        &self.memory
    }
}
