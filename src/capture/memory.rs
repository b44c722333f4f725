use std::vec::Vec;

/// Read-only random access into the simulated GPU virtual address space of a
/// capture. Addresses are resolved per submit, since captures may record the
/// same virtual range with different contents for different submits.
pub trait MemoryAccess {
    /// Copies `dst.len()` bytes of simulated GPU memory at `va_addr` within
    /// the given submit into `dst`. Returns with false if any byte of the
    /// range is absent from the capture.
    fn copy_memory(&self, dst: &mut [u8], submit_index: u32, va_addr: u64) -> bool;

    /// Length of the longest contiguous captured range starting at `va_addr`
    fn max_contiguous_size(&self, submit_index: u32, va_addr: u64) -> u64;

    /// Cheap precheck for whether the whole range is present in the capture
    fn is_valid(&self, submit_index: u32, va_addr: u64, size: u64) -> bool {
        size <= self.max_contiguous_size(submit_index, va_addr)
    }

    /// Reads one little-endian dword, if the capture contains it
    fn read_dword(&self, submit_index: u32, va_addr: u64) -> Option<u32> {
        let mut bytes = [0u8; 4];
        if self.copy_memory(&mut bytes, submit_index, va_addr) {
            Some(u32::from_le_bytes(bytes))
        } else {
            None
        }
    }
}

/// One captured block of GPU memory
#[derive(Debug, Clone)]
struct MemoryBlock {
    submit_index: u32,
    va_addr: u64,
    data: Vec<u8>,
}

///####################################################################################
/// MemoryRegionStore
///####################################################################################

/// Simulated GPU memory assembled from captured blocks, each tagged with the
/// submit it was recorded for. Lookups never cross block boundaries, so
/// adjacent blocks have to be recorded as one to read across them.
#[derive(Debug, Default, Clone)]
pub struct MemoryRegionStore {
    blocks: Vec<MemoryBlock>,
}

impl MemoryRegionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one block of captured memory for the given submit
    pub fn add_block(&mut self, submit_index: u32, va_addr: u64, data: &[u8]) {
        self.blocks.push(MemoryBlock {
            submit_index,
            va_addr,
            data: data.to_vec(),
        });
    }

    /// Records a block given as a dword stream, the way command buffers are
    /// usually available to capture tooling
    pub fn add_dwords(&mut self, submit_index: u32, va_addr: u64, dwords: &[u32]) {
        let mut data = Vec::with_capacity(dwords.len() * 4);
        for dword in dwords {
            data.extend_from_slice(&dword.to_le_bytes());
        }
        self.blocks.push(MemoryBlock {
            submit_index,
            va_addr,
            data,
        });
    }

    fn block_containing(&self, submit_index: u32, va_addr: u64) -> Option<&MemoryBlock> {
        self.blocks.iter().find(|block| {
            block.submit_index == submit_index
                && block.va_addr <= va_addr
                && va_addr < block.va_addr + block.data.len() as u64
        })
    }
}

impl MemoryAccess for MemoryRegionStore {
    fn copy_memory(&self, dst: &mut [u8], submit_index: u32, va_addr: u64) -> bool {
        match self.block_containing(submit_index, va_addr) {
            Some(block) => {
                let offset = (va_addr - block.va_addr) as usize;
                if offset + dst.len() <= block.data.len() {
                    dst.copy_from_slice(&block.data[offset..offset + dst.len()]);
                    true
                } else {
                    false
                }
            }
            None => false,
        }
    }

    fn max_contiguous_size(&self, submit_index: u32, va_addr: u64) -> u64 {
        match self.block_containing(submit_index, va_addr) {
            Some(block) => block.va_addr + block.data.len() as u64 - va_addr,
            None => 0,
        }
    }
}
