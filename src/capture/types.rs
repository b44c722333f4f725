#[cfg(feature = "serialization")]
use serde::{Deserialize, Serialize};

/// Hardware engine a submit was queued to. Only the first three decode PM4
/// packets, the rest are carried for completeness of the capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
pub enum EngineType {
    Universal,
    Compute,
    Dma,
    Timer,
    Other,
}

impl EngineType {
    /// The fixed enumeration order engine nodes are created in
    pub const ALL: [EngineType; 5] = [
        EngineType::Universal,
        EngineType::Compute,
        EngineType::Dma,
        EngineType::Timer,
        EngineType::Other,
    ];

    /// Returns with true for engines whose indirect buffers carry decodable
    /// PM4 streams
    pub fn decodes_packets(&self) -> bool {
        matches!(
            self,
            EngineType::Universal | EngineType::Compute | EngineType::Dma
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
pub enum QueueType {
    Universal,
    Compute,
    Dma,
    Other,
}

/// One contiguous PM4 stream in GPU virtual memory, referenced from a submit.
/// `skip` marks buffers the capture could not fully record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndirectBufferInfo {
    pub va_addr: u64,
    pub size_in_dwords: u32,
    pub skip: bool,
}

/// A batch of indirect buffers queued to a hardware engine
#[derive(Debug, Clone)]
pub struct SubmitInfo {
    engine_type: EngineType,
    queue_type: QueueType,
    engine_index: u32,
    is_dummy: bool,
    indirect_buffers: Vec<IndirectBufferInfo>,
}

impl SubmitInfo {
    pub fn new(
        engine_type: EngineType,
        queue_type: QueueType,
        engine_index: u32,
        is_dummy: bool,
        indirect_buffers: Vec<IndirectBufferInfo>,
    ) -> Self {
        Self {
            engine_type,
            queue_type,
            engine_index,
            is_dummy,
            indirect_buffers,
        }
    }

    pub fn engine_type(&self) -> EngineType {
        self.engine_type
    }

    pub fn queue_type(&self) -> QueueType {
        self.queue_type
    }

    pub fn engine_index(&self) -> u32 {
        self.engine_index
    }

    pub fn is_dummy(&self) -> bool {
        self.is_dummy
    }

    pub fn indirect_buffers(&self) -> &[IndirectBufferInfo] {
        &self.indirect_buffers
    }
}

/// A presentation event recorded after the given submit finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresentInfo {
    pub submit_index: u32,
}
