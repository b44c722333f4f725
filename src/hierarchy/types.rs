use crate::capture::types::EngineType;
use crate::pm4::types::IbType;

#[cfg(feature = "serialization")]
use serde::{Deserialize, Serialize};

/// Discriminant of every node in the hierarchy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
pub enum NodeType {
    Root,
    Engine,
    Submit,
    Ib,
    Marker,
    DrawDispatchDma,
    Sync,
    Packet,
    Reg,
    Field,
    PostambleState,
    Present,
}

/// Origin of a debug marker node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
pub enum MarkerKind {
    /// Labeled region around the commands of one app-level call
    BeginEnd,
    /// Single label without a region
    Insert,
    /// Pipeline barrier region
    Barrier,
    /// Metadata block injected by the capture layer
    Metadata,
}

/// Classification of a packet run which closed as a synchronization event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
pub enum SyncType {
    WaitForIdle,
    WaitForMe,
    WaitRegMem,
    WaitMemWrites,
}

/// Per-type payload of a node. Kept as a sum type so a mismatched accessor is
/// caught instead of silently reinterpreting payload bits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeAux {
    None,
    Submit {
        engine_type: EngineType,
        submit_index: u32,
    },
    Ib {
        ib_type: IbType,
        ib_index: u8,
        size_in_dwords: u32,
        fully_captured: bool,
    },
    Packet {
        /// 48-bit GPU virtual address of the packet header
        va_addr: u64,
        /// `NO_OPCODE` for type-4 register bursts
        opcode: u8,
        is_ce_packet: bool,
    },
    RegField {
        is_ce_packet: bool,
    },
    Event {
        event_id: u32,
    },
    Marker {
        kind: MarkerKind,
        id: u32,
    },
    Sync {
        sync_type: SyncType,
        sync_info: u32,
    },
}

/// The simultaneously built views over the shared node set. The first four
/// are populated during the stream walk, the last two are derived from
/// `AllEvent` after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
pub enum HierarchyView {
    /// Root -> engines -> submits -> nested indirect buffers
    Engine,
    /// Root -> submits -> indirect buffers ordered by ib-index
    Submit,
    /// Root -> submits -> events owning their preceding packet runs
    AllEvent,
    /// `AllEvent` shape rebuilt over the internal marker stack
    Rgp,
    /// `AllEvent` without events, postamble state and barrier markers
    VulkanCall,
    /// `VulkanCall` without non-event markers
    VulkanEvent,
}

pub(crate) const VIEW_COUNT: usize = 6;

impl HierarchyView {
    pub const ALL: [HierarchyView; VIEW_COUNT] = [
        HierarchyView::Engine,
        HierarchyView::Submit,
        HierarchyView::AllEvent,
        HierarchyView::Rgp,
        HierarchyView::VulkanCall,
        HierarchyView::VulkanEvent,
    ];

    pub(crate) fn table_index(self) -> usize {
        self as usize
    }
}
