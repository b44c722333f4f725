pub(crate) mod builder;
pub(crate) mod store;
pub mod types;

pub use types::{HierarchyView, MarkerKind, NodeAux, NodeType, SyncType};

use crate::capture::types::{EngineType, IndirectBufferInfo, QueueType, SubmitInfo};
use crate::capture::CaptureData;
use crate::hierarchy::builder::HierarchyBuilder;
use crate::hierarchy::store::NodeStore;
use crate::pm4::catalog::PacketCatalog;
use crate::pm4::emulator::Pm4Emulator;
use crate::pm4::types::{DecodeError, IbType};
use crate::topology::Topology;

/// Build-time switches of the hierarchy
#[derive(Debug, Default, Clone, Copy)]
pub struct BuildConfig {
    /// Parent chain buffers under the buffer which started the chain run
    /// instead of their predecessor
    pub flatten_chain_nodes: bool,
}

/// Base address synthetic single-submit captures map their stream at
const STREAM_BASE_VA: u64 = 0x1000;

///####################################################################################
/// CommandHierarchy
///####################################################################################

/// The cross-referenced views built over one capture. Read-only once built,
/// safe to share between consumers.
#[derive(Debug, Clone)]
pub struct CommandHierarchy {
    pub(in crate::hierarchy) store: NodeStore,
    pub(in crate::hierarchy) topologies: Vec<Topology>,
    pub(in crate::hierarchy) metadata_version: u32,
}

impl CommandHierarchy {
    /// Builds every view over the given capture by walking all of its submits
    pub fn from_capture(
        capture: &CaptureData,
        catalog: &impl PacketCatalog,
        config: &BuildConfig,
    ) -> Result<Self, DecodeError> {
        let mut builder =
            HierarchyBuilder::new(catalog, capture.presents(), config.flatten_chain_nodes);
        for submit_index in 0..capture.num_submits() {
            Pm4Emulator::new().execute_submit(
                &mut builder,
                capture.memory(),
                submit_index as u32,
                capture.submit_info(submit_index),
            )?;
        }
        Ok(builder.finish(capture.metadata_version()))
    }

    /// Builds the views over a single raw command stream by wrapping it into
    /// a synthetic one-submit capture. No presents, no markers, chain
    /// flattening stays off.
    pub fn from_stream(
        stream: &[u32],
        engine_type: EngineType,
        queue_type: QueueType,
        catalog: &impl PacketCatalog,
    ) -> Result<Self, DecodeError> {
        let mut capture = CaptureData::new(0);
        capture.add_memory_dwords(0, STREAM_BASE_VA, stream);
        capture.add_submit(SubmitInfo::new(
            engine_type,
            queue_type,
            0,
            false,
            vec![IndirectBufferInfo {
                va_addr: STREAM_BASE_VA,
                size_in_dwords: stream.len() as u32,
                skip: false,
            }],
        ));
        Self::from_capture(&capture, catalog, &BuildConfig::default())
    }

    pub fn topology(&self, view: HierarchyView) -> &Topology {
        &self.topologies[view.table_index()]
    }

    pub fn engine_hierarchy_topology(&self) -> &Topology {
        self.topology(HierarchyView::Engine)
    }

    pub fn submit_hierarchy_topology(&self) -> &Topology {
        self.topology(HierarchyView::Submit)
    }

    pub fn all_event_hierarchy_topology(&self) -> &Topology {
        self.topology(HierarchyView::AllEvent)
    }

    pub fn rgp_hierarchy_topology(&self) -> &Topology {
        self.topology(HierarchyView::Rgp)
    }

    pub fn vulkan_call_hierarchy_topology(&self) -> &Topology {
        self.topology(HierarchyView::VulkanCall)
    }

    pub fn vulkan_event_hierarchy_topology(&self) -> &Topology {
        self.topology(HierarchyView::VulkanEvent)
    }

    pub fn num_nodes(&self) -> usize {
        self.store.len()
    }

    pub fn node_type(&self, node: u64) -> NodeType {
        self.store.node_type(node)
    }

    pub fn description(&self, node: u64) -> &str {
        self.store.description(node)
    }

    pub fn aux(&self, node: u64) -> &NodeAux {
        self.store.aux(node)
    }

    pub fn metadata(&self, node: u64) -> &[u8] {
        self.store.metadata(node)
    }

    /// Version of the capture-layer metadata the capture was recorded with
    pub fn metadata_version(&self) -> u32 {
        self.metadata_version
    }

    /// 1-based rank among the event nodes of the capture, 0 for non-events
    pub fn event_index(&self, node: u64) -> u64 {
        self.store.event_index(node)
    }

    pub fn submit_index(&self, node: u64) -> u32 {
        self.store.submit_index(node)
    }

    pub fn engine_type(&self, node: u64) -> EngineType {
        self.store.engine_type(node)
    }

    pub fn ib_type(&self, node: u64) -> IbType {
        self.store.ib_type(node)
    }

    pub fn ib_index(&self, node: u64) -> u8 {
        self.store.ib_index(node)
    }

    pub fn ib_size_in_dwords(&self, node: u64) -> u32 {
        self.store.ib_size_in_dwords(node)
    }

    pub fn ib_fully_captured(&self, node: u64) -> bool {
        self.store.ib_fully_captured(node)
    }

    pub fn packet_va(&self, node: u64) -> u64 {
        self.store.packet_va(node)
    }

    pub fn packet_opcode(&self, node: u64) -> u8 {
        self.store.packet_opcode(node)
    }

    pub fn is_ce_packet(&self, node: u64) -> bool {
        self.store.is_ce_packet(node)
    }

    pub fn event_id(&self, node: u64) -> u32 {
        self.store.event_id(node)
    }

    pub fn marker_kind(&self, node: u64) -> MarkerKind {
        self.store.marker_kind(node)
    }

    pub fn marker_id(&self, node: u64) -> u32 {
        self.store.marker_id(node)
    }

    pub fn sync_type(&self, node: u64) -> SyncType {
        self.store.sync_type(node)
    }

    pub fn sync_info(&self, node: u64) -> u32 {
        self.store.sync_info(node)
    }

    /// Event nodes of the whole capture in creation order
    pub fn event_nodes(&self) -> &[u64] {
        self.store.event_node_indices()
    }
}
