use crate::capture::types::EngineType;
use crate::hierarchy::types::{MarkerKind, NodeAux, NodeType, SyncType};
use crate::pm4::types::IbType;

/// Append-only arena of typed nodes, stored as parallel arrays so the views
/// can address nodes by their dense creation index. Every array always has
/// the same length.
#[derive(Debug, Default, Clone)]
pub(crate) struct NodeStore {
    node_types: Vec<NodeType>,
    descriptions: Vec<String>,
    auxes: Vec<NodeAux>,
    metadata: Vec<Vec<u8>>,
    /// Event nodes in creation order, which keeps the list sorted
    event_node_indices: Vec<u64>,
}

impl NodeStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn len(&self) -> usize {
        debug_assert!(self.node_types.len() == self.descriptions.len());
        debug_assert!(self.node_types.len() == self.auxes.len());
        debug_assert!(self.node_types.len() == self.metadata.len());
        self.node_types.len()
    }

    /// Appends a node and returns with its index, which always equals the
    /// node count before the call. The metadata bytes are copied, the store
    /// owns them afterwards.
    pub(crate) fn add(
        &mut self,
        node_type: NodeType,
        description: String,
        aux: NodeAux,
        metadata: &[u8],
    ) -> u64 {
        let node = self.len() as u64;
        self.node_types.push(node_type);
        self.descriptions.push(description);
        self.auxes.push(aux);
        self.metadata.push(metadata.to_vec());
        node
    }

    pub(crate) fn node_type(&self, node: u64) -> NodeType {
        self.node_types[node as usize]
    }

    pub(crate) fn description(&self, node: u64) -> &str {
        &self.descriptions[node as usize]
    }

    pub(crate) fn aux(&self, node: u64) -> &NodeAux {
        &self.auxes[node as usize]
    }

    pub(crate) fn metadata(&self, node: u64) -> &[u8] {
        &self.metadata[node as usize]
    }

    /// Records an event node. Nodes have to be registered in creation order.
    pub(crate) fn register_event(&mut self, node: u64) {
        debug_assert!(self
            .event_node_indices
            .last()
            .map_or(true, |last| *last < node));
        self.event_node_indices.push(node);
    }

    /// 1-based rank of the node among the event nodes of the whole capture,
    /// or 0 if the node is not an event
    pub(crate) fn event_index(&self, node: u64) -> u64 {
        match self.event_node_indices.binary_search(&node) {
            Ok(position) => position as u64 + 1,
            Err(_) => 0,
        }
    }

    pub(crate) fn event_node_indices(&self) -> &[u64] {
        &self.event_node_indices
    }

    ///####################################################################################
    /// Typed aux accessors. Calling one on a mismatched node type is a
    /// programming error.
    ///####################################################################################

    pub(crate) fn submit_index(&self, node: u64) -> u32 {
        match self.aux(node) {
            NodeAux::Submit { submit_index, .. } => *submit_index,
            _ => panic!("submit_index was called for a node which is not a Submit!"),
        }
    }

    pub(crate) fn engine_type(&self, node: u64) -> EngineType {
        match self.aux(node) {
            NodeAux::Submit { engine_type, .. } => *engine_type,
            _ => panic!("engine_type was called for a node which is not a Submit!"),
        }
    }

    pub(crate) fn ib_type(&self, node: u64) -> IbType {
        match self.aux(node) {
            NodeAux::Ib { ib_type, .. } => *ib_type,
            _ => panic!("ib_type was called for a node which is not an Ib!"),
        }
    }

    pub(crate) fn ib_index(&self, node: u64) -> u8 {
        match self.aux(node) {
            NodeAux::Ib { ib_index, .. } => *ib_index,
            _ => panic!("ib_index was called for a node which is not an Ib!"),
        }
    }

    pub(crate) fn ib_size_in_dwords(&self, node: u64) -> u32 {
        match self.aux(node) {
            NodeAux::Ib { size_in_dwords, .. } => *size_in_dwords,
            _ => panic!("ib_size_in_dwords was called for a node which is not an Ib!"),
        }
    }

    pub(crate) fn ib_fully_captured(&self, node: u64) -> bool {
        match self.aux(node) {
            NodeAux::Ib { fully_captured, .. } => *fully_captured,
            _ => panic!("ib_fully_captured was called for a node which is not an Ib!"),
        }
    }

    pub(crate) fn packet_va(&self, node: u64) -> u64 {
        match self.aux(node) {
            NodeAux::Packet { va_addr, .. } => *va_addr,
            _ => panic!("packet_va was called for a node which is not a Packet!"),
        }
    }

    pub(crate) fn packet_opcode(&self, node: u64) -> u8 {
        match self.aux(node) {
            NodeAux::Packet { opcode, .. } => *opcode,
            _ => panic!("packet_opcode was called for a node which is not a Packet!"),
        }
    }

    pub(crate) fn is_ce_packet(&self, node: u64) -> bool {
        match self.aux(node) {
            NodeAux::Packet { is_ce_packet, .. } | NodeAux::RegField { is_ce_packet } => {
                *is_ce_packet
            }
            _ => panic!("is_ce_packet was called for a node without a packet payload!"),
        }
    }

    pub(crate) fn event_id(&self, node: u64) -> u32 {
        match self.aux(node) {
            NodeAux::Event { event_id } => *event_id,
            _ => panic!("event_id was called for a node which is not an Event!"),
        }
    }

    pub(crate) fn marker_kind(&self, node: u64) -> MarkerKind {
        match self.aux(node) {
            NodeAux::Marker { kind, .. } => *kind,
            _ => panic!("marker_kind was called for a node which is not a Marker!"),
        }
    }

    pub(crate) fn marker_id(&self, node: u64) -> u32 {
        match self.aux(node) {
            NodeAux::Marker { id, .. } => *id,
            _ => panic!("marker_id was called for a node which is not a Marker!"),
        }
    }

    pub(crate) fn sync_type(&self, node: u64) -> SyncType {
        match self.aux(node) {
            NodeAux::Sync { sync_type, .. } => *sync_type,
            _ => panic!("sync_type was called for a node which is not a Sync!"),
        }
    }

    pub(crate) fn sync_info(&self, node: u64) -> u32 {
        match self.aux(node) {
            NodeAux::Sync { sync_info, .. } => *sync_info,
            _ => panic!("sync_info was called for a node which is not a Sync!"),
        }
    }
}
