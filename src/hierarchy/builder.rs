use log::{debug, warn};

use crate::capture::memory::MemoryAccess;
use crate::capture::types::{EngineType, IndirectBufferInfo, PresentInfo, SubmitInfo};
use crate::hierarchy::store::NodeStore;
use crate::hierarchy::types::{
    HierarchyView, MarkerKind, NodeAux, NodeType, SyncType, VIEW_COUNT,
};
use crate::hierarchy::CommandHierarchy;
use crate::pm4::catalog::PacketCatalog;
use crate::pm4::emulator::EmulatorCallbacks;
use crate::pm4::types::*;
use crate::topology::{node_none_value, Topology};

pub(crate) const ROOT_NODE: u64 = 0;

/// Packets carry 48 bit GPU virtual addresses
const VA_MASK: u64 = 0x0000_FFFF_FFFF_FFFF;

/// One packet of the run building up towards the next event cut point
#[derive(Debug, Clone, Copy)]
struct BufferedPacket {
    #[allow(dead_code)] // consulted once sync classification lands
    opcode: u8,
    node: u64,
}

///####################################################################################
/// HierarchyBuilder
///####################################################################################

/// Receives the emulator walk and assembles the node arena together with the
/// pending adjacency of every view. `finish` derives the projected views and
/// freezes everything into the read-only `CommandHierarchy`.
pub(crate) struct HierarchyBuilder<'a, C: PacketCatalog> {
    catalog: &'a C,
    presents: &'a [PresentInfo],
    flatten_chain_nodes: bool,

    store: NodeStore,
    node_children: [Vec<Vec<u64>>; VIEW_COUNT],
    node_shared_children: [Vec<Vec<u64>>; VIEW_COUNT],

    engine_nodes: Vec<u64>, // one per EngineType::ALL entry
    cur_submit: u64,
    ib_stack: Vec<u64>,
    packet_run: Vec<BufferedPacket>,
    marker_stack: Vec<u64>,
    internal_marker_stack: Vec<u64>,
    num_events: u32,
    events_in_cur_submit: u32,
}

impl<'a, C: PacketCatalog> HierarchyBuilder<'a, C> {
    pub(crate) fn new(
        catalog: &'a C,
        presents: &'a [PresentInfo],
        flatten_chain_nodes: bool,
    ) -> Self {
        let mut builder = Self {
            catalog,
            presents,
            flatten_chain_nodes,
            store: NodeStore::new(),
            node_children: Default::default(),
            node_shared_children: Default::default(),
            engine_nodes: Vec::new(),
            cur_submit: node_none_value(),
            ib_stack: Vec::new(),
            packet_run: Vec::new(),
            marker_stack: Vec::new(),
            internal_marker_stack: Vec::new(),
            num_events: 0,
            events_in_cur_submit: 0,
        };
        let root = builder.create_node(NodeType::Root, "Capture".to_string(), NodeAux::None, &[]);
        assert!(root == ROOT_NODE, "The root node has to be created first!");
        for engine_type in EngineType::ALL {
            let node = builder.create_node(
                NodeType::Engine,
                format!("Engine: {:?}", engine_type),
                NodeAux::None,
                &[],
            );
            builder.add_child(HierarchyView::Engine, ROOT_NODE, node);
            builder.engine_nodes.push(node);
        }
        builder
    }

    /// Derives the projected views, then compresses every pending adjacency
    /// table into its read-only topology
    pub(crate) fn finish(mut self, metadata_version: u32) -> CommandHierarchy {
        self.project_vulkan_views();
        let num_nodes = self.store.len();
        let mut topologies = Vec::with_capacity(VIEW_COUNT);
        for view in 0..VIEW_COUNT {
            let mut topology = Topology::new();
            topology.set_size(num_nodes);
            for node in 0..num_nodes {
                if !self.node_children[view][node].is_empty() {
                    topology.add_children(node as u64, &self.node_children[view][node]);
                }
                if !self.node_shared_children[view][node].is_empty() {
                    topology
                        .add_shared_children(node as u64, &self.node_shared_children[view][node]);
                }
            }
            topologies.push(topology);
        }
        debug!(
            "hierarchy built: {} nodes, {} events",
            num_nodes, self.num_events
        );
        CommandHierarchy {
            store: self.store,
            topologies,
            metadata_version,
        }
    }

    fn create_node(
        &mut self,
        node_type: NodeType,
        description: String,
        aux: NodeAux,
        metadata: &[u8],
    ) -> u64 {
        let node = self.store.add(node_type, description, aux, metadata);
        for view in 0..VIEW_COUNT {
            self.node_children[view].push(Vec::new());
            self.node_shared_children[view].push(Vec::new());
        }
        node
    }

    fn add_child(&mut self, view: HierarchyView, parent: u64, child: u64) {
        self.node_children[view.table_index()][parent as usize].push(child);
    }

    fn add_shared_child(&mut self, view: HierarchyView, parent: u64, child: u64) {
        self.node_shared_children[view.table_index()][parent as usize].push(child);
    }

    ///####################################################################################
    /// Packet decoding
    ///####################################################################################

    /// Shared-child attachment common to both packet classes: the packet
    /// leaf is reachable from its submit everywhere and from its indirect
    /// buffer in the buffer-structured views
    fn attach_packet_node(&mut self, packet_node: u64) {
        for view in [
            HierarchyView::Engine,
            HierarchyView::Submit,
            HierarchyView::AllEvent,
            HierarchyView::Rgp,
        ] {
            self.add_shared_child(view, self.cur_submit, packet_node);
        }
        if let Some(&ib_node) = self.ib_stack.last() {
            self.add_shared_child(HierarchyView::Engine, ib_node, packet_node);
            self.add_shared_child(HierarchyView::Submit, ib_node, packet_node);
        }
    }

    fn add_field_node(&mut self, packet_node: u64, description: String) {
        let node = self.create_node(
            NodeType::Field,
            description,
            NodeAux::RegField {
                is_ce_packet: false,
            },
            &[],
        );
        for view in [
            HierarchyView::Engine,
            HierarchyView::Submit,
            HierarchyView::AllEvent,
            HierarchyView::Rgp,
        ] {
            self.add_child(view, packet_node, node);
        }
    }

    /// Decodes the payload of a type-7 packet against its catalog schema.
    /// Payload dwords past the schema are kept as raw dword fields.
    fn add_packet_fields(
        &mut self,
        mem: &dyn MemoryAccess,
        submit_index: u32,
        packet_node: u64,
        packet_va: u64,
        header: &Type7Header,
    ) -> Result<(), DecodeError> {
        let catalog = self.catalog;
        let info = catalog
            .packet_info(header.opcode)
            .ok_or(DecodeError::CatalogMiss {
                opcode: header.opcode,
            })?;
        let mut last_decoded = 0;
        for packet_field in &info.fields {
            if header.count < packet_field.dword_offset {
                continue;
            }
            let va_addr = packet_va + packet_field.dword_offset as u64 * 4;
            let dword = mem
                .read_dword(submit_index, va_addr)
                .ok_or(DecodeError::MemoryRead {
                    submit_index,
                    va_addr,
                    size: 4,
                })?;
            let value = (dword & packet_field.bit_mask) >> packet_field.bit_shift;
            let description = match packet_field
                .enum_handle
                .and_then(|handle| catalog.enum_name(handle, value))
            {
                Some(value_name) => format!("{}: {}", packet_field.name, value_name),
                None => format!("{}: 0x{:x}", packet_field.name, value),
            };
            self.add_field_node(packet_node, description);
            last_decoded = last_decoded.max(packet_field.dword_offset);
        }
        for dword_index in last_decoded + 1..=header.count {
            let va_addr = packet_va + dword_index as u64 * 4;
            let dword = mem
                .read_dword(submit_index, va_addr)
                .ok_or(DecodeError::MemoryRead {
                    submit_index,
                    va_addr,
                    size: 4,
                })?;
            self.add_field_node(
                packet_node,
                format!("(DWORD {}): 0x{:08x}", dword_index, dword),
            );
        }
        Ok(())
    }

    /// Decodes a type-4 register write burst into one register node per
    /// written register, each with its defined bit-field children
    fn add_register_nodes(
        &mut self,
        mem: &dyn MemoryAccess,
        submit_index: u32,
        packet_node: u64,
        packet_va: u64,
        header: &Type4Header,
    ) -> Result<(), DecodeError> {
        let catalog = self.catalog;
        for burst_index in 0..header.count {
            let reg_offset = header.reg_offset + burst_index;
            let va_addr = packet_va + (1 + burst_index) as u64 * 4;
            let value = mem
                .read_dword(submit_index, va_addr)
                .ok_or(DecodeError::MemoryRead {
                    submit_index,
                    va_addr,
                    size: 4,
                })?;
            let reg_info = catalog.reg_info(reg_offset);
            let description = match reg_info {
                Some(info) => format!("{}: 0x{:08x}", info.name, value),
                None => format!("Unknown Reg 0x{:x}: 0x{:08x}", reg_offset, value),
            };
            let reg_node = self.create_node(
                NodeType::Reg,
                description,
                NodeAux::RegField {
                    is_ce_packet: false,
                },
                &[],
            );
            for view in [
                HierarchyView::Engine,
                HierarchyView::Submit,
                HierarchyView::AllEvent,
                HierarchyView::Rgp,
            ] {
                self.add_child(view, packet_node, reg_node);
            }
            if let Some(info) = reg_info {
                for reg_field in &info.fields {
                    let field_value = (value & reg_field.mask) >> reg_field.shift;
                    let node = self.create_node(
                        NodeType::Field,
                        format!("{}: 0x{:x}", reg_field.name, field_value),
                        NodeAux::RegField {
                            is_ce_packet: false,
                        },
                        &[],
                    );
                    for view in [
                        HierarchyView::Engine,
                        HierarchyView::Submit,
                        HierarchyView::AllEvent,
                        HierarchyView::Rgp,
                    ] {
                        self.add_child(view, reg_node, node);
                    }
                }
            }
        }
        Ok(())
    }

    ///####################################################################################
    /// Event runs
    ///####################################################################################

    /// Classifies the current run as a synchronization event. Always `None`
    /// until a catalog-driven classifier exists, so no `Sync` node is created
    /// during a walk today.
    fn detect_sync(&self, _mem: &dyn MemoryAccess, _submit_index: u32) -> Option<SyncType> {
        None
    }

    /// Closes the current packet run under a new event node: every buffered
    /// packet becomes a shared child of the event
    fn close_event_run(&mut self, node_type: NodeType, description: String, aux: NodeAux) {
        let event_node = self.create_node(node_type, description, aux, &[]);
        let run = std::mem::take(&mut self.packet_run);
        for packet in &run {
            self.add_shared_child(HierarchyView::AllEvent, event_node, packet.node);
            self.add_shared_child(HierarchyView::Rgp, event_node, packet.node);
        }
        let parent = self.marker_stack.last().copied().unwrap_or(self.cur_submit);
        self.add_child(HierarchyView::AllEvent, parent, event_node);
        let parent = self
            .internal_marker_stack
            .last()
            .copied()
            .unwrap_or(self.cur_submit);
        self.add_child(HierarchyView::Rgp, parent, event_node);
        self.store.register_event(event_node);
        self.num_events += 1;
        self.events_in_cur_submit += 1;
    }

    ///####################################################################################
    /// Markers
    ///####################################################################################

    /// Opens a labeled marker region: the node parents everything until the
    /// matching `end_marker`. Unmatched regions are dropped at submit end.
    pub(in crate::hierarchy) fn begin_marker(
        &mut self,
        kind: MarkerKind,
        id: u32,
        description: String,
    ) -> u64 {
        let node = self.create_node(NodeType::Marker, description, NodeAux::Marker { kind, id }, &[]);
        let parent = self.marker_stack.last().copied().unwrap_or(self.cur_submit);
        self.add_child(HierarchyView::AllEvent, parent, node);
        let parent = self
            .internal_marker_stack
            .last()
            .copied()
            .unwrap_or(self.cur_submit);
        self.add_child(HierarchyView::Rgp, parent, node);
        self.marker_stack.push(node);
        self.internal_marker_stack.push(node);
        node
    }

    pub(in crate::hierarchy) fn end_marker(&mut self) {
        self.marker_stack.pop();
        self.internal_marker_stack.pop();
    }

    ///####################################################################################
    /// Post-pass projections
    ///####################################################################################

    fn filtered_from_vulkan_call(&self, node: u64) -> bool {
        match self.store.node_type(node) {
            NodeType::DrawDispatchDma | NodeType::Sync | NodeType::PostambleState => true,
            NodeType::Marker => self.store.marker_kind(node) == MarkerKind::Barrier,
            _ => false,
        }
    }

    fn is_vulkan_event_node(&self, node: u64) -> bool {
        self.store.node_type(node) == NodeType::Marker
            && self.store.marker_kind(node) == MarkerKind::BeginEnd
    }

    fn is_non_event_vulkan_marker(&self, node: u64) -> bool {
        self.store.node_type(node) == NodeType::Marker && !self.is_vulkan_event_node(node)
    }

    /// Derives `VulkanCall` from `AllEvent` and `VulkanEvent` from
    /// `VulkanCall`, purely over the pending adjacency tables
    fn project_vulkan_views(&mut self) {
        let num_nodes = self.store.len();
        let all_event = HierarchyView::AllEvent.table_index();
        let vulkan_call = HierarchyView::VulkanCall.table_index();
        let vulkan_event = HierarchyView::VulkanEvent.table_index();

        // VulkanCall keeps the AllEvent shape minus the event-level nodes
        for node in 0..num_nodes {
            let kept: Vec<u64> = self.node_children[all_event][node]
                .iter()
                .copied()
                .filter(|child| !self.filtered_from_vulkan_call(*child))
                .collect();
            self.node_children[vulkan_call][node] = kept;
            self.node_shared_children[vulkan_call][node] =
                self.node_shared_children[all_event][node].clone();
        }

        // VulkanEvent drops non-event markers; packets shared under a dropped
        // marker carry forward onto the next event sibling
        for parent in 0..num_nodes {
            if self.is_non_event_vulkan_marker(parent as u64) {
                continue;
            }
            let mut carried: Vec<u64> = Vec::new();
            let children = self.node_children[vulkan_call][parent].clone();
            for child in children {
                if self.is_non_event_vulkan_marker(child) {
                    carried
                        .extend(self.node_shared_children[vulkan_call][child as usize].iter());
                    continue;
                }
                self.node_children[vulkan_event][parent].push(child);
                let own = self.node_shared_children[vulkan_call][child as usize].clone();
                if self.is_vulkan_event_node(child) {
                    carried.extend(own);
                    self.node_shared_children[vulkan_event][child as usize] =
                        std::mem::take(&mut carried);
                } else {
                    // packets of a dropped marker are never attributed to a
                    // sibling which is not an event
                    carried.clear();
                    self.node_shared_children[vulkan_event][child as usize] = own;
                }
            }
        }
    }
}

///####################################################################################
/// Emulator callback receiver
///####################################################################################

impl<'a, C: PacketCatalog> EmulatorCallbacks for HierarchyBuilder<'a, C> {
    fn on_submit_start(
        &mut self,
        submit_index: u32,
        submit: &SubmitInfo,
    ) -> Result<(), DecodeError> {
        debug_assert!(self.ib_stack.is_empty());
        debug_assert!(self.packet_run.is_empty());
        let description = format!(
            "Submit: {}, Num IBs: {}, Engine: {:?}, Queue: {:?}, Engine Index: {}{}",
            submit_index,
            submit.indirect_buffers().len(),
            submit.engine_type(),
            submit.queue_type(),
            submit.engine_index(),
            if submit.is_dummy() { ", Dummy" } else { "" }
        );
        let node = self.create_node(
            NodeType::Submit,
            description,
            NodeAux::Submit {
                engine_type: submit.engine_type(),
                submit_index,
            },
            &[],
        );
        let engine_position = EngineType::ALL
            .iter()
            .position(|engine_type| *engine_type == submit.engine_type())
            .unwrap();
        let engine_node = self.engine_nodes[engine_position];
        self.add_child(HierarchyView::Engine, engine_node, node);
        self.add_child(HierarchyView::Submit, ROOT_NODE, node);
        self.add_child(HierarchyView::AllEvent, ROOT_NODE, node);
        self.add_child(HierarchyView::Rgp, ROOT_NODE, node);
        self.cur_submit = node;
        self.events_in_cur_submit = 0;
        Ok(())
    }

    fn on_ib_start(
        &mut self,
        _submit_index: u32,
        ib_index: u8,
        ib: &IndirectBufferInfo,
        ib_type: IbType,
    ) -> Result<(), DecodeError> {
        let fully_captured = !ib.skip;
        let prefix = match ib_type {
            IbType::Normal => "IB",
            IbType::Call => "Call IB",
            IbType::Chain => "Chain IB",
        };
        let description = format!(
            "{}: {}, Address: 0x{:x}, Size (DWORDS): {}{}",
            prefix,
            ib_index,
            ib.va_addr,
            ib.size_in_dwords,
            if fully_captured { "" } else { ", NOT CAPTURED" }
        );
        let node = self.create_node(
            NodeType::Ib,
            description,
            NodeAux::Ib {
                ib_type,
                ib_index,
                size_in_dwords: ib.size_in_dwords,
                fully_captured,
            },
            &[],
        );
        // chains continue their predecessor, so with flattening enabled they
        // hang off the buffer which started the run
        let parent = if self.flatten_chain_nodes && ib_type == IbType::Chain {
            self.ib_stack
                .iter()
                .rev()
                .copied()
                .find(|ancestor| self.store.ib_type(*ancestor) != IbType::Chain)
                .unwrap_or(self.cur_submit)
        } else {
            self.ib_stack.last().copied().unwrap_or(self.cur_submit)
        };
        self.add_child(HierarchyView::Engine, parent, node);
        self.add_child(HierarchyView::Submit, parent, node);
        self.ib_stack.push(node);
        Ok(())
    }

    fn on_packet(
        &mut self,
        mem: &dyn MemoryAccess,
        submit_index: u32,
        _ib_index: u8,
        va_addr: u64,
        pm4_type: Pm4Type,
        header: u32,
    ) -> Result<(), DecodeError> {
        match pm4_type {
            Pm4Type::Type7 => {
                let parsed =
                    Type7Header::parse(header).ok_or(DecodeError::MalformedHeader {
                        submit_index,
                        va_addr,
                        header,
                    })?;
                let catalog = self.catalog;
                let info =
                    catalog
                        .packet_info(parsed.opcode)
                        .ok_or(DecodeError::CatalogMiss {
                            opcode: parsed.opcode,
                        })?;
                let node = self.create_node(
                    NodeType::Packet,
                    format!("{} 0x{:08x}", info.name, header),
                    NodeAux::Packet {
                        va_addr: va_addr & VA_MASK,
                        opcode: parsed.opcode,
                        is_ce_packet: false,
                    },
                    &[],
                );
                self.attach_packet_node(node);
                self.add_packet_fields(mem, submit_index, node, va_addr, &parsed)?;
                self.packet_run.push(BufferedPacket {
                    opcode: parsed.opcode,
                    node,
                });

                if let Some(sync_type) = self.detect_sync(mem, submit_index) {
                    let event_id = self.num_events;
                    self.close_event_run(
                        NodeType::Sync,
                        format!("Event: {}, Sync: {:?}", event_id, sync_type),
                        NodeAux::Sync {
                            sync_type,
                            sync_info: parsed.opcode as u32,
                        },
                    );
                } else if is_draw_dispatch_dma(parsed.opcode) {
                    let event_id = self.num_events;
                    self.close_event_run(
                        NodeType::DrawDispatchDma,
                        format!("Event: {}, {}", event_id, info.name),
                        NodeAux::Event { event_id },
                    );
                } else {
                    for marker in self.marker_stack.clone() {
                        self.add_shared_child(HierarchyView::AllEvent, marker, node);
                    }
                    for marker in self.internal_marker_stack.clone() {
                        self.add_shared_child(HierarchyView::Rgp, marker, node);
                    }
                }
            }
            Pm4Type::Type4 => {
                let parsed =
                    Type4Header::parse(header).ok_or(DecodeError::MalformedHeader {
                        submit_index,
                        va_addr,
                        header,
                    })?;
                let node = self.create_node(
                    NodeType::Packet,
                    format!("TYPE4 REGWRITE 0x{:08x}", header),
                    NodeAux::Packet {
                        va_addr: va_addr & VA_MASK,
                        opcode: NO_OPCODE,
                        is_ce_packet: false,
                    },
                    &[],
                );
                self.attach_packet_node(node);
                self.add_register_nodes(mem, submit_index, node, va_addr, &parsed)?;
                self.packet_run.push(BufferedPacket {
                    opcode: NO_OPCODE,
                    node,
                });
                for marker in self.marker_stack.clone() {
                    self.add_shared_child(HierarchyView::AllEvent, marker, node);
                }
                for marker in self.internal_marker_stack.clone() {
                    self.add_shared_child(HierarchyView::Rgp, marker, node);
                }
            }
            Pm4Type::Other => {
                unreachable!("The emulator only reports type-4 and type-7 packets!")
            }
        }
        Ok(())
    }

    fn on_ib_end(
        &mut self,
        _submit_index: u32,
        _ib_index: u8,
        _ib: &IndirectBufferInfo,
    ) -> Result<(), DecodeError> {
        // a whole chain run shares this single callback
        while let Some(&top) = self.ib_stack.last() {
            if self.store.ib_type(top) == IbType::Chain {
                self.ib_stack.pop();
            } else {
                break;
            }
        }
        assert!(
            self.ib_stack.pop().is_some(),
            "IB end callback without a matching IB on the stack!"
        );
        Ok(())
    }

    fn on_submit_end(
        &mut self,
        submit_index: u32,
        _submit: &SubmitInfo,
    ) -> Result<(), DecodeError> {
        // the submit view lists buffers in a deterministic ib-index order, no
        // matter how the emulator reached them
        let store = &self.store;
        self.node_children[HierarchyView::Submit.table_index()][self.cur_submit as usize]
            .sort_by_key(|node| store.ib_index(*node));

        if !self.packet_run.is_empty() {
            let title = if 0 < self.events_in_cur_submit {
                "State"
            } else {
                "Postamble State"
            };
            let node =
                self.create_node(NodeType::PostambleState, title.to_string(), NodeAux::None, &[]);
            let run = std::mem::take(&mut self.packet_run);
            for packet in &run {
                self.add_shared_child(HierarchyView::AllEvent, node, packet.node);
                self.add_shared_child(HierarchyView::Rgp, node, packet.node);
            }
            self.add_child(HierarchyView::AllEvent, self.cur_submit, node);
            self.add_child(HierarchyView::Rgp, self.cur_submit, node);
        }

        if !self.marker_stack.is_empty() {
            warn!(
                "submit {}: {} unmatched debug marker region(s) dropped",
                submit_index,
                self.marker_stack.len()
            );
        }
        self.marker_stack.clear();
        self.internal_marker_stack.clear();

        for (present_index, present) in self.presents.iter().enumerate() {
            if present.submit_index == submit_index {
                let node = self.create_node(
                    NodeType::Present,
                    format!("Present: {}", present_index),
                    NodeAux::None,
                    &[],
                );
                self.add_child(HierarchyView::AllEvent, ROOT_NODE, node);
                self.add_child(HierarchyView::Rgp, ROOT_NODE, node);
            }
        }

        self.cur_submit = node_none_value();
        self.ib_stack.clear();
        Ok(())
    }
}
