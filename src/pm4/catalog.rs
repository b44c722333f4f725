use std::collections::HashMap;

use crate::pm4::types::*;

/// One named bit range inside a packet payload dword. `dword_offset` counts
/// from the packet header, so payload fields start at offset 1.
#[derive(Debug, Clone)]
pub struct PacketField {
    pub name: String,
    pub dword_offset: u32,
    pub bit_mask: u32,
    pub bit_shift: u32,
    pub enum_handle: Option<u32>,
}

/// Decode schema of one type-7 opcode
#[derive(Debug, Clone)]
pub struct PacketInfo {
    pub name: String,
    pub fields: Vec<PacketField>,
}

/// One named bit range inside a register
#[derive(Debug, Clone)]
pub struct RegField {
    pub name: String,
    pub mask: u32,
    pub shift: u32,
}

/// Decode schema of one register address
#[derive(Debug, Clone)]
pub struct RegInfo {
    pub name: String,
    pub fields: Vec<RegField>,
}

/// Read-only lookup from opcodes, register addresses and enum handles to
/// their decode schemas. Implementations are expected to be generated from
/// the hardware description and stay stable for the whole build.
pub trait PacketCatalog {
    /// Packet schema for a type-7 opcode. A miss is fatal to a build, the
    /// capture is unknown to this catalog.
    fn packet_info(&self, opcode: u8) -> Option<&PacketInfo>;

    /// Register schema for a register dword offset. A miss here is not fatal,
    /// the consumer renders an unknown-register placeholder.
    fn reg_info(&self, reg_offset: u32) -> Option<&RegInfo>;

    /// Value name within the enum the given handle addresses
    fn enum_name(&self, enum_handle: u32, value: u32) -> Option<&str>;

    /// Mnemonic of a type-7 opcode
    fn opcode_name(&self, opcode: u8) -> Option<&str> {
        self.packet_info(opcode).map(|info| info.name.as_str())
    }
}

///####################################################################################
/// TableCatalog
///####################################################################################

/// Catalog backed by plain lookup tables. `a6xx()` carries the packet and
/// register subset this crate decodes on its own; production tooling loads a
/// complete generated table set through the same type.
#[derive(Debug, Default, Clone)]
pub struct TableCatalog {
    packets: HashMap<u8, PacketInfo>,
    registers: HashMap<u32, RegInfo>,
    enums: Vec<HashMap<u32, String>>,
}

// enum handles of the built-in tables
pub const ENUM_PRIM_TYPE: u32 = 0;
pub const ENUM_SOURCE_SELECT: u32 = 1;
pub const ENUM_VIS_CULL: u32 = 2;
pub const ENUM_VGT_EVENT: u32 = 3;
pub const ENUM_MARKER_MODE: u32 = 4;

impl TableCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_packet(&mut self, opcode: u8, info: PacketInfo) {
        self.packets.insert(opcode, info);
    }

    pub fn add_register(&mut self, reg_offset: u32, info: RegInfo) {
        self.registers.insert(reg_offset, info);
    }

    /// Registers an enum value table and returns with its handle
    pub fn add_enum(&mut self, values: &[(u32, &str)]) -> u32 {
        let mut table = HashMap::new();
        for (value, name) in values {
            table.insert(*value, (*name).to_string());
        }
        self.enums.push(table);
        self.enums.len() as u32 - 1
    }

    /// The a6xx packet subset known to this crate
    pub fn a6xx() -> Self {
        let mut catalog = Self::new();

        let prim_type = catalog.add_enum(&[
            (0, "DI_PT_NONE"),
            (1, "DI_PT_POINTLIST"),
            (2, "DI_PT_LINELIST"),
            (3, "DI_PT_LINESTRIP"),
            (4, "DI_PT_TRILIST"),
            (5, "DI_PT_TRIFAN"),
            (6, "DI_PT_TRISTRIP"),
        ]);
        debug_assert!(prim_type == ENUM_PRIM_TYPE);
        let source_select = catalog.add_enum(&[
            (0, "DI_SRC_SEL_DMA"),
            (1, "DI_SRC_SEL_IMMEDIATE"),
            (2, "DI_SRC_SEL_AUTO_INDEX"),
            (3, "DI_SRC_SEL_RESERVED"),
        ]);
        debug_assert!(source_select == ENUM_SOURCE_SELECT);
        let vis_cull = catalog.add_enum(&[(0, "IGNORE_VISIBILITY"), (1, "USE_VISIBILITY")]);
        debug_assert!(vis_cull == ENUM_VIS_CULL);
        let vgt_event = catalog.add_enum(&[
            (4, "CACHE_FLUSH_TS"),
            (19, "CACHE_FLUSH"),
            (21, "ZPASS_DONE"),
        ]);
        debug_assert!(vgt_event == ENUM_VGT_EVENT);
        let marker_mode = catalog.add_enum(&[
            (1, "RM6_BYPASS"),
            (2, "RM6_BINNING"),
            (4, "RM6_GMEM"),
            (5, "RM6_ENDVIS"),
            (6, "RM6_RESOLVE"),
            (7, "RM6_YIELD"),
            (8, "RM6_COMPUTE"),
        ]);
        debug_assert!(marker_mode == ENUM_MARKER_MODE);

        let draw_initiator = |catalog: &mut TableCatalog, opcode: u8, name: &str| {
            catalog.add_packet(
                opcode,
                PacketInfo {
                    name: name.to_string(),
                    fields: vec![
                        field("PRIM_TYPE", 1, 0x0000003F, 0, Some(ENUM_PRIM_TYPE)),
                        field("SOURCE_SELECT", 1, 0x000000C0, 6, Some(ENUM_SOURCE_SELECT)),
                        field("VIS_CULL", 1, 0x00000300, 8, Some(ENUM_VIS_CULL)),
                        field("INDEX_SIZE", 1, 0x00000C00, 10, None),
                        field("PATCH_TYPE", 1, 0x00003000, 12, None),
                    ],
                },
            );
        };

        draw_initiator(&mut catalog, CP_DRAW_AUTO, "CP_DRAW_AUTO");
        draw_initiator(&mut catalog, CP_DRAW_INDIRECT, "CP_DRAW_INDIRECT");
        draw_initiator(&mut catalog, CP_DRAW_INDX_INDIRECT, "CP_DRAW_INDX_INDIRECT");
        draw_initiator(
            &mut catalog,
            CP_DRAW_INDIRECT_MULTI,
            "CP_DRAW_INDIRECT_MULTI",
        );
        catalog.add_packet(
            CP_DRAW_INDX_OFFSET,
            PacketInfo {
                name: "CP_DRAW_INDX_OFFSET".to_string(),
                fields: vec![
                    field("PRIM_TYPE", 1, 0x0000003F, 0, Some(ENUM_PRIM_TYPE)),
                    field("SOURCE_SELECT", 1, 0x000000C0, 6, Some(ENUM_SOURCE_SELECT)),
                    field("VIS_CULL", 1, 0x00000300, 8, Some(ENUM_VIS_CULL)),
                    field("INDEX_SIZE", 1, 0x00000C00, 10, None),
                    field("PATCH_TYPE", 1, 0x00003000, 12, None),
                    field("NUM_INSTANCES", 2, 0xFFFFFFFF, 0, None),
                    field("NUM_INDICES", 3, 0xFFFFFFFF, 0, None),
                ],
            },
        );
        catalog.add_packet(
            CP_EXEC_CS,
            PacketInfo {
                name: "CP_EXEC_CS".to_string(),
                fields: vec![
                    field("NGROUPS_X", 2, 0xFFFFFFFF, 0, None),
                    field("NGROUPS_Y", 3, 0xFFFFFFFF, 0, None),
                    field("NGROUPS_Z", 4, 0xFFFFFFFF, 0, None),
                ],
            },
        );
        catalog.add_packet(
            CP_EVENT_WRITE,
            PacketInfo {
                name: "CP_EVENT_WRITE".to_string(),
                fields: vec![field("EVENT", 1, 0x000000FF, 0, Some(ENUM_VGT_EVENT))],
            },
        );
        catalog.add_packet(
            CP_SET_MARKER,
            PacketInfo {
                name: "CP_SET_MARKER".to_string(),
                fields: vec![field("MODE", 1, 0x0000000F, 0, Some(ENUM_MARKER_MODE))],
            },
        );
        catalog.add_packet(
            CP_WAIT_REG_MEM,
            PacketInfo {
                name: "CP_WAIT_REG_MEM".to_string(),
                fields: vec![
                    field("FUNCTION", 1, 0x00000007, 0, None),
                    field("POLL_ADDR_LO", 2, 0xFFFFFFFF, 0, None),
                    field("POLL_ADDR_HI", 3, 0xFFFFFFFF, 0, None),
                    field("REF", 4, 0xFFFFFFFF, 0, None),
                    field("MASK", 5, 0xFFFFFFFF, 0, None),
                    field("DELAY_LOOP_CYCLES", 6, 0xFFFFFFFF, 0, None),
                ],
            },
        );
        for opcode in [CP_INDIRECT_BUFFER, CP_INDIRECT_BUFFER_CHAIN] {
            let name = if opcode == CP_INDIRECT_BUFFER {
                "CP_INDIRECT_BUFFER"
            } else {
                "CP_INDIRECT_BUFFER_CHAIN"
            };
            catalog.add_packet(
                opcode,
                PacketInfo {
                    name: name.to_string(),
                    fields: vec![
                        field("IB_BASE_LO", 1, 0xFFFFFFFF, 0, None),
                        field("IB_BASE_HI", 2, 0xFFFFFFFF, 0, None),
                        field("IB_SIZE", 3, 0x000FFFFF, 0, None),
                    ],
                },
            );
        }

        // opcodes decoded as raw payload dwords
        for (opcode, name) in [
            (CP_NOP, "CP_NOP"),
            (CP_WAIT_MEM_WRITES, "CP_WAIT_MEM_WRITES"),
            (CP_WAIT_FOR_ME, "CP_WAIT_FOR_ME"),
            (CP_SKIP_IB2_ENABLE_GLOBAL, "CP_SKIP_IB2_ENABLE_GLOBAL"),
            (CP_REG_RMW, "CP_REG_RMW"),
            (CP_WAIT_FOR_IDLE, "CP_WAIT_FOR_IDLE"),
            (CP_BLIT, "CP_BLIT"),
            (CP_LOAD_STATE6_GEOM, "CP_LOAD_STATE6_GEOM"),
            (CP_LOAD_STATE6_FRAG, "CP_LOAD_STATE6_FRAG"),
            (CP_LOAD_STATE6, "CP_LOAD_STATE6"),
            (CP_MEM_WRITE, "CP_MEM_WRITE"),
            (CP_REG_TO_MEM, "CP_REG_TO_MEM"),
            (CP_EXEC_CS_INDIRECT, "CP_EXEC_CS_INDIRECT"),
            (CP_SET_DRAW_STATE, "CP_SET_DRAW_STATE"),
            (CP_SET_PSEUDO_REG, "CP_SET_PSEUDO_REG"),
            (CP_CONTEXT_REG_BUNCH, "CP_CONTEXT_REG_BUNCH"),
            (CP_MEM_TO_MEM, "CP_MEM_TO_MEM"),
            (CP_MEMCPY, "CP_MEMCPY"),
        ] {
            catalog.add_packet(
                opcode,
                PacketInfo {
                    name: name.to_string(),
                    fields: Vec::new(),
                },
            );
        }

        catalog.add_register(
            0x8000,
            RegInfo {
                name: "GRAS_CL_CNTL".to_string(),
                fields: vec![
                    reg_field("CLIP_DISABLE", 0x00000001, 0),
                    reg_field("ZNEAR_CLIP_DISABLE", 0x00000002, 1),
                    reg_field("ZFAR_CLIP_DISABLE", 0x00000004, 2),
                    reg_field("PERSP_DIVISION_DISABLE", 0x00000100, 8),
                ],
            },
        );
        catalog.add_register(
            0x8090,
            RegInfo {
                name: "GRAS_SU_CNTL".to_string(),
                fields: vec![
                    reg_field("CULL_FRONT", 0x00000001, 0),
                    reg_field("CULL_BACK", 0x00000002, 1),
                    reg_field("FRONT_CW", 0x00000004, 2),
                    reg_field("LINEHALFWIDTH", 0x000007F8, 3),
                ],
            },
        );
        catalog.add_register(
            0xA000,
            RegInfo {
                name: "VFD_CONTROL_0".to_string(),
                fields: vec![
                    reg_field("FETCH_CNT", 0x0000003F, 0),
                    reg_field("DECODE_CNT", 0x00003F00, 8),
                ],
            },
        );

        catalog
    }
}

fn field(
    name: &str,
    dword_offset: u32,
    bit_mask: u32,
    bit_shift: u32,
    enum_handle: Option<u32>,
) -> PacketField {
    PacketField {
        name: name.to_string(),
        dword_offset,
        bit_mask,
        bit_shift,
        enum_handle,
    }
}

fn reg_field(name: &str, mask: u32, shift: u32) -> RegField {
    RegField {
        name: name.to_string(),
        mask,
        shift,
    }
}

impl PacketCatalog for TableCatalog {
    fn packet_info(&self, opcode: u8) -> Option<&PacketInfo> {
        self.packets.get(&opcode)
    }

    fn reg_info(&self, reg_offset: u32) -> Option<&RegInfo> {
        self.registers.get(&reg_offset)
    }

    fn enum_name(&self, enum_handle: u32, value: u32) -> Option<&str> {
        self.enums
            .get(enum_handle as usize)
            .and_then(|table| table.get(&value))
            .map(|name| name.as_str())
    }
}
