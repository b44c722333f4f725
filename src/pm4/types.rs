use thiserror::Error;

#[cfg(feature = "serialization")]
use serde::{Deserialize, Serialize};

/// Errors aborting a hierarchy build. Anything else the builder could trip on
/// (type-mismatched accessors, IB stack underflow) is a programming error and
/// asserts instead.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("malformed PM4 header 0x{header:08x} at 0x{va_addr:x} in submit {submit_index}")]
    MalformedHeader {
        submit_index: u32,
        va_addr: u64,
        header: u32,
    },
    #[error("{size} bytes at 0x{va_addr:x} are missing from the capture of submit {submit_index}")]
    MemoryRead {
        submit_index: u32,
        va_addr: u64,
        size: u64,
    },
    #[error("opcode 0x{opcode:02x} has no entry in the packet catalog")]
    CatalogMiss { opcode: u8 },
    #[error("indirect buffers nested deeper than {max_depth} levels in submit {submit_index}")]
    IbNesting { submit_index: u32, max_depth: u32 },
}

/// How control was transferred into an indirect buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
pub enum IbType {
    /// Top level buffer referenced directly from the submit
    Normal,
    /// Nested transfer which returns to the caller
    Call,
    /// Tail transfer, does not nest on the call stack
    Chain,
}

/// Packet class of a 32 bit stream header, decided by bits [31:28]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
pub enum Pm4Type {
    Type4,
    Type7,
    Other,
}

pub fn classify_header(header: u32) -> Pm4Type {
    match header >> 28 {
        0x4 => Pm4Type::Type4,
        0x7 => Pm4Type::Type7,
        _ => Pm4Type::Other,
    }
}

/// Odd parity bit over a header field: set so the field together with the bit
/// has an odd number of ones
fn odd_parity_bit(value: u32) -> u32 {
    (value.count_ones() + 1) & 1
}

///####################################################################################
/// Type-7 header: opcode packet
///####################################################################################

/// `count` is the number of payload dwords following the header, `opcode`
/// selects the packet schema. Both fields carry an odd parity bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Type7Header {
    pub opcode: u8,
    pub count: u32,
}

impl Type7Header {
    /// Bit layout: [13:0] count, [15] count parity, [22:16] opcode,
    /// [23] opcode parity, [31:28] packet type
    pub fn parse(header: u32) -> Option<Type7Header> {
        if classify_header(header) != Pm4Type::Type7 {
            return None;
        }
        let count = header & 0x3FFF;
        let opcode = (header >> 16) & 0x7F;
        if (header >> 15) & 1 != odd_parity_bit(count) || (header >> 23) & 1 != odd_parity_bit(opcode)
        {
            return None;
        }
        Some(Type7Header {
            opcode: opcode as u8,
            count,
        })
    }

    pub fn pack(opcode: u8, count: u32) -> u32 {
        debug_assert!(count <= 0x3FFF);
        debug_assert!(opcode <= 0x7F);
        0x7000_0000
            | (count & 0x3FFF)
            | (odd_parity_bit(count & 0x3FFF) << 15)
            | ((opcode as u32) << 16)
            | (odd_parity_bit(opcode as u32) << 23)
    }
}

///####################################################################################
/// Type-4 header: register write burst
///####################################################################################

/// Writes `count` consecutive dwords starting at register `reg_offset`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Type4Header {
    pub reg_offset: u32,
    pub count: u32,
}

impl Type4Header {
    /// Bit layout: [6:0] count, [7] count parity, [25:8] register offset,
    /// [27] offset parity, [31:28] packet type
    pub fn parse(header: u32) -> Option<Type4Header> {
        if classify_header(header) != Pm4Type::Type4 {
            return None;
        }
        let count = header & 0x7F;
        let reg_offset = (header >> 8) & 0x3FFFF;
        if (header >> 7) & 1 != odd_parity_bit(count) || (header >> 27) & 1 != odd_parity_bit(reg_offset)
        {
            return None;
        }
        Some(Type4Header { reg_offset, count })
    }

    pub fn pack(reg_offset: u32, count: u32) -> u32 {
        debug_assert!(count <= 0x7F);
        debug_assert!(reg_offset <= 0x3FFFF);
        0x4000_0000
            | (count & 0x7F)
            | (odd_parity_bit(count & 0x7F) << 7)
            | ((reg_offset & 0x3FFFF) << 8)
            | (odd_parity_bit(reg_offset & 0x3FFFF) << 27)
    }
}

///####################################################################################
/// Opcodes
///####################################################################################

// Adreno a6xx opcode numbering
pub const CP_NOP: u8 = 0x10;
pub const CP_WAIT_MEM_WRITES: u8 = 0x12;
pub const CP_WAIT_FOR_ME: u8 = 0x13;
pub const CP_SKIP_IB2_ENABLE_GLOBAL: u8 = 0x1D;
pub const CP_REG_RMW: u8 = 0x21;
pub const CP_DRAW_AUTO: u8 = 0x24;
pub const CP_WAIT_FOR_IDLE: u8 = 0x26;
pub const CP_DRAW_INDIRECT: u8 = 0x28;
pub const CP_DRAW_INDX_INDIRECT: u8 = 0x29;
pub const CP_DRAW_INDIRECT_MULTI: u8 = 0x2A;
pub const CP_BLIT: u8 = 0x2C;
pub const CP_LOAD_STATE6_GEOM: u8 = 0x32;
pub const CP_EXEC_CS: u8 = 0x33;
pub const CP_LOAD_STATE6_FRAG: u8 = 0x34;
pub const CP_LOAD_STATE6: u8 = 0x36;
pub const CP_DRAW_INDX_OFFSET: u8 = 0x38;
pub const CP_WAIT_REG_MEM: u8 = 0x3C;
pub const CP_MEM_WRITE: u8 = 0x3D;
pub const CP_REG_TO_MEM: u8 = 0x3E;
pub const CP_INDIRECT_BUFFER: u8 = 0x3F;
pub const CP_EXEC_CS_INDIRECT: u8 = 0x41;
pub const CP_SET_DRAW_STATE: u8 = 0x43;
pub const CP_EVENT_WRITE: u8 = 0x46;
pub const CP_SET_PSEUDO_REG: u8 = 0x56;
pub const CP_INDIRECT_BUFFER_CHAIN: u8 = 0x57;
pub const CP_CONTEXT_REG_BUNCH: u8 = 0x5C;
pub const CP_SET_MARKER: u8 = 0x65;
pub const CP_MEM_TO_MEM: u8 = 0x73;
pub const CP_MEMCPY: u8 = 0x75;

/// Sentinel opcode of packets which have none (type-4 register bursts)
pub const NO_OPCODE: u8 = u8::MAX;

/// Returns with true for opcodes which close a run of state packets as a
/// draw, dispatch or blit event
pub fn is_draw_dispatch_dma(opcode: u8) -> bool {
    matches!(
        opcode,
        CP_DRAW_INDX_OFFSET
            | CP_DRAW_INDIRECT
            | CP_DRAW_INDX_INDIRECT
            | CP_DRAW_INDIRECT_MULTI
            | CP_DRAW_AUTO
            | CP_EXEC_CS
            | CP_EXEC_CS_INDIRECT
            | CP_BLIT
    )
}

/// Returns with true for opcodes transferring control into another indirect
/// buffer
pub fn is_ib_transfer(opcode: u8) -> bool {
    matches!(opcode, CP_INDIRECT_BUFFER | CP_INDIRECT_BUFFER_CHAIN)
}
