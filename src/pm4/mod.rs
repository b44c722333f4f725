pub mod catalog;
pub mod emulator;
mod tests;
pub mod types;

pub use catalog::{PacketCatalog, PacketField, PacketInfo, RegField, RegInfo, TableCatalog};
pub use emulator::{EmulatorCallbacks, Pm4Emulator};
pub use types::{DecodeError, IbType, Pm4Type, Type4Header, Type7Header};
