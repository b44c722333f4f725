// TODO:
// - decode CP_NOP-wrapped capture-layer payloads into Marker nodes, the begin/end
//   plumbing in the builder is already there
// - catalog-driven sync classification so packet runs can close as Sync events,
//   detect_sync always comes back empty until then
// - per-family payload decoders for CP_LOAD_STATE6 / CP_SET_DRAW_STATE, the raw
//   dword fallback loses the embedded state block structure

pub mod capture;
pub mod hierarchy;
pub mod pm4;
pub mod topology;
