//! Built-in vendor platform definitions.

pub mod arista_eos;
pub mod linux;
pub mod sonic;
