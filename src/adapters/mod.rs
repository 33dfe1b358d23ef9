// Adapters layer: concrete implementations of the domain ports.

pub mod atomic;
pub mod storage;
