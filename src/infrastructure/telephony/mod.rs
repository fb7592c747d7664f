//! Call implementations usable without a signalling connection

pub mod loopback;

pub use loopback::LoopbackCall;
