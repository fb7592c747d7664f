//! Dial plan bounded context - entry point registry, per-call execution
//! environment and the dispatch manager

pub mod entry_point;
pub mod environment;
pub mod manager;

pub use entry_point::{DialPlan, EntryPoint, EntryPointBody, EntryPointName};
pub use environment::ExecutionEnvironment;
pub use manager::DispatchManager;
