// kernel/src/process/mod.rs

pub mod descriptor;
pub mod table;

pub use descriptor::{BlockReason, Pid, Process, ProcessState, Registers};
pub use table::ProcessTable;
