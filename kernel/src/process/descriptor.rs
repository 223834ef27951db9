// kernel/src/process/descriptor.rs
//
// Process Control Block. Field shape follows spec.md §3; naming
// follows the teacher's `Process` (kernel/src/process/mod.rs) more
// than the Portuguese original's `process_t`, since this is Rust code
// a Rust reader should recognize, not a transliteration.

use crate::machine::CpuMode;
use crate::memory::page_table::PageTable;

pub type Pid = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    Ready,
    Blocked,
    Stopped,
}

/// Why a BLOCKED descriptor is waiting. Modeled as a sum type per
/// spec.md §9 rather than two independent nullable fields — the
/// original C keeps `dispES`/`esperando` as parallel fields and has to
/// test both everywhere; that duplication is exactly what an enum
/// forecloses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockReason {
    None,
    /// Waiting on device `device`; `datum` is the byte queued for a
    /// pending WRITE, absent for a pending READ.
    Io { device: u32, datum: Option<i32> },
    WaitPeer(Pid),
}

impl BlockReason {
    pub fn is_blocked(&self) -> bool {
        !matches!(self, BlockReason::None)
    }
}

/// The six saved CPU registers, exactly spec.md §3's register set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registers {
    pub pc: i32,
    pub a: i32,
    pub x: i32,
    pub error: i32,
    pub complement: i32,
    pub mode: CpuMode,
}

impl Registers {
    pub const fn zeroed() -> Self {
        Self { pc: 0, a: 0, x: 0, error: 0, complement: 0, mode: CpuMode::Supervisor }
    }
}

#[derive(Debug, Clone)]
pub struct Process {
    pub id: Pid,
    pub state: ProcessState,
    pub registers: Registers,
    pub quantum: i32,
    /// Only meaningful under the priority scheduler; initialized to
    /// 0.5 and recomputed at every preemption point (§4.3).
    pub priority: f32,
    pub block_reason: BlockReason,
    pub page_table: PageTable,
    /// Disk offset where this process's program image was written.
    pub disk_origin: u32,

    // Statistics (§4.6) — accumulated per-process, read out on report.
    pub exec_ticks: u64,
    pub preemptions: u32,
    pub ready_entries: u32,
    pub blocked_entries: u32,
    pub stopped_entries: u32,
    pub ready_ticks: u64,
    pub blocked_ticks: u64,
}

impl Process {
    /// Transition into `state`, bumping the matching per-state entry
    /// counter (§4.6 "per-state entry counts"). Every call site that
    /// changes `state` goes through this instead of a bare field
    /// assignment, so the statistics report can trust the counters.
    pub fn enter_state(&mut self, state: ProcessState) {
        match state {
            ProcessState::Ready => self.ready_entries += 1,
            ProcessState::Blocked => self.blocked_entries += 1,
            ProcessState::Stopped => self.stopped_entries += 1,
        }
        self.state = state;
    }

    pub fn new(id: Pid, pc: i32, page_table: PageTable, disk_origin: u32, quantum: i32) -> Self {
        Self {
            id,
            state: ProcessState::Ready,
            registers: Registers { pc, ..Registers::zeroed() },
            quantum,
            priority: 0.5,
            block_reason: BlockReason::None,
            page_table,
            disk_origin,
            exec_ticks: 0,
            preemptions: 0,
            ready_entries: 1,
            blocked_entries: 0,
            stopped_entries: 0,
            ready_ticks: 0,
            blocked_ticks: 0,
        }
    }

    /// The sentinel idle descriptor: id=-1 is represented out-of-band
    /// (the idle process never occupies a table slot, see
    /// `crate::scheduler::Current`), so here it just needs CPU_HALTED
    /// pre-loaded into the error register and an empty page table.
    pub fn idle() -> Self {
        Self {
            id: usize::MAX,
            state: ProcessState::Ready,
            registers: Registers {
                error: crate::machine::CPU_HALTED,
                ..Registers::zeroed()
            },
            quantum: 0,
            priority: 0.0,
            block_reason: BlockReason::None,
            page_table: PageTable::empty(),
            disk_origin: 0,
            exec_ticks: 0,
            preemptions: 0,
            ready_entries: 0,
            blocked_entries: 0,
            stopped_entries: 0,
            ready_ticks: 0,
            blocked_ticks: 0,
        }
    }
}
