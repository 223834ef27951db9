// kernel/src/config.rs
//
// Policy constants pulled out of the mechanism, the way the teacher
// keeps e.g. DOUBLE_FAULT_IST_INDEX separate from the IDT builder.
// Tests shrink these (a 2-slot table, a 2-tick quantum) without
// touching dispatcher/scheduler/pager code.

/// Scheduler policy selectable at `Kernel` construction time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerPolicy {
    /// Plain FIFO ready queue, the default.
    RoundRobin,
    /// Ready queue ordered by a recomputed priority (§4.3).
    Priority,
}

impl Default for SchedulerPolicy {
    fn default() -> Self {
        SchedulerPolicy::RoundRobin
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernelConfig {
    /// Fixed process table capacity.
    pub max_processes: usize,
    /// Clock ticks a process may run before the scheduler rotates.
    pub quantum: i32,
    /// Instructions between clock IRQs, reprogrammed on every tick.
    pub interval: u32,
    /// Hardware page size in cells, shared with the MMU.
    pub page_size: u32,
    /// First 100 cells of main memory are reserved for IRQ scratch;
    /// the frame allocator starts past them.
    pub reserved_cells: u32,
    pub scheduler_policy: SchedulerPolicy,
}

impl KernelConfig {
    /// First frame number available to user programs.
    pub fn first_free_frame(&self) -> u32 {
        self.reserved_cells.div_ceil(self.page_size)
    }
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            max_processes: 4,
            quantum: 5,
            interval: 50,
            page_size: 16,
            reserved_cells: 100,
            scheduler_policy: SchedulerPolicy::RoundRobin,
        }
    }
}
