//! Interrupt-driven kernel core for a simulated teaching machine.
//!
//! The kernel multiplexes one simulated CPU among a small, bounded set
//! of user processes: it dispatches hardware interrupts, services a
//! fixed menu of system calls, schedules ready processes, and brings
//! process pages in from disk on demand. The hardware itself — CPU,
//! memory, MMU, clock, console, disk — is supplied by whatever
//! implements [`machine::Machine`]; this crate never touches real
//! hardware.
//!
//! The single entry point is [`Kernel::trap`], run to completion on
//! every interrupt the simulated CPU accepts:
//!
//! ```text
//! save_cpu_state -> dispatch(irq) -> resolve_pending -> schedule -> load_cpu_state
//! ```

pub mod config;
pub mod error;
pub mod interrupts;
pub mod machine;
pub mod memory;
pub mod process;
pub mod scheduler;
pub mod stats;
pub mod syscall;

#[cfg(any(test, feature = "test-util"))]
pub mod testutil;

use std::fs::File;
use std::io::Write as _;

use log::{info, trace};

use config::KernelConfig;
use error::TrapOutcome;
use interrupts::IrqKind;
use machine::{IrqSlots, Machine};
use memory::{DiskAllocator, FrameAllocator};
use process::{Process, ProcessTable};
use scheduler::{build_ready_queue, Current, ReadyQueue};
use stats::StatsCollector;

/// Owns every piece of kernel-side state: the process table, the ready
/// queue (behind its policy-selected trait object), the frame and disk
/// allocators, the statistics collector, and the current-process
/// pointer. Unlike the teacher's `static SCHEDULER: Mutex<Scheduler>`,
/// this is a plain owned struct (§9 "Global mutable state... all other
/// kernel state belongs to the kernel struct") so a test can stand up
/// as many independent kernels as it likes.
pub struct Kernel {
    config: KernelConfig,
    table: ProcessTable,
    queue: Box<dyn ReadyQueue + Send>,
    frames: FrameAllocator,
    disk: DiskAllocator,
    stats: StatsCollector,
    current: Current,
    stats_path: Option<String>,
}

impl Kernel {
    pub fn new(config: KernelConfig) -> Self {
        let table = ProcessTable::new(config.max_processes);
        let queue = build_ready_queue(config.scheduler_policy);
        let frames = FrameAllocator::new(config.first_free_frame());
        Self {
            config,
            table,
            queue,
            frames,
            disk: DiskAllocator::new(),
            stats: StatsCollector::new(),
            current: Current::Idle,
            stats_path: Some("stats.log".to_string()),
        }
    }

    /// Override where the statistics report is written; `None`
    /// suppresses the write entirely (useful for tests that just want
    /// to inspect the in-memory collector).
    pub fn set_stats_path(&mut self, path: Option<String>) {
        self.stats_path = path;
    }

    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    pub fn process_table(&self) -> &ProcessTable {
        &self.table
    }

    pub fn current(&self) -> Current {
        self.current
    }

    pub fn stats(&self) -> &StatsCollector {
        &self.stats
    }

    /// The single entry point (spec.md §2). Runs the five-phase
    /// pipeline to completion; never yields partway through (§5).
    ///
    /// All five phases run unconditionally, even when Dispatch reports
    /// `Halted` — matching `original_source`'s `so_trata_interrupcao`,
    /// which calls `so_trata_pendencias`/`so_escalona`/`so_despacha`
    /// regardless of the error `so_trata_irq` returns. Only the
    /// trap's own return value communicates the halt; Resolve,
    /// Schedule and Load are never skipped (§4.1 "no reordering",
    /// §8.1's "exactly one [descriptor] is current upon exit from
    /// Load" on every trap).
    pub fn trap<M: Machine>(&mut self, machine: &mut M, irq: IrqKind) -> TrapOutcome {
        self.stats.record_irq(irq);

        self.save(machine);

        let interrupts::dispatch::DispatchResult { current, outcome } = interrupts::dispatch::dispatch(
            machine,
            &self.config,
            &mut self.table,
            self.queue.as_mut(),
            &mut self.frames,
            &mut self.disk,
            &mut self.stats,
            irq,
            self.current,
        );
        self.current = current;

        interrupts::resolve_pending(machine, &mut self.table, self.queue.as_mut());

        let outcome_current = scheduler::schedule(&self.config, &mut self.table, self.queue.as_mut(), self.current);
        if outcome_current.preempted {
            if let Some(pid) = self.current.pid() {
                if let Some(process) = self.table.get_mut(pid) {
                    process.preemptions += 1;
                }
                self.stats.record_system_preemption();
            }
        }
        if outcome_current.went_idle {
            self.stats.record_idle_tick();
            if self.stats.is_system_idle(&self.table, self.queue.is_empty()) && !self.stats.already_emitted() {
                self.emit_stats();
            }
        }
        self.current = outcome_current.current;

        self.load(machine);

        if outcome.is_halted() {
            trace!("trap({irq:?}) dispatch requested halt");
        }
        outcome
    }

    fn save<M: Machine>(&mut self, machine: &mut M) {
        let slots = machine.read_irq_slots();
        match self.current.pid() {
            Some(pid) => {
                if let Some(process) = self.table.get_mut(pid) {
                    process.registers.pc = slots.pc;
                    process.registers.a = slots.a;
                    process.registers.x = slots.x;
                    process.registers.error = slots.error;
                    process.registers.complement = slots.complement;
                    process.registers.mode = slots.mode;
                }
            }
            None => {
                // Idle descriptor: nothing persists its registers, it
                // is rebuilt fresh on every Load.
            }
        }
    }

    fn load<M: Machine>(&mut self, machine: &mut M) {
        match self.current.pid() {
            Some(pid) => {
                let process = self.table.get(pid).expect("scheduled process must exist");
                machine.mmu_set_page_table(Some(&process.page_table));
                machine.write_irq_slots(IrqSlots {
                    pc: process.registers.pc,
                    a: process.registers.a,
                    x: process.registers.x,
                    error: process.registers.error,
                    complement: process.registers.complement,
                    mode: process.registers.mode,
                });
            }
            None => {
                let idle = Process::idle();
                machine.mmu_set_page_table(None);
                machine.write_irq_slots(IrqSlots {
                    pc: idle.registers.pc,
                    a: idle.registers.a,
                    x: idle.registers.x,
                    error: idle.registers.error,
                    complement: idle.registers.complement,
                    mode: idle.registers.mode,
                });
            }
        }
    }

    fn emit_stats(&mut self) {
        match &self.stats_path {
            Some(path) => match File::create(path) {
                Ok(file) => {
                    if let Err(err) = self.stats.emit(&self.table, file) {
                        log::warn!("failed to write statistics report to {path}: {err}");
                    } else {
                        info!("statistics report written to {path}");
                    }
                }
                Err(err) => log::warn!("failed to open {path} for statistics report: {err}"),
            },
            None => {
                let mut sink = std::io::sink();
                let _ = self.stats.emit(&self.table, &mut sink);
            }
        }
    }
}

#[cfg(any(test, feature = "test-util"))]
impl Kernel {
    /// Create and enqueue a READY process directly, skipping SPAWN's
    /// MMU name lookup. Scenario tests that exercise scheduling or
    /// wait/kill behaviour don't need a second real program image —
    /// this is the multi-process equivalent of [`testutil::MockMachine`].
    pub fn spawn_for_test(&mut self, pc: i32) -> process::Pid {
        let id = self.table.find_free_slot().expect("process table full");
        let process = Process::new(id, pc, memory::PageTable::empty(), 0, self.config.quantum);
        self.table.insert(process);
        self.queue.push(id);
        self.stats.record_spawn();
        id
    }
}
