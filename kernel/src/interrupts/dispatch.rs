// kernel/src/interrupts/dispatch.rs
//
// Phase 2 of the trap pipeline (spec.md §4.1 "Dispatch"). One function
// per IRQ kind, matching the teacher's `interrupts::exception` table of
// one handler per vector — here there are five kinds instead of thirty
// two vectors.

use log::{info, warn};

use crate::config::KernelConfig;
use crate::error::TrapOutcome;
use crate::interrupts::IrqKind;
use crate::machine::{Machine, PAGE_ABSENT};
use crate::memory::pager;
use crate::memory::{DiskAllocator, FrameAllocator};
use crate::process::{Process, ProcessState, ProcessTable};
use crate::scheduler::{Current, ReadyQueue};
use crate::stats::StatsCollector;
use crate::syscall::{self, SyscallNumber};

pub struct DispatchResult {
    pub current: Current,
    pub outcome: TrapOutcome,
}

fn ok(current: Current) -> DispatchResult {
    DispatchResult { current, outcome: TrapOutcome::Ok }
}

fn halted(current: Current) -> DispatchResult {
    DispatchResult { current, outcome: TrapOutcome::Halted }
}

#[allow(clippy::too_many_arguments)]
pub fn dispatch<M: Machine>(
    machine: &mut M,
    config: &KernelConfig,
    table: &mut ProcessTable,
    queue: &mut dyn ReadyQueue,
    frames: &mut FrameAllocator,
    disk: &mut DiskAllocator,
    stats: &mut StatsCollector,
    irq: IrqKind,
    current: Current,
) -> DispatchResult {
    match irq {
        IrqKind::Reset => dispatch_reset(machine, config, table, queue, frames, disk, stats),
        IrqKind::CpuError => dispatch_cpu_error(machine, frames, table, queue, current, config.page_size),
        IrqKind::System => dispatch_system(machine, config, table, queue, frames, disk, stats, current),
        IrqKind::Clock => dispatch_clock(machine, config, table, current),
        IrqKind::Unknown => halted(current),
    }
}

#[allow(clippy::too_many_arguments)]
fn dispatch_reset<M: Machine>(
    machine: &mut M,
    config: &KernelConfig,
    table: &mut ProcessTable,
    queue: &mut dyn ReadyQueue,
    frames: &mut FrameAllocator,
    disk: &mut DiskAllocator,
    stats: &mut StatsCollector,
) -> DispatchResult {
    table.clear();
    queue.clear();
    frames.reset(config.first_free_frame());
    disk.reset();
    machine.install_trap_vector();

    match machine.load_program("init.maq") {
        Ok(image) => match pager::load_program(machine, disk, config.page_size, image) {
            Ok(loaded) => {
                let process = Process::new(0, loaded.entry_point as i32, loaded.page_table, loaded.disk_origin, config.quantum);
                table.insert(process);
                queue.push(0);
                stats.record_spawn();
                info!("RESET: process 0 loaded from init.maq, pc={:#x}", loaded.entry_point);
                ok(Current::Idle)
            }
            Err(err) => {
                warn!("RESET: failed to lay out init.maq on disk: {err}");
                halted(Current::Idle)
            }
        },
        Err(err) => {
            warn!("RESET: failed to load init.maq: {err}");
            halted(Current::Idle)
        }
    }
}

fn dispatch_cpu_error<M: Machine>(
    machine: &mut M,
    frames: &mut FrameAllocator,
    table: &mut ProcessTable,
    queue: &mut dyn ReadyQueue,
    current: Current,
    page_size: u32,
) -> DispatchResult {
    // §9 open question: require the NULL check before anything else,
    // so a CPU_ERROR reaching here with no current process can never
    // double-kill.
    let pid = match current.pid() {
        Some(pid) => pid,
        None => return ok(current),
    };

    let (error, complement) = {
        let process = table.get(pid).expect("dispatch only runs with a live current process");
        (process.registers.error, process.registers.complement)
    };

    if error == PAGE_ABSENT {
        let vaddr = complement as u32;
        let disk_origin = table.get(pid).unwrap().disk_origin;
        let mut page_table = table.get(pid).unwrap().page_table.clone();
        let result = pager::handle_page_fault(machine, frames, &mut page_table, disk_origin, page_size, vaddr);
        table.get_mut(pid).unwrap().page_table = page_table;
        return match result {
            Ok(()) => ok(Current::Running(pid)),
            Err(_) => halted(Current::Running(pid)),
        };
    }

    syscall::sys_kill(table, queue, pid);
    ok(Current::Idle)
}

#[allow(clippy::too_many_arguments)]
fn dispatch_system<M: Machine>(
    machine: &mut M,
    config: &KernelConfig,
    table: &mut ProcessTable,
    queue: &mut dyn ReadyQueue,
    frames: &mut FrameAllocator,
    disk: &mut DiskAllocator,
    stats: &mut StatsCollector,
    current: Current,
) -> DispatchResult {
    let pid = match current.pid() {
        Some(pid) => pid,
        None => return ok(current),
    };
    let code = table.get(pid).expect("current process must exist").registers.a;

    match SyscallNumber::from_code(code) {
        Some(SyscallNumber::Read) => {
            syscall::sys_read(machine, table, queue, pid);
            ok(Current::Running(pid))
        }
        Some(SyscallNumber::Write) => {
            syscall::sys_write(machine, table, queue, pid);
            ok(Current::Running(pid))
        }
        Some(SyscallNumber::Spawn) => {
            match syscall::sys_spawn(machine, table, queue, frames, disk, stats, config.page_size, config.quantum, pid) {
                Ok(()) => ok(Current::Running(pid)),
                Err(_) => halted(Current::Running(pid)),
            }
        }
        Some(SyscallNumber::Kill) => {
            syscall::sys_kill(table, queue, pid);
            ok(Current::Idle)
        }
        Some(SyscallNumber::Wait) => {
            syscall::sys_wait(table, queue, pid);
            ok(Current::Running(pid))
        }
        None => {
            warn!("pid {} issued unknown syscall code {}", pid, code);
            halted(Current::Running(pid))
        }
    }
}

/// A clock IRQ ticks every live descriptor's per-state clock (§4.6
/// "per-process... per-state time"), not just the running one: the
/// currently running process burns a quantum tick and an exec tick,
/// every other READY descriptor accrues ready-time, and every BLOCKED
/// one accrues blocked-time. STOPPED descriptors are frozen.
fn dispatch_clock<M: Machine>(machine: &mut M, config: &KernelConfig, table: &mut ProcessTable, current: Current) -> DispatchResult {
    machine.clock_clear_latch();
    machine.clock_set_countdown(config.interval);

    let running_pid = current.pid();
    for process in table.iter_mut() {
        if Some(process.id) == running_pid {
            process.quantum -= 1;
            process.exec_ticks += 1;
            continue;
        }
        match process.state {
            ProcessState::Ready => process.ready_ticks += 1,
            ProcessState::Blocked => process.blocked_ticks += 1,
            ProcessState::Stopped => {}
        }
    }
    ok(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KernelConfig;
    use crate::memory::PageTable;
    use crate::process::{BlockReason, Process};
    use crate::testutil::MockMachine;

    #[test]
    fn clock_tick_credits_running_ready_and_blocked_processes_separately() {
        let config = KernelConfig::default();
        let mut table = ProcessTable::new(4);
        table.insert(Process::new(0, 0, PageTable::empty(), 0, config.quantum));
        table.insert(Process::new(1, 0, PageTable::empty(), 0, config.quantum));
        let mut blocked = Process::new(2, 0, PageTable::empty(), 0, config.quantum);
        blocked.enter_state(ProcessState::Blocked);
        blocked.block_reason = BlockReason::Io { device: 4, datum: None };
        table.insert(blocked);

        let mut machine = MockMachine::new();
        dispatch_clock(&mut machine, &config, &mut table, Current::Running(0));

        let p0 = table.get(0).unwrap();
        assert_eq!(p0.exec_ticks, 1);
        assert_eq!(p0.quantum, config.quantum - 1);
        assert_eq!(p0.ready_ticks, 0);

        let p1 = table.get(1).unwrap();
        assert_eq!(p1.ready_ticks, 1);
        assert_eq!(p1.exec_ticks, 0);

        let p2 = table.get(2).unwrap();
        assert_eq!(p2.blocked_ticks, 1);
        assert_eq!(p2.exec_ticks, 0);
    }
}
