// kernel/src/syscall.rs
//
// System-call handlers (spec.md §4.2). The teacher's own
// `process::syscall` decodes a syscall number out of a saved register
// block and dispatches on it (`SyscallNumber::from_u64`); the shape
// here is the same even though the registers, the call menu, and the
// argument-passing convention (A selects, X argues) are this kernel's
// own.

use log::{debug, warn};

use crate::error::KernelError;
use crate::machine::Machine;
use crate::memory::pager;
use crate::memory::{DiskAllocator, FrameAllocator};
use crate::process::{BlockReason, Pid, ProcessState, ProcessTable};
use crate::scheduler::ReadyQueue;
use crate::stats::StatsCollector;

/// Call codes selected by the caller's A register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyscallNumber {
    Read,
    Write,
    Spawn,
    Kill,
    Wait,
}

impl SyscallNumber {
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::Read),
            1 => Some(Self::Write),
            2 => Some(Self::Spawn),
            3 => Some(Self::Kill),
            4 => Some(Self::Wait),
            _ => None,
        }
    }
}

const NAME_BUFFER_LIMIT: usize = 64;

/// READ (§4.2): device slot `2 * id`, status slot `device + 1`.
pub fn sys_read<M: Machine>(machine: &mut M, table: &mut ProcessTable, queue: &mut dyn ReadyQueue, pid: Pid) {
    let device = 2 * pid as u32;
    let status_slot = device + 1;
    let process = table.get_mut(pid).expect("current process must exist");
    if machine.io_status(status_slot) {
        let value = machine.io_read(device);
        process.registers.a = value;
        debug!("pid {} READ ready: a={}", pid, value);
    } else {
        process.enter_state(ProcessState::Blocked);
        process.block_reason = BlockReason::Io { device, datum: None };
        queue.remove(pid);
        debug!("pid {} READ blocked on device {}", pid, device);
    }
}

/// WRITE (§4.2): device slot `2 * id + 2`, status slot `device + 1`.
pub fn sys_write<M: Machine>(machine: &mut M, table: &mut ProcessTable, queue: &mut dyn ReadyQueue, pid: Pid) {
    let device = 2 * pid as u32 + 2;
    let status_slot = device + 1;
    let datum = table.get(pid).expect("current process must exist").registers.x;
    if machine.io_status(status_slot) {
        machine.io_write(device, datum);
        table.get_mut(pid).unwrap().registers.a = 0;
        debug!("pid {} WRITE ready: x={}", pid, datum);
    } else {
        let process = table.get_mut(pid).unwrap();
        process.enter_state(ProcessState::Blocked);
        process.block_reason = BlockReason::Io { device, datum: Some(datum) };
        queue.remove(pid);
        debug!("pid {} WRITE blocked on device {}", pid, device);
    }
}

/// Read a NUL-terminated name out of the caller's address space
/// through the MMU (spec.md §4.2 SPAWN, §2 "String copy through MMU").
/// Whatever the underlying `Machine` impl's MMU fault reason is, at
/// this call site it always means the same thing: the string copy hit
/// an address it couldn't translate.
fn read_name_through_mmu<M: Machine>(machine: &M, vaddr: u32) -> Result<String, KernelError> {
    let mut bytes = Vec::new();
    for offset in 0..NAME_BUFFER_LIMIT as u32 {
        let addr = vaddr + offset;
        let word = machine.mmu_read(addr).map_err(|_| KernelError::MmuFault(addr))?;
        if word == 0 {
            return Ok(String::from_utf8_lossy(&bytes).into_owned());
        }
        bytes.push(word as u8);
    }
    Err(KernelError::NameTooLong(NAME_BUFFER_LIMIT))
}

/// SPAWN (§4.2): allocate the lowest free slot, copy the program name,
/// load the image, and enqueue the new descriptor.
#[allow(clippy::too_many_arguments)]
pub fn sys_spawn<M: Machine>(
    machine: &mut M,
    table: &mut ProcessTable,
    queue: &mut dyn ReadyQueue,
    frames: &mut FrameAllocator,
    disk: &mut DiskAllocator,
    stats: &mut StatsCollector,
    page_size: u32,
    quantum: i32,
    caller: Pid,
) -> Result<(), KernelError> {
    let name_vaddr = table.get(caller).expect("current process must exist").registers.x as u32;

    let new_id = match table.find_free_slot() {
        Some(id) => id,
        None => {
            let err = KernelError::ProcessTableFull;
            table.get_mut(caller).unwrap().registers.a = -1;
            warn!("SPAWN failed: {err}");
            return Ok(());
        }
    };

    // Name copy happens under the *caller's* page table, still
    // installed by Load from the previous trap.
    let name = match read_name_through_mmu(machine, name_vaddr) {
        Ok(name) => name,
        Err(err) => {
            table.get_mut(caller).unwrap().registers.a = -1;
            warn!("SPAWN failed to read program name: {err}");
            return Ok(());
        }
    };

    let image = match machine.load_program(&name) {
        Ok(image) => image,
        Err(prog_err) => {
            let err = KernelError::ProgramLoadFailed(name.clone());
            table.get_mut(caller).unwrap().registers.a = -1;
            // Known issue per spec.md §9: the slot is intentionally
            // left untouched here, matching the source's behaviour.
            warn!("SPAWN failed: {err} ({prog_err})");
            return Ok(());
        }
    };

    let loaded = pager::load_program(machine, disk, page_size, image)?;
    let process = crate::process::Process::new(new_id, loaded.entry_point as i32, loaded.page_table, loaded.disk_origin, quantum);
    table.insert(process);
    queue.push(new_id);
    stats.record_spawn();

    table.get_mut(caller).unwrap().registers.a = new_id as i32;
    debug!("pid {} SPAWN '{}' -> pid {}", caller, name, new_id);
    Ok(())
}

/// KILL (§4.2): terminate the current process, unless it's already the
/// idle sentinel (the NULL-check the §9 open question requires first).
pub fn sys_kill(table: &mut ProcessTable, queue: &mut dyn ReadyQueue, pid: Pid) {
    if let Some(process) = table.get_mut(pid) {
        process.enter_state(ProcessState::Stopped);
        process.page_table = crate::memory::PageTable::empty();
        queue.remove(pid);
        debug!("pid {} KILL", pid);
    }
}

/// WAIT (§4.2): block on a peer's termination.
pub fn sys_wait(table: &mut ProcessTable, queue: &mut dyn ReadyQueue, pid: Pid) {
    let peer = table.get(pid).expect("current process must exist").registers.x as Pid;
    let process = table.get_mut(pid).unwrap();
    process.enter_state(ProcessState::Blocked);
    process.block_reason = BlockReason::WaitPeer(peer);
    queue.remove(pid);
    debug!("pid {} WAIT on pid {}", pid, peer);
}
