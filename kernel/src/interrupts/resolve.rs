// kernel/src/interrupts/resolve.rs
//
// Pending-work resolver (spec.md §4.5): walks BLOCKED descriptors in
// table order and unblocks whichever ones have become runnable. Since
// `BlockReason` is a sum type (§9) a descriptor can never carry both an
// I/O wait and a peer wait at once, so the "resolve I/O before peer
// wait" ordering from the source is structurally guaranteed rather than
// something this code has to enforce.

use log::trace;

use crate::machine::Machine;
use crate::process::{BlockReason, ProcessState, ProcessTable};
use crate::scheduler::ReadyQueue;

pub fn resolve_pending<M: Machine>(machine: &mut M, table: &mut ProcessTable, queue: &mut dyn ReadyQueue) {
    let blocked_ids: Vec<_> = table
        .iter()
        .filter(|p| p.state == ProcessState::Blocked)
        .map(|p| p.id)
        .collect();

    for pid in blocked_ids {
        let reason = table.get(pid).unwrap().block_reason;
        match reason {
            BlockReason::None => {}
            BlockReason::Io { device, datum } => {
                let status_slot = device + 1;
                if !machine.io_status(status_slot) {
                    continue;
                }
                match datum {
                    None => {
                        let value = machine.io_read(device);
                        let p = table.get_mut(pid).unwrap();
                        p.registers.a = value;
                    }
                    Some(value) => {
                        machine.io_write(device, value);
                    }
                }
                let p = table.get_mut(pid).unwrap();
                p.block_reason = BlockReason::None;
                p.enter_state(ProcessState::Ready);
                queue.push(pid);
                trace!("pid {} unblocked on device {}", pid, device);
            }
            BlockReason::WaitPeer(peer) => {
                let peer_stopped = table.get(peer).map(|p| p.state == ProcessState::Stopped).unwrap_or(true);
                if !peer_stopped {
                    continue;
                }
                let p = table.get_mut(pid).unwrap();
                p.block_reason = BlockReason::None;
                p.enter_state(ProcessState::Ready);
                queue.push(pid);
                trace!("pid {} unblocked waiting on pid {}", pid, peer);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KernelConfig;
    use crate::memory::PageTable;
    use crate::process::Process;
    use crate::scheduler::FifoQueue;
    use crate::testutil::MockMachine;

    fn blocked_on_io(id: usize, datum: Option<i32>) -> Process {
        let mut p = Process::new(id, 0, PageTable::empty(), 0, KernelConfig::default().quantum);
        p.state = ProcessState::Blocked;
        p.block_reason = BlockReason::Io { device: 2 * id as u32, datum };
        p
    }

    #[test]
    fn read_wait_resolves_once_device_is_ready() {
        let mut table = ProcessTable::new(4);
        table.insert(blocked_on_io(0, None));
        let mut queue = FifoQueue::new();
        let mut machine = MockMachine::new();
        machine.set_io_ready(1, true);
        machine.set_io_input(0, 42);

        resolve_pending(&mut machine, &mut table, &mut queue);

        let p = table.get(0).unwrap();
        assert_eq!(p.state, ProcessState::Ready);
        assert_eq!(p.registers.a, 42);
        assert!(queue.contains(0));
    }

    #[test]
    fn write_wait_stays_blocked_until_device_ready() {
        let mut table = ProcessTable::new(4);
        table.insert(blocked_on_io(0, Some(7)));
        let mut queue = FifoQueue::new();
        let mut machine = MockMachine::new();

        resolve_pending(&mut machine, &mut table, &mut queue);
        assert_eq!(table.get(0).unwrap().state, ProcessState::Blocked);
        assert!(!queue.contains(0));
    }

    #[test]
    fn peer_wait_resolves_once_peer_is_stopped() {
        let mut table = ProcessTable::new(4);
        let mut waiter = Process::new(0, 0, PageTable::empty(), 0, KernelConfig::default().quantum);
        waiter.state = ProcessState::Blocked;
        waiter.block_reason = BlockReason::WaitPeer(1);
        table.insert(waiter);
        let mut peer = Process::new(1, 0, PageTable::empty(), 0, KernelConfig::default().quantum);
        peer.state = ProcessState::Stopped;
        table.insert(peer);

        let mut queue = FifoQueue::new();
        let mut machine = MockMachine::new();
        resolve_pending(&mut machine, &mut table, &mut queue);

        assert_eq!(table.get(0).unwrap().state, ProcessState::Ready);
        assert!(queue.contains(0));
    }
}
