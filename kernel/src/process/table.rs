// kernel/src/process/table.rs
//
// Fixed-capacity process table (spec.md §3: "Fixed array of
// MAX_PROCESSES descriptor slots. A slot is free iff its liveness flag
// is 0."). A slot's liveness is simply whether it holds `Some(Process)`.

use super::descriptor::{Pid, Process};

pub struct ProcessTable {
    slots: Vec<Option<Process>>,
}

impl ProcessTable {
    pub fn new(capacity: usize) -> Self {
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);
        Self { slots }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Clear every slot (RESET may be invoked at any time, per §4.1).
    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            *slot = None;
        }
    }

    /// Lowest free slot, or `None` if the table is full. A slot
    /// occupied by a STOPPED descriptor counts as free: KILL clears
    /// its liveness immediately (§4.2), the STOPPED `Process` value
    /// just lingers so a concurrent WAIT can still observe it until
    /// something spawns into the same slot.
    pub fn find_free_slot(&self) -> Option<Pid> {
        self.slots.iter().position(|s| match s {
            None => true,
            Some(p) => p.state == super::descriptor::ProcessState::Stopped,
        })
    }

    pub fn insert(&mut self, process: Process) {
        let id = process.id;
        self.slots[id] = Some(process);
    }

    pub fn get(&self, id: Pid) -> Option<&Process> {
        self.slots.get(id).and_then(|s| s.as_ref())
    }

    pub fn get_mut(&mut self, id: Pid) -> Option<&mut Process> {
        self.slots.get_mut(id).and_then(|s| s.as_mut())
    }

    /// Terminate and free the slot — the page table goes with it
    /// (spec.md §3 lifecycle: "Its page table is destroyed with it.").
    pub fn remove(&mut self, id: Pid) {
        self.slots[id] = None;
    }

    pub fn iter(&self) -> impl Iterator<Item = &Process> {
        self.slots.iter().filter_map(|s| s.as_ref())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Process> {
        self.slots.iter_mut().filter_map(|s| s.as_mut())
    }

    /// Any live process not yet STOPPED — used by the scheduler/stats
    /// collector to decide whether the system is fully idle (§4.3, §4.6).
    pub fn any_live_unstopped(&self) -> bool {
        self.iter().any(|p| p.state != super::descriptor::ProcessState::Stopped)
    }
}
