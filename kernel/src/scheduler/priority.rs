// kernel/src/scheduler/priority.rs
//
// Priority ready queue (spec.md §4.3 alternative policy). Lower value
// runs sooner; initial priority 0.5. Priorities are recomputed at each
// preemption point as `new = (old + (QUANTUM - remaining) / QUANTUM) / 2`
// so processes that used less of their quantum (I/O-bound) drift
// toward lower values and are favoured. Ties break FIFO, matching the
// teacher's `filaPrioridade`-equivalent in the original source, which
// keeps entries sorted but stable on equal keys.

use std::collections::HashMap;

use super::ReadyQueue;
use crate::process::{Pid, ProcessTable};

const INITIAL_PRIORITY: f32 = 0.5;

struct Entry {
    pid: Pid,
    priority: f32,
    sequence: u64,
}

pub struct PriorityQueue {
    entries: Vec<Entry>,
    priorities: HashMap<Pid, f32>,
    next_sequence: u64,
}

impl PriorityQueue {
    pub fn new() -> Self {
        Self { entries: Vec::new(), priorities: HashMap::new(), next_sequence: 0 }
    }

    fn priority_of(&self, pid: Pid) -> f32 {
        self.priorities.get(&pid).copied().unwrap_or(INITIAL_PRIORITY)
    }
}

impl Default for PriorityQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadyQueue for PriorityQueue {
    fn push(&mut self, pid: Pid) {
        if self.entries.iter().any(|e| e.pid == pid) {
            return;
        }
        let priority = self.priority_of(pid);
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.entries.push(Entry { pid, priority, sequence });
    }

    fn pop(&mut self) -> Option<Pid> {
        let idx = self
            .entries
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                a.priority
                    .partial_cmp(&b.priority)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then(a.sequence.cmp(&b.sequence))
            })
            .map(|(idx, _)| idx)?;
        Some(self.entries.remove(idx).pid)
    }

    fn contains(&self, pid: Pid) -> bool {
        self.entries.iter().any(|e| e.pid == pid)
    }

    fn remove(&mut self, pid: Pid) {
        self.entries.retain(|e| e.pid != pid);
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn on_preempt(&mut self, table: &ProcessTable, pid: Pid, quantum: i32) {
        let remaining = table.get(pid).map(|p| p.quantum).unwrap_or(0).max(0);
        let old = self.priority_of(pid);
        let used_fraction = (quantum - remaining) as f32 / quantum as f32;
        let new = (old + used_fraction) / 2.0;
        self.priorities.insert(pid, new);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KernelConfig;
    use crate::memory::PageTable;
    use crate::process::Process;

    fn table_with(pid: Pid, quantum: i32) -> ProcessTable {
        let mut table = ProcessTable::new(4);
        let mut p = Process::new(pid, 0, PageTable::empty(), 0, KernelConfig::default().quantum);
        p.quantum = quantum;
        table.insert(p);
        table
    }

    #[test]
    fn lower_priority_value_runs_first() {
        let mut q = PriorityQueue::new();
        q.push(0);
        q.push(1);
        q.priorities.insert(0, 0.9);
        q.priorities.insert(1, 0.1);
        // re-push to pick up the new priorities as if freshly enqueued
        q.remove(0);
        q.remove(1);
        q.push(0);
        q.push(1);
        assert_eq!(q.pop(), Some(1));
        assert_eq!(q.pop(), Some(0));
    }

    #[test]
    fn ties_break_fifo() {
        let mut q = PriorityQueue::new();
        q.push(2);
        q.push(3);
        assert_eq!(q.pop(), Some(2));
        assert_eq!(q.pop(), Some(3));
    }

    #[test]
    fn io_bound_process_drifts_to_lower_priority() {
        let mut q = PriorityQueue::new();
        let table = table_with(0, 4); // used only 1 of 5 quantum ticks
        q.on_preempt(&table, 0, 5);
        assert!(q.priority_of(0) < INITIAL_PRIORITY);
    }
}
