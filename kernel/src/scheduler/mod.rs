// kernel/src/scheduler/mod.rs
//
// Chooses the next runnable process and accounts for quantum expiry
// and preemption (spec.md §4.3). Generalizes the teacher's
// `process::scheduler::Scheduler` — there a single `VecDeque` doubling
// as both process store and ready order; here the process table
// (§3) is the store and a `ReadyQueue` trait-object holds only
// references to READY descriptors, so round-robin and priority
// policies are interchangeable (§9 "Two scheduler policies behind one
// interface").

pub mod fifo;
pub mod priority;

pub use fifo::FifoQueue;
pub use priority::PriorityQueue;

use crate::config::{KernelConfig, SchedulerPolicy};
use crate::process::{Pid, ProcessState, ProcessTable};

/// The currently running descriptor, or the idle sentinel (§9 "Idle as
/// a descriptor" — modeled as an enum variant, not id=-1 sprinkled
/// through comparisons).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Current {
    Idle,
    Running(Pid),
}

impl Current {
    pub fn pid(self) -> Option<Pid> {
        match self {
            Current::Idle => None,
            Current::Running(pid) => Some(pid),
        }
    }

    pub fn is_idle(self) -> bool {
        matches!(self, Current::Idle)
    }
}

/// Ordered container of references to READY descriptors (spec.md §3,
/// §9). Round-robin and priority policies share this interface.
pub trait ReadyQueue {
    fn push(&mut self, pid: Pid);
    fn pop(&mut self) -> Option<Pid>;
    fn contains(&self, pid: Pid) -> bool;
    fn remove(&mut self, pid: Pid);
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every pending entry (RESET may be invoked at any time, §4.1).
    fn clear(&mut self) {
        while self.pop().is_some() {}
    }

    /// Recompute priorities at a preemption point (§4.3). The FIFO
    /// variant ignores this; the priority variant uses it to re-rank
    /// the descriptor just preempted.
    fn on_preempt(&mut self, _table: &ProcessTable, _pid: Pid, _quantum: i32) {}
}

/// Build the ready-queue implementation selected by `policy`.
pub fn build_ready_queue(policy: SchedulerPolicy) -> Box<dyn ReadyQueue + Send> {
    match policy {
        SchedulerPolicy::RoundRobin => Box::new(FifoQueue::new()),
        SchedulerPolicy::Priority => Box::new(PriorityQueue::new()),
    }
}

/// Outcome of a scheduling decision the dispatcher acts on.
pub struct ScheduleOutcome {
    pub current: Current,
    pub preempted: bool,
    pub went_idle: bool,
}

/// The decision procedure of spec.md §4.3, run every trap after Resolve.
pub fn schedule(
    config: &KernelConfig,
    table: &mut ProcessTable,
    queue: &mut dyn ReadyQueue,
    current: Current,
) -> ScheduleOutcome {
    // 1. Queue empty and current is idle/none: stay idle.
    if queue.is_empty() && current.is_idle() {
        return ScheduleOutcome { current: Current::Idle, preempted: false, went_idle: true };
    }

    // 2. Current is idle/none but the queue has work: dequeue one.
    if current.is_idle() {
        return match queue.pop() {
            Some(next) => match table.get(next) {
                Some(p) if p.state == ProcessState::Ready => {
                    if let Some(p) = table.get_mut(next) {
                        p.quantum = config.quantum;
                    }
                    ScheduleOutcome { current: Current::Running(next), preempted: false, went_idle: false }
                }
                _ => ScheduleOutcome { current: Current::Idle, preempted: false, went_idle: false },
            },
            None => ScheduleOutcome { current: Current::Idle, preempted: false, went_idle: false },
        };
    }

    let running = current.pid().expect("non-idle current always carries a pid");
    let blocked_or_expired = table
        .get(running)
        .map(|p| p.state == ProcessState::Blocked || p.quantum <= 0)
        .unwrap_or(true);

    // 3. Current is blocked or its quantum expired: rotate.
    if blocked_or_expired {
        queue.on_preempt(table, running, config.quantum);
        if let Some(p) = table.get_mut(running) {
            p.quantum = config.quantum;
            if p.state == ProcessState::Ready {
                queue.push(running);
            }
        }
        return match queue.pop() {
            Some(next) => {
                let preempted = next != running;
                if let Some(p) = table.get_mut(next) {
                    p.quantum = config.quantum;
                }
                ScheduleOutcome { current: Current::Running(next), preempted, went_idle: false }
            }
            None => ScheduleOutcome { current: Current::Idle, preempted: false, went_idle: false },
        };
    }

    // 4. Keep running current.
    ScheduleOutcome { current: Current::Running(running), preempted: false, went_idle: false }
}
