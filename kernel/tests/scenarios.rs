// kernel/tests/scenarios.rs
//
// Integration tests for the concrete scenarios in spec.md §8, driven
// entirely through `Kernel::trap` against `MockMachine` the way the
// teacher's own integration tests drive its kernel through a booted
// bootimage — except this kernel never needs a VM to test against.

use so_kernel::config::KernelConfig;
use so_kernel::interrupts::IrqKind;
use so_kernel::machine::{IrqSlots, ProgramImage};
use so_kernel::process::ProcessState;
use so_kernel::scheduler::Current;
use so_kernel::testutil::MockMachine;
use so_kernel::Kernel;

fn booted_kernel() -> (Kernel, MockMachine) {
    let mut kernel = Kernel::new(KernelConfig::default());
    kernel.set_stats_path(None);
    let mut machine = MockMachine::new();
    machine.register_program("init.maq", ProgramImage { virt_start: 0, words: vec![0; 16] });
    let outcome = kernel.trap(&mut machine, IrqKind::Reset);
    assert!(!outcome.is_halted());
    (kernel, machine)
}

#[test]
fn s1_boot_creates_process_zero_ready_and_running() {
    let (kernel, machine) = booted_kernel();
    let process0 = kernel.process_table().get(0).expect("process 0 must exist after boot");
    assert_eq!(process0.state, ProcessState::Ready);
    assert_eq!(process0.registers.pc, 0);
    assert_eq!(kernel.current(), Current::Running(0));
    assert!(machine.trap_vector_installed());
}

#[test]
fn s2_io_block_then_unblock_on_device_ready() {
    let (mut kernel, mut machine) = booted_kernel();

    // Process 0 issues READ on terminal 0 (device slot 0, status slot 1).
    machine.set_irq_slots(IrqSlots { a: 0, ..IrqSlots::zeroed() });
    kernel.trap(&mut machine, IrqKind::System);

    let process0 = kernel.process_table().get(0).unwrap();
    assert_eq!(process0.state, ProcessState::Blocked);
    assert_eq!(kernel.current(), Current::Idle);

    // Device becomes ready on the next clock tick.
    machine.set_io_ready(1, true);
    machine.set_io_input(0, 99);
    kernel.trap(&mut machine, IrqKind::Clock);

    let process0 = kernel.process_table().get(0).unwrap();
    assert_eq!(process0.state, ProcessState::Ready);
    assert_eq!(process0.registers.a, 99);
    assert_eq!(kernel.current(), Current::Running(0));
}

#[test]
fn s3_preemption_rotates_after_quantum_expires() {
    let (mut kernel, mut machine) = booted_kernel();
    let quantum = kernel.config().quantum;
    let pid1 = kernel.spawn_for_test(0);
    assert_eq!(pid1, 1);

    // Process 0 is current; tick the clock exactly `quantum` times.
    for _ in 0..quantum {
        machine.set_irq_slots(IrqSlots::zeroed());
        kernel.trap(&mut machine, IrqKind::Clock);
    }

    assert_eq!(kernel.current(), Current::Running(1));
    assert_eq!(kernel.process_table().get(0).unwrap().state, ProcessState::Ready);
    assert_eq!(kernel.stats().system_preemptions(), 1);
}

#[test]
fn s4_kill_then_wait_unblocks_within_the_same_trap() {
    let (mut kernel, mut machine) = booted_kernel();
    let pid1 = kernel.spawn_for_test(0);

    // P0 waits on P1.
    machine.set_irq_slots(IrqSlots { a: 4, x: pid1 as i32, ..IrqSlots::zeroed() });
    kernel.trap(&mut machine, IrqKind::System);
    assert_eq!(kernel.process_table().get(0).unwrap().state, ProcessState::Blocked);
    assert_eq!(kernel.current(), Current::Running(1));

    // P1 calls KILL; Resolve (same trap) must unblock P0.
    machine.set_irq_slots(IrqSlots { a: 3, ..IrqSlots::zeroed() });
    kernel.trap(&mut machine, IrqKind::System);

    assert_eq!(kernel.process_table().get(1).unwrap().state, ProcessState::Stopped);
    assert_eq!(kernel.process_table().get(0).unwrap().state, ProcessState::Ready);
    assert_eq!(kernel.current(), Current::Running(0));
}

#[test]
fn s5_page_fault_maps_successive_pages_on_demand() {
    let (mut kernel, mut machine) = booted_kernel();
    // Re-boot with a two-page image so both faults have something to serve.
    let page_size = kernel.config().page_size;
    machine.register_program("init.maq", ProgramImage { virt_start: 0, words: vec![7; (page_size * 2) as usize] });
    kernel.trap(&mut machine, IrqKind::Reset);

    let first_frame = kernel.config().first_free_frame();

    machine.set_irq_slots(IrqSlots { error: 1, complement: 0, ..IrqSlots::zeroed() });
    kernel.trap(&mut machine, IrqKind::CpuError);
    let process0 = kernel.process_table().get(0).unwrap();
    assert_eq!(process0.page_table.frame_of(0), Some(first_frame));
    assert_eq!(machine.mem(first_frame * page_size), 7);

    machine.set_irq_slots(IrqSlots { error: 1, complement: page_size as i32, ..IrqSlots::zeroed() });
    kernel.trap(&mut machine, IrqKind::CpuError);
    let process0 = kernel.process_table().get(0).unwrap();
    assert_eq!(process0.page_table.frame_of(1), Some(first_frame + 1));
}

#[test]
fn s6_table_full_rejects_a_fifth_spawn() {
    let (mut kernel, mut machine) = booted_kernel();
    kernel.spawn_for_test(0);
    kernel.spawn_for_test(0);
    kernel.spawn_for_test(0);
    assert_eq!(kernel.process_table().iter().count(), 4);

    machine.set_irq_slots(IrqSlots { a: 2, x: 0, ..IrqSlots::zeroed() });
    kernel.trap(&mut machine, IrqKind::System);

    // Caller's A is set to -1, no fifth slot appears.
    assert_eq!(kernel.process_table().iter().count(), 4);
}

#[test]
fn unknown_irq_returns_halted_but_still_completes_the_pipeline() {
    let (mut kernel, mut machine) = booted_kernel();

    let outcome = kernel.trap(&mut machine, IrqKind::Unknown);

    assert!(outcome.is_halted());
    // Load still ran: the IRQ slots hold process 0's registers, not
    // whatever was left over from before the trap.
    assert_eq!(machine.irq_slots().pc, 0);
    assert_eq!(kernel.current(), Current::Running(0));
}

#[test]
fn sys_spawn_increments_the_processes_spawned_counter() {
    let (mut kernel, mut machine) = booted_kernel();
    assert_eq!(kernel.stats().processes_spawned(), 1);

    // Fault page 0 in so the MMU can actually translate the name
    // pointer for the SPAWN string copy below.
    machine.set_irq_slots(IrqSlots { error: 1, complement: 0, ..IrqSlots::zeroed() });
    kernel.trap(&mut machine, IrqKind::CpuError);
    assert_eq!(kernel.current(), Current::Running(0));

    // init.maq's pages are all zero words, so the name pointer at
    // vaddr 0 reads back a NUL immediately: the spawned program name
    // is the empty string.
    machine.register_program("", ProgramImage { virt_start: 0, words: vec![0; 16] });

    machine.set_irq_slots(IrqSlots { a: 2, x: 0, ..IrqSlots::zeroed() });
    kernel.trap(&mut machine, IrqKind::System);

    let process0 = kernel.process_table().get(0).unwrap();
    assert_eq!(process0.registers.a, 1);
    assert!(kernel.process_table().get(1).is_some());
    assert_eq!(kernel.stats().processes_spawned(), 2);
}
