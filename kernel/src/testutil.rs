// kernel/src/testutil.rs
//
// An in-memory `Machine` fake, the test-only stand-in for the CPU,
// memory, MMU, clock, console and disk (spec.md §6). Plays the role
// the teacher's integration tests play for its bootimage harness,
// except this kernel doesn't need a real emulator to exercise: any
// struct implementing `Machine` will do, and this one is the simplest
// one that could work.

use std::collections::HashMap;

use crate::error::KernelError;
use crate::machine::{IrqSlots, Machine, ProgramImage, ProgramLoadError};
use crate::memory::page_table::{PageTable, ABSENT};

#[derive(Default)]
pub struct MockMachine {
    irq_slots: IrqSlots,
    memory: HashMap<u32, i32>,
    disk: HashMap<u32, i32>,
    io_ready: HashMap<u32, bool>,
    io_input: HashMap<u32, i32>,
    io_output: Vec<(u32, i32)>,
    page_table: Option<PageTable>,
    page_size: u32,
    clock_elapsed: u32,
    clock_countdown: u32,
    trap_vector_installed: bool,
    programs: HashMap<String, ProgramImage>,
}

impl MockMachine {
    pub fn new() -> Self {
        Self { page_size: 16, ..Default::default() }
    }

    pub fn with_page_size(page_size: u32) -> Self {
        Self { page_size, ..Default::default() }
    }

    pub fn set_irq_slots(&mut self, slots: IrqSlots) {
        self.irq_slots = slots;
    }

    pub fn irq_slots(&self) -> IrqSlots {
        self.irq_slots
    }

    pub fn set_io_ready(&mut self, status_slot: u32, ready: bool) {
        self.io_ready.insert(status_slot, ready);
    }

    pub fn set_io_input(&mut self, data_slot: u32, value: i32) {
        self.io_input.insert(data_slot, value);
    }

    pub fn outputs(&self) -> &[(u32, i32)] {
        &self.io_output
    }

    pub fn register_program(&mut self, name: &str, image: ProgramImage) {
        self.programs.insert(name.to_string(), image);
    }

    pub fn mem(&self, addr: u32) -> i32 {
        self.memory.get(&addr).copied().unwrap_or(0)
    }

    pub fn set_disk(&mut self, addr: u32, word: i32) {
        self.disk.insert(addr, word);
    }

    pub fn trap_vector_installed(&self) -> bool {
        self.trap_vector_installed
    }
}

impl Machine for MockMachine {
    fn read_irq_slots(&self) -> IrqSlots {
        self.irq_slots
    }

    fn write_irq_slots(&mut self, slots: IrqSlots) {
        self.irq_slots = slots;
    }

    fn install_trap_vector(&mut self) {
        self.trap_vector_installed = true;
    }

    fn mem_read(&self, addr: u32) -> i32 {
        self.mem(addr)
    }

    fn mem_write(&mut self, addr: u32, word: i32) {
        self.memory.insert(addr, word);
    }

    fn mmu_set_page_table(&mut self, table: Option<&PageTable>) {
        self.page_table = table.cloned();
    }

    fn mmu_read(&self, vaddr: u32) -> Result<i32, KernelError> {
        let table = self.page_table.as_ref().ok_or(KernelError::PageOutOfRange(vaddr))?;
        let page = vaddr / self.page_size;
        let frame = table.frame_of(page).ok_or(KernelError::PageOutOfRange(vaddr))?;
        let offset = vaddr % self.page_size;
        Ok(self.mem(frame * self.page_size + offset))
    }

    fn clock_elapsed(&self) -> u32 {
        self.clock_elapsed
    }

    fn clock_set_countdown(&mut self, instructions: u32) {
        self.clock_countdown = instructions;
    }

    fn clock_clear_latch(&mut self) {}

    fn io_status(&self, slot: u32) -> bool {
        self.io_ready.get(&slot).copied().unwrap_or(false)
    }

    fn io_read(&mut self, slot: u32) -> i32 {
        self.io_input.get(&slot).copied().unwrap_or(0)
    }

    fn io_write(&mut self, slot: u32, value: i32) {
        self.io_output.push((slot, value));
    }

    fn disk_read(&self, addr: u32) -> i32 {
        self.disk.get(&addr).copied().unwrap_or(ABSENT)
    }

    fn disk_write(&mut self, addr: u32, word: i32) {
        self.disk.insert(addr, word);
    }

    fn load_program(&self, name: &str) -> Result<ProgramImage, ProgramLoadError> {
        self.programs.get(name).cloned().ok_or_else(|| ProgramLoadError::NotFound(name.to_string()))
    }
}

