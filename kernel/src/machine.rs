// kernel/src/machine.rs
//
// The simulated hardware this kernel never implements, only calls:
// CPU register slots, raw memory, the MMU, the clock, the console,
// the disk, and the program-image reader (spec.md §6). One trait,
// `Machine`, stands in for all of it so the dispatcher stays generic
// over a single type parameter instead of five.
//
// The teacher reaches real hardware through free functions
// (`crate::interrupts::pic::end_of_interrupt`, `x86_64::instructions::
// port::Port`); here the equivalent is a trait because the hardware is
// supplied by the embedder, not compiled into this crate.

use thiserror::Error;

use crate::error::KernelError;

/// CPU mode carried in the saved/restored register set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpuMode {
    Supervisor,
    User,
}

impl Default for CpuMode {
    fn default() -> Self {
        CpuMode::Supervisor
    }
}

/// The six IRQ-slot registers saved on trap entry and restored on
/// trap exit (spec.md §4.7 / GLOSSARY "IRQ slot").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IrqSlots {
    pub pc: i32,
    pub a: i32,
    pub x: i32,
    pub error: i32,
    pub complement: i32,
    pub mode: CpuMode,
}

impl IrqSlots {
    pub const fn zeroed() -> Self {
        Self { pc: 0, a: 0, x: 0, error: 0, complement: 0, mode: CpuMode::Supervisor }
    }
}

/// CPU_ERROR code meaning "the faulting page is not resident" — the
/// one error code the dispatcher inspects directly (§4.1).
pub const PAGE_ABSENT: i32 = 1;

/// Error register value that marks the idle descriptor: restoring it
/// surfaces a halted CPU until the next interrupt (spec.md §3).
pub const CPU_HALTED: i32 = -1;

/// A program image as the external reader hands it back: load address
/// plus body words (spec.md §6 "Program image format").
#[derive(Debug, Clone)]
pub struct ProgramImage {
    pub virt_start: u32,
    pub words: Vec<i32>,
}

impl ProgramImage {
    pub fn virt_end(&self) -> u32 {
        self.virt_start + self.words.len() as u32
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProgramLoadError {
    #[error("program image '{0}' not found")]
    NotFound(String),
    #[error("program image '{0}' is malformed")]
    Malformed(String),
}

/// Everything the kernel needs from the hardware it runs on top of.
///
/// Implementors own the simulated CPU, memory, MMU, clock, console and
/// disk; `Kernel::trap` only ever borrows one through `&mut M`. A real
/// front-end (out of scope for this crate, per spec.md §1) would wire
/// an instruction-stepping CPU loop to this trait; tests use
/// [`crate::testutil::MockMachine`] instead.
pub trait Machine {
    /// Read the six saved registers out of the low-memory IRQ slots.
    fn read_irq_slots(&self) -> IrqSlots;

    /// Write the six registers back into the IRQ slots before resuming.
    fn write_irq_slots(&mut self, slots: IrqSlots);

    /// Install the CHAMAC/RETI trap prologue at address 10 (§6). The
    /// exact opcode encoding belongs to the CPU simulator, not to this
    /// kernel — the kernel only knows it must ask for this once, at
    /// RESET.
    fn install_trap_vector(&mut self);

    /// Raw physical memory read, used to populate a frame during
    /// paging and to lay down a freshly-loaded program image.
    fn mem_read(&self, addr: u32) -> i32;

    /// Raw physical memory write.
    fn mem_write(&mut self, addr: u32, word: i32);

    /// Install the active page table in the MMU (`None` leaves no
    /// mapping installed, appropriate while the idle descriptor runs).
    fn mmu_set_page_table(&mut self, table: Option<&crate::memory::page_table::PageTable>);

    /// Translate and read one virtual-address cell through whichever
    /// page table is currently installed. Used only by SPAWN's
    /// NUL-terminated name copy (§4.2).
    fn mmu_read(&self, vaddr: u32) -> Result<i32, KernelError>;

    /// Elapsed instruction count since boot (clock register 0).
    fn clock_elapsed(&self) -> u32;

    /// Program the countdown, in instructions (clock register 2).
    fn clock_set_countdown(&mut self, instructions: u32);

    /// Clear the interrupt latch (clock register 3, write 0).
    fn clock_clear_latch(&mut self);

    /// Is the device at `slot` ready (spec.md §6 console device slots)?
    fn io_status(&self, slot: u32) -> bool;

    /// Read one byte/word from a ready input device slot.
    fn io_read(&mut self, slot: u32) -> i32;

    /// Write one byte/word to a ready output device slot.
    fn io_write(&mut self, slot: u32, value: i32);

    /// Word-addressed secondary storage read.
    fn disk_read(&self, addr: u32) -> i32;

    /// Word-addressed secondary storage write.
    fn disk_write(&mut self, addr: u32, word: i32);

    /// Read a program image by name (the "program-file reader", out
    /// of scope to implement, in scope to call).
    fn load_program(&self, name: &str) -> Result<ProgramImage, ProgramLoadError>;
}
