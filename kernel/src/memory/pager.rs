// kernel/src/memory/pager.rs
//
// Demand-paging loader (spec.md §4.4). Grounded in the teacher's
// `memory::demand_paging` module for the load/fault split, and in
// original_source/Trabalhos/t2/so.c's `soCarrega`/`soTrataPageFault`
// for the disk-layout and page-fault sequencing this generalizes.

use log::{debug, trace};

use crate::error::KernelError;
use crate::machine::{Machine, ProgramImage};
use crate::memory::disk_allocator::DiskAllocator;
use crate::memory::frame_allocator::FrameAllocator;
use crate::memory::page_table::PageTable;

/// Result of a successful load: the freshly built page table, the disk
/// offset where the image now lives, and the virtual PC to resume at.
pub struct Loaded {
    pub page_table: PageTable,
    pub disk_origin: u32,
    pub entry_point: u32,
}

/// Lay a program image out on disk and mark its pages absent.
///
/// Steps follow §4.4 "Loading" exactly: determine the page range from
/// the image header, mark it absent, write the image to disk advancing
/// the cursor once per word (the corrected contract from §9 — the
/// source's per-page cursor advance against a per-word write count is
/// the off-by-one this implementation does not reproduce).
pub fn load_program<M: Machine>(
    machine: &mut M,
    disk: &mut DiskAllocator,
    page_size: u32,
    image: ProgramImage,
) -> Result<Loaded, KernelError> {
    let virt_start = image.virt_start;
    let virt_end = image.virt_end();
    let p_first = virt_start / page_size;
    let p_last = virt_end / page_size;

    let mut page_table = PageTable::empty();
    page_table.mark_range_absent(p_first, p_last);

    let disk_origin = disk.allocate(image.words.len() as u32)?;
    for (offset, word) in image.words.iter().enumerate() {
        machine.disk_write(disk_origin + offset as u32, *word);
    }
    trace!(
        "loaded image: virt=[{:#x},{:#x}] pages=[{},{}] disk_origin={}",
        virt_start, virt_end, p_first, p_last, disk_origin
    );

    Ok(Loaded {
        page_table,
        disk_origin,
        entry_point: virt_start,
    })
}

/// Service a page fault (§4.4 "Page-fault handling"). `vaddr` is the
/// offending virtual address, read by the caller from the current
/// descriptor's saved complement register.
pub fn handle_page_fault<M: Machine>(
    machine: &mut M,
    frames: &mut FrameAllocator,
    page_table: &mut PageTable,
    disk_origin: u32,
    page_size: u32,
    vaddr: u32,
) -> Result<(), KernelError> {
    let page = vaddr / page_size;
    let frame = frames.allocate()?;
    page_table.map(page, frame);

    let disk_base = disk_origin + page * page_size;
    let mem_base = frame * page_size;
    for cell in 0..page_size {
        let word = machine.disk_read(disk_base + cell);
        machine.mem_write(mem_base + cell, word);
    }
    debug!("page fault: vaddr={:#x} page={} -> frame={}", vaddr, page, frame);
    Ok(())
}
