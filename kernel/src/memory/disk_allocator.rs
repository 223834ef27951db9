// kernel/src/memory/disk_allocator.rs
//
// Monotonic "next free disk cell" counter, laid out at process
// creation time (spec.md §3, §4.4). §9's resolved open question:
// the cursor advances once per *word* written, not once per page —
// the original source's per-page advance while writing per-word is
// the off-by-one spec.md calls out; this allocator only exposes a
// per-word `allocate` so the bug has nowhere to reappear.

use crate::error::KernelError;

pub struct DiskAllocator {
    next_free: u32,
}

impl DiskAllocator {
    pub fn new() -> Self {
        Self { next_free: 0 }
    }

    pub fn reset(&mut self) {
        self.next_free = 0;
    }

    /// Reserve `len` consecutive cells, returning their start offset.
    pub fn allocate(&mut self, len: u32) -> Result<u32, KernelError> {
        let origin = self.next_free;
        self.next_free = self
            .next_free
            .checked_add(len)
            .ok_or(KernelError::DiskExhausted)?;
        Ok(origin)
    }
}

impl Default for DiskAllocator {
    fn default() -> Self {
        Self::new()
    }
}
