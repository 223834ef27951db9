// kernel/src/memory/frame_allocator.rs
//
// Monotonic "next free frame" counter over main memory (spec.md §3).
// No reclamation — matches the teacher's own
// `frame_allocator::BootInfoFrameAllocator` in spirit (bump-style,
// never frees) even though the teacher's version walks real
// bootloader-reported memory regions and this one just counts.

use crate::error::KernelError;

pub struct FrameAllocator {
    next_free: u32,
}

impl FrameAllocator {
    pub fn new(first_free_frame: u32) -> Self {
        Self { next_free: first_free_frame }
    }

    pub fn reset(&mut self, first_free_frame: u32) {
        self.next_free = first_free_frame;
    }

    /// Allocate the next frame. spec.md §4.4: "No eviction: if frames
    /// are exhausted, the loader returns CPU_HALTED" — here that's
    /// surfaced as a `KernelError` the caller turns into `Halted`.
    pub fn allocate(&mut self) -> Result<u32, KernelError> {
        let frame = self.next_free;
        self.next_free = self
            .next_free
            .checked_add(1)
            .ok_or(KernelError::FramesExhausted)?;
        Ok(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocations_are_sequential_past_the_reserved_region() {
        let mut frames = FrameAllocator::new(7);
        assert_eq!(frames.allocate().unwrap(), 7);
        assert_eq!(frames.allocate().unwrap(), 8);
        assert_eq!(frames.allocate().unwrap(), 9);
    }

    #[test]
    fn reset_rewinds_to_the_given_frame() {
        let mut frames = FrameAllocator::new(7);
        frames.allocate().unwrap();
        frames.reset(7);
        assert_eq!(frames.allocate().unwrap(), 7);
    }

    #[test]
    fn exhaustion_is_reported_rather_than_panicking() {
        let mut frames = FrameAllocator::new(u32::MAX);
        assert!(frames.allocate().is_ok());
        assert_eq!(frames.allocate(), Err(KernelError::FramesExhausted));
    }
}
