/*
 * Kernel Heap
 *
 * Dynamic allocation for the kernel via linked_list_allocator. BOOTBOOT
 * identity-maps usable RAM, so the heap is placed directly over the
 * largest free region of the loader's memory map rather than being
 * mapped page by page.
 *
 * The region is clamped to start no lower than LOW_RESERVED (the
 * loader, the kernel image, and early page tables live below that) and
 * capped at HEAP_MAX so heap addresses stay well inside the identity
 * mapping.
 */

use linked_list_allocator::LockedHeap;

use crate::bootboot::{self, MMAP_FREE};

/// Physical floor for the heap; everything below is considered claimed
/// by the loader or the kernel image.
const LOW_RESERVED: u64 = 0x0100_0000; // 16 MiB

/// Upper bound on heap size.
const HEAP_MAX: u64 = 64 * 1024 * 1024; // 64 MiB

/// Global allocator instance used by Rust's allocation APIs.
#[global_allocator]
static ALLOCATOR: LockedHeap = LockedHeap::empty();

/// Initialize the kernel heap over the largest free memory region.
///
/// # Panics
/// Panics when the memory map contains no usable region, which means
/// the machine cannot run the kernel at all.
pub fn init() {
    let mut best: Option<(u64, u64)> = None; // (start, len)

    for entry in bootboot::memory_map() {
        if entry.entry_type() != MMAP_FREE {
            continue;
        }
        let ptr = entry.ptr;
        let len = entry.region_size();
        let start = ptr.max(LOW_RESERVED);
        // The heap must stay below the user/kernel split: thread
        // stacks come from it and are handed to the syscall layer as
        // user-visible buffers.
        let end = (ptr + len).min(super::PHYS_BASE);
        if end <= start {
            continue;
        }
        let usable = end - start;
        if best.map_or(true, |(_, l)| usable > l) {
            best = Some((start, usable));
        }
    }

    let (start, len) = best.expect("no usable RAM region in BOOTBOOT memory map");
    let len = len.min(HEAP_MAX);

    unsafe {
        ALLOCATOR.lock().init(start as *mut u8, len as usize);
    }

    log::info!(
        "kernel heap: 0x{:x} - 0x{:x} ({} KiB)",
        start,
        start + len - 1,
        len / 1024
    );
}

/// Allocation failure is fatal in kernel context.
#[alloc_error_handler]
fn alloc_error(layout: core::alloc::Layout) -> ! {
    panic!("kernel heap allocation failed: {:?}", layout);
}
