/*
 * Page Allocator
 *
 * Hands out single 4 KiB pages for page-grained kernel objects, most
 * importantly per-thread kernel stacks. Pages are carved from the
 * kernel heap with page alignment; callers get a raw pointer and must
 * return it through `free_page`.
 */

use bitflags::bitflags;
use core::alloc::Layout;
use core::ptr::NonNull;
use core::sync::atomic::{AtomicUsize, Ordering};

/// Size of a kernel page.
pub const PAGE_SIZE: usize = 4096;

bitflags! {
    /// Allocation options for `alloc_page`.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct PageFlags: u32 {
        /// Zero the page before returning it.
        const ZERO = 1 << 0;
    }
}

/// Pages currently handed out (diagnostics only).
static PAGES_IN_USE: AtomicUsize = AtomicUsize::new(0);

/// Allocate one 4 KiB page.
///
/// Returns `None` when the heap is exhausted; callers translate that
/// into their own failure value rather than panicking.
pub fn alloc_page(flags: PageFlags) -> Option<NonNull<u8>> {
    let layout = Layout::from_size_align(PAGE_SIZE, PAGE_SIZE).ok()?;
    // SAFETY: layout is non-zero sized and well-formed.
    let raw = unsafe { alloc::alloc::alloc(layout) };
    let ptr = NonNull::new(raw)?;

    if flags.contains(PageFlags::ZERO) {
        // SAFETY: the page was just allocated with PAGE_SIZE bytes.
        unsafe { core::ptr::write_bytes(ptr.as_ptr(), 0, PAGE_SIZE) };
    }

    PAGES_IN_USE.fetch_add(1, Ordering::Relaxed);
    Some(ptr)
}

/// Return a page previously obtained from `alloc_page`.
///
/// # Safety
/// `page` must come from `alloc_page` and must not be used afterwards.
pub unsafe fn free_page(page: NonNull<u8>) {
    let layout = Layout::from_size_align(PAGE_SIZE, PAGE_SIZE).unwrap();
    unsafe { alloc::alloc::dealloc(page.as_ptr(), layout) };
    PAGES_IN_USE.fetch_sub(1, Ordering::Relaxed);
}

/// Number of pages currently allocated.
pub fn pages_in_use() -> usize {
    PAGES_IN_USE.load(Ordering::Relaxed)
}
