/*
 * Page-Table Walker
 *
 * Read-only translation of virtual addresses through the active 4-level
 * page-table hierarchy. The syscall layer uses this to prove a user
 * address is mapped (and writable, for stores) before dereferencing it,
 * so a bad user pointer is reported as a failure instead of becoming a
 * kernel page fault.
 *
 * Table frames are read through the identity mapping BOOTBOOT
 * establishes for RAM.
 */

use x86_64::registers::control::Cr3;

const FLAG_PRESENT: u64 = 1 << 0;
const FLAG_WRITABLE: u64 = 1 << 1;
const FLAG_HUGE: u64 = 1 << 7;

const ADDR_MASK: u64 = 0x000f_ffff_ffff_f000;

/// Result of a successful translation.
#[derive(Debug, Clone, Copy)]
pub struct Mapping {
    pub phys: u64,
    pub writable: bool,
}

fn table_entry(table_phys: u64, index: u64) -> u64 {
    // SAFETY: table frames live in identity-mapped RAM; the index is
    // masked to the 512-entry range.
    unsafe { *((table_phys + (index & 0x1ff) * 8) as *const u64) }
}

/// Walk the active page tables for `vaddr`.
///
/// Returns `None` when any level is not present. Huge pages (1 GiB and
/// 2 MiB) are handled; the writable bit is the AND of the walked
/// levels' writable bits, matching the hardware's permission check.
pub fn translate(vaddr: u64) -> Option<Mapping> {
    let (frame, _) = Cr3::read();
    let mut table = frame.start_address().as_u64();
    let mut writable = true;

    for level in (1..=4).rev() {
        let index = vaddr >> (12 + 9 * (level - 1));
        let entry = table_entry(table, index);

        if entry & FLAG_PRESENT == 0 {
            return None;
        }
        writable &= entry & FLAG_WRITABLE != 0;

        if level > 1 && entry & FLAG_HUGE != 0 {
            // 1 GiB (level 3) or 2 MiB (level 2) mapping
            let page_bits = 12 + 9 * (level - 1);
            let page_mask = (1u64 << page_bits) - 1;
            let phys = (entry & ADDR_MASK & !page_mask) | (vaddr & page_mask);
            return Some(Mapping { phys, writable });
        }

        table = entry & ADDR_MASK;
    }

    Some(Mapping {
        phys: table | (vaddr & 0xfff),
        writable,
    })
}
