/*
 * User-Memory Probes
 *
 * The only way the syscall layer ever touches user memory. A user
 * pointer is valid when it compares strictly below PHYS_BASE and the
 * active page tables actually map it; both are checked before the
 * access, so a hostile pointer produces a clean failure value instead
 * of a kernel page fault.
 *
 * Probes are byte-wise. Multi-byte reads fail as a whole if any byte
 * fails; the caller terminates the process, so partial progress is
 * never observable.
 */

use alloc::string::String;
use alloc::vec::Vec;

use crate::memory::paging;

/// First address of kernel space; user pointers lie strictly below.
pub const PHYS_BASE: u64 = crate::memory::PHYS_BASE;

/// Longest C string the kernel will read from user space.
const MAX_USER_STR: usize = 4096;

/// Read one byte at a user address. None on any invalid address.
pub fn get_user(uaddr: u64) -> Option<u8> {
    if uaddr >= PHYS_BASE {
        return None;
    }
    paging::translate(uaddr)?;
    // SAFETY: the address is mapped; volatile to keep the access real.
    Some(unsafe { (uaddr as *const u8).read_volatile() })
}

/// Write one byte at a user address. False on any invalid or
/// read-only address.
pub fn put_user(uaddr: u64, byte: u8) -> bool {
    if uaddr >= PHYS_BASE {
        return false;
    }
    match paging::translate(uaddr) {
        Some(mapping) if mapping.writable => {
            // SAFETY: mapped and writable.
            unsafe { (uaddr as *mut u8).write_volatile(byte) };
            true
        }
        _ => false,
    }
}

/// Read `dst.len()` consecutive bytes from user space.
///
/// Returns the byte count on success, -1 on any fault; nothing partial
/// is reported.
pub fn get_user_bytes(uaddr: u64, dst: &mut [u8]) -> i32 {
    for (i, slot) in dst.iter_mut().enumerate() {
        match get_user(uaddr + i as u64) {
            Some(byte) => *slot = byte,
            None => return -1,
        }
    }
    dst.len() as i32
}

/// Read one 4-byte little-endian value (the argument-slot type).
pub fn get_user_u32(uaddr: u64) -> Option<u32> {
    let mut bytes = [0u8; 4];
    if get_user_bytes(uaddr, &mut bytes) == -1 {
        return None;
    }
    Some(u32::from_le_bytes(bytes))
}

/// Read a NUL-terminated string from user space.
///
/// None on a fault or when no terminator appears within the size cap.
pub fn get_user_cstr(uaddr: u64) -> Option<String> {
    let mut bytes = Vec::new();
    for i in 0..MAX_USER_STR {
        let byte = get_user(uaddr + i as u64)?;
        if byte == 0 {
            return String::from_utf8(bytes).ok();
        }
        bytes.push(byte);
    }
    None
}
