/*
 * System-Call Shim
 *
 * The user-side half of the syscall ABI. A call is made by pointing
 * the stack at a block of 4-byte slots - the call number first, then
 * the arguments - and raising INT 0x30; the dispatcher reads the slots
 * through its user-memory probes and leaves the result in RAX.
 *
 * The slot block is pushed onto the caller's own stack, exactly where
 * the dispatcher expects to find it through the saved stack pointer,
 * and popped after the gate returns. Pointer arguments are passed as
 * 32-bit values; all user-reachable memory sits below 4 GiB.
 *
 * Test programs run through this shim so the whole dispatcher path -
 * gate, stack reads, pointer probes - is exercised, not just the
 * handler bodies.
 */

use alloc::vec::Vec;
use core::arch::asm;

use crate::syscall::numbers::*;

/// Raise INT 0x30 with the given call number and argument slots.
fn raw_syscall(words: [u32; 4]) -> i32 {
    let ret: u64;
    unsafe {
        asm!(
            "sub rsp, 16",
            "mov dword ptr [rsp], {w0:e}",
            "mov dword ptr [rsp + 4], {w1:e}",
            "mov dword ptr [rsp + 8], {w2:e}",
            "mov dword ptr [rsp + 12], {w3:e}",
            "int 0x30",
            "add rsp, 16",
            w0 = in(reg) words[0],
            w1 = in(reg) words[1],
            w2 = in(reg) words[2],
            w3 = in(reg) words[3],
            out("rax") ret,
        );
    }
    ret as u32 as i32
}

/// NUL-terminate a string for the C-string reading side of the ABI.
fn c_string(s: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(s.len() + 1);
    bytes.extend_from_slice(s.as_bytes());
    bytes.push(0);
    bytes
}

pub fn halt() -> ! {
    raw_syscall([SYS_HALT as u32, 0, 0, 0]);
    unreachable!("halt returned")
}

pub fn exit(status: i32) -> ! {
    raw_syscall([SYS_EXIT as u32, status as u32, 0, 0]);
    unreachable!("exit returned")
}

pub fn exec(cmdline: &str) -> i32 {
    let cmd = c_string(cmdline);
    raw_syscall([SYS_EXEC as u32, cmd.as_ptr() as u32, 0, 0])
}

pub fn wait(pid: i32) -> i32 {
    raw_syscall([SYS_WAIT as u32, pid as u32, 0, 0])
}

pub fn create(name: &str, initial_size: u32) -> bool {
    let name = c_string(name);
    raw_syscall([SYS_CREATE as u32, name.as_ptr() as u32, initial_size, 0]) != 0
}

pub fn remove(name: &str) -> bool {
    let name = c_string(name);
    raw_syscall([SYS_REMOVE as u32, name.as_ptr() as u32, 0, 0]) != 0
}

pub fn open(name: &str) -> i32 {
    let name = c_string(name);
    raw_syscall([SYS_OPEN as u32, name.as_ptr() as u32, 0, 0])
}

pub fn close(fd: i32) {
    raw_syscall([SYS_CLOSE as u32, fd as u32, 0, 0]);
}

pub fn filesize(fd: i32) -> i32 {
    raw_syscall([SYS_FILESIZE as u32, fd as u32, 0, 0])
}

/// Raw-pointer read so tests can aim at arbitrary addresses.
pub fn read(fd: i32, buffer: u32, size: u32) -> i32 {
    raw_syscall([SYS_READ as u32, fd as u32, buffer, size])
}

/// Raw-pointer write so tests can aim at arbitrary addresses.
pub fn write(fd: i32, buffer: u32, size: u32) -> i32 {
    raw_syscall([SYS_WRITE as u32, fd as u32, buffer, size])
}

pub fn write_bytes(fd: i32, buf: &[u8]) -> i32 {
    write(fd, buf.as_ptr() as u32, buf.len() as u32)
}

pub fn read_bytes(fd: i32, buf: &mut [u8]) -> i32 {
    read(fd, buf.as_mut_ptr() as u32, buf.len() as u32)
}

pub fn seek(fd: i32, position: u32) {
    raw_syscall([SYS_SEEK as u32, fd as u32, position, 0]);
}

pub fn tell(fd: i32) -> i32 {
    raw_syscall([SYS_TELL as u32, fd as u32, 0, 0])
}

/// Raise an arbitrary (typically bogus) call number.
pub fn raw(number: u32) -> i32 {
    raw_syscall([number, 0, 0, 0])
}
