/*
 * System-Call Handlers
 *
 * One function per call. Every handler that touches the file system
 * runs under the global file-system lock, and every path out of a
 * handler - including the involuntary ones taken when a user pointer
 * turns out to be bad - releases that lock before the process dies.
 *
 * Pointer discipline: buffer arguments are probed at their first byte
 * and, when a length is supplied, at their last byte; the bytes in
 * between are moved exclusively through the user-memory probes in
 * chunks, so a mapping that ends mid-buffer kills the process cleanly.
 * Plain integer arguments (descriptors, sizes, pids) are never probed;
 * they are values, not pointers.
 */

use crate::devices::{console, keyboard, shutdown};
use crate::fs;
use crate::scheduler;
use crate::userprog::process;

use super::usermem::{get_user, get_user_bytes, get_user_cstr, put_user};
use super::{fs_lock, terminate};

/// Copy-loop granularity for buffer-moving calls.
const CHUNK: usize = 512;

pub fn sys_halt() -> ! {
    shutdown::power_off();
}

pub fn sys_exit(status: i32) -> ! {
    process::exit(status);
}

pub fn sys_exec(cmd_ptr: u64) -> i32 {
    if get_user(cmd_ptr).is_none() {
        terminate();
    }
    let Some(cmdline) = get_user_cstr(cmd_ptr) else {
        terminate();
    };

    fs_lock().acquire();
    let pid = process::execute(&cmdline);
    fs_lock().release();
    pid
}

pub fn sys_wait(pid: i32) -> i32 {
    process::wait(pid)
}

pub fn sys_create(name_ptr: u64, initial_size: u32) -> i32 {
    if get_user(name_ptr).is_none() {
        terminate();
    }
    let Some(name) = get_user_cstr(name_ptr) else {
        terminate();
    };

    fs_lock().acquire();
    let created = fs::create(&name, initial_size);
    fs_lock().release();
    created as i32
}

pub fn sys_remove(name_ptr: u64) -> i32 {
    if get_user(name_ptr).is_none() {
        terminate();
    }
    let Some(name) = get_user_cstr(name_ptr) else {
        terminate();
    };

    fs_lock().acquire();
    let removed = fs::remove(&name);
    fs_lock().release();
    removed as i32
}

pub fn sys_open(name_ptr: u64) -> i32 {
    if get_user(name_ptr).is_none() {
        terminate();
    }
    let Some(name) = get_user_cstr(name_ptr) else {
        terminate();
    };

    fs_lock().acquire();
    let fd = match fs::open(&name) {
        Some(file) => scheduler::with_current_thread_mut(|t| t.descriptors.alloc(file)),
        None => -1,
    };
    fs_lock().release();
    fd
}

/// Invalid descriptors are ignored silently; closing is idempotent
/// from the caller's point of view.
pub fn sys_close(fd: i32) {
    fs_lock().acquire();
    let entry = scheduler::with_current_thread_mut(|t| t.descriptors.remove(fd));
    drop(entry); // dropping the descriptor closes the file
    fs_lock().release();
}

pub fn sys_filesize(fd: i32) -> i32 {
    fs_lock().acquire();
    let size = scheduler::with_current_thread_mut(|t| {
        t.descriptors.get_mut(fd).map(|d| d.file.length() as i32)
    })
    .unwrap_or(-1);
    fs_lock().release();
    size
}

pub fn sys_read(fd: i32, buffer: u64, size: u32) -> i32 {
    if get_user(buffer).is_none() {
        terminate();
    }
    if size > 0 && get_user(buffer + size as u64 - 1).is_none() {
        terminate();
    }

    fs_lock().acquire();
    let ret = match fd {
        1 => -1,
        0 => read_keyboard(buffer, size),
        _ => read_file(fd, buffer, size),
    };
    fs_lock().release();
    ret
}

/// fd 0: keyboard characters up to `size` bytes or a NUL, with the
/// destination NUL-terminated. Returns the number of characters
/// stored before the terminator.
fn read_keyboard(buffer: u64, size: u32) -> i32 {
    if size == 0 {
        return 0;
    }
    let mut stored: u32 = 0;
    while stored < size - 1 {
        let c = keyboard::input_getc();
        if c == 0 {
            break;
        }
        if !put_user(buffer + stored as u64, c) {
            terminate();
        }
        stored += 1;
    }
    if !put_user(buffer + stored as u64, 0) {
        terminate();
    }
    stored as i32
}

fn read_file(fd: i32, buffer: u64, size: u32) -> i32 {
    let exists = scheduler::with_current_thread_mut(|t| t.descriptors.get_mut(fd).is_some());
    if !exists {
        return -1;
    }

    let mut chunk = [0u8; CHUNK];
    let mut total: u32 = 0;
    while total < size {
        let want = ((size - total) as usize).min(CHUNK);
        let got = scheduler::with_current_thread_mut(|t| {
            t.descriptors
                .get_mut(fd)
                .map(|d| d.file.read(&mut chunk[..want]))
        })
        .unwrap_or(0);
        for (i, &byte) in chunk[..got].iter().enumerate() {
            if !put_user(buffer + total as u64 + i as u64, byte) {
                terminate();
            }
        }
        total += got as u32;
        if got < want {
            break; // end of file
        }
    }
    total as i32
}

pub fn sys_write(fd: i32, buffer: u64, size: u32) -> i32 {
    if get_user(buffer).is_none() {
        terminate();
    }
    if size > 0 && get_user(buffer + size as u64 - 1).is_none() {
        terminate();
    }

    fs_lock().acquire();
    let ret = match fd {
        0 => -1,
        1 => write_console(buffer, size),
        _ => write_file(fd, buffer, size),
    };
    fs_lock().release();
    ret
}

/// fd 1: the console. Returns `size`; the console never runs short.
fn write_console(buffer: u64, size: u32) -> i32 {
    let mut chunk = [0u8; CHUNK];
    let mut done: u32 = 0;
    while done < size {
        let want = ((size - done) as usize).min(CHUNK);
        if get_user_bytes(buffer + done as u64, &mut chunk[..want]) == -1 {
            terminate();
        }
        console::putbuf(&chunk[..want]);
        done += want as u32;
    }
    size as i32
}

fn write_file(fd: i32, buffer: u64, size: u32) -> i32 {
    let exists = scheduler::with_current_thread_mut(|t| t.descriptors.get_mut(fd).is_some());
    if !exists {
        return -1;
    }

    let mut chunk = [0u8; CHUNK];
    let mut total: u32 = 0;
    while total < size {
        let want = ((size - total) as usize).min(CHUNK);
        if get_user_bytes(buffer + total as u64, &mut chunk[..want]) == -1 {
            terminate();
        }
        let wrote = scheduler::with_current_thread_mut(|t| {
            t.descriptors
                .get_mut(fd)
                .map(|d| d.file.write(&chunk[..want]))
        })
        .unwrap_or(0);
        total += wrote as u32;
        if wrote < want {
            break; // fixed-size file is full, or writes are denied
        }
    }
    total as i32
}

/// Missing descriptors are ignored, but the lock is released on every
/// path out.
pub fn sys_seek(fd: i32, position: u32) {
    fs_lock().acquire();
    scheduler::with_current_thread_mut(|t| {
        if let Some(d) = t.descriptors.get_mut(fd) {
            d.file.seek(position);
        }
    });
    fs_lock().release();
}

pub fn sys_tell(fd: i32) -> i32 {
    fs_lock().acquire();
    let pos = scheduler::with_current_thread_mut(|t| {
        t.descriptors.get_mut(fd).map(|d| d.file.tell() as i32)
    })
    .unwrap_or(-1);
    fs_lock().release();
    pos
}
