/*
 * System-Call Dispatch
 *
 * Entry is an interrupt gate at vector 0x30 with DPL 3. The naked stub
 * saves the full register state; the dispatcher then reads the call
 * number from the caller's stack pointer through the user-memory
 * probes, pulls arguments from the following 4-byte slots the same
 * way, routes to a handler, and deposits the result in the saved RAX.
 *
 * Any probe failure terminates the process with exit code -1, after
 * releasing the global file-system lock if this thread holds it - the
 * lock must never die with its owner. An unknown call number prints a
 * diagnostic and terminates the same way.
 *
 * Interrupts are re-enabled while a call executes (the gate clears IF
 * on entry) and disabled again around the return path so the restored
 * context is handed back atomically.
 */

pub mod handlers;
pub mod numbers;
pub mod usermem;

use lazy_static::lazy_static;

use crate::arch::x86_64::interrupts;
use crate::scheduler::context::InterruptContext;
use crate::sync::Lock;
use crate::userprog::process;
use self::numbers::*;

lazy_static! {
    /// The one lock serializing every file-system operation.
    static ref FS_LOCK: Lock = Lock::new();
}

/// The global file-system lock. Handlers acquire it around file-system
/// work; fault paths release it on the way out.
pub(crate) fn fs_lock() -> &'static Lock {
    &FS_LOCK
}

/// Kill the current process for a user-memory fault (or an unknown
/// call), releasing the file-system lock if this thread holds it.
pub(crate) fn terminate() -> ! {
    if fs_lock().held_by_current_thread() {
        fs_lock().release();
    }
    process::exit(-1);
}

/// Initialize the syscall layer. The IDT wires vector 0x30 to the
/// naked entry stub; this materializes the file-system lock.
pub fn init() {
    lazy_static::initialize(&FS_LOCK);
    log::info!("syscall interface ready (vector 0x30, DPL 3)");
}

/// Naked entry stub for INT 0x30.
///
/// Mirrors the context-switch stubs: capture an InterruptContext, hand
/// it to the dispatcher, resume whatever context comes back. The
/// dispatcher returns its own input, but routing the result through
/// RSP keeps the exit path identical to every other interrupt return.
#[unsafe(naked)]
pub unsafe extern "C" fn syscall_interrupt_handler() {
    core::arch::naked_asm!(
        "push rax",
        "push rbx",
        "push rcx",
        "push rdx",
        "push rsi",
        "push rdi",
        "push rbp",
        "push r8",
        "push r9",
        "push r10",
        "push r11",
        "push r12",
        "push r13",
        "push r14",
        "push r15",

        "mov rdi, rsp",
        "call {dispatch_fn}",
        "mov rsp, rax",

        "pop r15",
        "pop r14",
        "pop r13",
        "pop r12",
        "pop r11",
        "pop r10",
        "pop r9",
        "pop r8",
        "pop rbp",
        "pop rdi",
        "pop rsi",
        "pop rdx",
        "pop rcx",
        "pop rbx",
        "pop rax",

        "iretq",

        dispatch_fn = sym syscall_trap,
    )
}

/// Read argument slot `index` from the caller's stack, killing the
/// process on a bad pointer.
fn arg(user_sp: u64, index: u64) -> i32 {
    match usermem::get_user_u32(user_sp + 4 * index) {
        Some(value) => value as i32,
        None => terminate(),
    }
}

/// The dispatcher proper.
pub(crate) extern "C" fn syscall_trap(ctx: *mut InterruptContext) -> *const InterruptContext {
    // SAFETY: ctx points at the register state the stub just saved on
    // this thread's stack.
    let ctx = unsafe { &mut *ctx };

    // Gate cleared IF; system calls run with interrupts enabled and
    // may block.
    interrupts::enable();

    let user_sp = ctx.iret_frame.rsp;
    let number = match usermem::get_user_u32(user_sp) {
        Some(n) => n as i32,
        None => terminate(),
    };

    let ret: i32 = match number {
        SYS_HALT => handlers::sys_halt(),
        SYS_EXIT => handlers::sys_exit(arg(user_sp, 1)),
        SYS_EXEC => handlers::sys_exec(arg(user_sp, 1) as u32 as u64),
        SYS_WAIT => handlers::sys_wait(arg(user_sp, 1)),
        SYS_CREATE => handlers::sys_create(arg(user_sp, 1) as u32 as u64, arg(user_sp, 2) as u32),
        SYS_REMOVE => handlers::sys_remove(arg(user_sp, 1) as u32 as u64),
        SYS_OPEN => handlers::sys_open(arg(user_sp, 1) as u32 as u64),
        SYS_FILESIZE => handlers::sys_filesize(arg(user_sp, 1)),
        SYS_READ => handlers::sys_read(
            arg(user_sp, 1),
            arg(user_sp, 2) as u32 as u64,
            arg(user_sp, 3) as u32,
        ),
        SYS_WRITE => handlers::sys_write(
            arg(user_sp, 1),
            arg(user_sp, 2) as u32 as u64,
            arg(user_sp, 3) as u32,
        ),
        SYS_SEEK => {
            handlers::sys_seek(arg(user_sp, 1), arg(user_sp, 2) as u32);
            0
        }
        SYS_TELL => handlers::sys_tell(arg(user_sp, 1)),
        SYS_CLOSE => {
            handlers::sys_close(arg(user_sp, 1));
            0
        }
        unknown => {
            crate::println!("[ERROR] system call {} is unimplemented!", unknown);
            terminate();
        }
    };

    ctx.rax = ret as u32 as u64;

    interrupts::disable();
    ctx as *mut InterruptContext as *const InterruptContext
}
