/*
 * Interrupt-Based Context Switching
 *
 * Context switches are performed through interrupts, both preemptive
 * (the timer IRQ) and voluntary (the INT 0x81 software interrupt
 * raised by yield). Either way the flow is identical:
 *
 * 1. The CPU pushes the interrupt frame (RIP, CS, RFLAGS, RSP, SS)
 * 2. The naked stub pushes every general-purpose register, forming a
 *    complete InterruptContext on the interrupted thread's stack
 * 3. The scheduler is called with a pointer to that context and
 *    returns a pointer to the context of the thread to run next
 * 4. The stub switches RSP to the returned context, pops the
 *    registers, and resumes the chosen thread via iretq
 *
 * A brand-new thread's saved context is forged to look as if it had
 * been interrupted at its entry trampoline with interrupts enabled, so
 * the very first dispatch runs the same restore path as every other
 * switch.
 */

/// Interrupt frame pushed by the CPU.
///
/// `#[repr(C)]` keeps the layout identical to what the hardware pushes.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct InterruptFrame {
    pub rip: u64,    // Instruction pointer to resume at
    pub cs: u64,     // Code segment selector
    pub rflags: u64, // CPU flags
    pub rsp: u64,    // Stack pointer before the interrupt
    pub ss: u64,     // Stack segment selector
}

impl Default for InterruptFrame {
    fn default() -> Self {
        Self {
            rip: 0,
            cs: 0x08,      // Kernel code segment
            rflags: 0x202, // IF=1, reserved bit 1 always set
            rsp: 0,
            ss: 0x10, // Kernel data segment
        }
    }
}

/// Complete saved CPU state for one thread.
///
/// Field order matches the push sequence in the naked stubs: the
/// general-purpose registers sit below the hardware interrupt frame,
/// with r15 at the lowest address (where RSP points after the pushes).
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct InterruptContext {
    pub r15: u64,
    pub r14: u64,
    pub r13: u64,
    pub r12: u64,
    pub r11: u64,
    pub r10: u64,
    pub r9: u64,
    pub r8: u64,
    pub rbp: u64,
    pub rdi: u64,
    pub rsi: u64,
    pub rdx: u64,
    pub rcx: u64,
    pub rbx: u64,
    pub rax: u64,

    pub iret_frame: InterruptFrame,
}

/// Preemptive timer interrupt entry (IRQ 0).
///
/// Saves the full register state, lets the scheduler advance the tick
/// and pick the next thread, sends EOI to the PIC, and resumes whatever
/// context the scheduler returned.
#[unsafe(naked)]
pub unsafe extern "C" fn timer_interrupt_handler() {
    core::arch::naked_asm!(
        // CPU already pushed SS, RSP, RFLAGS, CS, RIP.
        // Push RAX first, R15 last, so RSP ends up pointing at the
        // first field of InterruptContext.
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
        "call {schedule_fn}",
        // RAX holds the next thread's InterruptContext pointer.
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

        // EOI to the master PIC before resuming.
        "push rax",
        "mov al, 0x20",
        "out 0x20, al",
        "pop rax",

        "iretq",

        schedule_fn = sym super::schedule_preempt,
    )
}

/// Voluntary yield entry (INT 0x81).
///
/// Identical to the timer path except that no EOI is needed for a
/// software interrupt and the scheduler treats the switch as a yield
/// instead of a tick.
#[unsafe(naked)]
pub unsafe extern "C" fn yield_interrupt_handler() {
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
        "call {schedule_fn}",
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

        schedule_fn = sym super::schedule_yield,
    )
}
