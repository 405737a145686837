/*
 * Interrupt Descriptor Table (IDT)
 *
 * Vector assignments:
 * - 0..31: CPU exceptions
 * - 32 (IRQ 0): timer -> preemptive context-switch handler (naked)
 * - 33 (IRQ 1): keyboard
 * - 0x30: system-call gate, DPL 3 so user code may invoke it
 * - 0x81: voluntary-yield software interrupt (naked)
 *
 * The timer, yield, and syscall entries bypass the `x86-interrupt`
 * calling convention: they are naked stubs that capture the full
 * register state as a `TrapContext` so the scheduler can switch stacks.
 */

use lazy_static::lazy_static;
use x86_64::structures::idt::{InterruptDescriptorTable, InterruptStackFrame};

use super::pic;

/// Vector of the system-call gate.
pub const SYSCALL_VECTOR: u8 = 0x30;

/// Vector of the voluntary-yield software interrupt.
pub const YIELD_VECTOR: u8 = 0x81;

lazy_static! {
    static ref IDT: InterruptDescriptorTable = {
        let mut idt = InterruptDescriptorTable::new();

        idt.divide_error.set_handler_fn(divide_error_handler);
        idt.breakpoint.set_handler_fn(breakpoint_handler);
        idt.invalid_opcode.set_handler_fn(invalid_opcode_handler);
        unsafe {
            idt.double_fault
                .set_handler_fn(double_fault_handler)
                .set_stack_index(super::gdt::DOUBLE_FAULT_IST_INDEX);
        }
        idt.general_protection_fault
            .set_handler_fn(general_protection_fault_handler);
        idt.page_fault.set_handler_fn(page_fault_handler);

        // IRQ 0 - timer: naked preemption handler from the scheduler
        unsafe {
            idt[pic::TIMER_VECTOR].set_handler_addr(
                core::mem::transmute::<*const (), x86_64::VirtAddr>(
                    crate::scheduler::context::timer_interrupt_handler as *const (),
                ),
            );
        }

        // IRQ 1 - keyboard
        idt[pic::KEYBOARD_VECTOR].set_handler_fn(keyboard_interrupt_handler);

        // System-call gate. DPL 3 lets ring-3 code raise it; the gate
        // disables interrupts on entry and the dispatcher re-enables
        // them once the trap context is saved.
        unsafe {
            idt[SYSCALL_VECTOR]
                .set_handler_addr(core::mem::transmute::<*const (), x86_64::VirtAddr>(
                    crate::syscall::syscall_interrupt_handler as *const (),
                ))
                .set_privilege_level(x86_64::PrivilegeLevel::Ring3);
        }

        // Voluntary yield: same context-switch mechanism as the timer,
        // triggered by software.
        unsafe {
            idt[YIELD_VECTOR].set_handler_addr(
                core::mem::transmute::<*const (), x86_64::VirtAddr>(
                    crate::scheduler::context::yield_interrupt_handler as *const (),
                ),
            );
        }

        idt
    };
}

/// Load the IDT. Must run after the GDT is in place.
pub fn init() {
    IDT.load();
    log::info!("IDT loaded");
}

// Exception handlers

extern "x86-interrupt" fn divide_error_handler(stack_frame: InterruptStackFrame) {
    panic!("divide error at {:?}", stack_frame.instruction_pointer);
}

extern "x86-interrupt" fn breakpoint_handler(stack_frame: InterruptStackFrame) {
    log::warn!("breakpoint at {:?}", stack_frame.instruction_pointer);
}

extern "x86-interrupt" fn invalid_opcode_handler(stack_frame: InterruptStackFrame) {
    panic!("invalid opcode at {:?}", stack_frame.instruction_pointer);
}

extern "x86-interrupt" fn double_fault_handler(
    stack_frame: InterruptStackFrame,
    _error_code: u64,
) -> ! {
    panic!("double fault\n{:#?}", stack_frame);
}

extern "x86-interrupt" fn general_protection_fault_handler(
    stack_frame: InterruptStackFrame,
    error_code: u64,
) {
    panic!(
        "general protection fault (error 0x{:x}) at {:?}",
        error_code, stack_frame.instruction_pointer
    );
}

extern "x86-interrupt" fn page_fault_handler(
    stack_frame: InterruptStackFrame,
    error_code: x86_64::structures::idt::PageFaultErrorCode,
) {
    use x86_64::registers::control::Cr2;

    // User pointers are pre-validated by the syscall layer's probes, so
    // any fault that reaches this handler is a kernel bug.
    let fault_addr = Cr2::read();
    panic!(
        "page fault at {:?} (error {:?}), rip {:?}",
        fault_addr, error_code, stack_frame.instruction_pointer
    );
}

// Hardware interrupt handlers

extern "x86-interrupt" fn keyboard_interrupt_handler(_stack_frame: InterruptStackFrame) {
    super::interrupts::irq_enter();
    crate::devices::keyboard::handle_keyboard_interrupt();
    super::interrupts::irq_exit();

    pic::end_of_interrupt(1);
}
