/*
 * Ocelot Kernel Entry Point
 *
 * A teaching kernel built around a preemptive priority scheduler with
 * priority donation, an optional multi-level feedback queue scheduler,
 * blocking synchronization primitives, a timed-sleep facility, and a
 * user-process system-call layer.
 *
 * Boot flow (BOOTBOOT protocol):
 * - `_start` runs on every core; the BSP switches to a static 64 KiB
 *   boot stack and enters `kstart`, APs park
 * - `kstart` brings up serial + logging, descriptor tables, memory,
 *   the interrupt controller and timer, devices, and the scheduler,
 *   then either runs the self-test suite or idles
 *
 * Command-line options (BOOTBOOT environment):
 * - `-o mlfqs`  select the multi-level feedback queue scheduler
 * - `-o tests`  run the in-kernel self-test suite, then power off
 */

#![no_std]
#![no_main]
#![feature(abi_x86_interrupt)]
#![feature(alloc_error_handler)]

extern crate alloc;
extern crate rlibc;

use core::panic::PanicInfo;

mod arch;
mod bootboot;
mod devices;
mod fs;
mod memory;
mod scheduler;
mod sync;
mod syscall;
mod tests;
mod timer;
mod userprog;
mod utils;

use sync::Semaphore;

#[repr(C, align(16))]
pub struct AlignedBspStack([u8; 64 * 1024]);

#[unsafe(no_mangle)]
pub static mut BSP_STACK: AlignedBspStack = AlignedBspStack([0; 64 * 1024]);

/// ===============================
///  EARLY ENTRY POINT (_start)
/// ===============================
///
/// Called by the BOOTBOOT loader on ALL cores. Identifies the BSP via
/// bootboot.bspid, switches it onto our own boot stack, and parks the
/// APs - this kernel is strictly uniprocessor.
#[unsafe(naked)]
#[unsafe(no_mangle)]
pub unsafe extern "C" fn _start() -> ! {
    core::arch::naked_asm!(
        // CPUID leaf 1 -> EBX[31:24] = APIC ID
        "mov eax, 1",
        "cpuid",
        "shr ebx, 24",

        // Load &bootboot into RAX and read bspid (u16 @ offset 0x0C)
        "lea rax, [rip + bootboot]",
        "movzx ecx, word ptr [rax + 0x0C]",

        "cmp ebx, ecx",
        "jne 2f",

        // BSP: switch to the 64 KiB boot stack and enter Rust
        "lea rax, [rip + BSP_STACK]",
        "add rax, {stack_size}",
        "mov rsp, rax",
        "jmp kstart",

        // APs: halt forever
        "2:",
        "1:",
        "hlt",
        "jmp 1b",

        stack_size = const 64 * 1024,
    );
}

/// Parsed kernel command line.
struct BootOptions {
    mlfqs: bool,
    run_tests: bool,
}

/// Options are `-o <name>` pairs in the BOOTBOOT environment.
fn parse_options(cmdline: &str) -> BootOptions {
    let mut options = BootOptions {
        mlfqs: false,
        run_tests: false,
    };
    let mut tokens = cmdline.split_whitespace();
    while let Some(token) = tokens.next() {
        if token == "-o" {
            match tokens.next() {
                Some("mlfqs") => options.mlfqs = true,
                Some("tests") => options.run_tests = true,
                Some(other) => log::warn!("unknown kernel option '{}'", other),
                None => {}
            }
        }
    }
    options
}

fn test_runner(_aux: usize) {
    tests::run_all();
}

/// ===============================
///  RUST KERNEL ENTRY POINT
/// ===============================
#[unsafe(no_mangle)]
pub extern "C" fn kstart() -> ! {
    arch::x86_64::serial::init();
    utils::logger::init();
    log::info!("ocelot kernel starting");

    arch::x86_64::gdt::init();
    arch::x86_64::idt::init();

    memory::init();
    fs::init();

    arch::x86_64::pic::init();
    arch::x86_64::pic::init_pit(timer::TIMER_FREQ as u32);
    devices::keyboard::init();
    syscall::init();

    let options = parse_options(bootboot::command_line());
    log::info!(
        "command line: '{}' (mlfqs: {}, tests: {})",
        bootboot::command_line(),
        options.mlfqs,
        options.run_tests
    );

    scheduler::init(options.mlfqs);

    x86_64::instructions::interrupts::enable();
    log::info!("interrupts enabled");

    scheduler::start();

    if options.run_tests {
        // The suite runs in its own thread: its stack comes from the
        // kernel heap, below PHYS_BASE, so buffers it hands to the
        // syscall layer pass the user-memory probes. The boot thread
        // parks on a semaphore nobody ever ups.
        scheduler::spawn("test-runner", scheduler::PRI_DEFAULT, test_runner, 0)
            .expect("cannot spawn test runner");

        static PARKED: Semaphore = Semaphore::new(0);
        PARKED.down();
        unreachable!("boot thread unparked");
    }

    log::info!("boot complete");
    loop {
        x86_64::instructions::hlt();
    }
}

/// ===============================
///  PANIC HANDLER
/// ===============================
///
/// Invariant violations are not recoverable; report and halt.
#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    x86_64::instructions::interrupts::disable();

    if let Some(location) = info.location() {
        log::error!(
            "PANIC at {}:{}: {}",
            location.file(),
            location.line(),
            info.message()
        );
    } else {
        log::error!("PANIC: {}", info.message());
    }

    loop {
        x86_64::instructions::hlt();
    }
}
