/*
 * Machine Power-Off
 *
 * Tries the ACPI PM1a ports emulated by common virtual machines, then
 * falls back to halting forever. Used by the HALT syscall and by the
 * test runner once the suite finishes.
 */

use crate::arch::x86_64::pio::{Io, Pio};

/// Power the machine off. Does not return.
pub fn power_off() -> ! {
    log::info!("powering off");
    crate::arch::x86_64::interrupts::disable();

    // QEMU (and Bochs) ACPI shutdown ports.
    Pio::<u16>::new(0x604).write(0x2000);
    Pio::<u16>::new(0xB004).write(0x2000);
    // VirtualBox.
    Pio::<u16>::new(0x4004).write(0x3400);

    loop {
        x86_64::instructions::hlt();
    }
}
