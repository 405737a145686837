/*
 * Programmable Interrupt Controller and Timer
 *
 * Remaps the legacy 8259 PIC pair away from the CPU exception range
 * (IRQ 0-15 -> vectors 32-47) and programs the PIT to drive the
 * scheduler's tick at TIMER_FREQ.
 */

use pic8259::ChainedPics;
use spin::Mutex;
use x86_64::instructions::port::Port;

/// First vector of the remapped master PIC (IRQ 0 = vector 32).
pub const PIC_1_OFFSET: u8 = 32;
/// First vector of the remapped slave PIC.
pub const PIC_2_OFFSET: u8 = PIC_1_OFFSET + 8;

/// Vector of the timer interrupt (IRQ 0).
pub const TIMER_VECTOR: u8 = PIC_1_OFFSET;
/// Vector of the keyboard interrupt (IRQ 1).
pub const KEYBOARD_VECTOR: u8 = PIC_1_OFFSET + 1;

static PICS: Mutex<ChainedPics> = Mutex::new(unsafe { ChainedPics::new(PIC_1_OFFSET, PIC_2_OFFSET) });

/// Remap and unmask the PICs.
///
/// Only IRQ 0 (timer) and IRQ 1 (keyboard) are unmasked; everything
/// else stays off.
pub fn init() {
    unsafe {
        let mut pics = PICS.lock();
        pics.initialize();
        // Bit set = masked. 0xFC leaves IRQ0 and IRQ1 enabled.
        pics.write_masks(0xFC, 0xFF);
    }
    log::info!("PIC remapped: IRQ0..15 -> vectors {}..{}", PIC_1_OFFSET, PIC_2_OFFSET + 7);
}

/// Signal end-of-interrupt for the given IRQ line.
pub fn end_of_interrupt(irq: u8) {
    unsafe {
        PICS.lock().notify_end_of_interrupt(PIC_1_OFFSET + irq);
    }
}

/// Program PIT channel 0 for periodic interrupts at `frequency_hz`.
pub fn init_pit(frequency_hz: u32) {
    let pit_frequency: u32 = 1_193_182; // Hz - PIT base frequency
    let divisor: u16 = (pit_frequency / frequency_hz) as u16;

    unsafe {
        let mut command = Port::<u8>::new(0x43);
        let mut channel0 = Port::<u8>::new(0x40);

        // Channel 0, access mode lo/hi, mode 3 (square wave), binary
        command.write(0x36);

        // Write divisor in two parts: low byte first, then high byte
        channel0.write((divisor & 0xFF) as u8);
        channel0.write((divisor >> 8) as u8);
    }

    log::info!("PIT configured for {}Hz timer interrupts (divisor {})", frequency_hz, divisor);
}
