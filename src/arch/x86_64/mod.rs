/*
 * x86_64 Architecture Support
 *
 * All architecture-specific code lives here: descriptor tables,
 * interrupt plumbing, the legacy PIC/PIT pair, port I/O, and the serial
 * UARTs. Everything above this module is architecture-neutral kernel
 * logic.
 *
 * Submodules:
 * - gdt: Global Descriptor Table and TSS
 * - idt: Interrupt Descriptor Table and exception handlers
 * - interrupts: interrupt gating helpers and context tracking
 * - pic: 8259 PIC remap and PIT timer programming
 * - pio: port I/O primitives
 * - serial: 16550 UART console/log channels
 */

pub mod gdt;
pub mod idt;
pub mod interrupts;
pub mod pic;
pub mod pio;
pub mod serial;
