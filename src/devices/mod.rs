/*
 * Device Layer
 *
 * Thin drivers the kernel core calls through narrow interfaces:
 * - console: `putbuf` and formatted output to the COM1 channel
 * - keyboard: PS/2 scancode decoding and the blocking `input_getc`
 * - shutdown: machine power-off
 */

pub mod console;
pub mod keyboard;
pub mod shutdown;
