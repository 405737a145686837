/*
 * Console Output
 *
 * User-visible output channel. `putbuf` is the primitive the syscall
 * layer uses for writes to fd 1; the process exit lines come through
 * here as well. Output is serialized by the COM1 port lock, so
 * concurrent writers cannot interleave inside a single `putbuf` call.
 */

use core::fmt;

use crate::arch::x86_64::interrupts;
use crate::arch::x86_64::serial;

/// Write a buffer of bytes to the console in one piece.
pub fn putbuf(buf: &[u8]) {
    // Interrupts off so a preempting thread cannot deadlock on the
    // port lock we hold.
    interrupts::without_interrupts(|| {
        let mut port = serial::COM1.lock();
        for &b in buf {
            port.write(b);
        }
    });
}

struct ConsoleWriter;

impl fmt::Write for ConsoleWriter {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        putbuf(s.as_bytes());
        Ok(())
    }
}

/// Formatted console output; used by the print!/println! macros.
pub fn write_fmt(args: fmt::Arguments) {
    use fmt::Write;
    let _ = ConsoleWriter.write_fmt(args);
}
