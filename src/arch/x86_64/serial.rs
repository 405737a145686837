/*
 * 16550 UART Serial Driver
 *
 * Two serial channels are used by the kernel:
 * - COM1 carries user-visible console output (the syscall layer's
 *   `putbuf` writes here)
 * - COM2 carries structured log output from the kernel logger
 *
 * Both are classic 16550-compatible UARTs programmed through port I/O.
 */

use bitflags::bitflags;
use core::convert::TryInto;
use spin::Mutex;

use super::pio::{Io, Pio, ReadOnly};

/// COM1 base port (console channel)
const COM1_BASE: u16 = 0x3F8;

/// COM2 base port (log channel)
const COM2_BASE: u16 = 0x2F8;

bitflags! {
    /// Line status flags
    struct LineStsFlags: u8 {
        const INPUT_FULL = 1;
        // 1 to 4 unknown
        const OUTPUT_EMPTY = 1 << 5;
        // 6 and 7 unknown
    }
}

/// Serial port representation.
pub struct SerialPort<T: Io> {
    data: T,               // Data register, read to receive, write to send
    int_en: T,             // Interrupt enable
    fifo_ctrl: T,          // FIFO control
    line_ctrl: T,          // Line control
    modem_ctrl: T,         // Modem control
    line_sts: ReadOnly<T>, // Line status
}

impl SerialPort<Pio<u8>> {
    /// Creates a new serial port instance at the given base port.
    pub const fn new(base: u16) -> SerialPort<Pio<u8>> {
        SerialPort {
            data: Pio::new(base),
            int_en: Pio::new(base + 1),
            fifo_ctrl: Pio::new(base + 2),
            line_ctrl: Pio::new(base + 3),
            modem_ctrl: Pio::new(base + 4),
            line_sts: ReadOnly::new(Pio::new(base + 5)),
        }
    }
}

impl<T: Io> SerialPort<T>
where
    T::Value: From<u8> + TryInto<u8>,
{
    /// Initializes the serial port (115200 baud, 8N1, FIFOs on).
    pub fn init(&mut self) {
        self.int_en.write(0x00.into());
        self.line_ctrl.write(0x80.into());
        self.data.write(0x01.into());
        self.int_en.write(0x00.into());
        self.line_ctrl.write(0x03.into());
        self.fifo_ctrl.write(0xC7.into());
        self.modem_ctrl.write(0x0B.into());
        self.int_en.write(0x01.into());
    }

    fn line_sts(&self) -> LineStsFlags {
        LineStsFlags::from_bits_truncate(
            (self.line_sts.read() & 0xFF.into())
                .try_into()
                .unwrap_or(0),
        )
    }

    /// Sends a raw byte, waiting for the transmit FIFO to drain.
    pub fn send(&mut self, data: u8) {
        while !self.line_sts().contains(LineStsFlags::OUTPUT_EMPTY) {}
        self.data.write(data.into())
    }

    /// Writes a byte, translating `\n` into CRLF for terminals.
    pub fn write(&mut self, b: u8) {
        match b {
            b'\n' => {
                self.send(b'\r');
                self.send(b'\n');
            }
            _ => {
                self.send(b);
            }
        }
    }
}

/// Console channel (user-visible output).
pub static COM1: Mutex<SerialPort<Pio<u8>>> = Mutex::new(SerialPort::new(COM1_BASE));

/// Log channel (kernel diagnostics).
pub static COM2: Mutex<SerialPort<Pio<u8>>> = Mutex::new(SerialPort::new(COM2_BASE));

/// Initialize both serial channels. Must run before the first log line.
pub fn init() {
    COM1.lock().init();
    COM2.lock().init();
}
