/*
 * Kernel Logging
 *
 * Backend for the `log` crate facade. Records go to the COM2 serial
 * channel so kernel diagnostics stay separate from user-visible console
 * output on COM1.
 */

use log::{Level, LevelFilter, Metadata, Record};

use crate::arch::x86_64::serial;

struct KernelLogger;

impl log::Log for KernelLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= Level::Info
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            use core::fmt::Write;
            let mut port = serial::COM2.lock();
            let _ = write!(LogWriter(&mut *port), "[{}] {}\n", record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

struct LogWriter<'a>(&'a mut serial::SerialPort<crate::arch::x86_64::pio::Pio<u8>>);

impl core::fmt::Write for LogWriter<'_> {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        for b in s.bytes() {
            self.0.write(b);
        }
        Ok(())
    }
}

static LOGGER: KernelLogger = KernelLogger;

/// Install the logger. Serial channels must already be initialized.
pub fn init() {
    match log::set_logger(&LOGGER).map(|()| log::set_max_level(LevelFilter::Info)) {
        Ok(_) => log::info!("logger initialized"),
        Err(err) => panic!("error initializing logger: {}", err),
    }
}
