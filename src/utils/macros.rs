/*
 * Console Print Macros
 *
 * print!/println! write formatted text to the user-visible console
 * channel (COM1) through `devices::console`. Kernel diagnostics should
 * use the `log` macros instead.
 */

/// Prints formatted text to the console.
#[macro_export]
macro_rules! print {
    ($($arg:tt)*) => ({
        $crate::devices::console::write_fmt(format_args!($($arg)*));
    });
}

/// Prints a formatted string followed by a newline to the console.
#[macro_export]
macro_rules! println {
    () => ($crate::print!("\n"));
    ($fmt:expr) => ($crate::print!(concat!($fmt, "\n")));
    ($fmt:expr, $($arg:tt)*) => ($crate::print!(concat!($fmt, "\n"), $($arg)*));
}
