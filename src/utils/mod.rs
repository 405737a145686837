/*
 * Kernel Utilities
 *
 * - logger: log crate backend over the COM2 serial channel
 * - macros: print!/println! console macros (COM1)
 */

pub mod logger;
#[macro_use]
pub mod macros;
