/*
 * User Processes
 *
 * - process: the process control block, the parent/child exit
 *   rendezvous, and the execute/wait/exit lifecycle
 * - descriptor: per-process file-descriptor tables (ids >= 3)
 * - loader: resolves a command line to a program image
 * - usys: the user-side system-call shim (stack-ABI INT 0x30)
 */

pub mod descriptor;
pub mod loader;
pub mod process;
pub mod usys;
