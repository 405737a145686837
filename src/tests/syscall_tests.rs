/*
 * Syscall and Process Tests
 *
 * These go through the real gate: the usys shim lays argument slots on
 * the stack and raises INT 0x30, so the dispatcher's stack reads and
 * pointer probes are on the path for every check, not just the handler
 * bodies.
 *
 * The process tests install small program bodies in the loader and
 * drive them with EXEC/WAIT, including the two involuntary-termination
 * paths: a buffer pointing at unmapped memory and an unknown syscall
 * number. Both must kill only the offending process, with the parent
 * collecting -1.
 */

use super::{TestResults, section};
use crate::timer;
use crate::userprog::{loader, usys};

/// Program: exits through the syscall layer with a fixed status.
fn prog_exit_42(_args: &str) -> i32 {
    42
}

/// Program: exits via an explicit EXIT call.
fn prog_exit_explicit(_args: &str) -> i32 {
    usys::exit(7);
}

/// Program: reports the length of its argument string.
fn prog_arg_len(args: &str) -> i32 {
    args.len() as i32
}

/// Program: writes through a pointer at the user/kernel boundary. The
/// write must never return; the process dies with -1.
fn prog_bad_pointer(_args: &str) -> i32 {
    usys::write(1, 0xC000_0000, 10);
    1 // not reached
}

/// Program: raises a syscall number nobody implements.
fn prog_bad_syscall(_args: &str) -> i32 {
    usys::raw(999);
    1 // not reached
}

/// Program: stays alive long enough for the parent to poke at its
/// executable.
fn prog_linger(_args: &str) -> i32 {
    timer::sleep(20);
    0
}

pub fn run(results: &mut TestResults) {
    section("file syscalls");

    results.check(usys::create("scratch.txt", 16), "create a fresh file");
    results.check(!usys::create("scratch.txt", 16), "create refuses a duplicate");

    let fd = usys::open("scratch.txt");
    results.check(fd >= 3, "open hands out descriptors from 3 up");

    // User buffers must live on this thread's stack: the probes reject
    // kernel-image addresses, and string literals are linked up there.
    let hello = *b"hello";
    results.check(usys::write_bytes(fd, &hello) == 5, "write into an open file");
    results.check(usys::tell(fd) == 5, "tell reflects the write");
    usys::seek(fd, 0);
    results.check(usys::tell(fd) == 0, "seek rewinds");

    let mut buf = [0u8; 5];
    let got = usys::read_bytes(fd, &mut buf);
    results.check(got == 5 && &buf == b"hello", "read returns what was written");
    results.check(usys::filesize(fd) == 16, "filesize is the creation size");

    let fd2 = usys::open("scratch.txt");
    results.check(fd2 == fd + 1, "descriptor ids are max-plus-one");
    usys::close(fd2);
    let fd3 = usys::open("scratch.txt");
    results.check(fd3 == fd2, "ids do not regress after a close");
    usys::close(fd3);

    usys::close(fd);
    results.check(usys::filesize(fd) == -1, "closed descriptors are invalid");
    usys::close(fd); // double close is silently ignored

    results.check(usys::filesize(9999) == -1, "unknown descriptor reports -1");
    results.check(usys::tell(0) == -1, "console fds have no file position");

    let mut one = [0u8; 1];
    results.check(usys::read_bytes(1, &mut one) == -1, "read from stdout fails");
    let x = *b"x";
    results.check(usys::write_bytes(0, &x) == -1, "write to stdin fails");
    let line = *b"console syscall ok\n";
    results.check(usys::write_bytes(1, &line) == 19, "console write reports its size");

    results.check(usys::remove("scratch.txt"), "remove an existing file");
    results.check(!usys::remove("scratch.txt"), "remove fails the second time");
    results.check(usys::open("scratch.txt") == -1, "open after remove fails");

    section("process lifecycle");

    loader::install("exit-42", prog_exit_42);
    loader::install("exit-explicit", prog_exit_explicit);
    loader::install("arg-len", prog_arg_len);
    loader::install("bad-pointer", prog_bad_pointer);
    loader::install("bad-syscall", prog_bad_syscall);
    loader::install("linger", prog_linger);

    let pid = usys::exec("exit-42");
    results.check(pid > 0, "exec returns the child pid");
    results.check(usys::wait(pid) == 42, "wait collects the exit status");
    results.check(usys::wait(pid) == -1, "second wait on the same child fails");
    results.check(usys::wait(31337) == -1, "wait on a non-child fails");

    let pid = usys::exec("exit-explicit");
    results.check(usys::wait(pid) == 7, "explicit EXIT status reaches the parent");

    let pid = usys::exec("arg-len four");
    results.check(usys::wait(pid) == 4, "command-line tail reaches the program");

    results.check(usys::exec("no-such-program") == -1, "exec of an unknown program fails");

    section("fault isolation");

    let pid = usys::exec("bad-pointer");
    results.check(pid > 0, "faulting child still loads");
    results.check(usys::wait(pid) == -1, "bad buffer pointer kills only the child");

    let pid = usys::exec("bad-syscall");
    results.check(usys::wait(pid) == -1, "unknown syscall number kills only the child");

    // The kernel (and this thread) survived both.
    results.check(usys::create("after-faults", 8), "kernel keeps serving after faults");
    usys::remove("after-faults");

    section("executable protection");

    let pid = usys::exec("linger");
    results.check(pid > 0, "linger child started");
    let exe = usys::open("linger");
    results.check(exe >= 3, "executable can still be opened");
    let byte = *b"x";
    results.check(usys::write_bytes(exe, &byte) == 0, "writes to a running executable are denied");
    results.check(usys::wait(pid) == 0, "linger child exits cleanly");
    usys::seek(exe, 0);
    results.check(usys::write_bytes(exe, &byte) == 1, "writes allowed again after exit");
    usys::close(exe);
}
