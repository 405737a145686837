/*
 * Kernel Self-Test Suite
 *
 * In-kernel tests exercising the scheduler, synchronization, alarm,
 * MLFQS arithmetic, and the syscall layer end to end. The runner
 * executes every suite applicable to the active scheduling policy,
 * prints a pass/fail summary to the console, and powers the machine
 * off - the suite is the workload when the kernel boots with
 * `-o tests`.
 *
 * Suites that depend on caller-chosen priorities (priority scheduling,
 * donation, wake ordering) are skipped under MLFQS, where priorities
 * are computed; the alarm, arithmetic, and syscall suites run under
 * both policies.
 */

pub mod alarm;
pub mod mlfqs;
pub mod priority;
pub mod sync_tests;
pub mod syscall_tests;

use alloc::vec::Vec;
use spin::Mutex;

use crate::arch::x86_64::interrupts;
use crate::devices::shutdown;
use crate::{println, scheduler};

/// Pass/fail accounting across all suites.
pub struct TestResults {
    pub passed: usize,
    pub failed: usize,
}

impl TestResults {
    pub fn new() -> TestResults {
        TestResults {
            passed: 0,
            failed: 0,
        }
    }

    /// Record one named check.
    pub fn check(&mut self, ok: bool, name: &str) {
        if ok {
            self.passed += 1;
            println!("  [ ok ] {}", name);
        } else {
            self.failed += 1;
            println!("  [FAIL] {}", name);
        }
    }
}

/// Section banner.
pub fn section(title: &str) {
    println!();
    println!("--- {} ---", title);
}

/// Append to a shared event log without risking preemption while the
/// log lock is held (spin locks do not donate priority).
pub fn record<T>(log: &Mutex<Vec<T>>, value: T) {
    interrupts::without_interrupts(|| log.lock().push(value));
}

/// Snapshot and clear a shared event log.
pub fn drain<T>(log: &Mutex<Vec<T>>) -> Vec<T> {
    interrupts::without_interrupts(|| core::mem::take(&mut *log.lock()))
}

/// Run every applicable suite, report, and power off.
pub fn run_all() -> ! {
    println!();
    println!("=== kernel self-test suite (policy: {}) ===", if scheduler::mlfqs_enabled() { "mlfqs" } else { "priority" });

    let mut results = TestResults::new();

    alarm::run(&mut results);

    if scheduler::mlfqs_enabled() {
        println!();
        println!("--- priority/donation/wake-order suites skipped under mlfqs ---");
    } else {
        priority::run(&mut results);
        sync_tests::run(&mut results);
    }

    mlfqs::run(&mut results);
    syscall_tests::run(&mut results);

    println!();
    for stat in scheduler::stats() {
        println!(
            "  thread {}: {} ({:?}, priority {})",
            stat.id.0, stat.name, stat.state, stat.priority
        );
    }
    println!(
        "=== self-test complete: {} passed, {} failed ===",
        results.passed, results.failed
    );

    shutdown::power_off();
}
