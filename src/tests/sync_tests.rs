/*
 * Synchronization Wake-Order Tests
 *
 * Wait queues must release the highest effective priority first, with
 * the priority read at wake time. Five semaphore waiters at staggered
 * priorities must unblock strictly highest-first; condition variables
 * must signal their best waiter the same way.
 */

use alloc::vec::Vec;
use lazy_static::lazy_static;
use spin::Mutex;

use super::{TestResults, drain, record, section};
use crate::scheduler;
use crate::sync::{Condvar, Lock, Semaphore};
use crate::timer;

static GATE: Semaphore = Semaphore::new(0);
static SEMA_ORDER: Mutex<Vec<i32>> = Mutex::new(Vec::new());

fn sema_waiter(aux: usize) {
    GATE.down();
    record(&SEMA_ORDER, aux as i32);
}

lazy_static! {
    static ref MONITOR: Lock = Lock::new();
}
static CONDITION: Condvar = Condvar::new();
static COND_ORDER: Mutex<Vec<i32>> = Mutex::new(Vec::new());

fn cond_waiter(aux: usize) {
    MONITOR.acquire();
    CONDITION.wait(&MONITOR);
    record(&COND_ORDER, aux as i32);
    MONITOR.release();
}

pub fn run(results: &mut TestResults) {
    section("semaphore wake order");

    drain(&SEMA_ORDER);
    for priority in [10, 20, 30, 40, 50] {
        scheduler::spawn("sema-waiter", priority, sema_waiter, priority as usize)
            .expect("spawn sema waiter");
    }
    // Waiters above our priority blocked immediately; give the rest a
    // tick to reach the semaphore.
    timer::sleep(5);

    for _ in 0..5 {
        GATE.up();
    }
    // Let the waiters below our priority drain.
    timer::sleep(5);

    let order = drain(&SEMA_ORDER);
    results.check(
        order == [50, 40, 30, 20, 10],
        "semaphore wakes strictly highest-priority first",
    );

    section("condition variable signal order");

    drain(&COND_ORDER);
    for priority in [20, 25, 30] {
        scheduler::spawn("cond-waiter", priority, cond_waiter, priority as usize)
            .expect("spawn cond waiter");
    }
    timer::sleep(5);

    for _ in 0..3 {
        MONITOR.acquire();
        CONDITION.signal(&MONITOR);
        MONITOR.release();
        timer::sleep(2);
    }

    let order = drain(&COND_ORDER);
    results.check(
        order == [30, 25, 20],
        "condition variable signals its best waiter first",
    );

    // try_acquire takes a free lock and refuses a held one.
    let lock = Lock::new();
    results.check(lock.try_acquire(), "try_acquire wins a free lock");
    results.check(lock.held_by_current_thread(), "holder is recorded");
    lock.release();
    results.check(!lock.held_by_current_thread(), "release clears the holder");
}
