/*
 * Priority Scheduling and Donation Tests
 *
 * Covers the scheduler's core promises under the priority policy:
 *
 * - creating a higher-priority thread preempts the creator before
 *   thread creation returns
 * - a priority drop through set_priority yields to better threads
 * - a two-lock donation chain raises every holder to the top donor's
 *   priority, and releases unwind it in the right order
 */

use alloc::vec::Vec;
use core::sync::atomic::{AtomicUsize, Ordering};
use lazy_static::lazy_static;
use spin::Mutex;

use super::{TestResults, drain, record, section};
use crate::scheduler::{self, PRI_DEFAULT};
use crate::sync::Lock;

static COUNTER: AtomicUsize = AtomicUsize::new(0);

fn bump_and_exit(_aux: usize) {
    COUNTER.fetch_add(1, Ordering::SeqCst);
}

/// Event log for the donation scenario.
static EVENTS: Mutex<Vec<&'static str>> = Mutex::new(Vec::new());

lazy_static! {
    static ref LOCK_A: Lock = Lock::new();
    static ref LOCK_B: Lock = Lock::new();
}

/// Medium thread: holds B, then blocks on A (held by the test's main
/// thread), forming the middle link of the donation chain.
fn medium(_aux: usize) {
    LOCK_B.acquire();
    LOCK_A.acquire();
    record(&EVENTS, "medium acquired A");
    LOCK_A.release();
    LOCK_B.release();
    record(&EVENTS, "medium finished");
}

/// High thread: blocks on B, donating through medium to the bottom of
/// the chain.
fn high(_aux: usize) {
    LOCK_B.acquire();
    record(&EVENTS, "high acquired B");
    LOCK_B.release();
    record(&EVENTS, "high finished");
}

pub fn run(results: &mut TestResults) {
    section("priority scheduling");

    // A freshly created higher-priority thread must run before
    // thread creation returns to the creator.
    COUNTER.store(0, Ordering::SeqCst);
    scheduler::spawn("preemptor", PRI_DEFAULT + 1, bump_and_exit, 0).expect("spawn preemptor");
    results.check(
        COUNTER.load(Ordering::SeqCst) >= 1,
        "higher-priority child ran before spawn returned",
    );

    // Round trip through set_priority with no donations in play.
    let before = scheduler::get_priority();
    scheduler::set_priority(PRI_DEFAULT - 2);
    results.check(
        scheduler::get_priority() == PRI_DEFAULT - 2,
        "set_priority round-trips without donation",
    );
    scheduler::set_priority(before);

    donation_chain(results);
}

/// The nested-donation scenario: this thread (priority 31) holds A,
/// "medium" (32) holds B and wants A, "high" (33) wants B. Both
/// donations must land on this thread while the chain is blocked.
fn donation_chain(results: &mut TestResults) {
    section("priority donation");

    drain(&EVENTS);
    let base = scheduler::get_priority();

    LOCK_A.acquire();

    scheduler::spawn("medium", base + 1, medium, 0).expect("spawn medium");
    // medium preempted us, took B, and is now blocked on A.
    results.check(
        scheduler::get_priority() == base + 1,
        "direct donation raises holder to waiter's priority",
    );

    scheduler::spawn("high", base + 2, high, 0).expect("spawn high");
    // high preempted us and blocked on B; its donation must flow
    // through medium down to us.
    results.check(
        scheduler::get_priority() == base + 2,
        "nested donation reaches the bottom of the chain",
    );

    LOCK_A.release();
    // Releasing A hands the CPU to medium (effective 33), which
    // releases B to high (33); high finishes, then medium, then us.
    results.check(
        scheduler::get_priority() == base,
        "donation drains once the lock is released",
    );

    let events = drain(&EVENTS);
    results.check(
        events
            == [
                "medium acquired A",
                "high acquired B",
                "high finished",
                "medium finished",
            ],
        "chain unwinds in priority order",
    );
}
