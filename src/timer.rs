/*
 * System Timer
 *
 * The PIT fires TIMER_FREQ times per second; every interrupt advances
 * the global tick counter through `on_tick` (called from the
 * scheduler's preemption path, which owns the IRQ 0 vector).
 *
 * `sleep` is the alarm facility: the calling thread records an
 * absolute wakeup tick, enters the sorted sleep queue, and blocks; the
 * tick handler wakes due threads in ascending wakeup order. No busy
 * waiting once the scheduler is running.
 */

use core::sync::atomic::{AtomicI64, Ordering};

/// Timer interrupts per second.
pub const TIMER_FREQ: i64 = 100;

static TICKS: AtomicI64 = AtomicI64::new(0);

/// Ticks since boot.
pub fn ticks() -> i64 {
    TICKS.load(Ordering::SeqCst)
}

/// Advance the clock. Called exactly once per timer interrupt.
pub(crate) fn on_tick() {
    TICKS.fetch_add(1, Ordering::SeqCst);
}

/// Convert ticks to (whole) milliseconds.
pub fn ticks_to_ms(t: i64) -> i64 {
    t * 1000 / TIMER_FREQ
}

/// Block the current thread for approximately `duration` ticks.
///
/// Returns immediately for a nonpositive duration. Before the
/// scheduler is enabled this degrades to a halt-wait loop.
///
/// # Arguments
/// * `duration` - Relative sleep time in timer ticks; the actual
///   sleep may be slightly longer due to timer resolution and
///   scheduling latency, never shorter
pub fn sleep(duration: i64) {
    if duration <= 0 {
        return;
    }
    let wake = ticks() + duration;

    if !crate::scheduler::is_enabled() {
        while ticks() < wake {
            x86_64::instructions::hlt();
        }
        return;
    }

    crate::scheduler::sleep_until(wake);
}
