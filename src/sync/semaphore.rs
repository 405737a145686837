/*
 * Counting Semaphore
 *
 * A nonnegative value plus a wait queue. `down` blocks while the value
 * is zero; `up` increments it and wakes the waiter whose thread has the
 * highest effective priority *at wake time* - priorities may have been
 * donated or recomputed since the waiter queued, so selection happens
 * at pop, never at insert.
 *
 * Wakeup order among equal priorities is FIFO (earliest waiter wins).
 */

use alloc::vec::Vec;
use spin::Mutex;

use crate::arch::x86_64::interrupts::{self, DisableInterrupts};
use crate::scheduler::{self, ThreadId};

struct SemaInner {
    value: u32,
    /// Waiting threads in arrival order.
    waiters: Vec<ThreadId>,
}

pub struct Semaphore {
    inner: Mutex<SemaInner>,
}

impl Semaphore {
    /// Create a semaphore with the given initial value.
    pub const fn new(value: u32) -> Semaphore {
        Semaphore {
            inner: Mutex::new(SemaInner {
                value,
                waiters: Vec::new(),
            }),
        }
    }

    /// Decrement the value, blocking until it is positive.
    ///
    /// May only be called from thread context. The check-enqueue-block
    /// sequence runs with interrupts disabled so a wakeup between the
    /// check and the block cannot be lost.
    pub fn down(&self) {
        debug_assert!(!interrupts::in_interrupt_context(), "sema down from interrupt context");
        let _guard = DisableInterrupts::new();
        loop {
            let mut inner = self.inner.lock();
            if inner.value > 0 {
                inner.value -= 1;
                return;
            }
            inner.waiters.push(scheduler::current_tid());
            drop(inner);
            scheduler::block_current_and_schedule();
            // Re-check: another thread may have taken the value between
            // our wakeup and our next run.
        }
    }

    /// Try to decrement without blocking. Returns true on success.
    pub fn try_down(&self) -> bool {
        let _guard = DisableInterrupts::new();
        let mut inner = self.inner.lock();
        if inner.value > 0 {
            inner.value -= 1;
            true
        } else {
            false
        }
    }

    /// Increment the value and wake the best waiter, if any.
    ///
    /// Safe from interrupt context; preemption is deferred to the
    /// handler's return there. From thread context, yields immediately
    /// when the awakened thread outranks the caller.
    pub fn up(&self) {
        let woken = {
            let _guard = DisableInterrupts::new();
            let mut inner = self.inner.lock();
            inner.value += 1;
            let best = Self::take_best_waiter(&mut inner.waiters);
            drop(inner);
            if let Some(tid) = best {
                scheduler::unblock(tid);
            }
            best
        };

        let Some(woken) = woken else { return };

        if interrupts::in_interrupt_context() {
            interrupts::yield_on_return();
        } else {
            let outranked = scheduler::with_thread_mut(woken, |t| t.priority)
                .is_some_and(|p| p > scheduler::get_priority());
            if outranked {
                scheduler::yield_now();
            }
        }
    }

    /// Remove and return the highest-priority waiter, FIFO among
    /// equals. Priorities are read here, at pop time.
    fn take_best_waiter(waiters: &mut Vec<ThreadId>) -> Option<ThreadId> {
        let mut best: Option<(usize, i32)> = None;
        for (i, &tid) in waiters.iter().enumerate() {
            let p = scheduler::with_thread_mut(tid, |t| t.priority).unwrap_or(i32::MIN);
            if best.map_or(true, |(_, bp)| p > bp) {
                best = Some((i, p));
            }
        }
        best.map(|(i, _)| waiters.remove(i))
    }

    /// Snapshot of the waiting threads, for donation recomputation.
    pub(crate) fn waiter_ids(&self) -> Vec<ThreadId> {
        let _guard = DisableInterrupts::new();
        self.inner.lock().waiters.clone()
    }
}
