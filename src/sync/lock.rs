/*
 * Lock with Priority Donation
 *
 * A lock is a semaphore initialized to one, plus a holder. What earns
 * it a module of its own is donation: when a thread blocks on a lock,
 * it raises the holder's effective priority to its own, and if that
 * holder is itself blocked on another lock, the raise continues up the
 * chain. Releases recompute the former holder's priority from its base
 * and from the waiters still queued on its remaining locks.
 *
 * The chain walk is bounded; a walk that returns to the donor means the
 * lock graph has a cycle, which is a deadlock and a kernel bug.
 *
 * Under MLFQS donation is disabled entirely and a lock degenerates to
 * its semaphore.
 */

use alloc::sync::Arc;
use core::sync::atomic::{AtomicI32, Ordering};

use crate::arch::x86_64::interrupts::DisableInterrupts;
use crate::scheduler::{self, ThreadId, recompute_effective_priority};
use crate::sync::semaphore::Semaphore;

/// Maximum donation chain depth.
const DONATION_DEPTH_MAX: usize = 8;

/// Sentinel for "no holder" in the packed holder field.
const NO_HOLDER: i32 = -1;

/// Shared lock state. Threads keep `Arc`s to the locks they hold and
/// the lock they wait on, which is exactly the graph the donation walk
/// traverses.
pub struct LockInner {
    sema: Semaphore,
    holder: AtomicI32,
}

impl LockInner {
    pub(crate) fn holder(&self) -> Option<ThreadId> {
        match self.holder.load(Ordering::SeqCst) {
            NO_HOLDER => None,
            tid => Some(ThreadId(tid)),
        }
    }

    pub(crate) fn waiter_ids(&self) -> alloc::vec::Vec<ThreadId> {
        self.sema.waiter_ids()
    }
}

pub struct Lock {
    inner: Arc<LockInner>,
}

impl Lock {
    pub fn new() -> Lock {
        Lock {
            inner: Arc::new(LockInner {
                sema: Semaphore::new(1),
                holder: AtomicI32::new(NO_HOLDER),
            }),
        }
    }

    /// Whether the running thread holds this lock.
    pub fn held_by_current_thread(&self) -> bool {
        self.inner.holder() == Some(scheduler::current_tid())
    }

    /// Acquire the lock, donating priority to the holder chain while
    /// blocked. Not recursive.
    pub fn acquire(&self) {
        assert!(!self.held_by_current_thread(), "recursive lock acquisition");

        let donor = scheduler::current_tid();
        let _guard = DisableInterrupts::new();

        scheduler::with_scheduler(|s| {
            if s.policy.donation() && self.inner.holder().is_some() {
                // Record what we are about to block on, then walk the
                // holder chain raising effective priorities.
                let donor_priority = s.table.get(donor).map(|t| t.priority).unwrap_or(PRI_FLOOR);
                if let Some(t) = s.table.get_mut(donor) {
                    t.waiting_on = Some(Arc::clone(&self.inner));
                }
                donate_chain(&mut s.table, &self.inner, donor, donor_priority);
            }
        });

        self.inner.sema.down();

        scheduler::with_scheduler(|s| {
            if let Some(t) = s.table.get_mut(donor) {
                t.waiting_on = None;
                t.held_locks.push(Arc::clone(&self.inner));
            }
            self.inner.holder.store(donor.0, Ordering::SeqCst);
        });
    }

    /// Try to acquire without blocking (and without donation).
    pub fn try_acquire(&self) -> bool {
        assert!(!self.held_by_current_thread(), "recursive lock acquisition");
        let _guard = DisableInterrupts::new();
        if !self.inner.sema.try_down() {
            return false;
        }
        let tid = scheduler::current_tid();
        scheduler::with_scheduler(|s| {
            if let Some(t) = s.table.get_mut(tid) {
                t.held_locks.push(Arc::clone(&self.inner));
            }
            self.inner.holder.store(tid.0, Ordering::SeqCst);
        });
        true
    }

    /// Release the lock, shedding any donation it carried, and wake the
    /// highest-priority waiter. The release yields when the awakened
    /// waiter outranks the releasing thread.
    pub fn release(&self) {
        assert!(self.held_by_current_thread(), "release of a lock not held");

        let tid = scheduler::current_tid();
        {
            let _guard = DisableInterrupts::new();
            self.inner.holder.store(NO_HOLDER, Ordering::SeqCst);
            scheduler::with_scheduler(|s| {
                if let Some(t) = s.table.get_mut(tid) {
                    t.held_locks.retain(|l| !Arc::ptr_eq(l, &self.inner));
                }
                // Drop back to base priority plus whatever the
                // remaining held locks still donate.
                recompute_effective_priority(&mut s.table, tid);
            });
        }

        self.inner.sema.up();
    }
}

impl Default for Lock {
    fn default() -> Self {
        Lock::new()
    }
}

const PRI_FLOOR: i32 = scheduler::PRI_MIN;

/// Walk holder -> blocked-on-lock -> holder, raising each holder's
/// effective priority to at least `donor_priority`.
///
/// Depth is bounded; revisiting the donor means the wait graph has a
/// cycle, which can only be a deadlock bug.
fn donate_chain(
    table: &mut scheduler::ThreadTable,
    start: &Arc<LockInner>,
    donor: ThreadId,
    donor_priority: i32,
) {
    let mut lock = Arc::clone(start);
    for _ in 0..DONATION_DEPTH_MAX {
        let Some(holder) = lock.holder() else { return };
        assert!(holder != donor, "deadlock: donation chain returned to donor");

        let next = match table.get_mut(holder) {
            Some(t) => {
                if t.priority < donor_priority {
                    t.priority = donor_priority;
                }
                t.waiting_on.as_ref().map(Arc::clone)
            }
            None => None,
        };

        match next {
            Some(next_lock) => lock = next_lock,
            None => return,
        }
    }
}
