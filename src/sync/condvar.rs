/*
 * Condition Variables
 *
 * Each waiter gets its own zero-initialized semaphore; waiting pushes
 * that semaphore on the condition's list, releases the monitor lock,
 * and sleeps on the private semaphore. Signaling pops the waiter whose
 * thread currently has the highest effective priority - evaluated at
 * signal time, like every other wait queue in the kernel.
 *
 * These are Mesa-style conditions: a woken thread reacquires the lock
 * and must re-check its predicate.
 */

use alloc::sync::Arc;
use alloc::vec::Vec;
use spin::Mutex;

use crate::arch::x86_64::interrupts::DisableInterrupts;
use crate::scheduler::{self, ThreadId};
use crate::sync::lock::Lock;
use crate::sync::semaphore::Semaphore;

struct Waiter {
    tid: ThreadId,
    sema: Semaphore,
}

pub struct Condvar {
    waiters: Mutex<Vec<Arc<Waiter>>>,
}

impl Condvar {
    pub const fn new() -> Condvar {
        Condvar {
            waiters: Mutex::new(Vec::new()),
        }
    }

    /// Atomically release `lock` and wait for a signal, then reacquire
    /// the lock before returning.
    ///
    /// The caller must hold `lock`.
    pub fn wait(&self, lock: &Lock) {
        assert!(lock.held_by_current_thread(), "cond wait without holding the lock");

        let waiter = Arc::new(Waiter {
            tid: scheduler::current_tid(),
            sema: Semaphore::new(0),
        });

        {
            let _guard = DisableInterrupts::new();
            self.waiters.lock().push(Arc::clone(&waiter));
        }

        lock.release();
        waiter.sema.down();
        lock.acquire();
    }

    /// Wake the waiter whose thread has the highest effective priority.
    /// No-op when nobody waits. The caller must hold `lock`.
    pub fn signal(&self, lock: &Lock) {
        assert!(lock.held_by_current_thread(), "cond signal without holding the lock");

        let best = {
            let _guard = DisableInterrupts::new();
            let mut waiters = self.waiters.lock();
            let mut best: Option<(usize, i32)> = None;
            for (i, w) in waiters.iter().enumerate() {
                let p = scheduler::with_thread_mut(w.tid, |t| t.priority).unwrap_or(i32::MIN);
                if best.map_or(true, |(_, bp)| p > bp) {
                    best = Some((i, p));
                }
            }
            best.map(|(i, _)| waiters.remove(i))
        };

        if let Some(waiter) = best {
            waiter.sema.up();
        }
    }

    /// Wake every waiter. The caller must hold `lock`.
    pub fn broadcast(&self, lock: &Lock) {
        loop {
            let empty = {
                let _guard = DisableInterrupts::new();
                self.waiters.lock().is_empty()
            };
            if empty {
                break;
            }
            self.signal(lock);
        }
    }
}

impl Default for Condvar {
    fn default() -> Self {
        Condvar::new()
    }
}
