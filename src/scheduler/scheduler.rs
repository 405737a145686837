/*
 * Thread Table and Queues
 *
 * The scheduler's data: the all-threads roster, the ready queue, and
 * the sleep queue. Everything here is mutated only with interrupts
 * disabled, under the global scheduler lock.
 *
 * Queue representation: the ready queue is a plain Vec of thread ids in
 * arrival order. Selection scans for the strictly-highest effective
 * priority, taking the earliest-queued thread among equals, which gives
 * the required FIFO tie-break without keeping the queue sorted while
 * priorities change underneath it (donation and MLFQS recomputation
 * both do that). The sleep queue is kept sorted ascending by wakeup
 * tick so the tick handler only ever inspects its head.
 */

use alloc::boxed::Box;
use alloc::vec::Vec;

use super::policies::SchedPolicy;
use super::thread::{Thread, ThreadId, ThreadState};

pub struct ThreadTable {
    /// All live threads, including the current and idle threads.
    threads: Vec<Thread>,
    /// Runnable thread ids in arrival order. Never contains the idle
    /// thread or the current thread.
    ready: Vec<ThreadId>,
    /// (wakeup tick, thread) pairs, sorted ascending by tick.
    sleeping: Vec<(i64, ThreadId)>,
    /// The one Running thread.
    current: ThreadId,
    /// Fallback thread when the ready queue is empty.
    idle: Option<ThreadId>,
    next_tid: i32,
}

impl ThreadTable {
    pub fn new() -> ThreadTable {
        ThreadTable {
            threads: Vec::new(),
            ready: Vec::new(),
            sleeping: Vec::new(),
            current: ThreadId(0),
            idle: None,
            next_tid: 1,
        }
    }

    pub fn alloc_tid(&mut self) -> ThreadId {
        let tid = ThreadId(self.next_tid);
        self.next_tid += 1;
        tid
    }

    pub fn insert(&mut self, thread: Thread) {
        self.threads.push(thread);
    }

    pub fn get(&self, tid: ThreadId) -> Option<&Thread> {
        self.threads.iter().find(|t| t.id == tid)
    }

    pub fn get_mut(&mut self, tid: ThreadId) -> Option<&mut Thread> {
        self.threads.iter_mut().find(|t| t.id == tid)
    }

    pub fn current_tid(&self) -> ThreadId {
        self.current
    }

    pub fn set_current(&mut self, tid: ThreadId) {
        self.current = tid;
    }

    pub fn current_thread(&self) -> &Thread {
        self.get(self.current).expect("current thread missing from roster")
    }

    pub fn current_thread_mut(&mut self) -> &mut Thread {
        let tid = self.current;
        self.get_mut(tid).expect("current thread missing from roster")
    }

    pub fn idle_tid(&self) -> Option<ThreadId> {
        self.idle
    }

    pub fn set_idle(&mut self, tid: ThreadId) {
        self.idle = Some(tid);
    }

    pub fn threads(&self) -> impl Iterator<Item = &Thread> {
        self.threads.iter()
    }

    pub fn threads_mut(&mut self) -> impl Iterator<Item = &mut Thread> {
        self.threads.iter_mut()
    }

    /// Number of READY threads (idle excluded by construction).
    pub fn ready_count(&self) -> usize {
        self.ready.len()
    }

    /// Queue a Ready thread. FIFO order among equal priorities follows
    /// from always appending.
    pub fn push_ready(&mut self, tid: ThreadId) {
        debug_assert!(!self.ready.contains(&tid));
        self.ready.push(tid);
    }

    /// Highest effective priority among queued threads.
    pub fn max_ready_priority(&self) -> Option<i32> {
        self.ready
            .iter()
            .filter_map(|&tid| self.get(tid).map(|t| t.priority))
            .max()
    }

    /// Remove and return the highest-priority queued thread, earliest
    /// arrival among equals. Priorities are read at pop time, so any
    /// donation or recomputation since insertion is honored.
    pub fn take_best_ready(&mut self) -> Option<ThreadId> {
        let mut best: Option<(usize, i32)> = None;
        for (i, &tid) in self.ready.iter().enumerate() {
            let p = self.get(tid).map(|t| t.priority).unwrap_or(i32::MIN);
            if best.map_or(true, |(_, bp)| p > bp) {
                best = Some((i, p));
            }
        }
        best.map(|(i, _)| self.ready.remove(i))
    }

    /// Insert into the sleep queue, keeping it sorted ascending by
    /// wakeup tick (stable for equal ticks).
    pub fn push_sleeper(&mut self, wake_tick: i64, tid: ThreadId) {
        let pos = self
            .sleeping
            .iter()
            .position(|&(t, _)| t > wake_tick)
            .unwrap_or(self.sleeping.len());
        self.sleeping.insert(pos, (wake_tick, tid));
    }

    /// Pop every sleeper whose wakeup tick has arrived.
    pub fn take_due_sleepers(&mut self, now: i64) -> Vec<ThreadId> {
        let mut due = Vec::new();
        while let Some(&(tick, tid)) = self.sleeping.first() {
            if tick > now {
                break;
            }
            self.sleeping.remove(0);
            due.push(tid);
        }
        due
    }

    /// Remove every Dying thread except `keep` from the roster,
    /// dropping their stack pages.
    pub fn reap_dying(&mut self, keep: ThreadId) {
        self.threads
            .retain(|t| t.state != ThreadState::Dying || t.id == keep);
    }
}

/// The scheduler: thread table plus the active scheduling policy.
pub struct Scheduler {
    pub table: ThreadTable,
    pub policy: Box<dyn SchedPolicy>,
    /// Ticks the current thread has consumed of its time slice.
    pub slice_used: u32,
}

impl Scheduler {
    pub fn new(policy: Box<dyn SchedPolicy>) -> Scheduler {
        Scheduler {
            table: ThreadTable::new(),
            policy,
            slice_used: 0,
        }
    }
}

/// Recompute a thread's effective priority from its base priority and
/// the waiters on every lock it holds.
///
/// Called after a lock release, after a base-priority change, and by
/// the donation walk's fixups. Effective priority can drop here, but
/// never below base.
pub fn recompute_effective_priority(table: &mut ThreadTable, tid: ThreadId) {
    let (base, held) = match table.get(tid) {
        Some(t) => (t.base_priority, t.held_locks.clone()),
        None => return,
    };

    let mut effective = base;
    for lock in held {
        for waiter in lock.waiter_ids() {
            if let Some(w) = table.get(waiter) {
                effective = effective.max(w.priority);
            }
        }
    }

    if let Some(t) = table.get_mut(tid) {
        t.priority = effective;
    }
}
