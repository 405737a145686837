/*
 * Preemptive Priority Scheduler
 *
 * The kernel runs one thread at a time on one CPU. Scheduling is
 * preemptive: the timer interrupt charges the running thread for its
 * tick, wakes due sleepers, runs policy accounting, and switches
 * threads when the time slice is exhausted or a higher-priority thread
 * became runnable. Voluntary yields, blocking, and thread exit all
 * funnel through the same interrupt-based switch (INT 0x81), so there
 * is exactly one way a context ever changes.
 *
 * Locking discipline: the scheduler lock is only ever taken with
 * interrupts disabled, and no code yields while holding it. Blocking
 * primitives set up their wait-queue state under the lock, drop it,
 * and then raise the yield interrupt with interrupts still disabled;
 * the switched-in thread restores its own interrupt flag from its
 * saved context.
 *
 * Public surface: thread creation and lifetime (spawn, exit_thread),
 * state transitions (block/unblock, yield_now, sleep_until), priority
 * and MLFQS accessors, and the tick entry points wired to the naked
 * handlers in `context`.
 */

pub mod context;
pub mod fixed_point;
pub mod policies;
#[allow(clippy::module_inception)]
mod scheduler;
pub mod thread;

use alloc::string::String;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use spin::Mutex;

use crate::arch::x86_64::interrupts::{self, DisableInterrupts};
use self::context::InterruptContext;
pub use self::scheduler::{Scheduler, ThreadTable, recompute_effective_priority};
pub use self::thread::{StackPage, TID_ERROR, Thread, ThreadFunc, ThreadId, ThreadState, ThreadStats};

/// Lowest priority.
pub const PRI_MIN: i32 = 0;
/// Priority of threads that do not ask for anything else.
pub const PRI_DEFAULT: i32 = 31;
/// Highest priority.
pub const PRI_MAX: i32 = 63;

/// Scheduling quantum in timer ticks.
pub const TIME_SLICE: u32 = 4;

/// Global scheduler instance.
static SCHEDULER: Mutex<Option<Scheduler>> = Mutex::new(None);

/// Mirror of the running thread's id for lock-free reads.
static CURRENT_TID: AtomicI32 = AtomicI32::new(-1);

/// Set once `start()` has spawned the idle thread; until then the tick
/// handler only counts time.
static SCHEDULER_ENABLED: AtomicBool = AtomicBool::new(false);

/// True when the MLFQS policy is active.
static MLFQS: AtomicBool = AtomicBool::new(false);

/// Run a closure against the scheduler with interrupts disabled.
///
/// Must not yield or block inside the closure.
pub(crate) fn with_scheduler<R>(f: impl FnOnce(&mut Scheduler) -> R) -> R {
    let _guard = DisableInterrupts::new();
    let mut guard = SCHEDULER.lock();
    f(guard.as_mut().expect("scheduler not initialized"))
}

/// Raise the context-switch software interrupt.
///
/// Safe with interrupts disabled: a software INT ignores IF, and the
/// switched-in thread restores its own flags from its saved context.
fn trigger_switch() {
    unsafe { core::arch::asm!("int 0x81", options(nostack)) };
}

/// Initialize the scheduler and adopt the boot context as the "main"
/// thread at default priority.
pub fn init(mlfqs: bool) {
    MLFQS.store(mlfqs, Ordering::SeqCst);

    let mut sched = Scheduler::new(policies::make_policy(mlfqs));
    let tid = sched.table.alloc_tid();
    let mut main_thread = Thread::new(tid, "main", PRI_DEFAULT, None);
    main_thread.state = ThreadState::Running;
    sched.table.insert(main_thread);
    sched.table.set_current(tid);
    CURRENT_TID.store(tid.0, Ordering::SeqCst);

    let name = sched.policy.name();
    interrupts::without_interrupts(|| {
        *SCHEDULER.lock() = Some(sched);
    });

    log::info!("scheduler initialized (policy: {})", name);
}

/// Spawn the idle thread and enable preemptive scheduling.
pub fn start() {
    let idle_tid = spawn_raw("idle", PRI_MIN, idle_main, 0, true).expect("cannot allocate idle thread");
    with_scheduler(|s| s.table.set_idle(idle_tid));

    SCHEDULER_ENABLED.store(true, Ordering::SeqCst);
    log::info!("scheduler enabled; preemption active");
}

/// Whether the MLFQS policy is active.
pub fn mlfqs_enabled() -> bool {
    MLFQS.load(Ordering::SeqCst)
}

/// Whether preemptive scheduling has been enabled.
pub fn is_enabled() -> bool {
    SCHEDULER_ENABLED.load(Ordering::SeqCst)
}

/// Busy-wait loop run when nothing else is runnable. Interrupts stay
/// enabled so the timer can take the CPU back.
fn idle_main(_aux: usize) {
    loop {
        x86_64::instructions::hlt();
    }
}

/// First code every new thread executes, by way of its forged initial
/// context. Interrupts are already enabled via the initial RFLAGS.
extern "C" fn thread_entry_trampoline() -> ! {
    let (func, aux) = with_scheduler(|s| s.table.current_thread_mut().entry.take())
        .expect("thread started without an entry function");
    func(aux);
    exit_thread();
}

fn spawn_raw(
    name: &str,
    priority: i32,
    func: ThreadFunc,
    aux: usize,
    is_idle: bool,
) -> Result<ThreadId, &'static str> {
    assert!((PRI_MIN..=PRI_MAX).contains(&priority), "priority out of range");

    let stack = StackPage::alloc().ok_or("out of memory allocating thread stack")?;

    let tid = with_scheduler(|s| {
        let tid = s.table.alloc_tid();
        let mut thread = Thread::new(tid, name, priority, Some(stack));
        thread.is_idle = is_idle;

        // Forge a context that "resumes" at the entry trampoline with
        // interrupts enabled. RSP is offset as if a call had just
        // pushed a return address, preserving ABI stack alignment.
        thread.context.iret_frame.rip = thread_entry_trampoline as usize as u64;
        thread.context.iret_frame.rsp = thread.stack.as_ref().unwrap().top() - 8;
        thread.entry = Some((func, aux));

        // MLFQS ignores the requested priority and derives one from the
        // accounting state inherited from the creator.
        if MLFQS.load(Ordering::SeqCst) && !is_idle {
            let (nice, recent_cpu) = {
                let cur = s.table.current_thread();
                (cur.nice, cur.recent_cpu)
            };
            thread.nice = nice;
            thread.recent_cpu = recent_cpu;
            let p = policies::mlfqs::priority_for(recent_cpu, nice);
            thread.priority = p;
            thread.base_priority = p;
        }

        s.table.insert(thread);

        // Birth as BLOCKED, then the usual unblock transition makes it
        // READY. The idle thread never sits in the ready queue.
        if is_idle {
            s.table.get_mut(tid).unwrap().state = ThreadState::Ready;
        } else {
            unblock_locked(&mut s.table, tid);
        }
        tid
    });

    Ok(tid)
}

/// Create a thread running `func(aux)` and make it runnable.
///
/// If the new thread outranks the creator it runs before this function
/// returns, exactly as a preemptive scheduler should behave.
///
/// # Arguments
/// * `name` - Short human-readable name (truncated to 16 characters)
/// * `priority` - Base priority in [PRI_MIN, PRI_MAX]; ignored under
///   MLFQS, where the new thread's priority is computed
/// * `func` / `aux` - Entry function and its opaque argument
///
/// # Returns
/// The new thread's id, or an error when no stack page is available.
pub fn spawn(name: &str, priority: i32, func: ThreadFunc, aux: usize) -> Result<ThreadId, &'static str> {
    let tid = spawn_raw(name, priority, func, aux, false)?;
    maybe_yield_to_higher();
    Ok(tid)
}

/// Yield the CPU if some ready thread now outranks the current one.
fn maybe_yield_to_higher() {
    if !SCHEDULER_ENABLED.load(Ordering::SeqCst) || interrupts::in_interrupt_context() {
        return;
    }
    let should = with_scheduler(|s| {
        s.table
            .max_ready_priority()
            .is_some_and(|m| m > s.table.current_thread().priority)
    });
    if should {
        yield_now();
    }
}

/// Id of the running thread.
pub fn current_tid() -> ThreadId {
    ThreadId(CURRENT_TID.load(Ordering::SeqCst))
}

/// Short name of the running thread.
pub fn current_name() -> String {
    with_scheduler(|s| String::from(s.table.current_thread().name.as_str()))
}

/// Run a closure with mutable access to the running thread.
pub(crate) fn with_current_thread_mut<R>(f: impl FnOnce(&mut Thread) -> R) -> R {
    with_scheduler(|s| f(s.table.current_thread_mut()))
}

/// Run a closure with mutable access to an arbitrary thread.
pub(crate) fn with_thread_mut<R>(tid: ThreadId, f: impl FnOnce(&mut Thread) -> R) -> Option<R> {
    with_scheduler(|s| s.table.get_mut(tid).map(f))
}

/// Voluntarily give up the CPU. The current thread goes to the back of
/// its priority class and the scheduler picks again.
pub fn yield_now() {
    if !SCHEDULER_ENABLED.load(Ordering::SeqCst) {
        return;
    }
    debug_assert!(!interrupts::in_interrupt_context(), "yield from interrupt context");
    trigger_switch();
}

/// Mark the current thread BLOCKED and switch away.
///
/// The caller must hold a `DisableInterrupts` guard and must already
/// have published the thread on whatever wait queue will wake it.
/// Returns after some other thread calls `unblock`.
pub(crate) fn block_current_and_schedule() {
    debug_assert!(!interrupts::are_enabled(), "blocking requires interrupts off");
    with_scheduler(|s| {
        let current = s.table.current_thread_mut();
        debug_assert!(!current.is_idle, "idle thread cannot block");
        current.state = ThreadState::Blocked;
    });
    trigger_switch();
}

/// Transition a BLOCKED thread to READY. Does not preempt by itself;
/// callers that want preemption check priorities afterwards.
pub fn unblock(tid: ThreadId) {
    with_scheduler(|s| unblock_locked(&mut s.table, tid));
}

fn unblock_locked(table: &mut ThreadTable, tid: ThreadId) {
    if let Some(thread) = table.get_mut(tid) {
        assert!(
            thread.state == ThreadState::Blocked,
            "unblock of thread {} in state {:?}",
            tid,
            thread.state
        );
        thread.state = ThreadState::Ready;
        table.push_ready(tid);
    }
}

/// Terminate the current thread. Its roster entry and stack page are
/// reclaimed by the next thread to pass through the scheduler.
pub fn exit_thread() -> ! {
    let _guard = DisableInterrupts::new();
    with_scheduler(|s| {
        s.table.current_thread_mut().state = ThreadState::Dying;
    });
    trigger_switch();
    panic!("dying thread was rescheduled");
}

/// Block the current thread until the given absolute tick.
///
/// The sleep queue is kept sorted by wakeup tick; the tick handler
/// wakes due threads in order.
pub(crate) fn sleep_until(wake_tick: i64) {
    let _guard = DisableInterrupts::new();
    with_scheduler(|s| {
        let tid = s.table.current_tid();
        {
            let current = s.table.current_thread_mut();
            debug_assert!(!current.is_idle, "idle thread cannot sleep");
            current.wakeup_tick = wake_tick;
            current.state = ThreadState::Blocked;
        }
        s.table.push_sleeper(wake_tick, tid);
    });
    trigger_switch();
}

/// Set the current thread's base priority.
///
/// Effective priority is recomputed against outstanding donations, and
/// the thread yields when it no longer has the highest claim to the
/// CPU. A no-op under MLFQS, where priorities are computed, not set.
pub fn set_priority(priority: i32) {
    if MLFQS.load(Ordering::SeqCst) {
        return;
    }
    let priority = priority.clamp(PRI_MIN, PRI_MAX);

    let should_yield = with_scheduler(|s| {
        let tid = s.table.current_tid();
        s.table.current_thread_mut().base_priority = priority;
        recompute_effective_priority(&mut s.table, tid);
        s.table
            .max_ready_priority()
            .is_some_and(|m| m > s.table.current_thread().priority)
    });
    if should_yield {
        yield_now();
    }
}

/// The current thread's effective priority.
pub fn get_priority() -> i32 {
    with_scheduler(|s| s.table.current_thread().priority)
}

/// Set the current thread's nice value, clamped to [-20, 20]. Under
/// MLFQS the thread's priority is recomputed immediately and the CPU is
/// yielded when a higher-priority thread exists.
pub fn set_nice(nice: i32) {
    let nice = nice.clamp(policies::mlfqs::NICE_MIN, policies::mlfqs::NICE_MAX);
    let should_yield = with_scheduler(|s| {
        let tid = s.table.current_tid();
        s.table.current_thread_mut().nice = nice;
        s.policy.nice_changed(&mut s.table, tid);
        s.table
            .max_ready_priority()
            .is_some_and(|m| m > s.table.current_thread().priority)
    });
    if should_yield {
        yield_now();
    }
}

/// The current thread's nice value.
pub fn get_nice() -> i32 {
    with_scheduler(|s| s.table.current_thread().nice)
}

/// 100 * recent_cpu of the current thread, rounded to nearest.
pub fn get_recent_cpu() -> i32 {
    with_scheduler(|s| (s.table.current_thread().recent_cpu * 100).round())
}

/// 100 * system load average, rounded to nearest.
pub fn get_load_avg() -> i32 {
    with_scheduler(|s| (s.policy.load_avg() * 100).round())
}

/// Snapshot of every live thread for diagnostics.
pub fn stats() -> Vec<ThreadStats> {
    with_scheduler(|s| {
        s.table
            .threads()
            .map(|t| ThreadStats {
                id: t.id,
                name: String::from(t.name.as_str()),
                state: t.state,
                priority: t.priority,
            })
            .collect()
    })
}

// ============================================================================
// Tick and switch entry points (called from the naked handlers)
// ============================================================================

/// Timer interrupt body: advance time, wake sleepers, run policy
/// accounting, and decide whether to preempt.
pub(crate) extern "C" fn schedule_preempt(ctx: *mut InterruptContext) -> *const InterruptContext {
    interrupts::irq_enter();
    crate::timer::on_tick();
    let now = crate::timer::ticks();

    let ret = if !SCHEDULER_ENABLED.load(Ordering::SeqCst) {
        ctx as *const InterruptContext
    } else {
        let mut guard = SCHEDULER.lock();
        let s = guard.as_mut().expect("tick before scheduler init");

        s.table.reap_dying(s.table.current_tid());

        // Wake sleepers whose tick has arrived, in wakeup order.
        for tid in s.table.take_due_sleepers(now) {
            if let Some(t) = s.table.get_mut(tid) {
                t.wakeup_tick = 0;
            }
            unblock_locked(&mut s.table, tid);
        }

        s.policy.on_tick(&mut s.table, now);
        s.slice_used += 1;

        let current = s.table.current_thread();
        let higher_ready = s
            .table
            .max_ready_priority()
            .is_some_and(|m| m > current.priority || (current.is_idle && s.table.ready_count() > 0));
        let preempt = interrupts::take_yield_on_return()
            || s.slice_used >= TIME_SLICE
            || higher_ready
            || current.state != ThreadState::Running;

        if preempt {
            pick_and_switch(s, ctx)
        } else {
            ctx as *const InterruptContext
        }
    };

    interrupts::irq_exit();
    ret
}

/// Voluntary switch body (INT 0x81): always reschedule.
pub(crate) extern "C" fn schedule_yield(ctx: *mut InterruptContext) -> *const InterruptContext {
    interrupts::irq_enter();

    let ret = if !SCHEDULER_ENABLED.load(Ordering::SeqCst) {
        ctx as *const InterruptContext
    } else {
        let mut guard = SCHEDULER.lock();
        let s = guard.as_mut().expect("yield before scheduler init");
        s.table.reap_dying(s.table.current_tid());
        pick_and_switch(s, ctx)
    };

    interrupts::irq_exit();
    ret
}

/// Save the interrupted thread, pick the best ready thread (FIFO among
/// equals, idle as the fallback), and hand back the context to resume.
fn pick_and_switch(s: &mut Scheduler, ctx: *mut InterruptContext) -> *const InterruptContext {
    let current_tid = s.table.current_tid();

    {
        let current = s.table.get_mut(current_tid).expect("current thread vanished");
        current.assert_alive();
        // SAFETY: ctx points at the full register state the naked
        // handler just pushed on this thread's stack.
        current.context = unsafe { *ctx };

        if current.state == ThreadState::Running {
            current.state = ThreadState::Ready;
        }
    }

    // Requeue the descheduled thread unless it blocked, died, or is the
    // idle thread (which is never queued).
    {
        let requeue = {
            let t = s.table.get(current_tid).unwrap();
            t.state == ThreadState::Ready && !t.is_idle
        };
        if requeue {
            s.table.push_ready(current_tid);
        }
    }

    let next_tid = s
        .table
        .take_best_ready()
        .or(s.table.idle_tid())
        .expect("no runnable thread and no idle thread");

    {
        let next = s.table.get_mut(next_tid).expect("picked thread vanished");
        next.assert_alive();
        next.state = ThreadState::Running;
    }

    s.table.set_current(next_tid);
    CURRENT_TID.store(next_tid.0, Ordering::SeqCst);
    s.slice_used = 0;

    &s.table.get(next_tid).unwrap().context as *const InterruptContext
}
