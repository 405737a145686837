/*
 * Interrupt Management
 *
 * High-level interface to CPU interrupt control. Every scheduler and
 * synchronization-primitive critical section in this kernel is built on
 * these helpers: queue manipulation, thread state transitions, and
 * donation walks all run with interrupts disabled.
 *
 * The module also tracks whether we are currently executing inside an
 * interrupt handler (`in_interrupt_context`) and carries the
 * "yield on return" flag an interrupt handler can set to request a
 * reschedule once the handler unwinds.
 */

use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use x86_64::instructions::interrupts;

/// Nesting depth of interrupt handlers on this CPU (0 = thread context).
static INTR_DEPTH: AtomicUsize = AtomicUsize::new(0);

/// Set by interrupt-context code that wants a reschedule when the
/// handler returns; consumed by the timer tick path.
static YIELD_ON_RETURN: AtomicBool = AtomicBool::new(false);

/// Enable interrupts globally.
pub fn enable() {
    interrupts::enable();
}

/// Disable interrupts globally.
pub fn disable() {
    interrupts::disable();
}

/// Check if interrupts are currently enabled.
pub fn are_enabled() -> bool {
    interrupts::are_enabled()
}

/// Execute a closure with interrupts disabled.
///
/// The closure must not block or yield; use [`DisableInterrupts`] for
/// regions that deschedule the current thread.
pub fn without_interrupts<F, R>(f: F) -> R
where
    F: FnOnce() -> R,
{
    interrupts::without_interrupts(f)
}

/// True while executing inside an interrupt handler.
///
/// Code that may be reached from both thread and interrupt context
/// (semaphore release, thread wakeup) uses this to decide whether an
/// immediate yield is legal.
pub fn in_interrupt_context() -> bool {
    INTR_DEPTH.load(Ordering::SeqCst) != 0
}

/// Enter interrupt context. Called at the top of every Rust-level
/// interrupt handler body.
pub fn irq_enter() {
    INTR_DEPTH.fetch_add(1, Ordering::SeqCst);
}

/// Leave interrupt context.
pub fn irq_exit() {
    INTR_DEPTH.fetch_sub(1, Ordering::SeqCst);
}

/// Request a reschedule once the current interrupt handler returns.
///
/// Legal only from interrupt context; the request is picked up by the
/// scheduler on the next timer-driven scheduling decision.
pub fn yield_on_return() {
    YIELD_ON_RETURN.store(true, Ordering::SeqCst);
}

/// Consume the yield-on-return flag, reporting whether it was set.
pub fn take_yield_on_return() -> bool {
    YIELD_ON_RETURN.swap(false, Ordering::SeqCst)
}

/// RAII guard that disables interrupts for its lifetime.
///
/// Interrupts are disabled when the guard is created and restored to
/// their previous state when it is dropped. A descheduled thread that
/// holds this guard resumes with interrupts still disabled and restores
/// them when the guard finally drops, which is exactly the discipline
/// blocking primitives need.
pub struct DisableInterrupts {
    were_enabled: bool,
}

impl DisableInterrupts {
    /// Create a new interrupt guard, disabling interrupts.
    pub fn new() -> Self {
        let were_enabled = are_enabled();
        if were_enabled {
            disable();
        }
        Self { were_enabled }
    }
}

impl Drop for DisableInterrupts {
    fn drop(&mut self) {
        // Only re-enable if they were enabled before
        if self.were_enabled {
            enable();
        }
    }
}
