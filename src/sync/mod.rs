/*
 * Blocking Synchronization Primitives
 *
 * Three primitives, layered:
 * - Semaphore: counted waits with priority-aware wakeup
 * - Lock: a binary semaphore plus holder tracking and priority
 *   donation across nested acquisition chains
 * - Condvar: condition variables built from per-waiter semaphores
 *
 * All queue manipulation runs with interrupts disabled; none of these
 * primitives may be used from interrupt context except `Semaphore::up`,
 * which defers its preemption request when called from a handler.
 */

pub mod condvar;
pub mod lock;
pub mod semaphore;

pub use self::condvar::Condvar;
pub use self::lock::Lock;
pub use self::semaphore::Semaphore;
