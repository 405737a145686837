/*
 * Scheduling Policies
 *
 * The mechanism (queues, context switches, state transitions) is fixed;
 * what varies between the two schedulers is tick-time accounting and
 * whether priority donation is in effect. That variation lives behind
 * the SchedPolicy trait:
 *
 * - priority: strict priority + round-robin, donation enabled
 * - mlfqs: multi-level feedback queue, donation disabled, priorities
 *   derived from recent_cpu/nice/load_avg
 *
 * The policy is chosen once at boot from the kernel command line and
 * never swapped afterwards.
 */

pub mod mlfqs;
pub mod priority;

use alloc::boxed::Box;

use super::fixed_point::Fixed;
use super::scheduler::ThreadTable;
use super::thread::ThreadId;

/// Scheduling policy interface.
///
/// Policies see the thread table directly; they may rewrite effective
/// priorities and accounting fields but never touch queue membership or
/// thread states - that is the mechanism's job.
pub trait SchedPolicy: Send {
    /// Policy name for logs.
    fn name(&self) -> &'static str;

    /// Whether lock acquisition performs priority donation.
    fn donation(&self) -> bool;

    /// Per-tick accounting. `now` is the tick count including the tick
    /// being processed.
    fn on_tick(&mut self, table: &mut ThreadTable, now: i64);

    /// A thread's nice value changed; recompute whatever depends on it.
    fn nice_changed(&mut self, table: &mut ThreadTable, tid: ThreadId);

    /// System load average (zero outside MLFQS).
    fn load_avg(&self) -> Fixed;
}

/// Build the policy selected by the boot options.
pub fn make_policy(mlfqs: bool) -> Box<dyn SchedPolicy> {
    if mlfqs {
        Box::new(mlfqs::MlfqsPolicy::new())
    } else {
        Box::new(priority::PriorityPolicy::new())
    }
}
