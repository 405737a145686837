/*
 * Multi-Level Feedback Queue Policy
 *
 * Priorities are never set by threads; they fall out of three recurring
 * recomputations, all in Q17.14 fixed point:
 *
 * - every tick: the running thread's recent_cpu increases by one
 * - every 4th tick: every thread's priority is recomputed as
 *     PRI_MAX - (recent_cpu / 4) - (nice * 2), clamped to the range
 * - every second: load_avg and every thread's recent_cpu decay:
 *     load_avg   = (59/60) * load_avg + (1/60) * ready_threads
 *     recent_cpu = (2*load_avg)/(2*load_avg + 1) * recent_cpu + nice
 *
 * ready_threads counts READY threads plus the running one unless it is
 * the idle thread; the idle thread is excluded from all accounting.
 *
 * Priority donation is disabled under this policy.
 */

use super::super::fixed_point::Fixed;
use super::super::scheduler::ThreadTable;
use super::super::thread::ThreadId;
use super::super::{PRI_MAX, PRI_MIN};
use super::SchedPolicy;
use crate::timer::TIMER_FREQ;

/// Lowest nice value (most generous CPU claim).
pub const NICE_MIN: i32 = -20;
/// Highest nice value.
pub const NICE_MAX: i32 = 20;

/// Ticks between whole-table priority recomputations.
const PRIORITY_INTERVAL: i64 = 4;

pub struct MlfqsPolicy {
    load_avg: Fixed,
}

impl MlfqsPolicy {
    pub fn new() -> MlfqsPolicy {
        MlfqsPolicy {
            load_avg: Fixed::ZERO,
        }
    }
}

/// Priority a thread earns from its accounting state.
pub fn priority_for(recent_cpu: Fixed, nice: i32) -> i32 {
    let p = PRI_MAX - (recent_cpu / 4).round() - nice * 2;
    p.clamp(PRI_MIN, PRI_MAX)
}

/// One-second load-average step.
pub fn load_avg_step(load_avg: Fixed, ready_threads: i32) -> Fixed {
    (Fixed::from_int(59) / 60) * load_avg + Fixed::from_int(ready_threads) / 60
}

/// One-second recent_cpu decay step.
pub fn recent_cpu_step(load_avg: Fixed, recent_cpu: Fixed, nice: i32) -> Fixed {
    let twice = load_avg * 2;
    (twice / (twice + 1)) * recent_cpu + nice
}

impl SchedPolicy for MlfqsPolicy {
    fn name(&self) -> &'static str {
        "mlfqs"
    }

    fn donation(&self) -> bool {
        false
    }

    fn on_tick(&mut self, table: &mut ThreadTable, now: i64) {
        // The running thread pays for this tick.
        {
            let current = table.current_thread_mut();
            if !current.is_idle {
                current.recent_cpu = current.recent_cpu + 1;
            }
        }

        // Once per second: decay load_avg and recent_cpu for everyone.
        if now % TIMER_FREQ == 0 {
            let running = if table.current_thread().is_idle { 0 } else { 1 };
            let ready_threads = table.ready_count() as i32 + running;
            self.load_avg = load_avg_step(self.load_avg, ready_threads);

            let load_avg = self.load_avg;
            for thread in table.threads_mut() {
                if !thread.is_idle {
                    thread.recent_cpu = recent_cpu_step(load_avg, thread.recent_cpu, thread.nice);
                }
            }
        }

        // Every fourth tick: refresh every thread's priority. Selection
        // reads priorities at pop time, so no queue reordering is
        // needed beyond this rewrite.
        if now % PRIORITY_INTERVAL == 0 {
            for thread in table.threads_mut() {
                if !thread.is_idle {
                    thread.priority = priority_for(thread.recent_cpu, thread.nice);
                    thread.base_priority = thread.priority;
                }
            }
        }
    }

    fn nice_changed(&mut self, table: &mut ThreadTable, tid: ThreadId) {
        if let Some(thread) = table.get_mut(tid) {
            thread.priority = priority_for(thread.recent_cpu, thread.nice);
            thread.base_priority = thread.priority;
        }
    }

    fn load_avg(&self) -> Fixed {
        self.load_avg
    }
}
