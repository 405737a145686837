/*
 * Strict-Priority Round-Robin Policy
 *
 * The default scheduler: the highest effective priority always runs,
 * equal priorities rotate FIFO on time-slice expiry, and lock holders
 * receive priority donations from their waiters.
 *
 * All of that behavior lives in the mechanism and the lock
 * implementation; this policy only has to say "donation on" and leave
 * the accounting hooks empty.
 */

use super::super::fixed_point::Fixed;
use super::super::scheduler::ThreadTable;
use super::super::thread::ThreadId;
use super::SchedPolicy;

pub struct PriorityPolicy;

impl PriorityPolicy {
    pub fn new() -> PriorityPolicy {
        PriorityPolicy
    }
}

impl SchedPolicy for PriorityPolicy {
    fn name(&self) -> &'static str {
        "priority"
    }

    fn donation(&self) -> bool {
        true
    }

    fn on_tick(&mut self, _table: &mut ThreadTable, _now: i64) {}

    fn nice_changed(&mut self, _table: &mut ThreadTable, _tid: ThreadId) {}

    fn load_avg(&self) -> Fixed {
        Fixed::ZERO
    }
}
