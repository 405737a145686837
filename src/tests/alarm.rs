/*
 * Alarm Tests
 *
 * Three threads go to sleep for staggered durations; the tick handler
 * must wake them in deadline order, never early, and the sleepers must
 * consume no CPU while blocked (indirectly visible: they cannot record
 * anything before their deadline).
 */

use alloc::vec::Vec;
use spin::Mutex;

use super::{TestResults, drain, record, section};
use crate::scheduler::{self, PRI_DEFAULT};
use crate::timer;

/// (sleeper slot, tick observed at wakeup)
static WAKEUPS: Mutex<Vec<(usize, i64)>> = Mutex::new(Vec::new());

/// aux encodes slot in the high bits and duration in the low byte.
fn sleeper(aux: usize) {
    let slot = aux >> 8;
    let duration = (aux & 0xff) as i64;
    timer::sleep(duration);
    record(&WAKEUPS, (slot, timer::ticks()));
}

pub fn run(results: &mut TestResults) {
    section("alarm");

    drain(&WAKEUPS);
    let start = timer::ticks();
    let durations: [i64; 3] = [30, 10, 20];

    for (slot, &duration) in durations.iter().enumerate() {
        let aux = (slot << 8) | duration as usize;
        scheduler::spawn("alarm", PRI_DEFAULT, sleeper, aux).expect("spawn sleeper");
    }

    // All three sleepers outlast this nap by design.
    timer::sleep(60);

    let wakeups = drain(&WAKEUPS);
    results.check(wakeups.len() == 3, "every sleeper woke exactly once");

    let order: Vec<usize> = wakeups.iter().map(|&(slot, _)| slot).collect();
    results.check(order == [1, 2, 0], "wakeups happen in deadline order");

    let mut none_early = true;
    for &(slot, tick) in &wakeups {
        if tick < start + durations[slot] {
            none_early = false;
        }
    }
    results.check(none_early, "no sleeper woke before its deadline");
}
