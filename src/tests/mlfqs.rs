/*
 * MLFQS Arithmetic Tests
 *
 * The fixed-point type and the three MLFQS recompute formulas are pure
 * functions, so they are checked exactly under either policy. The
 * behavioral checks (live recent_cpu/load_avg movement) only make
 * sense while the MLFQS policy is active and are skipped otherwise.
 */

use super::{TestResults, section};
use crate::scheduler::fixed_point::Fixed;
use crate::scheduler::policies::mlfqs::{load_avg_step, priority_for, recent_cpu_step};
use crate::scheduler::{self, PRI_MAX, PRI_MIN};
use crate::timer;

pub fn run(results: &mut TestResults) {
    section("fixed-point arithmetic");

    results.check(Fixed::from_int(5).trunc() == 5, "int round-trip via trunc");
    results.check((Fixed::from_int(7) / 2).round() == 4, "7/2 rounds to 4");
    results.check((Fixed::from_int(-7) / 2).round() == -4, "-7/2 rounds to -4");
    results.check(
        ((Fixed::from_int(3) / 2) * (Fixed::from_int(4))).trunc() == 6,
        "fixed*fixed keeps fractional precision",
    );
    results.check(
        ((Fixed::from_int(59) / Fixed::from_int(60)) * 60).round() == 59,
        "fixed/fixed divides exactly",
    );
    results.check((Fixed::from_int(2) + 3).trunc() == 5, "fixed + int promotes the int");

    section("mlfqs recompute formulas");

    // One 4-tick interval of exclusive CPU from a cold start:
    // PRI_MAX - round(4/4) - 0 = 62.
    results.check(
        priority_for(Fixed::from_int(4), 0) == PRI_MAX - 1,
        "4 ticks of recent_cpu cost one priority level",
    );
    results.check(
        priority_for(Fixed::ZERO, 0) == PRI_MAX,
        "fresh thread starts at the top",
    );
    results.check(
        priority_for(Fixed::from_int(100_000), 0) == PRI_MIN,
        "priority clamps at the floor",
    );

    // Raising nice never raises priority.
    let mut monotone = true;
    let mut last = i32::MAX;
    for nice in -20..=20 {
        let p = priority_for(Fixed::from_int(8), nice);
        if p > last {
            monotone = false;
        }
        last = p;
    }
    results.check(monotone, "priority is monotone nonincreasing in nice");

    // With 60 ready threads the (1/60) term contributes exactly 1.
    results.check(
        load_avg_step(Fixed::ZERO, 60).round() == 1,
        "load_avg step weighs ready threads by 1/60",
    );
    // (2*1)/(2*1+1) * 10 + 0 = 6.67, rounded to 7.
    results.check(
        recent_cpu_step(Fixed::from_int(1), Fixed::from_int(10), 0).round() == 7,
        "recent_cpu decay follows (2*load)/(2*load+1)",
    );
    results.check(
        recent_cpu_step(Fixed::ZERO, Fixed::ZERO, 5).round() == 5,
        "recent_cpu step adds nice",
    );

    if !scheduler::mlfqs_enabled() {
        return;
    }

    section("mlfqs live accounting");

    scheduler::set_nice(0);
    results.check(scheduler::get_nice() == 0, "nice round-trips");

    // Burn CPU for several ticks; recent_cpu must have moved.
    let start = timer::ticks();
    while timer::ticks() < start + 8 {
        core::hint::spin_loop();
    }
    results.check(scheduler::get_recent_cpu() > 0, "running accrues recent_cpu");
    results.check(scheduler::get_load_avg() >= 0, "load_avg is nonnegative");

    let p = scheduler::get_priority();
    results.check((PRI_MIN..=PRI_MAX).contains(&p), "computed priority stays in range");
}
