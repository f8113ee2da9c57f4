// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use super::*;
use crate::{
    queue::{testing::Packet, Fifo},
    time::{testing::Clock, Clock as _},
};
use core::fmt;
use insta::assert_debug_snapshot;

/// The bottleneck serves one packet every millisecond
const STEP: Duration = Duration::from_millis(1);
const STEPS_PER_ROUND: usize = 1000;

// These simulations are too slow for Miri
#[test]
#[cfg_attr(miri, ignore)]
fn constant_overload_test() {
    constant_overload(20).finish();
}

#[test]
#[cfg_attr(miri, ignore)]
fn overload_then_underload_test() {
    overload_then_underload(20).finish();
}

#[derive(Debug)]
struct Simulation {
    name: &'static str,
    description: &'static str,
    rounds: Vec<Round>,
}

struct Round {
    number: usize,
    occupancy: u64,
    /// The drop probability in parts per million
    ppm: u64,
    forced_drop: u64,
    unforced_drop: u64,
}

impl fmt::Debug for Round {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        // The probability is printed as an integer so the snapshot doesn't
        // depend on float formatting
        write!(
            f,
            "{:>3}: queue: {}, ppm: {}, forced: {}, unforced: {}",
            self.number, self.occupancy, self.ppm, self.forced_drop, self.unforced_drop
        )
    }
}

impl Simulation {
    fn finish(&self) {
        assert_debug_snapshot!(self.name, self);
    }
}

/// Simulates senders that don't back off, offering 20% more than the
/// bottleneck can serve
fn constant_overload(num_rounds: usize) -> Simulation {
    Simulation {
        name: "constant_overload",
        description: "1.2 packets per millisecond into a 1 packet per millisecond bottleneck",
        rounds: simulate(num_rounds, |step| if step % 5 == 0 { 2 } else { 1 }),
    }
}

/// Simulates an overload that stops halfway through, after which the
/// probability decays back to zero
fn overload_then_underload(num_rounds: usize) -> Simulation {
    let half = num_rounds * STEPS_PER_ROUND / 2;

    Simulation {
        name: "overload_then_underload",
        description: "1.2 packets per millisecond followed by 0.5 packets per millisecond",
        rounds: simulate(num_rounds, move |step| {
            if step <= half {
                if step % 5 == 0 {
                    2
                } else {
                    1
                }
            } else if step % 2 == 0 {
                1
            } else {
                0
            }
        }),
    }
}

fn simulate(num_rounds: usize, arrivals: impl Fn(usize) -> usize) -> Vec<Round> {
    let mut clock = Clock::default();

    let config = Config::default()
        .with_queue_limit(200)
        .with_max_size(QueueSize::packets(200))
        .with_a(0.0005)
        .unwrap()
        .with_b(0.00045)
        .unwrap()
        .with_w(8.0)
        .unwrap();

    let mut controller = Controller::<Fifo<Packet>, _>::builder(config, random::testing::Generator(0))
        .build(clock.get_time())
        .unwrap();

    let mut rounds = Vec::with_capacity(num_rounds);

    for step in 1..=num_rounds * STEPS_PER_ROUND {
        clock.inc_by(STEP);
        let now = clock.get_time();

        for _ in 0..arrivals(step) {
            controller.enqueue(Packet::new(1000), now);
        }

        controller.dequeue(now);
        controller.on_timeout(now);

        if step % STEPS_PER_ROUND == 0 {
            let stats = controller.stats();
            rounds.push(Round {
                number: step / STEPS_PER_ROUND,
                occupancy: controller.queue().occupancy(),
                ppm: (controller.drop_probability() * 1e6) as u64,
                forced_drop: stats.forced_drop,
                unforced_drop: stats.unforced_drop,
            });
        }
    }

    rounds
}
