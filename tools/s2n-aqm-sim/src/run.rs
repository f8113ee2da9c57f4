// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use crate::{
    packet::Packet,
    scenario::{Phase, Scenario},
    stats::{Accumulator, Interval, Output},
    Result,
};
use core::time::Duration;
use rand::{rngs::SmallRng, Rng, SeedableRng};
use s2n_aqm::{
    event,
    pi::{self, Controller},
    queue::{ecn::ExplicitCongestionNotification, Fifo, Queue},
    random::Seeded,
    time::Timestamp,
};
use std::{collections::VecDeque, io, path::PathBuf};
use structopt::StructOpt;
use tracing::info;

#[derive(Debug, StructOpt)]
pub struct Run {
    /// A TOML scenario; the default scenario is used when omitted
    #[structopt(long, short)]
    scenario: Option<PathBuf>,

    /// Overrides the seed of the scenario
    #[structopt(long)]
    seed: Option<u64>,

    /// Emits one JSON object per report interval
    #[structopt(long)]
    json: bool,
}

impl Run {
    pub fn run(&self) -> Result {
        let mut scenario = match &self.scenario {
            Some(path) => Scenario::load(path)?,
            None => Scenario::default(),
        };

        if let Some(seed) = self.seed {
            scenario.seed = seed;
        }

        scenario.validate()?;

        let stdout = io::stdout();
        let stdout = stdout.lock();
        let mut output = if self.json {
            Output::Json(stdout)
        } else {
            Output::Text(stdout)
        };

        output.header()?;

        let mut simulation = Simulation::new(&scenario)?;
        while let Some(interval) = simulation.next_interval() {
            output.write(&interval)?;
        }

        let stats = simulation.controller.stats();
        info!(
            seed = scenario.seed,
            drops = stats.drops(),
            marks = stats.marks(),
            "run finished"
        );

        Ok(())
    }
}

type Aqm = Controller<Fifo<Packet>, Seeded, event::tracing::Subscriber>;

struct Simulation {
    controller: Aqm,
    /// Drives arrivals and ECN capability, independent of the controller's stream
    rng: SmallRng,
    start: Timestamp,
    end: Timestamp,
    now: Timestamp,
    arrival_rate: f64,
    phases: VecDeque<Phase>,
    next_arrival: Option<Timestamp>,
    service_interval: Duration,
    next_service: Timestamp,
    report_interval: Duration,
    next_report: Timestamp,
    packet_len: u16,
    ecn_fraction: f64,
    acc: Accumulator,
}

impl Simulation {
    fn new(scenario: &Scenario) -> Result<Self> {
        let start = Timestamp::from_duration(Duration::from_micros(1));

        let mut controller = pi::Builder::new(scenario.aqm, Seeded::default())
            .with_subscriber(event::tracing::Subscriber::default())
            .build(start)?;
        controller.assign_streams(scenario.seed);

        let mut simulation = Self {
            controller,
            // the arrival process uses a different stream than the controller
            rng: SmallRng::seed_from_u64(!scenario.seed),
            start,
            end: start + scenario.duration,
            now: start,
            arrival_rate: scenario.arrival_rate,
            phases: scenario.phases.iter().cloned().collect(),
            next_arrival: None,
            service_interval: Duration::from_secs_f64(1.0 / scenario.service_rate),
            next_service: start,
            report_interval: scenario.report_interval,
            next_report: start + scenario.report_interval,
            packet_len: scenario.packet_len,
            ecn_fraction: scenario.ecn_fraction,
            acc: Accumulator::default(),
        };

        simulation.next_arrival = simulation.schedule_arrival();

        info!(
            seed = scenario.seed,
            algorithm = ?scenario.aqm.algorithm(),
            arrival_rate = scenario.arrival_rate,
            service_rate = scenario.service_rate,
            "starting run"
        );

        Ok(simulation)
    }

    /// Runs the simulation until the end of the next report interval
    fn next_interval(&mut self) -> Option<Interval> {
        if self.now >= self.end {
            return None;
        }

        loop {
            let mut next = self.next_report.min(self.next_service);
            if let Some(arrival) = self.next_arrival {
                next = next.min(arrival);
            }
            if let Some(update) = self.controller.next_expiration() {
                next = next.min(update);
            }
            if let Some(phase) = self.phases.front() {
                next = next.min(self.start + phase.at);
            }
            self.now = next.min(self.end);

            self.on_phase();
            self.controller.on_timeout(self.now);

            if self.next_arrival.is_some_and(|arrival| arrival <= self.now) {
                self.on_arrival();
                self.next_arrival = self.schedule_arrival();
            }

            if self.next_service <= self.now {
                self.on_service();
                self.next_service += self.service_interval;
            }

            if self.next_report <= self.now || self.now >= self.end {
                self.next_report += self.report_interval;
                return Some(self.report());
            }
        }
    }

    fn on_phase(&mut self) {
        while let Some(phase) = self.phases.front() {
            if self.start + phase.at > self.now {
                break;
            }

            self.arrival_rate = phase.arrival_rate;
            info!(arrival_rate = self.arrival_rate, "entering phase");
            self.phases.pop_front();
            self.next_arrival = self.schedule_arrival();
        }
    }

    /// Draws the next arrival of a Poisson process
    fn schedule_arrival(&mut self) -> Option<Timestamp> {
        if self.arrival_rate <= 0.0 {
            return None;
        }

        let u: f64 = self.rng.random();
        let gap = -(1.0 - u).ln() / self.arrival_rate;
        // gaps too large to represent never arrive
        let gap = Duration::try_from_secs_f64(gap).ok()?;
        self.now.checked_add(gap)
    }

    fn on_arrival(&mut self) {
        self.acc.arrivals += 1;

        let ecn = if self.rng.random_bool(self.ecn_fraction) {
            ExplicitCongestionNotification::Ect0
        } else {
            ExplicitCongestionNotification::NotEct
        };

        let packet = Packet {
            len: self.packet_len,
            ecn,
            arrival: self.now,
        };

        self.controller.enqueue(packet, self.now);
    }

    fn on_service(&mut self) {
        if let Some(packet) = self.controller.dequeue(self.now) {
            let delay = self.now.saturating_duration_since(packet.arrival);
            self.acc.on_departure(delay);
        }
    }

    fn report(&mut self) -> Interval {
        let acc = core::mem::take(&mut self.acc);
        let size = self.controller.queue().size();

        Interval {
            time: self.now.saturating_duration_since(self.start).as_secs_f64(),
            arrivals: acc.arrivals,
            departures: acc.departures,
            occupancy: size.value,
            unit: size.unit,
            drop_probability: self.controller.drop_probability(),
            mean_delay_ms: acc.mean_delay_ms(),
            totals: self.controller.stats(),
            estimates: self.controller.estimates().copied(),
        }
    }
}
