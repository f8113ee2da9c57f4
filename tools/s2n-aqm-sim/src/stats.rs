// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use core::time::Duration;
use s2n_aqm::{
    pi::{Estimates, Stats},
    queue::Unit,
};
use serde::Serialize;
use std::io;

/// What happened at the bottleneck during one report interval
#[derive(Clone, Debug, Default, Serialize)]
pub struct Interval {
    /// The end of the interval in seconds since the start of the run
    pub time: f64,
    pub arrivals: u64,
    pub departures: u64,
    /// The occupancy at the end of the interval, in `unit`
    pub occupancy: u64,
    pub unit: Unit,
    pub drop_probability: f64,
    /// Mean queueing delay of the departed packets in milliseconds
    pub mean_delay_ms: f64,
    /// Counters since the start of the run
    pub totals: Stats,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimates: Option<Estimates>,
}

/// Accumulates the departures of the current interval
#[derive(Debug, Default)]
pub struct Accumulator {
    pub arrivals: u64,
    pub departures: u64,
    delay: Duration,
}

impl Accumulator {
    #[inline]
    pub fn on_departure(&mut self, delay: Duration) {
        self.departures += 1;
        self.delay += delay;
    }

    #[inline]
    pub fn mean_delay_ms(&self) -> f64 {
        if self.departures == 0 {
            return 0.0;
        }
        self.delay.as_secs_f64() * 1000.0 / self.departures as f64
    }
}

pub enum Output<W: io::Write> {
    Text(W),
    Json(W),
}

impl<W: io::Write> Output<W> {
    pub fn header(&mut self) -> io::Result<()> {
        match self {
            Self::Text(w) => writeln!(
                w,
                "{:>8} {:>8} {:>8} {:>8} {:>10} {:>10} {:>8} {:>8} {:>8} {:>8}",
                "time",
                "arrivals",
                "departed",
                "queue",
                "drop_prob",
                "delay_ms",
                "f_drop",
                "u_drop",
                "f_mark",
                "u_mark"
            ),
            Self::Json(_) => Ok(()),
        }
    }

    pub fn write(&mut self, interval: &Interval) -> io::Result<()> {
        match self {
            Self::Text(w) => writeln!(
                w,
                "{:>8.3} {:>8} {:>8} {:>8} {:>10.6} {:>10.3} {:>8} {:>8} {:>8} {:>8}",
                interval.time,
                interval.arrivals,
                interval.departures,
                interval.occupancy,
                interval.drop_probability,
                interval.mean_delay_ms,
                interval.totals.forced_drop,
                interval.totals.unforced_drop,
                interval.totals.forced_mark,
                interval.totals.unforced_mark,
            ),
            Self::Json(w) => {
                serde_json::to_writer(&mut *w, interval)?;
                writeln!(w)
            }
        }
    }
}
