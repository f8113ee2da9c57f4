// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use crate::{config::Config, time::Timestamp};
use core::time::Duration;
#[cfg(not(feature = "std"))]
use num_traits::Float as _;

/// Values estimated by the self-tuning controller during the last update
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Estimates {
    /// Departure rate over the busy part of the last period, in items per second
    pub capacity: f64,
    /// Smoothed capacity
    pub thc: f64,
    /// Smoothed `N / (R * C)`, derived from the drop probability
    pub thnrc: f64,
    /// Estimated round trip time
    pub rtt: f64,
    /// Proportional gain
    pub kp: f64,
    /// Integral gain
    pub ki: f64,
}

/// The state of a self-tuning PI (STPI) controller.
///
/// Every period the link capacity is measured from the number of items that
/// departed while the queue was busy, and the gains are re-derived from the
/// smoothed capacity and the round trip time implied by the current drop
/// probability.
#[derive(Clone, Debug)]
pub struct SelfTuning {
    estimates: Estimates,
    old_thc: f64,
    old_thnrc: f64,
    /// The end of the previous measurement period
    old_router_busy_time: Timestamp,
    kc: f64,
    knrc: f64,
    bpi: f64,
}

/// Inputs of a single probability update, normalized to packets
#[derive(Clone, Copy, Debug)]
pub struct Sample {
    pub qlen: f64,
    pub q_old: f64,
    pub q_ref: f64,
    pub drop_prob: f64,
}

/// What was measured over the period that just ended
#[derive(Clone, Copy, Debug)]
pub struct Period {
    pub departed_packets: u64,
    pub idle_time: Duration,
    pub now: Timestamp,
}

impl SelfTuning {
    pub fn new(config: &Config, now: Timestamp) -> Self {
        Self {
            estimates: Estimates {
                capacity: config.link_capacity(),
                ..Default::default()
            },
            old_thc: 0.0,
            old_thnrc: 0.0,
            old_router_busy_time: now,
            kc: config.kc(),
            knrc: config.knrc(),
            bpi: config.bpi(),
        }
    }

    #[inline]
    pub fn estimates(&self) -> &Estimates {
        &self.estimates
    }

    /// Re-derives the gains from the period that just ended and returns the
    /// unclamped drop probability.
    ///
    /// Returns `None` when the gains are undefined for this period, which is
    /// the case until the drop probability and the smoothed capacity are
    /// both positive.
    pub fn update(&mut self, sample: &Sample, period: &Period) -> Option<f64> {
        let busy_time = period
            .now
            .saturating_duration_since(self.old_router_busy_time)
            .saturating_sub(period.idle_time);
        // whole seconds only
        let busy_secs = busy_time.as_secs();

        if busy_secs > 0 {
            self.estimates.capacity = period.departed_packets as f64 / busy_secs as f64;
        } else {
            crate::_debug!(
                departed_packets = period.departed_packets,
                "busy time under a second; keeping the previous capacity"
            );
        }

        let estimates = &mut self.estimates;
        estimates.thc = self.old_thc * (1.0 - self.kc) + self.kc * estimates.capacity;

        let loss = (sample.drop_prob / 2.0).sqrt();
        estimates.thnrc = self.old_thnrc * (1.0 - self.knrc) + self.knrc * loss;

        self.old_thc = estimates.thc;
        self.old_thnrc = estimates.thnrc;
        self.old_router_busy_time = period.now;

        if !(loss > 0.0 && estimates.thc > 0.0 && estimates.thnrc > 0.0) {
            crate::_debug!(
                drop_prob = sample.drop_prob,
                thc = estimates.thc,
                "self-tuning gains undefined"
            );
            return None;
        }

        let bpi = self.bpi;
        estimates.rtt = (estimates.thnrc / estimates.thc) / loss;
        estimates.kp =
            (2.0 * bpi * (bpi * bpi + 1.0).sqrt() * estimates.thnrc) / (estimates.rtt * estimates.thc);
        estimates.ki = ((2.0 * estimates.thnrc) / estimates.rtt) * estimates.kp;

        Some(estimates.ki * (sample.qlen - sample.q_ref) + estimates.kp * sample.qlen)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::{testing::Clock, Clock as _};

    fn sample(qlen: f64, drop_prob: f64) -> Sample {
        Sample {
            qlen,
            q_old: 0.0,
            q_ref: 50.0,
            drop_prob,
        }
    }

    #[test]
    fn capacity_test() {
        let mut clock = Clock::default();
        let mut stpi = SelfTuning::new(&Config::default(), clock.get_time());

        clock.inc_by(Duration::from_millis(2_500));
        let period = Period {
            departed_packets: 1000,
            idle_time: Duration::from_millis(400),
            now: clock.get_time(),
        };

        // 2.5s - 0.4s idle is 2 whole busy seconds
        assert!(stpi.update(&sample(60.0, 0.02), &period).is_some());
        assert_eq!(stpi.estimates().capacity, 500.0);
        assert_eq!(stpi.estimates().thc, 250.0);
    }

    #[test]
    fn sub_second_busy_time_keeps_capacity_test() {
        let mut clock = Clock::default();
        let config = Config::default().with_link_capacity(1000.0).unwrap();
        let mut stpi = SelfTuning::new(&config, clock.get_time());

        clock.inc_by(Duration::from_millis(999));
        let period = Period {
            departed_packets: 10,
            idle_time: Duration::ZERO,
            now: clock.get_time(),
        };

        stpi.update(&sample(60.0, 0.02), &period);

        assert_eq!(stpi.estimates().capacity, 1000.0);
        assert_eq!(stpi.estimates().thc, 500.0);
        assert!(stpi.estimates().kp.is_finite());
        assert!(stpi.estimates().ki.is_finite());
    }

    #[test]
    fn zero_probability_has_no_gains_test() {
        let mut clock = Clock::default();
        let mut stpi = SelfTuning::new(&Config::default(), clock.get_time());

        clock.inc_by(Duration::from_secs(1));
        let period = Period {
            departed_packets: 100,
            idle_time: Duration::ZERO,
            now: clock.get_time(),
        };

        assert_eq!(stpi.update(&sample(60.0, 0.0), &period), None);
        assert_eq!(stpi.estimates().thnrc, 0.0);
        assert_eq!(stpi.estimates().kp, 0.0);
        assert_eq!(stpi.estimates().ki, 0.0);
    }

    #[test]
    fn gains_test() {
        let mut clock = Clock::default();
        let config = Config::default()
            .with_kc(1.0)
            .unwrap()
            .with_knrc(1.0)
            .unwrap();
        let mut stpi = SelfTuning::new(&config, clock.get_time());

        clock.inc_by(Duration::from_secs(1));
        let period = Period {
            departed_packets: 200,
            idle_time: Duration::ZERO,
            now: clock.get_time(),
        };

        let drop_prob = 0.08;
        let p = stpi.update(&sample(60.0, drop_prob), &period).unwrap();
        let estimates = *stpi.estimates();

        // without smoothing the estimates are the raw samples
        let loss = (drop_prob / 2.0).sqrt();
        assert_eq!(estimates.capacity, 200.0);
        assert_eq!(estimates.thc, 200.0);
        assert_eq!(estimates.thnrc, loss);
        assert_eq!(estimates.rtt, (loss / 200.0) / loss);

        let kp = 2.0 * 0.5 * (1.25f64).sqrt() * loss / (estimates.rtt * 200.0);
        assert!((estimates.kp - kp).abs() < 1e-12);
        let ki = (2.0 * loss / estimates.rtt) * kp;
        assert!((estimates.ki - ki).abs() < 1e-9);
        assert!((p - (ki * 10.0 + kp * 60.0)).abs() < 1e-6);
    }
}
