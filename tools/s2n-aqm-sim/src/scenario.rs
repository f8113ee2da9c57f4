// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use crate::Result;
use anyhow::{ensure, Context};
use core::time::Duration;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};
use structopt::StructOpt;

/// A bottleneck link fed by unresponsive Poisson traffic
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Scenario {
    pub seed: u64,
    /// Total simulated time
    #[serde(with = "humantime_serde")]
    pub duration: Duration,
    #[serde(with = "humantime_serde")]
    pub report_interval: Duration,
    /// Mean packet arrivals per second at the start of the run
    pub arrival_rate: f64,
    /// Packets the link transmits per second while it has work
    pub service_rate: f64,
    /// The size of every packet in bytes
    pub packet_len: u16,
    /// The share of packets that are ECN capable
    pub ecn_fraction: f64,
    /// Changes to the arrival rate during the run
    pub phases: Vec<Phase>,
    pub aqm: s2n_aqm::Config,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Phase {
    /// The offset from the start of the run
    #[serde(with = "humantime_serde")]
    pub at: Duration,
    pub arrival_rate: f64,
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            seed: 0,
            duration: Duration::from_secs(30),
            report_interval: Duration::from_secs(1),
            arrival_rate: 1200.0,
            service_rate: 1000.0,
            packet_len: 1000,
            ecn_fraction: 0.0,
            phases: vec![],
            aqm: s2n_aqm::Config::default()
                .with_queue_limit(200)
                .with_max_size(s2n_aqm::queue::QueueSize::packets(200)),
        }
    }
}

impl Scenario {
    pub fn load(path: &Path) -> Result<Self> {
        let contents =
            fs::read_to_string(path).with_context(|| format!("could not read {}", path.display()))?;
        let scenario: Self =
            toml::from_str(&contents).with_context(|| format!("invalid scenario {}", path.display()))?;
        Ok(scenario)
    }

    pub fn validate(&self) -> Result {
        ensure!(!self.duration.is_zero(), "duration must be greater than zero");
        ensure!(
            !self.report_interval.is_zero(),
            "report_interval must be greater than zero"
        );
        check_rate("arrival_rate", self.arrival_rate)?;
        check_rate("service_rate", self.service_rate)?;
        ensure!(self.service_rate > 0.0, "service_rate must be greater than zero");
        ensure!(
            (0.0..=1.0).contains(&self.ecn_fraction),
            "ecn_fraction must be within [0, 1]"
        );

        for phase in &self.phases {
            check_rate("phases.arrival_rate", phase.arrival_rate)?;
        }
        ensure!(
            self.phases.windows(2).all(|w| w[0].at <= w[1].at),
            "phases must be ordered by `at`"
        );

        self.aqm.validate()?;

        Ok(())
    }
}

/// Timestamps have microsecond resolution so faster rates would schedule
/// events without advancing time
const MAX_RATE: f64 = 1_000_000.0;

fn check_rate(name: &str, rate: f64) -> Result {
    ensure!(
        (0.0..=MAX_RATE).contains(&rate),
        "{name} must be within [0, {MAX_RATE}]"
    );
    Ok(())
}

#[derive(Debug, StructOpt)]
pub struct Defaults {}

impl Defaults {
    pub fn run(&self) -> Result {
        let scenario = toml::to_string(&Scenario::default())?;
        print!("{scenario}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use s2n_aqm::{config::Algorithm, queue::Unit};

    #[test]
    fn parse_test() {
        let scenario: Scenario = toml::from_str(
            r#"
            seed = 7
            duration = "10s"
            report_interval = "250ms"
            arrival_rate = 1500.0

            [[phases]]
            at = "5s"
            arrival_rate = 500.0

            [aqm]
            algorithm = "self-tuning"
            queue_limit = 30000
            max_size = { unit = "bytes", value = 30000 }
            use_ecn = true
            "#,
        )
        .unwrap();

        assert_eq!(scenario.seed, 7);
        assert_eq!(scenario.duration, Duration::from_secs(10));
        assert_eq!(scenario.report_interval, Duration::from_millis(250));
        assert_eq!(scenario.service_rate, 1000.0);
        assert_eq!(scenario.phases[0].at, Duration::from_secs(5));
        assert_eq!(scenario.aqm.algorithm(), Algorithm::SelfTuning);
        assert_eq!(scenario.aqm.max_size().unit, Unit::Bytes);
        assert!(scenario.aqm.use_ecn());
        // unspecified parameters keep their defaults
        assert_eq!(scenario.aqm.queue_ref(), 50.0);
        assert!(scenario.validate().is_ok());
    }

    #[test]
    fn defaults_round_trip_test() {
        let contents = toml::to_string(&Scenario::default()).unwrap();
        let scenario: Scenario = toml::from_str(&contents).unwrap();
        assert_eq!(scenario.duration, Duration::from_secs(30));
        assert_eq!(scenario.aqm, Scenario::default().aqm);
    }

    #[test]
    fn invalid_test() {
        let scenario = Scenario {
            ecn_fraction: 1.5,
            ..Default::default()
        };
        assert!(scenario.validate().is_err());

        let scenario = Scenario {
            service_rate: 0.0,
            ..Default::default()
        };
        assert!(scenario.validate().is_err());

        for arrival_rate in [1e9, f64::NAN, f64::INFINITY, -1.0] {
            let scenario = Scenario {
                arrival_rate,
                ..Default::default()
            };
            assert!(scenario.validate().is_err(), "{arrival_rate}");

            let scenario = Scenario {
                phases: vec![Phase {
                    at: Duration::from_secs(1),
                    arrival_rate,
                }],
                ..Default::default()
            };
            assert!(scenario.validate().is_err(), "{arrival_rate}");
        }

        let scenario = Scenario {
            arrival_rate: MAX_RATE,
            service_rate: MAX_RATE,
            ..Default::default()
        };
        assert!(scenario.validate().is_ok());

        assert!(toml::from_str::<Scenario>("unknown = 1").is_err());
        assert!(toml::from_str::<Scenario>("[aqm]\nbpi = 0.5\nfoo = 1").is_err());

        let scenario: Scenario = toml::from_str("[aqm]\nbpi = 0.9").unwrap();
        assert!(scenario.validate().is_err());
    }
}
