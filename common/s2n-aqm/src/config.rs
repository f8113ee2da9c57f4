// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use crate::queue::QueueSize;
use core::{ops::RangeInclusive, time::Duration};

/// The largest accepted value for [`Config::bpi`]
pub const MAX_BPI: f64 = 0.85;

#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct ValidationError(&'static str);

impl ValidationError {
    #[inline]
    pub const fn message(&self) -> &'static str {
        self.0
    }
}

/// Selects how the controller derives its gains. The choice is fixed for the
/// lifetime of a controller.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum Algorithm {
    /// Fixed gains `a` and `b`
    #[default]
    Classic,
    /// Gains re-derived every period from the estimated link capacity and
    /// round trip time
    SelfTuning,
}

/// Operator supplied parameters of a PI queue discipline
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default, deny_unknown_fields))]
pub struct Config {
    pub(crate) mean_pkt_size: u32,
    pub(crate) queue_ref: f64,
    pub(crate) a: f64,
    pub(crate) b: f64,
    pub(crate) w: f64,
    pub(crate) queue_limit: u64,
    pub(crate) max_size: QueueSize,
    pub(crate) use_ecn: bool,
    pub(crate) algorithm: Algorithm,
    pub(crate) link_capacity: f64,
    pub(crate) kc: f64,
    pub(crate) knrc: f64,
    pub(crate) bpi: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

macro_rules! setter {
    ($name:ident, $field:ident, $inner:ty, $check:expr) => {
        pub fn $name(mut self, value: $inner) -> Result<Self, ValidationError> {
            $check(value)?;
            self.$field = value;
            Ok(self)
        }
    };
    ($name:ident, $field:ident, $inner:ty) => {
        pub fn $name(mut self, value: $inner) -> Self {
            self.$field = value;
            self
        }
    };
}

impl Config {
    pub const fn new() -> Self {
        Self {
            mean_pkt_size: 500,
            queue_ref: 50.0,
            a: 0.00001822,
            b: 0.00001816,
            w: 170.0,
            queue_limit: 50,
            max_size: QueueSize::packets(25),
            use_ecn: false,
            algorithm: Algorithm::Classic,
            link_capacity: 622.0,
            kc: 0.5,
            knrc: 0.5,
            bpi: 0.5,
        }
    }

    setter!(with_mean_pkt_size, mean_pkt_size, u32, |value| check::non_zero(
        value,
        "mean_pkt_size must be greater than zero"
    ));
    setter!(with_queue_ref, queue_ref, f64, |value| check::finite(
        value,
        "queue_ref must be finite"
    ));
    setter!(with_a, a, f64, |value| check::finite(value, "a must be finite"));
    setter!(with_b, b, f64, |value| check::finite(value, "b must be finite"));
    setter!(with_w, w, f64, check::frequency);
    setter!(with_queue_limit, queue_limit, u64);
    setter!(with_max_size, max_size, QueueSize);
    setter!(with_ecn, use_ecn, bool);
    setter!(with_algorithm, algorithm, Algorithm);
    setter!(with_link_capacity, link_capacity, f64, |value| {
        check::range(
            value,
            0.0..=f64::MAX,
            "link_capacity must be a finite, non-negative value",
        )
    });
    setter!(with_kc, kc, f64, |value| check::range(
        value,
        0.0..=1.0,
        "kc must be within [0, 1]"
    ));
    setter!(with_knrc, knrc, f64, |value| check::range(
        value,
        0.0..=1.0,
        "knrc must be within [0, 1]"
    ));
    setter!(with_bpi, bpi, f64, |value| check::range(
        value,
        0.0..=MAX_BPI,
        "bpi must be within [0, 0.85]"
    ));

    /// Checks every parameter against its bounds.
    ///
    /// The `with_*` setters already enforce these; this is needed for
    /// configurations that were deserialized.
    pub fn validate(&self) -> Result<(), ValidationError> {
        Self::new()
            .with_mean_pkt_size(self.mean_pkt_size)?
            .with_queue_ref(self.queue_ref)?
            .with_a(self.a)?
            .with_b(self.b)?
            .with_w(self.w)?
            .with_link_capacity(self.link_capacity)?
            .with_kc(self.kc)?
            .with_knrc(self.knrc)?
            .with_bpi(self.bpi)?;
        Ok(())
    }

    #[inline]
    pub fn mean_pkt_size(&self) -> u32 {
        self.mean_pkt_size
    }

    #[inline]
    pub fn queue_ref(&self) -> f64 {
        self.queue_ref
    }

    #[inline]
    pub fn a(&self) -> f64 {
        self.a
    }

    #[inline]
    pub fn b(&self) -> f64 {
        self.b
    }

    /// The update frequency in Hz
    #[inline]
    pub fn w(&self) -> f64 {
        self.w
    }

    /// The time between two probability updates, `1 / w`
    #[inline]
    pub fn update_interval(&self) -> Duration {
        check::interval(self.w).unwrap_or(Duration::from_micros(1))
    }

    #[inline]
    pub fn queue_limit(&self) -> u64 {
        self.queue_limit
    }

    /// The capacity of the internal queue created when none is supplied
    #[inline]
    pub fn max_size(&self) -> QueueSize {
        self.max_size
    }

    #[inline]
    pub fn use_ecn(&self) -> bool {
        self.use_ecn
    }

    #[inline]
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    #[inline]
    pub fn link_capacity(&self) -> f64 {
        self.link_capacity
    }

    #[inline]
    pub fn kc(&self) -> f64 {
        self.kc
    }

    #[inline]
    pub fn knrc(&self) -> f64 {
        self.knrc
    }

    #[inline]
    pub fn bpi(&self) -> f64 {
        self.bpi
    }
}

mod check {
    use super::*;

    #[inline]
    pub fn non_zero(value: u32, message: &'static str) -> Result<(), ValidationError> {
        if value == 0 {
            return Err(ValidationError(message));
        }
        Ok(())
    }

    #[inline]
    pub fn finite(value: f64, message: &'static str) -> Result<(), ValidationError> {
        if !value.is_finite() {
            return Err(ValidationError(message));
        }
        Ok(())
    }

    #[inline]
    pub fn range(
        value: f64,
        range: RangeInclusive<f64>,
        message: &'static str,
    ) -> Result<(), ValidationError> {
        if !range.contains(&value) {
            return Err(ValidationError(message));
        }
        Ok(())
    }

    /// Converts an update frequency into the period between updates.
    ///
    /// Timestamps have microsecond resolution so shorter periods are rejected.
    #[inline]
    pub fn interval(w: f64) -> Option<Duration> {
        if !(w.is_finite() && w > 0.0) {
            return None;
        }

        Duration::try_from_secs_f64(1.0 / w)
            .ok()
            .filter(|interval| *interval >= Duration::from_micros(1))
    }

    #[inline]
    pub fn frequency(w: f64) -> Result<(), ValidationError> {
        interval(w)
            .map(|_| ())
            .ok_or(ValidationError("w must be between 0 and 1MHz"))
    }
}
