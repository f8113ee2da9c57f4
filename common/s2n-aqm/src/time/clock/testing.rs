// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use crate::time::{Duration, Timestamp};

/// A manually driven clock for tests and simulations
#[derive(Clone, Copy, Debug)]
pub struct Clock(Timestamp);

impl Default for Clock {
    fn default() -> Self {
        Self(Timestamp::from_duration(Duration::from_micros(1)))
    }
}

impl super::Clock for Clock {
    fn get_time(&self) -> Timestamp {
        self.0
    }
}

impl Clock {
    pub fn inc_by(&mut self, duration: Duration) {
        self.0 += duration;
    }

    /// Moves the clock forward to `target`; earlier targets are ignored
    pub fn advance_to(&mut self, target: Timestamp) {
        self.0 = self.0.max(target);
    }
}
