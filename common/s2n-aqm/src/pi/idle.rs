// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use crate::time::Timestamp;
use core::time::Duration;

/// Tracks how long the queue sat empty between two probability updates.
///
/// The queue becomes idle when a dequeue finds it empty and busy again when
/// the next item is stored. Only the self-tuning controller consumes the
/// accumulated idle time, but the bookkeeping runs for every controller.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Tracker {
    /// Set while idle; the start of the open idle interval
    idle_start: Option<Timestamp>,
    /// Idle time accumulated since the last update
    idle_time: Duration,
}

impl Tracker {
    #[inline]
    pub fn is_idle(&self) -> bool {
        self.idle_start.is_some()
    }

    /// Idle time accumulated since the last update, excluding any open interval
    #[inline]
    pub fn idle_time(&self) -> Duration {
        self.idle_time
    }

    /// Called when a dequeue finds the queue empty
    #[inline]
    pub fn on_empty(&mut self, now: Timestamp) {
        // repeated polls of an empty queue keep the original start
        if self.idle_start.is_none() {
            self.idle_start = Some(now);
        }
    }

    /// Called when an item is stored in the queue
    #[inline]
    pub fn on_stored(&mut self, now: Timestamp) {
        if let Some(idle_start) = self.idle_start.take() {
            self.idle_time += now.saturating_duration_since(idle_start);
        }
    }

    /// Returns the idle time accumulated up to `now` and starts a new period.
    ///
    /// An open idle interval is split at `now` so each period is only credited
    /// with the idle time that fell inside it.
    #[inline]
    pub fn take(&mut self, now: Timestamp) -> Duration {
        if let Some(idle_start) = self.idle_start.as_mut() {
            self.idle_time += now.saturating_duration_since(*idle_start);
            *idle_start = now;
        }

        core::mem::take(&mut self.idle_time)
    }
}
