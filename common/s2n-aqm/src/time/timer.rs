// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use crate::time::timestamp::Timestamp;
use core::{task::Poll, time::Duration};

/// A periodic timer owned by the component it drives.
///
/// The timer is never registered with an external scheduler. The owner reports
/// [`Timer::next_expiration`] to its event loop and calls [`Timer::poll`] when
/// that time arrives. Every expiration re-arms the timer one period after the
/// time it was polled, so a late poll shifts the schedule and missed periods
/// are not replayed.
///
/// Note: The timer doesn't implement Copy to ensure it isn't accidentally moved
///       and have the expiration discarded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Timer {
    period: Duration,
    expiration: Option<Timestamp>,
}

impl Timer {
    /// Creates a stopped timer
    #[inline]
    pub const fn new(period: Duration) -> Self {
        Self {
            period,
            expiration: None,
        }
    }

    /// Arms the timer to expire one period after `now`, replacing any pending
    /// expiration
    #[inline]
    pub fn start(&mut self, now: Timestamp) {
        self.expiration = Some(now + self.period);
    }

    /// Disarms the timer until the next [`Timer::start`]
    #[inline]
    pub fn stop(&mut self) {
        self.expiration = None;
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.expiration.is_some()
    }

    /// Returns the time the timer will fire, if running
    #[inline]
    pub fn next_expiration(&self) -> Option<Timestamp> {
        self.expiration
    }

    /// Returns `Ready` once per expiration and re-arms the timer from `now`
    #[inline]
    pub fn poll(&mut self, now: Timestamp) -> Poll<()> {
        match self.expiration {
            Some(expiration) if expiration.has_elapsed(now) => {
                self.start(now);
                Poll::Ready(())
            }
            _ => Poll::Pending,
        }
    }
}
