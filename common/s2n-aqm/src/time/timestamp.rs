// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use core::{fmt, num::NonZeroU64, time::Duration};

/// An absolute point in time, measured in microseconds from an arbitrary epoch.
///
/// The value is never zero, which keeps `Option<Timestamp>` the same size as
/// `Timestamp`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(NonZeroU64);

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let duration = self.as_duration();
        let micros = duration.subsec_micros();
        let secs = duration.as_secs() % 60;
        let mins = duration.as_secs() / 60 % 60;
        let hours = duration.as_secs() / 60 / 60;
        if micros != 0 {
            write!(f, "{hours}:{mins:02}:{secs:02}.{micros:06}")
        } else {
            write!(f, "{hours}:{mins:02}:{secs:02}")
        }
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl Timestamp {
    /// Creates a `Timestamp` from a `Duration` since the epoch.
    ///
    /// Sub-microsecond precision is discarded. A zero duration is rounded up to
    /// a single microsecond.
    #[inline]
    pub fn from_duration(duration: Duration) -> Self {
        let micros = duration.as_micros().min(u64::MAX as u128) as u64;
        Self(NonZeroU64::new(micros).unwrap_or(NonZeroU64::MIN))
    }

    /// Returns the `Duration` since the epoch
    #[inline]
    pub const fn as_duration(self) -> Duration {
        Duration::from_micros(self.0.get())
    }

    /// Returns true if `self` is at or before `current_time`
    #[inline]
    pub fn has_elapsed(self, current_time: Self) -> bool {
        self <= current_time
    }

    /// Returns the amount of time elapsed since `earlier`, saturating to zero
    #[inline]
    pub fn saturating_duration_since(self, earlier: Self) -> Duration {
        self.as_duration().saturating_sub(earlier.as_duration())
    }

    #[inline]
    pub fn checked_add(self, duration: Duration) -> Option<Self> {
        self.as_duration()
            .checked_add(duration)
            .map(Self::from_duration)
    }
}

impl core::ops::Add<Duration> for Timestamp {
    type Output = Timestamp;

    #[inline]
    fn add(self, rhs: Duration) -> Self::Output {
        Self::from_duration(self.as_duration() + rhs)
    }
}

impl core::ops::AddAssign<Duration> for Timestamp {
    #[inline]
    fn add_assign(&mut self, rhs: Duration) {
        *self = *self + rhs;
    }
}

impl core::ops::Sub for Timestamp {
    type Output = Duration;

    #[inline]
    fn sub(self, rhs: Timestamp) -> Self::Output {
        self.as_duration() - rhs.as_duration()
    }
}

impl core::ops::Sub<Duration> for Timestamp {
    type Output = Timestamp;

    #[inline]
    fn sub(self, rhs: Duration) -> Self::Output {
        Self::from_duration(self.as_duration() - rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_rounds_up() {
        let ts = Timestamp::from_duration(Duration::ZERO);
        assert_eq!(ts.as_duration(), Duration::from_micros(1));
    }

    #[test]
    fn arithmetic_test() {
        let start = Timestamp::from_duration(Duration::from_secs(1));
        let later = start + Duration::from_millis(250);

        assert_eq!(later - start, Duration::from_millis(250));
        assert_eq!(start.saturating_duration_since(later), Duration::ZERO);
        assert!(start.has_elapsed(later));
        assert!(!later.has_elapsed(start));
    }

    #[test]
    fn debug_format_test() {
        let ts = Timestamp::from_duration(Duration::from_secs(3_723) + Duration::from_micros(5));
        assert_eq!(format!("{ts:?}"), "1:02:03.000005");
        let ts = Timestamp::from_duration(Duration::from_secs(59));
        assert_eq!(format!("{ts}"), "0:00:59");
    }
}
