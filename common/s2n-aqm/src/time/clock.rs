// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use crate::time::timestamp::Timestamp;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

/// Anything that can report the current [`Timestamp`].
///
/// The controller never reads a clock itself; callers pass the time into every
/// operation. This trait lets drivers and tests share a time source.
pub trait Clock {
    fn get_time(&self) -> Timestamp;
}

/// A fixed point in time is a clock that never advances
impl Clock for Timestamp {
    #[inline]
    fn get_time(&self) -> Timestamp {
        *self
    }
}
