// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Proportional Integral (PI) active queue management.
//!
//! A [`pi::Controller`] sits in front of a bounded [`queue::Queue`] and decides
//! for every arriving item whether it is stored, dropped, or marked with
//! Explicit Congestion Notification. A drop probability is recomputed on a
//! fixed period so that the average occupancy settles around a reference
//! level. The controller is driven entirely by its owner: every operation
//! receives the current [`time::Timestamp`] and no I/O or scheduling happens
//! inside the crate.

#![cfg_attr(not(any(test, feature = "std")), no_std)]

#[cfg(feature = "alloc")]
extern crate alloc;

#[cfg(feature = "event-tracing")]
#[doc(hidden)]
pub use tracing::debug as _debug;

#[cfg(not(feature = "event-tracing"))]
#[macro_export]
#[doc(hidden)]
macro_rules! __tracing_noop__ {
    ($($fmt:tt)*) => {};
}

#[cfg(not(feature = "event-tracing"))]
#[doc(hidden)]
pub use crate::__tracing_noop__ as _debug;

pub mod config;
pub mod event;
pub mod pi;
pub mod queue;
pub mod random;
pub mod time;

pub use config::Config;
