// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Events emitted by a queue discipline.
//!
//! A [`Subscriber`] is owned by the controller and receives every drop, mark
//! and probability update as it happens. All methods have empty default
//! implementations so subscribers only implement what they observe.

use crate::{config::Algorithm, time::Timestamp};

#[cfg(feature = "event-tracing")]
pub mod tracing;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum DropReason {
    /// The item would have exceeded the queue limit
    Forced,
    /// The item was chosen by the drop probability
    Unforced,
    /// The internal queue refused the item
    Overflow,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum MarkReason {
    Forced,
    Unforced,
}

#[derive(Clone, Copy, Debug, PartialEq)]
#[non_exhaustive]
pub struct ItemDropped {
    pub reason: DropReason,
    /// The size of the dropped item in bytes
    pub len: usize,
    /// The occupancy of the queue when the item arrived
    pub occupancy: u64,
    pub drop_probability: f64,
    pub timestamp: Timestamp,
}

#[derive(Clone, Copy, Debug, PartialEq)]
#[non_exhaustive]
pub struct ItemMarked {
    pub reason: MarkReason,
    pub len: usize,
    pub occupancy: u64,
    pub drop_probability: f64,
    pub timestamp: Timestamp,
}

#[derive(Clone, Copy, Debug, PartialEq)]
#[non_exhaustive]
pub struct ProbabilityUpdated {
    pub algorithm: Algorithm,
    /// The occupancy sampled for this update
    pub occupancy: u64,
    pub previous: f64,
    pub drop_probability: f64,
    pub timestamp: Timestamp,
}

pub trait Subscriber {
    #[inline]
    fn on_item_dropped(&mut self, event: &ItemDropped) {
        let _ = event;
    }

    #[inline]
    fn on_item_marked(&mut self, event: &ItemMarked) {
        let _ = event;
    }

    #[inline]
    fn on_probability_updated(&mut self, event: &ProbabilityUpdated) {
        let _ = event;
    }
}

impl Subscriber for () {}

impl<A: Subscriber, B: Subscriber> Subscriber for (A, B) {
    #[inline]
    fn on_item_dropped(&mut self, event: &ItemDropped) {
        self.0.on_item_dropped(event);
        self.1.on_item_dropped(event);
    }

    #[inline]
    fn on_item_marked(&mut self, event: &ItemMarked) {
        self.0.on_item_marked(event);
        self.1.on_item_marked(event);
    }

    #[inline]
    fn on_probability_updated(&mut self, event: &ProbabilityUpdated) {
        self.0.on_probability_updated(event);
        self.1.on_probability_updated(event);
    }
}

impl<T: Subscriber> Subscriber for &mut T {
    #[inline]
    fn on_item_dropped(&mut self, event: &ItemDropped) {
        (**self).on_item_dropped(event);
    }

    #[inline]
    fn on_item_marked(&mut self, event: &ItemMarked) {
        (**self).on_item_marked(event);
    }

    #[inline]
    fn on_probability_updated(&mut self, event: &ProbabilityUpdated) {
        (**self).on_probability_updated(event);
    }
}

#[cfg(any(test, feature = "testing"))]
pub mod testing {
    use super::*;
    use std::vec::Vec;

    /// Records every event it receives
    #[derive(Debug, Default)]
    pub struct Subscriber {
        pub dropped: Vec<ItemDropped>,
        pub marked: Vec<ItemMarked>,
        pub updates: Vec<ProbabilityUpdated>,
    }

    impl super::Subscriber for Subscriber {
        fn on_item_dropped(&mut self, event: &ItemDropped) {
            self.dropped.push(*event);
        }

        fn on_item_marked(&mut self, event: &ItemMarked) {
            self.marked.push(*event);
        }

        fn on_probability_updated(&mut self, event: &ProbabilityUpdated) {
            self.updates.push(*event);
        }
    }
}
