// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! The storage side of a queue discipline.
//!
//! The controller decides what is admitted; a [`Queue`] holds the admitted
//! items and reports how full it is.

pub mod ecn;
#[cfg(feature = "alloc")]
mod fifo;

#[cfg(any(test, feature = "generator"))]
use bolero_generator::prelude::*;

#[cfg(feature = "alloc")]
pub use fifo::Fifo;

/// The unit a queue is measured in
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[cfg_attr(any(test, feature = "generator"), derive(TypeGenerator))]
pub enum Unit {
    #[default]
    Packets,
    Bytes,
}

/// A size or limit paired with the unit it is expressed in
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct QueueSize {
    pub unit: Unit,
    pub value: u64,
}

impl QueueSize {
    #[inline]
    pub const fn packets(value: u64) -> Self {
        Self {
            unit: Unit::Packets,
            value,
        }
    }

    #[inline]
    pub const fn bytes(value: u64) -> Self {
        Self {
            unit: Unit::Bytes,
            value,
        }
    }
}

/// An item that can be stored in a [`Queue`]
pub trait Item {
    /// The size of the item in bytes
    fn len(&self) -> usize;

    /// Returns true if the item carries no payload
    #[inline]
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Signals congestion on the item instead of dropping it.
    ///
    /// Returns `true` if the item was marked. Items that do not support
    /// Explicit Congestion Notification return `false` and are dropped instead.
    #[inline]
    fn try_mark(&mut self) -> bool {
        false
    }

    /// Returns the size of the item in the given unit
    #[inline]
    fn size_in(&self, unit: Unit) -> u64 {
        match unit {
            Unit::Packets => 1,
            Unit::Bytes => self.len() as u64,
        }
    }
}

/// A bounded FIFO owned by a queue discipline
pub trait Queue {
    type Item: Item;

    /// The unit the queue is measured in
    fn unit(&self) -> Unit;

    /// The current occupancy, in [`Queue::unit`]
    fn occupancy(&self) -> u64;

    /// Appends an item to the back of the queue.
    ///
    /// If the queue cannot hold the item it is handed back to the caller.
    fn push(&mut self, item: Self::Item) -> Result<(), Self::Item>;

    /// Removes the item at the front of the queue
    fn pop(&mut self) -> Option<Self::Item>;

    /// Returns the item at the front of the queue without removing it
    fn peek(&self) -> Option<&Self::Item>;

    #[inline]
    fn is_empty(&self) -> bool {
        self.peek().is_none()
    }

    /// Returns the current occupancy paired with its unit
    #[inline]
    fn size(&self) -> QueueSize {
        QueueSize {
            unit: self.unit(),
            value: self.occupancy(),
        }
    }
}

#[cfg(any(test, feature = "testing"))]
pub mod testing {
    use super::ecn::ExplicitCongestionNotification;

    /// A payload-free packet with a byte length and an ECN codepoint
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct Packet {
        pub len: usize,
        pub ecn: ExplicitCongestionNotification,
    }

    impl Packet {
        pub fn new(len: usize) -> Self {
            Self {
                len,
                ecn: ExplicitCongestionNotification::NotEct,
            }
        }

        pub fn ecn_capable(len: usize) -> Self {
            Self {
                len,
                ecn: ExplicitCongestionNotification::Ect0,
            }
        }
    }

    impl super::Item for Packet {
        fn len(&self) -> usize {
            self.len
        }

        fn try_mark(&mut self) -> bool {
            self.ecn.mark()
        }
    }
}
