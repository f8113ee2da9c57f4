// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use s2n_aqm::{queue::ecn::ExplicitCongestionNotification, queue::Item, time::Timestamp};

/// A simulated packet waiting at the bottleneck
#[derive(Clone, Copy, Debug)]
pub struct Packet {
    pub len: u16,
    pub ecn: ExplicitCongestionNotification,
    /// When the packet reached the bottleneck, used for the queueing delay
    pub arrival: Timestamp,
}

impl Item for Packet {
    #[inline]
    fn len(&self) -> usize {
        self.len as usize
    }

    #[inline]
    fn try_mark(&mut self) -> bool {
        self.ecn.mark()
    }
}
