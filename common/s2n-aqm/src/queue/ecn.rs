// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

#[cfg(any(test, feature = "generator"))]
use bolero_generator::prelude::*;

/// The ECN codepoint carried in the two low bits of the IP traffic class
/// (RFC 3168, section 5)
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(any(test, feature = "generator"), derive(TypeGenerator))]
pub enum ExplicitCongestionNotification {
    /// The transport is not using ECN
    #[default]
    NotEct = 0b00,
    /// ECN capable transport, codepoint 1
    Ect1 = 0b01,
    /// ECN capable transport, codepoint 0
    Ect0 = 0b10,
    /// Congestion experienced
    Ce = 0b11,
}

impl ExplicitCongestionNotification {
    /// Returns true if the sender negotiated ECN
    #[inline]
    pub fn using_ecn(self) -> bool {
        self != Self::NotEct
    }

    #[inline]
    pub fn congestion_experienced(self) -> bool {
        self == Self::Ce
    }

    /// Sets the codepoint to CE if the transport is ECN capable.
    ///
    /// Returns false for Not-ECT traffic, which must be dropped instead.
    #[inline]
    pub fn mark(&mut self) -> bool {
        if !self.using_ecn() {
            return false;
        }

        *self = Self::Ce;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mark_test() {
        bolero::check!()
            .with_type::<ExplicitCongestionNotification>()
            .cloned()
            .for_each(|mut ecn| {
                let capable = ecn.using_ecn();
                assert_eq!(ecn.mark(), capable);
                assert_eq!(ecn.congestion_experienced(), capable);
            });
    }
}
