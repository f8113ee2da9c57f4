// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use super::*;

/// Emits every event through [`tracing`](::tracing)
///
/// Drops and marks are logged at `TRACE`, probability updates at `DEBUG`.
#[derive(Clone, Copy, Debug, Default)]
pub struct Subscriber {
    _private: (),
}

impl super::Subscriber for Subscriber {
    #[inline]
    fn on_item_dropped(&mut self, event: &ItemDropped) {
        ::tracing::trace!(
            target: "s2n_aqm::item_dropped",
            reason = ?event.reason,
            len = event.len,
            occupancy = event.occupancy,
            drop_probability = event.drop_probability,
            timestamp = %event.timestamp,
        );
    }

    #[inline]
    fn on_item_marked(&mut self, event: &ItemMarked) {
        ::tracing::trace!(
            target: "s2n_aqm::item_marked",
            reason = ?event.reason,
            len = event.len,
            occupancy = event.occupancy,
            drop_probability = event.drop_probability,
            timestamp = %event.timestamp,
        );
    }

    #[inline]
    fn on_probability_updated(&mut self, event: &ProbabilityUpdated) {
        ::tracing::debug!(
            target: "s2n_aqm::probability_updated",
            algorithm = ?event.algorithm,
            occupancy = event.occupancy,
            previous = event.previous,
            drop_probability = event.drop_probability,
            timestamp = %event.timestamp,
        );
    }
}
