// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! A Proportional Integral controller for active queue management.
//!
//! The controller keeps the occupancy of a queue near `queue_ref` by
//! adjusting the probability with which arriving items are dropped (or
//! marked) before the queue is full. The probability is recomputed every
//! `1 / w` seconds, either with fixed gains ([`Algorithm::Classic`]) or with
//! gains re-derived from the measured link capacity
//! ([`Algorithm::SelfTuning`]).
//!
//! The classic controller follows "On Designing Improved Controllers for AQM
//! Routers Supporting TCP Flows" (Hollot, Misra, Towsley, Gong; INFOCOM 2001).

use crate::{
    config::{Algorithm, Config, ValidationError},
    event::{self, DropReason, MarkReason},
    queue::{Item, Queue, QueueSize, Unit},
    random,
    time::{Timer, Timestamp},
};
use core::time::Duration;

mod idle;
mod self_tuning;

pub use self_tuning::Estimates;
use self_tuning::{Period, Sample, SelfTuning};

#[cfg(test)]
mod fuzz_target;
#[cfg(test)]
mod simulation;

/// The result of offering an item to the controller
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// The item was stored
    Accepted,
    /// The item would have exceeded the queue limit and was dropped
    ForcedDrop,
    /// The item would have exceeded the queue limit and was marked instead
    ForcedMark,
    /// The item was dropped early by the drop probability
    UnforcedDrop,
    /// The item was selected by the drop probability and was marked instead
    UnforcedMark,
}

impl Outcome {
    /// Returns true if the item ended up in the queue
    #[inline]
    pub fn is_accepted(self) -> bool {
        !self.is_drop()
    }

    #[inline]
    pub fn is_drop(self) -> bool {
        matches!(self, Self::ForcedDrop | Self::UnforcedDrop)
    }

    #[inline]
    pub fn is_mark(self) -> bool {
        matches!(self, Self::ForcedMark | Self::UnforcedMark)
    }

    #[inline]
    pub fn is_forced(self) -> bool {
        matches!(self, Self::ForcedDrop | Self::ForcedMark)
    }
}

/// Counters of the congestion signals the controller has sent
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Stats {
    /// Items dropped because the queue limit would have been exceeded
    pub forced_drop: u64,
    /// Items dropped early by the drop probability
    pub unforced_drop: u64,
    pub forced_mark: u64,
    pub unforced_mark: u64,
}

impl Stats {
    #[inline]
    pub fn drops(&self) -> u64 {
        self.forced_drop + self.unforced_drop
    }

    #[inline]
    pub fn marks(&self) -> u64 {
        self.forced_mark + self.unforced_mark
    }
}

/// Reasons a queue discipline refuses its composition
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum CheckError {
    #[error("a PI queue disc cannot have classes")]
    HasClasses,
    #[error("a PI queue disc cannot have packet filters")]
    HasPacketFilters,
    #[error("a PI queue disc needs exactly 1 internal queue, found {0}")]
    InvalidInternalQueueCount(usize),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Check(#[from] CheckError),
}

/// How the drop probability is derived. Chosen once, at construction.
#[derive(Clone, Debug)]
enum Variant {
    Classic,
    SelfTuning(SelfTuning),
}

/// Bookkeeping shared by both variants
#[derive(Clone, Debug, Default)]
struct State {
    drop_prob: f64,
    /// The occupancy sampled by the previous update
    q_old: u64,
    /// Items dequeued since the previous update
    departed_packets: u64,
    idle: idle::Tracker,
    stats: Stats,
}

/// Assembles a [`Controller`] and checks that its composition is supported
pub struct Builder<Q, R, S = ()> {
    config: Config,
    random: R,
    subscriber: S,
    queue: Option<Q>,
    internal_queues: usize,
    classes: usize,
    packet_filters: usize,
}

impl<Q, R> Builder<Q, R> {
    pub fn new(config: Config, random: R) -> Self {
        Self {
            config,
            random,
            subscriber: (),
            queue: None,
            internal_queues: 0,
            classes: 0,
            packet_filters: 0,
        }
    }
}

impl<Q, R, S> Builder<Q, R, S> {
    pub fn with_subscriber<T: event::Subscriber>(self, subscriber: T) -> Builder<Q, R, T> {
        Builder {
            config: self.config,
            random: self.random,
            subscriber,
            queue: self.queue,
            internal_queues: self.internal_queues,
            classes: self.classes,
            packet_filters: self.packet_filters,
        }
    }

    /// Attaches an internal queue. Only the first queue is kept; attaching
    /// more than one fails [`Builder::check`].
    pub fn with_internal_queue(mut self, queue: Q) -> Self {
        if self.queue.is_none() {
            self.queue = Some(queue);
        }
        self.internal_queues += 1;
        self
    }

    /// Attaches a child class. Classes are not supported by this discipline.
    pub fn with_class(mut self) -> Self {
        self.classes += 1;
        self
    }

    /// Attaches a packet filter. Filters are not supported by this discipline.
    pub fn with_packet_filter(mut self) -> Self {
        self.packet_filters += 1;
        self
    }

    /// Checks the composition of the queue discipline.
    ///
    /// Having no internal queue is allowed; [`Builder::build`] creates one
    /// bounded by [`Config::max_size`].
    pub fn check(&self) -> Result<(), CheckError> {
        if self.classes > 0 {
            return Err(CheckError::HasClasses);
        }

        if self.packet_filters > 0 {
            return Err(CheckError::HasPacketFilters);
        }

        if self.internal_queues > 1 {
            return Err(CheckError::InvalidInternalQueueCount(self.internal_queues));
        }

        Ok(())
    }

    pub fn build(self, now: Timestamp) -> Result<Controller<Q, R, S>, Error>
    where
        Q: Queue + From<QueueSize>,
        R: random::Generator,
        S: event::Subscriber,
    {
        self.config.validate()?;
        self.check()?;

        let queue = self
            .queue
            .unwrap_or_else(|| Q::from(self.config.max_size()));

        Ok(Controller::new(
            self.config,
            queue,
            self.random,
            self.subscriber,
            now,
        ))
    }
}

/// A PI active queue management controller in front of a queue `Q`
#[derive(Debug)]
pub struct Controller<Q, R, S = ()> {
    config: Config,
    queue: Q,
    random: R,
    subscriber: S,
    variant: Variant,
    state: State,
    update_timer: Timer,
}

impl<Q, R, S> Controller<Q, R, S>
where
    Q: Queue,
    R: random::Generator,
    S: event::Subscriber,
{
    fn new(config: Config, queue: Q, random: R, subscriber: S, now: Timestamp) -> Self {
        let mut controller = Self {
            config,
            queue,
            random,
            subscriber,
            variant: Variant::Classic,
            state: State::default(),
            update_timer: Timer::new(config.update_interval()),
        };
        controller.reset(now);
        controller
    }

    /// Returns all controller state to its initial values and restarts the
    /// periodic update. Items already in the queue are kept.
    pub fn reset(&mut self, now: Timestamp) {
        self.state = State::default();
        self.variant = match self.config.algorithm() {
            Algorithm::Classic => Variant::Classic,
            Algorithm::SelfTuning => Variant::SelfTuning(SelfTuning::new(&self.config, now)),
        };
        self.update_timer = Timer::new(self.config.update_interval());
        self.update_timer.start(now);
    }

    /// Stops the periodic update. The controller keeps admitting items with
    /// the last computed drop probability.
    #[inline]
    pub fn close(&mut self) {
        self.update_timer.stop();
    }

    /// Offers an item to the queue
    pub fn enqueue(&mut self, mut item: Q::Item, now: Timestamp) -> Outcome {
        let unit = self.queue.unit();
        let occupancy = self.queue.occupancy();
        let limit = self.config.queue_limit();
        let size = item.size_in(unit);

        // Drops due to the queue limit are reactive and don't depend on the
        // drop probability
        if occupancy >= limit || occupancy.saturating_add(size) > limit {
            if self.config.use_ecn() && item.try_mark() {
                return self.store(item, Some(MarkReason::Forced), occupancy, now);
            }
            return self.drop_item(item, DropReason::Forced, occupancy, now);
        }

        if self.drop_early(&item, unit) {
            if self.config.use_ecn() && item.try_mark() {
                return self.store(item, Some(MarkReason::Unforced), occupancy, now);
            }
            return self.drop_item(item, DropReason::Unforced, occupancy, now);
        }

        self.store(item, None, occupancy, now)
    }

    /// Removes the item at the front of the queue
    pub fn dequeue(&mut self, now: Timestamp) -> Option<Q::Item> {
        match self.queue.pop() {
            Some(item) => {
                self.state.departed_packets += 1;
                Some(item)
            }
            None => {
                self.state.idle.on_empty(now);
                None
            }
        }
    }

    /// Returns the item at the front of the queue without removing it
    #[inline]
    pub fn peek(&self) -> Option<&Q::Item> {
        self.queue.peek()
    }

    /// Runs the periodic probability update if it is due
    pub fn on_timeout(&mut self, now: Timestamp) {
        if self.update_timer.poll(now).is_ready() {
            self.update_probability(now);
        }
    }

    /// The time of the next probability update, or `None` once closed
    #[inline]
    pub fn next_expiration(&self) -> Option<Timestamp> {
        self.update_timer.next_expiration()
    }

    /// Re-seeds the random source with `stream`.
    ///
    /// Returns the number of streams that were consumed, which is always 1.
    pub fn assign_streams(&mut self, stream: u64) -> u64 {
        self.random.set_stream(stream);
        1
    }

    /// Changes the limit used for forced drops
    #[inline]
    pub fn set_queue_limit(&mut self, limit: u64) {
        self.config = self.config.with_queue_limit(limit);
    }

    #[inline]
    pub fn stats(&self) -> Stats {
        self.state.stats
    }

    #[inline]
    pub fn drop_probability(&self) -> f64 {
        self.state.drop_prob
    }

    /// The occupancy sampled by the most recent update
    #[inline]
    pub fn q_old(&self) -> u64 {
        self.state.q_old
    }

    /// Items dequeued since the most recent update
    #[inline]
    pub fn departed_packets(&self) -> u64 {
        self.state.departed_packets
    }

    /// Idle time accumulated since the most recent update, excluding an
    /// interval that is still open
    #[inline]
    pub fn idle_time(&self) -> Duration {
        self.state.idle.idle_time()
    }

    #[inline]
    pub fn is_idle(&self) -> bool {
        self.state.idle.is_idle()
    }

    /// The self-tuning estimates, if the controller uses [`Algorithm::SelfTuning`]
    #[inline]
    pub fn estimates(&self) -> Option<&Estimates> {
        match &self.variant {
            Variant::Classic => None,
            Variant::SelfTuning(stpi) => Some(stpi.estimates()),
        }
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[inline]
    pub fn queue(&self) -> &Q {
        &self.queue
    }

    #[inline]
    pub fn subscriber(&self) -> &S {
        &self.subscriber
    }

    #[inline]
    fn drop_early(&mut self, item: &Q::Item, unit: Unit) -> bool {
        let mut p = self.state.drop_prob;

        if unit == Unit::Bytes {
            p = p * item.len() as f64 / self.config.mean_pkt_size() as f64;
        }
        let p = p.min(1.0);

        let u = random::gen_unit(&mut self.random);

        u <= p
    }

    fn store(
        &mut self,
        item: Q::Item,
        mark: Option<MarkReason>,
        occupancy: u64,
        now: Timestamp,
    ) -> Outcome {
        let len = item.len();

        if let Err(item) = self.queue.push(item) {
            return self.drop_item(item, DropReason::Overflow, occupancy, now);
        }

        self.state.idle.on_stored(now);

        let Some(reason) = mark else {
            return Outcome::Accepted;
        };

        let outcome = match reason {
            MarkReason::Forced => {
                self.state.stats.forced_mark += 1;
                Outcome::ForcedMark
            }
            MarkReason::Unforced => {
                self.state.stats.unforced_mark += 1;
                Outcome::UnforcedMark
            }
        };

        self.subscriber.on_item_marked(&event::ItemMarked {
            reason,
            len,
            occupancy,
            drop_probability: self.state.drop_prob,
            timestamp: now,
        });

        outcome
    }

    fn drop_item(
        &mut self,
        item: Q::Item,
        reason: DropReason,
        occupancy: u64,
        now: Timestamp,
    ) -> Outcome {
        let outcome = match reason {
            DropReason::Forced | DropReason::Overflow => {
                self.state.stats.forced_drop += 1;
                Outcome::ForcedDrop
            }
            DropReason::Unforced => {
                self.state.stats.unforced_drop += 1;
                Outcome::UnforcedDrop
            }
        };

        self.subscriber.on_item_dropped(&event::ItemDropped {
            reason,
            len: item.len(),
            occupancy,
            drop_probability: self.state.drop_prob,
            timestamp: now,
        });

        outcome
    }

    fn update_probability(&mut self, now: Timestamp) {
        let qlen = self.queue.occupancy();

        // byte counts are normalized to packets; queue_ref is used as configured
        let scale = match self.queue.unit() {
            Unit::Bytes => self.config.mean_pkt_size() as f64,
            Unit::Packets => 1.0,
        };

        let sample = Sample {
            qlen: qlen as f64 / scale,
            q_old: self.state.q_old as f64 / scale,
            q_ref: self.config.queue_ref(),
            drop_prob: self.state.drop_prob,
        };

        let period = Period {
            departed_packets: core::mem::take(&mut self.state.departed_packets),
            idle_time: self.state.idle.take(now),
            now,
        };

        let p = match &mut self.variant {
            Variant::Classic => classic(&self.config, &sample),
            Variant::SelfTuning(stpi) => match stpi.update(&sample, &period) {
                Some(p) => p,
                // gains are undefined until there is a positive drop
                // probability; the fixed gains move it off zero
                None => classic(&self.config, &sample),
            },
        };

        let previous = self.state.drop_prob;
        self.state.drop_prob = clamp_probability(p);
        self.state.q_old = qlen;

        self.subscriber
            .on_probability_updated(&event::ProbabilityUpdated {
                algorithm: self.config.algorithm(),
                occupancy: qlen,
                previous,
                drop_probability: self.state.drop_prob,
                timestamp: now,
            });
    }
}

#[cfg(feature = "alloc")]
impl<I: Item, R> Controller<crate::queue::Fifo<I>, R> {
    /// Returns a builder for a controller backed by a [`Fifo`](crate::queue::Fifo)
    pub fn builder(config: Config, random: R) -> Builder<crate::queue::Fifo<I>, R> {
        Builder::new(config, random)
    }
}

/// The classic PI update with fixed gains
#[inline]
fn classic(config: &Config, sample: &Sample) -> f64 {
    config.a() * (sample.qlen - sample.q_ref) - config.b() * (sample.q_old - sample.q_ref)
        + sample.drop_prob
}

#[inline]
fn clamp_probability(p: f64) -> f64 {
    if p.is_nan() {
        return 0.0;
    }
    p.clamp(0.0, 1.0)
}
