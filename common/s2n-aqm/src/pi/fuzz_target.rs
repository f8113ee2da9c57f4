// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use super::*;
use crate::{
    queue::{ecn::ExplicitCongestionNotification, testing::Packet, Fifo},
    time::{testing::Clock, Clock as _},
};
use bolero::{check, generator::*};
use std::collections::VecDeque;

#[derive(Debug, TypeGenerator)]
enum Operation {
    IncrementTime {
        /// The milli-second value by which to increase the timestamp
        millis: u16,
    },
    Enqueue {
        #[generator(1..=64)]
        count: u8,
        #[generator(0..=1500)]
        len: u16,
        ecn_capable: bool,
    },
    Dequeue {
        #[generator(1..=64)]
        count: u8,
    },
    /// Advances to the next update and runs it
    Timeout,
}

const QUEUE_LIMIT_PACKETS: u64 = 100;
const QUEUE_LIMIT_BYTES: u64 = 50_000;

struct Model<R: random::Generator> {
    /// The controller being fuzzed
    subject: Controller<Fifo<Packet>, R, event::testing::Subscriber>,
    /// The items the controller is expected to hold
    stored: VecDeque<Packet>,
    drops: u64,
    marks: u64,
    /// A monotonically increasing timestamp
    timestamp: Timestamp,
}

impl<R: random::Generator> Model<R> {
    fn new(config: Config, random: R) -> Self {
        let timestamp = Clock::default().get_time();

        // the storage is larger than the limit so every refusal is a limit drop
        let storage = match config.max_size().unit {
            Unit::Packets => QueueSize::packets(QUEUE_LIMIT_PACKETS * 2),
            Unit::Bytes => QueueSize::bytes(QUEUE_LIMIT_BYTES * 2),
        };

        let subject = Builder::new(config, random)
            .with_subscriber(event::testing::Subscriber::default())
            .with_internal_queue(Fifo::new(storage))
            .build(timestamp)
            .unwrap();

        Self {
            subject,
            stored: VecDeque::new(),
            drops: 0,
            marks: 0,
            timestamp,
        }
    }

    fn apply(&mut self, operation: &Operation) {
        match operation {
            Operation::IncrementTime { millis } => {
                self.timestamp += Duration::from_millis(*millis as u64);
            }
            Operation::Enqueue {
                count,
                len,
                ecn_capable,
            } => {
                for _ in 0..*count {
                    let item = if *ecn_capable {
                        Packet::ecn_capable(*len as usize)
                    } else {
                        Packet::new(*len as usize)
                    };
                    self.on_enqueue(item);
                }
            }
            Operation::Dequeue { count } => {
                for _ in 0..*count {
                    self.on_dequeue();
                }
            }
            Operation::Timeout => self.on_timeout(),
        }
    }

    fn on_enqueue(&mut self, item: Packet) {
        let queue = self.subject.queue();
        let unit = queue.unit();
        let occupancy = queue.occupancy();
        let limit = self.subject.config().queue_limit();
        let over_limit = occupancy >= limit || occupancy + item.size_in(unit) > limit;

        let outcome = self.subject.enqueue(item, self.timestamp);

        assert_eq!(outcome.is_forced(), over_limit, "{outcome:?}");

        if outcome.is_mark() {
            assert!(self.subject.config().use_ecn());
            assert!(item.ecn.using_ecn());
            self.marks += 1;
            self.stored.push_back(Packet {
                ecn: ExplicitCongestionNotification::Ce,
                ..item
            });
        } else if outcome.is_drop() {
            self.drops += 1;
        } else {
            self.stored.push_back(item);
        }
    }

    fn on_dequeue(&mut self) {
        let expected = self.stored.pop_front();
        assert_eq!(self.subject.dequeue(self.timestamp), expected);
        assert_eq!(self.subject.is_idle(), expected.is_none());
    }

    fn on_timeout(&mut self) {
        let Some(expiration) = self.subject.next_expiration() else {
            return;
        };
        self.timestamp = self.timestamp.max(expiration);

        let updates = self.subject.subscriber().updates.len();
        self.subject.on_timeout(self.timestamp);
        let events = &self.subject.subscriber().updates;

        assert_eq!(events.len(), updates + 1);
        assert_eq!(self.subject.q_old(), self.subject.queue().occupancy());
        assert_eq!(self.subject.departed_packets(), 0);
        assert_eq!(self.subject.idle_time(), Duration::ZERO);
    }

    fn invariants(&self) {
        let stats = self.subject.stats();
        assert_eq!(stats.drops(), self.drops);
        assert_eq!(stats.marks(), self.marks);
        assert_eq!(
            self.subject.subscriber().dropped.len() as u64,
            self.drops
        );

        let unit = self.subject.queue().unit();
        let occupancy: u64 = self.stored.iter().map(|item| item.size_in(unit)).sum();
        assert_eq!(self.subject.queue().occupancy(), occupancy);

        for update in self.subject.subscriber().updates.iter() {
            assert!((0.0..=1.0).contains(&update.drop_probability));
        }
        assert!((0.0..=1.0).contains(&self.subject.drop_probability()));
    }
}

fn config(bytes: bool, self_tuning: bool, ecn: bool) -> Config {
    let (limit, max_size) = if bytes {
        (QUEUE_LIMIT_BYTES, QueueSize::bytes(QUEUE_LIMIT_BYTES))
    } else {
        (QUEUE_LIMIT_PACKETS, QueueSize::packets(QUEUE_LIMIT_PACKETS))
    };
    let algorithm = if self_tuning {
        Algorithm::SelfTuning
    } else {
        Algorithm::Classic
    };

    Config::default()
        .with_queue_limit(limit)
        .with_max_size(max_size)
        .with_ecn(ecn)
        .with_algorithm(algorithm)
        // aggressive gains move the probability through its whole range
        .with_a(0.01)
        .unwrap()
        .with_b(0.009)
        .unwrap()
}

#[test]
#[cfg_attr(miri, ignore)]
fn classic_fuzz() {
    check!()
        .with_generator((0..255, gen::<bool>(), gen::<bool>(), gen::<Vec<Operation>>()))
        .for_each(|(seed, bytes, ecn, operations)| {
            let config = config(*bytes, false, *ecn);
            let mut model = Model::new(config, random::testing::Generator(*seed));

            for operation in operations.iter() {
                model.apply(operation);
            }

            model.invariants();
        });
}

#[test]
#[cfg_attr(miri, ignore)]
fn self_tuning_fuzz() {
    check!()
        .with_generator((0..255, gen::<bool>(), gen::<bool>(), gen::<Vec<Operation>>()))
        .for_each(|(seed, bytes, ecn, operations)| {
            let config = config(*bytes, true, *ecn);
            let mut model = Model::new(config, random::testing::Generator(*seed));

            for operation in operations.iter() {
                model.apply(operation);
            }

            model.invariants();
        });
}
