// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use super::{Item, Queue, QueueSize, Unit};
use alloc::collections::VecDeque;

/// A drop-tail FIFO bounded in packets or bytes
#[derive(Clone, Debug)]
pub struct Fifo<I> {
    items: VecDeque<I>,
    bytes: u64,
    max_size: QueueSize,
}

impl<I: Item> Fifo<I> {
    pub fn new(max_size: QueueSize) -> Self {
        Self {
            items: VecDeque::new(),
            bytes: 0,
            max_size,
        }
    }

    #[inline]
    pub fn max_size(&self) -> QueueSize {
        self.max_size
    }

    /// The number of items currently stored
    #[inline]
    pub fn packets(&self) -> u64 {
        self.items.len() as u64
    }

    /// The number of bytes currently stored
    #[inline]
    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    #[inline]
    fn invariants(&self) {
        if cfg!(debug_assertions) {
            let bytes: u64 = self.items.iter().map(|item| item.len() as u64).sum();
            assert_eq!(bytes, self.bytes);
            assert!(self.occupancy() <= self.max_size.value);
        }
    }
}

impl<I: Item> From<QueueSize> for Fifo<I> {
    #[inline]
    fn from(max_size: QueueSize) -> Self {
        Self::new(max_size)
    }
}

impl<I: Item> Queue for Fifo<I> {
    type Item = I;

    #[inline]
    fn unit(&self) -> Unit {
        self.max_size.unit
    }

    #[inline]
    fn occupancy(&self) -> u64 {
        match self.max_size.unit {
            Unit::Packets => self.packets(),
            Unit::Bytes => self.bytes,
        }
    }

    #[inline]
    fn push(&mut self, item: I) -> Result<(), I> {
        let size = item.size_in(self.max_size.unit);

        if self.occupancy().saturating_add(size) > self.max_size.value {
            return Err(item);
        }

        self.bytes += item.len() as u64;
        self.items.push_back(item);
        self.invariants();

        Ok(())
    }

    #[inline]
    fn pop(&mut self) -> Option<I> {
        let item = self.items.pop_front()?;
        self.bytes -= item.len() as u64;
        self.invariants();
        Some(item)
    }

    #[inline]
    fn peek(&self) -> Option<&I> {
        self.items.front()
    }

    #[inline]
    fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
