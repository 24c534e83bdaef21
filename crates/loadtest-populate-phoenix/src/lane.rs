//! Bounded FIFO between one producer and one consumer.
//!
//! A [`Lane`] is created by the coordinator before any task starts. The
//! producer gets a [`LaneSender`], the consumer takes the single
//! [`LaneReceiver`]. Both waits are raced against a
//! [`CancellationToken`]; a cancelled wait returns
//! [`LaneError::Interrupted`] and the caller abandons the lane.
//!
//! The lane itself keeps a sender alive until it is dropped. A producer
//! that stops without sending [`LaneItem::Sentinel`] therefore leaves its
//! consumer waiting instead of seeing a closed channel; only cancellation
//! releases it.

use crate::error::LaneError;
use loadtest_generator::Row;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// A value travelling through a lane.
#[derive(Debug, Clone, PartialEq)]
pub enum LaneItem {
    Row(Row),
    /// No more rows on this lane. Sent once, always last.
    Sentinel,
}

/// One producer/consumer channel.
pub struct Lane {
    id: usize,
    capacity: usize,
    tx: mpsc::Sender<LaneItem>,
    rx: Option<mpsc::Receiver<LaneItem>>,
}

impl Lane {
    /// Create a lane holding at most `capacity` items.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero; `RunConfig::validate` rejects that.
    pub fn new(id: usize, capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity);
        Self {
            id,
            capacity,
            tx,
            rx: Some(rx),
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Sending half for the producer.
    pub fn sender(&self) -> LaneSender {
        LaneSender {
            lane_id: self.id,
            tx: self.tx.clone(),
        }
    }

    /// Receiving half for the consumer. Returns `None` once taken.
    pub fn take_receiver(&mut self) -> Option<LaneReceiver> {
        self.rx.take().map(|rx| LaneReceiver {
            lane_id: self.id,
            rx,
        })
    }

    /// Items currently queued.
    pub fn depth(&self) -> usize {
        self.capacity - self.tx.capacity()
    }
}

/// Producer side of a lane.
#[derive(Clone)]
pub struct LaneSender {
    lane_id: usize,
    tx: mpsc::Sender<LaneItem>,
}

impl LaneSender {
    pub fn lane_id(&self) -> usize {
        self.lane_id
    }

    /// Enqueue `item`, waiting while the lane is full.
    pub async fn put(&self, item: LaneItem, cancel: &CancellationToken) -> Result<(), LaneError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(LaneError::Interrupted),
            sent = self.tx.send(item) => sent.map_err(|_| LaneError::Closed),
        }
    }
}

/// Consumer side of a lane.
pub struct LaneReceiver {
    lane_id: usize,
    rx: mpsc::Receiver<LaneItem>,
}

impl LaneReceiver {
    pub fn lane_id(&self) -> usize {
        self.lane_id
    }

    /// Dequeue the next item, waiting while the lane is empty.
    pub async fn take(&mut self, cancel: &CancellationToken) -> Result<LaneItem, LaneError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(LaneError::Interrupted),
            item = self.rx.recv() => item.ok_or(LaneError::Closed),
        }
    }

    /// Items currently queued.
    pub fn depth(&self) -> usize {
        self.rx.len()
    }
}
