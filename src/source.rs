use std::collections::{BTreeMap, HashMap, VecDeque};

use crate::errors::StreamError;
use crate::identity::MessageIdentity;

/// A record read from the upstream log.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct StreamMessage {
    pub identity: MessageIdentity,
    pub payload: Vec<u8>,
}

impl StreamMessage {
    pub fn new(partition: i32, offset: i64, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            identity: MessageIdentity::new(partition, offset),
            payload: payload.into(),
        }
    }
}

/// Result of a single, bounded-time poll of a [`PartitionCursor`].
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Polled {
    /// The next message of the partition.
    Message(StreamMessage),

    /// Nothing available within the cursor's poll timeout: try again later.
    ///
    /// This is the steady state of a caught-up consumer, not an error.
    Timeout,
}

/// Lazy, per-partition sequence of messages.
///
/// Messages of one cursor must come out in offset order.
pub trait PartitionCursor {
    /// Polls for the next message, waiting at most the cursor's own (short) timeout.
    ///
    /// A genuine I/O or protocol failure is returned as `Err`.
    fn poll(&mut self) -> Result<Polled, StreamError>;
}

/// The upstream partitioned log.
pub trait StreamSource {
    type Cursor: PartitionCursor;

    /// Opens one cursor per partition of `topic`.
    ///
    /// A topic with no partitions yields an empty [`Vec`].
    fn create_cursors(&mut self, topic: &str) -> Result<Vec<Self::Cursor>, StreamError>;
}

/// One scripted outcome of a [`MemoryCursor`].
#[derive(Debug, Clone, Eq, PartialEq)]
enum Step {
    Message(StreamMessage),
    Timeout,
    Fail(String),
}

/// In-memory [`StreamSource`], driven by a per-partition script.
///
/// Each partition is a queue of steps: a message, a timeout or a failure.
/// Once a partition has played its script out, its cursor answers [`Polled::Timeout`] forever,
/// like a consumer that caught up with the log.
///
/// Useful to dry-run a framework against a [`BoundedDeliveryBuffer`] without a broker.
///
/// [`BoundedDeliveryBuffer`]: crate::BoundedDeliveryBuffer
#[derive(Debug, Default)]
pub struct MemoryStream {
    topics: HashMap<String, BTreeMap<i32, VecDeque<Step>>>,
}

impl MemoryStream {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes sure `topic` has a `partition`, even if it never yields anything.
    pub fn with_partition(mut self, topic: &str, partition: i32) -> Self {
        self.script(topic, partition);
        self
    }

    /// Appends a message at the next offset position of `partition`'s script.
    pub fn push_message(&mut self, topic: &str, partition: i32, offset: i64, payload: impl Into<Vec<u8>>) {
        self.script(topic, partition)
            .push_back(Step::Message(StreamMessage::new(partition, offset, payload)));
    }

    /// Appends a poll timeout to `partition`'s script.
    pub fn push_timeout(&mut self, topic: &str, partition: i32) {
        self.script(topic, partition).push_back(Step::Timeout);
    }

    /// Appends a stream failure to `partition`'s script.
    pub fn push_failure(&mut self, topic: &str, partition: i32, reason: impl Into<String>) {
        self.script(topic, partition).push_back(Step::Fail(reason.into()));
    }

    fn script(&mut self, topic: &str, partition: i32) -> &mut VecDeque<Step> {
        self.topics.entry(topic.to_owned()).or_default().entry(partition).or_default()
    }
}

impl StreamSource for MemoryStream {
    type Cursor = MemoryCursor;

    /// Hands each partition's script over to its cursor, in partition order.
    ///
    /// Calling this twice for the same topic yields cursors with empty scripts.
    fn create_cursors(&mut self, topic: &str) -> Result<Vec<MemoryCursor>, StreamError> {
        let cursors = match self.topics.get_mut(topic) {
            None => Vec::new(),
            Some(partitions) => partitions
                .iter_mut()
                .map(|(partition, steps)| MemoryCursor {
                    partition: *partition,
                    steps: std::mem::take(steps),
                })
                .collect(),
        };

        Ok(cursors)
    }
}

/// [`PartitionCursor`] created by [`MemoryStream`].
#[derive(Debug)]
pub struct MemoryCursor {
    partition: i32,
    steps: VecDeque<Step>,
}

impl MemoryCursor {
    pub fn partition(&self) -> i32 {
        self.partition
    }
}

impl PartitionCursor for MemoryCursor {
    fn poll(&mut self) -> Result<Polled, StreamError> {
        match self.steps.pop_front() {
            Some(Step::Message(message)) => Ok(Polled::Message(message)),
            Some(Step::Timeout) | None => Ok(Polled::Timeout),
            Some(Step::Fail(reason)) => Err(StreamError::new(self.partition, reason)),
        }
    }
}
