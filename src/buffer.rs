use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::config::{BufferConfig, FailPolicy};
use crate::errors::{SpoutBufferError, StreamError};
use crate::identity::MessageIdentity;
use crate::metrics::DeliveryMetrics;
use crate::source::{PartitionCursor, Polled, StreamSource};
use crate::utils::load_ratio;

/// A message handed out by [`BoundedDeliveryBuffer::next`].
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Delivery {
    pub identity: MessageIdentity,
    pub payload: Vec<u8>,

    /// How many times this message failed before this delivery (`0` on first delivery).
    pub redeliveries: u32,
}

/// A message removed from the buffer because it failed more times than [`FailPolicy`] allows.
///
/// Returned to the framework so it can log, drop or dead-letter it.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct EvictedMessage {
    pub identity: MessageIdentity,
    pub payload: Vec<u8>,
    pub failures: u32,
}

/// Result of [`BoundedDeliveryBuffer::fail`].
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum FailOutcome {
    /// Appended to the tail of the pending queue; `redelivery` counts from `1`.
    Requeued { redelivery: u32 },

    /// Redeliveries exhausted: the message is no longer in flight.
    Evicted(EvictedMessage),
}

#[derive(Debug)]
struct InFlight {
    payload: Vec<u8>,
    delivered: bool,
    failures: u32,
}

impl InFlight {
    fn new(payload: Vec<u8>) -> Self {
        Self {
            payload,
            delivered: false,
            failures: 0,
        }
    }
}

/// Bounded buffer between a partitioned log and a record-at-a-time, ack/fail consumer.
///
/// Every message pulled from the [`StreamSource`] stays in flight, and counts against
/// [`BufferConfig::capacity`], until it's acknowledged or evicted. That's what provides
/// backpressure towards the upstream log.
///
/// A message goes through:
///
/// ```text
/// absent -> pending -> delivered -> removed (acknowledge)
///                ^          |
///                |          +----> evicted (fail, redeliveries exhausted)
///                +----------+ (fail)
/// ```
///
/// The buffer is driven by a single thread of control: the framework calls [`Self::fill`],
/// [`Self::next`], [`Self::acknowledge`] and [`Self::fail`], never concurrently.
/// Only [`Self::metrics`] is meant to be read from elsewhere.
pub struct BoundedDeliveryBuffer<S: StreamSource> {
    config: BufferConfig,
    source: S,
    cursors: Option<Vec<S::Cursor>>,
    queue: VecDeque<MessageIdentity>,
    in_flight: HashMap<MessageIdentity, InFlight>,
    metrics: Arc<DeliveryMetrics>,
}

impl<S: StreamSource> BoundedDeliveryBuffer<S> {
    pub fn new(config: BufferConfig, source: S) -> Result<Self, SpoutBufferError> {
        Self::with_metrics(config, source, Arc::new(DeliveryMetrics::default()))
    }

    /// Same as [`Self::new`], but reporting to the given (possibly shared) [`DeliveryMetrics`].
    pub fn with_metrics(
        config: BufferConfig,
        source: S,
        metrics: Arc<DeliveryMetrics>,
    ) -> Result<Self, SpoutBufferError> {
        config.validate()?;

        Ok(Self {
            queue: VecDeque::with_capacity(config.capacity),
            in_flight: HashMap::with_capacity(config.capacity),
            config,
            source,
            cursors: None,
            metrics,
        })
    }

    /// Pulls from the upstream partitions until capacity is reached, or every partition times out.
    ///
    /// Partitions are polled round-robin, one message at a time, so that a busy partition
    /// doesn't starve the others; order within a partition is preserved.
    /// Cursors are opened on the first call and reused afterwards.
    ///
    /// Updates the fill-ratio gauge, and returns how many messages were buffered by this call.
    ///
    /// # Errors
    ///
    /// A [`SpoutBufferError::UpstreamFailure`] aborts the call. Messages buffered before
    /// the failure stay in flight, and the gauge reflects them.
    pub fn fill(&mut self) -> Result<usize, SpoutBufferError> {
        let pulled = self.pull_until_full();

        let load = self.load();
        self.metrics.record_fill_ratio(load);
        debug!(topic = %self.config.topic, load, in_flight = self.in_flight.len(), "buffer filled");

        pulled
    }

    fn pull_until_full(&mut self) -> Result<usize, SpoutBufferError> {
        let topic = &self.config.topic;
        let capacity = self.config.capacity;

        if self.cursors.is_none() {
            let cursors = self.source.create_cursors(topic).map_err(|e| upstream_failure(topic, e))?;
            debug!(topic = %topic, partitions = cursors.len(), "opened partition cursors");
            self.cursors = Some(cursors);
        }
        let cursors = match self.cursors.as_mut() {
            Some(cursors) => cursors,
            None => return Ok(0),
        };

        let mut buffered = 0;
        let mut timed_out = vec![false; cursors.len()];
        let mut active = cursors.len();

        while active > 0 && self.in_flight.len() < capacity {
            for (cursor, idle) in cursors.iter_mut().zip(timed_out.iter_mut()) {
                if *idle {
                    continue;
                }
                if self.in_flight.len() >= capacity {
                    break;
                }

                match cursor.poll() {
                    Ok(Polled::Message(message)) => {
                        let identity = message.identity;
                        if self.in_flight.contains_key(&identity) {
                            warn!(
                                partition = identity.partition,
                                offset = identity.offset,
                                "skipping message already in flight"
                            );
                            continue;
                        }

                        self.in_flight.insert(identity, InFlight::new(message.payload));
                        self.queue.push_back(identity);
                        buffered += 1;
                    },
                    Ok(Polled::Timeout) => {
                        *idle = true;
                        active -= 1;
                    },
                    Err(e) => {
                        error!(topic = %topic, partition = e.partition, reason = %e.reason, "upstream stream failed");
                        return Err(upstream_failure(topic, e));
                    },
                }
            }
        }

        Ok(buffered)
    }

    /// Hands the oldest pending message to the caller, for delivery downstream.
    ///
    /// Returns `Ok(None)` when nothing is pending; metrics are left untouched in that case.
    ///
    /// The message stays in flight until [`Self::acknowledge`] or [`Self::fail`] is called with
    /// its identity: receipt by the downstream isn't success yet.
    pub fn next(&mut self) -> Result<Option<Delivery>, SpoutBufferError> {
        let Some(identity) = self.queue.pop_front() else {
            return Ok(None);
        };

        let Some(entry) = self.in_flight.get_mut(&identity) else {
            error!(partition = identity.partition, offset = identity.offset, "queued message has no payload");
            return Err(SpoutBufferError::MissingPayload(identity));
        };

        entry.delivered = true;
        self.metrics.add_bytes_delivered(entry.payload.len() as u64);

        Ok(Some(Delivery {
            identity,
            payload: entry.payload.clone(),
            redeliveries: entry.failures,
        }))
    }

    /// Marks a delivered message as successfully processed, freeing its capacity slot.
    pub fn acknowledge(&mut self, identity: MessageIdentity) -> Result<(), SpoutBufferError> {
        self.delivered_entry(identity)?;
        self.in_flight.remove(&identity);

        debug!(partition = identity.partition, offset = identity.offset, "acknowledged");
        Ok(())
    }

    /// Marks a delivered message as failed downstream.
    ///
    /// Depending on the [`FailPolicy`] and on how many times it failed already, the message
    /// is either requeued at the tail of the pending queue (payload unchanged), or evicted.
    pub fn fail(&mut self, identity: MessageIdentity) -> Result<FailOutcome, SpoutBufferError> {
        let fail_policy = self.config.fail_policy;

        let entry = self.delivered_entry(identity)?;
        entry.failures += 1;
        let failures = entry.failures;

        if fail_policy.exhausted(failures) {
            let evicted = self.in_flight.remove(&identity).map(|entry| entry.payload).unwrap_or_default();
            warn!(
                partition = identity.partition,
                offset = identity.offset,
                failures,
                %fail_policy,
                "redeliveries exhausted: evicting"
            );

            return Ok(FailOutcome::Evicted(EvictedMessage {
                identity,
                payload: evicted,
                failures,
            }));
        }

        entry.delivered = false;
        self.queue.push_back(identity);

        debug!(partition = identity.partition, offset = identity.offset, failures, "requeued for redelivery");
        Ok(FailOutcome::Requeued {
            redelivery: failures,
        })
    }

    fn delivered_entry(&mut self, identity: MessageIdentity) -> Result<&mut InFlight, SpoutBufferError> {
        match self.in_flight.get_mut(&identity) {
            Some(entry) if entry.delivered => Ok(entry),
            Some(_) => {
                error!(partition = identity.partition, offset = identity.offset, "outcome for undelivered message");
                Err(SpoutBufferError::NotDelivered(identity))
            },
            None => {
                error!(partition = identity.partition, offset = identity.offset, "outcome for unknown message");
                Err(SpoutBufferError::UnknownIdentity(identity))
            },
        }
    }

    pub fn topic(&self) -> &str {
        &self.config.topic
    }

    pub fn capacity(&self) -> usize {
        self.config.capacity
    }

    pub fn fail_policy(&self) -> FailPolicy {
        self.config.fail_policy
    }

    /// Messages pulled and not yet acknowledged or evicted.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Messages waiting for [`Self::next`].
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Nothing pending, nothing awaiting an outcome.
    pub fn is_idle(&self) -> bool {
        self.in_flight.is_empty()
    }

    /// Fraction of capacity currently in flight.
    pub fn load(&self) -> f64 {
        load_ratio(self.in_flight.len(), self.config.capacity)
    }

    /// Handle for a metrics collector.
    pub fn metrics(&self) -> Arc<DeliveryMetrics> {
        Arc::clone(&self.metrics)
    }
}

fn upstream_failure(topic: &str, source: StreamError) -> SpoutBufferError {
    SpoutBufferError::UpstreamFailure {
        topic: topic.to_owned(),
        source,
    }
}
