//! # spout_buffer
//!
//! Bounded buffering and delivery engine, sitting between a partitioned, offset-addressed
//! message log (i.e. Kafka) and a pull-driven consumer that takes one record at a time
//! and later reports, per record, if it succeeded or failed (i.e. a Storm Spout).
//!
//! The hosting framework drives a [`BoundedDeliveryBuffer`] in a cooperative loop:
//!
//! 1. [`BoundedDeliveryBuffer::fill`] pulls from the upstream [`StreamSource`], up to capacity
//! 2. [`BoundedDeliveryBuffer::next`] hands out one message, for delivery downstream
//! 3. [`BoundedDeliveryBuffer::acknowledge`] or [`BoundedDeliveryBuffer::fail`] settle it, later
//!
//! A message is in flight, and takes a capacity slot, from the moment it's pulled until
//! it's acknowledged, or evicted after exhausting its redeliveries (see [`FailPolicy`]).
//!
//! ## Metrics
//!
//! [`DeliveryMetrics`] exports 2 instruments, read and reset by an external collector:
//!
//! * `buffer_load`: fraction of capacity in flight, as of the last `fill()`
//! * `emitted_bytes`: payload bytes handed out by `next()` since the last read
//!
//! ## Example
//!
//! ```rust
//! use spout_buffer::{BoundedDeliveryBuffer, BufferConfig, MemoryStream, ResettableMetric};
//!
//! let mut stream = MemoryStream::new();
//! stream.push_message("test-topic", 0, 42, b"hello".to_vec());
//!
//! let mut buffer = BoundedDeliveryBuffer::new(BufferConfig::new("test-topic", 4), stream).unwrap();
//! let metrics = buffer.metrics();
//!
//! buffer.fill().unwrap();
//! assert_eq!(metrics.fill_ratio.value_and_reset(), 0.25);
//!
//! let delivery = buffer.next().unwrap().unwrap();
//! assert_eq!(delivery.payload, b"hello");
//! assert_eq!(metrics.bytes_delivered.value_and_reset(), 5);
//!
//! buffer.acknowledge(delivery.identity).unwrap();
//! assert!(buffer.is_idle());
//! ```
//!
//! ## Features
//!
//! * `serde`: derives `Serialize`/`Deserialize` for [`MessageIdentity`], [`BufferConfig`],
//!   [`FailPolicy`] and [`MetricsSnapshot`]

mod buffer;
mod config;
mod errors;
mod identity;
mod metrics;
mod source;
mod utils;

pub use buffer::*;
pub use config::*;
pub use errors::*;
pub use identity::*;
pub use metrics::*;
pub use source::*;
