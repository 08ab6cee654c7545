use bytes_parser::BytesParserError;
use thiserror::Error;

use crate::identity::MessageIdentity;

#[derive(Error, Debug, Eq, PartialEq)]
pub enum SpoutBufferError {
    #[error("Upstream failure while reading topic {topic}: {source}")]
    UpstreamFailure {
        topic: String,
        #[source]
        source: StreamError,
    },

    #[error("Message {0} is queued for delivery but has no in-flight payload")]
    MissingPayload(MessageIdentity),

    #[error("Message {0} is not in flight: unknown, or already acknowledged/evicted")]
    UnknownIdentity(MessageIdentity),

    #[error("Message {0} is in flight but was never delivered")]
    NotDelivered(MessageIdentity),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failure while parsing bytes: {0}")]
    ByteParsingError(#[source] BytesParserError),

    #[error("Encoded message identity must be 12 bytes long, got {0}")]
    IdentityLength(usize),
}

impl SpoutBufferError {
    /// Is this a bookkeeping bug, rather than an upstream or configuration problem?
    ///
    /// These should never happen if the framework honours the delivery contract
    /// (i.e. acknowledges or fails only identities returned by a prior `next()`, and at most once).
    pub fn is_internal_inconsistency(&self) -> bool {
        matches!(
            self,
            SpoutBufferError::MissingPayload(_)
                | SpoutBufferError::UnknownIdentity(_)
                | SpoutBufferError::NotDelivered(_)
        )
    }
}

/// Genuine failure reported by an upstream [`PartitionCursor`].
///
/// Not to be confused with a poll timeout, that is reported as [`Polled::Timeout`].
///
/// [`PartitionCursor`]: crate::PartitionCursor
/// [`Polled::Timeout`]: crate::Polled::Timeout
#[derive(Error, Debug, Clone, Eq, PartialEq)]
#[error("partition {partition}: {reason}")]
pub struct StreamError {
    pub partition: i32,
    pub reason: String,
}

impl StreamError {
    pub fn new(partition: i32, reason: impl Into<String>) -> Self {
        Self {
            partition,
            reason: reason.into(),
        }
    }
}
