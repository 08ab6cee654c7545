use std::fmt;

use bytes_parser::BytesParser;

use crate::errors::SpoutBufferError;
use crate::utils::{parse_i32, parse_i64};

/// Size, in bytes, of a [`MessageIdentity`] encoded with [`MessageIdentity::to_bytes`].
pub const IDENTITY_ENCODED_LEN: usize = 4 + 8;

/// Identifies one upstream record by its partition and offset.
///
/// The topic is implicit: a [`BoundedDeliveryBuffer`] is bound to exactly one topic,
/// so within a buffer `(partition, offset)` names one physical message.
///
/// This is the key of all in-flight bookkeeping, and the handle a framework uses to
/// later acknowledge or fail a delivered message. It's `Copy`, `Hash` and `Ord`,
/// so it can be used as a map key also by callers that spread partitions across threads.
///
/// Ordering is by partition first, then offset.
///
/// [`BoundedDeliveryBuffer`]: crate::BoundedDeliveryBuffer
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq, Hash, Ord, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MessageIdentity {
    /// Partition of the topic the message was read from.
    pub partition: i32,

    /// Offset of the message within its [`MessageIdentity::partition`].
    pub offset: i64,
}

impl MessageIdentity {
    pub fn new(partition: i32, offset: i64) -> Self {
        Self {
            partition,
            offset,
        }
    }

    /// Encodes this identity as 12 big-endian bytes: `i32` partition followed by `i64` offset.
    ///
    /// Frameworks that carry message ids as opaque bytes can store this, and turn it
    /// back into a [`MessageIdentity`] with [`MessageIdentity::try_from_bytes`].
    pub fn to_bytes(&self) -> [u8; IDENTITY_ENCODED_LEN] {
        let mut bytes = [0u8; IDENTITY_ENCODED_LEN];
        bytes[..4].copy_from_slice(&self.partition.to_be_bytes());
        bytes[4..].copy_from_slice(&self.offset.to_be_bytes());
        bytes
    }

    /// Parses an identity previously encoded with [`MessageIdentity::to_bytes`].
    ///
    /// # Arguments
    ///
    /// * `bytes` - Exactly [`IDENTITY_ENCODED_LEN`] bytes; any other length is rejected
    ///     with [`SpoutBufferError::IdentityLength`].
    pub fn try_from_bytes(bytes: &[u8]) -> Result<Self, SpoutBufferError> {
        if bytes.len() != IDENTITY_ENCODED_LEN {
            return Err(SpoutBufferError::IdentityLength(bytes.len()));
        }

        let mut parser = BytesParser::from(bytes);
        Ok(Self {
            partition: parse_i32(&mut parser)?,
            offset: parse_i64(&mut parser)?,
        })
    }
}

impl fmt::Display for MessageIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.partition, self.offset)
    }
}

impl From<(i32, i64)> for MessageIdentity {
    fn from((partition, offset): (i32, i64)) -> Self {
        Self::new(partition, offset)
    }
}
