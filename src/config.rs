use std::fmt;
use std::str::FromStr;

use crate::errors::SpoutBufferError;

/// Default for [`FailPolicy::Reliable::max_redeliveries`].
pub const DEFAULT_MAX_REDELIVERIES: u32 = 3;

/// What to do with a message the downstream reported as failed.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum FailPolicy {
    /// Requeue the message for redelivery, up to `max_redeliveries` times.
    ///
    /// The failure that follows the last allowed redelivery evicts the message.
    Reliable { max_redeliveries: u32 },

    /// Evict the message on its first failure.
    Unreliable,
}

impl FailPolicy {
    /// Should a message that failed `failures` times (this one included) be evicted?
    pub(crate) fn exhausted(&self, failures: u32) -> bool {
        match self {
            FailPolicy::Reliable { max_redeliveries } => failures > *max_redeliveries,
            FailPolicy::Unreliable => true,
        }
    }
}

impl Default for FailPolicy {
    fn default() -> Self {
        FailPolicy::Reliable {
            max_redeliveries: DEFAULT_MAX_REDELIVERIES,
        }
    }
}

impl FromStr for FailPolicy {
    type Err = SpoutBufferError;

    /// Parses `reliable` (with [`DEFAULT_MAX_REDELIVERIES`]) or `unreliable`, ignoring case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reliable" => Ok(FailPolicy::default()),
            "unreliable" => Ok(FailPolicy::Unreliable),
            other => Err(SpoutBufferError::InvalidConfig(format!("unknown fail policy '{other}'"))),
        }
    }
}

impl fmt::Display for FailPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailPolicy::Reliable { max_redeliveries } => write!(f, "reliable(max_redeliveries={max_redeliveries})"),
            FailPolicy::Unreliable => f.write_str("unreliable"),
        }
    }
}

/// Configuration of a [`BoundedDeliveryBuffer`].
///
/// Where it comes from (file, environment, framework properties) is up to the caller.
///
/// [`BoundedDeliveryBuffer`]: crate::BoundedDeliveryBuffer
#[derive(Debug, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BufferConfig {
    /// Topic to read from.
    pub topic: String,

    /// Maximum number of messages in flight (pending delivery, or delivered and awaiting outcome).
    pub capacity: usize,

    #[cfg_attr(feature = "serde", serde(default))]
    pub fail_policy: FailPolicy,
}

impl BufferConfig {
    pub fn new(topic: impl Into<String>, capacity: usize) -> Self {
        Self {
            topic: topic.into(),
            capacity,
            fail_policy: FailPolicy::default(),
        }
    }

    pub fn with_fail_policy(mut self, fail_policy: FailPolicy) -> Self {
        self.fail_policy = fail_policy;
        self
    }

    pub fn validate(&self) -> Result<(), SpoutBufferError> {
        if self.topic.trim().is_empty() {
            return Err(SpoutBufferError::InvalidConfig("topic must be non-empty".to_owned()));
        }
        if self.capacity == 0 {
            return Err(SpoutBufferError::InvalidConfig("capacity must be a positive integer".to_owned()));
        }

        Ok(())
    }
}
