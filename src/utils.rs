use bytes_parser::BytesParser;

use crate::errors::SpoutBufferError;

/// Adapter for [`BytesParser::parse_i32`].
///
/// # Arguments
///
/// * `parser` - A [`BytesParser`] with its internal cursor pointing
///     at the beginning of the [`i32`] we want to parse.
pub(crate) fn parse_i32(parser: &mut BytesParser) -> Result<i32, SpoutBufferError> {
    parser.parse_i32().map_err(SpoutBufferError::ByteParsingError)
}

/// Adapter for [`BytesParser::parse_i64`].
///
/// # Arguments
///
/// * `parser` - A [`BytesParser`] with its internal cursor pointing
///     at the beginning of the [`i64`] we want to parse.
pub(crate) fn parse_i64(parser: &mut BytesParser) -> Result<i64, SpoutBufferError> {
    parser.parse_i64().map_err(SpoutBufferError::ByteParsingError)
}

/// Fraction of `capacity` taken by `occupied`.
///
/// A zero `capacity` is rejected by config validation; it yields `0.0` here rather than `NaN`.
pub(crate) fn load_ratio(occupied: usize, capacity: usize) -> f64 {
    if capacity == 0 {
        return 0.0;
    }

    occupied as f64 / capacity as f64
}

/// Used in unit tests to verify type is Thread Safe and Async/Await Safe.
///
/// It enforces that the given type implements the following standard traits:
///
/// * `std::marker::Sized`: type has a constant size known at compile time
/// * `std::marker::Send`: type is safe to send to another thread
/// * `std::marker::Sync`: type is Sync if it is safe to share between threads;
///   type can be Sync if and only if a reference to it is Send
/// * `std::marker::Unpin`: type can be safely moved after pinning
#[cfg(test)]
pub(crate) fn is_thread_safe<T: Sized + Send + Sync + Unpin>() {}
