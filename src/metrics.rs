use std::sync::atomic::{AtomicU64, Ordering};

/// Name under which [`DeliveryMetrics::fill_ratio`] is exported.
pub const BUFFER_LOAD_METRIC: &str = "buffer_load";

/// Name under which [`DeliveryMetrics::bytes_delivered`] is exported.
pub const EMITTED_BYTES_METRIC: &str = "emitted_bytes";

/// An instrument that an external collector reads, and resets, on its own schedule.
pub trait ResettableMetric {
    type Value;

    /// Returns the current value and resets the instrument to its zero value, atomically.
    fn value_and_reset(&self) -> Self::Value;
}

/// Last-value gauge: each [`FillRatioGauge::set`] overwrites the previous value.
///
/// The `f64` is stored as its bit pattern in an [`AtomicU64`], so that the
/// collector can swap it out while the delivery path keeps writing.
#[derive(Debug, Default)]
pub struct FillRatioGauge {
    bits: AtomicU64,
}

impl FillRatioGauge {
    pub fn set(&self, ratio: f64) {
        self.bits.store(ratio.to_bits(), Ordering::Relaxed);
    }

    /// Current value, without resetting it.
    pub fn get(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Relaxed))
    }
}

impl ResettableMetric for FillRatioGauge {
    type Value = f64;

    fn value_and_reset(&self) -> f64 {
        f64::from_bits(self.bits.swap(0.0f64.to_bits(), Ordering::Relaxed))
    }
}

/// Accumulating counter of delivered payload bytes, zeroed on every read.
#[derive(Debug, Default)]
pub struct BytesDeliveredCounter {
    total: AtomicU64,
}

impl BytesDeliveredCounter {
    pub fn add(&self, bytes: u64) {
        self.total.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Current value, without resetting it.
    pub fn get(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }
}

impl ResettableMetric for BytesDeliveredCounter {
    type Value = u64;

    fn value_and_reset(&self) -> u64 {
        self.total.swap(0, Ordering::Relaxed)
    }
}

/// Operational metrics of a [`BoundedDeliveryBuffer`].
///
/// The buffer is the only writer; a metrics collector (usually on a timer of its own)
/// is the only reader. Each instrument is synchronized on its own, so reading never
/// contends with the buffer's queue/in-flight state.
///
/// [`BoundedDeliveryBuffer`]: crate::BoundedDeliveryBuffer
#[derive(Debug, Default)]
pub struct DeliveryMetrics {
    /// Fraction of capacity occupied by in-flight messages, as of the last `fill()`.
    pub fill_ratio: FillRatioGauge,

    /// Payload bytes handed downstream by `next()` since the last read.
    pub bytes_delivered: BytesDeliveredCounter,
}

impl DeliveryMetrics {
    pub fn record_fill_ratio(&self, ratio: f64) {
        self.fill_ratio.set(ratio);
    }

    pub fn add_bytes_delivered(&self, bytes: u64) {
        self.bytes_delivered.add(bytes);
    }

    /// Reads and resets both instruments.
    ///
    /// The two reads are individually atomic, not atomic as a pair.
    pub fn snapshot_and_reset(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            buffer_load: self.fill_ratio.value_and_reset(),
            emitted_bytes: self.bytes_delivered.value_and_reset(),
        }
    }
}

/// Values read by [`DeliveryMetrics::snapshot_and_reset`].
#[derive(Debug, Default, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MetricsSnapshot {
    pub buffer_load: f64,
    pub emitted_bytes: u64,
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;
    use crate::utils::is_thread_safe;

    #[test]
    fn gauge_keeps_last_value_only() {
        let gauge = FillRatioGauge::default();
        assert_eq!(gauge.value_and_reset(), 0.0);

        gauge.set(0.5);
        gauge.set(0.25);
        assert_eq!(gauge.get(), 0.25);
        assert_eq!(gauge.value_and_reset(), 0.25);
        assert_eq!(gauge.value_and_reset(), 0.0);
    }

    #[test]
    fn gauge_is_not_clamped() {
        let gauge = FillRatioGauge::default();
        gauge.set(1.5);
        assert_eq!(gauge.value_and_reset(), 1.5);
    }

    #[test]
    fn counter_accumulates_between_resets() {
        let counter = BytesDeliveredCounter::default();
        assert_eq!(counter.value_and_reset(), 0);

        counter.add(4);
        assert_eq!(counter.value_and_reset(), 4);

        counter.add(6);
        counter.add(8);
        assert_eq!(counter.get(), 14);
        assert_eq!(counter.value_and_reset(), 14);
        assert_eq!(counter.value_and_reset(), 0);
    }

    #[test]
    fn concurrent_reads_never_lose_bytes() {
        let metrics = Arc::new(DeliveryMetrics::default());

        let writer = {
            let metrics = Arc::clone(&metrics);
            thread::spawn(move || {
                for _ in 0..10_000 {
                    metrics.add_bytes_delivered(3);
                }
            })
        };

        let mut collected = 0;
        while !writer.is_finished() {
            collected += metrics.bytes_delivered.value_and_reset();
        }
        writer.join().unwrap();
        collected += metrics.bytes_delivered.value_and_reset();

        assert_eq!(collected, 30_000);
    }

    #[test]
    fn snapshot_resets_both() {
        let metrics = DeliveryMetrics::default();
        metrics.record_fill_ratio(0.75);
        metrics.add_bytes_delivered(10);

        assert_eq!(
            metrics.snapshot_and_reset(),
            MetricsSnapshot {
                buffer_load: 0.75,
                emitted_bytes: 10
            }
        );
        assert_eq!(metrics.snapshot_and_reset(), MetricsSnapshot::default());
    }

    #[test]
    fn test_types_thread_safety() {
        is_thread_safe::<FillRatioGauge>();
        is_thread_safe::<BytesDeliveredCounter>();
        is_thread_safe::<DeliveryMetrics>();
    }
}
