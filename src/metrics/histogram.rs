use std::collections::BTreeMap;
use std::time::Duration;

/// Buckets per second: durations are floored to hundredths of a second.
pub const BUCKETS_PER_SECOND: u64 = 100;

const NANOS_PER_BUCKET: u128 = 1_000_000_000 / BUCKETS_PER_SECOND as u128;

/// Frequency table of rounded durations, used for the approximate median.
///
/// Keys are kept sorted so the median walk is a single ascending pass.
#[derive(Debug, Clone, Default)]
pub struct DurationHistogram {
    buckets: BTreeMap<u64, u64>,
    observations: u64,
}

impl DurationHistogram {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bucket a duration falls into.
    pub fn bucket_of(duration: Duration) -> u64 {
        (duration.as_nanos() / NANOS_PER_BUCKET) as u64
    }

    pub fn record(&mut self, duration: Duration) {
        *self.buckets.entry(Self::bucket_of(duration)).or_insert(0) += 1;
        self.observations += 1;
    }

    /// Bucket at the cumulative-count midpoint of `total` observations.
    ///
    /// `total` is halved rounding half up, so an odd count lands on the middle
    /// element and an even count on the lower of the two middle elements.
    /// Returns 0 when `total` is 0 or the buckets hold fewer observations.
    pub fn median(&self, total: u64) -> u64 {
        if total == 0 {
            return 0;
        }

        let mut remaining = total.div_ceil(2);
        for (&bucket, &count) in &self.buckets {
            if count >= remaining {
                return bucket;
            }
            remaining -= count;
        }

        0
    }

    /// Number of observations recorded.
    pub fn len(&self) -> u64 {
        self.observations
    }

    pub fn is_empty(&self) -> bool {
        self.observations == 0
    }
}
