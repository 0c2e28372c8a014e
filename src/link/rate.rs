use std::time::{SystemTime, UNIX_EPOCH};

/// One throughput observation: how many bytes moved, and when (ms since epoch).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RateSample {
    pub bytes: u64,
    pub timestamp_ms: u64,
}

/// Fixed-capacity ring of samples. The oldest entry is overwritten once full.
#[derive(Clone, Debug)]
struct SampleRing {
    samples: Vec<RateSample>,
    index: usize,
    filled: usize,
}

impl SampleRing {
    fn new(capacity: usize) -> Self {
        Self {
            samples: vec![RateSample::default(); capacity],
            index: 0,
            filled: 0,
        }
    }

    fn push(&mut self, sample: RateSample) {
        let capacity = self.samples.len();
        if capacity == 0 {
            return;
        }
        self.samples[self.index] = sample;
        self.index = (self.index + 1) % capacity;
        self.filled = (self.filled + 1).min(capacity);
    }

    fn snapshot(&self) -> Vec<RateSample> {
        let capacity = self.samples.len();
        let start = if self.filled < capacity { 0 } else { self.index };
        (0..self.filled)
            .map(|i| self.samples[(start + i) % capacity])
            .collect()
    }
}

/// Inbound and outbound sample logs of one link.
///
/// Only records traffic; the live rate figures a link reports are
/// placeholders and are not derived from these samples.
#[derive(Clone, Debug)]
pub struct RateTracker {
    inbound: SampleRing,
    outbound: SampleRing,
}

impl RateTracker {
    pub fn new(capacity: usize) -> Self {
        Self {
            inbound: SampleRing::new(capacity),
            outbound: SampleRing::new(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.inbound.samples.len()
    }

    pub fn record_inbound(&mut self, bytes: usize) {
        self.record_inbound_at(bytes, now_ms());
    }

    pub fn record_outbound(&mut self, bytes: usize) {
        self.record_outbound_at(bytes, now_ms());
    }

    pub fn record_inbound_at(&mut self, bytes: usize, timestamp_ms: u64) {
        self.inbound.push(RateSample { bytes: bytes as u64, timestamp_ms });
    }

    pub fn record_outbound_at(&mut self, bytes: usize, timestamp_ms: u64) {
        self.outbound.push(RateSample { bytes: bytes as u64, timestamp_ms });
    }

    /// Inbound samples, oldest first.
    pub fn inbound(&self) -> Vec<RateSample> {
        self.inbound.snapshot()
    }

    /// Outbound samples, oldest first.
    pub fn outbound(&self) -> Vec<RateSample> {
        self.outbound.snapshot()
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
