// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Per-attempt measurement records and their statistical summary.

use serde::Serialize;

/// One successful send/receive exchange.
///
/// Timestamps are nanosecond readings of the run's monotonic clock, taken
/// immediately around the send/receive pair; their difference is the full
/// round trip, not one-way latency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProbeSample {
    pub attempt_index: u32,
    pub send_timestamp_nanos: i64,
    pub receive_timestamp_nanos: i64,
}

impl ProbeSample {
    /// Round-trip time of this exchange in nanoseconds.
    pub fn rtt_nanos(&self) -> i64 {
        self.receive_timestamp_nanos - self.send_timestamp_nanos
    }
}

/// Statistical summary of the round-trip times in a sample series.
#[derive(Debug, Clone, Serialize)]
pub struct RttSummary {
    pub count: u64,
    pub min_ns: i64,
    pub max_ns: i64,
    pub mean_ns: f64,
    pub median_ns: i64,
    pub p95_ns: i64,
}

impl RttSummary {
    /// Summarize a sample series. Returns None for an empty series.
    pub fn from_samples(samples: &[ProbeSample]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }

        let mut rtts: Vec<i64> = samples.iter().map(ProbeSample::rtt_nanos).collect();
        rtts.sort_unstable();
        let len = rtts.len();

        let sum: i64 = rtts.iter().sum();

        Some(Self {
            count: len as u64,
            min_ns: rtts[0],
            max_ns: rtts[len - 1],
            mean_ns: sum as f64 / len as f64,
            median_ns: rtts[len / 2],
            p95_ns: rtts[(len as f64 * 0.95) as usize],
        })
    }

    /// Format a latency in human-readable form (auto-selects ns/μs/ms).
    pub fn format_latency(ns: i64) -> String {
        if ns < 1_000 {
            format!("{}ns", ns)
        } else if ns < 1_000_000 {
            format!("{:.2}μs", ns as f64 / 1_000.0)
        } else if ns < 1_000_000_000 {
            format!("{:.2}ms", ns as f64 / 1_000_000.0)
        } else {
            format!("{:.2}s", ns as f64 / 1_000_000_000.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(attempt: u32, send: i64, recv: i64) -> ProbeSample {
        ProbeSample {
            attempt_index: attempt,
            send_timestamp_nanos: send,
            receive_timestamp_nanos: recv,
        }
    }

    #[test]
    fn test_rtt_nanos() {
        assert_eq!(sample(1, 1_000, 11_000).rtt_nanos(), 10_000);
    }

    #[test]
    fn test_summary_from_samples() {
        let samples: Vec<ProbeSample> = (1..=10)
            .map(|i| sample(i, 0, i as i64 * 100))
            .collect();
        let summary = RttSummary::from_samples(&samples).unwrap();

        assert_eq!(summary.count, 10);
        assert_eq!(summary.min_ns, 100);
        assert_eq!(summary.max_ns, 1000);
        assert_eq!(summary.median_ns, 600);
        assert!((summary.mean_ns - 550.0).abs() < 0.01);
    }

    #[test]
    fn test_summary_empty() {
        assert!(RttSummary::from_samples(&[]).is_none());
    }

    #[test]
    fn test_format_latency() {
        assert_eq!(RttSummary::format_latency(500), "500ns");
        assert_eq!(RttSummary::format_latency(1500), "1.50μs");
        assert_eq!(RttSummary::format_latency(1_500_000), "1.50ms");
        assert_eq!(RttSummary::format_latency(1_500_000_000), "1.50s");
    }
}
