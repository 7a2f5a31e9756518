//! Transfer statistics
//!
//! Once a transaction has stopped, its byte counters and wall-clock
//! markers condense into a [`TransferStats`] snapshot: elapsed time plus
//! per-direction throughput in GiB/s.

use serde::{Deserialize, Serialize};

const BYTES_PER_GIB: f64 = (1u64 << 30) as f64;

/// Throughput snapshot for a stopped transaction
///
/// Produced by `Transaction::stats()`. Throughput is computed as
/// `bytes / 2^30 / elapsed_seconds`; a transfer that stopped within the
/// same millisecond it started reports zero throughput rather than a
/// nonsense figure.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransferStats {
    /// Wall-clock duration between start and stop, in milliseconds
    pub elapsed_ms: i64,
    /// Total bytes sent across all operations
    pub send_bytes: u64,
    /// Total bytes received across all operations
    pub receive_bytes: u64,
    /// Send throughput in GiB/s
    pub send_throughput_gib: f64,
    /// Receive throughput in GiB/s
    pub receive_throughput_gib: f64,
}

impl TransferStats {
    /// Compute a snapshot from raw counters and elapsed milliseconds
    pub fn new(elapsed_ms: i64, send_bytes: u64, receive_bytes: u64) -> Self {
        TransferStats {
            elapsed_ms,
            send_bytes,
            receive_bytes,
            send_throughput_gib: throughput_gib(send_bytes, elapsed_ms),
            receive_throughput_gib: throughput_gib(receive_bytes, elapsed_ms),
        }
    }

    /// One-line human-readable summary
    pub fn summary(&self) -> String {
        format!(
            "{} ms, sent {} B ({:.3} GiB/s), received {} B ({:.3} GiB/s)",
            self.elapsed_ms,
            self.send_bytes,
            self.send_throughput_gib,
            self.receive_bytes,
            self.receive_throughput_gib
        )
    }
}

impl std::fmt::Display for TransferStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.summary())
    }
}

fn throughput_gib(bytes: u64, elapsed_ms: i64) -> f64 {
    if elapsed_ms <= 0 {
        return 0.0;
    }
    bytes as f64 / BYTES_PER_GIB / (elapsed_ms as f64 / 1000.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_throughput_computation() {
        // 1 GiB in exactly one second
        let stats = TransferStats::new(1000, 1 << 30, 0);
        assert!((stats.send_throughput_gib - 1.0).abs() < 1e-9);
        assert_eq!(stats.receive_throughput_gib, 0.0);
    }

    #[test]
    fn test_zero_elapsed_reports_zero_throughput() {
        let stats = TransferStats::new(0, 1 << 30, 1 << 30);
        assert_eq!(stats.send_throughput_gib, 0.0);
        assert_eq!(stats.receive_throughput_gib, 0.0);
    }

    #[test]
    fn test_summary_mentions_both_directions() {
        let stats = TransferStats::new(2000, 1024, 2048);
        let text = stats.summary();
        assert!(text.contains("sent 1024 B"));
        assert!(text.contains("received 2048 B"));
    }
}
