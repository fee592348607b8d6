//! Shared metrics recording for storage adapters.
//!
//! Every adapter records the same two series so dashboards can compare
//! backend families without per-backend wiring.

use std::time::Instant;

/// Records operation metrics for storage operations.
///
/// Emits:
/// 1. `artifact_store_operations_total` - counter by backend/operation/status
/// 2. `artifact_store_operation_duration_ms` - latency histogram
///
/// # Examples
///
/// ```ignore
/// let start = Instant::now();
/// // ... perform operation ...
/// let status = if result.is_ok() { "success" } else { "error" };
/// record_operation_metrics("sqlite", "blob_put", start, status);
/// ```
pub fn record_operation_metrics(
    backend: &'static str,
    operation: &'static str,
    start: Instant,
    status: &'static str,
) {
    metrics::counter!(
        "artifact_store_operations_total",
        "backend" => backend,
        "operation" => operation,
        "status" => status
    )
    .increment(1);
    metrics::histogram!(
        "artifact_store_operation_duration_ms",
        "backend" => backend,
        "operation" => operation,
        "status" => status
    )
    .record(start.elapsed().as_secs_f64() * 1000.0);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_operation_metrics_statuses() {
        // Recording must never panic, whatever the recorder situation.
        let start = Instant::now();
        record_operation_metrics("memory", "metadata_insert", start, "success");
        record_operation_metrics("memory", "metadata_insert", start, "error");
    }

    #[test]
    fn test_record_operation_metrics_concurrent() {
        use std::thread;

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let status = if i % 2 == 0 { "success" } else { "error" };
                thread::spawn(move || {
                    let start = Instant::now();
                    record_operation_metrics("sqlite", "blob_get", start, status);
                })
            })
            .collect();

        for handle in handles {
            handle.join().expect("metrics thread panicked");
        }
    }
}
