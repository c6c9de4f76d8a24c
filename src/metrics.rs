//! Metric registration and recording helpers.

use std::time::Instant;

use metrics::{counter, describe_counter, describe_histogram, histogram};

/// Scan cycle duration metric name.
pub const METRIC_SCAN_DURATION: &str = "scan_duration_ms";
/// Markets scanned counter metric name.
pub const METRIC_MARKETS_SCANNED: &str = "markets_scanned_total";
/// Opportunities detected counter metric name.
pub const METRIC_OPPORTUNITIES_DETECTED: &str = "opportunities_detected_total";
/// Executions counter metric name, labelled by outcome.
pub const METRIC_EXECUTIONS: &str = "executions_total";
/// Trades denied by risk admission counter metric name.
pub const METRIC_TRADES_DENIED: &str = "trades_denied_total";
/// Gateway failures counter metric name.
pub const METRIC_GATEWAY_FAILURES: &str = "gateway_failures_total";

/// Register metric descriptions. Call once at startup.
pub fn init_metrics() {
    describe_histogram!(METRIC_SCAN_DURATION, "Scan cycle duration in milliseconds");
    describe_counter!(METRIC_MARKETS_SCANNED, "Total markets scanned");
    describe_counter!(
        METRIC_OPPORTUNITIES_DETECTED,
        "Total arbitrage opportunities detected"
    );
    describe_counter!(
        METRIC_EXECUTIONS,
        "Total execution attempts by terminal outcome"
    );
    describe_counter!(METRIC_TRADES_DENIED, "Total trades denied by risk admission");
    describe_counter!(METRIC_GATEWAY_FAILURES, "Total order gateway failures");
}

/// Record a completed scan cycle.
pub fn record_scan(started: Instant, markets: usize, opportunities: usize) {
    histogram!(METRIC_SCAN_DURATION).record(started.elapsed().as_millis() as f64);
    counter!(METRIC_MARKETS_SCANNED).increment(markets as u64);
    counter!(METRIC_OPPORTUNITIES_DETECTED).increment(opportunities as u64);
}

/// Record an execution attempt reaching a terminal outcome.
pub fn record_execution(outcome: &'static str) {
    counter!(METRIC_EXECUTIONS, "outcome" => outcome).increment(1);
}

/// Record a risk admission denial.
pub fn record_denial() {
    counter!(METRIC_TRADES_DENIED).increment(1);
}

/// Record an order gateway failure.
pub fn record_gateway_failure() {
    counter!(METRIC_GATEWAY_FAILURES).increment(1);
}
