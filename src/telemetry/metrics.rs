//! Prometheus metrics

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Duration;

/// Counter metric types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterMetric {
    /// Quotes fetched from the feed
    TicksFetched,
    /// Quotes dropped by validation
    TicksRejected,
    /// Failed feed polls
    FetchErrors,
    /// Bars persisted by the collector
    BarsWritten,
    /// LLM completions requested
    LlmCalls,
    /// Summary requests refused by the usage limiter
    LlmRateLimited,
    /// REST requests served
    HttpRequests,
}

impl CounterMetric {
    /// Exported metric name
    pub fn name(&self) -> &'static str {
        match self {
            CounterMetric::TicksFetched => "marketdash_ticks_fetched_total",
            CounterMetric::TicksRejected => "marketdash_ticks_rejected_total",
            CounterMetric::FetchErrors => "marketdash_fetch_errors_total",
            CounterMetric::BarsWritten => "marketdash_bars_written_total",
            CounterMetric::LlmCalls => "marketdash_llm_calls_total",
            CounterMetric::LlmRateLimited => "marketdash_llm_rate_limited_total",
            CounterMetric::HttpRequests => "marketdash_http_requests_total",
        }
    }
}

/// Gauge metric types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GaugeMetric {
    /// Last accepted price
    LastPrice,
    /// Bars currently accumulating
    OpenBars,
}

impl GaugeMetric {
    /// Exported metric name
    pub fn name(&self) -> &'static str {
        match self {
            GaugeMetric::LastPrice => "marketdash_last_price",
            GaugeMetric::OpenBars => "marketdash_open_bars",
        }
    }
}

/// Latency metric types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LatencyMetric {
    /// One feed poll
    PriceFetch,
    /// One LLM completion
    LlmCompletion,
}

impl LatencyMetric {
    /// Exported metric name
    pub fn name(&self) -> &'static str {
        match self {
            LatencyMetric::PriceFetch => "marketdash_price_fetch_latency_ms",
            LatencyMetric::LlmCompletion => "marketdash_llm_latency_ms",
        }
    }
}

/// Start the Prometheus scrape endpoint on `port`
pub fn init_metrics(port: u16) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| anyhow::anyhow!("Failed to start metrics exporter: {}", e))?;
    Ok(())
}

/// Increment a counter labelled with `label` (symbol or route)
pub fn increment(metric: CounterMetric, label: &str) {
    let key = match metric {
        CounterMetric::HttpRequests => "route",
        _ => "symbol",
    };
    metrics::counter!(metric.name(), key => label.to_string()).increment(1);
}

/// Set a gauge value
pub fn set_gauge(metric: GaugeMetric, symbol: &str, value: f64) {
    metrics::gauge!(metric.name(), "symbol" => symbol.to_string()).set(value);
}

/// Record a latency measurement
pub fn record_latency(metric: LatencyMetric, duration: Duration) {
    metrics::histogram!(metric.name()).record(duration.as_secs_f64() * 1000.0);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_names_are_prefixed() {
        for m in [
            CounterMetric::TicksFetched,
            CounterMetric::TicksRejected,
            CounterMetric::FetchErrors,
            CounterMetric::BarsWritten,
            CounterMetric::LlmCalls,
            CounterMetric::LlmRateLimited,
            CounterMetric::HttpRequests,
        ] {
            assert!(m.name().starts_with("marketdash_"));
            assert!(m.name().ends_with("_total"));
        }
        assert_eq!(GaugeMetric::LastPrice.name(), "marketdash_last_price");
    }

    #[test]
    fn test_recording_without_exporter_is_noop() {
        increment(CounterMetric::TicksFetched, "GBPUSD");
        set_gauge(GaugeMetric::LastPrice, "GBPUSD", 1.27);
        record_latency(LatencyMetric::PriceFetch, Duration::from_millis(12));
    }
}
