use lazy_static::lazy_static;
use prometheus::{Counter, Encoder, Gauge, Histogram, HistogramOpts, Opts, Registry, TextEncoder};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();
    pub static ref BROADCAST_TICKS_TOTAL: Counter = Counter::with_opts(Opts::new(
        "dashboard_broadcast_ticks_total",
        "Broadcast ticks that published the latest reading"
    ))
    .unwrap();
    pub static ref BROADCAST_FAILURES_TOTAL: Counter = Counter::with_opts(Opts::new(
        "dashboard_broadcast_failures_total",
        "Broadcast ticks skipped because fetch or publish failed"
    ))
    .unwrap();
    pub static ref STORE_FAILURES_TOTAL: Counter = Counter::with_opts(Opts::new(
        "dashboard_store_failures_total",
        "Reading store query failures"
    ))
    .unwrap();
    pub static ref REALTIME_CLIENTS: Gauge = Gauge::with_opts(Opts::new(
        "dashboard_realtime_clients",
        "Currently connected real-time clients"
    ))
    .unwrap();
    pub static ref REPORTS_GENERATED_TOTAL: Counter = Counter::with_opts(Opts::new(
        "dashboard_reports_generated_total",
        "Summary reports generated and downloaded"
    ))
    .unwrap();
    pub static ref REPORT_LATENCY_SECONDS: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "dashboard_report_latency_seconds",
            "Time taken to aggregate, render and convert a report"
        )
        .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0])
    )
    .unwrap();
}

pub fn init_metrics() {
    REGISTRY
        .register(Box::new(BROADCAST_TICKS_TOTAL.clone()))
        .unwrap();
    REGISTRY
        .register(Box::new(BROADCAST_FAILURES_TOTAL.clone()))
        .unwrap();
    REGISTRY
        .register(Box::new(STORE_FAILURES_TOTAL.clone()))
        .unwrap();
    REGISTRY
        .register(Box::new(REALTIME_CLIENTS.clone()))
        .unwrap();
    REGISTRY
        .register(Box::new(REPORTS_GENERATED_TOTAL.clone()))
        .unwrap();
    REGISTRY
        .register(Box::new(REPORT_LATENCY_SECONDS.clone()))
        .unwrap();
}

pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).unwrap();
    String::from_utf8(buffer).unwrap()
}
