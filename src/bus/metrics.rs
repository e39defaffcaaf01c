use once_cell::sync::Lazy;
use prometheus::{register_counter, register_histogram, Counter, Histogram};

/// Successful event publishes
pub static BUS_PUBLISH_SUCCESS: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "bus_publish_success_total",
        "Total number of successful event bus publishes"
    )
    .expect("Failed to register bus_publish_success_total metric")
});

/// Failed event publishes
pub static BUS_PUBLISH_FAILURE: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "bus_publish_failure_total",
        "Total number of failed event bus publishes"
    )
    .expect("Failed to register bus_publish_failure_total metric")
});

/// Publish latency
pub static BUS_PUBLISH_LATENCY: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "bus_publish_latency_seconds",
        "Event bus publish latency in seconds",
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]
    )
    .expect("Failed to register bus_publish_latency_seconds metric")
});

/// Messages applied by consumers
pub static BUS_CONSUME_SUCCESS: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "bus_consume_success_total",
        "Total number of successfully applied bus messages"
    )
    .expect("Failed to register bus_consume_success_total metric")
});

/// Consumer handler failures (message left for redelivery)
pub static BUS_CONSUME_FAILURE: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "bus_consume_failure_total",
        "Total number of consumer handler failures"
    )
    .expect("Failed to register bus_consume_failure_total metric")
});

/// Messages moved to the quarantine topic
pub static BUS_QUARANTINED: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "bus_quarantined_total",
        "Total number of messages moved to the quarantine topic"
    )
    .expect("Failed to register bus_quarantined_total metric")
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_register_without_panicking() {
        BUS_PUBLISH_SUCCESS.inc();
        BUS_PUBLISH_FAILURE.inc();
        BUS_PUBLISH_LATENCY.observe(0.05);
        BUS_CONSUME_SUCCESS.inc();
        BUS_CONSUME_FAILURE.inc();
        BUS_QUARANTINED.inc();
    }
}
