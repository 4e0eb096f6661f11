use std::iter;
use std::sync::OnceLock;

use prometheus_client::encoding::text::encode;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::histogram::Histogram;
use prometheus_client::registry::Registry;

use crate::Error;
use crate::Result;

// The top-level metric registry is created with the GLOBAL_PREFIX
const REGISTRY_GLOBAL_PREFIX: &str = "dropon";

// Note: We do not add a suffix to the metric name, as the suffix is inferred through the metric type
// by the prometheus client library
const FORWARDED_TOTAL: &str = "forwarded";
const DROPPED_TOTAL: &str = "dropped";
const BACK_PRESSURE_TOTAL: &str = "back_pressure";
const LATE_REPLY_TOTAL: &str = "late_reply";
const FORWARD_TIME: &str = "forward_time";

/// The global register of all metrics.
struct GlobalRegistry {
    // metrics are registered only once, contention is limited to encoding
    registry: parking_lot::Mutex<Registry>,
}

impl GlobalRegistry {
    fn new() -> Self {
        GlobalRegistry {
            registry: parking_lot::Mutex::new(Registry::with_prefix(REGISTRY_GLOBAL_PREFIX)),
        }
    }
}

static GLOBAL_REGISTRY: OnceLock<GlobalRegistry> = OnceLock::new();

fn global_registry() -> &'static GlobalRegistry {
    GLOBAL_REGISTRY.get_or_init(GlobalRegistry::new)
}

/// Metrics of the drop-on output. Messages failed fast because of back pressure are reported
/// upstream as errors, they are counted apart from the errors that were dropped.
pub(crate) struct DropOnMetrics {
    pub(crate) forwarded_total: Counter,
    pub(crate) dropped_total: Counter,
    pub(crate) back_pressure_total: Counter,
    pub(crate) late_reply_total: Counter,
    /// Time from accepting a transaction to answering it, in microseconds.
    pub(crate) forward_time: Histogram,
}

/// Exponential bucket distribution with range.
/// Creates `length` buckets, where the lowest bucket is `min` and the highest bucket is `max`.
fn exponential_buckets_range(min: f64, max: f64, length: u16) -> impl Iterator<Item = f64> {
    let growth_factor = (max / min).powf(1.0 / (f64::from(length.max(2)) - 1.0));

    iter::successors(Some(min), move |bucket| Some(bucket * growth_factor)).take(length.into())
}

impl DropOnMetrics {
    fn new() -> Self {
        let metrics = Self {
            forwarded_total: Counter::default(),
            dropped_total: Counter::default(),
            back_pressure_total: Counter::default(),
            late_reply_total: Counter::default(),
            forward_time: Histogram::new(exponential_buckets_range(100.0, 60000000.0 * 15.0, 10)),
        };

        let mut registry = global_registry().registry.lock();
        registry.register(
            FORWARDED_TOTAL,
            "A Counter to keep track of the total number of messages handed to the wrapped output",
            metrics.forwarded_total.clone(),
        );
        registry.register(
            DROPPED_TOTAL,
            "A Counter to keep track of the total number of messages whose delivery error was dropped",
            metrics.dropped_total.clone(),
        );
        registry.register(
            BACK_PRESSURE_TOTAL,
            "A Counter to keep track of the total number of messages failed due to back pressure",
            metrics.back_pressure_total.clone(),
        );
        registry.register(
            LATE_REPLY_TOTAL,
            "A Counter to keep track of the replies discarded because they arrived after the back pressure limit",
            metrics.late_reply_total.clone(),
        );
        registry.register(
            FORWARD_TIME,
            "A Histogram to keep track of the time taken to answer a message, in microseconds",
            metrics.forward_time.clone(),
        );
        metrics
    }
}

static DROP_ON_METRICS: OnceLock<DropOnMetrics> = OnceLock::new();

pub(crate) fn drop_on_metrics() -> &'static DropOnMetrics {
    DROP_ON_METRICS.get_or_init(DropOnMetrics::new)
}

/// Renders all registered metrics in the OpenMetrics text format.
pub fn encode_metrics() -> Result<String> {
    // make sure the metrics are registered even if nothing was forwarded yet
    drop_on_metrics();

    let registry = global_registry().registry.lock();
    let mut buffer = String::new();
    encode(&mut buffer, &registry).map_err(|e| Error::Metrics(e.to_string()))?;
    Ok(buffer)
}
