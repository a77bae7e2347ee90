//! Per-request access logging.

use std::time::Duration;

use tracing::{info, warn};

use crate::method::Method;

/// Logs one finished request. Server errors are raised to `warn`.
pub fn record(method: Option<Method>, path: &str, status: u16, elapsed: Duration) {
    let method = method.map_or("-", Method::as_str);
    let latency_us = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
    if status >= 500 {
        warn!(method, path, status, latency_us, "request failed");
    } else {
        info!(method, path, status, latency_us, "request");
    }
}
