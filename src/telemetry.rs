//! Logging setup and request timing.

use crate::config::{LogFormat, LoggingConfig};
use std::time::Instant;
use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over `logging.level` when set.
pub fn init(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    let result = match config.format {
        LogFormat::Pretty => builder.try_init(),
        LogFormat::Json => builder.json().flatten_event(true).try_init(),
    };
    if let Err(e) = result {
        eprintln!("tracing subscriber already installed: {e}");
    }
}

/// Guard for timing a request and recording metrics.
///
/// Records the request when [`finish`](Self::finish) is called with the
/// response status; a guard dropped without it (the handler future was
/// cancelled) is counted with status 499.
pub struct RequestTimer {
    route: String,
    start: Instant,
    status: Option<u16>,
}

impl RequestTimer {
    pub fn new(route: impl Into<String>) -> Self {
        Self {
            route: route.into(),
            start: Instant::now(),
            status: None,
        }
    }

    /// Record the request with its final status; returns the latency in ms.
    pub fn finish(mut self, status: u16) -> u64 {
        self.status = Some(status);
        self.start.elapsed().as_millis() as u64
    }
}

impl Drop for RequestTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        crate::metrics::record_request(&self.route, self.status.unwrap_or(499), duration);
    }
}

/// Standardized span constructors.
pub mod spans {
    use tracing::{Span, info_span};

    /// Create a span for one HTTP request.
    pub fn request(request_id: &str, method: &str, route: &str) -> Span {
        info_span!("http.request", request_id = %request_id, method = %method, route = %route)
    }
}
