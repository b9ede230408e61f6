/*!
 * Tracing
 * Subscriber setup and timed spans for blocking admin calls
 *
 * Environment variables:
 * - RUST_LOG: log filter (default: info)
 * - CQ_TRACE_JSON: emit JSON lines instead of compact text
 */

use std::time::{Duration, Instant};
use tracing::{debug, info, span, warn, Level};
use tracing_subscriber::{
    fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};
use uuid::Uuid;

pub const ENV_TRACE_JSON: &str = "CQ_TRACE_JSON";

/// Calls slower than this are logged at warn
pub const SLOW_CALL_THRESHOLD: Duration = Duration::from_millis(500);

/// Install the global subscriber
///
/// Safe to call more than once; only the first call installs anything.
pub fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let use_json = std::env::var(ENV_TRACE_JSON)
        .map(|v| v == "1" || v == "true")
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(env_filter);

    let installed = if use_json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_names(true)
                    .with_current_span(true)
                    .with_span_list(true),
            )
            .try_init()
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_names(true)
                    .with_span_events(FmtSpan::CLOSE)
                    .compact(),
            )
            .try_init()
    };

    if installed.is_ok() {
        info!(json = use_json, "Tracing initialized");
    }
}

/// Unique id correlating the log lines of one call
pub fn generate_trace_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Times one blocking admin call and logs its outcome when dropped
pub struct CallSpan {
    span: tracing::Span,
    start: Instant,
    method: &'static str,
    trace_id: String,
    failed: bool,
}

impl CallSpan {
    pub fn new(method: &'static str) -> Self {
        let trace_id = generate_trace_id();
        let span = span!(
            Level::DEBUG,
            "admin_call",
            trace_id = %trace_id,
            method = method,
            duration_us = tracing::field::Empty,
            error = tracing::field::Empty,
        );
        Self {
            span,
            start: Instant::now(),
            method,
            trace_id,
            failed: false,
        }
    }

    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    pub fn record_error(&mut self, error: &str) {
        self.failed = true;
        self.span.record("error", error);
    }

    /// Record the outcome of `result` and hand it back
    pub fn finish<T, E: std::fmt::Display>(mut self, result: Result<T, E>) -> Result<T, E> {
        if let Err(e) = &result {
            self.record_error(&e.to_string());
        }
        result
    }

    pub fn enter(&self) -> tracing::span::Entered<'_> {
        self.span.enter()
    }
}

impl Drop for CallSpan {
    fn drop(&mut self) {
        let duration = self.start.elapsed();
        let _entered = self.span.enter();
        self.span.record("duration_us", duration.as_micros() as u64);

        if duration > SLOW_CALL_THRESHOLD {
            warn!(
                trace_id = %self.trace_id,
                method = self.method,
                duration_ms = duration.as_millis() as u64,
                failed = self.failed,
                slow = true,
                "slow admin call"
            );
        } else {
            debug!(
                trace_id = %self.trace_id,
                method = self.method,
                duration_us = duration.as_micros() as u64,
                failed = self.failed,
                "admin call completed"
            );
        }
    }
}

#[inline]
pub fn span_call(method: &'static str) -> CallSpan {
    CallSpan::new(method)
}
