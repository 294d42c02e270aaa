/*!
 * Operation Tracing
 * Structured tracing for socket operations using the tracing crate
 *
 * Features:
 * - Trace ID per operation for log correlation
 * - JSON-formatted logs for structured parsing
 * - Handle, address, and byte counts recorded as span fields
 * - Slow-operation warnings for calls that are not expected to block
 */

use crate::core::errors::SocketError;
use crate::core::limits::SLOW_OPERATION_THRESHOLD;
use std::fmt::Display;
use std::time::{Duration, Instant};
use tracing::{debug, info, span, warn, Level};
use tracing_subscriber::{
    fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};
use uuid::Uuid;

/// Initialize structured tracing
///
/// Environment variables:
/// - RUST_LOG: Set log level (default: info)
/// - KSOCKET_TRACE_JSON: Enable JSON output (default: false)
///
/// Calling this more than once keeps the first subscriber.
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let use_json = std::env::var("KSOCKET_TRACE_JSON")
        .map(|v| v == "1" || v == "true")
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(env_filter);

    let installed = if use_json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_thread_names(true)
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .try_init()
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_thread_names(true)
                    .compact(),
            )
            .try_init()
    };

    if installed.is_ok() {
        info!(json = use_json, "Structured tracing initialized");
    }
}

/// Generate a unique trace ID for log correlation
pub fn generate_trace_id() -> String {
    Uuid::new_v4().to_string()
}

/// Span for one socket operation
pub struct OperationSpan {
    span: tracing::Span,
    start: Instant,
    trace_id: String,
    operation: &'static str,
    slow_threshold: Option<Duration>,
}

impl OperationSpan {
    pub fn new(operation: &'static str) -> Self {
        let trace_id = generate_trace_id();

        let span = span!(
            Level::DEBUG,
            "socket_op",
            trace_id = %trace_id,
            operation = operation,
            handle = tracing::field::Empty,
            address = tracing::field::Empty,
            bytes = tracing::field::Empty,
            duration_us = tracing::field::Empty,
            duration_ms = tracing::field::Empty,
            result = tracing::field::Empty,
            error = tracing::field::Empty,
        );

        Self {
            span,
            start: Instant::now(),
            trace_id,
            operation,
            slow_threshold: Some(SLOW_OPERATION_THRESHOLD),
        }
    }

    /// Mark the operation as one that may legitimately wait on the network
    pub fn blocking(mut self) -> Self {
        self.slow_threshold = None;
        self
    }

    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    pub fn record_handle(&self, handle: impl Display) {
        self.span.record("handle", tracing::field::display(handle));
    }

    pub fn record_address(&self, address: impl Display) {
        self.span.record("address", tracing::field::display(address));
    }

    pub fn record_bytes(&self, bytes: usize) {
        self.span.record("bytes", bytes as u64);
    }

    pub fn record_error(&self, error: &SocketError) {
        self.span.record("error", tracing::field::display(error));
        self.span.record("result", "error");
    }

    /// Record the outcome and hand the result back
    pub fn finish<T>(&self, result: Result<T, SocketError>) -> Result<T, SocketError> {
        match &result {
            Ok(_) => {
                self.span.record("result", "success");
            }
            Err(e) => self.record_error(e),
        }
        result
    }

    /// Enter the span context
    pub fn enter(&self) -> tracing::span::Entered<'_> {
        self.span.enter()
    }
}

impl Drop for OperationSpan {
    fn drop(&mut self) {
        let duration = self.start.elapsed();
        let _entered = self.span.enter();

        match self.slow_threshold {
            Some(threshold) if duration > threshold => {
                self.span.record("duration_ms", duration.as_millis() as u64);
                warn!(
                    trace_id = %self.trace_id,
                    operation = self.operation,
                    duration_ms = duration.as_millis() as u64,
                    slow = true,
                    "slow operation detected"
                );
            }
            _ => {
                self.span.record("duration_us", duration.as_micros() as u64);
                debug!(
                    trace_id = %self.trace_id,
                    operation = self.operation,
                    duration_us = duration.as_micros() as u64,
                    "operation completed"
                );
            }
        }
    }
}

/// Helper to create an operation span
#[inline]
pub fn span_operation(name: &'static str) -> OperationSpan {
    OperationSpan::new(name)
}

/// Run `f` under a scoped subscriber and collect the `operation` of every
/// span it opens
#[cfg(test)]
pub(crate) fn recorded_operations(f: impl FnOnce()) -> Vec<String> {
    use parking_lot::Mutex;
    use std::sync::Arc;
    use tracing::field::{Field, Visit};
    use tracing::span::{Attributes, Id};
    use tracing::Subscriber;
    use tracing_subscriber::layer::{Context, Layer};

    struct OperationField(Option<String>);

    impl Visit for OperationField {
        fn record_str(&mut self, field: &Field, value: &str) {
            if field.name() == "operation" {
                self.0 = Some(value.to_string());
            }
        }

        fn record_debug(&mut self, _field: &Field, _value: &dyn std::fmt::Debug) {}
    }

    struct Operations(Arc<Mutex<Vec<String>>>);

    impl<S: Subscriber> Layer<S> for Operations {
        fn on_new_span(&self, attrs: &Attributes<'_>, _id: &Id, _ctx: Context<'_, S>) {
            let mut field = OperationField(None);
            attrs.record(&mut field);
            if let Some(operation) = field.0 {
                self.0.lock().push(operation);
            }
        }
    }

    let seen = Arc::new(Mutex::new(Vec::new()));
    let subscriber = tracing_subscriber::registry().with(Operations(Arc::clone(&seen)));
    tracing::subscriber::with_default(subscriber, f);
    let operations = seen.lock().clone();
    operations
}
