/*!
 * Monitoring
 * Structured tracing for socket operations
 */

mod tracer;

pub use tracer::{generate_trace_id, init_tracing, span_operation, OperationSpan};
#[cfg(test)]
pub(crate) use tracer::recorded_operations;
