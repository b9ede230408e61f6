/*!
 * Monitoring
 * Structured logging setup and call tracing
 */

mod tracer;

pub use tracer::{generate_trace_id, init_tracing, span_call, CallSpan, ENV_TRACE_JSON};
