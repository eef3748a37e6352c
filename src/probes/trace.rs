/**
 * ============================================================================
 * FUNCTION TRACE MODULE
 * ============================================================================
 *
 * PURPOSE: Wrap a host operation and report its cost as a function_trace
 * event
 *
 * FLOW:
 * 1. Sample process CPU/RAM and start the clock
 * 2. Encode the arguments as {"args": ...}
 * 3. Run the operation
 * 4. Sample again, post the event, return the operation's result unchanged
 *
 * CPU change is the difference of two sysinfo readings and is coarse for
 * short operations.
 *
 * ============================================================================
 */

use crate::delivery::formatter;
use crate::delivery::manager::EventSink;
use crate::delivery::types::{Category, FieldValue};
use crate::probes::fetch::ProcessSampler;
use serde::Serialize;
use std::time::Instant;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/**
 * Trace an operation whose result is JSON-serializable
 */
pub fn trace<S, A, R, F>(sink: &S, name: &str, arguments: &A, operation: F) -> R
where
    S: EventSink + ?Sized,
    A: Serialize + ?Sized,
    R: Serialize,
    F: FnOnce() -> R,
{
    trace_with(sink, name, arguments, operation, |result| {
        match serde_json::to_value(result) {
            Ok(value) => FieldValue::Json(value),
            Err(e) => FieldValue::Text(format!("<unserializable result: {}>", e)),
        }
    })
}

/**
 * Trace an operation returning raw bytes; the result travels as base64
 */
pub fn trace_bytes<S, A, R, F>(sink: &S, name: &str, arguments: &A, operation: F) -> R
where
    S: EventSink + ?Sized,
    A: Serialize + ?Sized,
    R: AsRef<[u8]>,
    F: FnOnce() -> R,
{
    trace_with(sink, name, arguments, operation, |result| {
        FieldValue::Bytes(result.as_ref().to_vec())
    })
}

/**
 * Trace an operation, converting its result with `to_field`
 */
pub fn trace_with<S, A, R, F, C>(sink: &S, name: &str, arguments: &A, operation: F, to_field: C) -> R
where
    S: EventSink + ?Sized,
    A: Serialize + ?Sized,
    F: FnOnce() -> R,
    C: FnOnce(&R) -> FieldValue,
{
    let mut sampler = ProcessSampler::new();
    let start_time = Instant::now();
    let before = sampler.sample();

    let function_arguments = encode_arguments(arguments);

    let result = operation();

    let elapsed = start_time.elapsed();
    let after = sampler.sample();

    let (cpu_change, ram_change_mb) = match (before, after) {
        (Ok(before), Ok(after)) => (
            after.cpu_percent - before.cpu_percent,
            (after.rss_bytes as f64 - before.rss_bytes as f64) / BYTES_PER_MB,
        ),
        (Err(e), _) | (_, Err(e)) => {
            log::debug!("Process sampling failed while tracing {}: {}", name, e);
            (0.0, 0.0)
        }
    };

    let event = formatter::build(
        Category::FunctionTrace,
        vec![
            to_field(&result),
            name.into(),
            format!("{:.4}", elapsed.as_secs_f64()).into(),
            format!("{:.2}", cpu_change).into(),
            format!("{:.2}", ram_change_mb).into(),
            function_arguments.into(),
        ],
    );
    sink.post(&event);

    result
}

/**
 * Encode call arguments as {"args": ...}
 * Arguments that cannot be serialized are replaced by the error text
 */
fn encode_arguments<A: Serialize + ?Sized>(arguments: &A) -> String {
    let args = match serde_json::to_value(arguments) {
        Ok(value) => value,
        Err(e) => serde_json::Value::String(format!("<unserializable arguments: {}>", e)),
    };
    serde_json::json!({ "args": args }).to_string()
}
