/**
 * ============================================================================
 * PROBES MODULE
 * ============================================================================
 *
 * PURPOSE: Collect device, network, and process facts and hand them to an
 * EventSink as telemetry events.
 *
 * ARCHITECTURE:
 * - fetch: Raw probe readings (sysinfo, environment, IP lookup)
 * - report: One event per probe group
 * - trace: Function-call tracing wrapper
 *
 * ============================================================================
 */

pub mod fetch;
pub mod report;
pub mod trace;
