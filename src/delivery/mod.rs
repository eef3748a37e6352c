/**
 * ============================================================================
 * DELIVERY MODULE
 * ============================================================================
 *
 * PURPOSE: At-least-once delivery of telemetry events to an HTTP endpoint,
 * buffered through a durable on-disk queue while the network is down.
 *
 * ARCHITECTURE:
 * - types: Events, outcomes, and errors
 * - formatter: Per-category schema and JSON line encoding
 * - config: Credentials, queue location, timeouts
 * - client: Single-attempt HTTP transport
 * - queue: Line-delimited durable backlog
 * - manager: Drain-then-send coordination and the process-wide facade
 *
 * ============================================================================
 */

pub mod types;
pub mod formatter;
pub mod config;
pub mod client;
pub mod queue;
pub mod manager;
