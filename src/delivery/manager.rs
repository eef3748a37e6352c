/**
 * ============================================================================
 * DELIVERY MANAGER MODULE
 * ============================================================================
 *
 * PURPOSE: Orchestrate "drain backlog, then send current event"
 *
 * POST SEQUENCE (per call, inline on the caller's thread):
 * 1. Serialize the event
 * 2. Refuse to run without credentials (fatal)
 * 3. Replay the durable queue through the transport; failures stay queued
 * 4. Send the current event
 * 5. On transport failure or rejection, append it to the durable queue
 *
 * STATES: Start -> Draining -> Sending -> {Delivered, Queued, Lost, Fatal}
 *
 * Nothing is retained between calls except the queue file on disk and the
 * coordinator's configuration. Storage faults are logged and skipped; only
 * missing credentials escape to the host, and they end the process.
 *
 * ============================================================================
 */

use crate::delivery::client::{HttpTransport, Transport};
use crate::delivery::config::DeliveryConfig;
use crate::delivery::formatter;
use crate::delivery::queue::DurableQueue;
use crate::delivery::types::{DeliveryError, Event, Outcome, PostOutcome, SerializedEvent};
use once_cell::sync::Lazy;
use std::sync::{Mutex, MutexGuard};

/**
 * Process-wide coordinator installed by configure()
 * A Mutex rather than a RwLock: posts from different threads must not
 * interleave their drain/rewrite cycles.
 */
static GLOBAL_COORDINATOR: Lazy<Mutex<Option<Coordinator>>> = Lazy::new(|| Mutex::new(None));

/**
 * Anything that accepts telemetry events
 * Probes and the trace wrapper only depend on this
 */
pub trait EventSink {
    fn post(&self, event: &Event) -> PostOutcome;
}

/**
 * Delivery coordinator
 * Owns the durable queue and the transport used to drain it
 */
pub struct Coordinator<T: Transport = HttpTransport> {
    queue: DurableQueue,
    transport: T,
}

impl Coordinator<HttpTransport> {
    /**
     * Build an HTTP coordinator from an explicit configuration
     */
    pub fn new(config: DeliveryConfig) -> Result<Self, DeliveryError> {
        config.validate().map_err(DeliveryError::InvalidConfig)?;
        let transport = HttpTransport::from_config(&config).map_err(DeliveryError::InvalidConfig)?;

        log::info!(
            "Telemetry coordinator ready (queue: {}, timeout: {}s, configured: {})",
            config.queue_path.display(),
            config.request_timeout_seconds,
            config.is_configured()
        );

        Ok(Self::with_transport(DurableQueue::new(config.queue_path), transport))
    }
}

impl<T: Transport> Coordinator<T> {
    pub fn with_transport(queue: DurableQueue, transport: T) -> Self {
        Self { queue, transport }
    }

    pub fn queue(&self) -> &DurableQueue {
        &self.queue
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /**
     * Deliver an event, terminating the process if no credentials are set
     */
    pub fn post(&self, event: &Event) -> PostOutcome {
        match self.try_post(event) {
            Ok(outcome) => outcome,
            Err(e) => fatal(&e),
        }
    }

    /**
     * Deliver an event, reporting missing credentials as an error
     */
    pub fn try_post(&self, event: &Event) -> Result<PostOutcome, DeliveryError> {
        let payload = formatter::serialize(event);
        self.try_post_serialized(&payload)
    }

    /**
     * Drain, then send an already serialized event
     */
    pub fn try_post_serialized(&self, payload: &SerializedEvent) -> Result<PostOutcome, DeliveryError> {
        if !self.transport.is_configured() {
            return Err(DeliveryError::Unconfigured);
        }

        self.drain();

        match self.transport.send(payload.as_str()) {
            Outcome::Delivered => {
                log::info!("Telemetry event delivered");
                Ok(PostOutcome::Delivered)
            }
            Outcome::Unconfigured => Err(DeliveryError::Unconfigured),
            Outcome::Rejected { status, body } => {
                log::warn!("Telemetry event rejected ({}): {}", status, body);
                Ok(self.persist(payload))
            }
            Outcome::TransportFailure(message) => {
                log::warn!("Telemetry event not delivered: {}", message);
                Ok(self.persist(payload))
            }
        }
    }

    /**
     * Replay the backlog through the transport
     * Returns the remaining backlog size, or None if the queue could not
     * be processed this cycle
     */
    pub fn drain(&self) -> Option<usize> {
        match self.queue.drain_and_replay(|entry| self.transport.send(entry)) {
            Ok(remaining) => Some(remaining),
            Err(e) => {
                log::error!("Error processing queue {}: {}", self.queue.path().display(), e);
                None
            }
        }
    }

    fn persist(&self, payload: &SerializedEvent) -> PostOutcome {
        match self.queue.append(payload.as_str()) {
            Ok(()) => {
                log::info!("Telemetry event queued for retry");
                PostOutcome::Queued
            }
            Err(e) => {
                log::error!("Error appending data to queue, event lost: {} ({})", e, payload);
                PostOutcome::Lost
            }
        }
    }
}

impl<T: Transport> EventSink for Coordinator<T> {
    fn post(&self, event: &Event) -> PostOutcome {
        Coordinator::post(self, event)
    }
}

/**
 * Library banner printed on the fatal path
 */
pub fn name() -> &'static str {
    "pocketlife: A telemetry system for use in Rust programs."
}

/**
 * Report a configuration error and terminate the process
 */
pub fn fatal(error: &DeliveryError) -> ! {
    log::error!("{}", error);
    eprintln!("{}", name());
    eprintln!("{}.", error);
    eprintln!("Quitting!");
    std::process::exit(1)
}

fn global() -> MutexGuard<'static, Option<Coordinator>> {
    GLOBAL_COORDINATOR
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/**
 * Install the process-wide coordinator
 * Must be called before any global post()
 */
pub fn configure(
    username: impl Into<String>,
    password: impl Into<String>,
    hostname: impl Into<String>,
) -> Result<(), DeliveryError> {
    configure_with(DeliveryConfig::new(username, password, hostname))
}

/**
 * Install the process-wide coordinator from a full configuration
 */
pub fn configure_with(config: DeliveryConfig) -> Result<(), DeliveryError> {
    let coordinator = Coordinator::new(config)?;
    *global() = Some(coordinator);
    Ok(())
}

/**
 * Check if a process-wide coordinator has been installed
 */
pub fn is_configured() -> bool {
    global()
        .as_ref()
        .map(|coordinator| coordinator.transport().is_configured())
        .unwrap_or(false)
}

/**
 * Remove the process-wide coordinator
 */
pub fn clear() {
    *global() = None;
    log::info!("Telemetry configuration cleared");
}

/**
 * Deliver an event through the process-wide coordinator
 * Terminates the process if configure() was never called
 */
pub fn post(event: &Event) -> PostOutcome {
    let guard = global();
    match guard.as_ref() {
        Some(coordinator) => coordinator.post(event),
        None => fatal(&DeliveryError::Unconfigured),
    }
}

/**
 * EventSink backed by the process-wide coordinator
 */
#[derive(Debug, Clone, Copy, Default)]
pub struct Global;

impl EventSink for Global {
    fn post(&self, event: &Event) -> PostOutcome {
        post(event)
    }
}
