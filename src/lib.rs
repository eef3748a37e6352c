pub mod delivery;
pub mod probes;

pub use delivery::client::{HttpTransport, Transport};
pub use delivery::config::{Credentials, DeliveryConfig};
pub use delivery::formatter::{build, build_named, serialize};
pub use delivery::manager::{
    Coordinator, EventSink, Global, clear, configure, configure_with, is_configured, name, post,
};
pub use delivery::queue::DurableQueue;
pub use delivery::types::{
    Category, DeliveryError, Event, FieldValue, Outcome, PostOutcome, SerializedEvent,
};
pub use probes::trace::{trace, trace_bytes, trace_with};
