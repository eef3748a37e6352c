/**
 * ============================================================================
 * DELIVERY TYPES MODULE
 * ============================================================================
 *
 * PURPOSE: Define all data structures shared across the delivery system
 *
 * TYPES DEFINED:
 * - Category: The five fixed telemetry event kinds
 * - FieldValue: A single field value (text, number, raw bytes, JSON)
 * - Event: A schema-fixed telemetry record
 * - SerializedEvent: Canonical single-line JSON form of an event
 * - Outcome: Result of one transport attempt
 * - PostOutcome: Terminal state of one Post invocation
 * - DeliveryError: Errors that escape the delivery system
 *
 * ============================================================================
 */

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};

/**
 * Telemetry event category
 * Each category has a fixed, ordered field schema
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Device,
    Bandwidth,
    ProgramUsage,
    Arguments,
    FunctionTrace,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Device,
        Category::Bandwidth,
        Category::ProgramUsage,
        Category::Arguments,
        Category::FunctionTrace,
    ];

    /**
     * Wire name of the category (e.g. "program_usage")
     */
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Device => "device",
            Category::Bandwidth => "bandwidth",
            Category::ProgramUsage => "program_usage",
            Category::Arguments => "arguments",
            Category::FunctionTrace => "function_trace",
        }
    }

    /**
     * Parse a category from its wire name
     * Returns None for unrecognized names
     */
    pub fn parse(name: &str) -> Option<Category> {
        Category::ALL.into_iter().find(|c| c.as_str() == name)
    }

    /**
     * JSON keys for this category, in wire order
     */
    pub fn field_names(&self) -> &'static [&'static str] {
        match self {
            Category::Device => &["Language", "OperatingSystem", "PublicIPAddress"],
            Category::Bandwidth => &["bandwidth"],
            Category::ProgramUsage => &["CPUUsage", "RAMUsage"],
            Category::Arguments => &["arguments"],
            Category::FunctionTrace => &[
                "result",
                "function_name",
                "execution_time",
                "cpu_usage_change",
                "ram_usage_change",
                "function_arguments",
            ],
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/**
 * One field value inside an event
 * Bytes are base64-encoded when the event is serialized
 */
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Number(f64),
    Bytes(Vec<u8>),
    /// Structured result of a traced function
    Json(serde_json::Value),
}

impl FieldValue {
    /**
     * Display-string form, used when a value cannot be encoded natively
     */
    pub fn display_string(&self) -> String {
        match self {
            FieldValue::Text(s) => s.clone(),
            FieldValue::Number(n) => n.to_string(),
            FieldValue::Bytes(b) => BASE64.encode(b),
            FieldValue::Json(v) => v.to_string(),
        }
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Number(value)
    }
}

impl From<Vec<u8>> for FieldValue {
    fn from(value: Vec<u8>) -> Self {
        FieldValue::Bytes(value)
    }
}

impl From<&[u8]> for FieldValue {
    fn from(value: &[u8]) -> Self {
        FieldValue::Bytes(value.to_vec())
    }
}

impl From<serde_json::Value> for FieldValue {
    fn from(value: serde_json::Value) -> Self {
        FieldValue::Json(value)
    }
}

/**
 * A telemetry record
 * Only constructed through Event::build, so the field set always matches
 * the category schema. An unrecognized category yields no fields.
 */
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub(crate) category: Option<Category>,
    pub(crate) fields: Vec<(&'static str, FieldValue)>,
}

impl Event {
    pub fn category(&self) -> Option<Category> {
        self.category
    }

    pub fn fields(&self) -> &[(&'static str, FieldValue)] {
        &self.fields
    }

    /**
     * Look up a field by its JSON key
     */
    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.iter().find(|(k, _)| *k == key).map(|(_, v)| v)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/**
 * Canonical wire form of an event: one JSON object on a single line
 * This is both the queue storage unit and the HTTP request body
 */
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerializedEvent(pub(crate) String);

impl SerializedEvent {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for SerializedEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/**
 * Classified result of a single transport attempt
 */
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// 2xx response
    Delivered,

    /// Non-2xx response, server understood but declined
    Rejected { status: u16, body: String },

    /// Connection refused/reset, DNS failure, timeout
    TransportFailure(String),

    /// No credentials available, nothing was sent
    Unconfigured,
}

impl Outcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, Outcome::Delivered)
    }
}

/**
 * Terminal state of a Post invocation that did not hit the fatal path
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostOutcome {
    /// Current event reached the endpoint
    Delivered,

    /// Current event failed and was appended to the durable queue
    Queued,

    /// Current event failed and could not be persisted either
    Lost,
}

/**
 * Errors that escape the delivery system to the host
 */
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    /// Post attempted without credentials
    Unconfigured,

    /// Configuration values rejected at setup
    InvalidConfig(String),
}

impl std::fmt::Display for DeliveryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeliveryError::Unconfigured => {
                write!(f, "pocketlife username, password, and/or hostname undefined")
            }
            DeliveryError::InvalidConfig(message) => {
                write!(f, "Invalid pocketlife configuration: {}", message)
            }
        }
    }
}

impl std::error::Error for DeliveryError {}
