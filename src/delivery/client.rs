/**
 * ============================================================================
 * HTTP TRANSPORT MODULE
 * ============================================================================
 *
 * PURPOSE: Perform exactly one authenticated POST of a serialized event
 *
 * REQUEST:
 * - POST <endpoint>
 * - Authorization: Basic <username:password>
 * - Content-Type: application/json
 * - Body: one serialized event
 *
 * OUTCOME CLASSIFICATION:
 * - 2xx                          -> Delivered
 * - any other status             -> Rejected (status + body logged)
 * - connect / DNS / timeout / IO -> TransportFailure
 * - no credentials               -> Unconfigured (nothing is sent)
 *
 * No retry loop lives here. Every call is a single attempt bounded by the
 * client timeout; retry and persistence belong to the coordinator.
 *
 * ============================================================================
 */

use crate::delivery::config::{Credentials, DeliveryConfig};
use crate::delivery::types::Outcome;
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;

/**
 * A single delivery attempt
 * The coordinator only talks to the network through this seam
 */
pub trait Transport {
    fn send(&self, payload: &str) -> Outcome;

    /**
     * Whether this transport has destination credentials
     * Checked before anything is drained or sent
     */
    fn is_configured(&self) -> bool {
        true
    }
}

/**
 * Blocking reqwest transport with Basic authentication
 */
pub struct HttpTransport {
    client: Client,
    credentials: Option<Credentials>,
}

impl HttpTransport {
    pub fn new(credentials: Option<Credentials>, timeout: Duration) -> Result<Self, String> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| format!("Failed to create HTTP client: {}", e))?;

        Ok(Self {
            client,
            credentials,
        })
    }

    pub fn from_config(config: &DeliveryConfig) -> Result<Self, String> {
        Self::new(
            config.credentials.clone(),
            Duration::from_secs(config.request_timeout_seconds),
        )
    }
}

impl Transport for HttpTransport {
    fn send(&self, payload: &str) -> Outcome {
        let Some(credentials) = &self.credentials else {
            return Outcome::Unconfigured;
        };

        log::debug!("POST data: {}", payload);

        let response = match self
            .client
            .post(&credentials.endpoint)
            .basic_auth(&credentials.username, Some(&credentials.password))
            .header(CONTENT_TYPE, "application/json")
            .body(payload.to_owned())
            .send()
        {
            Ok(response) => response,
            Err(e) => {
                let message = if e.is_timeout() {
                    format!("Timeout error occurred: {}", e)
                } else if e.is_connect() {
                    format!("Connection error occurred: {}", e)
                } else {
                    format!("Request error occurred: {}", e)
                };
                log::warn!("{}", message);
                return Outcome::TransportFailure(message);
            }
        };

        let status = response.status();
        let body = response
            .text()
            .unwrap_or_else(|e| format!("<unreadable response body: {}>", e));

        if status.is_success() {
            log::debug!("{}: {}", status.as_u16(), body);
            Outcome::Delivered
        } else {
            log::warn!("HTTP error occurred: {} - Response content: {}", status, body);
            Outcome::Rejected {
                status: status.as_u16(),
                body,
            }
        }
    }

    fn is_configured(&self) -> bool {
        self.credentials.is_some()
    }
}
