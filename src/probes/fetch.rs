/**
 * ============================================================================
 * PROBE FETCH MODULE
 * ============================================================================
 *
 * PURPOSE: Read raw facts about the device, network, and current process
 *
 * Every probe degrades to an empty or "error: ..." string instead of
 * failing; a broken probe must never take the host down.
 *
 * ============================================================================
 */

use once_cell::sync::Lazy;
use serde::Deserialize;
use std::sync::Mutex;
use std::time::Duration;
use sysinfo::{Networks, Pid, System};

const PUBLIC_IP_URL: &str = "https://api.ipify.org?format=json";

const PUBLIC_IP_TIMEOUT_SECS: u64 = 5;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Locale variables, highest priority first
const LOCALE_VARS: [&str; 4] = ["LC_ALL", "LC_CTYPE", "LANG", "LANGUAGE"];

// Keeps the previous refresh so cpu_usage() reports usage since the last call
static CPU_SAMPLER: Lazy<Mutex<ProcessSampler>> = Lazy::new(|| Mutex::new(ProcessSampler::new()));

#[derive(Debug, Deserialize)]
struct IpResponse {
    #[serde(default)]
    ip: String,
}

/**
 * Point-in-time resource usage of the current process
 */
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProcessSample {
    /// CPU percent since the sampler's previous refresh
    pub cpu_percent: f64,

    /// Resident set size in bytes
    pub rss_bytes: u64,
}

/**
 * Samples the current process through sysinfo
 * CPU usage is relative to the previous sample taken by the same sampler,
 * so the first sample reports 0.
 */
pub struct ProcessSampler {
    system: System,
    pid: Option<Pid>,
}

impl Default for ProcessSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessSampler {
    pub fn new() -> Self {
        let pid = match sysinfo::get_current_pid() {
            Ok(pid) => Some(pid),
            Err(e) => {
                log::warn!("Failed to resolve current process id: {}", e);
                None
            }
        };

        Self {
            system: System::new(),
            pid,
        }
    }

    pub fn sample(&mut self) -> Result<ProcessSample, String> {
        let pid = self
            .pid
            .ok_or_else(|| "Current process id unavailable".to_string())?;

        if !self.system.refresh_process(pid) {
            return Err(format!("Failed to refresh process {}", pid));
        }

        let process = self
            .system
            .process(pid)
            .ok_or_else(|| format!("Process {} not found", pid))?;

        Ok(ProcessSample {
            cpu_percent: process.cpu_usage() as f64,
            rss_bytes: process.memory(),
        })
    }
}

/**
 * Command-line arguments of the host process, as a list literal
 */
pub fn arguments() -> String {
    format!("{:?}", std::env::args().collect::<Vec<String>>())
}

/**
 * Default locale of the process environment (e.g. "en_US")
 * Returns "" for the C/POSIX locale or when nothing is set
 */
pub fn language() -> String {
    language_from(|name| std::env::var(name).ok())
}

fn language_from(lookup: impl Fn(&str) -> Option<String>) -> String {
    for var in LOCALE_VARS {
        let Some(value) = lookup(var) else {
            continue;
        };

        // LANGUAGE is a colon-separated priority list
        let value = if var == "LANGUAGE" {
            value.split(':').next().unwrap_or("").to_string()
        } else {
            value
        };

        if value.is_empty() {
            continue;
        }

        // Strip codeset and modifier: en_US.UTF-8@euro -> en_US
        let locale = value
            .split(['.', '@'])
            .next()
            .unwrap_or("")
            .to_string();

        return match locale.as_str() {
            "C" | "POSIX" => String::new(),
            _ => locale,
        };
    }

    String::new()
}

/**
 * Operating system name and version (e.g. "Ubuntu 22.04")
 */
pub fn operating_system() -> String {
    let name = System::name().unwrap_or_default();
    let version = System::os_version().unwrap_or_default();
    format!("{} {}", name, version)
}

/**
 * Public IP address as seen by an external echo service
 * Returns "" on any failure
 */
pub fn public_ip_address() -> String {
    let client = match reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(PUBLIC_IP_TIMEOUT_SECS))
        .build()
    {
        Ok(client) => client,
        Err(e) => {
            log::debug!("Failed to create HTTP client for IP lookup: {}", e);
            return String::new();
        }
    };

    match client
        .get(PUBLIC_IP_URL)
        .send()
        .and_then(|response| response.error_for_status())
        .and_then(|response| response.json::<IpResponse>())
    {
        Ok(body) => body.ip,
        Err(e) => {
            log::debug!("Public IP lookup failed: {}", e);
            String::new()
        }
    }
}

/**
 * CPU percent used by this process since the previous call
 * The first call in a process reports 0
 */
pub fn cpu_usage() -> Result<f64, String> {
    let mut sampler = CPU_SAMPLER
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    sampler.sample().map(|sample| sample.cpu_percent)
}

/**
 * Resident memory of this process in MB
 */
pub fn ram_usage_mb() -> Result<f64, String> {
    ProcessSampler::new()
        .sample()
        .map(|sample| sample.rss_bytes as f64 / BYTES_PER_MB)
}

/**
 * System-wide bytes sent/received since boot, summed over interfaces
 */
pub fn bandwidth() -> String {
    let networks = Networks::new_with_refreshed_list();
    if networks.iter().next().is_none() {
        log::debug!("No network interfaces reported, bandwidth counters are zero");
    }

    let (sent, received) = networks.iter().fold((0u64, 0u64), |(sent, received), (_, data)| {
        (
            sent.saturating_add(data.total_transmitted()),
            received.saturating_add(data.total_received()),
        )
    });

    format_bandwidth(sent, received)
}

/**
 * Render byte counters in the wire format: "sent_kb: <f> received_kb: <f>"
 */
pub fn format_bandwidth(sent_bytes: u64, received_bytes: u64) -> String {
    format!(
        "sent_kb: {:?} received_kb: {:?}",
        sent_bytes as f64 / 1024.0,
        received_bytes as f64 / 1024.0
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn test_format_bandwidth() {
        assert_eq!(format_bandwidth(2048, 512), "sent_kb: 2.0 received_kb: 0.5");
        assert_eq!(format_bandwidth(0, 0), "sent_kb: 0.0 received_kb: 0.0");
    }

    #[test]
    fn test_bandwidth_has_wire_format() {
        let value = bandwidth();
        assert!(value.starts_with("sent_kb: "));
        assert!(value.contains(" received_kb: "));
    }

    #[test]
    fn test_language_priority_and_codeset_stripping() {
        assert_eq!(language_from(env(&[("LANG", "en_US.UTF-8")])), "en_US");
        assert_eq!(
            language_from(env(&[("LC_ALL", "de_DE@euro"), ("LANG", "en_US.UTF-8")])),
            "de_DE"
        );
        assert_eq!(language_from(env(&[("LC_ALL", ""), ("LANG", "fr_FR")])), "fr_FR");
        assert_eq!(language_from(env(&[("LANGUAGE", "pt_BR:en")])), "pt_BR");
    }

    #[test]
    fn test_language_c_locale_and_unset() {
        assert_eq!(language_from(env(&[("LANG", "C.UTF-8")])), "");
        assert_eq!(language_from(env(&[("LC_ALL", "POSIX")])), "");
        assert_eq!(language_from(env(&[])), "");
    }

    #[test]
    fn test_process_sampler_reports_memory() {
        let mut sampler = ProcessSampler::new();
        let sample = sampler.sample().unwrap();
        assert!(sample.rss_bytes > 0);
        assert!(sample.cpu_percent >= 0.0);
    }

    #[test]
    fn test_cpu_and_ram_probes() {
        assert!(cpu_usage().unwrap() >= 0.0);
        assert!(ram_usage_mb().unwrap() > 0.0);
    }

    #[test]
    fn test_arguments_lists_program() {
        let args = arguments();
        assert!(args.starts_with('['));
        assert!(args.ends_with(']'));
    }
}
