/**
 * ============================================================================
 * PROBE REPORT MODULE
 * ============================================================================
 *
 * PURPOSE: Fetch a group of probe values and post them as one event
 *
 * REPORTS:
 * - device: Language, OperatingSystem, PublicIPAddress
 * - bandwidth: system-wide sent/received counters
 * - program_usage: process CPU percent and RAM in MB
 * - arguments: command line of the host process
 *
 * ============================================================================
 */

use crate::delivery::formatter;
use crate::delivery::manager::EventSink;
use crate::delivery::types::{Category, FieldValue, PostOutcome};
use crate::probes::fetch;

/**
 * Upload device identity (locale, OS, public IP)
 */
pub fn device<S: EventSink + ?Sized>(sink: &S) -> PostOutcome {
    let values = vec![
        fetch::language().into(),
        fetch::operating_system().into(),
        fetch::public_ip_address().into(),
    ];
    sink.post(&formatter::build(Category::Device, values))
}

/**
 * Upload system-wide network counters
 */
pub fn bandwidth<S: EventSink + ?Sized>(sink: &S) -> PostOutcome {
    let values = vec![fetch::bandwidth().into()];
    sink.post(&formatter::build(Category::Bandwidth, values))
}

/**
 * Upload current CPU and RAM usage of the host process
 */
pub fn program_usage<S: EventSink + ?Sized>(sink: &S) -> PostOutcome {
    let values = program_usage_values(fetch::cpu_usage(), fetch::ram_usage_mb());
    log::debug!("Program usage: {:?}", values);
    sink.post(&formatter::build(Category::ProgramUsage, values))
}

/**
 * Upload the host process's command-line arguments
 */
pub fn arguments<S: EventSink + ?Sized>(sink: &S) -> PostOutcome {
    let values = vec![fetch::arguments().into()];
    sink.post(&formatter::build(Category::Arguments, values))
}

fn program_usage_values(cpu: Result<f64, String>, ram_mb: Result<f64, String>) -> Vec<FieldValue> {
    let cpu = match cpu {
        Ok(percent) => format!("{:?}", percent),
        Err(e) => format!("error: {}", e),
    };
    let ram = match ram_mb {
        Ok(mb) => format!("{:?} MB", mb),
        Err(e) => format!("error: {} MB", e),
    };
    vec![cpu.into(), ram.into()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delivery::types::Event;
    use std::cell::RefCell;

    #[derive(Default)]
    struct RecordingSink {
        events: RefCell<Vec<Event>>,
    }

    impl EventSink for RecordingSink {
        fn post(&self, event: &Event) -> PostOutcome {
            self.events.borrow_mut().push(event.clone());
            PostOutcome::Delivered
        }
    }

    fn text(event: &Event, key: &str) -> String {
        match event.get(key) {
            Some(FieldValue::Text(s)) => s.clone(),
            other => panic!("expected text field {}, got {:?}", key, other),
        }
    }

    #[test]
    fn test_program_usage_values_format() {
        let values = program_usage_values(Ok(12.5), Ok(48.0));
        assert_eq!(
            values,
            vec![FieldValue::from("12.5"), FieldValue::from("48.0 MB")]
        );

        let values = program_usage_values(Err("denied".to_string()), Ok(1.25));
        assert_eq!(values[0], FieldValue::from("error: denied"));
        assert_eq!(values[1], FieldValue::from("1.25 MB"));
    }

    #[test]
    fn test_program_usage_report() {
        let sink = RecordingSink::default();
        assert_eq!(program_usage(&sink), PostOutcome::Delivered);

        let events = sink.events.borrow();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].category(), Some(Category::ProgramUsage));
        assert!(text(&events[0], "RAMUsage").ends_with(" MB"));
    }

    #[test]
    fn test_bandwidth_report() {
        let sink = RecordingSink::default();
        bandwidth(&sink);

        let events = sink.events.borrow();
        assert_eq!(events[0].category(), Some(Category::Bandwidth));
        assert!(text(&events[0], "bandwidth").starts_with("sent_kb: "));
    }

    #[test]
    fn test_arguments_report() {
        let sink = RecordingSink::default();
        arguments(&sink);

        let events = sink.events.borrow();
        assert_eq!(events[0].category(), Some(Category::Arguments));
        assert_eq!(text(&events[0], "arguments"), fetch::arguments());
    }
}
