//! Line-oriented console transport
//!
//! Each stdin line is one JSON [`AppEvent`], typically a `COMMAND` or an
//! `ON_CLIENT_CONNECTED`, and goes onto the command queue. Every outbound
//! event (state changes and client replies) is written to stdout as one
//! JSON line.

use fabscan_core::{AppEvent, EventBus, EventFilter, EventKind, SubscriptionId};
use std::io::{BufRead, Write};
use std::sync::Arc;
use std::thread::JoinHandle;

/// Event kinds written to the console
pub const OUTBOUND: [EventKind; 5] = [
    EventKind::OnStateChanged,
    EventKind::OnGetConfig,
    EventKind::OnGetSettings,
    EventKind::OnClientInit,
    EventKind::OnNetConnect,
];

/// Parse one input line; blank lines yield `None`
pub fn parse_line(line: &str) -> Option<serde_json::Result<AppEvent>> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    Some(serde_json::from_str(line))
}

/// Enqueue every event read from `reader` until EOF or until the bus closes
///
/// Lines that do not parse are logged and skipped. Returns the number of
/// events queued.
pub fn pump_lines<R: BufRead>(reader: R, bus: &EventBus) -> usize {
    let mut queued = 0;
    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!("Console input failed: {}", e);
                break;
            }
        };
        match parse_line(&line) {
            None => continue,
            Some(Ok(event)) => {
                if bus.enqueue(event).is_err() {
                    break;
                }
                queued += 1;
            }
            Some(Err(e)) => tracing::warn!("Ignoring console line: {}", e),
        }
    }
    queued
}

/// Write one event as a JSON line
pub fn write_event<W: Write>(writer: &mut W, event: &AppEvent) -> std::io::Result<()> {
    serde_json::to_writer(&mut *writer, event)?;
    writer.write_all(b"\n")?;
    writer.flush()
}

/// Print outbound events on stdout
pub fn attach_output(bus: &EventBus) -> SubscriptionId {
    bus.subscribe(EventFilter::Kinds(OUTBOUND.to_vec()), |event| {
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        if let Err(e) = write_event(&mut out, &event) {
            tracing::warn!("Console output failed: {}", e);
        }
    })
}

/// Read stdin on a background thread; the bus is closed at end of input
pub fn spawn_input(bus: Arc<EventBus>) -> std::io::Result<JoinHandle<()>> {
    std::thread::Builder::new()
        .name("console-input".to_string())
        .spawn(move || {
            let stdin = std::io::stdin();
            let queued = pump_lines(stdin.lock(), &bus);
            tracing::info!("Console input closed after {} events", queued);
            bus.close();
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use fabscan_core::{ClientId, Command, ScannerState};
    use std::io::Cursor;

    #[test]
    fn test_pump_queues_valid_lines_in_order() {
        let bus = EventBus::new();
        let input = concat!(
            "{\"kind\":\"ON_CLIENT_CONNECTED\",\"client\":\"ws-1\"}\n",
            "\n",
            "not json\n",
            "{\"kind\":\"COMMAND\",\"client\":\"ws-1\",\"command\":\"SCAN\"}\n",
            "{\"kind\":\"COMMAND\",\"client\":\"ws-1\",\"command\":\"UPDATE_SETTINGS\",\"settings\":{\"resolution\":1}}\n",
        );

        let queued = pump_lines(Cursor::new(input), &bus);

        assert_eq!(queued, 3);
        assert_eq!(bus.queued_len(), 3);
    }

    #[test]
    fn test_pump_stops_when_bus_is_closed() {
        let bus = EventBus::new();
        bus.close();

        let queued = pump_lines(
            Cursor::new("{\"kind\":\"COMMAND\",\"client\":\"a\",\"command\":\"STOP\"}\n"),
            &bus,
        );

        assert_eq!(queued, 0);
    }

    #[test]
    fn test_parse_line() {
        assert!(parse_line("   ").is_none());
        let event = parse_line("{\"kind\":\"COMMAND\",\"client\":\"c\",\"command\":\"GET_CONFIG\"}")
            .expect("non-blank")
            .expect("valid");
        assert_eq!(
            event,
            AppEvent::Command {
                client: ClientId::new("c"),
                command: Command::GetConfig
            }
        );
        assert!(parse_line("{\"kind\":\"COMMAND\"}").expect("non-blank").is_err());
    }

    #[test]
    fn test_write_event_is_one_line() {
        let mut out = Vec::new();
        write_event(
            &mut out,
            &AppEvent::OnStateChanged {
                state: ScannerState::Scanning,
            },
        )
        .unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "{\"kind\":\"ON_STATE_CHANGED\",\"state\":\"SCANNING\"}\n"
        );
    }
}
