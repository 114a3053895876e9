// MIT License - Copyright (c) 2026 Peter Wright

//! Operator interface contract and the line-oriented console driver.
//!
//! The full-screen operator console is an external collaborator; the hub
//! only fixes its interface: state reports flow in through a bounded queue,
//! device selections flow out through another, and dropping the selection
//! sender is the "operator requested shutdown" signal (the session's command
//! writer exits cleanly when its queue closes).

use std::collections::HashSet;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::devices::{Device, DeviceRegistry, DeviceType};
use crate::protocol::StateReport;

/// The operator's current selection of non-passive devices.
pub type Selection = Vec<Device>;

pub type StateReceiver = mpsc::Receiver<StateReport>;
pub type SelectionSender = mpsc::Sender<Selection>;

/// A per-session operator interface implementation.
pub trait OperatorInterface: Send + 'static {
    /// Spawn the interface driver task for one session.
    ///
    /// The task must exit when the operator quits or `cancel` fires, and
    /// must drop `selections` on the way out so the command writer observes
    /// the closed queue.
    fn spawn(
        self,
        states: StateReceiver,
        selections: SelectionSender,
        cancel: CancellationToken,
    ) -> JoinHandle<()>;
}

/// Minimal line-oriented console driver for the binary.
///
/// Understands `list`, `toggle <type> <slot>`, `submit`, and `quit`. No
/// rendering, no key bindings, just enough surface to exercise the operator
/// contract from a terminal.
pub struct ConsoleInterface {
    registry: Arc<DeviceRegistry>,
}

impl ConsoleInterface {
    pub fn new(registry: Arc<DeviceRegistry>) -> Self {
        Self { registry }
    }
}

impl OperatorInterface for ConsoleInterface {
    fn spawn(
        self,
        states: StateReceiver,
        selections: SelectionSender,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(run_console(self.registry, states, selections, cancel))
    }
}

async fn run_console(
    registry: Arc<DeviceRegistry>,
    mut states: StateReceiver,
    selections: SelectionSender,
    cancel: CancellationToken,
) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut selected: HashSet<(DeviceType, u8)> = HashSet::new();
    // Last reported bitmap per device type, for `list`
    let mut latest: [Option<u64>; DeviceType::ALL.len()] = [None; DeviceType::ALL.len()];

    println!("Operator console ready. Commands: list, toggle <type> <slot>, submit, quit");

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("Console driver cancelled");
                break;
            }
            report = states.recv() => {
                match report {
                    Some(report) => {
                        latest[report.device_type.code() as usize - 1] = Some(report.bitmap);
                    }
                    // Reader side gone; the session is on its way down.
                    None => break,
                }
            }
            line = lines.next_line() => {
                let line = match line {
                    Ok(Some(line)) => line,
                    // stdin closed, treat like quit
                    Ok(None) | Err(_) => break,
                };
                match parse_command(&line) {
                    Some(ConsoleCommand::List) => {
                        print_devices(&registry, &selected, &latest);
                    }
                    Some(ConsoleCommand::Toggle { device_type, slot }) => {
                        match registry.lookup(device_type, slot) {
                            Ok(device) if device.passive => {
                                println!("{} is passive and cannot be commanded", device.name);
                            }
                            Ok(device) => {
                                let key = (device_type, slot);
                                if !selected.insert(key) {
                                    selected.remove(&key);
                                }
                                let state = if selected.contains(&key) { "selected" } else { "deselected" };
                                println!("{} {state}", device.name);
                            }
                            Err(e) => println!("{e}"),
                        }
                    }
                    Some(ConsoleCommand::Submit) => {
                        let selection: Selection = selected
                            .iter()
                            .filter_map(|&(device_type, slot)| {
                                registry.lookup(device_type, slot).ok().cloned()
                            })
                            .collect();
                        if selections.send(selection).await.is_err() {
                            // Writer gone; nothing left to submit to.
                            break;
                        }
                        println!("States submitted!");
                    }
                    Some(ConsoleCommand::Quit) => break,
                    None => {
                        println!("Unknown command: {line}");
                    }
                }
            }
        }
    }
    // `selections` drops here, signalling shutdown to the command writer.
}

fn print_devices(
    registry: &DeviceRegistry,
    selected: &HashSet<(DeviceType, u8)>,
    latest: &[Option<u64>; DeviceType::ALL.len()],
) {
    for device in registry.devices() {
        let mark = if selected.contains(&(device.device_type, device.slot)) {
            "*"
        } else {
            " "
        };
        let state = match latest[device.device_type.code() as usize - 1] {
            Some(bitmap) if (bitmap >> device.slot) & 1 == 1 => "on",
            Some(_) => "off",
            None => "?",
        };
        let passive = if device.passive { " (passive)" } else { "" };
        println!(
            "[{mark}] {} {}: {} {state}{passive}",
            device.device_type, device.slot, device.name
        );
    }
}

#[derive(Debug, PartialEq, Eq)]
enum ConsoleCommand {
    List,
    Toggle { device_type: DeviceType, slot: u8 },
    Submit,
    Quit,
}

fn parse_command(line: &str) -> Option<ConsoleCommand> {
    let mut words = line.split_whitespace();
    match words.next()? {
        "list" => Some(ConsoleCommand::List),
        "submit" => Some(ConsoleCommand::Submit),
        "quit" | "q" => Some(ConsoleCommand::Quit),
        "toggle" => {
            let device_type = DeviceType::from_name(words.next()?)?;
            let slot: u8 = words.next()?.parse().ok()?;
            Some(ConsoleCommand::Toggle { device_type, slot })
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_command() {
        assert_eq!(parse_command("list"), Some(ConsoleCommand::List));
        assert_eq!(parse_command("submit"), Some(ConsoleCommand::Submit));
        assert_eq!(parse_command("quit"), Some(ConsoleCommand::Quit));
        assert_eq!(parse_command("q"), Some(ConsoleCommand::Quit));
        assert_eq!(
            parse_command("toggle lamp 2"),
            Some(ConsoleCommand::Toggle {
                device_type: DeviceType::Lamp,
                slot: 2,
            })
        );
        assert_eq!(
            parse_command("  toggle AirConditioning 0 "),
            Some(ConsoleCommand::Toggle {
                device_type: DeviceType::AirConditioning,
                slot: 0,
            })
        );
        assert_eq!(parse_command("toggle lamp"), None);
        assert_eq!(parse_command("toggle widget 1"), None);
        assert_eq!(parse_command("toggle lamp ten"), None);
        assert_eq!(parse_command("arm"), None);
        assert_eq!(parse_command(""), None);
    }
}
