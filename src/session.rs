// MIT License - Copyright (c) 2026 Peter Wright

//! Per-connection session orchestration.
//!
//! One session per accepted inbound connection, moving through
//! `Connecting → Active → Draining → Closed`:
//!
//! - **Connecting**: dial the peer back on the command port; failure is
//!   fatal before the session ever becomes active. Create the audit file.
//! - **Active**: three tasks (state reader, command writer, operator
//!   interface driver) decoupled by two bounded queues. Senders block when
//!   a queue is full; nothing is ever dropped.
//! - **Draining**: the first task to finish (or fail) cancels the other two
//!   through a shared [`CancellationToken`]; every blocking operation in the
//!   tasks observes the token, so cancellation unblocks them promptly.
//! - **Closed**: sockets and the audit handle are released when the tasks
//!   return; the caller gets the fatal error, if any.

use std::net::SocketAddr;
use std::sync::Arc;

use chrono::Local;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::alarm::{self, AlarmTrigger};
use crate::audit::AuditLog;
use crate::config::HubConfig;
use crate::devices::DeviceRegistry;
use crate::error::{HubError, Result};
use crate::operator::{OperatorInterface, Selection};
use crate::protocol::{CommandBatch, STATE_FRAME_LEN, StateReport};

/// Run one session to completion.
///
/// Returns when the field controller disconnects, the operator quits, or a
/// task hits a session-fatal error. There is no reconnection: a fresh TCP
/// connection starts a fresh session.
pub async fn run_session<I: OperatorInterface>(
    config: &HubConfig,
    registry: Arc<DeviceRegistry>,
    state_stream: TcpStream,
    peer: SocketAddr,
    interface: I,
) -> Result<()> {
    info!("Session starting for {peer}");

    // Connecting: commands travel on a second, outbound connection to the
    // same peer.
    let command_addr = SocketAddr::new(peer.ip(), config.command_port);
    let command_stream = TcpStream::connect(command_addr)
        .await
        .map_err(|source| HubError::PeerUnreachable {
            addr: command_addr,
            source,
        })?;
    debug!("Command link established to {command_addr}");

    let audit = AuditLog::create(&config.audit_dir, peer, Local::now())?;
    debug!("Audit trail at {}", audit.path().display());
    // Shared by the reader (alarm rows) and the writer (command rows); the
    // mutex keeps at most one outstanding audit write.
    let audit = Arc::new(Mutex::new(audit));

    let (state_tx, state_rx) = mpsc::channel(config.queue_capacity);
    let (selection_tx, selection_rx) = mpsc::channel(config.queue_capacity);

    let cancel = CancellationToken::new();
    let trigger = AlarmTrigger::new(&config.playback_program, config.playback_args.clone());

    let mut reader = tokio::spawn(state_reader(
        state_stream,
        state_tx,
        Arc::clone(&audit),
        trigger,
        cancel.clone(),
    ));
    let mut writer = tokio::spawn(command_writer(
        command_stream,
        selection_rx,
        Arc::clone(&audit),
        Arc::clone(&registry),
        cancel.clone(),
    ));
    let mut driver = interface.spawn(state_rx, selection_tx, cancel.clone());

    // Active: race the three tasks. Whichever finishes first, including the
    // operator quitting, drains the rest.
    enum First {
        Reader(Result<()>),
        Writer(Result<()>),
        Driver,
    }

    let first = tokio::select! {
        joined = &mut reader => First::Reader(flatten("state reader", joined)),
        joined = &mut writer => First::Writer(flatten("command writer", joined)),
        joined = &mut driver => {
            if let Err(e) = joined {
                error!("Interface driver failed: {e}");
            }
            First::Driver
        }
    };

    // Draining
    cancel.cancel();
    let (reader_res, writer_res) = match first {
        First::Reader(res) => {
            let writer_res = flatten("command writer", writer.await);
            let _ = driver.await;
            (res, writer_res)
        }
        First::Writer(res) => {
            let reader_res = flatten("state reader", reader.await);
            let _ = driver.await;
            (reader_res, res)
        }
        First::Driver => {
            debug!("Operator interface finished first");
            let reader_res = flatten("state reader", reader.await);
            let writer_res = flatten("command writer", writer.await);
            (reader_res, writer_res)
        }
    };

    // Closed: both sockets and the audit handle dropped with the tasks.
    info!("Session with {peer} closed");
    reader_res.and(writer_res)
}

/// Collapse a join result; a panicked task is reported as [`HubError::ChannelClosed`]
/// after logging, so teardown still completes.
fn flatten(
    task: &str,
    joined: std::result::Result<Result<()>, tokio::task::JoinError>,
) -> Result<()> {
    match joined {
        Ok(res) => res,
        Err(e) if e.is_cancelled() => Ok(()),
        Err(e) => {
            error!("{task} task panicked: {e}");
            Err(HubError::ChannelClosed)
        }
    }
}

/// State reader: one 17-byte frame at a time off the inbound socket.
///
/// Runs the alarm trigger on every decoded report, then enqueues it for the
/// operator interface, blocking when the queue is full (a slow interface
/// stalls state delivery rather than dropping reports). Exits with
/// [`HubError::TruncatedFrame`] when the peer disconnects.
async fn state_reader(
    mut stream: TcpStream,
    states: mpsc::Sender<StateReport>,
    audit: Arc<Mutex<AuditLog>>,
    trigger: AlarmTrigger,
    cancel: CancellationToken,
) -> Result<()> {
    let mut buf = [0u8; STATE_FRAME_LEN];

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("State reader cancelled");
                return Ok(());
            }
            read = stream.read_exact(&mut buf) => match read {
                Ok(_) => {}
                Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    info!("Field controller closed the state link");
                    return Err(HubError::TruncatedFrame);
                }
                Err(e) => return Err(HubError::Io(e)),
            }
        }

        let report = StateReport::decode(&buf)?;
        debug!(
            "State report: {} bitmap {:#018x}",
            report.device_type, report.bitmap
        );

        if alarm::triggers(&report) {
            warn!("Alarm: {} reports activity", report.device_type);
            // Audit synchronously, then fire playback without waiting on it.
            audit
                .lock()
                .await
                .append(report.device_type, report.bitmap, true)?;
            trigger.fire();
        }

        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("State reader cancelled while enqueueing");
                return Ok(());
            }
            sent = states.send(report) => {
                if sent.is_err() {
                    // Interface dropped its receiver; the session is draining.
                    debug!("State queue closed");
                    return Ok(());
                }
            }
        }
    }
}

/// Command writer: selections in, command frames out.
///
/// Blocks on the empty queue; a closed queue (the operator quit) is a clean
/// exit. Every batch entry is audited before the batch goes on the wire, and
/// the whole batch is flushed before waiting for the next submission.
async fn command_writer(
    mut stream: TcpStream,
    mut selections: mpsc::Receiver<Selection>,
    audit: Arc<Mutex<AuditLog>>,
    registry: Arc<DeviceRegistry>,
    cancel: CancellationToken,
) -> Result<()> {
    loop {
        let selection = tokio::select! {
            _ = cancel.cancelled() => {
                debug!("Command writer cancelled");
                return Ok(());
            }
            received = selections.recv() => match received {
                Some(selection) => selection,
                None => {
                    info!("Operator interface closed; command writer stopping");
                    return Ok(());
                }
            }
        };

        let batch = CommandBatch::from_selection(&registry, &selection);
        debug!(
            "Submitting {} command frames for {} selected devices",
            batch.frames.len(),
            selection.len()
        );

        {
            let mut audit = audit.lock().await;
            for frame in &batch.frames {
                audit.append(frame.device_type, frame.bitmap, false)?;
            }
        }

        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("Command writer cancelled mid-batch");
                return Ok(());
            }
            written = write_batch(&mut stream, &batch) => written?,
        }
    }
}

async fn write_batch(stream: &mut TcpStream, batch: &CommandBatch) -> Result<()> {
    // One write per entry, in batch order
    for frame in &batch.frames {
        stream.write_all(&frame.encode()).await?;
    }
    stream.flush().await?;
    Ok(())
}
